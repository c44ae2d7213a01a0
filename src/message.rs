//! Messages and commands shared by the engine, the panels and the modal.
//!
//! Panels and the engine never call each other directly: they return
//! [`Command`]s, and whatever the commands produce re-enters the router as a
//! [`Message`]. Completions carry the namespace they were issued for so they
//! update the right cache slot even if the user has moved on.

use crossterm::event::KeyEvent;
use mongodb::bson::Document;

use crate::mongo::store::{DocumentStore, StoreError};

#[derive(Debug)]
pub enum Message {
    Key(KeyEvent),

    DisplayError(String),
    DisplayDropDatabase { db: String },
    DisplayDropCollection { db: String, collection: String },
    DisplayDeleteDoc(Document),
    DisplayInsertDoc(Document),
    DisplayEditDoc { old: Document, new: Document },

    ExecDropDatabase { db: String },
    ExecDropCollection { db: String, collection: String },
    ExecDeleteDoc(Document),
    ExecInsertDoc(Document),
    ExecEditDoc { old: Document, new: Document },

    /// The external editor returned; `result` is the saved body or why it failed.
    EditorClosed { request: EditorRequest, result: Result<String, String> },

    Refreshed(Result<Vec<(String, Vec<String>)>, StoreError>),
    QueryCompleted { query: PageQuery, result: Result<QueryPage, StoreError> },
    DatabaseDropped { db: String, result: Result<(), StoreError> },
    CollectionDropped { db: String, collection: String, result: Result<(), StoreError> },
    DocumentDeleted { db: String, collection: String, result: Result<u64, StoreError> },
    DocumentInserted { db: String, collection: String, result: Result<(), StoreError> },
    DocumentUpdated { db: String, collection: String, result: Result<(), StoreError> },
}

/// What the router asks the outside world to do.
#[derive(Debug)]
pub enum Command {
    /// Run against the store on a background worker.
    Store(StoreRequest),
    /// Feed a message straight back into the router.
    Emit(Message),
    /// Hand the terminal to `$EDITOR`.
    OpenEditor(EditorRequest),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorRequest {
    Insert { template: Document },
    Edit { original: Document },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub db: String,
    pub collection: String,
    pub filter: Document,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage {
    pub documents: Vec<Document>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreRequest {
    Refresh,
    Query(PageQuery),
    DropDatabase { db: String },
    DropCollection { db: String, collection: String },
    DeleteDocument { db: String, collection: String, document: Document },
    InsertDocument { db: String, collection: String, document: Document },
    UpdateDocument { db: String, collection: String, old: Document, new: Document },
}

impl StoreRequest {
    /// Runs the request to completion. Blocks.
    pub fn execute(self, store: &dyn DocumentStore) -> Message {
        match self {
            StoreRequest::Refresh => Message::Refreshed(list_everything(store)),
            StoreRequest::Query(query) => {
                let result = run_page_query(store, &query);
                Message::QueryCompleted { query, result }
            }
            StoreRequest::DropDatabase { db } => {
                let result = store.drop_database(&db);
                Message::DatabaseDropped { db, result }
            }
            StoreRequest::DropCollection { db, collection } => {
                let result = store.drop_collection(&db, &collection);
                Message::CollectionDropped { db, collection, result }
            }
            StoreRequest::DeleteDocument { db, collection, document } => {
                let result = store.delete_one(&db, &collection, document);
                Message::DocumentDeleted { db, collection, result }
            }
            StoreRequest::InsertDocument { db, collection, document } => {
                let result = store.insert_one(&db, &collection, document);
                Message::DocumentInserted { db, collection, result }
            }
            StoreRequest::UpdateDocument { db, collection, old, new } => {
                let result = store.find_one_and_replace(&db, &collection, old, new);
                Message::DocumentUpdated { db, collection, result }
            }
        }
    }

    /// The completion this request would have produced had it failed with `error`.
    pub fn fail(self, error: StoreError) -> Message {
        match self {
            StoreRequest::Refresh => Message::Refreshed(Err(error)),
            StoreRequest::Query(query) => Message::QueryCompleted { query, result: Err(error) },
            StoreRequest::DropDatabase { db } => Message::DatabaseDropped { db, result: Err(error) },
            StoreRequest::DropCollection { db, collection } => {
                Message::CollectionDropped { db, collection, result: Err(error) }
            }
            StoreRequest::DeleteDocument { db, collection, .. } => {
                Message::DocumentDeleted { db, collection, result: Err(error) }
            }
            StoreRequest::InsertDocument { db, collection, .. } => {
                Message::DocumentInserted { db, collection, result: Err(error) }
            }
            StoreRequest::UpdateDocument { db, collection, .. } => {
                Message::DocumentUpdated { db, collection, result: Err(error) }
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StoreRequest::Refresh => "refresh",
            StoreRequest::Query(_) => "query",
            StoreRequest::DropDatabase { .. } => "drop-database",
            StoreRequest::DropCollection { .. } => "drop-collection",
            StoreRequest::DeleteDocument { .. } => "delete",
            StoreRequest::InsertDocument { .. } => "insert",
            StoreRequest::UpdateDocument { .. } => "update",
        }
    }
}

fn list_everything(store: &dyn DocumentStore) -> Result<Vec<(String, Vec<String>)>, StoreError> {
    let mut listing = Vec::new();
    for db in store.list_database_names()? {
        let collections = store.list_collection_names(&db)?;
        listing.push((db, collections));
    }
    Ok(listing)
}

fn run_page_query(store: &dyn DocumentStore, query: &PageQuery) -> Result<QueryPage, StoreError> {
    let total = store.count(&query.db, &query.collection, query.filter.clone())?;
    let documents =
        store.find(&query.db, &query.collection, query.filter.clone(), query.offset, query.limit)?;
    Ok(QueryPage { documents, total })
}
