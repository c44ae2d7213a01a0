use mongodb::bson::Document;

use crate::message::{Command, Message, PageQuery, QueryPage, StoreRequest};
use crate::mongo::cache::{CollectionCache, ServerCache};
use crate::mongo::filter::marshal_document;
use crate::mongo::store::StoreError;
use crate::mongo::summary::DocSummary;
use crate::selection::Selection;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Owns the cached view of the server and turns user intents into store
/// requests. Cache writes only happen in [`DataEngine::apply`], from completions.
#[derive(Debug)]
pub struct DataEngine {
    cache: ServerCache,
    page_size: u64,
}

impl Default for DataEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl DataEngine {
    pub fn new(page_size: u64) -> Self {
        Self { cache: ServerCache::default(), page_size: page_size.max(1) }
    }

    #[cfg(test)]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    #[cfg(test)]
    pub fn cache(&self) -> &ServerCache {
        &self.cache
    }

    pub fn refresh_db_and_collections(&self) -> Command {
        Command::Store(StoreRequest::Refresh)
    }

    /// Queries the selected collection from the first page.
    pub fn query_collection(&self, selection: &Selection, filter: Document) -> Command {
        match selection.namespace() {
            Some((db, collection)) => self.page_query(db, collection, filter, 0),
            None => no_selection("collection"),
        }
    }

    pub fn next_page(&self, selection: &Selection) -> Option<Command> {
        let (db, collection) = selection.namespace()?;
        let page = self.cache.collection(db, collection)?;
        let next = page.offset + self.page_size;
        if next >= page.total {
            return None;
        }
        Some(self.page_query(db, collection, page.filter.clone(), next))
    }

    pub fn previous_page(&self, selection: &Selection) -> Option<Command> {
        let (db, collection) = selection.namespace()?;
        let page = self.cache.collection(db, collection)?;
        if page.offset == 0 {
            return None;
        }
        let previous = page.offset.saturating_sub(self.page_size);
        Some(self.page_query(db, collection, page.filter.clone(), previous))
    }

    pub fn drop_database(&self, db: &str) -> Command {
        Command::Store(StoreRequest::DropDatabase { db: db.to_string() })
    }

    pub fn drop_collection(&self, db: &str, collection: &str) -> Command {
        Command::Store(StoreRequest::DropCollection {
            db: db.to_string(),
            collection: collection.to_string(),
        })
    }

    pub fn delete_document(&self, selection: &Selection, document: Document) -> Command {
        match selection.namespace() {
            Some((db, collection)) => Command::Store(StoreRequest::DeleteDocument {
                db: db.to_string(),
                collection: collection.to_string(),
                document,
            }),
            None => no_selection("collection"),
        }
    }

    pub fn insert_document(&self, selection: &Selection, document: Document) -> Command {
        match selection.namespace() {
            Some((db, collection)) => Command::Store(StoreRequest::InsertDocument {
                db: db.to_string(),
                collection: collection.to_string(),
                document,
            }),
            None => no_selection("collection"),
        }
    }

    pub fn update_document(&self, selection: &Selection, old: Document, new: Document) -> Command {
        match selection.namespace() {
            Some((db, collection)) => Command::Store(StoreRequest::UpdateDocument {
                db: db.to_string(),
                collection: collection.to_string(),
                old,
                new,
            }),
            None => no_selection("collection"),
        }
    }

    pub fn databases(&self) -> &[String] {
        self.cache.database_names()
    }

    pub fn collections_of(&self, db: &str) -> &[String] {
        self.cache.database(db).map(|database| database.collection_names()).unwrap_or(&[])
    }

    pub fn selected_collections(&self, selection: &Selection) -> &[String] {
        selection.db().map(|db| self.collections_of(db)).unwrap_or(&[])
    }

    pub fn document_summaries(&self, selection: &Selection) -> &[DocSummary] {
        self.selected_page(selection).map(|page| page.summaries.as_slice()).unwrap_or(&[])
    }

    pub fn queried_docs(&self, selection: &Selection) -> &[Document] {
        self.selected_page(selection).map(|page| page.documents.as_slice()).unwrap_or(&[])
    }

    pub fn selected_document_marshalled(&self, selection: &Selection) -> String {
        selection.doc().map(marshal_document).unwrap_or_default()
    }

    /// The page currently cached for the selected collection.
    pub fn selected_page(&self, selection: &Selection) -> Option<&CollectionCache> {
        let (db, collection) = selection.namespace()?;
        self.cache.collection(db, collection)
    }

    /// Folds a store completion into the cache. Returns the follow-up work:
    /// re-queries after writes, a refresh after drops, an error modal on failure.
    pub fn apply(&mut self, message: Message) -> Vec<Command> {
        match message {
            Message::Refreshed(Ok(listing)) => {
                self.cache = ServerCache::from_listing(listing);
                log::debug!("cache rebuilt with {} databases", self.cache.database_names().len());
                Vec::new()
            }
            Message::QueryCompleted { query, result: Ok(page) } => self.store_page(query, page),
            Message::DatabaseDropped { db, result: Ok(()) } => {
                log::debug!("database {db} dropped; refreshing");
                vec![self.refresh_db_and_collections()]
            }
            Message::CollectionDropped { db, collection, result: Ok(()) } => {
                log::debug!("collection {db}.{collection} dropped; refreshing");
                vec![self.refresh_db_and_collections()]
            }
            Message::DatabaseDropped { db, result: Err(error) } => {
                log::error!("drop of database {db} failed: {error}");
                vec![Command::Emit(Message::DisplayError(error.to_string()))]
            }
            Message::CollectionDropped { db, collection, result: Err(error) } => {
                log::error!("drop of collection {db}.{collection} failed: {error}");
                vec![Command::Emit(Message::DisplayError(error.to_string()))]
            }
            Message::DocumentDeleted { db, collection, result: Ok(deleted) } => {
                if deleted == 0 {
                    log::warn!("delete in {db}.{collection} matched no document");
                }
                vec![self.requery(&db, &collection)]
            }
            Message::DocumentInserted { db, collection, result: Ok(()) }
            | Message::DocumentUpdated { db, collection, result: Ok(()) } => {
                vec![self.requery(&db, &collection)]
            }
            Message::Refreshed(Err(error))
            | Message::QueryCompleted { result: Err(error), .. }
            | Message::DocumentDeleted { result: Err(error), .. }
            | Message::DocumentInserted { result: Err(error), .. }
            | Message::DocumentUpdated { result: Err(error), .. } => {
                log::error!("store operation failed: {error}");
                vec![Command::Emit(Message::DisplayError(error.to_string()))]
            }
            other => {
                log::warn!("engine ignored non-completion message {other:?}");
                Vec::new()
            }
        }
    }

    fn store_page(&mut self, query: PageQuery, page: QueryPage) -> Vec<Command> {
        if query.offset > 0 && query.offset >= page.total {
            let last = last_page_offset(page.total, self.page_size);
            log::debug!("offset {} past total {}; moving to {last}", query.offset, page.total);
            return vec![self.page_query(&query.db, &query.collection, query.filter, last)];
        }

        let cache = CollectionCache::new(page.documents, page.total, query.offset, query.filter);
        self.cache.replace_collection(&query.db, &query.collection, cache);
        Vec::new()
    }

    fn requery(&self, db: &str, collection: &str) -> Command {
        let (filter, offset) = self
            .cache
            .collection(db, collection)
            .map(|page| (page.filter.clone(), page.offset))
            .unwrap_or_default();
        self.page_query(db, collection, filter, offset)
    }

    fn page_query(&self, db: &str, collection: &str, filter: Document, offset: u64) -> Command {
        Command::Store(StoreRequest::Query(PageQuery {
            db: db.to_string(),
            collection: collection.to_string(),
            filter,
            offset,
            limit: self.page_size,
        }))
    }
}

fn last_page_offset(total: u64, page_size: u64) -> u64 {
    if total == 0 { 0 } else { (total - 1) / page_size * page_size }
}

fn no_selection(what: &'static str) -> Command {
    Command::Emit(Message::DisplayError(StoreError::NoSelection(what).to_string()))
}
