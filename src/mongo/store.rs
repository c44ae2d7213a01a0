use std::time::Duration;

use mongodb::bson::Document;
use mongodb::sync::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("no document matched the original; it may have been changed or removed")]
    NoMatch,

    #[error("no {0} selected")]
    NoSelection(&'static str),

    #[error("background worker failed: {0}")]
    Join(String),

    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

/// Everything the session needs from the server.
///
/// Calls block; the executor runs them off the event loop.
pub trait DocumentStore: Send + Sync {
    fn list_database_names(&self) -> Result<Vec<String>, StoreError>;

    fn list_collection_names(&self, db: &str) -> Result<Vec<String>, StoreError>;

    fn find(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>, StoreError>;

    fn count(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError>;

    fn drop_database(&self, db: &str) -> Result<(), StoreError>;

    fn drop_collection(&self, db: &str, collection: &str) -> Result<(), StoreError>;

    /// Deletes the first document equal to `document`; returns how many were removed.
    fn delete_one(&self, db: &str, collection: &str, document: Document) -> Result<u64, StoreError>;

    fn insert_one(&self, db: &str, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Atomically swaps the document equal to `old` for `new`.
    /// Fails with [`StoreError::NoMatch`] when nothing equals `old`.
    fn find_one_and_replace(
        &self,
        db: &str,
        collection: &str,
        old: Document,
        new: Document,
    ) -> Result<(), StoreError>;
}

pub struct MongoStore {
    client: Client,
    max_time: Duration,
}

impl MongoStore {
    pub fn new(client: Client, max_time: Duration) -> Self {
        Self { client, max_time }
    }

    fn collection(&self, db: &str, collection: &str) -> mongodb::sync::Collection<Document> {
        self.client.database(db).collection::<Document>(collection)
    }
}

impl DocumentStore for MongoStore {
    fn list_database_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.client.list_database_names().run()?)
    }

    fn list_collection_names(&self, db: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.client.database(db).list_collection_names().run()?)
    }

    fn find(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let handle = self.collection(db, collection);
        let mut builder = handle.find(filter).max_time(self.max_time);
        if skip > 0 {
            builder = builder.skip(skip);
        }
        let limit_capped = limit.min(i64::MAX as u64) as i64;
        builder = builder.limit(limit_capped);

        let cursor = builder.run()?;
        let mut documents = Vec::new();
        for result in cursor.into_iter().take(limit_capped as usize) {
            documents.push(result?);
        }

        log::debug!("find {db}.{collection} skip={skip}: {} documents", documents.len());
        Ok(documents)
    }

    fn count(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        Ok(self.collection(db, collection).count_documents(filter).max_time(self.max_time).run()?)
    }

    fn drop_database(&self, db: &str) -> Result<(), StoreError> {
        self.client.database(db).drop().run()?;
        log::info!("dropped database {db}");
        Ok(())
    }

    fn drop_collection(&self, db: &str, collection: &str) -> Result<(), StoreError> {
        self.collection(db, collection).drop().run()?;
        log::info!("dropped collection {db}.{collection}");
        Ok(())
    }

    fn delete_one(&self, db: &str, collection: &str, document: Document) -> Result<u64, StoreError> {
        let result = self.collection(db, collection).delete_one(document).run()?;
        Ok(result.deleted_count)
    }

    fn insert_one(&self, db: &str, collection: &str, document: Document) -> Result<(), StoreError> {
        self.collection(db, collection).insert_one(document).run()?;
        Ok(())
    }

    fn find_one_and_replace(
        &self,
        db: &str,
        collection: &str,
        old: Document,
        new: Document,
    ) -> Result<(), StoreError> {
        let previous = self
            .collection(db, collection)
            .find_one_and_replace(old, new)
            .max_time(self.max_time)
            .run()?;
        match previous {
            Some(_) => Ok(()),
            None => Err(StoreError::NoMatch),
        }
    }
}
