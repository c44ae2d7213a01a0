#![cfg(test)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use mongodb::bson::Document;

use crate::mongo::store::{DocumentStore, StoreError};

type Collections = BTreeMap<String, Vec<Document>>;

/// In-memory stand-in for a server. Filters match by top-level equality.
#[derive(Default)]
pub struct MemoryStore {
    databases: Mutex<BTreeMap<String, Collections>>,
    unreachable: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(self, db: &str, collection: &str, documents: Vec<Document>) -> Self {
        self.databases
            .lock()
            .expect("store lock poisoned")
            .entry(db.to_string())
            .or_default()
            .insert(collection.to_string(), documents);
        self
    }

    /// Makes every subsequent call fail as if the server stopped answering.
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().expect("store lock poisoned") = unreachable;
    }

    pub fn documents(&self, db: &str, collection: &str) -> Vec<Document> {
        self.databases
            .lock()
            .expect("store lock poisoned")
            .get(db)
            .and_then(|collections| collections.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if *self.unreachable.lock().expect("store lock poisoned") {
            Err(StoreError::Timeout(Duration::from_secs(5)))
        } else {
            Ok(())
        }
    }

    fn with_collection_mut<R>(
        &self,
        db: &str,
        collection: &str,
        f: impl FnOnce(&mut Vec<Document>) -> R,
    ) -> Result<R, StoreError> {
        self.check_reachable()?;
        let mut guard = self.databases.lock().expect("store lock poisoned");
        let documents =
            guard.entry(db.to_string()).or_default().entry(collection.to_string()).or_default();
        Ok(f(documents))
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| document.get(key) == Some(value))
}

impl DocumentStore for MemoryStore {
    fn list_database_names(&self) -> Result<Vec<String>, StoreError> {
        self.check_reachable()?;
        Ok(self.databases.lock().expect("store lock poisoned").keys().cloned().collect())
    }

    fn list_collection_names(&self, db: &str) -> Result<Vec<String>, StoreError> {
        self.check_reachable()?;
        Ok(self
            .databases
            .lock()
            .expect("store lock poisoned")
            .get(db)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn find(
        &self,
        db: &str,
        collection: &str,
        filter: Document,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>, StoreError> {
        self.with_collection_mut(db, collection, |documents| {
            documents
                .iter()
                .filter(|document| matches(document, &filter))
                .skip(skip as usize)
                .take(limit as usize)
                .cloned()
                .collect()
        })
    }

    fn count(&self, db: &str, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.with_collection_mut(db, collection, |documents| {
            documents.iter().filter(|document| matches(document, &filter)).count() as u64
        })
    }

    fn drop_database(&self, db: &str) -> Result<(), StoreError> {
        self.check_reachable()?;
        self.databases.lock().expect("store lock poisoned").remove(db);
        Ok(())
    }

    fn drop_collection(&self, db: &str, collection: &str) -> Result<(), StoreError> {
        self.check_reachable()?;
        let mut guard = self.databases.lock().expect("store lock poisoned");
        if let Some(collections) = guard.get_mut(db) {
            collections.remove(collection);
            if collections.is_empty() {
                guard.remove(db);
            }
        }
        Ok(())
    }

    fn delete_one(&self, db: &str, collection: &str, document: Document) -> Result<u64, StoreError> {
        self.with_collection_mut(db, collection, |documents| {
            match documents.iter().position(|candidate| matches(candidate, &document)) {
                Some(index) => {
                    documents.remove(index);
                    1
                }
                None => 0,
            }
        })
    }

    fn insert_one(&self, db: &str, collection: &str, document: Document) -> Result<(), StoreError> {
        self.with_collection_mut(db, collection, |documents| documents.push(document))
    }

    fn find_one_and_replace(
        &self,
        db: &str,
        collection: &str,
        old: Document,
        new: Document,
    ) -> Result<(), StoreError> {
        self.with_collection_mut(db, collection, |documents| {
            match documents.iter().position(|candidate| matches(candidate, &old)) {
                Some(index) => {
                    documents[index] = new;
                    Ok(())
                }
                None => Err(StoreError::NoMatch),
            }
        })?
    }
}
