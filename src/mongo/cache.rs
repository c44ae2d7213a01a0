use std::collections::HashMap;

use mongodb::bson::Document;

use crate::mongo::summary::{DocSummary, summarize};

/// Databases known to the session, each with its collections and the last
/// queried page per collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerCache {
    databases: HashMap<String, DatabaseCache>,
    sorted_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseCache {
    collections: HashMap<String, CollectionCache>,
    sorted_names: Vec<String>,
}

/// One queried page of a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionCache {
    pub documents: Vec<Document>,
    pub summaries: Vec<DocSummary>,
    pub total: u64,
    pub offset: u64,
    pub filter: Document,
}

impl ServerCache {
    /// Builds a fresh cache from a `(database, collections)` listing, every
    /// collection starting out with an empty page.
    pub fn from_listing(listing: Vec<(String, Vec<String>)>) -> Self {
        let mut cache = Self::default();
        for (db_name, collections) in listing {
            cache.databases.insert(db_name, DatabaseCache::from_names(collections));
        }
        cache.rebuild_sorted();
        cache
    }

    pub fn database_names(&self) -> &[String] {
        &self.sorted_names
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseCache> {
        self.databases.get(name)
    }

    pub fn collection(&self, db: &str, collection: &str) -> Option<&CollectionCache> {
        self.databases.get(db)?.collections.get(collection)
    }

    /// Replaces the page of `db.collection`, creating the entries when the
    /// listing has not seen them yet.
    pub fn replace_collection(&mut self, db: &str, collection: &str, page: CollectionCache) {
        if !self.databases.contains_key(db) {
            self.databases.insert(db.to_string(), DatabaseCache::default());
            self.rebuild_sorted();
        }
        if let Some(database) = self.databases.get_mut(db) {
            database.replace_collection(collection, page);
        }
    }

    fn rebuild_sorted(&mut self) {
        let mut names: Vec<String> = self.databases.keys().cloned().collect();
        names.sort_unstable();
        self.sorted_names = names;
    }

    #[cfg(test)]
    pub(crate) fn sorted_lists_match_keys(&self) -> bool {
        let mut keys: Vec<&String> = self.databases.keys().collect();
        keys.sort_unstable();
        keys.into_iter().eq(self.sorted_names.iter())
            && self.databases.values().all(DatabaseCache::sorted_list_matches_keys)
    }
}

impl DatabaseCache {
    fn from_names(names: Vec<String>) -> Self {
        let mut cache = Self::default();
        for name in names {
            cache.collections.insert(name, CollectionCache::default());
        }
        cache.rebuild_sorted();
        cache
    }

    pub fn collection_names(&self) -> &[String] {
        &self.sorted_names
    }

    fn replace_collection(&mut self, collection: &str, page: CollectionCache) {
        let is_new = self.collections.insert(collection.to_string(), page).is_none();
        if is_new {
            self.rebuild_sorted();
        }
    }

    fn rebuild_sorted(&mut self) {
        let mut names: Vec<String> = self.collections.keys().cloned().collect();
        names.sort_unstable();
        self.sorted_names = names;
    }

    #[cfg(test)]
    fn sorted_list_matches_keys(&self) -> bool {
        let mut keys: Vec<&String> = self.collections.keys().collect();
        keys.sort_unstable();
        keys.into_iter().eq(self.sorted_names.iter())
    }
}

impl CollectionCache {
    pub fn new(documents: Vec<Document>, total: u64, offset: u64, filter: Document) -> Self {
        let summaries = summarize(&documents);
        Self { documents, summaries, total, offset, filter }
    }
}
