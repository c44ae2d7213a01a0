use crossterm::event::{KeyCode, KeyEvent};
use mongodb::bson::Document;

use crate::message::{Command, Message};
use crate::mongo::engine::DataEngine;
use crate::selection::{Focus, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Databases,
    Collections,
}

/// Two-column database/collection navigator.
///
/// Cursors index the *visible* (filtered) lists. A filter is only accepted
/// when it leaves at least one visible entry.
#[derive(Debug)]
pub struct DbColTable {
    column: Column,
    db_cursor: usize,
    collection_cursor: usize,
    db_filter: String,
    collection_filter: String,
    search: Option<String>,
}

impl Default for DbColTable {
    fn default() -> Self {
        Self {
            column: Column::Databases,
            db_cursor: 0,
            collection_cursor: 0,
            db_filter: String::new(),
            collection_filter: String::new(),
            search: None,
        }
    }
}

pub fn filter_names<'a>(names: &'a [String], filter: &str) -> Vec<&'a str> {
    let needle = filter.to_lowercase();
    names
        .iter()
        .filter(|name| needle.is_empty() || name.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}

impl DbColTable {
    pub fn column(&self) -> Column {
        self.column
    }

    pub fn db_cursor(&self) -> usize {
        self.db_cursor
    }

    pub fn collection_cursor(&self) -> usize {
        self.collection_cursor
    }

    pub fn db_filter(&self) -> &str {
        &self.db_filter
    }

    pub fn collection_filter(&self) -> &str {
        &self.collection_filter
    }

    pub fn search_buffer(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn is_filtering(&self) -> bool {
        self.search.is_some()
    }

    pub fn visible_databases<'a>(&self, engine: &'a DataEngine) -> Vec<&'a str> {
        filter_names(engine.databases(), &self.db_filter)
    }

    pub fn visible_collections<'a>(&self, engine: &'a DataEngine) -> Vec<&'a str> {
        match self.current_db(engine) {
            Some(db) => filter_names(engine.collections_of(db), &self.collection_filter),
            None => Vec::new(),
        }
    }

    pub fn current_db<'a>(&self, engine: &'a DataEngine) -> Option<&'a str> {
        self.visible_databases(engine).get(self.db_cursor).copied()
    }

    pub fn current_collection<'a>(&self, engine: &'a DataEngine) -> Option<&'a str> {
        self.visible_collections(engine).get(self.collection_cursor).copied()
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        engine: &DataEngine,
        selection: &mut Selection,
    ) -> Vec<Command> {
        if self.search.is_some() {
            return self.handle_filter_key(key, engine, selection);
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, engine, selection),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, engine, selection),
            KeyCode::Home | KeyCode::Char('g') => self.jump(0, engine, selection),
            KeyCode::End | KeyCode::Char('G') => self.jump(usize::MAX, engine, selection),
            KeyCode::Right | KeyCode::Char('l') => self.enter_collections(engine, selection),
            KeyCode::Left | KeyCode::Char('h') => self.leave_collections(engine, selection),
            KeyCode::Enter => {
                if self.column == Column::Collections && self.current_collection(engine).is_some() {
                    selection.set_focus(Focus::DocList);
                }
                Vec::new()
            }
            KeyCode::Char('d') => self.prompt_drop(engine),
            KeyCode::Char('/') => {
                self.search = Some(self.active_filter().to_string());
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Leaving the panel ends filter mode and drops both filters, keeping the
    /// cursors on the same entries.
    pub fn on_blur(&mut self, engine: &DataEngine) {
        self.search = None;
        let db = self.current_db(engine).map(str::to_string);
        let collection = self.current_collection(engine).map(str::to_string);
        self.db_filter.clear();
        self.collection_filter.clear();

        if let Some(db) = db {
            self.db_cursor = position_of(engine.databases(), &db);
            if let Some(collection) = collection {
                self.collection_cursor = position_of(engine.collections_of(&db), &collection);
            }
        }
    }

    pub fn on_exec_drop_collection(&mut self, engine: &DataEngine, selection: &mut Selection) {
        let remaining = self.visible_collections(engine).len();
        self.collection_cursor = self.collection_cursor.saturating_sub(1);
        if remaining == 1 {
            self.column = Column::Databases;
            self.collection_filter.clear();
            self.collection_cursor = 0;
            if let Some(db) = self.current_db(engine) {
                selection.set_db(db);
            }
        }
    }

    pub fn on_exec_drop_database(&mut self, engine: &DataEngine, selection: &mut Selection) {
        let remaining = self.visible_databases(engine).len();
        self.db_cursor = self.db_cursor.saturating_sub(1);
        self.collection_cursor = self.collection_cursor.saturating_sub(1);
        self.column = Column::Databases;
        if remaining == 1 {
            selection.clear_db();
        }
    }

    /// Brings cursors, filters and the selection back in line with a freshly
    /// rebuilt cache. Re-queries the collection under the cursor because the
    /// rebuild discarded its page.
    pub fn reconcile(&mut self, engine: &DataEngine, selection: &mut Selection) -> Vec<Command> {
        if self.visible_databases(engine).is_empty() {
            self.db_filter.clear();
        }
        self.db_cursor = clamp(self.db_cursor, self.visible_databases(engine).len());

        if self.column == Column::Collections {
            if self.visible_collections(engine).is_empty() {
                self.collection_filter.clear();
            }
            if self.visible_collections(engine).is_empty() {
                self.column = Column::Databases;
            }
        }
        self.collection_cursor = clamp(self.collection_cursor, self.visible_collections(engine).len());

        match self.column {
            Column::Databases => {
                self.select_db(engine, selection);
                Vec::new()
            }
            Column::Collections => self.select_collection(engine, selection, true),
        }
    }

    fn active_filter(&self) -> &str {
        match self.column {
            Column::Databases => &self.db_filter,
            Column::Collections => &self.collection_filter,
        }
    }

    fn handle_filter_key(
        &mut self,
        key: KeyEvent,
        engine: &DataEngine,
        selection: &mut Selection,
    ) -> Vec<Command> {
        let Some(buffer) = self.search.as_ref() else {
            return Vec::new();
        };

        let candidate = match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('/') => {
                self.search = None;
                return Vec::new();
            }
            KeyCode::Backspace => {
                let mut candidate = buffer.clone();
                candidate.pop();
                candidate
            }
            KeyCode::Char(ch) => format!("{buffer}{ch}"),
            _ => return Vec::new(),
        };

        self.apply_filter(candidate, engine, selection)
    }

    fn apply_filter(
        &mut self,
        candidate: String,
        engine: &DataEngine,
        selection: &mut Selection,
    ) -> Vec<Command> {
        let visible = match self.column {
            Column::Databases => filter_names(engine.databases(), &candidate).len(),
            Column::Collections => match self.current_db(engine) {
                Some(db) => filter_names(engine.collections_of(db), &candidate).len(),
                None => 0,
            },
        };
        if visible == 0 {
            log::debug!("filter {candidate:?} matches nothing; keeping previous");
            return Vec::new();
        }

        self.search = Some(candidate.clone());
        match self.column {
            Column::Databases => {
                self.db_filter = candidate;
                self.db_cursor = self.db_cursor.min(visible - 1);
                self.select_db(engine, selection);
                Vec::new()
            }
            Column::Collections => {
                self.collection_filter = candidate;
                self.collection_cursor = self.collection_cursor.min(visible - 1);
                self.select_collection(engine, selection, false)
            }
        }
    }

    fn move_cursor(&mut self, delta: isize, engine: &DataEngine, selection: &mut Selection) -> Vec<Command> {
        let current = match self.column {
            Column::Databases => self.db_cursor,
            Column::Collections => self.collection_cursor,
        };
        let target = current.saturating_add_signed(delta);
        self.jump(target, engine, selection)
    }

    fn jump(&mut self, target: usize, engine: &DataEngine, selection: &mut Selection) -> Vec<Command> {
        match self.column {
            Column::Databases => {
                let len = self.visible_databases(engine).len();
                let next = clamp(target, len);
                if next != self.db_cursor {
                    self.db_cursor = next;
                    self.collection_cursor = 0;
                }
                self.select_db(engine, selection);
                Vec::new()
            }
            Column::Collections => {
                let len = self.visible_collections(engine).len();
                self.collection_cursor = clamp(target, len);
                self.select_collection(engine, selection, false)
            }
        }
    }

    fn enter_collections(&mut self, engine: &DataEngine, selection: &mut Selection) -> Vec<Command> {
        if self.column == Column::Collections || self.visible_collections(engine).is_empty() {
            return Vec::new();
        }
        self.column = Column::Collections;
        self.collection_cursor = 0;
        self.select_collection(engine, selection, true)
    }

    fn leave_collections(&mut self, engine: &DataEngine, selection: &mut Selection) -> Vec<Command> {
        if self.column == Column::Databases {
            return Vec::new();
        }
        self.column = Column::Databases;
        self.collection_filter.clear();
        self.collection_cursor = 0;
        if let Some(db) = self.current_db(engine) {
            selection.set_db(db);
        }
        Vec::new()
    }

    fn prompt_drop(&self, engine: &DataEngine) -> Vec<Command> {
        let Some(db) = self.current_db(engine) else {
            return Vec::new();
        };
        let message = match self.column {
            Column::Databases => Message::DisplayDropDatabase { db: db.to_string() },
            Column::Collections => match self.current_collection(engine) {
                Some(collection) => Message::DisplayDropCollection {
                    db: db.to_string(),
                    collection: collection.to_string(),
                },
                None => return Vec::new(),
            },
        };
        vec![Command::Emit(message)]
    }

    fn select_db(&self, engine: &DataEngine, selection: &mut Selection) {
        match self.current_db(engine) {
            Some(db) if selection.db() != Some(db) || selection.collection().is_some() => {
                selection.set_db(db)
            }
            Some(_) => {}
            None => selection.clear_db(),
        }
    }

    /// Points the selection at the collection under the cursor and queries it
    /// when it changed (or always, with `force`).
    fn select_collection(
        &self,
        engine: &DataEngine,
        selection: &mut Selection,
        force: bool,
    ) -> Vec<Command> {
        let (Some(db), Some(collection)) = (self.current_db(engine), self.current_collection(engine))
        else {
            return Vec::new();
        };
        if !force && selection.namespace() == Some((db, collection)) {
            return Vec::new();
        }
        selection.set_collection(db, collection);
        vec![engine.query_collection(selection, Document::new())]
    }
}

fn clamp(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

fn position_of(names: &[String], name: &str) -> usize {
    names.iter().position(|candidate| candidate == name).unwrap_or(0)
}
