use mongodb::bson::Document;

/// The panel that currently receives keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    DbColTable,
    DocList,
    SingleDocViewer,
    SingleDocEditor,
    DocInsert,
}

/// What the session considers focused and selected.
///
/// Fields are private so that every transition goes through the setters below:
/// a collection is never selected without its database, and the viewer/editor
/// are never focused without a selected document.
#[derive(Debug, Clone)]
pub struct Selection {
    focus: Focus,
    db: Option<String>,
    collection: Option<String>,
    doc: Option<Document>,
}

impl Default for Selection {
    fn default() -> Self {
        Self { focus: Focus::DbColTable, db: None, collection: None, doc: None }
    }
}

impl Selection {
    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn db(&self) -> Option<&str> {
        self.db.as_deref()
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn doc(&self) -> Option<&Document> {
        self.doc.as_ref()
    }

    /// Both halves of the selected namespace, if a collection is selected.
    pub fn namespace(&self) -> Option<(&str, &str)> {
        Some((self.db.as_deref()?, self.collection.as_deref()?))
    }

    /// Moves focus. Focusing the single-document viewer or editor is refused
    /// when no document is selected; returns whether the focus changed.
    pub fn set_focus(&mut self, focus: Focus) -> bool {
        if matches!(focus, Focus::SingleDocViewer | Focus::SingleDocEditor) && self.doc.is_none() {
            log::warn!("refusing focus {focus:?} without a selected document");
            return false;
        }
        self.focus = focus;
        true
    }

    /// Selects a database and forgets the collection selected under the previous one.
    pub fn set_db(&mut self, db: impl Into<String>) {
        self.db = Some(db.into());
        self.collection = None;
    }

    pub fn clear_db(&mut self) {
        self.db = None;
        self.collection = None;
    }

    pub fn set_collection(&mut self, db: impl Into<String>, collection: impl Into<String>) {
        self.db = Some(db.into());
        self.collection = Some(collection.into());
    }

    pub fn set_doc(&mut self, doc: Document) {
        self.doc = Some(doc);
    }

    pub fn clear_doc(&mut self) {
        self.doc = None;
    }
}
