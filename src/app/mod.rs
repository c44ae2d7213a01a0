//! Focus-aware router. Owns every panel plus the engine and the selection,
//! feeds each message to whoever it belongs to, and hands over between
//! panels when focus moves.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::message::{Command, EditorRequest, Message};
use crate::mongo::engine::DataEngine;
use crate::mongo::filter::parse_document;
use crate::selection::{Focus, Selection};
use crate::ui::db_col_table::DbColTable;
use crate::ui::doc_list::DocList;
use crate::ui::editor::insert_template;
use crate::ui::json_viewer::JsonViewer;
use crate::ui::modal::{Modal, ModalSlot};


#[derive(Debug, Default)]
pub struct App {
    engine: DataEngine,
    selection: Selection,
    table: DbColTable,
    doc_list: DocList,
    viewer: JsonViewer,
    modal: Modal,
}

impl App {
    pub fn new(page_size: u64) -> Self {
        Self { engine: DataEngine::new(page_size), ..Self::default() }
    }

    /// Work to run before the first key arrives.
    pub fn init(&self) -> Vec<Command> {
        vec![self.engine.refresh_db_and_collections()]
    }

    pub fn engine(&self) -> &DataEngine {
        &self.engine
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn table(&self) -> &DbColTable {
        &self.table
    }

    pub fn doc_list(&self) -> &DocList {
        &self.doc_list
    }

    pub fn viewer(&self) -> &JsonViewer {
        &self.viewer
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    /// Whether the focused panel is collecting free text, in which case
    /// `q` and `Esc` belong to it rather than quitting.
    pub fn captures_text(&self) -> bool {
        match self.selection.focus() {
            Focus::DbColTable => self.table.is_filtering(),
            Focus::DocList => self.doc_list.is_search_focused(),
            _ => false,
        }
    }

    pub fn update(&mut self, message: Message) -> Vec<Command> {
        let before = self.selection.focus();
        let mut commands = match message {
            Message::Key(key) => self.handle_key(key),
            display @ (Message::DisplayError(_)
            | Message::DisplayDropDatabase { .. }
            | Message::DisplayDropCollection { .. }
            | Message::DisplayDeleteDoc(_)
            | Message::DisplayInsertDoc(_)
            | Message::DisplayEditDoc { .. }) => {
                if let Some(slot) = ModalSlot::from_message(display) {
                    self.modal.display(slot);
                }
                Vec::new()
            }
            Message::ExecDropDatabase { db } => {
                self.table.on_exec_drop_database(&self.engine, &mut self.selection);
                vec![self.engine.drop_database(&db)]
            }
            Message::ExecDropCollection { db, collection } => {
                self.table.on_exec_drop_collection(&self.engine, &mut self.selection);
                vec![self.engine.drop_collection(&db, &collection)]
            }
            Message::ExecDeleteDoc(document) => {
                vec![self.doc_list.on_exec_delete(document, &self.engine, &self.selection)]
            }
            Message::ExecInsertDoc(document) => {
                vec![self.engine.insert_document(&self.selection, document)]
            }
            Message::ExecEditDoc { old, new } => {
                vec![self.engine.update_document(&self.selection, old, new)]
            }
            Message::EditorClosed { request, result } => self.editor_closed(request, result),
            completion => self.apply_completion(completion),
        };
        commands.extend(self.hand_off(before));
        commands
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if self.modal.is_displaying() {
            return self.modal.handle_key(key);
        }

        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        let quit_key = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
            && !key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl_c || (quit_key && !self.captures_text()) {
            log::info!("quit requested");
            return vec![Command::Quit];
        }

        match self.selection.focus() {
            Focus::DbColTable => self.table.handle_key(key, &self.engine, &mut self.selection),
            Focus::DocList => self.doc_list.handle_key(key, &self.engine, &mut self.selection),
            Focus::SingleDocViewer => self.viewer.handle_key(key, &mut self.selection),
            Focus::SingleDocEditor | Focus::DocInsert => Vec::new(),
        }
    }

    fn editor_closed(&mut self, request: EditorRequest, result: Result<String, String>) -> Vec<Command> {
        self.selection.clear_doc();
        self.selection.set_focus(Focus::DocList);

        let body = match result {
            Ok(body) => body,
            Err(error) => return vec![Command::Emit(Message::DisplayError(error))],
        };
        let document = match parse_document(&body) {
            Ok(document) => document,
            Err(error) => {
                log::warn!("edited document rejected: {error}");
                return vec![Command::Emit(Message::DisplayError(error.to_string()))];
            }
        };

        let message = match request {
            EditorRequest::Insert { .. } => Message::DisplayInsertDoc(document),
            EditorRequest::Edit { original } => Message::DisplayEditDoc { old: original, new: document },
        };
        vec![Command::Emit(message)]
    }

    fn apply_completion(&mut self, completion: Message) -> Vec<Command> {
        let refreshed = matches!(completion, Message::Refreshed(Ok(_)));
        let mut commands = self.engine.apply(completion);

        if refreshed {
            commands.extend(self.table.reconcile(&self.engine, &mut self.selection));
        }
        self.doc_list.clamp_cursor(self.engine.queried_docs(&self.selection).len());
        commands
    }

    /// Runs after every message: when focus moved, tidies up the panel that
    /// lost it and prepares the one that gained it.
    fn hand_off(&mut self, before: Focus) -> Vec<Command> {
        let after = self.selection.focus();
        if before == after {
            return Vec::new();
        }
        log::debug!("focus {before:?} -> {after:?}");

        match before {
            Focus::DbColTable => self.table.on_blur(&self.engine),
            Focus::SingleDocViewer => {
                self.viewer.clear();
                self.selection.clear_doc();
            }
            Focus::DocList | Focus::SingleDocEditor | Focus::DocInsert => {}
        }

        match after {
            Focus::SingleDocViewer => {
                self.viewer.load(self.engine.selected_document_marshalled(&self.selection));
                Vec::new()
            }
            Focus::SingleDocEditor => match self.selection.doc() {
                Some(original) => {
                    vec![Command::OpenEditor(EditorRequest::Edit { original: original.clone() })]
                }
                None => Vec::new(),
            },
            Focus::DocInsert => {
                vec![Command::OpenEditor(EditorRequest::Insert { template: insert_template() })]
            }
            Focus::DocList => {
                self.doc_list.clamp_cursor(self.engine.queried_docs(&self.selection).len());
                Vec::new()
            }
            Focus::DbColTable => Vec::new(),
        }
    }
}
