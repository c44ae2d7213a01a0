use crossterm::event::{KeyCode, KeyEvent};
use mongodb::bson::Document;

use crate::message::{Command, Message};

#[derive(Debug, Clone, PartialEq)]
pub enum ModalSlot {
    Error(String),
    DropDatabase { db: String },
    DropCollection { db: String, collection: String },
    DeleteDoc(Document),
    InsertDoc(Document),
    EditDoc { old: Document, new: Document },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Yes,
    No,
}

impl ModalSlot {
    /// Converts a `Display*` message into the slot it asks for.
    pub fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::DisplayError(text) => Some(Self::Error(text)),
            Message::DisplayDropDatabase { db } => Some(Self::DropDatabase { db }),
            Message::DisplayDropCollection { db, collection } => {
                Some(Self::DropCollection { db, collection })
            }
            Message::DisplayDeleteDoc(doc) => Some(Self::DeleteDoc(doc)),
            Message::DisplayInsertDoc(doc) => Some(Self::InsertDoc(doc)),
            Message::DisplayEditDoc { old, new } => Some(Self::EditDoc { old, new }),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ModalSlot::Error(_) => "Error",
            ModalSlot::DropDatabase { .. } => "Drop database",
            ModalSlot::DropCollection { .. } => "Drop collection",
            ModalSlot::DeleteDoc(_) => "Delete document",
            ModalSlot::InsertDoc(_) => "Insert document",
            ModalSlot::EditDoc { .. } => "Edit document",
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            ModalSlot::Error(text) => text.clone(),
            ModalSlot::DropDatabase { db } => {
                format!("Are you sure you would like to drop the database {db}?")
            }
            ModalSlot::DropCollection { collection, .. } => {
                format!("Are you sure you would like to drop the collection {collection}?")
            }
            ModalSlot::DeleteDoc(_) => String::from("Are you sure you would like to delete this document?"),
            ModalSlot::InsertDoc(_) => String::from("Would you like to insert this document?"),
            ModalSlot::EditDoc { .. } => String::from("Would you like to save your changes to this document?"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ModalSlot::Error(_))
    }

    fn default_choice(&self) -> Choice {
        match self {
            ModalSlot::InsertDoc(_) | ModalSlot::EditDoc { .. } => Choice::Yes,
            _ => Choice::No,
        }
    }

    fn into_exec(self) -> Option<Message> {
        match self {
            ModalSlot::Error(_) => None,
            ModalSlot::DropDatabase { db } => Some(Message::ExecDropDatabase { db }),
            ModalSlot::DropCollection { db, collection } => {
                Some(Message::ExecDropCollection { db, collection })
            }
            ModalSlot::DeleteDoc(doc) => Some(Message::ExecDeleteDoc(doc)),
            ModalSlot::InsertDoc(doc) => Some(Message::ExecInsertDoc(doc)),
            ModalSlot::EditDoc { old, new } => Some(Message::ExecEditDoc { old, new }),
        }
    }
}

/// Single-slot confirmation dialog.
#[derive(Debug)]
pub struct Modal {
    slot: Option<ModalSlot>,
    choice: Choice,
}

impl Default for Modal {
    fn default() -> Self {
        Self { slot: None, choice: Choice::No }
    }
}

impl Modal {
    pub fn is_displaying(&self) -> bool {
        self.slot.is_some()
    }

    pub fn slot(&self) -> Option<&ModalSlot> {
        self.slot.as_ref()
    }

    pub fn choice(&self) -> Choice {
        self.choice
    }

    /// Fills the slot; refused (returns `false`) while another dialog is pending.
    pub fn display(&mut self, slot: ModalSlot) -> bool {
        if let Some(current) = &self.slot {
            log::warn!("modal busy with {:?}; dropping {}", current.title(), slot.title());
            return false;
        }
        self.choice = slot.default_choice();
        self.slot = Some(slot);
        true
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Command> {
        let Some(slot) = self.slot.as_ref() else {
            return Vec::new();
        };

        match key.code {
            KeyCode::Left | KeyCode::Char('h') if !slot.is_error() => {
                self.choice = Choice::Yes;
                Vec::new()
            }
            KeyCode::Right | KeyCode::Char('l') if !slot.is_error() => {
                self.choice = Choice::No;
                Vec::new()
            }
            KeyCode::Enter => {
                let confirmed = self.choice == Choice::Yes;
                match self.slot.take().and_then(ModalSlot::into_exec) {
                    Some(exec) if confirmed => vec![Command::Emit(exec)],
                    _ => Vec::new(),
                }
            }
            _ => {
                self.slot = None;
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use mongodb::bson::doc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn drop_collection() -> ModalSlot {
        ModalSlot::DropCollection { db: String::from("orders"), collection: String::from("c") }
    }

    #[test]
    fn destructive_slots_default_to_no() {
        let mut modal = Modal::default();
        modal.display(drop_collection());
        assert_eq!(modal.choice(), Choice::No);
        assert!(modal.handle_key(key(KeyCode::Enter)).is_empty());
        assert!(!modal.is_displaying());
    }

    #[test]
    fn insert_and_edit_default_to_yes() {
        let mut modal = Modal::default();
        modal.display(ModalSlot::InsertDoc(doc! { "_id": 1 }));
        assert_eq!(modal.choice(), Choice::Yes);
        let commands = modal.handle_key(key(KeyCode::Enter));
        assert!(matches!(commands.as_slice(), [Command::Emit(Message::ExecInsertDoc(_))]));
    }

    #[test]
    fn confirming_yes_emits_exec_once() {
        let mut modal = Modal::default();
        modal.display(drop_collection());
        modal.handle_key(key(KeyCode::Left));
        let commands = modal.handle_key(key(KeyCode::Enter));
        match commands.as_slice() {
            [Command::Emit(Message::ExecDropCollection { db, collection })] => {
                assert_eq!((db.as_str(), collection.as_str()), ("orders", "c"));
            }
            other => panic!("unexpected commands: {other:?}"),
        }
        assert!(modal.handle_key(key(KeyCode::Enter)).is_empty());
    }

    #[test]
    fn other_keys_dismiss_without_command() {
        let mut modal = Modal::default();
        modal.display(ModalSlot::DeleteDoc(doc! { "_id": 1 }));
        modal.handle_key(key(KeyCode::Char('h')));
        assert!(modal.handle_key(key(KeyCode::Char('x'))).is_empty());
        assert!(!modal.is_displaying());
    }

    #[test]
    fn second_display_is_refused() {
        let mut modal = Modal::default();
        assert!(modal.display(ModalSlot::Error(String::from("first"))));
        assert!(!modal.display(drop_collection()));
        assert_eq!(modal.slot(), Some(&ModalSlot::Error(String::from("first"))));
    }

    #[test]
    fn error_clears_on_enter() {
        let mut modal = Modal::default();
        modal.display(ModalSlot::Error(String::from("boom")));
        assert!(modal.handle_key(key(KeyCode::Enter)).is_empty());
        assert!(!modal.is_displaying());
    }

    #[test]
    fn prompt_names_the_collection() {
        assert_eq!(
            drop_collection().prompt(),
            "Are you sure you would like to drop the collection c?"
        );
    }
}
