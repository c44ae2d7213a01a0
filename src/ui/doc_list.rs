use crossterm::event::{KeyCode, KeyEvent};
use mongodb::bson::Document;

use crate::message::{Command, Message};
use crate::mongo::engine::DataEngine;
use crate::mongo::filter::parse_filter;
use crate::selection::{Focus, Selection};

/// One-line summaries of the queried page plus the filter bar above them.
#[derive(Debug, Default)]
pub struct DocList {
    cursor: usize,
    search_focused: bool,
    search: String,
}

impl DocList {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_search_focused(&self) -> bool {
        self.search_focused
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        engine: &DataEngine,
        selection: &mut Selection,
    ) -> Vec<Command> {
        if self.search_focused {
            return self.handle_search_key(key, engine, selection);
        }

        let count = engine.queried_docs(selection).len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if self.cursor == 0 {
                    self.search_focused = true;
                } else {
                    self.cursor -= 1;
                }
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < count {
                    self.cursor += 1;
                }
                Vec::new()
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.cursor = 0;
                Vec::new()
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.cursor = count.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Char('[') => self.turn_page(engine.previous_page(selection)),
            KeyCode::Char(']') => self.turn_page(engine.next_page(selection)),
            KeyCode::Char('i') => {
                selection.set_focus(Focus::DocInsert);
                Vec::new()
            }
            KeyCode::Char('e') => self.open_current(Focus::SingleDocEditor, engine, selection),
            KeyCode::Char('v') => self.open_current(Focus::SingleDocViewer, engine, selection),
            KeyCode::Char('d') => match self.current(engine, selection) {
                Some(doc) => vec![Command::Emit(Message::DisplayDeleteDoc(doc.clone()))],
                None => Vec::new(),
            },
            KeyCode::Left | KeyCode::Char('h') => self.leave(engine, selection),
            _ => Vec::new(),
        }
    }

    /// Steps the cursor back before issuing the delete so it stays in range
    /// once the page shrinks.
    pub fn on_exec_delete(
        &mut self,
        document: Document,
        engine: &DataEngine,
        selection: &Selection,
    ) -> Command {
        self.cursor = self.cursor.saturating_sub(1);
        engine.delete_document(selection, document)
    }

    pub fn clamp_cursor(&mut self, count: usize) {
        self.cursor = self.cursor.min(count.saturating_sub(1));
    }

    fn handle_search_key(
        &mut self,
        key: KeyEvent,
        engine: &DataEngine,
        selection: &mut Selection,
    ) -> Vec<Command> {
        match key.code {
            KeyCode::Enter => match parse_filter(&self.search) {
                Ok(filter) => {
                    log::debug!("filtering with {filter}");
                    self.search_focused = false;
                    self.cursor = 0;
                    vec![engine.query_collection(selection, filter)]
                }
                Err(error) => vec![Command::Emit(Message::DisplayError(error.to_string()))],
            },
            KeyCode::Down | KeyCode::Esc => {
                self.search_focused = false;
                Vec::new()
            }
            KeyCode::Left => self.leave(engine, selection),
            KeyCode::Backspace => {
                self.search.pop();
                Vec::new()
            }
            KeyCode::Char(ch) => {
                self.search.push(ch);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn current<'a>(&self, engine: &'a DataEngine, selection: &Selection) -> Option<&'a Document> {
        engine.queried_docs(selection).get(self.cursor)
    }

    fn open_current(
        &mut self,
        focus: Focus,
        engine: &DataEngine,
        selection: &mut Selection,
    ) -> Vec<Command> {
        if let Some(doc) = self.current(engine, selection) {
            selection.set_doc(doc.clone());
            selection.set_focus(focus);
        }
        Vec::new()
    }

    fn turn_page(&mut self, command: Option<Command>) -> Vec<Command> {
        match command {
            Some(command) => {
                self.cursor = 0;
                vec![command]
            }
            None => Vec::new(),
        }
    }

    /// Back to the navigator. The filter is discarded and the collection
    /// re-queried unfiltered.
    fn leave(&mut self, engine: &DataEngine, selection: &mut Selection) -> Vec<Command> {
        self.search.clear();
        self.search_focused = false;
        self.cursor = 0;
        selection.set_focus(Focus::DbColTable);
        vec![engine.query_collection(selection, Document::new())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{PageQuery, QueryPage, StoreRequest};
    use crossterm::event::KeyModifiers;
    use mongodb::bson::doc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn loaded(documents: Vec<Document>) -> (DataEngine, Selection) {
        let mut engine = DataEngine::default();
        let mut selection = Selection::default();
        selection.set_collection("a", "c");
        selection.set_focus(Focus::DocList);
        let total = documents.len() as u64;
        engine.apply(Message::QueryCompleted {
            query: PageQuery {
                db: String::from("a"),
                collection: String::from("c"),
                filter: doc! {},
                offset: 0,
                limit: 20,
            },
            result: Ok(QueryPage { documents, total }),
        });
        (engine, selection)
    }

    fn type_text(list: &mut DocList, text: &str, engine: &DataEngine, selection: &mut Selection) {
        for ch in text.chars() {
            list.handle_key(key(KeyCode::Char(ch)), engine, selection);
        }
    }

    #[test]
    fn up_from_top_focuses_search_bar() {
        let (engine, mut selection) = loaded(vec![doc! { "_id": 1 }, doc! { "_id": 2 }]);
        let mut list = DocList::default();
        list.handle_key(key(KeyCode::Down), &engine, &mut selection);
        list.handle_key(key(KeyCode::Up), &engine, &mut selection);
        assert!(!list.is_search_focused());
        list.handle_key(key(KeyCode::Up), &engine, &mut selection);
        assert!(list.is_search_focused());
    }

    #[test]
    fn search_bar_takes_letters_that_are_bindings_elsewhere() {
        let (engine, mut selection) = loaded(vec![doc! { "_id": 1 }]);
        let mut list = DocList::default();
        list.handle_key(key(KeyCode::Up), &engine, &mut selection);
        type_text(&mut list, "hjkdq", &engine, &mut selection);
        assert_eq!(list.search(), "hjkdq");
        assert_eq!(selection.focus(), Focus::DocList);
    }

    #[test]
    fn enter_queries_with_parsed_filter() {
        let (engine, mut selection) = loaded(vec![doc! { "x": "hi" }]);
        let mut list = DocList::default();
        list.handle_key(key(KeyCode::Up), &engine, &mut selection);
        type_text(&mut list, r#"{"x":"hi"}"#, &engine, &mut selection);

        let commands = list.handle_key(key(KeyCode::Enter), &engine, &mut selection);
        match commands.as_slice() {
            [Command::Store(StoreRequest::Query(query))] => {
                assert_eq!(query.filter, doc! { "x": "hi" });
                assert_eq!(query.offset, 0);
            }
            other => panic!("unexpected commands: {other:?}"),
        }
        assert!(!list.is_search_focused());
    }

    #[test]
    fn malformed_filter_shows_error_and_keeps_bar() {
        let (engine, mut selection) = loaded(vec![doc! { "_id": 1 }]);
        let mut list = DocList::default();
        list.handle_key(key(KeyCode::Up), &engine, &mut selection);
        type_text(&mut list, "{oops", &engine, &mut selection);

        let commands = list.handle_key(key(KeyCode::Enter), &engine, &mut selection);
        assert!(matches!(commands.as_slice(), [Command::Emit(Message::DisplayError(_))]));
        assert!(list.is_search_focused());
        assert_eq!(list.search(), "{oops");
    }

    #[test]
    fn view_and_edit_select_document_under_cursor() {
        let (engine, mut selection) = loaded(vec![doc! { "_id": 1 }, doc! { "_id": 2 }]);
        let mut list = DocList::default();
        list.handle_key(key(KeyCode::End), &engine, &mut selection);
        list.handle_key(key(KeyCode::Char('v')), &engine, &mut selection);
        assert_eq!(selection.focus(), Focus::SingleDocViewer);
        assert_eq!(selection.doc(), Some(&doc! { "_id": 2 }));

        selection.set_focus(Focus::DocList);
        list.handle_key(key(KeyCode::Char('e')), &engine, &mut selection);
        assert_eq!(selection.focus(), Focus::SingleDocEditor);
    }

    #[test]
    fn view_on_empty_page_does_nothing() {
        let (engine, mut selection) = loaded(vec![]);
        let mut list = DocList::default();
        list.handle_key(key(KeyCode::Char('v')), &engine, &mut selection);
        assert_eq!(selection.focus(), Focus::DocList);
        assert!(list.handle_key(key(KeyCode::Char('d')), &engine, &mut selection).is_empty());
    }

    #[test]
    fn delete_prompts_for_current_document() {
        let (engine, mut selection) = loaded(vec![doc! { "_id": 7 }]);
        let mut list = DocList::default();
        let commands = list.handle_key(key(KeyCode::Char('d')), &engine, &mut selection);
        assert!(matches!(
            commands.as_slice(),
            [Command::Emit(Message::DisplayDeleteDoc(doc))] if doc == &doc! { "_id": 7 }
        ));
    }

    #[test]
    fn exec_delete_steps_cursor_back() {
        let (engine, mut selection) = loaded(vec![doc! { "_id": 1 }, doc! { "_id": 2 }]);
        let mut list = DocList::default();
        list.handle_key(key(KeyCode::Down), &engine, &mut selection);
        let command = list.on_exec_delete(doc! { "_id": 2 }, &engine, &selection);
        assert_eq!(list.cursor(), 0);
        assert!(matches!(command, Command::Store(StoreRequest::DeleteDocument { .. })));
    }

    #[test]
    fn leaving_resets_filter_and_requeries() {
        let (engine, mut selection) = loaded(vec![doc! { "_id": 1 }]);
        let mut list = DocList::default();
        list.handle_key(key(KeyCode::Up), &engine, &mut selection);
        type_text(&mut list, "{x:1}", &engine, &mut selection);

        let commands = list.handle_key(key(KeyCode::Left), &engine, &mut selection);
        assert_eq!(selection.focus(), Focus::DbColTable);
        assert_eq!(list.search(), "");
        assert!(!list.is_search_focused());
        match commands.as_slice() {
            [Command::Store(StoreRequest::Query(query))] => assert_eq!(query.filter, doc! {}),
            other => panic!("unexpected commands: {other:?}"),
        }
    }

    #[test]
    fn insert_focuses_insert_flow() {
        let (engine, mut selection) = loaded(vec![]);
        let mut list = DocList::default();
        list.handle_key(key(KeyCode::Char('i')), &engine, &mut selection);
        assert_eq!(selection.focus(), Focus::DocInsert);
    }

    #[test]
    fn clamp_follows_shrinking_page() {
        let mut list = DocList { cursor: 5, ..DocList::default() };
        list.clamp_cursor(3);
        assert_eq!(list.cursor(), 2);
        list.clamp_cursor(0);
        assert_eq!(list.cursor(), 0);
    }
}
