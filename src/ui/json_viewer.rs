use crossterm::event::{KeyCode, KeyEvent};
use ratatui::text::Line;

use crate::message::Command;
use crate::selection::{Focus, Selection};
use crate::ui::highlight::highlight_json;

/// Read-only, scrollable view of the selected document.
#[derive(Debug, Default)]
pub struct JsonViewer {
    text: String,
    lines: Vec<Line<'static>>,
    scroll: u16,
}

impl JsonViewer {
    pub fn load(&mut self, text: String) {
        self.lines = highlight_json(&text);
        self.text = text;
        self.scroll = 0;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[Line<'static>] {
        &self.lines
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn handle_key(&mut self, key: KeyEvent, selection: &mut Selection) -> Vec<Command> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                let last = u16::try_from(self.lines.len().saturating_sub(1)).unwrap_or(u16::MAX);
                self.scroll = self.scroll.saturating_add(1).min(last);
            }
            KeyCode::Char('b') => {
                selection.set_focus(Focus::DocList);
            }
            _ => {}
        }
        Vec::new()
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

    #[test]
    fn scroll_stays_within_document() {
        let mut viewer = JsonViewer::default();
        viewer.load(String::from("{\n  \"a\": 1\n}"));
        let mut selection = Selection::default();

        viewer.handle_key(key(KeyCode::Up), &mut selection);
        assert_eq!(viewer.scroll(), 0);
        for _ in 0..10 {
            viewer.handle_key(key(KeyCode::Char('j')), &mut selection);
        }
        assert_eq!(viewer.scroll(), 2);
    }

    #[test]
    fn back_returns_to_doc_list() {
        let mut viewer = JsonViewer::default();
        let mut selection = Selection::default();
        selection.set_doc(doc! { "_id": 1 });
        selection.set_focus(Focus::SingleDocViewer);

        viewer.handle_key(key(KeyCode::Char('b')), &mut selection);
        assert_eq!(selection.focus(), Focus::DocList);
    }

    #[test]
    fn loading_resets_scroll() {
        let mut viewer = JsonViewer::default();
        let mut selection = Selection::default();
        viewer.load(String::from("{\n}\n"));
        viewer.handle_key(key(KeyCode::Down), &mut selection);
        viewer.load(String::from("{}"));
        assert_eq!(viewer.scroll(), 0);
        assert_eq!(viewer.text(), "{}");
    }
}
