use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::App;
use crate::selection::Focus;
use crate::ui::db_col_table::Column;
use crate::ui::modal::{Choice, Modal};

const ACCENT: Color = Color::Cyan;

pub fn render(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1), Constraint::Length(1)])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(60),
        ])
        .split(rows[0]);

    render_databases(frame, columns[0], app);
    render_collections(frame, columns[1], app);
    if app.selection().focus() == Focus::SingleDocViewer {
        render_viewer(frame, columns[2], app);
    } else {
        render_doc_list(frame, columns[2], app);
    }

    frame.render_widget(Paragraph::new(pager_line(app)), rows[1]);
    frame.render_widget(
        Paragraph::new(help_line(app)).style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );

    if app.modal().is_displaying() {
        render_modal(frame, frame.area(), app.modal());
    }
}

fn panel(title: String, focused: bool) -> Block<'static> {
    let style = if focused { Style::default().fg(ACCENT) } else { Style::default() };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(if focused { BorderType::Thick } else { BorderType::Plain })
        .border_style(style)
}

fn highlight() -> Style {
    Style::default().bg(Color::Blue).add_modifier(Modifier::BOLD)
}

fn render_names(frame: &mut Frame, area: Rect, block: Block<'static>, names: &[&str], cursor: Option<usize>) {
    let items: Vec<ListItem> = names.iter().map(|name| ListItem::new(name.to_string())).collect();
    let list = List::new(items).block(block).highlight_style(highlight());
    let mut state = ListState::default();
    state.select(cursor.filter(|_| !names.is_empty()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_databases(frame: &mut Frame, area: Rect, app: &App) {
    let table = app.table();
    let focused = app.selection().focus() == Focus::DbColTable && table.column() == Column::Databases;
    let names = table.visible_databases(app.engine());
    render_names(frame, area, panel(String::from("Databases"), focused), &names, Some(table.db_cursor()));
}

fn render_collections(frame: &mut Frame, area: Rect, app: &App) {
    let table = app.table();
    let focused =
        app.selection().focus() == Focus::DbColTable && table.column() == Column::Collections;
    let names = table.visible_collections(app.engine());
    let total = app.engine().selected_collections(app.selection()).len();
    let title = if names.len() < total {
        format!("Collections ({}/{total})", names.len())
    } else {
        String::from("Collections")
    };
    let cursor = (table.column() == Column::Collections).then_some(table.collection_cursor());
    render_names(frame, area, panel(title, focused), &names, cursor);
}

fn render_doc_list(frame: &mut Frame, area: Rect, app: &App) {
    let doc_list = app.doc_list();
    let focused = app.selection().focus() == Focus::DocList;
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let search_focused = focused && doc_list.is_search_focused();
    let mut search = vec![Span::raw(doc_list.search().to_string())];
    if search_focused {
        search.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(search)).block(panel(String::from("Filter"), search_focused)),
        parts[0],
    );

    let title = match app.selection().namespace() {
        Some((db, collection)) => format!("{db}.{collection}"),
        None => String::from("Documents"),
    };
    let items: Vec<ListItem> = app
        .engine()
        .document_summaries(app.selection())
        .iter()
        .map(|summary| ListItem::new(summary.one_line()))
        .collect();
    let has_items = !items.is_empty();
    let list = List::new(items)
        .block(panel(title, focused && !search_focused))
        .highlight_style(highlight());
    let mut state = ListState::default();
    state.select((focused && has_items).then_some(doc_list.cursor()));
    frame.render_stateful_widget(list, parts[1], &mut state);
}

fn render_viewer(frame: &mut Frame, area: Rect, app: &App) {
    let viewer = app.viewer();
    let paragraph = Paragraph::new(viewer.lines().to_vec())
        .block(panel(String::from("Document"), true))
        .wrap(Wrap { trim: false })
        .scroll((viewer.scroll(), 0));
    frame.render_widget(paragraph, area);
}

fn pager_line(app: &App) -> String {
    let Some((db, collection)) = app.selection().namespace() else {
        return String::new();
    };
    let Some(page) = app.engine().selected_page(app.selection()) else {
        return format!(" {db}.{collection}");
    };
    let mut line = if page.total > 0 {
        format!(
            " {db}.{collection}  {}-{} of {}",
            page.offset + 1,
            page.offset + page.documents.len() as u64,
            page.total
        )
    } else {
        format!(" {db}.{collection}  no documents")
    };
    if !page.filter.is_empty() {
        line.push_str(&format!("  filter: {}", page.filter));
    }
    line
}

fn help_line(app: &App) -> String {
    let table = app.table();
    match app.selection().focus() {
        Focus::DbColTable => match table.search_buffer() {
            Some(buffer) => format!(" filter: {buffer}_  enter/esc done"),
            None => {
                let mut help = String::from(
                    " ↑↓ move  ←→ column  enter documents  d drop  / filter  q quit",
                );
                if !table.db_filter().is_empty() {
                    help.push_str(&format!("  [db filter: {}]", table.db_filter()));
                }
                if !table.collection_filter().is_empty() {
                    help.push_str(&format!("  [collection filter: {}]", table.collection_filter()));
                }
                help
            }
        },
        Focus::DocList if app.doc_list().is_search_focused() => {
            String::from(" type a filter  enter apply  ↓ list  ← back  ctrl-c quit")
        }
        Focus::DocList => String::from(
            " ↑↓ move  [ ] page  v view  e edit  i insert  d delete  ← back  q quit",
        ),
        Focus::SingleDocViewer => String::from(" ↑↓ scroll  b back  q quit"),
        Focus::SingleDocEditor | Focus::DocInsert => String::from(" waiting for editor"),
    }
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn render_modal(frame: &mut Frame, area: Rect, modal: &Modal) {
    let Some(slot) = modal.slot() else {
        return;
    };
    let popup = centered_rect(60, 7, area);
    frame.render_widget(Clear, popup);

    let border = if slot.is_error() { Color::Red } else { ACCENT };
    let block = Block::default()
        .title(slot.title())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border));

    let mut lines = vec![Line::from(slot.prompt()), Line::default()];
    if slot.is_error() {
        lines.push(Line::from(Span::styled("press any key", Style::default().fg(Color::DarkGray))));
    } else {
        let button = |label: &'static str, choice: Choice| {
            if modal.choice() == choice {
                Span::styled(label, highlight())
            } else {
                Span::raw(label)
            }
        };
        lines.push(Line::from(vec![
            button(" Yes ", Choice::Yes),
            Span::raw("   "),
            button(" No ", Choice::No),
        ]));
    }

    frame.render_widget(
        Paragraph::new(lines).block(block).alignment(Alignment::Center).wrap(Wrap { trim: true }),
        popup,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn loaded_app() -> App {
        let mut app = App::new(20);
        app.update(Message::Refreshed(Ok(vec![
            (String::from("orders"), vec![String::from("c")]),
            (String::from("users"), vec![]),
        ])));
        app
    }

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).expect("test terminal");
        terminal.draw(|frame| render(frame, app)).expect("draw");
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn lists_databases_and_help() {
        let app = loaded_app();
        let text = screen(&app);
        assert!(text.contains("orders"));
        assert!(text.contains("users"));
        assert!(text.contains("/ filter"));
    }

    #[test]
    fn help_shows_retained_filter() {
        let mut app = loaded_app();
        for code in [KeyCode::Char('/'), KeyCode::Char('u'), KeyCode::Esc] {
            app.update(Message::Key(KeyEvent::new(code, KeyModifiers::NONE)));
        }
        assert!(help_line(&app).contains("[db filter: u]"));
    }

    #[test]
    fn modal_prompt_is_drawn() {
        let mut app = loaded_app();
        app.update(Message::DisplayDropDatabase { db: String::from("orders") });
        let text = screen(&app);
        assert!(text.contains("drop the database orders?"));
        assert!(text.contains("Yes"));
    }
}
