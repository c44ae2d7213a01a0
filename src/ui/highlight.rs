use std::sync::OnceLock;

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

const THEME_NAME: &str = "base16-ocean.dark";

struct Assets {
    syntaxes: SyntaxSet,
    theme: Option<Theme>,
}

fn assets() -> &'static Assets {
    static ASSETS: OnceLock<Assets> = OnceLock::new();
    ASSETS.get_or_init(|| {
        let mut themes = ThemeSet::load_defaults();
        let theme = themes
            .themes
            .remove(THEME_NAME)
            .or_else(|| themes.themes.into_values().next());
        Assets { syntaxes: SyntaxSet::load_defaults_newlines(), theme }
    })
}

fn to_color(color: syntect::highlighting::Color) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// Colours a JSON text line by line. Background colours are left to the
/// terminal; lines the highlighter rejects come back unstyled.
pub fn highlight_json(text: &str) -> Vec<Line<'static>> {
    let assets = assets();
    let Some(theme) = assets.theme.as_ref() else {
        return text.lines().map(|line| Line::raw(line.to_string())).collect();
    };
    let syntax = assets
        .syntaxes
        .find_syntax_by_extension("json")
        .unwrap_or_else(|| assets.syntaxes.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, theme);

    LinesWithEndings::from(text)
        .map(|line| match highlighter.highlight_line(line, &assets.syntaxes) {
            Ok(ranges) => Line::from(
                ranges
                    .into_iter()
                    .map(|(style, content)| {
                        Span::styled(
                            content.trim_end_matches(['\n', '\r']).to_string(),
                            Style::default().fg(to_color(style.foreground)),
                        )
                    })
                    .filter(|span| !span.content.is_empty())
                    .collect::<Vec<_>>(),
            ),
            Err(error) => {
                log::debug!("highlighting failed: {error}");
                Line::raw(line.trim_end_matches(['\n', '\r']).to_string())
            }
        })
        .collect()
}
