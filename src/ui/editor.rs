use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::{Command, ExitStatus};

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Document, doc};
use thiserror::Error;

const DEFAULT_EDITOR: &str = "vi";

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("could not prepare temporary file: {0}")]
    TempFile(#[source] io::Error),
    #[error("failed to launch editor {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("editor {program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
    #[error("could not read edited document: {0}")]
    Read(#[source] io::Error),
}

/// Starting point for a new document.
pub fn insert_template() -> Document {
    doc! { "_id": ObjectId::new() }
}

/// `$EDITOR` (or `vi`) launched on a private temporary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEditor {
    program: String,
    args: Vec<String>,
}

impl ExternalEditor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    pub fn from_env() -> Self {
        let command = env::var("EDITOR").unwrap_or_default();
        Self::from_command_line(&command)
    }

    /// Splits on whitespace, so `EDITOR="code --wait"` works; quoting is not
    /// interpreted.
    pub fn from_command_line(command: &str) -> Self {
        let mut words = command.split_whitespace().map(str::to_string);
        match words.next() {
            Some(program) => Self::new(program, words.collect()),
            None => Self::new(DEFAULT_EDITOR, Vec::new()),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Writes `body` to a temporary file, waits for the editor, and returns
    /// whatever was saved. The file is removed afterwards either way.
    pub fn edit(&self, body: &str) -> Result<String, EditorError> {
        let mut file = tempfile::Builder::new()
            .prefix("mongotui-")
            .suffix(".json")
            .tempfile()
            .map_err(EditorError::TempFile)?;
        file.write_all(body.as_bytes()).map_err(EditorError::TempFile)?;
        file.flush().map_err(EditorError::TempFile)?;

        log::debug!("launching {} on {}", self.program, file.path().display());
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(file.path())
            .status()
            .map_err(|source| EditorError::Spawn { program: self.program.clone(), source })?;
        if !status.success() {
            return Err(EditorError::Failed { program: self.program.clone(), status });
        }

        fs::read_to_string(file.path()).map_err(EditorError::Read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_splits_on_whitespace() {
        let editor = ExternalEditor::from_command_line("code  --wait");
        assert_eq!(editor, ExternalEditor::new("code", vec![String::from("--wait")]));
    }

    #[test]
    fn blank_command_falls_back_to_vi() {
        assert_eq!(ExternalEditor::from_command_line("  ").program(), "vi");
    }

    #[test]
    fn template_has_fresh_object_id() {
        let template = insert_template();
        assert_eq!(template.keys().collect::<Vec<_>>(), ["_id"]);
        assert!(template.get_object_id("_id").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn untouched_file_returns_original_body() {
        let editor = ExternalEditor::new("true", Vec::new());
        assert_eq!(editor.edit("{\"a\": 1}").expect("edit succeeds"), "{\"a\": 1}");
    }

    #[cfg(unix)]
    #[test]
    fn saved_changes_are_read_back() {
        let script = String::from("printf '{\"b\": 2}' > \"$0\"");
        let editor = ExternalEditor::new("sh", vec![String::from("-c"), script]);
        assert_eq!(editor.edit("{}").expect("edit succeeds"), "{\"b\": 2}");
    }

    #[cfg(unix)]
    #[test]
    fn failing_editor_is_reported() {
        let editor = ExternalEditor::new("false", Vec::new());
        assert!(matches!(editor.edit("{}"), Err(EditorError::Failed { .. })));
    }

    #[test]
    fn missing_program_is_reported() {
        let editor = ExternalEditor::new("mongotui-no-such-editor", Vec::new());
        assert!(matches!(editor.edit("{}"), Err(EditorError::Spawn { .. })));
    }
}
