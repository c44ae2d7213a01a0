mod app;
mod cli;
mod executor;
mod logging;
mod message;
mod mongo;
mod selection;
mod settings;
mod ui;

use std::collections::VecDeque;
use std::env;
use std::ffi::OsString;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use mongodb::sync::Client;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::app::App;
use crate::cli::{ArgumentError, Cli};
use crate::executor::Executor;
use crate::message::{Command, EditorRequest, Message};
use crate::mongo::filter::editor_body;
use crate::mongo::store::{DocumentStore, MongoStore, StoreError};
use crate::settings::{Settings, SettingsLoadError};
use crate::ui::editor::ExternalEditor;
use crate::ui::tui::Tui;
use crate::ui::view;

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
enum StartupError {
    #[error("{0}")]
    Usage(#[source] clap::Error),
    #[error("invalid arguments: {0}")]
    Arguments(#[from] ArgumentError),
    #[error("could not load settings: {0}")]
    Settings(#[from] SettingsLoadError),
    #[error("could not open log file: {0}")]
    Log(#[source] io::Error),
    #[error("invalid connection string: {0}")]
    Client(#[source] mongodb::error::Error),
    #[error("could not reach the server: {0}")]
    InitialListing(#[source] StoreError),
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

fn main() -> ExitCode {
    let result = parse_cli(env::args_os()).and_then(|cli| match cli {
        Some(cli) => run(cli),
        None => Ok(()),
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("mongotui: {error}");
            ExitCode::from(1)
        }
    }
}

/// `None` when clap already printed help or version text.
fn parse_cli<I, T>(args: I) -> Result<Option<Cli>, StartupError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(error) if !error.use_stderr() => {
            let _ = error.print();
            Ok(None)
        }
        Err(error) => Err(StartupError::Usage(error)),
    }
}

fn run(cli: Cli) -> Result<(), StartupError> {
    let settings = settings::load_from_disk(cli.config.as_deref())?;
    if let Ok(value) = env::var(logging::DEBUG_ENV_VAR) {
        logging::init(logging::level_from_env(&value), &settings.log_path())
            .map_err(StartupError::Log)?;
    }
    log::info!("mongotui {} starting", env!("CARGO_PKG_VERSION"));
    for option in cli.ignored_options() {
        log::warn!("--{option} is not supported by the driver; ignoring");
    }

    let uri = cli.connection_uri(settings.operation_timeout())?;
    let store = connect(&uri, &settings)?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let (sender, receiver) = mpsc::unbounded_channel();
    let executor = Executor::new(runtime, store, sender, settings.operation_timeout());
    let editor = ExternalEditor::from_env();

    let mut tui = Tui::enter()?;
    let result = Session { app: App::new(settings.page_size), executor, editor, receiver }.run(&mut tui);
    tui.exit()?;
    log::info!("mongotui exiting");
    result
}

/// Builds the client and makes sure the server answers before the UI starts.
fn connect(uri: &str, settings: &Settings) -> Result<Arc<dyn DocumentStore>, StartupError> {
    let client = Client::with_uri_str(uri).map_err(StartupError::Client)?;
    let store = MongoStore::new(client, settings.operation_timeout());
    let databases = store.list_database_names().map_err(StartupError::InitialListing)?;
    log::info!("connected; {} databases visible", databases.len());
    Ok(Arc::new(store))
}

struct Session {
    app: App,
    executor: Executor,
    editor: ExternalEditor,
    receiver: UnboundedReceiver<Message>,
}

impl Session {
    fn run(mut self, tui: &mut Tui) -> Result<(), StartupError> {
        let result = self.event_loop(tui);
        self.executor.shutdown();
        result
    }

    fn event_loop(&mut self, tui: &mut Tui) -> Result<(), StartupError> {
        let mut queue: VecDeque<Command> = self.app.init().into();

        loop {
            while let Some(command) = queue.pop_front() {
                match command {
                    Command::Quit => return Ok(()),
                    Command::Store(request) => self.executor.spawn(request),
                    Command::Emit(message) => queue.extend(self.app.update(message)),
                    Command::OpenEditor(request) => {
                        let closed = self.open_editor(tui, request)?;
                        queue.extend(self.app.update(closed));
                    }
                }
            }

            tui.draw(|frame| view::render(frame, &self.app))?;

            if event::poll(TICK)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        queue.extend(self.app.update(Message::Key(key)));
                    }
                }
            }
            while let Ok(message) = self.receiver.try_recv() {
                queue.extend(self.app.update(message));
            }
        }
    }

    /// Hands the terminal to the editor and always takes it back, even when
    /// the editor failed.
    fn open_editor(&self, tui: &mut Tui, request: EditorRequest) -> Result<Message, StartupError> {
        let body = match &request {
            EditorRequest::Insert { template } => editor_body(template),
            EditorRequest::Edit { original } => editor_body(original),
        };

        log::debug!("handing the terminal to {}", self.editor.program());
        tui.suspend()?;
        let result = self.editor.edit(&body).map_err(|error| {
            log::error!("editor failed: {error}");
            error.to_string()
        });
        tui.resume()?;

        Ok(Message::EditorClosed { request, result })
    }
}
