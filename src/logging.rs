use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

pub const DEBUG_ENV_VAR: &str = "MONGOTUI_DEBUG";

/// File-only sink. The terminal belongs to the UI, so nothing goes to stderr.
struct Logger {
    level: LevelFilter,
    file: Mutex<File>,
}

impl Logger {
    fn is_app_target(target: &str) -> bool {
        target == "mongotui" || target.starts_with("mongotui::")
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && Self::is_app_target(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(&Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(), record);
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

fn format_line(timestamp: &str, record: &Record) -> String {
    format!("{timestamp} [{level}] {message}\n", level = record.level(), message = record.args())
}

/// `trace` (any case) raises verbosity; any other value means debug.
pub fn level_from_env(value: &str) -> LevelFilter {
    if value.trim().eq_ignore_ascii_case("trace") { LevelFilter::Trace } else { LevelFilter::Debug }
}

/// Installs the sink, truncating `path`. Later calls are no-ops.
pub fn init(level: LevelFilter, path: &Path) -> io::Result<()> {
    if LOGGER.get().is_some() {
        return Ok(());
    }

    let file = open_log_file(path)?;
    let logger = LOGGER.get_or_init(|| Logger { level, file: Mutex::new(file) });
    let _ = log::set_logger(logger);
    log::set_max_level(level);
    Ok(())
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).write(true).truncate(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn only_crate_targets_are_written() {
        assert!(Logger::is_app_target("mongotui"));
        assert!(Logger::is_app_target("mongotui::mongo::engine"));
        assert!(!Logger::is_app_target("mongodb::cmap"));
        assert!(!Logger::is_app_target("mongotuix"));
    }

    #[test]
    fn trace_is_opt_in() {
        assert_eq!(level_from_env("TRACE"), LevelFilter::Trace);
        assert_eq!(level_from_env("1"), LevelFilter::Debug);
        assert_eq!(level_from_env(""), LevelFilter::Debug);
    }

    #[test]
    fn line_format() {
        let line = format_line(
            "2024-01-02 03:04:05.678",
            &Record::builder()
                .args(format_args!("cache rebuilt"))
                .level(Level::Warn)
                .target("mongotui")
                .build(),
        );
        assert_eq!(line, "2024-01-02 03:04:05.678 [WARN] cache rebuilt\n");
    }

    #[test]
    fn log_file_is_truncated() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("mongotui.log");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "stale").expect("seed");
        drop(open_log_file(&path).expect("open"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "");
    }
}
