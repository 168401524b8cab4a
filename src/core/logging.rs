//! Logging initialisation on top of flexi_logger
//!
//! Library code only uses the `log` facade. The binary calls [`init_logging`]
//! once at startup and [`flush_logging`] before it exits.

use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use strum_macros::{Display, EnumString};

static LOGGER_HANDLE: OnceLock<Mutex<flexi_logger::LoggerHandle>> = OnceLock::new();

/// Log line layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// Timestamp, level and message
    #[default]
    Text,
    /// Text plus the emitting module and line
    Ext,
    /// One compact JSON object per line
    Json,
}

/// Logging settings, usually the `[logging]` table of the config file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
    pub color: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
            color: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logger configuration failed: {0}")]
    Configuration(#[from] flexi_logger::FlexiLoggerError),
}

/// Start the global logger
///
/// Log output goes to stderr unless a file is configured, so that stdout stays
/// reserved for released message groups.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), LoggingError> {
    use flexi_logger::{FileSpec, Logger};

    let mut logger = Logger::try_with_str(&settings.level)?;

    logger = match (settings.format, settings.color) {
        (LogFormat::Json, _) => logger.format(json_format),
        (LogFormat::Ext, true) => logger.format(extended_color_format),
        (LogFormat::Ext, false) => logger.format(extended_format),
        (LogFormat::Text, true) => logger.format(simple_color_format),
        (LogFormat::Text, false) => logger.format(simple_format),
    };

    if let Some(path) = &settings.file {
        logger = logger.log_to_file(FileSpec::try_from(path.as_path())?);
    }

    let handle = logger.start()?;
    let _ = LOGGER_HANDLE.set(Mutex::new(handle));
    Ok(())
}

/// Flush buffered log output, typically just before the process exits
pub fn flush_logging() {
    if let Some(handle) = LOGGER_HANDLE.get() {
        if let Ok(handle) = handle.lock() {
            handle.flush();
        }
    }
}

fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERR",
        log::Level::Warn => "WRN",
        log::Level::Info => "INF",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRC",
    }
}

fn colored_level_tag(level: log::Level) -> colored::ColoredString {
    use colored::Colorize;

    match level {
        log::Level::Error => level_tag(level).red().bold(),
        log::Level::Warn => level_tag(level).yellow(),
        log::Level::Info => level_tag(level).green(),
        log::Level::Debug => level_tag(level).blue(),
        log::Level::Trace => level_tag(level).magenta(),
    }
}

// "2026-01-01 12:00:00.000 INF message"
fn simple_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_tag(record.level()),
        record.args()
    )
}

fn simple_color_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    use colored::Colorize;

    write!(
        w,
        "{} {} {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
        colored_level_tag(record.level()),
        record.args()
    )
}

// "2026-01-01 12:00:00.000 INF message (aggregator/handler.rs:42)"
fn extended_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_tag(record.level()),
        record.args(),
        format_target_as_path(record.target(), record.line())
    )
}

fn extended_color_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    use colored::Colorize;

    write!(
        w,
        "{} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
        colored_level_tag(record.level()),
        record.args(),
        format_target_as_path(record.target(), record.line()).dimmed()
    )
}

fn json_format(
    w: &mut dyn std::io::Write,
    now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    let line = serde_json::json!({
        "timestamp": now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        "level": level_tag(record.level()),
        "message": record.args().to_string(),
        "target": format_target_as_path(record.target(), record.line()),
    });

    match serde_json::to_string(&line) {
        Ok(json) => w.write_all(json.as_bytes()),
        Err(_) => w.write_all(b"{\"error\":\"Failed to serialize log message\"}"),
    }
}

// correlate::aggregator::handler -> aggregator/handler.rs:42
fn format_target_as_path(target: &str, line: Option<u32>) -> String {
    let path_like = match target.strip_prefix("correlate::") {
        Some(module) => module.replace("::", "/") + ".rs",
        None => target.replace("::", "/"),
    };

    match line {
        Some(line) => format!("{path_like}:{line}"),
        None => path_like,
    }
}
