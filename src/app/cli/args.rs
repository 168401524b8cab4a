//! Command-line arguments
//!
//! Every option is optional so that values left unset fall back to the
//! configuration file, then to built-in defaults.

use crate::aggregator::ExpiryAction;
use crate::core::logging::LogFormat;
use crate::core::version::long_version;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "correlate")]
#[command(about = "Group related messages and release each group once it is complete")]
#[command(version, long_version = long_version())]
#[command(
    after_help = "Input is newline-delimited JSON, one message per line:\n  \
    {\"correlation_id\": \"order-1\", \"sequence_number\": 1, \"sequence_size\": 2, \"payload\": \"...\"}"
)]
pub struct Args {
    /// Read messages from FILE instead of standard input
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Also write the log to FILE
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Expire groups idle for this many milliseconds
    #[arg(short = 't', long = "group-timeout-ms", value_name = "MS")]
    pub group_timeout_ms: Option<u64>,

    /// Pause between expiry passes
    #[arg(long = "reaper-interval-ms", value_name = "MS")]
    pub reaper_interval_ms: Option<u64>,

    /// What to do with groups that expire incomplete
    #[arg(short = 'e', long = "expiry-action", value_name = "ACTION")]
    pub expiry_action: Option<ExpiryAction>,

    /// Reject a message when its group stays busy this long
    #[arg(long = "lock-timeout-ms", value_name = "MS")]
    pub lock_timeout_ms: Option<u64>,

    /// Maximum number of messages held across all groups
    #[arg(long = "capacity", value_name = "COUNT")]
    pub capacity: Option<usize>,

    /// Write a newline after every output message (default)
    #[arg(long = "newline", overrides_with = "no_newline")]
    pub newline: bool,

    /// Write output messages back to back
    #[arg(long = "no-newline", overrides_with = "newline")]
    pub no_newline: bool,
}

impl Args {
    /// Newline choice made on the command line, if any
    pub fn append_newline(&self) -> Option<bool> {
        match (self.newline, self.no_newline) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
