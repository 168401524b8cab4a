//! Newline-delimited JSON input
//!
//! Each non-blank line is one message:
//!
//! ```text
//! {"correlation_id": "order-1", "sequence_number": 1, "sequence_size": 2,
//!  "payload": "first half", "headers": {"tenant": "acme"}}
//! ```
//!
//! Every field is optional. A string `payload` becomes text, `null` or a
//! missing payload becomes a null payload, any other JSON value is kept as
//! structured data. Numeric correlation ids are accepted as well as strings.

use crate::aggregator::{CorrelatingMessageHandler, HandleOutcome};
use crate::core::error_handling::log_error_with_context;
use crate::core::shutdown::ShutdownCoordinator;
use crate::message::{CorrelationKey, Message, MessageBuilder, Payload};
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// One parsed input line
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputRecord {
    pub correlation_id: Option<serde_json::Value>,
    pub sequence_number: u32,
    pub sequence_size: u32,
    pub payload: serde_json::Value,
    pub headers: BTreeMap<String, String>,
}

impl InputRecord {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn into_message(self) -> Message {
        // Explicit fields take precedence over the same names in `headers`
        let mut builder =
            MessageBuilder::with_payload(Payload::from_json(self.payload)).headers(self.headers);
        if self.sequence_number > 0 {
            builder = builder.sequence_number(self.sequence_number);
        }
        if self.sequence_size > 0 {
            builder = builder.sequence_size(self.sequence_size);
        }
        if let Some(key) = self.correlation_id.and_then(correlation_key) {
            builder = builder.correlation_id(key);
        }
        builder.build()
    }
}

fn correlation_key(value: serde_json::Value) -> Option<CorrelationKey> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(key) => Some(CorrelationKey::from(key)),
        other => Some(CorrelationKey::from(other.to_string())),
    }
}

/// Counters for one input run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSummary {
    pub lines: usize,
    pub accepted: usize,
    pub released: usize,
    pub malformed: usize,
    pub rejected: usize,
}

/// Feed every line of `reader` to `handler` until end of input or shutdown
///
/// Malformed lines and messages the handler rejects are logged and skipped.
/// Only a failure to read the input ends the run early. Each message is
/// handled on tokio's blocking pool.
pub async fn process_input<R>(
    reader: R,
    handler: &CorrelatingMessageHandler,
    shutdown: &ShutdownCoordinator,
) -> std::io::Result<InputSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut shutdown_rx = shutdown.subscribe();
    let mut lines = reader.lines();
    let mut summary = InputSummary::default();

    loop {
        if shutdown.is_shutdown_requested() {
            break;
        }
        let line = tokio::select! {
            _ = shutdown_rx.recv() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        summary.lines += 1;
        if line.trim().is_empty() {
            continue;
        }

        let record = match InputRecord::parse(&line) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping malformed line {}: {}", summary.lines, e);
                summary.malformed += 1;
                continue;
            }
        };

        // The handler may wait on a key lock, so keep it off the async workers
        let message = record.into_message();
        let worker = handler.clone();
        let handled = tokio::task::spawn_blocking(move || worker.handle_message(message)).await;
        let handled = match handled {
            Ok(handled) => handled,
            Err(e) => {
                log::error!("Handling line {} failed: {}", summary.lines, e);
                summary.rejected += 1;
                continue;
            }
        };

        match handled {
            Ok(outcome) => {
                summary.accepted += 1;
                if let HandleOutcome::Released { key, group_size } = outcome {
                    log::debug!("Line {} released group '{}' ({})", summary.lines, key, group_size);
                    summary.released += 1;
                }
            }
            Err(e) => {
                log_error_with_context(&e, &format!("Handling line {}", summary.lines));
                summary.rejected += 1;
            }
        }
    }

    log::debug!("Input finished: {:?}", summary);
    Ok(summary)
}
