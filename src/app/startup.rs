//! Application startup and run loop

use crate::aggregator::{
    AggregatingMessageGroupProcessor, AggregatorError, CorrelatingMessageHandler,
};
use crate::app::cli::{Args, ConfigError, FileConfig};
use crate::app::input::{process_input, InputSummary};
use crate::core::error_handling::{error_chain, log_error_with_context, ContextualError};
use crate::core::logging::{flush_logging, init_logging, LoggingError};
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version::long_version;
use crate::store::{MessageGroupStore, MessageGroupStoreReaper, SimpleMessageStore};
use crate::stream::CharacterStreamWritingConsumer;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration failed")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed")]
    Logging(#[from] LoggingError),

    #[error("Handler setup failed")]
    Handler(#[from] AggregatorError),

    #[error("Cannot open input {}", path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Reading input failed")]
    ReadInput(#[source] std::io::Error),
}

impl ContextualError for StartupError {
    fn is_user_actionable(&self) -> bool {
        match self {
            StartupError::Config(e) => e.is_user_actionable(),
            StartupError::OpenInput { .. } => true,
            _ => false,
        }
    }

    fn user_message(&self) -> Option<String> {
        match self {
            StartupError::Config(e) => e.user_message(),
            StartupError::OpenInput { path, source } => {
                Some(format!("Cannot open input {}: {}", path.display(), source))
            }
            _ => None,
        }
    }
}

/// Parse the command line, run, and map the result to an exit code
pub async fn startup() -> ExitCode {
    let args = Args::parse();
    let code = match run(args).await {
        Ok(summary) if summary.rejected == 0 && summary.malformed == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(StartupError::Logging(e)) => {
            // No logger to report through
            eprintln!("Error: {}", error_chain(&e));
            ExitCode::FAILURE
        }
        Err(e) => {
            log_error_with_context(&e, "correlate");
            ExitCode::FAILURE
        }
    };
    flush_logging();
    code
}

/// Run the correlation pipeline described by `args`
pub async fn run(args: Args) -> Result<InputSummary, StartupError> {
    let config = match FileConfig::resolve(&args).await {
        Ok(config) => config,
        Err(e) => {
            // Log with defaults so the failure is still reported
            init_logging(&Default::default())?;
            return Err(e.into());
        }
    };
    init_logging(&config.logging)?;
    log::info!("correlate {} starting", long_version());

    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers();

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|source| StartupError::OpenInput {
                    path: path.clone(),
                    source,
                })?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let store: Arc<dyn MessageGroupStore> = match config.store.capacity {
        Some(capacity) => Arc::new(SimpleMessageStore::with_capacity(capacity)),
        None => Arc::new(SimpleMessageStore::new()),
    };

    let output = CharacterStreamWritingConsumer::with_buffer_size(
        std::io::stdout(),
        config.output.buffer_size,
    );
    output.set_append_newline(config.output.append_newline);
    let discard = CharacterStreamWritingConsumer::stderr();
    discard.set_append_newline(true);

    let handler =
        CorrelatingMessageHandler::builder(AggregatingMessageGroupProcessor, Arc::clone(&store))
            .output_channel(Arc::new(output))
            .discard_channel(Arc::new(discard))
            .settings(&config.handler)
            .build()?;

    let reaper = MessageGroupStoreReaper::new(Arc::clone(&store), config.reaper.group_timeout())
        .with_interval(config.reaper.interval())
        .expire_on_stop(config.reaper.expire_on_stop)
        .spawn(shutdown.clone());

    let result = process_input(reader, &handler, &shutdown).await;
    let expired = reaper.stop().await;

    let summary = result.map_err(StartupError::ReadInput)?;
    log::info!(
        "Processed {} line(s): {} accepted, {} group(s) released, {} expired, {} rejected, {} malformed",
        summary.lines,
        summary.accepted,
        summary.released,
        expired,
        summary.rejected,
        summary.malformed
    );
    Ok(summary)
}
