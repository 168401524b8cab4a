//! Error reporting helpers shared by the library and the CLI
//!
//! Errors caused by input the operator controls (a message without a
//! correlation key, a bad config value) are reported with their own message.
//! System errors (I/O, poisoned locks, downstream failures) are reported with
//! the operation context and full detail at debug level.

/// Errors that know whether their message is meaningful to the operator
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some`; otherwise it returns `None`.
pub trait ContextualError: std::error::Error {
    fn is_user_actionable(&self) -> bool;

    fn user_message(&self) -> Option<String>;
}

/// Log an error at `error` level with detail appropriate to its kind
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message().filter(|_| error.is_user_actionable()) {
        Some(message) => log::error!("{}: {}", operation_context, message),
        None => log::error!("{} failed", operation_context),
    }
    log::debug!("DETAIL: {}", error);
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        log::debug!("CAUSED BY: {}", cause);
        source = cause.source();
    }
    log::trace!("DEBUG_DETAILS: {:?}", error);
}

/// Render an error and its chain of sources on one line
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
