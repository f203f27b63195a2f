use std::fmt;
use std::sync::Arc;

/// Default name of the filter's logger.
pub const DEFAULT_LOGGER_NAME: &str = "authn_filter";

/// Named logger shared by a filter.
///
/// `Logger` is cheap to clone. Every event it emits is tagged with the
/// logger name, so several filters in one process stay distinguishable.
/// Use [`for_request`](Self::for_request) to obtain a [`RequestLog`] that
/// also carries the request id.
#[derive(Debug, Clone)]
pub struct Logger {
    name: Arc<str>,
}

impl Logger {
    /// Creates a logger with the given name.
    pub fn named(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }

    /// Returns the logger name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binds the logger to one request.
    pub fn for_request<'a>(&'a self, request_id: &'a str) -> RequestLog<'a> {
        RequestLog {
            logger: &self.name,
            request_id,
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::named(DEFAULT_LOGGER_NAME)
    }
}

/// Logger bound to a single request.
///
/// Lifetime-bound to the [`Logger`] and the request id it was created from.
///
/// ```
/// # use authn_filter::Logger;
/// let logger = Logger::named("orders-api");
/// let log = logger.for_request("req-1");
/// log.debug(format_args!("validating request"));
/// assert_eq!(log.request_id(), "req-1");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    logger: &'a str,
    request_id: &'a str,
}

impl RequestLog<'_> {
    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs an info-level message.
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(logger = %self.logger, request_id = %self.request_id, "{}", args);
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(logger = %self.logger, request_id = %self.request_id, "{}", args);
    }

    /// Logs an error-level message.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(logger = %self.logger, request_id = %self.request_id, "{}", args);
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(logger = %self.logger, request_id = %self.request_id, "{}", args);
    }
}
