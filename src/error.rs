use http::StatusCode;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure raised while validating a request, securing a response or
/// cleaning a subject.
///
/// Every per-request failure inside the runtime is expressed as an
/// `AuthenticationError`. The runtime never lets one escape: it is handed to
/// the [`ResponseHandler`](crate::ResponseHandler) and turned into a response.
///
/// # Examples
///
/// ```
/// use authn_filter::AuthenticationError;
/// use http::StatusCode;
///
/// let err = AuthenticationError::new("bad token").with_status(StatusCode::UNAUTHORIZED);
/// assert_eq!(err.to_string(), "bad token");
/// assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AuthenticationError {
    message: String,
    status: Option<StatusCode>,
    #[source]
    source: Option<BoxError>,
}

impl AuthenticationError {
    /// Creates an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            message: message.into(),
            status: None,
            source: Some(source.into()),
        }
    }

    /// Attaches an HTTP status hint for response writers.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the status hint, if the raiser supplied one.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

/// Errors raised while assembling a filter.
///
/// These never reach request processing: a filter that fails to build does
/// not exist.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required collaborator was not supplied.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A module rejected its configuration during `initialize`.
    #[error("failed to initialize module '{module}'")]
    ModuleInitialization {
        /// Identifier of the module that failed
        module: String,
        /// The failure reported by the module
        #[source]
        source: AuthenticationError,
    },

    /// A module does not handle both HTTP requests and responses.
    #[error("module '{module}' does not support HTTP request and response messages")]
    UnsupportedMessageTypes {
        /// Identifier of the offending module
        module: String,
    },
}

/// Failure of an [`AuditApi`](crate::audit::AuditApi) to record an event.
#[derive(Debug, Error)]
#[error("audit failed: {message}")]
pub struct AuditError {
    message: String,
}

impl AuditError {
    /// Creates a new audit error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
