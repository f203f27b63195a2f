//! What the runtime reports to the audit sink.
//!
//! One [`AuditEvent`] per finished request, made of the [`AuditEntry`]
//! decisions its modules took. Neither carries credentials.

use std::fmt;

use crate::status::AuthStatus;

/// Final outcome of a processed request, as seen by the audit sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    /// The request was authenticated, dispatched and its response secured
    Success,
    /// Validation answered the client itself (`SEND_SUCCESS` or
    /// `SEND_CONTINUE`); the request was not dispatched
    Continue,
    /// Authentication was refused
    Denied,
    /// A module failed, broke the protocol, or the request was dropped
    /// before it finished
    Error,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Continue => write!(f, "continue"),
            AuditOutcome::Denied => write!(f, "denied"),
            AuditOutcome::Error => write!(f, "error"),
        }
    }
}

/// Phase in which a module decision was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditPhase {
    /// `validate_request`
    ValidateRequest,
    /// `secure_response`
    SecureResponse,
}

impl fmt::Display for AuditPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditPhase::ValidateRequest => write!(f, "validate_request"),
            AuditPhase::SecureResponse => write!(f, "secure_response"),
        }
    }
}

/// One module decision inside a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    module_id: String,
    phase: AuditPhase,
    status: Option<AuthStatus>,
    reason: Option<String>,
}

impl AuditEntry {
    /// Records the status a module settled with.
    pub fn status(
        module_id: impl Into<String>,
        phase: AuditPhase,
        status: Option<AuthStatus>,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            phase,
            status,
            reason: None,
        }
    }

    /// Records a module failure.
    pub fn failure(
        module_id: impl Into<String>,
        phase: AuditPhase,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            phase,
            status: None,
            reason: Some(reason.into()),
        }
    }

    /// Identifier of the module.
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Phase of the decision.
    pub fn phase(&self) -> AuditPhase {
        self.phase
    }

    /// Status returned by the module, if it settled with one.
    pub fn auth_status(&self) -> Option<AuthStatus> {
        self.status
    }

    /// Failure reason, if the module failed.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns true when the module failed instead of returning a status.
    pub fn is_failure(&self) -> bool {
        self.reason.is_some()
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}:{}=failed({})", self.module_id, self.phase, reason),
            None => write!(
                f,
                "{}:{}={}",
                self.module_id,
                self.phase,
                AuthStatus::describe(self.status)
            ),
        }
    }
}

/// A structured audit event for one processed request.
///
/// # Safety Invariants
///
/// - No credentials are stored
/// - No request or response bodies
/// - Only identifiers, statuses and failure messages
///
/// # Example
///
/// ```
/// use authn_filter::audit::{AuditEvent, AuditOutcome};
///
/// let event = AuditEvent::new("req-123", Some("alice"), AuditOutcome::Success)
///     .with_method("GET")
///     .with_path("/api/orders");
///
/// assert_eq!(event.request_id(), "req-123");
/// assert_eq!(event.principal(), Some("alice"));
/// ```
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Request identifier for correlation
    request_id: String,
    /// Resolved principal, None when authentication did not succeed
    principal: Option<String>,
    outcome: AuditOutcome,
    /// HTTP method of the request
    method: Option<String>,
    /// Request path without the query string
    path: Option<String>,
    entries: Vec<AuditEntry>,
}

impl AuditEvent {
    /// Creates an event without method, path or module entries.
    pub fn new(
        request_id: impl Into<String>,
        principal: Option<impl Into<String>>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            principal: principal.map(Into::into),
            outcome,
            method: None,
            path: None,
            entries: Vec::new(),
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Sets the request path. Callers must strip query strings.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attaches the module decisions collected during the request.
    #[must_use]
    pub fn with_entries(mut self, entries: Vec<AuditEntry>) -> Self {
        self.entries = entries;
        self
    }

    /// Returns the request identifier.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the principal, if authenticated.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Returns the outcome.
    pub fn outcome(&self) -> AuditOutcome {
        self.outcome
    }

    /// Returns the HTTP method, if set.
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Returns the request path, if set.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the module decisions in the order they were taken.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuditEvent[outcome={}, request_id={}, principal={}",
            self.outcome,
            self.request_id,
            self.principal.as_deref().unwrap_or("<none>")
        )?;

        if let Some(method) = &self.method {
            write!(f, ", method={}", method)?;
        }
        if let Some(path) = &self.path {
            write!(f, ", path={}", path)?;
        }
        if !self.entries.is_empty() {
            let entries: Vec<String> = self.entries.iter().map(ToString::to_string).collect();
            write!(f, ", modules=[{}]", entries.join(", "))?;
        }

        write!(f, "]")
    }
}
