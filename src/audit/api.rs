//! Audit sinks.

use parking_lot::Mutex;

use super::AuditEvent;
use crate::error::AuditError;

/// Records authentication decisions.
///
/// The runtime calls [`audit`](AuditApi::audit) exactly once per processed
/// request, after cleanup. A failing sink is logged and never changes the
/// response.
pub trait AuditApi: Send + Sync {
    /// Records one event.
    ///
    /// # Errors
    ///
    /// Returns `AuditError` when the event could not be stored.
    fn audit(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Audit sink that emits events as structured `tracing` records.
///
/// Events are logged at `info` level on the `authn_audit` target so a
/// subscriber can route them separately from diagnostic logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditApi;

impl TracingAuditApi {
    /// Creates the sink.
    pub fn new() -> Self {
        Self
    }
}

impl AuditApi for TracingAuditApi {
    fn audit(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let modules: Vec<String> = event.entries().iter().map(ToString::to_string).collect();
        tracing::info!(
            target: "authn_audit",
            request_id = %event.request_id(),
            principal = ?event.principal(),
            outcome = %event.outcome(),
            method = ?event.method(),
            path = ?event.path(),
            modules = ?modules,
            "authentication audit event"
        );
        Ok(())
    }
}

/// In-memory audit sink.
///
/// Stores events in the order they are recorded. Useful in tests and for
/// embedding applications that forward events in batches.
///
/// # Example
///
/// ```
/// use authn_filter::audit::{AuditApi, AuditEvent, AuditOutcome, RecordingAuditApi};
///
/// let sink = RecordingAuditApi::new();
/// sink.audit(&AuditEvent::new("req-1", Some("alice"), AuditOutcome::Success)).unwrap();
///
/// assert_eq!(sink.len(), 1);
/// assert_eq!(sink.events()[0].principal(), Some("alice"));
/// ```
#[derive(Debug, Default)]
pub struct RecordingAuditApi {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditApi {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditApi for RecordingAuditApi {
    fn audit(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
