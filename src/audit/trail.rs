//! Per-request audit trail.
//!
//! Modules and the chain append their decisions here while a request is in
//! flight; the runtime turns the trail into a single [`AuditEvent`] when the
//! request is finished.

use super::{AuditEntry, AuditEvent, AuditOutcome, AuditPhase};
use crate::error::AuthenticationError;
use crate::status::AuthStatus;

/// Collector of module decisions for one request.
///
/// A trail is owned by the request's [`MessageContext`](crate::MessageContext)
/// and is never shared across requests.
///
/// # Example
///
/// ```
/// use authn_filter::AuthStatus;
/// use authn_filter::audit::{AuditOutcome, AuditPhase, AuditTrail};
///
/// let mut trail = AuditTrail::new();
/// trail.record_status("bearer", AuditPhase::ValidateRequest, Some(AuthStatus::Success));
///
/// let event = trail.to_event("req-1", Some("alice"), AuditOutcome::Success);
/// assert_eq!(event.entries().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    /// Creates a new empty audit trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    /// Appends the status a module settled with.
    pub fn record_status(
        &mut self,
        module_id: &str,
        phase: AuditPhase,
        status: Option<AuthStatus>,
    ) {
        self.record(AuditEntry::status(module_id, phase, status));
    }

    /// Appends a module failure.
    pub fn record_failure(&mut self, module_id: &str, phase: AuditPhase, error: &AuthenticationError) {
        self.record(AuditEntry::failure(module_id, phase, error.message()));
    }

    /// Returns the recorded entries in order.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Returns the number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the audit event for the finished request.
    pub fn to_event(
        &self,
        request_id: &str,
        principal: Option<&str>,
        outcome: AuditOutcome,
    ) -> AuditEvent {
        AuditEvent::new(request_id, principal, outcome).with_entries(self.entries.clone())
    }
}
