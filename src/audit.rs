//! Audit support for authentication decisions.
//!
//! This module provides:
//! - `AuditEvent`: One record per processed request, carrying only safe metadata
//! - `AuditTrail`: Per-request collector that modules append their decisions to
//! - `AuditApi`: The sink the runtime hands every finished event to
//! - `TracingAuditApi` / `RecordingAuditApi`: Ready-made sinks
//!
//! Audit events are designed to be safe by default:
//! - No credentials or request bodies are stored
//! - Only identifiers, statuses and failure reasons are recorded

mod api;
mod event;
mod trail;

pub use api::{AuditApi, RecordingAuditApi, TracingAuditApi};
pub use event::{AuditEntry, AuditEvent, AuditOutcome, AuditPhase};
pub use trail::AuditTrail;
