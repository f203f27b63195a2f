//! `tower` integration.
//!
//! [`AuthenticationLayer`] puts an [`AuthenticationFilter`](crate::AuthenticationFilter)
//! in front of any `tower` service whose request and response bodies are
//! [`Bytes`](bytes::Bytes). The wrapped service only sees authenticated
//! requests and finds the [`AttributesContext`](crate::AttributesContext) in
//! the request extensions.

mod layer;

pub use layer::{AuthenticationLayer, AuthenticationService};
