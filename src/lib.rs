//! Pluggable request authentication for HTTP handler chains.
//!
//! This crate runs a chain of credential validators ("modules") in front of a
//! protected resource, following the message-authentication model of the Java
//! Authentication SPI:
//! - **Validate**: the module chain decides whether the request may proceed
//! - **Dispatch**: authenticated requests reach the next [`Handler`]
//! - **Secure**: the authenticating module may decorate the response
//! - **Clean**: the client subject is cleaned exactly once, on every path
//!
//! Every failure becomes a response. Module errors, invalid statuses and
//! module panics go through the [`ResponseHandler`]; a validation
//! `SEND_FAILURE` is a fixed `401` and a securing `SEND_FAILURE` a fixed
//! `500`.
//!
//! # Core Types
//!
//! - [`ServerAuthModule`]: The asynchronous module contract
//! - [`SyncServerAuthModule`]: Legacy synchronous modules, adapted automatically
//! - [`ModuleChain`]: Session module plus ordered auth modules
//! - [`AuthenticationFramework`]: The per-request runtime
//! - [`AuthenticationFilter`]: Builder-assembled entry point
//! - [`AttributesContext`]: What downstream handlers learn about the request
//!
//! # Examples
//!
//! ```
//! use authn_filter::{AttributesContext, AuthenticationFilter, Handler, Request, Response};
//! use authn_filter::audit::RecordingAuditApi;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Resource;
//!
//! #[async_trait]
//! impl Handler for Resource {
//!     async fn handle(&self, _context: &mut AttributesContext, _request: Request) -> Response {
//!         Response::new("orders".into())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let filter = AuthenticationFilter::builder()
//!     .audit_api(Arc::new(RecordingAuditApi::new()))
//!     .build()
//!     .unwrap();
//!
//! // No modules: nobody vouches for the request.
//! let mut context = AttributesContext::new();
//! let response = filter.filter(&mut context, Request::default(), &Resource).await;
//! assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
//! assert!(context.request_id().is_some());
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
mod builder;
mod chain;
mod context;
mod error;
mod filter;
mod framework;
mod guard;
mod logging;
mod message;
mod module;
mod policy;
mod response;
mod secret;
mod status;
mod subject;
pub mod web;

pub use builder::{AuthenticationFilterBuilder, FilterConfig};
pub use chain::{ChainStrategy, FirstMatch, ModuleChain, ServerAuthContext};
pub use context::{
    AttributesContext, ATTRIBUTE_AUTH_CONTEXT, ATTRIBUTE_AUTH_PRINCIPAL, ATTRIBUTE_REQUEST_ID,
};
pub use error::{AuditError, AuthenticationError, ConfigError};
pub use filter::{AuthenticationFilter, Handler};
pub use framework::AuthenticationFramework;
pub use logging::{Logger, RequestLog, DEFAULT_LOGGER_NAME};
pub use message::{ContextMap, MessageContext, Request, Response};
pub use module::{
    configure_legacy_module, configure_module, Callback, CallbackHandler, MessageType,
    ModuleConfiguration, NoOpCallbackHandler, ServerAuthModule, Settings, SyncModuleAdapter,
    SyncServerAuthModule, HTTP_MESSAGE_TYPES,
};
pub use policy::{MessagePolicy, Protection};
pub use response::{DefaultResponseHandler, JsonResponseWriter, ResponseHandler, ResponseWriter};
pub use secret::Secret;
pub use status::{AuthOutcome, AuthStatus};
pub use subject::{Principal, Subject};
