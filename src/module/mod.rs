//! Authentication module contract.
//!
//! A module validates one kind of credential. Modules are:
//! - configured with [`configure_module`] (or [`configure_legacy_module`] for
//!   synchronous validators)
//! - initialized once, when the filter is built
//! - consulted by the [`ModuleChain`](crate::ModuleChain) for every request
//!
//! # Writing a module
//!
//! ```
//! use async_trait::async_trait;
//! use authn_filter::{
//!     AuthOutcome, AuthStatus, AuthenticationError, CallbackHandler, MessageContext,
//!     MessagePolicy, MessageType, Principal, ServerAuthModule, Settings, Subject,
//! };
//! use std::sync::Arc;
//!
//! struct HeaderModule;
//!
//! #[async_trait]
//! impl ServerAuthModule for HeaderModule {
//!     fn module_id(&self) -> &str {
//!         "header"
//!     }
//!
//!     fn initialize(
//!         &mut self,
//!         _request_policy: &MessagePolicy,
//!         _response_policy: Option<&MessagePolicy>,
//!         _handler: Arc<dyn CallbackHandler>,
//!         _settings: &Settings,
//!     ) -> Result<(), AuthenticationError> {
//!         Ok(())
//!     }
//!
//!     async fn validate_request(
//!         &self,
//!         ctx: &mut MessageContext,
//!         client_subject: &mut Subject,
//!         _service_subject: &Subject,
//!     ) -> AuthOutcome {
//!         match ctx.request().headers().get("x-user").and_then(|v| v.to_str().ok()) {
//!             Some(user) => {
//!                 client_subject.add_principal(Principal::new(user));
//!                 Ok(Some(AuthStatus::Success))
//!             }
//!             None => Ok(Some(AuthStatus::SendFailure)),
//!         }
//!     }
//!
//!     async fn secure_response(
//!         &self,
//!         _ctx: &mut MessageContext,
//!         _service_subject: &Subject,
//!     ) -> AuthOutcome {
//!         Ok(Some(AuthStatus::SendSuccess))
//!     }
//!
//!     async fn clean_subject(
//!         &self,
//!         _ctx: &mut MessageContext,
//!         client_subject: &mut Subject,
//!     ) -> Result<(), AuthenticationError> {
//!         client_subject.clear();
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AuthenticationError;
use crate::message::MessageContext;
use crate::policy::MessagePolicy;
use crate::status::AuthOutcome;
use crate::subject::Subject;

mod adapter;
mod callback;
mod config;

pub use adapter::{SyncModuleAdapter, SyncServerAuthModule};
pub use callback::{Callback, CallbackHandler, NoOpCallbackHandler};
pub use config::{configure_legacy_module, configure_module, ModuleConfiguration};

/// Free-form module settings.
pub type Settings = HashMap<String, serde_json::Value>;

/// Message types a module can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Inbound HTTP requests
    HttpRequest,
    /// Outbound HTTP responses
    HttpResponse,
}

/// Message types every module placed in an HTTP filter must support.
pub const HTTP_MESSAGE_TYPES: &[MessageType] = &[MessageType::HttpRequest, MessageType::HttpResponse];

/// Asynchronous authentication module.
///
/// All three phases are asynchronous; the runtime only looks at the settled
/// result. A phase that returns `Ok(None)` settled without a usable status.
#[async_trait]
pub trait ServerAuthModule: Send + Sync {
    /// Identifier used in logs and audit entries.
    fn module_id(&self) -> &str;

    /// Message types this module can process.
    fn supported_message_types(&self) -> &[MessageType] {
        HTTP_MESSAGE_TYPES
    }

    /// One-time initialization, run synchronously while the filter is built.
    ///
    /// # Errors
    ///
    /// An error aborts construction of the whole filter.
    fn initialize(
        &mut self,
        request_policy: &MessagePolicy,
        response_policy: Option<&MessagePolicy>,
        handler: Arc<dyn CallbackHandler>,
        settings: &Settings,
    ) -> Result<(), AuthenticationError>;

    /// Validates the request, populating `client_subject` on success.
    async fn validate_request(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
        service_subject: &Subject,
    ) -> AuthOutcome;

    /// Secures the response currently held by `ctx`.
    async fn secure_response(&self, ctx: &mut MessageContext, service_subject: &Subject)
        -> AuthOutcome;

    /// Removes what `validate_request` added to `client_subject`.
    async fn clean_subject(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
    ) -> Result<(), AuthenticationError>;
}
