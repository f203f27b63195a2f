use std::sync::Arc;

use async_trait::async_trait;

use super::{CallbackHandler, MessageType, ServerAuthModule, Settings};
use crate::error::AuthenticationError;
use crate::message::MessageContext;
use crate::policy::MessagePolicy;
use crate::status::{AuthOutcome, AuthStatus};
use crate::subject::Subject;

/// Legacy synchronous authentication module.
///
/// Implementations block the calling task while they run and report failures
/// through their own error type. Wrap them in a [`SyncModuleAdapter`] (or use
/// [`configure_legacy_module`](super::configure_legacy_module)) to place them
/// in a chain.
pub trait SyncServerAuthModule: Send + Sync {
    /// Error reported by this module.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Identifier used in logs and audit entries.
    fn module_id(&self) -> &str;

    /// Message types this module can process.
    fn supported_message_types(&self) -> &[MessageType];

    /// One-time initialization.
    ///
    /// # Errors
    ///
    /// Any error aborts construction of the filter.
    fn initialize(
        &mut self,
        request_policy: &MessagePolicy,
        response_policy: Option<&MessagePolicy>,
        handler: Arc<dyn CallbackHandler>,
        settings: &Settings,
    ) -> Result<(), Self::Error>;

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns the module's error when the request cannot be validated.
    fn validate_request(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
        service_subject: &Subject,
    ) -> Result<Option<AuthStatus>, Self::Error>;

    /// Secures the response.
    ///
    /// # Errors
    ///
    /// Returns the module's error when the response cannot be secured.
    fn secure_response(
        &self,
        ctx: &mut MessageContext,
        service_subject: &Subject,
    ) -> Result<Option<AuthStatus>, Self::Error>;

    /// Cleans the client subject.
    ///
    /// # Errors
    ///
    /// Returns the module's error when cleanup fails.
    fn clean_subject(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
    ) -> Result<(), Self::Error>;
}

/// Exposes a [`SyncServerAuthModule`] through the asynchronous
/// [`ServerAuthModule`] contract.
///
/// Every phase runs on the calling task and returns an already-settled
/// outcome. The module's own errors become [`AuthenticationError`]s that keep
/// the original error as their source.
#[derive(Debug)]
pub struct SyncModuleAdapter<M> {
    inner: M,
}

impl<M: SyncServerAuthModule> SyncModuleAdapter<M> {
    /// Wraps a legacy module.
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    /// Returns the wrapped module.
    pub fn inner(&self) -> &M {
        &self.inner
    }
}

fn convert<E>(module_id: &str, err: E) -> AuthenticationError
where
    E: std::error::Error + Send + Sync + 'static,
{
    AuthenticationError::with_source(format!("module '{}' failed: {}", module_id, err), err)
}

#[async_trait]
impl<M: SyncServerAuthModule> ServerAuthModule for SyncModuleAdapter<M> {
    fn module_id(&self) -> &str {
        self.inner.module_id()
    }

    fn supported_message_types(&self) -> &[MessageType] {
        self.inner.supported_message_types()
    }

    fn initialize(
        &mut self,
        request_policy: &MessagePolicy,
        response_policy: Option<&MessagePolicy>,
        handler: Arc<dyn CallbackHandler>,
        settings: &Settings,
    ) -> Result<(), AuthenticationError> {
        self.inner
            .initialize(request_policy, response_policy, handler, settings)
            .map_err(|e| convert(self.inner.module_id(), e))
    }

    async fn validate_request(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
        service_subject: &Subject,
    ) -> AuthOutcome {
        self.inner
            .validate_request(ctx, client_subject, service_subject)
            .map_err(|e| convert(self.inner.module_id(), e))
    }

    async fn secure_response(
        &self,
        ctx: &mut MessageContext,
        service_subject: &Subject,
    ) -> AuthOutcome {
        self.inner
            .secure_response(ctx, service_subject)
            .map_err(|e| convert(self.inner.module_id(), e))
    }

    async fn clean_subject(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
    ) -> Result<(), AuthenticationError> {
        self.inner
            .clean_subject(ctx, client_subject)
            .map_err(|e| convert(self.inner.module_id(), e))
    }
}
