//! Module chain: the authentication context the runtime talks to.
//!
//! The runtime never sees individual modules. It calls the three phases of a
//! [`ServerAuthContext`], and [`ModuleChain`] fans each phase out to its
//! candidates: the session module first (if any), then the auth modules in
//! configuration order. How far a validation walk goes, and whether the
//! session module secures after the authenticator, is decided by a
//! [`ChainStrategy`]. A module that panics counts as a failed module.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::audit::AuditPhase;
use crate::error::AuthenticationError;
use crate::guard::guarded;
use crate::message::MessageContext;
use crate::module::ServerAuthModule;
use crate::status::{AuthOutcome, AuthStatus};
use crate::subject::Subject;

/// The capability set the runtime drives for every request.
#[async_trait]
pub trait ServerAuthContext: Send + Sync {
    /// Validates the request held by `ctx`.
    async fn validate_request(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
        service_subject: &Subject,
    ) -> AuthOutcome;

    /// Secures the response held by `ctx`.
    async fn secure_response(&self, ctx: &mut MessageContext, service_subject: &Subject)
        -> AuthOutcome;

    /// Cleans the client subject.
    async fn clean_subject(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
    ) -> Result<(), AuthenticationError>;
}

/// Decides how far a validation walk goes and who secures the response.
pub trait ChainStrategy: Send + Sync + fmt::Debug {
    /// Returns true if the walk continues past a module that settled with
    /// `status`.
    fn falls_through(&self, status: Option<AuthStatus>) -> bool;

    /// Status returned when every candidate fell through.
    fn exhausted(&self) -> Option<AuthStatus> {
        Some(AuthStatus::SendFailure)
    }

    /// Returns true if a separate session module secures the response after
    /// the authenticating module secured it with `status`.
    fn session_secures_after(&self, status: Option<AuthStatus>) -> bool {
        matches!(
            status,
            Some(AuthStatus::SendSuccess | AuthStatus::SendContinue)
        )
    }
}

/// The first module that does not answer `SEND_FAILURE` decides.
///
/// `SEND_FAILURE` from a module means "these credentials are not mine"; any
/// other status, and any error, ends the walk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstMatch;

impl ChainStrategy for FirstMatch {
    fn falls_through(&self, status: Option<AuthStatus>) -> bool {
        status == Some(AuthStatus::SendFailure)
    }
}

/// Optional session module followed by ordered auth modules.
///
/// # Securing
///
/// Only the module that authenticated the request secures the response. If
/// [`ChainStrategy::session_secures_after`] accepts its status (by default
/// `SEND_SUCCESS` or `SEND_CONTINUE`) and a separate session module is
/// configured, the session module secures next so it can establish a
/// session; its status is the result. A request nobody authenticated is
/// secured with `SEND_SUCCESS`.
///
/// # Cleaning
///
/// Every module is cleaned, even after a failure or a panic; the first
/// failure is returned.
pub struct ModuleChain {
    candidates: Vec<Arc<dyn ServerAuthModule>>,
    has_session: bool,
    strategy: Arc<dyn ChainStrategy>,
}

impl ModuleChain {
    /// Creates a chain using the [`FirstMatch`] strategy.
    pub fn new(
        session_module: Option<Arc<dyn ServerAuthModule>>,
        auth_modules: Vec<Arc<dyn ServerAuthModule>>,
    ) -> Self {
        let has_session = session_module.is_some();
        let mut candidates = Vec::with_capacity(auth_modules.len() + 1);
        candidates.extend(session_module);
        candidates.extend(auth_modules);

        Self {
            candidates,
            has_session,
            strategy: Arc::new(FirstMatch),
        }
    }

    /// Replaces the fallthrough strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn ChainStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns the session module.
    pub fn session_module(&self) -> Option<&Arc<dyn ServerAuthModule>> {
        if self.has_session {
            self.candidates.first()
        } else {
            None
        }
    }

    /// Returns the auth modules in consultation order.
    pub fn auth_modules(&self) -> &[Arc<dyn ServerAuthModule>] {
        let skip = usize::from(self.has_session);
        &self.candidates[skip..]
    }

    /// Returns the ids of all modules, session module first.
    pub fn module_ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|m| m.module_id()).collect()
    }

    /// Returns the module that authenticated the request held by `ctx`.
    pub fn authenticated_module(&self, ctx: &MessageContext) -> Option<&Arc<dyn ServerAuthModule>> {
        ctx.authenticated_by.and_then(|index| self.candidates.get(index))
    }

    async fn secure_with(
        module: &Arc<dyn ServerAuthModule>,
        ctx: &mut MessageContext,
        service_subject: &Subject,
    ) -> AuthOutcome {
        let outcome = guarded(module.secure_response(ctx, service_subject)).await;
        record(ctx, module.module_id(), AuditPhase::SecureResponse, &outcome);
        outcome
    }
}

fn record(ctx: &mut MessageContext, module_id: &str, phase: AuditPhase, outcome: &AuthOutcome) {
    match outcome {
        Ok(status) => {
            tracing::debug!(
                request_id = %ctx.request_id(),
                module = %module_id,
                %phase,
                status = %AuthStatus::describe(*status),
                "module settled"
            );
            ctx.audit_trail_mut().record_status(module_id, phase, *status);
        }
        Err(err) => {
            tracing::debug!(
                request_id = %ctx.request_id(),
                module = %module_id,
                %phase,
                error = %err,
                "module failed"
            );
            ctx.audit_trail_mut().record_failure(module_id, phase, err);
        }
    }
}

#[async_trait]
impl ServerAuthContext for ModuleChain {
    async fn validate_request(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
        service_subject: &Subject,
    ) -> AuthOutcome {
        ctx.authenticated_by = None;

        for (index, module) in self.candidates.iter().enumerate() {
            let outcome =
                guarded(module.validate_request(ctx, client_subject, service_subject)).await;
            record(ctx, module.module_id(), AuditPhase::ValidateRequest, &outcome);

            let status = outcome?;
            if self.strategy.falls_through(status) {
                continue;
            }
            if status == Some(AuthStatus::Success) {
                ctx.authenticated_by = Some(index);
            }
            return Ok(status);
        }

        Ok(self.strategy.exhausted())
    }

    async fn secure_response(
        &self,
        ctx: &mut MessageContext,
        service_subject: &Subject,
    ) -> AuthOutcome {
        let Some(index) = ctx.authenticated_by else {
            return Ok(Some(AuthStatus::SendSuccess));
        };
        let Some(authenticator) = self.candidates.get(index) else {
            return Ok(Some(AuthStatus::SendSuccess));
        };

        let status = Self::secure_with(authenticator, ctx, service_subject).await?;

        match self.session_module() {
            Some(session) if index != 0 && self.strategy.session_secures_after(status) => {
                Self::secure_with(session, ctx, service_subject).await
            }
            _ => Ok(status),
        }
    }

    async fn clean_subject(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
    ) -> Result<(), AuthenticationError> {
        let mut first_error = None;

        for module in &self.candidates {
            if let Err(err) = guarded(module.clean_subject(ctx, client_subject)).await {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    module = %module.module_id(),
                    error = %err,
                    "module failed to clean subject"
                );
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ModuleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleChain")
            .field(
                "session_module",
                &self.session_module().map(|m| m.module_id()),
            )
            .field(
                "auth_modules",
                &self
                    .auth_modules()
                    .iter()
                    .map(|m| m.module_id())
                    .collect::<Vec<_>>(),
            )
            .field("strategy", &self.strategy)
            .finish()
    }
}
