//! The per-request authentication runtime.
//!
//! Every request walks the same states:
//!
//! ```text
//! START -> VALIDATING -> DISPATCH -> SECURING -> DONE
//!                     \-> SHORT_CIRCUIT ------> DONE
//!                     \-> ERROR --------------> DONE
//! ```
//!
//! `clean_subject` runs exactly once, immediately before `DONE`, on every
//! path. The runtime then sends one audit event and returns a response; it
//! never fails. A request future dropped mid-flight is still audited, as an
//! `error`.

use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use http::StatusCode;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::audit::{AuditApi, AuditOutcome};
use crate::chain::ServerAuthContext;
use crate::context::{AttributesContext, ATTRIBUTE_AUTH_PRINCIPAL};
use crate::error::{AuditError, AuthenticationError};
use crate::filter::Handler;
use crate::guard::guarded;
use crate::logging::{Logger, RequestLog};
use crate::message::{MessageContext, Request, Response};
use crate::response::ResponseHandler;
use crate::status::AuthStatus;
use crate::subject::Subject;

/// Drives an authentication context through validate, dispatch, secure and
/// cleanup for every request.
///
/// All collaborators are shared and read-only after construction; one
/// framework serves any number of concurrent requests.
pub struct AuthenticationFramework {
    logger: Logger,
    audit_api: Arc<dyn AuditApi>,
    response_handler: Arc<dyn ResponseHandler>,
    auth_context: Arc<dyn ServerAuthContext>,
    service_subject: Arc<Subject>,
}

impl AuthenticationFramework {
    /// Creates a runtime from its collaborators.
    pub fn new(
        logger: Logger,
        audit_api: Arc<dyn AuditApi>,
        response_handler: Arc<dyn ResponseHandler>,
        auth_context: Arc<dyn ServerAuthContext>,
        service_subject: Arc<Subject>,
    ) -> Self {
        Self {
            logger,
            audit_api,
            response_handler,
            auth_context,
            service_subject,
        }
    }

    /// Returns the logger.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Returns the audit collaborator.
    pub fn audit_api(&self) -> &Arc<dyn AuditApi> {
        &self.audit_api
    }

    /// Returns the response handler.
    pub fn response_handler(&self) -> &Arc<dyn ResponseHandler> {
        &self.response_handler
    }

    /// Returns the authentication context.
    pub fn auth_context(&self) -> &Arc<dyn ServerAuthContext> {
        &self.auth_context
    }

    /// Returns the service subject.
    pub fn service_subject(&self) -> &Arc<Subject> {
        &self.service_subject
    }

    /// Authenticates `request`, dispatches it to `next` if allowed, and
    /// returns the final response.
    ///
    /// The request id in `context` is kept if already assigned, otherwise
    /// a UUID v4 is generated. After successful validation the resolved
    /// principal, the authentication context and the values modules
    /// published are written to `context` before `next` runs.
    pub async fn process_message(
        &self,
        context: &mut AttributesContext,
        request: Request,
        next: &dyn Handler,
    ) -> Response {
        let request_id = context
            .assign_request_id(|| Uuid::new_v4().to_string())
            .to_string();
        let span = tracing::info_span!(
            "authn",
            logger = %self.logger.name(),
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
        );

        self.run(context, request, next, request_id)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        context: &mut AttributesContext,
        request: Request,
        next: &dyn Handler,
        request_id: String,
    ) -> Response {
        let log = self.logger.for_request(&request_id);
        let mut flight = InFlight::new(self, request_id.clone(), request);

        let (response, outcome) = self.authenticate(&log, context, &mut flight, next).await;

        flight.cleanup_started = true;
        let cleaned = guarded(
            self.auth_context
                .clean_subject(&mut flight.ctx, &mut flight.client_subject),
        )
        .await;
        if let Err(err) = cleaned {
            log.error(format_args!("failed to clean client subject: {}", err));
        }

        flight.audited = true;
        if let Err(err) = flight.send_audit(context.principal(), outcome) {
            log.error(format_args!("{}", err));
        }

        log.debug(format_args!(
            "request finished: outcome={}, status={}",
            outcome,
            response.status()
        ));
        response
    }

    async fn authenticate(
        &self,
        log: &RequestLog<'_>,
        context: &mut AttributesContext,
        flight: &mut InFlight<'_>,
        next: &dyn Handler,
    ) -> (Response, AuditOutcome) {
        let validated = guarded(self.auth_context.validate_request(
            &mut flight.ctx,
            &mut flight.client_subject,
            &self.service_subject,
        ))
        .await;

        let status = match validated {
            Ok(status) => status,
            Err(err) => {
                log.warn(format_args!("request validation failed: {}", err));
                return (self.handle_error(&flight.ctx, &err), AuditOutcome::Error);
            }
        };
        log.debug(format_args!(
            "validate_request settled: {}",
            AuthStatus::describe(status)
        ));

        match status {
            Some(AuthStatus::Success) => {}
            Some(AuthStatus::SendSuccess | AuthStatus::SendContinue) => {
                return (flight.ctx.take_response(), AuditOutcome::Continue);
            }
            Some(AuthStatus::SendFailure) => {
                return (fixed(StatusCode::UNAUTHORIZED), AuditOutcome::Denied);
            }
            invalid => {
                let err = invalid_status(invalid, "validate_request");
                log.error(format_args!("{}", err));
                return (self.handle_error(&flight.ctx, &err), AuditOutcome::Error);
            }
        }

        flight.principal = resolve_principal(&flight.ctx, &flight.client_subject);
        context.set_principal(flight.principal.clone());
        context.set_auth_context(
            self.auth_context.clone(),
            flight.ctx.request_context().clone(),
        );

        log.debug(format_args!("dispatching request"));
        let request = flight.ctx.detach_request();
        let response = next.handle(context, request).await;
        flight.ctx.set_response(response);

        let secured = guarded(
            self.auth_context
                .secure_response(&mut flight.ctx, &self.service_subject),
        )
        .await;

        match secured {
            Ok(Some(AuthStatus::SendSuccess | AuthStatus::SendContinue)) => {
                (flight.ctx.take_response(), AuditOutcome::Success)
            }
            Ok(Some(AuthStatus::SendFailure)) => {
                log.warn(format_args!("response securing failed"));
                (fixed(StatusCode::INTERNAL_SERVER_ERROR), AuditOutcome::Error)
            }
            Ok(invalid) => {
                let err = invalid_status(invalid, "secure_response");
                log.error(format_args!("{}", err));
                (self.handle_error(&flight.ctx, &err), AuditOutcome::Error)
            }
            Err(err) => {
                log.warn(format_args!("response securing failed: {}", err));
                (self.handle_error(&flight.ctx, &err), AuditOutcome::Error)
            }
        }
    }

    fn handle_error(&self, ctx: &MessageContext, error: &AuthenticationError) -> Response {
        self.response_handler.handle(ctx, error)
    }
}

impl std::fmt::Debug for AuthenticationFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationFramework")
            .field("logger", &self.logger.name())
            .finish_non_exhaustive()
    }
}

/// Per-request state the runtime owns while a request is being processed.
///
/// If the request future is dropped before it finishes (a timeout, a client
/// disconnect), `Drop` settles what is left: cleanup is polled once if it
/// never started, and the request is audited with an `error` outcome.
struct InFlight<'a> {
    framework: &'a AuthenticationFramework,
    span: tracing::Span,
    request_id: String,
    method: String,
    path: String,
    ctx: MessageContext,
    client_subject: Subject,
    principal: Option<String>,
    cleanup_started: bool,
    audited: bool,
}

impl<'a> InFlight<'a> {
    fn new(framework: &'a AuthenticationFramework, request_id: String, request: Request) -> Self {
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let ctx = MessageContext::new(request_id.as_str(), request);

        Self {
            framework,
            span: tracing::Span::current(),
            request_id,
            method,
            path,
            ctx,
            client_subject: Subject::new(),
            principal: None,
            cleanup_started: false,
            audited: false,
        }
    }

    fn send_audit(&self, principal: Option<&str>, outcome: AuditOutcome) -> Result<(), AuditError> {
        let event = self
            .ctx
            .audit_trail()
            .to_event(&self.request_id, principal, outcome)
            .with_method(self.method.as_str())
            .with_path(self.path.as_str());
        self.framework.audit_api.audit(&event)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.audited {
            return;
        }
        let framework = self.framework;
        let _entered = self.span.clone().entered();
        let log = framework.logger.for_request(&self.request_id);
        log.warn(format_args!("request dropped before completion"));

        if !self.cleanup_started {
            self.cleanup_started = true;
            let cleaned = guarded(
                framework
                    .auth_context
                    .clean_subject(&mut self.ctx, &mut self.client_subject),
            )
            .now_or_never();
            match cleaned {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    log.error(format_args!("failed to clean client subject: {}", err));
                }
                None => log.error(format_args!("client subject cleanup did not complete")),
            }
        }
        self.client_subject.clear();

        self.audited = true;
        if let Err(err) = self.send_audit(self.principal.as_deref(), AuditOutcome::Error) {
            log.error(format_args!("{}", err));
        }
    }
}

/// Resolves the principal: a value modules published under
/// [`ATTRIBUTE_AUTH_PRINCIPAL`] wins over the client subject.
fn resolve_principal(ctx: &MessageContext, client_subject: &Subject) -> Option<String> {
    match ctx.request_context().get(ATTRIBUTE_AUTH_PRINCIPAL) {
        Some(Value::String(name)) => Some(name.clone()),
        Some(Value::Null) | None => client_subject
            .principals()
            .first()
            .map(|p| p.name().to_string()),
        Some(other) => Some(other.to_string()),
    }
}

fn fixed(status: StatusCode) -> Response {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

fn invalid_status(status: Option<AuthStatus>, phase: &str) -> AuthenticationError {
    AuthenticationError::new(format!(
        "invalid status {} returned from {}",
        AuthStatus::describe(status),
        phase
    ))
}
