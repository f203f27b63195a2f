//! End-to-end behavior of the authentication runtime.
//!
//! The authentication context, handler, response handler and audit sink are
//! hand-written fakes that count how often they are called.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use authn_filter::audit::{AuditApi, AuditEvent, AuditOutcome, RecordingAuditApi};
use authn_filter::{
    AttributesContext, AuditError, AuthOutcome, AuthStatus, AuthenticationError,
    AuthenticationFramework, Handler, Logger, MessageContext, Principal, Request, Response,
    ResponseHandler, ServerAuthContext, Subject, ATTRIBUTE_AUTH_CONTEXT, ATTRIBUTE_AUTH_PRINCIPAL,
    ATTRIBUTE_REQUEST_ID,
};
use bytes::Bytes;
use futures::FutureExt;
use http::{HeaderValue, StatusCode};
use parking_lot::Mutex;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Step {
    Settle(Option<AuthStatus>),
    Fail(&'static str),
    Panic,
}

impl Step {
    fn run(&self) -> AuthOutcome {
        match self {
            Step::Settle(status) => Ok(*status),
            Step::Fail(message) => Err(AuthenticationError::new(*message)),
            Step::Panic => panic!("module exploded"),
        }
    }
}

struct FakeAuthContext {
    validate: Step,
    secure: Step,
    fail_clean: bool,
    published_principal: Option<Value>,
    subject_principal: Option<&'static str>,
    validate_calls: AtomicUsize,
    secure_calls: AtomicUsize,
    clean_calls: AtomicUsize,
}

impl FakeAuthContext {
    fn new(validate: Step, secure: Step) -> Self {
        Self {
            validate,
            secure,
            fail_clean: false,
            published_principal: None,
            subject_principal: None,
            validate_calls: AtomicUsize::new(0),
            secure_calls: AtomicUsize::new(0),
            clean_calls: AtomicUsize::new(0),
        }
    }

    fn validating(status: AuthStatus) -> Self {
        Self::new(Step::Settle(Some(status)), Step::Settle(Some(AuthStatus::SendSuccess)))
    }

    fn securing(step: Step) -> Self {
        Self::new(Step::Settle(Some(AuthStatus::Success)), step)
    }

    fn calls(&self) -> (usize, usize, usize) {
        (
            self.validate_calls.load(Ordering::SeqCst),
            self.secure_calls.load(Ordering::SeqCst),
            self.clean_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl ServerAuthContext for FakeAuthContext {
    async fn validate_request(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
        _service_subject: &Subject,
    ) -> AuthOutcome {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(principal) = &self.published_principal {
            ctx.request_context_mut()
                .insert(ATTRIBUTE_AUTH_PRINCIPAL.to_string(), principal.clone());
        }
        if let Some(name) = self.subject_principal {
            client_subject.add_principal(Principal::new(name));
        }
        ctx.request_context_mut()
            .insert("tenant".to_string(), Value::from("acme"));
        *ctx.response_mut().status_mut() = StatusCode::FOUND;
        self.validate.run()
    }

    async fn secure_response(
        &self,
        ctx: &mut MessageContext,
        _service_subject: &Subject,
    ) -> AuthOutcome {
        self.secure_calls.fetch_add(1, Ordering::SeqCst);
        ctx.response_mut()
            .headers_mut()
            .insert("set-cookie", HeaderValue::from_static("session=abc"));
        self.secure.run()
    }

    async fn clean_subject(
        &self,
        _ctx: &mut MessageContext,
        client_subject: &mut Subject,
    ) -> Result<(), AuthenticationError> {
        self.clean_calls.fetch_add(1, Ordering::SeqCst);
        client_subject.clear();
        if self.fail_clean {
            return Err(AuthenticationError::new("clean failed"));
        }
        Ok(())
    }
}

struct FakeHandler {
    status: StatusCode,
    calls: AtomicUsize,
    seen: Mutex<Option<AttributesContext>>,
}

impl FakeHandler {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(None),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for FakeHandler {
    async fn handle(&self, context: &mut AttributesContext, _request: Request) -> Response {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen.lock() = Some(context.clone());
        let mut response = Response::new(Bytes::from_static(b"resource"));
        *response.status_mut() = self.status;
        response
    }
}

#[derive(Default)]
struct FakeResponseHandler {
    errors: Mutex<Vec<String>>,
}

impl FakeResponseHandler {
    fn calls(&self) -> usize {
        self.errors.lock().len()
    }
}

impl ResponseHandler for FakeResponseHandler {
    fn handle(&self, _ctx: &MessageContext, error: &AuthenticationError) -> Response {
        self.errors.lock().push(error.message().to_string());
        let mut response = Response::new(Bytes::new());
        *response.status_mut() = StatusCode::IM_A_TEAPOT;
        response
    }
}

struct FailingAuditApi;

impl AuditApi for FailingAuditApi {
    fn audit(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Err(AuditError::new("audit store offline"))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    auth_context: Arc<FakeAuthContext>,
    handler: FakeHandler,
    response_handler: Arc<FakeResponseHandler>,
    audit: Arc<RecordingAuditApi>,
    framework: AuthenticationFramework,
}

impl Harness {
    fn new(auth_context: FakeAuthContext) -> Self {
        Self::with_handler(auth_context, StatusCode::OK)
    }

    fn with_handler(auth_context: FakeAuthContext, status: StatusCode) -> Self {
        let auth_context = Arc::new(auth_context);
        let response_handler = Arc::new(FakeResponseHandler::default());
        let audit = Arc::new(RecordingAuditApi::new());
        let framework = AuthenticationFramework::new(
            Logger::named("framework-test"),
            audit.clone(),
            response_handler.clone(),
            auth_context.clone(),
            Arc::new(Subject::new()),
        );

        Self {
            auth_context,
            handler: FakeHandler::new(status),
            response_handler,
            audit,
            framework,
        }
    }

    async fn process(&self, context: &mut AttributesContext) -> Response {
        let request = http::Request::builder()
            .method("GET")
            .uri("/orders/7")
            .body(Bytes::new())
            .unwrap();
        self.framework
            .process_message(context, request, &self.handler)
            .await
    }

    fn audit_outcome(&self) -> AuditOutcome {
        let events = self.audit.events();
        assert_eq!(events.len(), 1, "exactly one audit event per request");
        events[0].outcome()
    }
}

// ---------------------------------------------------------------------------
// Validation succeeds
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_dispatches_secures_and_publishes_attributes() {
    let mut fake = FakeAuthContext::validating(AuthStatus::Success);
    fake.subject_principal = Some("alice");
    let harness = Harness::new(fake);
    let mut context = AttributesContext::new();

    let response = harness.process(&mut context).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), &Bytes::from_static(b"resource"));
    assert_eq!(response.headers()["set-cookie"], "session=abc");
    assert_eq!(harness.auth_context.calls(), (1, 1, 1));
    assert_eq!(harness.handler.calls(), 1);
    assert_eq!(harness.response_handler.calls(), 0);

    assert!(context.attribute(ATTRIBUTE_REQUEST_ID).is_some());
    assert_eq!(context.principal(), Some("alice"));
    assert!(context.auth_context().is_some());
    assert_eq!(
        context.attribute(ATTRIBUTE_AUTH_CONTEXT),
        Some(json!({ "tenant": "acme" }))
    );

    let seen = harness.handler.seen.lock().clone().unwrap();
    assert_eq!(seen.principal(), Some("alice"));
    assert_eq!(seen.request_id(), context.request_id());

    assert_eq!(harness.audit_outcome(), AuditOutcome::Success);
    let event = &harness.audit.events()[0];
    assert_eq!(event.principal(), Some("alice"));
    assert_eq!(event.method(), Some("GET"));
    assert_eq!(event.path(), Some("/orders/7"));
}

#[tokio::test]
async fn principal_published_in_context_map_wins() {
    let mut fake = FakeAuthContext::validating(AuthStatus::Success);
    fake.published_principal = Some(Value::from("PRINCIPAL"));
    fake.subject_principal = Some("alice");
    let harness = Harness::new(fake);
    let mut context = AttributesContext::new();

    harness.process(&mut context).await;

    assert_eq!(
        context.attribute(ATTRIBUTE_AUTH_PRINCIPAL),
        Some(Value::from("PRINCIPAL"))
    );
}

#[tokio::test]
async fn principal_is_unset_when_nobody_names_one() {
    let harness = Harness::new(FakeAuthContext::validating(AuthStatus::Success));
    let mut context = AttributesContext::new();

    let response = harness.process(&mut context).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(context.principal().is_none());
    assert!(context.attribute(ATTRIBUTE_AUTH_PRINCIPAL).is_none());
}

#[tokio::test]
async fn upstream_request_id_is_kept() {
    let harness = Harness::new(FakeAuthContext::validating(AuthStatus::Success));
    let mut context = AttributesContext::with_request_id("upstream-9");

    harness.process(&mut context).await;

    assert_eq!(context.request_id(), Some("upstream-9"));
    assert_eq!(harness.audit.events()[0].request_id(), "upstream-9");
}

#[tokio::test]
async fn request_ids_are_unique_per_request() {
    let harness = Harness::new(FakeAuthContext::validating(AuthStatus::SendFailure));
    let mut first = AttributesContext::new();
    let mut second = AttributesContext::new();

    harness.process(&mut first).await;
    harness.process(&mut second).await;

    assert_ne!(first.request_id(), second.request_id());
}

#[tokio::test]
async fn handler_error_status_is_secured_and_returned() {
    let harness = Harness::with_handler(
        FakeAuthContext::validating(AuthStatus::Success),
        StatusCode::BAD_REQUEST,
    );

    let response = harness.process(&mut AttributesContext::new()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(harness.auth_context.calls(), (1, 1, 1));
    assert_eq!(harness.response_handler.calls(), 0);
}

// ---------------------------------------------------------------------------
// Validation short-circuits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_send_failure_is_unauthorized() {
    let harness = Harness::new(FakeAuthContext::validating(AuthStatus::SendFailure));
    let mut context = AttributesContext::new();

    let response = harness.process(&mut context).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.auth_context.calls(), (1, 0, 1));
    assert_eq!(harness.handler.calls(), 0);
    assert_eq!(harness.response_handler.calls(), 0);
    assert!(context.principal().is_none());
    assert!(context.request_id().is_some());
    assert_eq!(harness.audit_outcome(), AuditOutcome::Denied);
}

#[tokio::test]
async fn validation_send_success_returns_module_response() {
    let harness = Harness::new(FakeAuthContext::validating(AuthStatus::SendSuccess));

    let response = harness.process(&mut AttributesContext::new()).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(harness.auth_context.calls(), (1, 0, 1));
    assert_eq!(harness.handler.calls(), 0);
    assert_eq!(harness.audit_outcome(), AuditOutcome::Continue);
}

#[tokio::test]
async fn validation_send_continue_returns_module_response() {
    let harness = Harness::new(FakeAuthContext::validating(AuthStatus::SendContinue));

    let response = harness.process(&mut AttributesContext::new()).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(harness.auth_context.calls(), (1, 0, 1));
    assert_eq!(harness.handler.calls(), 0);
}

#[tokio::test]
async fn invalid_validation_status_goes_to_response_handler() {
    for status in [Some(AuthStatus::Failure), None] {
        let harness = Harness::new(FakeAuthContext::new(
            Step::Settle(status),
            Step::Settle(Some(AuthStatus::SendSuccess)),
        ));

        let response = harness.process(&mut AttributesContext::new()).await;

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(harness.auth_context.calls(), (1, 0, 1));
        assert_eq!(harness.handler.calls(), 0);
        assert_eq!(
            harness.response_handler.errors.lock()[0],
            format!(
                "invalid status {} returned from validate_request",
                AuthStatus::describe(status)
            )
        );
        assert_eq!(harness.audit_outcome(), AuditOutcome::Error);
    }
}

#[tokio::test]
async fn validation_error_goes_to_response_handler() {
    let harness = Harness::new(FakeAuthContext::new(
        Step::Fail("token expired"),
        Step::Settle(Some(AuthStatus::SendSuccess)),
    ));

    let response = harness.process(&mut AttributesContext::new()).await;

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(harness.response_handler.errors.lock()[0], "token expired");
    assert_eq!(harness.auth_context.calls(), (1, 0, 1));
    assert_eq!(harness.handler.calls(), 0);
}

#[tokio::test]
async fn validation_panic_is_converted_and_cleanup_still_runs() {
    let harness = Harness::new(FakeAuthContext::new(
        Step::Panic,
        Step::Settle(Some(AuthStatus::SendSuccess)),
    ));

    let response = harness.process(&mut AttributesContext::new()).await;

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert!(harness.response_handler.errors.lock()[0].contains("module exploded"));
    assert_eq!(harness.auth_context.calls(), (1, 0, 1));
    assert_eq!(harness.audit_outcome(), AuditOutcome::Error);
}

// ---------------------------------------------------------------------------
// Securing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn securing_send_failure_is_internal_server_error() {
    let harness = Harness::new(FakeAuthContext::securing(Step::Settle(Some(
        AuthStatus::SendFailure,
    ))));

    let response = harness.process(&mut AttributesContext::new()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body().is_empty());
    assert_eq!(harness.auth_context.calls(), (1, 1, 1));
    assert_eq!(harness.handler.calls(), 1);
    assert_eq!(harness.response_handler.calls(), 0);
}

#[tokio::test]
async fn securing_send_continue_returns_handler_response() {
    let harness = Harness::new(FakeAuthContext::securing(Step::Settle(Some(
        AuthStatus::SendContinue,
    ))));

    let response = harness.process(&mut AttributesContext::new()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), &Bytes::from_static(b"resource"));
}

#[tokio::test]
async fn invalid_securing_status_goes_to_response_handler() {
    for status in [Some(AuthStatus::Success), Some(AuthStatus::Failure), None] {
        let harness = Harness::new(FakeAuthContext::securing(Step::Settle(status)));

        let response = harness.process(&mut AttributesContext::new()).await;

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(harness.auth_context.calls(), (1, 1, 1));
        assert_eq!(harness.handler.calls(), 1);
        assert_eq!(
            harness.response_handler.errors.lock()[0],
            format!(
                "invalid status {} returned from secure_response",
                AuthStatus::describe(status)
            )
        );
    }
}

#[tokio::test]
async fn securing_error_goes_to_response_handler() {
    let harness = Harness::new(FakeAuthContext::securing(Step::Fail("signing key missing")));

    let response = harness.process(&mut AttributesContext::new()).await;

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(harness.response_handler.errors.lock()[0], "signing key missing");
    assert_eq!(harness.auth_context.calls(), (1, 1, 1));
}

#[tokio::test]
async fn securing_panic_goes_to_response_handler() {
    let harness = Harness::new(FakeAuthContext::securing(Step::Panic));

    let response = harness.process(&mut AttributesContext::new()).await;

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(harness.auth_context.calls(), (1, 1, 1));
}

// ---------------------------------------------------------------------------
// Cleanup and audit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cleanup_failure_does_not_change_response() {
    let mut fake = FakeAuthContext::validating(AuthStatus::Success);
    fake.fail_clean = true;
    let harness = Harness::new(fake);

    let response = harness.process(&mut AttributesContext::new()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.auth_context.calls(), (1, 1, 1));
    assert_eq!(harness.audit_outcome(), AuditOutcome::Success);
}

#[tokio::test]
async fn audit_failure_does_not_change_response() {
    let auth_context = Arc::new(FakeAuthContext::validating(AuthStatus::Success));
    let framework = AuthenticationFramework::new(
        Logger::default(),
        Arc::new(FailingAuditApi),
        Arc::new(FakeResponseHandler::default()),
        auth_context.clone(),
        Arc::new(Subject::new()),
    );
    let handler = FakeHandler::new(StatusCode::OK);

    let response = framework
        .process_message(&mut AttributesContext::new(), Request::default(), &handler)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(auth_context.calls(), (1, 1, 1));
}

// ---------------------------------------------------------------------------
// Dropped requests
// ---------------------------------------------------------------------------

struct NeverResponds;

#[async_trait]
impl Handler for NeverResponds {
    async fn handle(&self, _context: &mut AttributesContext, _request: Request) -> Response {
        futures::future::pending().await
    }
}

#[tokio::test]
async fn request_dropped_mid_dispatch_is_cleaned_and_audited() {
    let mut fake = FakeAuthContext::validating(AuthStatus::Success);
    fake.subject_principal = Some("alice");
    let harness = Harness::new(fake);
    let mut context = AttributesContext::new();

    let finished = harness
        .framework
        .process_message(&mut context, Request::default(), &NeverResponds)
        .now_or_never();

    assert!(finished.is_none());
    assert_eq!(harness.auth_context.calls(), (1, 0, 1));
    assert_eq!(harness.audit_outcome(), AuditOutcome::Error);
    let event = &harness.audit.events()[0];
    assert_eq!(event.principal(), Some("alice"));
    assert_eq!(Some(event.request_id()), context.request_id());
    assert_eq!(event.entries().len(), 0);
}

#[tokio::test]
async fn completed_request_is_not_audited_again_on_drop() {
    let harness = Harness::new(FakeAuthContext::validating(AuthStatus::SendFailure));
    let mut context = AttributesContext::new();

    let finished = harness
        .framework
        .process_message(&mut context, Request::default(), &harness.handler)
        .now_or_never();

    assert_eq!(finished.map(|r| r.status()), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(harness.auth_context.calls(), (1, 0, 1));
    assert_eq!(harness.audit_outcome(), AuditOutcome::Denied);
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn logs_carry_logger_name_and_request_id() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let harness = Harness::new(FakeAuthContext::new(
        Step::Fail("token expired"),
        Step::Settle(Some(AuthStatus::SendSuccess)),
    ));
    let mut context = AttributesContext::with_request_id("req-logged");

    harness.process(&mut context).await;

    let output = logs.contents();
    assert!(output.contains("req-logged"));
    assert!(output.contains("framework-test"));
    assert!(output.contains("request validation failed: token expired"));
    assert!(output.contains("authn{"));
}
