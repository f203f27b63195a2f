//! A protected resource behind a bearer-token module and a session module.
//!
//! Run with `cargo run --example protected_resource` and watch the
//! `authn_audit` events scroll by.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use authn_filter::audit::TracingAuditApi;
use authn_filter::web::AuthenticationLayer;
use authn_filter::{
    configure_module, AttributesContext, AuthOutcome, AuthStatus, AuthenticationError,
    AuthenticationFilter, CallbackHandler, MessageContext, MessagePolicy, Principal, Request,
    Response, ServerAuthModule, Settings, Subject, ATTRIBUTE_AUTH_PRINCIPAL,
};
use bytes::Bytes;
use http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use http::HeaderValue;
use tower::{Layer, Service, ServiceExt};

/// Accepts `Authorization: Bearer <user>` for users listed in the settings.
#[derive(Default)]
struct BearerModule {
    users: Vec<String>,
}

#[async_trait]
impl ServerAuthModule for BearerModule {
    fn module_id(&self) -> &str {
        "bearer"
    }

    fn initialize(
        &mut self,
        _request_policy: &MessagePolicy,
        _response_policy: Option<&MessagePolicy>,
        _handler: Arc<dyn CallbackHandler>,
        settings: &Settings,
    ) -> Result<(), AuthenticationError> {
        let users = settings
            .get("users")
            .cloned()
            .ok_or_else(|| AuthenticationError::new("missing 'users' setting"))?;
        self.users = serde_json::from_value(users)
            .map_err(|e| AuthenticationError::with_source("invalid 'users' setting", e))?;
        Ok(())
    }

    async fn validate_request(
        &self,
        ctx: &mut MessageContext,
        client_subject: &mut Subject,
        _service_subject: &Subject,
    ) -> AuthOutcome {
        let token = ctx
            .request()
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);

        match token {
            Some(user) if self.users.contains(&user) => {
                client_subject.add_principal(Principal::new(user));
                Ok(Some(AuthStatus::Success))
            }
            Some(_) => Err(AuthenticationError::new("unknown bearer token")
                .with_status(http::StatusCode::FORBIDDEN)),
            None => Ok(Some(AuthStatus::SendFailure)),
        }
    }

    async fn secure_response(
        &self,
        _ctx: &mut MessageContext,
        _service_subject: &Subject,
    ) -> AuthOutcome {
        Ok(Some(AuthStatus::SendSuccess))
    }

    async fn clean_subject(
        &self,
        _ctx: &mut MessageContext,
        client_subject: &mut Subject,
    ) -> Result<(), AuthenticationError> {
        client_subject.clear();
        Ok(())
    }
}

/// Trusts a `session=<user>` cookie and issues one after a login.
struct SessionModule;

#[async_trait]
impl ServerAuthModule for SessionModule {
    fn module_id(&self) -> &str {
        "session"
    }

    fn initialize(
        &mut self,
        _request_policy: &MessagePolicy,
        _response_policy: Option<&MessagePolicy>,
        _handler: Arc<dyn CallbackHandler>,
        _settings: &Settings,
    ) -> Result<(), AuthenticationError> {
        Ok(())
    }

    async fn validate_request(
        &self,
        ctx: &mut MessageContext,
        _client_subject: &mut Subject,
        _service_subject: &Subject,
    ) -> AuthOutcome {
        let user = ctx
            .request()
            .headers()
            .get(COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("session="))
            .map(str::to_string);

        match user {
            Some(user) => {
                ctx.request_context_mut()
                    .insert(ATTRIBUTE_AUTH_PRINCIPAL.to_string(), user.into());
                Ok(Some(AuthStatus::Success))
            }
            None => Ok(Some(AuthStatus::SendFailure)),
        }
    }

    async fn secure_response(
        &self,
        ctx: &mut MessageContext,
        _service_subject: &Subject,
    ) -> AuthOutcome {
        let user = ctx
            .request_context()
            .get(ATTRIBUTE_AUTH_PRINCIPAL)
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if let Some(cookie) = user.and_then(|u| HeaderValue::from_str(&format!("session={u}")).ok()) {
            ctx.response_mut().headers_mut().insert(SET_COOKIE, cookie);
        }
        Ok(Some(AuthStatus::SendSuccess))
    }

    async fn clean_subject(
        &self,
        _ctx: &mut MessageContext,
        _client_subject: &mut Subject,
    ) -> Result<(), AuthenticationError> {
        Ok(())
    }
}

/// The protected resource.
#[derive(Clone)]
struct Orders;

impl Service<Request> for Orders {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let principal = request
            .extensions()
            .get::<AttributesContext>()
            .and_then(|ctx| ctx.principal().map(str::to_string))
            .unwrap_or_default();
        Box::pin(async move { Ok(Response::new(Bytes::from(format!("orders of {principal}")))) })
    }
}

fn request(header: Option<(http::HeaderName, &str)>) -> Request {
    let mut request = Request::new(Bytes::new());
    *request.uri_mut() = http::Uri::from_static("/orders");
    if let Some((name, value)) = header {
        if let Ok(value) = HeaderValue::from_str(value) {
            request.headers_mut().insert(name, value);
        }
    }
    request
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut settings = Settings::new();
    settings.insert("users".to_string(), serde_json::json!(["alice", "bob"]));

    let filter = AuthenticationFilter::builder()
        .named("orders-api")
        .audit_api(Arc::new(TracingAuditApi::new()))
        .session_module(configure_module(SessionModule))
        .auth_module(configure_module(BearerModule::default()).with_settings(settings))
        .build()?;

    let service = AuthenticationLayer::new(filter).layer(Orders);

    let scenarios = [
        ("anonymous", None),
        ("bearer login", Some((AUTHORIZATION, "Bearer alice"))),
        ("session cookie", Some((COOKIE, "session=alice"))),
        ("unknown token", Some((AUTHORIZATION, "Bearer mallory"))),
    ];

    for (name, header) in scenarios {
        let response = service.clone().oneshot(request(header)).await?;
        println!(
            "{name:>15}: {} {:?} {}",
            response.status(),
            response.headers().get(SET_COOKIE),
            String::from_utf8_lossy(response.body())
        );
    }

    Ok(())
}
