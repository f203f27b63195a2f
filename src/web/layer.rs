use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tower::{Layer, Service, ServiceExt};

use crate::context::AttributesContext;
use crate::filter::{AuthenticationFilter, Handler};
use crate::message::{Request, Response};

// ---------------------------------------------------------------------------
// AuthenticationLayer
// ---------------------------------------------------------------------------

/// Tower layer that authenticates every request before the inner service.
///
/// An [`AttributesContext`] already present in the request extensions is
/// reused, so a request id assigned upstream survives.
#[derive(Debug, Clone)]
pub struct AuthenticationLayer {
    filter: AuthenticationFilter,
}

impl AuthenticationLayer {
    /// Creates a layer around `filter`.
    pub fn new(filter: AuthenticationFilter) -> Self {
        Self { filter }
    }
}

impl<S> Layer<S> for AuthenticationLayer {
    type Service = AuthenticationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthenticationService {
            filter: self.filter.clone(),
            inner,
        }
    }
}

// ---------------------------------------------------------------------------
// AuthenticationService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`AuthenticationLayer`].
///
/// The final [`AttributesContext`] is also attached to the response
/// extensions.
///
/// The returned future is not spawned. If an outer layer drops it (a
/// timeout, a disconnected client), the request is abandoned where it
/// stands: cleanup is polled once if it had not started, and the request is
/// audited with an `error` outcome.
#[derive(Debug, Clone)]
pub struct AuthenticationService<S> {
    filter: AuthenticationFilter,
    inner: S,
}

/// Adapts the inner service to the filter's [`Handler`] contract.
struct Downstream<S> {
    inner: S,
}

#[async_trait]
impl<S> Handler for Downstream<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send,
{
    async fn handle(&self, context: &mut AttributesContext, mut request: Request) -> Response {
        request.extensions_mut().insert(context.clone());
        match self.inner.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

impl<S> Service<Request> for AuthenticationService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Each call drives its own clone of the inner service.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let filter = self.filter.clone();
        let downstream = Downstream {
            inner: self.inner.clone(),
        };
        let mut context = request
            .extensions_mut()
            .remove::<AttributesContext>()
            .unwrap_or_default();

        Box::pin(async move {
            let mut response = filter.filter(&mut context, request, &downstream).await;
            response.extensions_mut().insert(context);
            Ok(response)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
