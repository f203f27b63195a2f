use std::sync::Arc;

use async_trait::async_trait;

use crate::builder::{AuthenticationFilterBuilder, FilterConfig};
use crate::chain::ModuleChain;
use crate::context::AttributesContext;
use crate::error::ConfigError;
use crate::framework::AuthenticationFramework;
use crate::message::{Request, Response};

/// The resource behind the filter.
///
/// It only runs for requests that validated with `SUCCESS`, and sees the
/// request id, principal and authentication context in `context`.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles an authenticated request.
    async fn handle(&self, context: &mut AttributesContext, request: Request) -> Response;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, context: &mut AttributesContext, request: Request) -> Response {
        (**self).handle(context, request).await
    }
}

/// Places an [`AuthenticationFramework`] in front of a [`Handler`].
///
/// Cloning is cheap; clones share the same runtime.
///
/// # Examples
///
/// ```
/// use authn_filter::{AuthenticationFilter, ConfigError};
/// use authn_filter::audit::RecordingAuditApi;
/// use std::sync::Arc;
///
/// let filter = AuthenticationFilter::builder()
///     .named("orders-api")
///     .audit_api(Arc::new(RecordingAuditApi::new()))
///     .build()
///     .unwrap();
/// assert_eq!(filter.framework().logger().name(), "orders-api");
///
/// let err = AuthenticationFilter::builder().build().unwrap_err();
/// assert!(matches!(err, ConfigError::IllegalState(_)));
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticationFilter {
    framework: Arc<AuthenticationFramework>,
}

impl AuthenticationFilter {
    /// Starts a builder.
    pub fn builder() -> AuthenticationFilterBuilder {
        AuthenticationFilterBuilder::new()
    }

    /// Validates `config`, initializes its modules and assembles the filter.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::IllegalState`] if no audit collaborator was supplied
    /// - [`ConfigError::UnsupportedMessageTypes`] if a module cannot handle
    ///   HTTP requests and responses
    /// - [`ConfigError::ModuleInitialization`] if a module rejects its
    ///   configuration
    pub fn from_config(config: FilterConfig) -> Result<Self, ConfigError> {
        let FilterConfig {
            logger,
            audit_api,
            service_subject,
            response_handler,
            session_module,
            auth_modules,
            chain_strategy,
        } = config;

        let audit_api =
            audit_api.ok_or_else(|| ConfigError::IllegalState("AuditApi has not been set".to_string()))?;

        let session_module = session_module.map(|m| m.initialize()).transpose()?;
        let auth_modules = auth_modules
            .into_iter()
            .map(|m| m.initialize())
            .collect::<Result<Vec<_>, _>>()?;

        let chain = ModuleChain::new(session_module, auth_modules).with_strategy(chain_strategy);
        tracing::info!(
            logger = %logger.name(),
            modules = ?chain.module_ids(),
            "authentication filter assembled"
        );

        Ok(Self::new(AuthenticationFramework::new(
            logger,
            audit_api,
            response_handler,
            Arc::new(chain),
            service_subject,
        )))
    }

    /// Wraps an already assembled runtime.
    pub fn new(framework: AuthenticationFramework) -> Self {
        Self {
            framework: Arc::new(framework),
        }
    }

    /// Returns the runtime.
    pub fn framework(&self) -> &Arc<AuthenticationFramework> {
        &self.framework
    }

    /// Authenticates `request` and forwards it to `next` when allowed.
    pub async fn filter(
        &self,
        context: &mut AttributesContext,
        request: Request,
        next: &dyn Handler,
    ) -> Response {
        self.framework.process_message(context, request, next).await
    }
}
