//! Filter assembly.
//!
//! [`FilterConfig`] holds every input of a filter and is validated in one
//! place, [`AuthenticationFilter::from_config`]. [`AuthenticationFilterBuilder`]
//! is a fluent way to fill it.

use std::fmt;
use std::sync::Arc;

use crate::audit::AuditApi;
use crate::chain::{ChainStrategy, FirstMatch};
use crate::error::ConfigError;
use crate::filter::AuthenticationFilter;
use crate::logging::Logger;
use crate::module::ModuleConfiguration;
use crate::response::{DefaultResponseHandler, ResponseHandler, ResponseWriter};
use crate::subject::Subject;

/// Everything an [`AuthenticationFilter`] is built from.
///
/// `Default` gives a logger named `authn_filter`, an empty service subject,
/// a JSON [`DefaultResponseHandler`], the [`FirstMatch`] strategy, no
/// modules and no audit collaborator. The audit collaborator is required.
pub struct FilterConfig {
    /// Logger of the filter.
    pub logger: Logger,
    /// Audit collaborator; required.
    pub audit_api: Option<Arc<dyn AuditApi>>,
    /// Identity of the protected service.
    pub service_subject: Arc<Subject>,
    /// Converter of authentication errors into responses.
    pub response_handler: Arc<dyn ResponseHandler>,
    /// Module consulted before the auth modules.
    pub session_module: Option<ModuleConfiguration>,
    /// Auth modules in consultation order.
    pub auth_modules: Vec<ModuleConfiguration>,
    /// Fallthrough strategy of the module chain.
    pub chain_strategy: Arc<dyn ChainStrategy>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            logger: Logger::default(),
            audit_api: None,
            service_subject: Arc::new(Subject::new()),
            response_handler: Arc::new(DefaultResponseHandler::new()),
            session_module: None,
            auth_modules: Vec::new(),
            chain_strategy: Arc::new(FirstMatch),
        }
    }
}

impl fmt::Debug for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterConfig")
            .field("logger", &self.logger.name())
            .field("audit_api", &self.audit_api.is_some())
            .field("session_module", &self.session_module)
            .field("auth_modules", &self.auth_modules)
            .field("chain_strategy", &self.chain_strategy)
            .finish_non_exhaustive()
    }
}

/// Fluent builder of [`AuthenticationFilter`]s.
///
/// # Examples
///
/// ```
/// use authn_filter::AuthenticationFilter;
/// use authn_filter::audit::TracingAuditApi;
/// use std::sync::Arc;
///
/// let filter = AuthenticationFilter::builder()
///     .audit_api(Arc::new(TracingAuditApi::new()))
///     .build()
///     .unwrap();
///
/// assert_eq!(filter.framework().logger().name(), "authn_filter");
/// ```
#[derive(Default)]
pub struct AuthenticationFilterBuilder {
    config: FilterConfig,
    response_handler_set: bool,
    response_writers: Vec<Arc<dyn ResponseWriter>>,
}

impl AuthenticationFilterBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the filter's logger.
    #[must_use]
    pub fn named(mut self, name: impl AsRef<str>) -> Self {
        self.config.logger = Logger::named(name);
        self
    }

    /// Replaces the logger.
    #[must_use]
    pub fn logger(mut self, logger: Logger) -> Self {
        self.config.logger = logger;
        self
    }

    /// Sets the audit collaborator.
    #[must_use]
    pub fn audit_api(mut self, audit_api: Arc<dyn AuditApi>) -> Self {
        self.config.audit_api = Some(audit_api);
        self
    }

    /// Sets the service subject.
    #[must_use]
    pub fn service_subject(mut self, subject: Subject) -> Self {
        self.config.service_subject = Arc::new(subject);
        self
    }

    /// Replaces the response handler. Writers added with
    /// [`response_writer`](Self::response_writer) are then ignored.
    #[must_use]
    pub fn response_handler(mut self, handler: Arc<dyn ResponseHandler>) -> Self {
        self.config.response_handler = handler;
        self.response_handler_set = true;
        self
    }

    /// Adds a writer to the default response handler, after the JSON writer.
    #[must_use]
    pub fn response_writer(mut self, writer: Arc<dyn ResponseWriter>) -> Self {
        self.response_writers.push(writer);
        self
    }

    /// Sets the session module.
    #[must_use]
    pub fn session_module(mut self, module: ModuleConfiguration) -> Self {
        self.config.session_module = Some(module);
        self
    }

    /// Appends an auth module.
    #[must_use]
    pub fn auth_module(mut self, module: ModuleConfiguration) -> Self {
        self.config.auth_modules.push(module);
        self
    }

    /// Appends several auth modules, keeping their order.
    #[must_use]
    pub fn auth_modules(mut self, modules: impl IntoIterator<Item = ModuleConfiguration>) -> Self {
        self.config.auth_modules.extend(modules);
        self
    }

    /// Replaces the chain's fallthrough strategy.
    #[must_use]
    pub fn chain_strategy(mut self, strategy: Arc<dyn ChainStrategy>) -> Self {
        self.config.chain_strategy = strategy;
        self
    }

    /// Finishes the configuration without building.
    pub fn into_config(self) -> FilterConfig {
        let Self {
            mut config,
            response_handler_set,
            response_writers,
        } = self;

        if !response_handler_set && !response_writers.is_empty() {
            let handler = response_writers
                .into_iter()
                .fold(DefaultResponseHandler::new(), DefaultResponseHandler::with_writer);
            config.response_handler = Arc::new(handler);
        }
        config
    }

    /// Builds the filter.
    ///
    /// # Errors
    ///
    /// See [`AuthenticationFilter::from_config`].
    pub fn build(self) -> Result<AuthenticationFilter, ConfigError> {
        AuthenticationFilter::from_config(self.into_config())
    }
}

impl fmt::Debug for AuthenticationFilterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationFilterBuilder")
            .field("config", &self.config)
            .field(
                "response_writers",
                &self
                    .response_writers
                    .iter()
                    .map(|w| w.media_type())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
