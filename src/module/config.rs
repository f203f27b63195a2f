use std::fmt;
use std::sync::Arc;

use super::{
    CallbackHandler, NoOpCallbackHandler, ServerAuthModule, Settings, SyncModuleAdapter,
    SyncServerAuthModule, HTTP_MESSAGE_TYPES,
};
use crate::error::ConfigError;
use crate::policy::MessagePolicy;

/// A module together with everything it is initialized with.
///
/// Nothing runs until the filter is built: [`initialize`](Self::initialize)
/// is called once, by the builder, and the module is shared read-only from
/// then on.
///
/// # Examples
///
/// ```
/// use authn_filter::{configure_module, MessagePolicy, Settings};
/// # use authn_filter::{AuthOutcome, AuthenticationError, CallbackHandler, MessageContext,
/// #     ServerAuthModule, Subject};
/// # use std::sync::Arc;
/// # struct Basic;
/// # #[async_trait::async_trait]
/// # impl ServerAuthModule for Basic {
/// #     fn module_id(&self) -> &str { "basic" }
/// #     fn initialize(&mut self, _: &MessagePolicy, _: Option<&MessagePolicy>,
/// #         _: Arc<dyn CallbackHandler>, _: &Settings) -> Result<(), AuthenticationError> { Ok(()) }
/// #     async fn validate_request(&self, _: &mut MessageContext, _: &mut Subject, _: &Subject)
/// #         -> AuthOutcome { Ok(None) }
/// #     async fn secure_response(&self, _: &mut MessageContext, _: &Subject)
/// #         -> AuthOutcome { Ok(None) }
/// #     async fn clean_subject(&self, _: &mut MessageContext, _: &mut Subject)
/// #         -> Result<(), AuthenticationError> { Ok(()) }
/// # }
///
/// let mut settings = Settings::new();
/// settings.insert("realm".to_string(), "internal".into());
///
/// let config = configure_module(Basic)
///     .request_policy(MessagePolicy::optional())
///     .with_settings(settings);
///
/// assert_eq!(config.module_id(), "basic");
/// ```
pub struct ModuleConfiguration {
    module: Box<dyn ServerAuthModule>,
    request_policy: MessagePolicy,
    response_policy: Option<MessagePolicy>,
    handler: Arc<dyn CallbackHandler>,
    settings: Settings,
}

/// Starts the configuration of an asynchronous module.
pub fn configure_module(module: impl ServerAuthModule + 'static) -> ModuleConfiguration {
    ModuleConfiguration::new(Box::new(module))
}

/// Starts the configuration of a legacy synchronous module.
///
/// The module is wrapped in a [`SyncModuleAdapter`].
pub fn configure_legacy_module(module: impl SyncServerAuthModule + 'static) -> ModuleConfiguration {
    ModuleConfiguration::new(Box::new(SyncModuleAdapter::new(module)))
}

impl ModuleConfiguration {
    fn new(module: Box<dyn ServerAuthModule>) -> Self {
        Self {
            module,
            request_policy: MessagePolicy::default(),
            response_policy: None,
            handler: Arc::new(NoOpCallbackHandler),
            settings: Settings::new(),
        }
    }

    /// Sets the request policy. Defaults to a mandatory sender policy.
    #[must_use]
    pub fn request_policy(mut self, policy: MessagePolicy) -> Self {
        self.request_policy = policy;
        self
    }

    /// Sets the response policy. Unset by default.
    #[must_use]
    pub fn response_policy(mut self, policy: MessagePolicy) -> Self {
        self.response_policy = Some(policy);
        self
    }

    /// Sets the callback handler bound to the module.
    #[must_use]
    pub fn callback_handler(mut self, handler: Arc<dyn CallbackHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Replaces the module settings.
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the id of the configured module.
    pub fn module_id(&self) -> &str {
        self.module.module_id()
    }

    /// Checks the module's message types and initializes it.
    pub(crate) fn initialize(self) -> Result<Arc<dyn ServerAuthModule>, ConfigError> {
        let Self {
            mut module,
            request_policy,
            response_policy,
            handler,
            settings,
        } = self;

        let supported = module.supported_message_types();
        if !HTTP_MESSAGE_TYPES.iter().all(|t| supported.contains(t)) {
            return Err(ConfigError::UnsupportedMessageTypes {
                module: module.module_id().to_string(),
            });
        }

        if let Err(source) =
            module.initialize(&request_policy, response_policy.as_ref(), handler, &settings)
        {
            return Err(ConfigError::ModuleInitialization {
                module: module.module_id().to_string(),
                source,
            });
        }

        tracing::debug!(module = %module.module_id(), "authentication module initialized");

        Ok(Arc::from(module))
    }
}

impl fmt::Debug for ModuleConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleConfiguration")
            .field("module", &self.module.module_id())
            .field("request_policy", &self.request_policy)
            .field("response_policy", &self.response_policy)
            .field("settings", &self.settings.keys().collect::<Vec<_>>())
            .finish()
    }
}
