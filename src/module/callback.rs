use crate::error::AuthenticationError;

/// Request a module makes to its container through a [`CallbackHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// Names the caller the module authenticated.
    CallerPrincipal(String),
    /// Group memberships of the authenticated caller.
    GroupPrincipal(Vec<String>),
}

/// Container-side handler of module callbacks.
///
/// The handler is bound to a module once, during initialization.
pub trait CallbackHandler: Send + Sync {
    /// Processes the callbacks in order.
    ///
    /// # Errors
    ///
    /// Returns an error when a callback cannot be honored.
    fn handle(&self, callbacks: &mut [Callback]) -> Result<(), AuthenticationError>;
}

/// Handler that accepts and ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCallbackHandler;

impl CallbackHandler for NoOpCallbackHandler {
    fn handle(&self, _callbacks: &mut [Callback]) -> Result<(), AuthenticationError> {
        Ok(())
    }
}
