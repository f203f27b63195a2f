/// What a message policy asks a module to protect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Establish the identity of the sender of the message.
    AuthenticateSender,
    /// Protect the integrity of the message content.
    AuthenticateContent,
    /// Establish the identity of the receiver of the message.
    AuthenticateRecipient,
}

/// Policy a module is asked to enforce on requests or responses.
///
/// Policies are handed to the module once, during
/// [`initialize`](crate::ServerAuthModule::initialize). The runtime does not
/// interpret them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePolicy {
    protection: Protection,
    mandatory: bool,
}

impl MessagePolicy {
    /// Creates a policy.
    pub fn new(protection: Protection, mandatory: bool) -> Self {
        Self {
            protection,
            mandatory,
        }
    }

    /// Sender authentication that must succeed for the request to proceed.
    pub fn mandatory() -> Self {
        Self::new(Protection::AuthenticateSender, true)
    }

    /// Sender authentication that may be skipped.
    pub fn optional() -> Self {
        Self::new(Protection::AuthenticateSender, false)
    }

    /// Returns the protection kind.
    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// Returns whether the protection is mandatory.
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }
}

impl Default for MessagePolicy {
    fn default() -> Self {
        Self::mandatory()
    }
}
