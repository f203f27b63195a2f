use std::fmt;

use crate::error::AuthenticationError;

/// Outcome code of a validate or secure phase.
///
/// A phase may also settle with no status at all (`None`); the runtime treats
/// that the same way as any other status it does not expect in that phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStatus {
    /// The request was authenticated and may proceed to the resource.
    Success,
    /// The module wrote a complete response; the dialog is finished.
    SendSuccess,
    /// The module wrote a response and expects the client to continue the
    /// dialog (for example a challenge or a redirect to a login page).
    SendContinue,
    /// Authentication failed and the client should be told so.
    SendFailure,
    /// Authentication failed without a response to send.
    Failure,
}

impl AuthStatus {
    /// Renders an optional status the way logs and generated errors show it.
    pub fn describe(status: Option<Self>) -> String {
        status.map_or_else(|| "null".to_string(), |s| s.to_string())
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthStatus::Success => "SUCCESS",
            AuthStatus::SendSuccess => "SEND_SUCCESS",
            AuthStatus::SendContinue => "SEND_CONTINUE",
            AuthStatus::SendFailure => "SEND_FAILURE",
            AuthStatus::Failure => "FAILURE",
        };
        f.write_str(name)
    }
}

/// Settled result of a validate or secure phase.
pub type AuthOutcome = Result<Option<AuthStatus>, AuthenticationError>;
