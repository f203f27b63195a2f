use std::fmt;

/// A credential value that never appears in formatted output.
///
/// `Secret<T>` holds private credentials (passwords, bearer tokens, session
/// keys) inside a [`Subject`](crate::Subject). The value is only reachable
/// through [`expose_secret`](Self::expose_secret).
///
/// # Examples
///
/// ```
/// use authn_filter::Secret;
///
/// let token = Secret::new("eyJhbGciOi...".to_string());
///
/// assert_eq!(format!("{:?}", token), "[REDACTED]");
/// assert_eq!(format!("{}", token), "[REDACTED]");
/// assert_eq!(token.expose_secret(), "eyJhbGciOi...");
/// ```
// Do NOT derive Clone, Copy or Default: credentials must not be duplicated
// implicitly, and the field stays private.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a credential.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the credential.
    ///
    /// Callers must not log or display the returned value.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }

    /// Consumes the wrapper and returns the credential.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
