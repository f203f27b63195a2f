use crate::secret::Secret;

/// A resolved identity attached to a [`Subject`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    name: String,
}

impl Principal {
    /// Creates a principal with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the principal name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Mutable container of principals and credentials.
///
/// The runtime creates a fresh client subject for every request and lets
/// modules populate it during validation. The service subject is created once
/// at build time and only read afterwards.
///
/// # Examples
///
/// ```
/// use authn_filter::{Principal, Subject};
///
/// let mut subject = Subject::new();
/// subject.add_principal(Principal::new("alice"));
/// subject.add_private_credential("s3cr3t");
///
/// assert_eq!(subject.principals()[0].name(), "alice");
/// assert!(!format!("{:?}", subject).contains("s3cr3t"));
/// ```
#[derive(Debug, Default)]
pub struct Subject {
    principals: Vec<Principal>,
    public_credentials: Vec<String>,
    private_credentials: Vec<Secret<String>>,
}

impl Subject {
    /// Creates an empty subject.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a principal unless an equal one is already present.
    pub fn add_principal(&mut self, principal: Principal) {
        if !self.principals.contains(&principal) {
            self.principals.push(principal);
        }
    }

    /// Principals in insertion order.
    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    /// Adds a public credential (for example a certificate fingerprint).
    pub fn add_public_credential(&mut self, credential: impl Into<String>) {
        self.public_credentials.push(credential.into());
    }

    /// Public credentials in insertion order.
    pub fn public_credentials(&self) -> &[String] {
        &self.public_credentials
    }

    /// Adds a private credential. It is kept redacted.
    pub fn add_private_credential(&mut self, credential: impl Into<String>) {
        self.private_credentials.push(Secret::new(credential.into()));
    }

    /// Private credentials in insertion order.
    pub fn private_credentials(&self) -> &[Secret<String>] {
        &self.private_credentials
    }

    /// Returns true when the subject holds nothing.
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
            && self.public_credentials.is_empty()
            && self.private_credentials.is_empty()
    }

    /// Removes every principal and credential.
    pub fn clear(&mut self) {
        self.principals.clear();
        self.public_credentials.clear();
        self.private_credentials.clear();
    }
}
