//! Storage error taxonomy shared by every naas crate.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Used as the source slot of [`Error`] so any provider-SDK or transport
/// error can be attached without leaking its concrete type across crate
/// boundaries.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors surfaced by storage operations.
///
/// Provider-SDK and transport failures are translated into one of these
/// kinds at the adaptor boundary; callers never see raw SDK error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Credentials are missing, malformed, or rejected outright.
    BadCredentials,
    /// The provider rejected a session token as past its expiry.
    ExpiredToken,
    /// The logical storage container does not exist.
    StorageNotFound,
    /// The object or local source file does not exist.
    FileNotFound,
    /// Access denied despite valid-looking credentials.
    Forbidden,
    /// Malformed request (e.g. an invalid object key).
    BadRequest,
    /// The control-plane credential issuance call failed.
    CredentialIssuance,
    /// No provider adaptor is registered for the container's provider id.
    UnknownProvider,
    /// Transport-level failure reaching the control plane or provider.
    Connection,
    /// Serialization/deserialization error.
    Serialization,
    /// Internal invariant violation.
    Internal,
}

/// A structured error for storage operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new bad credentials error.
    pub fn bad_credentials() -> Self {
        Self::new(ErrorKind::BadCredentials)
    }

    /// Creates a new expired token error.
    pub fn expired_token() -> Self {
        Self::new(ErrorKind::ExpiredToken)
    }

    /// Creates a new storage not found error.
    pub fn storage_not_found() -> Self {
        Self::new(ErrorKind::StorageNotFound)
    }

    /// Creates a new file not found error.
    pub fn file_not_found() -> Self {
        Self::new(ErrorKind::FileNotFound)
    }

    /// Creates a new forbidden error.
    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    /// Creates a new bad request error.
    pub fn bad_request() -> Self {
        Self::new(ErrorKind::BadRequest)
    }

    /// Creates a new credential issuance error.
    pub fn credential_issuance() -> Self {
        Self::new(ErrorKind::CredentialIssuance)
    }

    /// Creates a new unknown provider error.
    pub fn unknown_provider() -> Self {
        Self::new(ErrorKind::UnknownProvider)
    }

    /// Creates a new connection error.
    pub fn connection() -> Self {
        Self::new(ErrorKind::Connection)
    }

    /// Creates a new serialization error.
    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    /// Creates a new internal error.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_message() {
        let err = Error::bad_credentials().with_message("no cached bundle");
        assert_eq!(err.to_string(), "BadCredentials: no cached bundle");
    }

    #[test]
    fn test_error_display_without_message() {
        let err = Error::unknown_provider();
        assert_eq!(err.to_string(), "UnknownProvider");
    }

    #[test]
    fn test_kind_str_is_snake_case() {
        assert_eq!(Error::storage_not_found().kind_str(), "storage_not_found");
        assert_eq!(Error::expired_token().kind_str(), "expired_token");
    }

    #[test]
    fn test_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::file_not_found().with_source(io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
