//! Error type shared by every flow in the crate.
//!
//! All failures surface as a single flat [`SecurityError`] carrying a stable
//! [`ErrorKind`] and an HTTP-style status code so a boundary layer can render
//! the error without inspecting internals. Every error is terminal for the
//! current request; retry (for example re-entering a code) is a client-driven
//! new request.

use http::StatusCode;
use thiserror::Error;

/// Stable classification of a [`SecurityError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or incorrect client-supplied input.
    Credentials,
    /// Account state prevents the action (disabled, unverified, deleted,
    /// duplicate).
    Account,
    /// Referenced account or session is absent.
    NotFound,
    /// Session token is malformed or unsigned. Intentionally carries the
    /// same status as `NotFound` so callers cannot probe token validity.
    Decode,
    /// Session's one-time latch has been spent or the session was revoked.
    Invalid,
    /// Session's expiration date has passed.
    Expired,
    /// Crosscheck attempt limit reached; the session can never succeed.
    MaximumAttempts,
    /// Presented code did not match the session code.
    Crosscheck,
    /// Request IP matches no previously recorded session location.
    UnknownLocation,
    /// Account lacks the required role.
    InsufficientRole,
    /// Account lacks the required permission.
    InsufficientPermission,
    /// Request originates from a forbidden proxy or VPN.
    ProhibitedProxy,
    /// Opaque transient failure from a storage/delivery collaborator,
    /// re-raised unchanged.
    Storage,
}

/// Error raised by the session engine and the flows built on top of it.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SecurityError {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SecurityError {
    fn new(kind: ErrorKind, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            source: None,
        }
    }

    pub fn credentials(message: impl Into<String>, status: StatusCode) -> Self {
        Self::new(ErrorKind::Credentials, status, message)
    }

    pub fn account(message: impl Into<String>, status: StatusCode) -> Self {
        Self::new(ErrorKind::Account, status, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, StatusCode::NOT_FOUND, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, StatusCode::NOT_FOUND, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, StatusCode::UNAUTHORIZED, message)
    }

    pub fn expired() -> Self {
        Self::new(
            ErrorKind::Expired,
            StatusCode::UNAUTHORIZED,
            "Session has expired.",
        )
    }

    pub fn maximum_attempts() -> Self {
        Self::new(
            ErrorKind::MaximumAttempts,
            StatusCode::UNAUTHORIZED,
            "You've reached the maximum amount of attempts.",
        )
    }

    pub fn crosscheck() -> Self {
        Self::new(
            ErrorKind::Crosscheck,
            StatusCode::UNAUTHORIZED,
            "Session crosschecking attempt was incorrect.",
        )
    }

    pub fn unknown_location() -> Self {
        Self::new(
            ErrorKind::UnknownLocation,
            StatusCode::UNAUTHORIZED,
            "Session is in an unknown location.",
        )
    }

    pub fn insufficient_role() -> Self {
        Self::new(
            ErrorKind::InsufficientRole,
            StatusCode::FORBIDDEN,
            "You do not have the required role for this action.",
        )
    }

    pub fn insufficient_permission() -> Self {
        Self::new(
            ErrorKind::InsufficientPermission,
            StatusCode::FORBIDDEN,
            "You do not have the required permissions for this action.",
        )
    }

    pub fn prohibited_proxy() -> Self {
        Self::new(
            ErrorKind::ProhibitedProxy,
            StatusCode::FORBIDDEN,
            "You are attempting to access a resource from a prohibited proxy.",
        )
    }

    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        let source = source.into();
        Self {
            kind: ErrorKind::Storage,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: source.to_string(),
            source: Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_is_indistinguishable_from_not_found_by_status() {
        let decode = SecurityError::decode("Session is not available.");
        let not_found = SecurityError::not_found("Session could not be found.");
        assert_eq!(decode.status, not_found.status);
        assert_ne!(decode.kind, not_found.kind);
    }

    #[test]
    fn storage_errors_preserve_the_source() {
        let err = SecurityError::storage(anyhow::anyhow!("connection reset"));
        assert_eq!(err.kind, ErrorKind::Storage);
        assert!(err.source.is_some());
    }
}
