// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Domain-wide error taxonomy.
//!
//! Every component returns `Result<_, ObjectVaultError>`. Variants are kept
//! flat (a tag plus a human-readable message) rather than nested so that
//! callers can match on category without threading generic parameters
//! through the whole stack.

use thiserror::Error;

/// The error taxonomy described by the system's error handling design:
/// validation failures are user-caused, `NotFound`/`Integrity` are visible
/// 4xx/5xx conditions, and the rest describe infrastructure failure modes.
#[derive(Error, Debug, Clone)]
pub enum ObjectVaultError {
    #[error("validation error ({field}): {message}")]
    Validation { field: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("resource error: {0}")]
    Resource(String),

    #[error("No healthy nodes available")]
    NoHealthyNodes,

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ObjectVaultError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether a caller one layer up (e.g. the load balancer, picking a
    /// different backend on the next request) could plausibly retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Resource(_) | Self::NoHealthyNodes)
    }

    pub fn is_security_relevant(&self) -> bool {
        matches!(self, Self::Crypto(_) | Self::Integrity(_))
    }

    /// Stable category tag, used by metrics labels and audit entries.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound(_) => "not_found",
            Self::Integrity(_) => "integrity",
            Self::Transport(_) => "transport",
            Self::Storage(_) => "storage",
            Self::Crypto(_) => "crypto",
            Self::Resource(_) => "resource",
            Self::NoHealthyNodes => "no_healthy_nodes",
            Self::Cancelled(_) => "cancelled",
            Self::Internal(_) => "internal",
        }
    }

    /// The HTTP status class the external interfaces map this error to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::NotFound(_) => 404,
            Self::NoHealthyNodes => 503,
            Self::Integrity(_) | Self::Transport(_) | Self::Storage(_) | Self::Crypto(_) | Self::Resource(_)
            | Self::Cancelled(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<std::io::Error> for ObjectVaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_carries_field_and_message() {
        let err = ObjectVaultError::validation("fileName", "must not contain '..'");
        assert_eq!(err.category(), "validation");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn transport_is_recoverable_but_integrity_is_not() {
        assert!(ObjectVaultError::Transport("timeout".into()).is_recoverable());
        assert!(!ObjectVaultError::Integrity("crc mismatch".into()).is_recoverable());
    }
}
