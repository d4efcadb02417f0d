// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Error types for Gauntlet with backend error-code accessors.
//!
//! Every failure a test body can produce flows through [`Error`]. The
//! outcome classifier only ever inspects two things: whether the error is
//! transport-level ([`Error::is_transport`]) and the backend error code
//! ([`Error::code`]) for API errors.

use thiserror::Error;

/// A specialized `Result` type for Gauntlet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exercising a storage backend.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend returned a structured API error with a stable code.
    #[error("{operation}: {code}: {message}")]
    Api {
        /// The storage operation that failed (e.g. `PutObject`).
        operation: &'static str,
        /// The backend's stable error code (e.g. `NoSuchBucket`).
        code: String,
        /// A human-readable error message.
        message: String,
    },

    /// The request never produced a backend response (connection refused,
    /// DNS failure, client-side timeout, malformed response).
    #[error("{operation}: transport failure: {reason}")]
    Transport {
        /// The storage operation that failed.
        operation: &'static str,
        /// Why the request could not complete.
        reason: String,
    },

    /// A test body observed a response that violates the expected contract.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// Fixture provisioning or teardown failed.
    #[error("fixture error: {0}")]
    Fixture(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a new API error.
    #[must_use]
    pub fn api(
        operation: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Api { operation, code: code.into(), message: message.into() }
    }

    /// Creates a new transport error.
    #[must_use]
    pub fn transport(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Transport { operation, reason: reason.into() }
    }

    /// Creates a new assertion error.
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Returns the backend error code, if this is an API error.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns whether this error is transport-level rather than a
    /// backend-returned application error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Fails the enclosing test body when a condition does not hold.
///
/// Expands to an early `return` with [`Error::Assertion`], so it can only
/// be used in functions returning [`Result`].
#[macro_export]
macro_rules! check {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::assertion(format!($($arg)+)));
        }
    };
}

/// Fails the enclosing test body when two values are not equal.
///
/// Both values are captured in the assertion detail so a failing run can
/// be diagnosed without re-running.
#[macro_export]
macro_rules! check_eq {
    ($left:expr, $right:expr, $($arg:tt)+) => {{
        let left = &$left;
        let right = &$right;
        if left != right {
            return Err($crate::error::Error::assertion(format!(
                "{}: expected {:?}, got {:?}",
                format!($($arg)+),
                right,
                left,
            )));
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passes() -> Result<()> {
        check!(1 + 1 == 2, "arithmetic holds");
        check_eq!(2, 2, "values match");
        Ok(())
    }

    fn fails_check() -> Result<()> {
        check!(false, "expected {} to hold", "condition");
        Ok(())
    }

    fn fails_check_eq() -> Result<()> {
        check_eq!("actual", "expected", "content mismatch");
        Ok(())
    }

    #[test]
    fn check_macros() {
        assert!(passes().is_ok());

        let err = fails_check().unwrap_err();
        assert!(matches!(err, Error::Assertion(_)));
        assert!(err.to_string().contains("expected condition to hold"));

        let err = fails_check_eq().unwrap_err();
        assert!(err.to_string().contains("content mismatch"));
        assert!(err.to_string().contains("expected"));
    }

    #[test]
    fn api_error_exposes_code() {
        let err = Error::api("PutObject", "NoSuchBucket", "bucket missing");
        assert_eq!(err.code(), Some("NoSuchBucket"));
        assert!(!err.is_transport());
    }

    #[test]
    fn transport_error_has_no_code() {
        let err = Error::transport("GetObject", "connection refused");
        assert_eq!(err.code(), None);
        assert!(err.is_transport());
    }
}
