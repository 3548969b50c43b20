//! Error types for configuration loading.
//!
//! # Design
//! - Constant error messages; the offending field and value travel as structured context.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field (environment variable) that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        field: &'static str,
        value: impl Into<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            field,
            value: Some(value.into()),
            reason,
        }
    }

    /// Field that failed validation.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InvalidField { field, .. } => field,
        }
    }

    /// Machine-readable reason for the failure.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidField { reason, .. } => reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_exposes_context() {
        let err = ConfigError::invalid("PRIVGATE_BIND_ADDR", "nope", "invalid_socket_addr");
        assert_eq!(err.to_string(), "invalid configuration field");
        assert_eq!(err.field(), "PRIVGATE_BIND_ADDR");
        assert_eq!(err.reason(), "invalid_socket_addr");
        assert!(matches!(
            err,
            ConfigError::InvalidField { value: Some(ref value), .. } if value == "nope"
        ));
    }
}
