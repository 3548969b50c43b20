//! Error types for telemetry operations.
//!
//! # Design
//! - Constant messages; the collector name is carried as a field.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed (usually because one is already set).
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// Building or registering a Prometheus collector failed.
    #[error("failed to register metrics collector")]
    MetricsRegister {
        /// Metric identifier tied to the failure.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Encoding Prometheus metrics failed.
    #[error("failed to encode metrics")]
    MetricsEncode {
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Rendered metrics output was not valid UTF-8.
    #[error("metrics output was not valid utf-8")]
    MetricsUtf8 {
        /// Underlying UTF-8 conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl TelemetryError {
    pub(crate) const fn register(name: &'static str, source: PrometheusError) -> Self {
        Self::MetricsRegister { name, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn metrics_errors_keep_sources() -> std::result::Result<(), Box<dyn Error>> {
        let register = TelemetryError::register(
            "pipeline_runs_total",
            PrometheusError::AlreadyReg,
        );
        assert_eq!(register.to_string(), "failed to register metrics collector");
        assert!(register.source().is_some());
        assert!(matches!(
            register,
            TelemetryError::MetricsRegister {
                name: "pipeline_runs_total",
                ..
            }
        ));

        let encode = TelemetryError::MetricsEncode {
            source: PrometheusError::Msg("encode".to_string()),
        };
        assert_eq!(encode.to_string(), "failed to encode metrics");

        let utf8 = TelemetryError::MetricsUtf8 {
            source: String::from_utf8(vec![0, 159])
                .err()
                .ok_or_else(|| io::Error::other("expected utf8 error"))?,
        };
        assert_eq!(utf8.to_string(), "metrics output was not valid utf-8");
        assert!(utf8.source().is_some());
        Ok(())
    }
}
