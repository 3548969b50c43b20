//! # Design
//!
//! - Centralize bootstrap errors in one enum.
//! - Keep error messages constant while carrying an operation identifier.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: privgate_config::ConfigError,
    },
    /// Telemetry could not be initialised.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: privgate_telemetry::TelemetryError,
    },
    /// Preparing the storage root failed.
    #[error("storage operation failed")]
    Storage {
        /// Operation identifier.
        operation: &'static str,
        /// Source ingestion error.
        source: privgate_pipeline::IngestionError,
    },
    /// Building the collaborator client failed.
    #[error("http client operation failed")]
    HttpClient {
        /// Operation identifier.
        operation: &'static str,
        /// Source HTTP client error.
        source: reqwest::Error,
    },
    /// Binding or serving the HTTP surface failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: privgate_api::ApiServerError,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: privgate_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: privgate_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn storage(
        operation: &'static str,
        source: privgate_pipeline::IngestionError,
    ) -> Self {
        Self::Storage { operation, source }
    }

    pub(crate) const fn http_client(operation: &'static str, source: reqwest::Error) -> Self {
        Self::HttpClient { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: privgate_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }
}
