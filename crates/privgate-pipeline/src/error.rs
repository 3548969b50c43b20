//! Error types for the ingestion pipeline.
//!
//! # Design
//! - Messages are constant; context (paths, addresses, remote detail) lives in fields.
//! - `kind()` yields a stable label for metrics, `user_message()` the text shown to the uploader.
//! - Ingestion and processing failures abort a run; rendering failures are fatal to the request.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;
/// Result alias for remote processing operations.
pub type ProcessingOutcome<T> = Result<T, ProcessingError>;
/// Result alias for rendering operations.
pub type RenderingResult<T> = Result<T, RenderingError>;

/// Failures raised while accepting and persisting an upload.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The multipart body carried no usable dataset field.
    #[error("upload field missing")]
    MissingField {
        /// Name of the expected form field.
        field: &'static str,
    },
    /// The declared file name reduces to nothing once path components are stripped.
    #[error("declared file name is not usable")]
    InvalidName {
        /// Name exactly as supplied by the client.
        declared: String,
    },
    /// Creating or writing the destination file failed.
    #[error("failed to persist upload")]
    StorageFailure {
        /// Operation being attempted.
        operation: &'static str,
        /// Destination path involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl IngestionError {
    pub(crate) const fn storage(operation: &'static str, path: PathBuf, source: io::Error) -> Self {
        Self::StorageFailure {
            operation,
            path,
            source,
        }
    }

    /// Stable label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::InvalidName { .. } => "invalid_name",
            Self::StorageFailure { .. } => "storage_failure",
        }
    }

    /// Text suitable for the failure document.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingField { .. } => "please select a valid dataset file".to_string(),
            Self::InvalidName { .. } => "the dataset file name is not valid".to_string(),
            Self::StorageFailure { .. } => "internal error while saving the dataset".to_string(),
        }
    }
}

/// Failures raised while delegating to the remote anonymization service.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The collaborator could not be reached or reported itself unavailable.
    #[error("processing service unavailable")]
    ServiceUnavailable {
        /// Collaborator address that was contacted.
        address: String,
        /// Transport error, when the failure happened before a response arrived.
        #[source]
        source: Option<reqwest::Error>,
    },
    /// The call did not complete before its deadline and was cancelled.
    #[error("processing deadline exceeded")]
    Timeout {
        /// Deadline that elapsed.
        deadline: Duration,
    },
    /// The collaborator answered with an error or an unreadable payload.
    #[error("processing rejected by remote service")]
    RemoteRejected {
        /// Detail reported by (or derived from) the collaborator response.
        detail: String,
    },
}

impl ProcessingError {
    /// Stable label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::RemoteRejected { .. } => "remote_rejected",
        }
    }

    /// Text suitable for the failure document.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ServiceUnavailable { .. } => "the processing service is offline".to_string(),
            Self::Timeout { .. } => "processing did not finish within the allowed time".to_string(),
            Self::RemoteRejected { detail } => format!("anonymization failed: {detail}"),
        }
    }
}

/// Failures raised while producing the response document.
#[derive(Debug, Error)]
pub enum RenderingError {
    /// The template file is missing, unreadable, or malformed.
    #[error("template unavailable")]
    TemplateUnavailable {
        /// Template path that was loaded.
        path: PathBuf,
        /// Short machine-readable reason.
        reason: &'static str,
        /// Underlying IO error, when the file could not be read.
        #[source]
        source: Option<io::Error>,
    },
    /// The JSON view could not be encoded.
    #[error("failed to encode result view")]
    Encode {
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
}

impl RenderingError {
    pub(crate) const fn template(path: PathBuf, reason: &'static str) -> Self {
        Self::TemplateUnavailable {
            path,
            reason,
            source: None,
        }
    }
}

/// Failure that aborted a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upload could not be ingested.
    #[error("ingestion failed")]
    Ingestion(#[from] IngestionError),
    /// The remote processing call failed.
    #[error("processing failed")]
    Processing(#[from] ProcessingError),
}

impl PipelineError {
    /// Stable label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ingestion(err) => err.kind(),
            Self::Processing(err) => err.kind(),
        }
    }

    /// Text suitable for the failure document.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Ingestion(err) => err.user_message(),
            Self::Processing(err) => err.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn every_failure_has_a_non_empty_user_message() {
        let failures: Vec<PipelineError> = vec![
            IngestionError::MissingField { field: "dataset" }.into(),
            IngestionError::InvalidName {
                declared: "..".to_string(),
            }
            .into(),
            IngestionError::storage(
                "create_file",
                PathBuf::from("/nope/raw_a.csv"),
                io::Error::other("denied"),
            )
            .into(),
            ProcessingError::ServiceUnavailable {
                address: "127.0.0.1:1".to_string(),
                source: None,
            }
            .into(),
            ProcessingError::Timeout {
                deadline: Duration::from_secs(1),
            }
            .into(),
            ProcessingError::RemoteRejected {
                detail: "bad csv".to_string(),
            }
            .into(),
        ];
        for failure in failures {
            assert!(!failure.user_message().is_empty(), "{}", failure.kind());
        }
    }

    #[test]
    fn remote_rejection_surfaces_detail() {
        let err = ProcessingError::RemoteRejected {
            detail: "column missing".to_string(),
        };
        assert_eq!(err.user_message(), "anonymization failed: column missing");
        assert_eq!(err.kind(), "remote_rejected");
        assert_eq!(err.to_string(), "processing rejected by remote service");
    }

    #[test]
    fn storage_failure_keeps_io_source() {
        let err = IngestionError::storage(
            "copy_stream",
            PathBuf::from("/tmp/raw_x.csv"),
            io::Error::other("disk full"),
        );
        assert_eq!(err.kind(), "storage_failure");
        assert!(err.source().is_some());
    }

    #[test]
    fn pipeline_error_delegates_labels() {
        let err = PipelineError::from(ProcessingError::Timeout {
            deadline: Duration::from_millis(5),
        });
        assert_eq!(err.kind(), "timeout");
        assert_eq!(
            err.user_message(),
            "processing did not finish within the allowed time"
        );
    }

    #[test]
    fn template_helper_has_no_source() {
        let err = RenderingError::template(PathBuf::from("web/result.html"), "missing_content");
        assert!(matches!(
            err,
            RenderingError::TemplateUnavailable {
                reason: "missing_content",
                source: None,
                ..
            }
        ));
    }
}
