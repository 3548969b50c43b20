//! Values that flow through one pipeline run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Multipart field carrying the dataset file.
pub const DATASET_FIELD: &str = "dataset";
/// Multipart field carrying the raw epsilon text.
pub const EPSILON_FIELD: &str = "epsilon";

/// Generic text used when a failure arrives without a message.
pub const GENERIC_FAILURE_MESSAGE: &str = "processing failed";

/// Dataset part of a multipart upload.
#[derive(Debug, Clone)]
pub struct DatasetUpload {
    /// File name as declared by the client.
    pub declared_name: String,
    /// Raw bytes of the uploaded file.
    pub payload: Bytes,
}

/// Inbound upload as parsed from the request body. Lives for one run.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Uploaded dataset, absent when the form omitted the file field.
    pub dataset: Option<DatasetUpload>,
    /// Raw epsilon text, absent when the form omitted the field.
    pub epsilon: Option<String>,
}

impl UploadRequest {
    /// Build a request carrying a dataset and an optional epsilon value.
    #[must_use]
    pub fn with_dataset(
        declared_name: impl Into<String>,
        payload: impl Into<Bytes>,
        epsilon: Option<&str>,
    ) -> Self {
        Self {
            dataset: Some(DatasetUpload {
                declared_name: declared_name.into(),
                payload: payload.into(),
            }),
            epsilon: epsilon.map(str::to_string),
        }
    }
}

/// Privacy budget after defaulting. The wrapped value is always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedParameters {
    epsilon: f64,
}

impl ResolvedParameters {
    pub(crate) const fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Resolved epsilon.
    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

/// Dataset persisted on local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDataset {
    path: PathBuf,
    bytes: u64,
}

impl StoredDataset {
    pub(crate) const fn new(path: PathBuf, bytes: u64) -> Self {
        Self { path, bytes }
    }

    /// Absolute path of the stored file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written.
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Request sent to the remote anonymization service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRequest {
    /// Absolute path of the stored dataset.
    pub input_path: String,
    /// Privacy budget, narrowed to single precision for the wire.
    pub epsilon: f32,
    /// Whether the collaborator should detect PII columns.
    pub detect_pii: bool,
}

impl ProcessingRequest {
    /// Assemble the request for a stored dataset.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn for_dataset(
        dataset: &StoredDataset,
        params: ResolvedParameters,
        detect_pii: bool,
    ) -> Self {
        Self {
            input_path: dataset.path().to_string_lossy().into_owned(),
            epsilon: params.epsilon() as f32,
            detect_pii,
        }
    }
}

/// Successful answer from the remote anonymization service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    /// Location of the anonymized artifact, relative to the storage root.
    pub output_path: String,
    /// Privacy score reported by the collaborator.
    pub privacy_score: f64,
    /// Utility score reported by the collaborator.
    pub utility_score: f64,
    /// Epsilon the collaborator actually applied.
    pub epsilon_used: f64,
    /// Singling-out risk.
    #[serde(default)]
    pub singling_out_risk: f64,
    /// Linkability risk.
    #[serde(default)]
    pub linkability_risk: f64,
    /// Inference risk.
    #[serde(default)]
    pub inference_risk: f64,
    /// Free-form status text.
    #[serde(default)]
    pub status: String,
    /// Field name to applied technique.
    #[serde(default)]
    pub pii_report: BTreeMap<String, String>,
}

/// What the renderer receives: exactly one of a result or an error message.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// Processing completed.
    Success(ProcessingResult),
    /// The run aborted with the given message.
    Failure(String),
}

impl RenderOutcome {
    /// Failure outcome; an empty message is replaced with a generic one.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Failure(GENERIC_FAILURE_MESSAGE.to_string())
        } else {
            Self::Failure(message)
        }
    }

    /// Processing result, absent on failure.
    #[must_use]
    pub const fn result(&self) -> Option<&ProcessingResult> {
        match self {
            Self::Success(result) => Some(result),
            Self::Failure(_) => None,
        }
    }

    /// Error text, empty on success.
    #[must_use]
    pub fn error_text(&self) -> &str {
        match self {
            Self::Success(_) => "",
            Self::Failure(message) => message,
        }
    }

    /// True when processing completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> ProcessingResult {
        ProcessingResult {
            output_path: "anonymized_raw_a.csv".to_string(),
            privacy_score: 0.5,
            utility_score: 0.5,
            epsilon_used: 1.0,
            singling_out_risk: 0.0,
            linkability_risk: 0.0,
            inference_risk: 0.0,
            status: "Success".to_string(),
            pii_report: BTreeMap::new(),
        }
    }

    #[test]
    fn outcome_exposes_exactly_one_side() {
        let ok = RenderOutcome::Success(sample_result());
        assert!(ok.result().is_some());
        assert_eq!(ok.error_text(), "");

        let failed = RenderOutcome::failure("service offline");
        assert!(failed.result().is_none());
        assert_eq!(failed.error_text(), "service offline");
    }

    #[test]
    fn blank_failure_gets_generic_message() {
        let failed = RenderOutcome::failure("  ");
        assert_eq!(failed.error_text(), GENERIC_FAILURE_MESSAGE);
        assert!(!failed.is_success());
    }

    #[test]
    fn request_uses_camel_case_and_single_precision() -> Result<(), serde_json::Error> {
        let dataset = StoredDataset::new(PathBuf::from("/srv/data/raw_a.csv"), 12);
        let request =
            ProcessingRequest::for_dataset(&dataset, ResolvedParameters::new(0.5), true);
        let json = serde_json::to_value(&request)?;
        assert_eq!(json["inputPath"], "/srv/data/raw_a.csv");
        assert_eq!(json["epsilon"], 0.5);
        assert_eq!(json["detectPii"], true);
        Ok(())
    }

    #[test]
    fn result_tolerates_missing_optional_fields() -> Result<(), serde_json::Error> {
        let result: ProcessingResult = serde_json::from_str(
            r#"{"outputPath":"out.csv","privacyScore":0.9,"utilityScore":0.8,"epsilonUsed":2.0}"#,
        )?;
        assert_eq!(result.output_path, "out.csv");
        assert!((result.epsilon_used - 2.0).abs() < f64::EPSILON);
        assert!(result.pii_report.is_empty());
        assert!(result.status.is_empty());
        Ok(())
    }
}
