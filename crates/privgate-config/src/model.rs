//! Typed configuration consumed by the pipeline and HTTP surface.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults;

/// Recognised configuration options for one pipeline deployment.
///
/// Every value that used to be a process-wide literal (storage directory,
/// collaborator address, upload ceiling, call deadline) is injected here at
/// construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Directory that receives uploaded datasets and backs static retrieval.
    pub storage_root: PathBuf,
    /// `host:port` of the remote processing collaborator.
    pub collaborator_address: String,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
    /// Upper bound on one remote processing call.
    pub call_deadline: Duration,
    /// Directory holding the page templates.
    pub template_dir: PathBuf,
    /// Listener address for the HTTP surface.
    pub bind_addr: SocketAddr,
    /// Whether the collaborator should run PII detection.
    pub detect_pii: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(defaults::STORAGE_ROOT),
            collaborator_address: defaults::COLLABORATOR_ADDR.to_string(),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            call_deadline: defaults::CALL_DEADLINE,
            template_dir: PathBuf::from(defaults::TEMPLATE_DIR),
            bind_addr: defaults::BIND_ADDR,
            detect_pii: defaults::DETECT_PII,
        }
    }
}

impl PipelineConfig {
    /// Override the storage root, keeping every other value.
    #[must_use]
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Override the template directory, keeping every other value.
    #[must_use]
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    /// Override the collaborator address, keeping every other value.
    #[must_use]
    pub fn with_collaborator_address(mut self, address: impl Into<String>) -> Self {
        self.collaborator_address = address.into();
        self
    }

    /// Override the remote call deadline, keeping every other value.
    #[must_use]
    pub const fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = deadline;
        self
    }

    /// Override the upload ceiling, keeping every other value.
    #[must_use]
    pub const fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}
