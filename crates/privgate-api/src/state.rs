//! Shared state handed to every handler.

use std::path::{Path, PathBuf};

use privgate_config::PipelineConfig;
use privgate_pipeline::{Orchestrator, Renderer};
use privgate_telemetry::Metrics;

/// Dependencies shared by the HTTP handlers.
pub struct ApiState {
    pub(crate) orchestrator: Orchestrator,
    pub(crate) metrics: Metrics,
    storage_root: PathBuf,
    max_upload_bytes: usize,
}

impl ApiState {
    /// Bundle the orchestrator and metrics with the limits taken from `config`.
    #[must_use]
    pub fn new(config: &PipelineConfig, orchestrator: Orchestrator, metrics: Metrics) -> Self {
        Self {
            orchestrator,
            metrics,
            storage_root: config.storage_root.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub(crate) const fn renderer(&self) -> &Renderer {
        self.orchestrator.renderer()
    }

    pub(crate) fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub(crate) const fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}
