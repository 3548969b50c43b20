//! Environment-driven configuration loader.
//!
//! # Design
//! - Read every option through a lookup function so tests never mutate the process environment.
//! - Absent variables fall back to `defaults`; present-but-invalid values are errors.

use std::path::PathBuf;

use tracing::debug;

use crate::defaults::{self, env};
use crate::error::ConfigResult;
use crate::model::PipelineConfig;
use crate::validate::{
    parse_bool, parse_deadline_secs, parse_positive_usize, parse_socket_addr,
    validate_collaborator_address,
};

/// Source of raw configuration values keyed by environment variable name.
pub trait EnvLookup {
    /// Return the raw value for `name`, if set.
    fn lookup(&self, name: &str) -> Option<String>;
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, name: &str) -> Option<String> {
        self(name)
    }
}

struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl PipelineConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is present but cannot be parsed or
    /// fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(&ProcessEnv)
    }

    /// Load configuration from an arbitrary lookup source.
    ///
    /// # Errors
    ///
    /// Returns an error when a value is present but invalid.
    pub fn from_lookup(source: &impl EnvLookup) -> ConfigResult<Self> {
        let fallback = Self::default();
        let value = |name: &str| {
            source
                .lookup(name)
                .filter(|raw| !raw.trim().is_empty())
        };

        let storage_root = value(env::STORAGE_ROOT)
            .map_or(fallback.storage_root, PathBuf::from);
        let collaborator_address = value(env::COLLABORATOR_ADDR)
            .map(|raw| validate_collaborator_address(env::COLLABORATOR_ADDR, &raw))
            .transpose()?
            .unwrap_or(fallback.collaborator_address);
        let max_upload_bytes = value(env::MAX_UPLOAD_BYTES)
            .map(|raw| parse_positive_usize(env::MAX_UPLOAD_BYTES, &raw))
            .transpose()?
            .unwrap_or(defaults::MAX_UPLOAD_BYTES);
        let call_deadline = value(env::CALL_DEADLINE_SECS)
            .map(|raw| parse_deadline_secs(env::CALL_DEADLINE_SECS, &raw))
            .transpose()?
            .unwrap_or(defaults::CALL_DEADLINE);
        let template_dir = value(env::TEMPLATE_DIR)
            .map_or(fallback.template_dir, PathBuf::from);
        let bind_addr = value(env::BIND_ADDR)
            .map(|raw| parse_socket_addr(env::BIND_ADDR, &raw))
            .transpose()?
            .unwrap_or(fallback.bind_addr);
        let detect_pii = value(env::DETECT_PII)
            .map(|raw| parse_bool(env::DETECT_PII, &raw))
            .transpose()?
            .unwrap_or(defaults::DETECT_PII);

        let config = Self {
            storage_root,
            collaborator_address,
            max_upload_bytes,
            call_deadline,
            template_dir,
            bind_addr,
            detect_pii,
        };
        debug!(?config, "pipeline configuration loaded");
        Ok(config)
    }
}
