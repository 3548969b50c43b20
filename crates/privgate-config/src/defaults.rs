//! Default values applied when an environment variable is absent.
//!
//! # Design
//! - Keep every fallback in one place so the loader and docs stay consistent.
//! - Byte ceilings and deadlines are explicit values, never derived at runtime.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Directory that receives uploaded datasets.
pub const STORAGE_ROOT: &str = "./data";
/// Address of the remote processing collaborator.
pub const COLLABORATOR_ADDR: &str = "127.0.0.1:50051";
/// Upload ceiling in bytes (32 MiB).
pub const MAX_UPLOAD_BYTES: usize = 32 << 20;
/// Upper bound on a single remote processing call.
pub const CALL_DEADLINE: Duration = Duration::from_secs(30 * 60);
/// Directory holding `index.html` and `result.html`.
pub const TEMPLATE_DIR: &str = "./web";
/// Listener address for the HTTP surface.
pub const BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);
/// Whether the collaborator is asked to detect PII columns.
pub const DETECT_PII: bool = true;

/// Environment variable names recognised by the loader.
pub mod env {
    /// Storage root override.
    pub const STORAGE_ROOT: &str = "PRIVGATE_STORAGE_ROOT";
    /// Collaborator address override.
    pub const COLLABORATOR_ADDR: &str = "PRIVGATE_COLLABORATOR_ADDR";
    /// Upload ceiling override, in bytes.
    pub const MAX_UPLOAD_BYTES: &str = "PRIVGATE_MAX_UPLOAD_BYTES";
    /// Remote call deadline override, in seconds.
    pub const CALL_DEADLINE_SECS: &str = "PRIVGATE_CALL_DEADLINE_SECS";
    /// Template directory override.
    pub const TEMPLATE_DIR: &str = "PRIVGATE_TEMPLATE_DIR";
    /// Listener address override.
    pub const BIND_ADDR: &str = "PRIVGATE_BIND_ADDR";
    /// PII detection toggle.
    pub const DETECT_PII: &str = "PRIVGATE_DETECT_PII";
    /// Log output format (`json` or `pretty`).
    pub const LOG_FORMAT: &str = "PRIVGATE_LOG_FORMAT";
}
