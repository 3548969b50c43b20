#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! HTTP surface for the privgate pipeline.
//! Layout: `http/router.rs` (server and layers), `http/upload.rs` (multipart intake),
//! `http/pages.rs` (form and preview), `http/health.rs` (liveness and metrics),
//! `http/telemetry.rs` (per-route metrics middleware), `state.rs`, `error.rs`.

pub mod error;
pub mod http;
pub mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
pub use state::ApiState;
