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

//! Dataset ingestion and dispatch pipeline.
//!
//! One run per upload: persist the dataset, resolve the privacy budget, call the
//! remote anonymization service under a deadline, and render the outcome.
//!
//! Layout: `params.rs` (epsilon resolution), `ingest.rs` (upload persistence),
//! `remote.rs` (collaborator client), `render/` (result documents and the synthetic
//! preview), `orchestrator.rs` (stage sequencing and failure short-circuiting).

pub mod error;
pub mod ingest;
pub mod model;
pub mod orchestrator;
pub mod params;
pub mod remote;
pub mod render;

pub use error::{IngestionError, PipelineError, ProcessingError, RenderingError};
pub use ingest::IngestionStore;
pub use model::{
    DatasetUpload, ProcessingRequest, ProcessingResult, RenderOutcome, ResolvedParameters,
    StoredDataset, UploadRequest,
};
pub use orchestrator::{Orchestrator, PipelineRun, PipelineStage, RenderedRun};
pub use params::{DEFAULT_EPSILON, resolve_epsilon};
pub use remote::{ProcessingService, RemoteProcessingClient, invoke_with_deadline};
pub use render::{RenderFormat, RenderedDocument, Renderer, synthetic_result};
