//! Response documents for pipeline outcomes.
//!
//! # Design
//! - Templates are read from disk on every render; edits apply without a restart.
//! - HTML output wraps an escaped fragment in `result.html`; JSON output needs no template.
//! - The synthetic preview goes through the exact success path real results use.

mod synthetic;
mod template;
pub mod view;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RenderingError, RenderingResult};
use crate::model::RenderOutcome;
use crate::params::DEFAULT_EPSILON;
use template::{SlotSpec, Template};
use view::{OutcomeView, ResultView, failure_fragment, success_fragment};

pub use synthetic::synthetic_result;
pub use view::RiskTier;

/// Content type of HTML documents.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
/// Content type of JSON documents.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
/// Template used for result and failure pages.
pub const RESULT_TEMPLATE: &str = "result.html";
/// Template used for the upload form.
pub const INDEX_TEMPLATE: &str = "index.html";

const RESULT_SLOTS: SlotSpec = SlotSpec {
    allowed: &["title", "content", "build"],
    required: &["title", "content"],
};
const INDEX_SLOTS: SlotSpec = SlotSpec {
    allowed: &["title", "build", "default_epsilon", "max_upload"],
    required: &["title"],
};

const SUCCESS_TITLE: &str = "Anonymization result";
const FAILURE_TITLE: &str = "Anonymization failed";
const INDEX_TITLE: &str = "Dataset anonymization";

/// Output representation requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    /// Templated HTML page.
    #[default]
    Html,
    /// JSON document.
    Json,
}

impl RenderFormat {
    /// Pick a format from an `Accept` header value.
    #[must_use]
    pub fn from_accept(accept: Option<&str>) -> Self {
        match accept {
            Some(value) if value.contains("application/json") => Self::Json,
            _ => Self::Html,
        }
    }
}

/// Rendered body plus its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Value for the `Content-Type` header.
    pub content_type: &'static str,
    /// Document body.
    pub body: String,
}

/// Renders outcomes using templates from one directory.
#[derive(Debug, Clone)]
pub struct Renderer {
    template_dir: PathBuf,
    max_upload_bytes: usize,
}

impl Renderer {
    /// Renderer reading templates from `template_dir`.
    #[must_use]
    pub fn new(template_dir: impl Into<PathBuf>, max_upload_bytes: usize) -> Self {
        Self {
            template_dir: template_dir.into(),
            max_upload_bytes,
        }
    }

    /// Directory templates are read from.
    #[must_use]
    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Render a success or failure outcome.
    ///
    /// # Errors
    ///
    /// Returns [`RenderingError::TemplateUnavailable`] when `result.html` is missing or
    /// malformed, or [`RenderingError::Encode`] if the JSON view cannot be encoded.
    pub async fn render(
        &self,
        outcome: &RenderOutcome,
        format: RenderFormat,
    ) -> RenderingResult<RenderedDocument> {
        match format {
            RenderFormat::Json => Self::render_json(outcome),
            RenderFormat::Html => {
                let (title, content) = match outcome {
                    RenderOutcome::Success(result) => {
                        (SUCCESS_TITLE, success_fragment(&ResultView::from(result)))
                    }
                    RenderOutcome::Failure(message) => (FAILURE_TITLE, failure_fragment(message)),
                };
                let template = self.load(RESULT_TEMPLATE, RESULT_SLOTS).await?;
                let body = template.fill(&[
                    ("title", title),
                    ("content", content.as_str()),
                    ("build", privgate_telemetry::build_sha()),
                ]);
                debug!(success = outcome.is_success(), "result page rendered");
                Ok(RenderedDocument {
                    content_type: HTML_CONTENT_TYPE,
                    body,
                })
            }
        }
    }

    /// Render the fixed preview result.
    ///
    /// # Errors
    ///
    /// Same as [`Self::render`].
    pub async fn render_synthetic(&self, format: RenderFormat) -> RenderingResult<RenderedDocument> {
        self.render(&RenderOutcome::Success(synthetic_result()), format)
            .await
    }

    /// Render the upload form.
    ///
    /// # Errors
    ///
    /// Returns [`RenderingError::TemplateUnavailable`] when `index.html` is missing or malformed.
    pub async fn render_index(&self) -> RenderingResult<RenderedDocument> {
        let template = self.load(INDEX_TEMPLATE, INDEX_SLOTS).await?;
        let default_epsilon = format!("{DEFAULT_EPSILON:.1}");
        let max_upload = describe_bytes(self.max_upload_bytes);
        let body = template.fill(&[
            ("title", INDEX_TITLE),
            ("build", privgate_telemetry::build_sha()),
            ("default_epsilon", default_epsilon.as_str()),
            ("max_upload", max_upload.as_str()),
        ]);
        Ok(RenderedDocument {
            content_type: HTML_CONTENT_TYPE,
            body,
        })
    }

    async fn load(&self, name: &str, spec: SlotSpec) -> RenderingResult<Template> {
        Template::load(&self.template_dir.join(name), spec).await
    }

    fn render_json(outcome: &RenderOutcome) -> RenderingResult<RenderedDocument> {
        let view = match outcome {
            RenderOutcome::Success(result) => OutcomeView::Success {
                result: ResultView::from(result),
            },
            RenderOutcome::Failure(message) => OutcomeView::Failure {
                error: message.clone(),
            },
        };
        let body =
            serde_json::to_string(&view).map_err(|source| RenderingError::Encode { source })?;
        Ok(RenderedDocument {
            content_type: JSON_CONTENT_TYPE,
            body,
        })
    }
}

fn describe_bytes(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes.is_multiple_of(MIB) {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}
