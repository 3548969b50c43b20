//! Sequencing of one upload through ingestion, dispatch and rendering.
//!
//! # Design
//! - Stages advance strictly forward: `Start -> Ingesting -> ResolvingParameters ->
//!   Invoking -> Rendering -> Done`, with `Aborted` reachable from `Ingesting` and
//!   `Invoking`. No stage is entered twice.
//! - Ingestion and processing failures never escape as errors; they become a
//!   failure outcome. Only rendering failures propagate.
//! - A timed-out run keeps its stored dataset on disk.

use std::sync::Arc;
use std::time::{Duration, Instant};

use privgate_config::PipelineConfig;
use privgate_telemetry::{Metrics, current_request_id, current_route};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{IngestionError, PipelineError, RenderingResult};
use crate::ingest::IngestionStore;
use crate::model::{
    DATASET_FIELD, DatasetUpload, ProcessingRequest, RenderOutcome, StoredDataset, UploadRequest,
};
use crate::params::resolve_epsilon;
use crate::remote::{ProcessingService, RemoteProcessingClient, invoke_with_deadline};
use crate::render::{RenderFormat, RenderedDocument, Renderer};

/// Position of a run in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Request accepted.
    Start,
    /// Persisting the upload.
    Ingesting,
    /// Resolving epsilon.
    ResolvingParameters,
    /// Waiting on the remote service.
    Invoking,
    /// Producing the response document.
    Rendering,
    /// Success document produced.
    Done,
    /// Run short-circuited with a failure outcome.
    Aborted,
}

impl PipelineStage {
    /// Label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Ingesting => "ingesting",
            Self::ResolvingParameters => "resolving_parameters",
            Self::Invoking => "invoking",
            Self::Rendering => "rendering",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Start => 0,
            Self::Ingesting => 1,
            Self::ResolvingParameters => 2,
            Self::Invoking => 3,
            Self::Rendering => 4,
            Self::Done | Self::Aborted => 5,
        }
    }
}

/// Result of running the pipeline up to (but excluding) document rendering.
#[derive(Debug)]
pub struct PipelineRun {
    stages: Vec<PipelineStage>,
    outcome: RenderOutcome,
    failure: Option<PipelineError>,
    stored: Option<StoredDataset>,
}

impl PipelineRun {
    /// Stages visited, in order.
    #[must_use]
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    /// Most recent stage.
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        self.stages
            .last()
            .copied()
            .unwrap_or(PipelineStage::Start)
    }

    /// Outcome handed to the renderer.
    #[must_use]
    pub const fn outcome(&self) -> &RenderOutcome {
        &self.outcome
    }

    /// Failure that aborted the run, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&PipelineError> {
        self.failure.as_ref()
    }

    /// Dataset persisted by this run, if ingestion succeeded.
    #[must_use]
    pub const fn stored_dataset(&self) -> Option<&StoredDataset> {
        self.stored.as_ref()
    }

    fn enter(&mut self, stage: PipelineStage) {
        debug_assert!(
            stage.rank() > self.stage().rank(),
            "pipeline stage {} cannot follow {}",
            stage.as_str(),
            self.stage().as_str()
        );
        debug!(stage = stage.as_str(), "pipeline stage entered");
        self.stages.push(stage);
    }
}

/// Completed run together with its response document.
#[derive(Debug)]
pub struct RenderedRun {
    /// Run record; ends in `Done` or `Aborted`.
    pub run: PipelineRun,
    /// Document to send back to the caller.
    pub document: RenderedDocument,
}

/// Drives uploads through the pipeline. One instance serves any number of concurrent runs.
#[derive(Clone)]
pub struct Orchestrator {
    store: IngestionStore,
    service: Arc<dyn ProcessingService>,
    renderer: Renderer,
    deadline: Duration,
    detect_pii: bool,
    metrics: Metrics,
}

impl Orchestrator {
    /// Orchestrator using `service` for remote processing.
    #[must_use]
    pub fn new(
        config: &PipelineConfig,
        service: Arc<dyn ProcessingService>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store: IngestionStore::new(config.storage_root.clone()),
            service,
            renderer: Renderer::new(config.template_dir.clone(), config.max_upload_bytes),
            deadline: config.call_deadline,
            detect_pii: config.detect_pii,
            metrics,
        }
    }

    /// Orchestrator talking to the collaborator named in `config`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the HTTP client cannot be built.
    pub fn from_config(config: &PipelineConfig, metrics: Metrics) -> Result<Self, reqwest::Error> {
        let client = RemoteProcessingClient::new(config.collaborator_address.clone())?;
        Ok(Self::new(config, Arc::new(client), metrics))
    }

    /// Store uploads are written to.
    #[must_use]
    pub const fn store(&self) -> &IngestionStore {
        &self.store
    }

    /// Renderer used for response documents.
    #[must_use]
    pub const fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Run ingestion and remote processing for `request`.
    ///
    /// Successful runs stop at [`PipelineStage::Rendering`]; failed runs end in
    /// [`PipelineStage::Aborted`] with a failure outcome.
    #[instrument(
        name = "pipeline.run",
        skip_all,
        fields(
            request_id = %current_request_id().unwrap_or_default(),
            route = %current_route().unwrap_or_default()
        )
    )]
    pub async fn run(&self, request: UploadRequest) -> PipelineRun {
        let mut run = PipelineRun {
            stages: vec![PipelineStage::Start],
            outcome: RenderOutcome::failure(""),
            failure: None,
            stored: None,
        };

        run.enter(PipelineStage::Ingesting);
        let stored = match self.ingest(request.dataset).await {
            Ok(stored) => stored,
            Err(err) => return self.abort(run, err.into()),
        };
        run.stored = Some(stored.clone());

        run.enter(PipelineStage::ResolvingParameters);
        let params = resolve_epsilon(request.epsilon.as_deref());

        run.enter(PipelineStage::Invoking);
        let processing = ProcessingRequest::for_dataset(&stored, params, self.detect_pii);
        let started = Instant::now();
        let outcome =
            invoke_with_deadline(self.service.as_ref(), &processing, self.deadline).await;
        self.metrics.observe_remote_call(started.elapsed());

        match outcome {
            Ok(result) => {
                info!(
                    input = %stored.path().display(),
                    epsilon = params.epsilon(),
                    output = %result.output_path,
                    "dataset processed"
                );
                run.enter(PipelineStage::Rendering);
                run.outcome = RenderOutcome::Success(result);
                run
            }
            Err(err) => self.abort(run, err.into()),
        }
    }

    /// Run the pipeline and render its outcome in `format`.
    ///
    /// # Errors
    ///
    /// Returns the rendering error when no document could be produced.
    pub async fn run_and_render(
        &self,
        request: UploadRequest,
        format: RenderFormat,
    ) -> RenderingResult<RenderedRun> {
        let mut run = self.run(request).await;
        let document = match self.renderer.render(&run.outcome, format).await {
            Ok(document) => document,
            Err(err) => {
                error!(error = %err, "failed to render pipeline outcome");
                self.metrics.inc_pipeline_failure("rendering");
                return Err(err);
            }
        };
        if run.stage() == PipelineStage::Rendering {
            run.enter(PipelineStage::Done);
            self.metrics.inc_pipeline_run("done");
        }
        Ok(RenderedRun { run, document })
    }

    async fn ingest(&self, dataset: Option<DatasetUpload>) -> Result<StoredDataset, IngestionError> {
        let dataset = dataset.ok_or(IngestionError::MissingField {
            field: DATASET_FIELD,
        })?;
        let stored = self
            .store
            .store(&dataset.declared_name, dataset.payload.as_ref())
            .await?;
        self.metrics.add_uploaded_bytes(stored.bytes());
        Ok(stored)
    }

    fn abort(&self, mut run: PipelineRun, failure: PipelineError) -> PipelineRun {
        warn!(
            stage = run.stage().as_str(),
            kind = failure.kind(),
            error = %failure,
            "pipeline run aborted"
        );
        self.metrics.inc_pipeline_failure(failure.kind());
        self.metrics.inc_pipeline_run("aborted");
        run.enter(PipelineStage::Aborted);
        run.outcome = RenderOutcome::failure(failure.user_message());
        run.failure = Some(failure);
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use privgate_test_support::collaborator::{CollaboratorMode, FakeCollaborator, refused_address};
    use privgate_test_support::fixtures::{StorageFixture, TemplateFixture};

    struct Harness {
        storage: StorageFixture,
        _templates: TemplateFixture,
        config: PipelineConfig,
        metrics: Metrics,
    }

    impl Harness {
        fn new(collaborator: String) -> anyhow::Result<Self> {
            let storage = StorageFixture::new()?;
            let templates = TemplateFixture::standard()?;
            let config = PipelineConfig::default()
                .with_storage_root(storage.path())
                .with_template_dir(templates.path())
                .with_collaborator_address(collaborator);
            Ok(Self {
                storage,
                _templates: templates,
                config,
                metrics: Metrics::new()?,
            })
        }

        fn orchestrator(&self) -> anyhow::Result<Orchestrator> {
            Ok(Orchestrator::from_config(&self.config, self.metrics.clone())?)
        }
    }

    fn upload(epsilon: Option<&str>) -> UploadRequest {
        UploadRequest::with_dataset("people.csv", &b"name,email\nana,a@x.io\n"[..], epsilon)
    }

    #[tokio::test]
    async fn well_behaved_collaborator_completes_run() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Echo).await?;
        let harness = Harness::new(fake.address())?;
        let orchestrator = harness.orchestrator()?;

        let rendered = orchestrator
            .run_and_render(upload(Some("0.5")), RenderFormat::Html)
            .await?;

        assert_eq!(
            rendered.run.stages(),
            [
                PipelineStage::Start,
                PipelineStage::Ingesting,
                PipelineStage::ResolvingParameters,
                PipelineStage::Invoking,
                PipelineStage::Rendering,
                PipelineStage::Done,
            ]
        );
        let result = rendered
            .run
            .outcome()
            .result()
            .ok_or_else(|| anyhow::anyhow!("expected a success outcome"))?;
        assert!((result.epsilon_used - 0.5).abs() < 1e-6);
        assert!(rendered.document.body.contains("Epsilon used</dt><dd>0.5</dd>"));

        let stored = harness.storage.path().join("raw_people.csv");
        assert!(stored.is_file());
        assert_eq!(
            fake.received()[0]["inputPath"],
            stored.to_string_lossy().into_owned()
        );
        assert_eq!(harness.metrics.snapshot().runs_completed, 1);
        Ok(())
    }

    #[tokio::test]
    async fn collaborator_values_pass_through_unchanged() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::FixedEpsilon(0.8)).await?;
        let harness = Harness::new(fake.address())?;
        let orchestrator = harness.orchestrator()?;

        let rendered = orchestrator
            .run_and_render(upload(Some("2.5")), RenderFormat::Json)
            .await?;
        assert_eq!(fake.received()[0]["epsilon"], 2.5);

        let RenderOutcome::Success(result) = rendered.run.outcome() else {
            anyhow::bail!("expected a success outcome");
        };
        assert!((result.epsilon_used - 0.8).abs() < f64::EPSILON);
        assert!((result.privacy_score - 0.88).abs() < f64::EPSILON);
        assert!((result.utility_score - 0.75).abs() < f64::EPSILON);
        assert!((result.singling_out_risk - 0.05).abs() < f64::EPSILON);
        assert!((result.linkability_risk - 0.2).abs() < f64::EPSILON);
        assert!((result.inference_risk - 0.4).abs() < f64::EPSILON);
        assert_eq!(result.output_path, "anonymized_raw_people.csv");
        assert_eq!(result.status, "Success");
        assert_eq!(
            result.pii_report.get("email").map(String::as_str),
            Some("MASKED")
        );
        assert_eq!(result.pii_report.len(), 1);

        let json: serde_json::Value = serde_json::from_str(&rendered.document.body)?;
        let view = &json["result"];
        assert_eq!(view["epsilonUsed"], 0.8);
        assert_eq!(view["privacyScore"], 0.88);
        assert_eq!(view["utilityScore"], 0.75);
        assert_eq!(view["risks"][0]["value"], 0.05);
        assert_eq!(view["risks"][1]["value"], 0.2);
        assert_eq!(view["risks"][2]["value"], 0.4);
        assert_eq!(view["pii"][0]["field"], "email");
        assert_eq!(view["pii"][0]["technique"], "MASKED");
        Ok(())
    }

    #[tokio::test]
    async fn missing_dataset_aborts_during_ingestion() -> anyhow::Result<()> {
        let harness = Harness::new(refused_address().await?)?;
        let orchestrator = harness.orchestrator()?;
        let run = orchestrator.run(UploadRequest::default()).await;

        assert_eq!(
            run.stages(),
            [PipelineStage::Start, PipelineStage::Ingesting, PipelineStage::Aborted]
        );
        assert_eq!(run.outcome().error_text(), "please select a valid dataset file");
        assert!(matches!(
            run.failure(),
            Some(PipelineError::Ingestion(IngestionError::MissingField { .. }))
        ));
        assert!(run.stored_dataset().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_collaborator_aborts_with_message() -> anyhow::Result<()> {
        let harness = Harness::new(refused_address().await?)?;
        let orchestrator = harness.orchestrator()?;
        let rendered = orchestrator
            .run_and_render(upload(None), RenderFormat::Html)
            .await?;

        assert_eq!(rendered.run.stage(), PipelineStage::Aborted);
        assert!(rendered.run.outcome().result().is_none());
        assert!(!rendered.run.outcome().error_text().is_empty());
        assert!(matches!(
            rendered.run.failure(),
            Some(PipelineError::Processing(ProcessingError::ServiceUnavailable { .. }))
        ));
        assert!(rendered.document.body.contains("the processing service is offline"));
        assert_eq!(harness.metrics.snapshot().runs_aborted, 1);
        Ok(())
    }

    #[tokio::test]
    async fn slow_collaborator_times_out_and_keeps_upload() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Slow(Duration::from_secs(30))).await?;
        let mut harness = Harness::new(fake.address())?;
        harness.config = harness
            .config
            .clone()
            .with_call_deadline(Duration::from_millis(150));
        let orchestrator = harness.orchestrator()?;

        let run = orchestrator.run(upload(Some("2"))).await;

        assert_eq!(run.stage(), PipelineStage::Aborted);
        assert!(!run.stages().contains(&PipelineStage::Rendering));
        assert!(matches!(
            run.failure(),
            Some(PipelineError::Processing(ProcessingError::Timeout { .. }))
        ));
        let stored = run
            .stored_dataset()
            .ok_or_else(|| anyhow::anyhow!("dataset should have been stored"))?;
        assert!(stored.path().is_file());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_dataset_surfaces_remote_detail() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Reject("no header row")).await?;
        let harness = Harness::new(fake.address())?;
        let orchestrator = harness.orchestrator()?;
        let run = orchestrator.run(upload(None)).await;

        assert_eq!(run.outcome().error_text(), "anonymization failed: no header row");
        Ok(())
    }

    #[tokio::test]
    async fn default_epsilon_is_sent_when_field_is_invalid() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Echo).await?;
        let harness = Harness::new(fake.address())?;
        let orchestrator = harness.orchestrator()?;
        let run = orchestrator.run(upload(Some("-3"))).await;

        assert_eq!(run.stage(), PipelineStage::Rendering);
        assert_eq!(fake.received()[0]["epsilon"], 1.0);
        Ok(())
    }

    #[tokio::test]
    async fn missing_template_fails_rendering() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Echo).await?;
        let mut harness = Harness::new(fake.address())?;
        harness.config = harness.config.clone().with_template_dir("/no/templates");
        let orchestrator = harness.orchestrator()?;

        let outcome = orchestrator
            .run_and_render(upload(None), RenderFormat::Html)
            .await;
        assert!(outcome.is_err());
        Ok(())
    }
}
