//! Environment loading and server startup.

use std::net::SocketAddr;

use privgate_api::{ApiServer, ApiState};
use privgate_config::defaults::env;
#[cfg(test)]
use privgate_config::EnvLookup;
use privgate_config::PipelineConfig;
use privgate_pipeline::Orchestrator;
use privgate_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Everything the service needs before it can start listening.
pub(crate) struct BootstrapDependencies {
    pub(crate) config: PipelineConfig,
    pub(crate) log_format: LogFormat,
    pub(crate) metrics: Metrics,
}

impl BootstrapDependencies {
    pub(crate) fn from_env() -> AppResult<Self> {
        let config =
            PipelineConfig::from_env().map_err(|err| AppError::config("config.load", err))?;
        let log_format = LogFormat::from_value(std::env::var(env::LOG_FORMAT).ok().as_deref());
        Self::assemble(config, log_format)
    }

    #[cfg(test)]
    pub(crate) fn from_lookup(source: &impl EnvLookup) -> AppResult<Self> {
        let config = PipelineConfig::from_lookup(source)
            .map_err(|err| AppError::config("config.load", err))?;
        let log_format = LogFormat::from_value(source.lookup(env::LOG_FORMAT).as_deref());
        Self::assemble(config, log_format)
    }

    fn assemble(config: PipelineConfig, log_format: LogFormat) -> AppResult<Self> {
        let metrics = Metrics::new().map_err(|err| AppError::telemetry("metrics.new", err))?;
        Ok(Self {
            config,
            log_format,
            metrics,
        })
    }
}

/// Load configuration, install logging, and serve until the server stops.
///
/// # Errors
///
/// Returns an error if configuration is invalid, logging cannot be installed, the
/// storage root cannot be created, or the listener fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    init_logging(&LoggingConfig {
        format: dependencies.log_format,
        ..LoggingConfig::default()
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("privgate");

    run_app_with(dependencies).await
}

/// Boot sequence driven entirely by injected dependencies.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let (server, addr) = build_server(dependencies).await?;
    server
        .serve(addr)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))
}

pub(crate) async fn build_server(
    dependencies: BootstrapDependencies,
) -> AppResult<(ApiServer, SocketAddr)> {
    let BootstrapDependencies {
        config,
        log_format: _,
        metrics,
    } = dependencies;
    info!(
        storage_root = %config.storage_root.display(),
        collaborator = %config.collaborator_address,
        deadline_secs = config.call_deadline.as_secs(),
        max_upload_bytes = config.max_upload_bytes,
        "privgate bootstrap starting"
    );

    let orchestrator = Orchestrator::from_config(&config, metrics.clone())
        .map_err(|err| AppError::http_client("orchestrator.from_config", err))?;
    orchestrator
        .store()
        .ensure_root()
        .await
        .map_err(|err| AppError::storage("storage.ensure_root", err))?;
    info!(
        storage_root = %orchestrator.store().root().display(),
        templates = %orchestrator.renderer().template_dir().display(),
        "pipeline ready"
    );

    let addr = config.bind_addr;
    let server = ApiServer::new(ApiState::new(&config, orchestrator, metrics));
    Ok((server, addr))
}
