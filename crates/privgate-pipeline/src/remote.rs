//! Client for the remote anonymization service.
//!
//! # Design
//! - [`ProcessingService`] is the seam; the orchestrator never sees HTTP.
//! - [`RemoteProcessingClient`] posts one JSON request per call and never retries.
//! - Deadlines live in [`invoke_with_deadline`]: on expiry the in-flight future is
//!   dropped, which aborts the underlying connection.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProcessingError, ProcessingOutcome};
use crate::model::{ProcessingRequest, ProcessingResult};

/// Path of the processing endpoint on the collaborator.
pub const PROCESS_PATH: &str = "/v1/process";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can anonymize a stored dataset.
#[async_trait]
pub trait ProcessingService: Send + Sync {
    /// Run anonymization for `request`.
    async fn process(&self, request: &ProcessingRequest) -> ProcessingOutcome<ProcessingResult>;
}

/// Run `service` for `request`, giving up after `deadline`.
///
/// # Errors
///
/// Returns [`ProcessingError::Timeout`] when the deadline elapses first, otherwise
/// whatever the service reports.
pub async fn invoke_with_deadline(
    service: &dyn ProcessingService,
    request: &ProcessingRequest,
    deadline: Duration,
) -> ProcessingOutcome<ProcessingResult> {
    tokio::time::timeout(deadline, service.process(request))
        .await
        .unwrap_or_else(|_| {
            let deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
            warn!(deadline_ms, "processing call cancelled at deadline");
            Err(ProcessingError::Timeout { deadline })
        })
}

/// HTTP/JSON client for the collaborator.
#[derive(Debug, Clone)]
pub struct RemoteProcessingClient {
    client: Client,
    address: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    #[serde(alias = "message")]
    error: String,
}

impl RemoteProcessingClient {
    /// Client for the collaborator listening at `address` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the HTTP client cannot be constructed.
    pub fn new(address: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .no_proxy()
            .build()?;
        Ok(Self::with_client(client, address))
    }

    /// Client reusing an existing reqwest client.
    #[must_use]
    pub fn with_client(client: Client, address: impl Into<String>) -> Self {
        let address = address.into();
        let endpoint = format!("http://{address}{PROCESS_PATH}");
        Self {
            client,
            address,
            endpoint,
        }
    }

    /// Endpoint URL requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn unavailable(&self, source: Option<reqwest::Error>) -> ProcessingError {
        ProcessingError::ServiceUnavailable {
            address: self.address.clone(),
            source,
        }
    }
}

#[async_trait]
impl ProcessingService for RemoteProcessingClient {
    async fn process(&self, request: &ProcessingRequest) -> ProcessingOutcome<ProcessingResult> {
        debug!(endpoint = %self.endpoint(), input = %request.input_path, "dispatching dataset");
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| self.unavailable(Some(err)))?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(self.unavailable(None));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProcessingError::RemoteRejected {
                detail: rejection_detail(status, &body),
            });
        }

        response
            .json::<ProcessingResult>()
            .await
            .map_err(|err| ProcessingError::RemoteRejected {
                detail: format!("unreadable response from processing service ({err})"),
            })
    }
}

fn rejection_detail(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<RemoteErrorBody>(body)
        .ok()
        .map(|parsed| parsed.error.trim().to_string())
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| format!("processing service answered {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use privgate_test_support::collaborator::{CollaboratorMode, FakeCollaborator, refused_address};

    fn request(epsilon: f32) -> ProcessingRequest {
        ProcessingRequest {
            input_path: "/srv/data/raw_people.csv".to_string(),
            epsilon,
            detect_pii: true,
        }
    }

    struct Stalled;

    #[async_trait]
    impl ProcessingService for Stalled {
        async fn process(&self, _request: &ProcessingRequest) -> ProcessingOutcome<ProcessingResult> {
            std::future::pending().await
        }
    }

    #[test]
    fn endpoint_targets_process_path() {
        let client = RemoteProcessingClient::with_client(Client::new(), "127.0.0.1:50051");
        assert_eq!(client.endpoint(), "http://127.0.0.1:50051/v1/process");
    }

    #[test]
    fn rejection_detail_prefers_error_body() {
        assert_eq!(
            rejection_detail(StatusCode::BAD_REQUEST, r#"{"error":"bad csv"}"#),
            "bad csv"
        );
        assert_eq!(
            rejection_detail(StatusCode::BAD_REQUEST, r#"{"message":"no rows"}"#),
            "no rows"
        );
        assert_eq!(
            rejection_detail(StatusCode::INTERNAL_SERVER_ERROR, "<html>"),
            "processing service answered 500 Internal Server Error"
        );
    }

    #[tokio::test]
    async fn well_behaved_collaborator_returns_result() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Echo).await?;
        let client = RemoteProcessingClient::new(fake.address())?;
        let result = client.process(&request(0.5)).await?;

        assert!((result.epsilon_used - 0.5).abs() < 1e-6);
        assert_eq!(result.output_path, "anonymized_raw_people.csv");
        assert!(!result.pii_report.is_empty());

        let received = fake.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["inputPath"], "/srv/data/raw_people.csv");
        assert_eq!(received[0]["detectPii"], true);
        Ok(())
    }

    #[tokio::test]
    async fn rejecting_collaborator_maps_to_remote_rejected() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Reject("unsupported format")).await?;
        let client = RemoteProcessingClient::new(fake.address())?;
        let err = client
            .process(&request(1.0))
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected a rejection"))?;
        match err {
            ProcessingError::RemoteRejected { detail } => assert_eq!(detail, "unsupported format"),
            other => anyhow::bail!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn overloaded_collaborator_is_unavailable() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Unavailable).await?;
        let client = RemoteProcessingClient::new(fake.address())?;
        let err = client.process(&request(1.0)).await.err();
        assert!(matches!(err, Some(ProcessingError::ServiceUnavailable { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Malformed).await?;
        let client = RemoteProcessingClient::new(fake.address())?;
        let err = client.process(&request(1.0)).await.err();
        assert!(matches!(err, Some(ProcessingError::RemoteRejected { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() -> anyhow::Result<()> {
        let client = RemoteProcessingClient::new(refused_address().await?)?;
        let err = client.process(&request(1.0)).await.err();
        assert!(matches!(
            err,
            Some(ProcessingError::ServiceUnavailable { source: Some(_), .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn deadline_cancels_stalled_call() {
        let outcome =
            invoke_with_deadline(&Stalled, &request(1.0), Duration::from_millis(20)).await;
        assert!(matches!(outcome, Err(ProcessingError::Timeout { .. })));
    }

    #[tokio::test]
    async fn deadline_cancels_slow_collaborator() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Slow(Duration::from_secs(30))).await?;
        let client = RemoteProcessingClient::new(fake.address())?;
        let outcome = invoke_with_deadline(&client, &request(1.0), Duration::from_millis(100)).await;
        assert!(matches!(outcome, Err(ProcessingError::Timeout { .. })));
        Ok(())
    }
}
