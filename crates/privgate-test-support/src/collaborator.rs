//! In-process stand-in for the remote anonymization service.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// How the fake collaborator answers processing requests.
#[derive(Debug, Clone, Copy)]
pub enum CollaboratorMode {
    /// Succeed, echoing the requested epsilon as `epsilonUsed`.
    Echo,
    /// Succeed, reporting the given `epsilonUsed` whatever was requested.
    FixedEpsilon(f64),
    /// Answer `422` with the given error text.
    Reject(&'static str),
    /// Answer `503`.
    Unavailable,
    /// Answer `200` with a body that is not JSON.
    Malformed,
    /// Sleep before behaving like [`CollaboratorMode::Echo`].
    Slow(Duration),
}

#[derive(Clone)]
struct FakeState {
    mode: CollaboratorMode,
    received: Arc<Mutex<Vec<Value>>>,
}

/// Fake collaborator bound to an ephemeral loopback port. Stops when dropped.
#[derive(Debug)]
pub struct FakeCollaborator {
    address: SocketAddr,
    received: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl FakeCollaborator {
    /// Start a collaborator answering in `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the loopback listener cannot be bound.
    pub async fn spawn(mode: CollaboratorMode) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let address = listener.local_addr()?;
        let received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/v1/process", post(process))
            .with_state(FakeState {
                mode,
                received: Arc::clone(&received),
            });
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self {
            address,
            received,
            task,
        })
    }

    /// `host:port` the collaborator listens on.
    #[must_use]
    pub fn address(&self) -> String {
        self.address.to_string()
    }

    /// Request bodies received so far.
    #[must_use]
    pub fn received(&self) -> Vec<Value> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for FakeCollaborator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Loopback address with nothing listening on it.
///
/// # Errors
///
/// Returns an error if a scratch listener cannot be bound.
pub async fn refused_address() -> anyhow::Result<String> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let address = listener.local_addr()?;
    drop(listener);
    Ok(address.to_string())
}

async fn process(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    state
        .received
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(body.clone());

    match state.mode {
        CollaboratorMode::Echo => Json(echo(&body)).into_response(),
        CollaboratorMode::FixedEpsilon(epsilon_used) => {
            let mut reply = echo(&body);
            reply["epsilonUsed"] = json!(epsilon_used);
            Json(reply).into_response()
        }
        CollaboratorMode::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(echo(&body)).into_response()
        }
        CollaboratorMode::Reject(message) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": message })),
        )
            .into_response(),
        CollaboratorMode::Unavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "overloaded" })),
        )
            .into_response(),
        CollaboratorMode::Malformed => (StatusCode::OK, "processing finished").into_response(),
    }
}

fn echo(request: &Value) -> Value {
    let input = request["inputPath"].as_str().unwrap_or_default();
    let file_name = Path::new(input)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    json!({
        "outputPath": format!("anonymized_{file_name}"),
        "privacyScore": 0.88,
        "utilityScore": 0.75,
        "epsilonUsed": request["epsilon"].as_f64().unwrap_or(1.0),
        "singlingOutRisk": 0.05,
        "linkabilityRisk": 0.2,
        "inferenceRisk": 0.4,
        "status": "Success",
        "piiReport": { "email": "MASKED" }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_mirrors_epsilon_and_names_output() {
        let reply = echo(&json!({ "inputPath": "/srv/data/raw_a.csv", "epsilon": 0.25 }));
        assert_eq!(reply["outputPath"], "anonymized_raw_a.csv");
        assert_eq!(reply["epsilonUsed"], 0.25);
    }

    #[tokio::test]
    async fn fixed_epsilon_ignores_the_request() -> anyhow::Result<()> {
        let received = Arc::new(Mutex::new(Vec::new()));
        let reply = process(
            State(FakeState {
                mode: CollaboratorMode::FixedEpsilon(0.8),
                received: Arc::clone(&received),
            }),
            Json(json!({ "inputPath": "/srv/data/raw_a.csv", "epsilon": 2.5 })),
        )
        .await;
        let bytes = axum::body::to_bytes(reply.into_body(), usize::MAX).await?;
        let reply: Value = serde_json::from_slice(&bytes)?;
        assert_eq!(reply["epsilonUsed"], 0.8);
        assert_eq!(received.lock().unwrap_or_else(PoisonError::into_inner).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn refused_address_has_no_listener() -> anyhow::Result<()> {
        let address = refused_address().await?;
        assert!(tokio::net::TcpStream::connect(&address).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn spawned_collaborator_accepts_connections() -> anyhow::Result<()> {
        let fake = FakeCollaborator::spawn(CollaboratorMode::Echo).await?;
        assert!(tokio::net::TcpStream::connect(fake.address()).await.is_ok());
        assert!(fake.received().is_empty());
        Ok(())
    }
}
