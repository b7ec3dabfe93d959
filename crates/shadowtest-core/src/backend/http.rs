//! Remote model reached over HTTP.
//!
//! The remote endpoint receives `{"request_id": "...", "data": {...}}` and
//! answers with `{"output": ...}`. Latency is measured on the client side.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{BackendError, BackendResult, ModelBackend};
use crate::domain::{InferenceRequest, InputData, ModelResult};

#[derive(Serialize)]
struct RemoteRequest<'a> {
    request_id: &'a str,
    data: &'a InputData,
}

#[derive(Deserialize)]
struct RemotePrediction {
    #[serde(default)]
    output: Value,
}

/// Backend that forwards each request to a model server.
#[derive(Debug, Clone)]
pub struct HttpModelBackend {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpModelBackend {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::with_client(name, endpoint, reqwest::Client::new())
    }

    /// Reuse an existing client (connection pool, TLS settings).
    pub fn with_client(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn predict(&self, request: &InferenceRequest) -> BackendResult<ModelResult> {
        let start = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .json(&RemoteRequest {
                request_id: &request.request_id,
                data: &request.data,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let prediction: RemotePrediction = response.json().await?;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(model = %self.name, endpoint = %self.endpoint, latency_ms, "remote prediction received");

        Ok(ModelResult::success(
            request.request_id.clone(),
            self.name.clone(),
            prediction.output,
            latency_ms,
        ))
    }
}
