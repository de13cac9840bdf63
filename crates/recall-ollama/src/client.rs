// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for Ollama's `/api/embed` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use recall_config::model::EmbeddingConfig;
use recall_core::{AdapterType, EmbeddingAdapter, HealthStatus, PluginAdapter, RecallError};
use tracing::debug;

use crate::types::{ApiErrorResponse, EmbedRequest, EmbedResponse};

/// Embedding adapter backed by a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    /// Creates a client from the `[embedding]` config section.
    ///
    /// The HTTP timeout matches `timeout_ms` so a hung server never holds a
    /// connection past the caller's own budget.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RecallError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RecallError::EmbeddingUnavailable {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Returns the embedding model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl PluginAdapter for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        match self.client.get(self.endpoint("/api/tags")).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "ollama returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("ollama unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RecallError> {
        let response = self
            .client
            .post(self.endpoint("/api/embed"))
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| RecallError::EmbeddingUnavailable {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model = %self.model, "embedding response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(RecallError::embedding(format!(
                "ollama returned {status}: {detail}"
            )));
        }

        let parsed: EmbedResponse =
            response
                .json()
                .await
                .map_err(|e| RecallError::EmbeddingUnavailable {
                    message: format!("invalid embedding response: {e}"),
                    source: Some(Box::new(e)),
                })?;

        parsed
            .into_vector()
            .ok_or_else(|| RecallError::embedding("ollama returned an empty embedding"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_embedder(base_url: &str, timeout_ms: u64) -> OllamaEmbedder {
        OllamaEmbedder::new(&EmbeddingConfig {
            enabled: true,
            base_url: format!("{base_url}/"),
            model: "nomic-embed-text".into(),
            timeout_ms,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn embed_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_json(serde_json::json!({
                "model": "nomic-embed-text",
                "input": "What is the capital of Kenya?"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embeddings": [[0.25, -0.5, 1.0]]})),
            )
            .mount(&server)
            .await;

        let embedder = test_embedder(&server.uri(), 2000);
        let vector = embedder.embed("What is the capital of Kenya?").await.unwrap();
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn embed_reads_legacy_field() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [1.0, 2.0]})),
            )
            .mount(&server)
            .await;

        let embedder = test_embedder(&server.uri(), 2000);
        assert_eq!(embedder.embed("hi").await.unwrap(), vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn server_error_is_embedding_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "model \"nomic-embed-text\" not found"})),
            )
            .mount(&server)
            .await;

        let embedder = test_embedder(&server.uri(), 2000);
        let err = embedder.embed("hi").await.unwrap_err();
        assert!(matches!(err, RecallError::EmbeddingUnavailable { .. }));
        assert!(err.to_string().contains("not found"));
        assert!(err.is_degradable());
    }

    #[tokio::test]
    async fn empty_vector_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"embeddings": []})))
            .mount(&server)
            .await;

        let embedder = test_embedder(&server.uri(), 2000);
        let err = embedder.embed("hi").await.unwrap_err();
        assert!(err.to_string().contains("empty embedding"));
    }

    #[tokio::test]
    async fn slow_server_hits_client_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embeddings": [[1.0]]}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let embedder = test_embedder(&server.uri(), 50);
        let err = embedder.embed("hi").await.unwrap_err();
        assert!(matches!(err, RecallError::EmbeddingUnavailable { .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_unhealthy() {
        let embedder = test_embedder("http://127.0.0.1:9", 200);
        assert!(matches!(
            embedder.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
        assert_eq!(embedder.adapter_type(), AdapterType::Embedding);
    }

    #[tokio::test]
    async fn reachable_server_is_healthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
            .mount(&server)
            .await;

        let embedder = test_embedder(&server.uri(), 2000);
        assert_eq!(embedder.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
