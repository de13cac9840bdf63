// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timeout-bounded embedding channel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use recall_core::{EmbeddingAdapter, RecallError};
use tracing::{debug, warn};

use crate::recording;

/// Wraps an optional [`EmbeddingAdapter`] so that every call is bounded by a
/// timeout and every failure turns into "no vector".
#[derive(Clone)]
pub struct EmbeddingChannel {
    adapter: Option<Arc<dyn EmbeddingAdapter>>,
    timeout: Duration,
}

impl std::fmt::Debug for EmbeddingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingChannel")
            .field("adapter", &self.adapter.as_ref().map(|a| a.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl EmbeddingChannel {
    pub fn new(adapter: Arc<dyn EmbeddingAdapter>, timeout: Duration) -> Self {
        Self {
            adapter: Some(adapter),
            timeout,
        }
    }

    /// A channel that never produces vectors.
    pub fn disabled() -> Self {
        Self {
            adapter: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.adapter.is_some()
    }

    /// Embeds `text`, surfacing the failure.
    pub async fn try_embed(&self, text: &str) -> Result<Vec<f32>, RecallError> {
        let Some(adapter) = &self.adapter else {
            return Err(RecallError::embedding("embedding channel disabled"));
        };
        let vector = tokio::time::timeout(self.timeout, adapter.embed(text))
            .await
            .map_err(|_| RecallError::Timeout {
                duration: self.timeout,
            })??;
        if vector.is_empty() {
            return Err(RecallError::embedding("adapter returned an empty vector"));
        }
        Ok(vector)
    }

    /// Embeds `text`, or returns `None` after logging why not.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        if !self.is_enabled() {
            debug!("embedding channel disabled, skipping vector");
            return None;
        }
        let started = Instant::now();
        match self.try_embed(text).await {
            Ok(vector) => {
                debug!(
                    dimension = vector.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "embedding computed"
                );
                Some(vector)
            }
            Err(e) => {
                let reason = match e {
                    RecallError::Timeout { .. } => "timeout",
                    _ => "error",
                };
                warn!(
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "embedding unavailable, continuing without vector"
                );
                recording::record_embedding_degraded(reason);
                None
            }
        }
    }
}
