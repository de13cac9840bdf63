// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding adapter for deterministic testing.
//!
//! `MockEmbedder` implements `EmbeddingAdapter` without any model: by default
//! it hashes words into a fixed number of buckets, so texts sharing words
//! have a positive cosine similarity. It can also be switched into failing or
//! hanging modes to exercise the degraded paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use recall_core::traits::adapter::PluginAdapter;
use recall_core::traits::embedding::EmbeddingAdapter;
use recall_core::types::{AdapterType, HealthStatus};
use recall_core::RecallError;

/// Default vector length of the hashed bag-of-words embedding.
pub const DEFAULT_DIMENSION: usize = 32;

/// How the mock answers `embed` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    /// Hashed bag-of-words vectors.
    Hashed,
    /// Every call fails with `EmbeddingUnavailable`.
    Failing,
    /// Every call sleeps for an hour; pair with a caller-side timeout.
    Hanging,
}

/// A mock embedder with switchable behavior and a call counter.
pub struct MockEmbedder {
    mode: Mutex<EmbedMode>,
    dimension: usize,
    overrides: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    /// Hashed embedder with the default dimension.
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    /// Hashed embedder producing vectors of length `dimension`.
    pub fn with_dimension(dimension: usize) -> Self {
        Self::build(EmbedMode::Hashed, dimension)
    }

    /// Embedder that always fails.
    pub fn failing() -> Self {
        Self::build(EmbedMode::Failing, DEFAULT_DIMENSION)
    }

    /// Embedder that never answers.
    pub fn hanging() -> Self {
        Self::build(EmbedMode::Hanging, DEFAULT_DIMENSION)
    }

    fn build(mode: EmbedMode, dimension: usize) -> Self {
        Self {
            mode: Mutex::new(mode),
            dimension: dimension.max(1),
            overrides: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Switch the behavior of subsequent calls.
    pub async fn set_mode(&self, mode: EmbedMode) {
        *self.mode.lock().await = mode;
    }

    /// Return `vector` verbatim whenever `text` is embedded.
    pub async fn set_vector(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.overrides.lock().await.insert(text.into(), vector);
    }

    /// Number of `embed` calls made so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The hashed bag-of-words vector for `text`.
    pub fn hashed_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dimension;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        Ok(match *self.mode.lock().await {
            EmbedMode::Hashed => HealthStatus::Healthy,
            EmbedMode::Failing => HealthStatus::Unhealthy("mock failure".into()),
            EmbedMode::Hanging => HealthStatus::Degraded("mock hang".into()),
        })
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RecallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().await;
        match mode {
            EmbedMode::Failing => Err(RecallError::embedding("mock embedder failure")),
            EmbedMode::Hanging => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(RecallError::embedding("mock embedder woke up"))
            }
            EmbedMode::Hashed => {
                if let Some(v) = self.overrides.lock().await.get(text) {
                    return Ok(v.clone());
                }
                Ok(self.hashed_vector(text))
            }
        }
    }
}
