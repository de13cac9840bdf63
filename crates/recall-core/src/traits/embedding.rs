// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::RecallError;
use crate::traits::adapter::PluginAdapter;

/// Converts text into a dense vector.
///
/// Implementations report failures as [`RecallError::EmbeddingUnavailable`];
/// callers treat every error as "no vector" and keep going.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Embeds one piece of text. An empty vector is an error.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RecallError>;
}
