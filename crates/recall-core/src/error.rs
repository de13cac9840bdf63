// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Recall memory engine.

use thiserror::Error;

/// The primary error type used across all Recall adapter traits and core operations.
///
/// Memory is an enhancement layer: only [`RecallError::StoreUnavailable`] on the
/// write path is meant to reach the caller of a turn. Everything else degrades.
#[derive(Debug, Error)]
pub enum RecallError {
    /// Configuration errors (invalid TOML, out-of-range tuning values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence layer failure (connection, query, migration).
    #[error("store unavailable: {source}")]
    StoreUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The embedding channel failed (network, model, empty vector).
    #[error("embedding unavailable: {message}")]
    EmbeddingUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Persisted entity data could not be decoded.
    #[error("malformed state for entity `{entity_key}`: {detail}")]
    MalformedEntityState { entity_key: String, detail: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RecallError {
    /// Wraps any error as a store failure.
    pub fn store(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::StoreUnavailable {
            source: source.into(),
        }
    }

    /// Builds an embedding failure without an underlying source.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true when the failure only reduces memory quality and the
    /// turn can continue without it.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            RecallError::EmbeddingUnavailable { .. }
                | RecallError::Timeout { .. }
                | RecallError::MalformedEntityState { .. }
        )
    }
}
