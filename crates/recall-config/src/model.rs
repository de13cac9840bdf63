// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Recall memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Recall configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to the reference tuning.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecallConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding service settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Hybrid retrieval tuning.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Memory writer tuning (decay, reinforcement).
    #[serde(default)]
    pub writer: WriterConfig,

    /// Keyword extraction settings.
    #[serde(default)]
    pub keywords: KeywordsConfig,

    /// Prompt assembly settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("recall").join("recall.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("recall.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Embedding service configuration.
///
/// The service speaks the Ollama `/api/embed` protocol. When disabled, or
/// when a call fails, retrieval falls back to the keyword channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Enable the vector channel.
    #[serde(default = "default_embedding_enabled")]
    pub enabled: bool,

    /// Base URL of the embedding service.
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Upper bound on a single embedding call, in milliseconds.
    #[serde(default = "default_embedding_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: default_embedding_enabled(),
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            timeout_ms: default_embedding_timeout_ms(),
        }
    }
}

fn default_embedding_enabled() -> bool {
    true
}

fn default_embedding_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_timeout_ms() -> u64 {
    5000
}

/// Hybrid retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Number of most recent embedded interactions scanned by the vector channel.
    #[serde(default = "default_candidate_window")]
    pub candidate_window: usize,

    /// Weight of the vector channel. The keyword channel gets `1 - blend_alpha`.
    #[serde(default = "default_blend_alpha")]
    pub blend_alpha: f64,

    /// Divisor applied to entity relevance in the keyword channel.
    #[serde(default = "default_entity_normalizer")]
    pub entity_normalizer: f64,

    /// Maximum number of memories returned.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum cosine similarity for a vector match. Unset keeps every candidate.
    #[serde(default)]
    pub similarity_threshold: Option<f64>,

    /// Character budget of the rendered context block.
    #[serde(default = "default_context_budget_chars")]
    pub context_budget_chars: usize,

    /// Ignore candidates whose blended score is zero or negative, even when
    /// fewer than `top_k` remain.
    #[serde(default = "default_require_positive_score")]
    pub require_positive_score: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_window: default_candidate_window(),
            blend_alpha: default_blend_alpha(),
            entity_normalizer: default_entity_normalizer(),
            top_k: default_top_k(),
            similarity_threshold: None,
            context_budget_chars: default_context_budget_chars(),
            require_positive_score: default_require_positive_score(),
        }
    }
}

fn default_candidate_window() -> usize {
    100
}

fn default_blend_alpha() -> f64 {
    0.5
}

fn default_entity_normalizer() -> f64 {
    10.0
}

fn default_top_k() -> usize {
    3
}

fn default_context_budget_chars() -> usize {
    2000
}

fn default_require_positive_score() -> bool {
    true
}

/// Memory writer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WriterConfig {
    /// Amount subtracted from every interaction score on each write.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,

    /// Amount added to an entity score on each repeated mention.
    #[serde(default = "default_boost_rate")]
    pub boost_rate: f64,

    /// Also decay the interaction being written.
    #[serde(default)]
    pub decay_includes_new: bool,

    /// Index keywords from the assistant response as well as the user input.
    #[serde(default)]
    pub index_response_keywords: bool,

    /// Decay entity scores alongside interaction scores.
    #[serde(default)]
    pub decay_entities: bool,

    /// Boost added to interactions that were used to answer the turn.
    #[serde(default)]
    pub used_memory_boost: f64,

    /// Lower bound for decayed scores. Unset means scores may go negative.
    #[serde(default)]
    pub score_floor: Option<f64>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            decay_rate: default_decay_rate(),
            boost_rate: default_boost_rate(),
            decay_includes_new: false,
            index_response_keywords: false,
            decay_entities: false,
            used_memory_boost: 0.0,
            score_floor: None,
        }
    }
}

fn default_decay_rate() -> f64 {
    0.05
}

fn default_boost_rate() -> f64 {
    0.5
}

/// Keyword extraction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeywordsConfig {
    /// Fold simple English plurals onto their singular form.
    #[serde(default = "default_stemming")]
    pub stemming: bool,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            stemming: default_stemming(),
        }
    }
}

fn default_stemming() -> bool {
    true
}

/// Prompt assembly configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Opening line of the system message.
    #[serde(default = "default_system_preamble")]
    pub system_preamble: String,

    /// Character budget of the whole system message. Recalled memories
    /// get what the preamble and the context header leave over.
    #[serde(default = "default_budget_chars")]
    pub budget_chars: usize,

    /// Number of most recent exchanges replayed as chat history.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Add a `CURRENT_TIME:` line to the system message.
    #[serde(default)]
    pub include_current_time: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            system_preamble: default_system_preamble(),
            budget_chars: default_budget_chars(),
            history_depth: default_history_depth(),
            include_current_time: false,
        }
    }
}

fn default_system_preamble() -> String {
    "You are a helpful local AI assistant.".to_string()
}

fn default_budget_chars() -> usize {
    2000
}

fn default_history_depth() -> usize {
    4
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
