// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, the retriever and the writer.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Owner of a memory. Every query and every decay pass is scoped to one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned, monotonically increasing interaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionId(pub i64);

impl fmt::Display for InteractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Embedding,
}

/// One persisted user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub user_id: UserId,
    /// SHA-256 of the raw user input. A deduplication aid, not an identity key.
    pub prompt_hash: String,
    pub user_input: String,
    pub ai_response: String,
    /// Generation model that produced `ai_response`.
    pub model_name: String,
    /// Absent when the embedding channel failed at write time.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    /// Canonical keywords extracted at write time.
    pub keywords: BTreeSet<String>,
    /// Starts at 1.0 and decays on every later write. May go negative.
    pub relevance_score: f64,
    pub created_at: DateTime<Utc>,
}

impl Interaction {
    /// Returns true if a usable embedding is attached.
    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|v| !v.is_empty())
    }
}

/// An interaction that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInteraction {
    pub user_id: UserId,
    pub prompt_hash: String,
    pub user_input: String,
    pub ai_response: String,
    pub model_name: String,
    pub embedding: Option<Vec<f32>>,
    pub keywords: BTreeSet<String>,
    pub relevance_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Aggregate memory footprint of one keyword for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub user_id: UserId,
    /// Canonical keyword, unique per user.
    pub entity_key: String,
    /// Surface form seen at the first mention.
    pub display_name: String,
    pub access_count: u64,
    pub relevance_score: f64,
    /// Interactions mentioning this keyword, oldest first, without duplicates.
    pub mentioned_in: Vec<InteractionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Counts reported for one user's memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub interactions: u64,
    pub embedded_interactions: u64,
    pub entities: u64,
    /// Highest-scored entities, best first.
    pub top_entities: Vec<Entity>,
}

/// Result of a bulk "clear memory" operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearSummary {
    pub interactions_deleted: u64,
    pub entities_deleted: u64,
}
