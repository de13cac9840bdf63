// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository interface over persisted interactions and entities.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::RecallError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ClearSummary, Entity, Interaction, InteractionId, MemoryStats, NewInteraction, UserId};

/// Narrow persistence interface used by the retriever and the writer.
///
/// Every method is scoped to one user. Implementations must never return
/// rows owned by another user, and must recover from undecodable entity
/// state by logging and treating the entity as having no linked interactions.
#[async_trait]
pub trait MemoryStore: PluginAdapter {
    /// Most recent interactions first, at most `limit` rows.
    ///
    /// With `require_embedding` only rows carrying an embedding are returned.
    async fn find_recent(
        &self,
        user_id: UserId,
        limit: usize,
        require_embedding: bool,
    ) -> Result<Vec<Interaction>, RecallError>;

    /// Loads the given interactions. Missing ids and foreign rows are omitted;
    /// the result order is unspecified.
    async fn find_by_ids(
        &self,
        user_id: UserId,
        ids: &[InteractionId],
    ) -> Result<Vec<Interaction>, RecallError>;

    /// Entities whose key is in `keys`.
    async fn find_entities(
        &self,
        user_id: UserId,
        keys: &BTreeSet<String>,
    ) -> Result<Vec<Entity>, RecallError>;

    /// Persists a new interaction and returns its store-assigned id.
    async fn insert(&self, interaction: NewInteraction) -> Result<InteractionId, RecallError>;

    /// Inserts the entity or replaces the stored row with the same
    /// `(user_id, entity_key)`.
    async fn upsert_entity(&self, entity: &Entity) -> Result<(), RecallError>;

    /// Subtracts `rate` from every interaction score of the user, skipping
    /// `exclude`. With a `floor`, decayed scores never drop below it.
    /// Returns the number of rows touched.
    async fn decay_all(
        &self,
        user_id: UserId,
        rate: f64,
        exclude: Option<InteractionId>,
        floor: Option<f64>,
    ) -> Result<u64, RecallError>;

    /// Adds `amount` to the score of each listed interaction.
    async fn boost_interactions(
        &self,
        user_id: UserId,
        ids: &[InteractionId],
        amount: f64,
    ) -> Result<u64, RecallError>;

    /// Subtracts `rate` from every entity score of the user.
    async fn decay_entities(
        &self,
        user_id: UserId,
        rate: f64,
        floor: Option<f64>,
    ) -> Result<u64, RecallError>;

    /// Deletes all interactions and entities of the user.
    async fn clear_user(&self, user_id: UserId) -> Result<ClearSummary, RecallError>;

    /// Counts plus the `top_n` highest-scored entities.
    async fn stats(&self, user_id: UserId, top_n: usize) -> Result<MemoryStats, RecallError>;
}
