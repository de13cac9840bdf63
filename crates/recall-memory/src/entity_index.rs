// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-to-interaction index with per-entity reinforcement.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use recall_core::{Entity, InteractionId, MemoryStore, RecallError, UserId};
use tracing::debug;

/// Score assigned to an entity on its first mention.
pub const INITIAL_ENTITY_SCORE: f64 = 1.0;

/// Applies one mention of `entity_key` by interaction `id`.
///
/// A new entity starts with one access and [`INITIAL_ENTITY_SCORE`]. An
/// existing one gains an access and `boost_rate`, and `id` is appended to
/// `mentioned_in`. Re-applying a mention that is already linked returns the
/// entity unchanged.
pub fn apply_mention(
    existing: Option<Entity>,
    user_id: UserId,
    entity_key: &str,
    display_name: &str,
    id: InteractionId,
    boost_rate: f64,
    now: DateTime<Utc>,
) -> Entity {
    match existing {
        None => Entity {
            user_id,
            entity_key: entity_key.to_string(),
            display_name: display_name.to_string(),
            access_count: 1,
            relevance_score: INITIAL_ENTITY_SCORE,
            mentioned_in: vec![id],
            created_at: now,
            updated_at: now,
        },
        Some(entity) if entity.mentioned_in.contains(&id) => entity,
        Some(mut entity) => {
            entity.access_count += 1;
            entity.relevance_score += boost_rate;
            entity.mentioned_in.push(id);
            entity.updated_at = now;
            entity
        }
    }
}

/// Entity bookkeeping on top of a [`MemoryStore`].
///
/// Mutations are read-modify-write and must run under the per-user writer
/// lock.
#[derive(Clone)]
pub struct EntityIndex {
    store: Arc<dyn MemoryStore>,
}

impl EntityIndex {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    /// Links interaction `id` to every keyword in `mentions`
    /// (canonical key to display form). Returns the number of upserts.
    pub async fn record_mentions(
        &self,
        user_id: UserId,
        id: InteractionId,
        mentions: &BTreeMap<String, String>,
        boost_rate: f64,
        now: DateTime<Utc>,
    ) -> Result<usize, RecallError> {
        if mentions.is_empty() {
            return Ok(0);
        }
        let keys: BTreeSet<String> = mentions.keys().cloned().collect();
        let mut existing: BTreeMap<String, Entity> = self
            .store
            .find_entities(user_id, &keys)
            .await?
            .into_iter()
            .map(|e| (e.entity_key.clone(), e))
            .collect();

        for (key, display) in mentions {
            let entity = apply_mention(
                existing.remove(key),
                user_id,
                key,
                display,
                id,
                boost_rate,
                now,
            );
            self.store.upsert_entity(&entity).await?;
        }
        debug!(
            user_id = %user_id,
            interaction_id = %id,
            keywords = mentions.len(),
            "entity index updated"
        );
        Ok(mentions.len())
    }

    /// Entities for `keys`; unknown keys are simply absent.
    pub async fn lookup(
        &self,
        user_id: UserId,
        keys: &BTreeSet<String>,
    ) -> Result<Vec<Entity>, RecallError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.store.find_entities(user_id, keys).await
    }

    /// Decays every entity score of the user.
    pub async fn decay(
        &self,
        user_id: UserId,
        rate: f64,
        floor: Option<f64>,
    ) -> Result<u64, RecallError> {
        self.store.decay_entities(user_id, rate, floor).await
    }
}
