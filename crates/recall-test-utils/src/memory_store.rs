// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `MemoryStore` for fast tests.
//!
//! Mirrors the SQLite store's ordering and scoping rules. Reads and writes
//! can be made to fail independently to exercise `StoreUnavailable` paths.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use recall_core::{
    AdapterType, ClearSummary, Entity, HealthStatus, Interaction, InteractionId, MemoryStats,
    MemoryStore, NewInteraction, PluginAdapter, RecallError, UserId,
};

#[derive(Default)]
struct State {
    next_id: i64,
    interactions: BTreeMap<InteractionId, Interaction>,
    entities: BTreeMap<(UserId, String), Entity>,
}

/// A `MemoryStore` backed by plain collections behind a tokio mutex.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with `StoreUnavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with `StoreUnavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every interaction of a user, oldest first.
    pub async fn interactions(&self, user_id: UserId) -> Vec<Interaction> {
        self.state
            .lock()
            .await
            .interactions
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Snapshot of one entity.
    pub async fn entity(&self, user_id: UserId, key: &str) -> Option<Entity> {
        self.state
            .lock()
            .await
            .entities
            .get(&(user_id, key.to_string()))
            .cloned()
    }

    fn check_read(&self) -> Result<(), RecallError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RecallError::store(std::io::Error::other("simulated read failure")));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), RecallError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RecallError::store(std::io::Error::other("simulated write failure")));
        }
        Ok(())
    }
}

fn apply_decay(score: f64, rate: f64, floor: Option<f64>) -> f64 {
    match floor {
        Some(floor) => (score - rate).max(score.min(floor)),
        None => score - rate,
    }
}

#[async_trait]
impl PluginAdapter for InMemoryStore {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RecallError> {
        Ok(if self.fail_reads.load(Ordering::SeqCst) || self.fail_writes.load(Ordering::SeqCst) {
            HealthStatus::Unhealthy("simulated failure".into())
        } else {
            HealthStatus::Healthy
        })
    }

    async fn shutdown(&self) -> Result<(), RecallError> {
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn find_recent(
        &self,
        user_id: UserId,
        limit: usize,
        require_embedding: bool,
    ) -> Result<Vec<Interaction>, RecallError> {
        self.check_read()?;
        let state = self.state.lock().await;
        let mut rows: Vec<Interaction> = state
            .interactions
            .values()
            .filter(|i| i.user_id == user_id)
            .filter(|i| !require_embedding || i.has_embedding())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn find_by_ids(
        &self,
        user_id: UserId,
        ids: &[InteractionId],
    ) -> Result<Vec<Interaction>, RecallError> {
        self.check_read()?;
        let state = self.state.lock().await;
        let wanted: BTreeSet<_> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| state.interactions.get(&id))
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_entities(
        &self,
        user_id: UserId,
        keys: &BTreeSet<String>,
    ) -> Result<Vec<Entity>, RecallError> {
        self.check_read()?;
        let state = self.state.lock().await;
        Ok(keys
            .iter()
            .filter_map(|k| state.entities.get(&(user_id, k.clone())))
            .cloned()
            .collect())
    }

    async fn insert(&self, interaction: NewInteraction) -> Result<InteractionId, RecallError> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = InteractionId(state.next_id);
        state.interactions.insert(
            id,
            Interaction {
                id,
                user_id: interaction.user_id,
                prompt_hash: interaction.prompt_hash,
                user_input: interaction.user_input,
                ai_response: interaction.ai_response,
                model_name: interaction.model_name,
                embedding: interaction.embedding,
                keywords: interaction.keywords,
                relevance_score: interaction.relevance_score,
                created_at: interaction.created_at,
            },
        );
        Ok(id)
    }

    async fn upsert_entity(&self, entity: &Entity) -> Result<(), RecallError> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        let key = (entity.user_id, entity.entity_key.clone());
        let mut row = entity.clone();
        if let Some(existing) = state.entities.get(&key) {
            row.created_at = existing.created_at;
        }
        state.entities.insert(key, row);
        Ok(())
    }

    async fn decay_all(
        &self,
        user_id: UserId,
        rate: f64,
        exclude: Option<InteractionId>,
        floor: Option<f64>,
    ) -> Result<u64, RecallError> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        let mut touched = 0;
        for row in state
            .interactions
            .values_mut()
            .filter(|i| i.user_id == user_id && Some(i.id) != exclude)
        {
            row.relevance_score = apply_decay(row.relevance_score, rate, floor);
            touched += 1;
        }
        Ok(touched)
    }

    async fn boost_interactions(
        &self,
        user_id: UserId,
        ids: &[InteractionId],
        amount: f64,
    ) -> Result<u64, RecallError> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        let mut touched = 0;
        for id in ids {
            if let Some(row) = state.interactions.get_mut(id)
                && row.user_id == user_id
            {
                row.relevance_score += amount;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn decay_entities(
        &self,
        user_id: UserId,
        rate: f64,
        floor: Option<f64>,
    ) -> Result<u64, RecallError> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        let mut touched = 0;
        for entity in state.entities.values_mut().filter(|e| e.user_id == user_id) {
            entity.relevance_score = apply_decay(entity.relevance_score, rate, floor);
            touched += 1;
        }
        Ok(touched)
    }

    async fn clear_user(&self, user_id: UserId) -> Result<ClearSummary, RecallError> {
        self.check_write()?;
        let mut state = self.state.lock().await;
        let before_i = state.interactions.len();
        let before_e = state.entities.len();
        state.interactions.retain(|_, i| i.user_id != user_id);
        state.entities.retain(|(owner, _), _| *owner != user_id);
        Ok(ClearSummary {
            interactions_deleted: (before_i - state.interactions.len()) as u64,
            entities_deleted: (before_e - state.entities.len()) as u64,
        })
    }

    async fn stats(&self, user_id: UserId, top_n: usize) -> Result<MemoryStats, RecallError> {
        self.check_read()?;
        let state = self.state.lock().await;
        let rows: Vec<&Interaction> = state
            .interactions
            .values()
            .filter(|i| i.user_id == user_id)
            .collect();
        let mut top_entities: Vec<Entity> = state
            .entities
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        let entities = top_entities.len() as u64;
        top_entities.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.access_count.cmp(&a.access_count))
                .then(a.entity_key.cmp(&b.entity_key))
        });
        top_entities.truncate(top_n);
        Ok(MemoryStats {
            interactions: rows.len() as u64,
            embedded_interactions: rows.iter().filter(|i| i.has_embedding()).count() as u64,
            entities,
            top_entities,
        })
    }
}
