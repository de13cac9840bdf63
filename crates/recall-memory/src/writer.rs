// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory writer: persists each turn, maintains the entity index and decays
//! older memories.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use recall_config::model::WriterConfig;
use recall_core::{InteractionId, MemoryStore, NewInteraction, RecallError, UserId};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::embedding::EmbeddingChannel;
use crate::entity_index::EntityIndex;
use crate::keywords::KeywordExtractor;
use crate::recording;

/// Relevance of a freshly recorded interaction.
pub const INITIAL_RELEVANCE: f64 = 1.0;

/// Text embedded for a stored exchange.
pub fn embedding_text(input: &str, response: &str) -> String {
    format!("User: {input} | AI: {response}")
}

/// Hex-encoded SHA-256 of the raw user input.
pub fn prompt_hash(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// One async mutex per user. Different users never contend.
///
/// An entry lives only while someone holds or waits for it, so the map does
/// not grow with the number of users ever seen.
#[derive(Default)]
pub struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `user_id`'s memory.
    pub async fn acquire(&self, user_id: UserId) -> UserGuard<'_> {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = self.locks.entry(user_id).or_default().clone();
        UserGuard {
            locks: self,
            user_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of users currently holding or waiting for a lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one user's memory. Dropping it releases the lock and
/// forgets the user's entry when nobody else is waiting.
pub struct UserGuard<'a> {
    locks: &'a UserLocks,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        // Release first so the map holds the only remaining reference.
        drop(self.guard.take());
        self.locks
            .locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Persists interactions and applies reinforcement and decay.
pub struct MemoryWriter {
    store: Arc<dyn MemoryStore>,
    entities: EntityIndex,
    embedder: EmbeddingChannel,
    extractor: KeywordExtractor,
    locks: UserLocks,
    config: WriterConfig,
}

impl MemoryWriter {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        embedder: EmbeddingChannel,
        extractor: KeywordExtractor,
        config: WriterConfig,
    ) -> Self {
        Self {
            entities: EntityIndex::new(store.clone()),
            store,
            embedder,
            extractor,
            locks: UserLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Records one completed turn.
    pub async fn record(
        &self,
        user_id: UserId,
        input: &str,
        response: &str,
        model_name: &str,
    ) -> Result<InteractionId, RecallError> {
        self.record_with_feedback(user_id, input, response, model_name, &BTreeSet::new())
            .await
    }

    /// Records one completed turn and reinforces the interactions that were
    /// recalled into its prompt.
    pub async fn record_with_feedback(
        &self,
        user_id: UserId,
        input: &str,
        response: &str,
        model_name: &str,
        used_ids: &BTreeSet<InteractionId>,
    ) -> Result<InteractionId, RecallError> {
        let started = Instant::now();
        match self
            .record_locked(user_id, input, response, model_name, used_ids)
            .await
        {
            Ok((id, embedded, keywords)) => {
                recording::record_interaction(embedded);
                info!(
                    user_id = %user_id,
                    interaction_id = %id,
                    keywords,
                    embedded,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "interaction recorded"
                );
                Ok(id)
            }
            Err(e) => {
                recording::record_write_failure();
                error!(user_id = %user_id, error = %e, "memory write lost");
                Err(e)
            }
        }
    }

    async fn record_locked(
        &self,
        user_id: UserId,
        input: &str,
        response: &str,
        model_name: &str,
        used_ids: &BTreeSet<InteractionId>,
    ) -> Result<(InteractionId, bool, usize), RecallError> {
        let _guard = self.locks.acquire(user_id).await;

        let embedding = match self.embedder.embed(&embedding_text(input, response)).await {
            Some(vector) => self.check_dimension(user_id, vector).await?,
            None => None,
        };
        let embedded = embedding.is_some();

        let mut mentions = self.extractor.extract_with_display(input);
        if self.config.index_response_keywords {
            for (key, display) in self.extractor.extract_with_display(response) {
                mentions.entry(key).or_insert(display);
            }
        }
        let keywords: BTreeSet<String> = mentions.keys().cloned().collect();
        let keyword_count = keywords.len();

        let now = Utc::now();
        let id = self
            .store
            .insert(NewInteraction {
                user_id,
                prompt_hash: prompt_hash(input),
                user_input: input.to_string(),
                ai_response: response.to_string(),
                model_name: model_name.to_string(),
                embedding,
                keywords,
                relevance_score: INITIAL_RELEVANCE,
                created_at: now,
            })
            .await?;

        self.entities
            .record_mentions(user_id, id, &mentions, self.config.boost_rate, now)
            .await?;

        self.reinforce(user_id, id, used_ids).await?;

        let exclude = (!self.config.decay_includes_new).then_some(id);
        let decayed = self
            .store
            .decay_all(user_id, self.config.decay_rate, exclude, self.config.score_floor)
            .await?;
        let decayed_entities = if self.config.decay_entities {
            self.entities
                .decay(user_id, self.config.decay_rate, self.config.score_floor)
                .await?
        } else {
            0
        };
        debug!(
            user_id = %user_id,
            interaction_id = %id,
            decayed,
            decayed_entities,
            "decay applied"
        );

        Ok((id, embedded, keyword_count))
    }

    /// Drops a vector whose length differs from the user's stored ones so a
    /// model change cannot mix dimensionalities in one history.
    async fn check_dimension(
        &self,
        user_id: UserId,
        vector: Vec<f32>,
    ) -> Result<Option<Vec<f32>>, RecallError> {
        let latest = self.store.find_recent(user_id, 1, true).await?;
        match latest.first().and_then(|i| i.embedding.as_ref()) {
            Some(existing) if existing.len() != vector.len() => {
                warn!(
                    user_id = %user_id,
                    expected = existing.len(),
                    actual = vector.len(),
                    "embedding dimension changed, storing interaction without vector"
                );
                Ok(None)
            }
            _ => Ok(Some(vector)),
        }
    }

    async fn reinforce(
        &self,
        user_id: UserId,
        new_id: InteractionId,
        used_ids: &BTreeSet<InteractionId>,
    ) -> Result<(), RecallError> {
        let amount = self.config.used_memory_boost;
        if amount <= 0.0 || used_ids.is_empty() {
            return Ok(());
        }
        let ids: Vec<InteractionId> = used_ids.iter().copied().filter(|id| *id != new_id).collect();
        let boosted = self.store.boost_interactions(user_id, &ids, amount).await?;
        debug!(user_id = %user_id, boosted, amount, "used memories reinforced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_test_utils::{InMemoryStore, MockEmbedder};
    use std::time::Duration;

    const USER: UserId = UserId(1);

    fn writer(store: Arc<InMemoryStore>, config: WriterConfig) -> MemoryWriter {
        let channel = EmbeddingChannel::new(Arc::new(MockEmbedder::new()), Duration::from_secs(1));
        MemoryWriter::new(store, channel, KeywordExtractor::default(), config)
    }

    #[test]
    fn prompt_hash_is_sha256_hex() {
        assert_eq!(
            prompt_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn embedding_text_format() {
        assert_eq!(embedding_text("hi", "hello"), "User: hi | AI: hello");
    }

    #[tokio::test]
    async fn record_persists_row_and_entities() {
        let store = Arc::new(InMemoryStore::new());
        let w = writer(store.clone(), WriterConfig::default());
        let id = w
            .record(USER, "What is the capital of Kenya?", "Nairobi.", "llama3")
            .await
            .unwrap();

        let rows = store.interactions(USER).await;
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.relevance_score, 1.0);
        assert!(row.has_embedding());
        assert_eq!(row.prompt_hash, prompt_hash("What is the capital of Kenya?"));
        assert_eq!(
            row.keywords,
            ["capital".to_string(), "kenya".to_string()].into()
        );

        let kenya = store.entity(USER, "kenya").await.expect("entity");
        assert_eq!(kenya.display_name, "Kenya");
        assert_eq!(kenya.mentioned_in, vec![id]);
        assert!(store.entity(USER, "nairobi").await.is_none());
    }

    #[tokio::test]
    async fn response_keywords_indexed_when_enabled() {
        let store = Arc::new(InMemoryStore::new());
        let config = WriterConfig {
            index_response_keywords: true,
            ..WriterConfig::default()
        };
        writer(store.clone(), config)
            .record(USER, "capital of Kenya?", "Nairobi.", "llama3")
            .await
            .unwrap();
        assert!(store.entity(USER, "nairobi").await.is_some());
    }

    #[tokio::test]
    async fn failing_embedder_stores_null_vector() {
        let store = Arc::new(InMemoryStore::new());
        let channel =
            EmbeddingChannel::new(Arc::new(MockEmbedder::failing()), Duration::from_secs(1));
        let w = MemoryWriter::new(
            store.clone(),
            channel,
            KeywordExtractor::default(),
            WriterConfig::default(),
        );
        w.record(USER, "kenya", "ok", "llama3").await.unwrap();
        assert!(!store.interactions(USER).await[0].has_embedding());
    }

    #[tokio::test]
    async fn dimension_change_stores_null_vector() {
        let store = Arc::new(InMemoryStore::new());
        let embedder = Arc::new(MockEmbedder::with_dimension(8));
        let channel = EmbeddingChannel::new(embedder.clone(), Duration::from_secs(1));
        let w = MemoryWriter::new(
            store.clone(),
            channel,
            KeywordExtractor::default(),
            WriterConfig::default(),
        );
        w.record(USER, "first", "one", "m").await.unwrap();
        embedder
            .set_vector(embedding_text("second", "two"), vec![1.0, 2.0])
            .await;
        w.record(USER, "second", "two", "m").await.unwrap();

        let rows = store.interactions(USER).await;
        assert!(rows[0].has_embedding());
        assert!(!rows[1].has_embedding());
    }

    #[tokio::test]
    async fn feedback_boosts_used_memories_before_decay() {
        let store = Arc::new(InMemoryStore::new());
        let config = WriterConfig {
            used_memory_boost: 0.2,
            ..WriterConfig::default()
        };
        let w = writer(store.clone(), config);
        let first = w.record(USER, "kenya", "ok", "m").await.unwrap();
        let second = w.record(USER, "other", "ok", "m").await.unwrap();
        w.record_with_feedback(USER, "kenya again", "ok", "m", &[first].into())
            .await
            .unwrap();

        let rows = store.interactions(USER).await;
        let score = |id| {
            rows.iter()
                .find(|r| r.id == id)
                .map(|r| r.relevance_score)
                .unwrap()
        };
        assert!((score(first) - (1.0 - 0.05 + 0.2 - 0.05)).abs() < 1e-9);
        assert!((score(second) - 0.95).abs() < 1e-9);
    }

    #[tokio::test]
    async fn feedback_is_ignored_when_boost_is_zero() {
        let store = Arc::new(InMemoryStore::new());
        let w = writer(store.clone(), WriterConfig::default());
        let first = w.record(USER, "kenya", "ok", "m").await.unwrap();
        w.record_with_feedback(USER, "again", "ok", "m", &[first].into())
            .await
            .unwrap();
        let rows = store.interactions(USER).await;
        assert!((rows[0].relevance_score - 0.95).abs() < 1e-9);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn store_failure_is_surfaced_and_logged() {
        let store = Arc::new(InMemoryStore::new());
        store.set_fail_writes(true);
        let err = writer(store, WriterConfig::default())
            .record(USER, "kenya", "ok", "m")
            .await
            .unwrap_err();
        assert!(matches!(err, RecallError::StoreUnavailable { .. }));
        assert!(logs_contain("memory write lost"));
    }

    #[tokio::test]
    async fn concurrent_records_for_one_user_are_serialized() {
        let store = Arc::new(InMemoryStore::new());
        let w = Arc::new(writer(store.clone(), WriterConfig::default()));
        let mut handles = Vec::new();
        for i in 0..10 {
            let w = w.clone();
            handles.push(tokio::spawn(async move {
                w.record(USER, &format!("kenya turn {i}"), "ok", "m").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let kenya = store.entity(USER, "kenya").await.expect("entity");
        assert_eq!(kenya.access_count, 10);
        assert_eq!(kenya.mentioned_in.len(), 10);
        assert!((kenya.relevance_score - (1.0 + 9.0 * 0.5)).abs() < 1e-9);

        // Each row is decayed once per later write.
        let mut scores: Vec<f64> = store
            .interactions(USER)
            .await
            .iter()
            .map(|r| r.relevance_score)
            .collect();
        scores.sort_by(|a, b| b.total_cmp(a));
        for (n, score) in scores.iter().enumerate() {
            assert!((score - (1.0 - n as f64 * 0.05)).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn user_locks_are_per_user() {
        let locks = UserLocks::new();
        let _a = locks.acquire(UserId(1)).await;
        // Would deadlock if users shared a lock.
        let _b = locks.acquire(UserId(2)).await;
        assert_eq!(locks.len(), 2);
        assert!(!locks.is_empty());
    }

    #[tokio::test]
    async fn released_user_locks_are_forgotten() {
        let locks = UserLocks::new();
        for user in 0..100 {
            let _guard = locks.acquire(UserId(user)).await;
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn lock_entry_survives_while_a_waiter_is_queued() {
        let locks = Arc::new(UserLocks::new());
        let first = locks.acquire(USER).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(USER).await;
            })
        };
        // Let the waiter clone the lock and park on it.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        drop(first);
        assert_eq!(locks.len(), 1);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn writer_forgets_lock_after_record() {
        let store = Arc::new(InMemoryStore::new());
        let w = writer(store, WriterConfig::default());
        w.record(USER, "kenya", "ok", "m").await.unwrap();
        assert!(w.locks.is_empty());
    }
}
