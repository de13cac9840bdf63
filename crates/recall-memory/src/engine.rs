// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine facade wiring the retriever, writer and assembler to one store.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use recall_config::model::RecallConfig;
use recall_core::{
    ClearSummary, EmbeddingAdapter, HealthStatus, InteractionId, MemoryStats, MemoryStore,
    RecallError, UserId,
};
use tracing::{info, warn};

use crate::assembler::{AssembledPrompt, ContextAssembler};
use crate::embedding::EmbeddingChannel;
use crate::keywords::KeywordExtractor;
use crate::retriever::{HybridRetriever, Retrieval};
use crate::writer::MemoryWriter;

/// Conversational memory for many users over one store.
///
/// Built once at startup and shared; per-turn calls go through
/// [`MemoryEngine::for_user`].
pub struct MemoryEngine {
    store: Arc<dyn MemoryStore>,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    retriever: Arc<HybridRetriever>,
    writer: MemoryWriter,
    assembler: ContextAssembler,
}

impl MemoryEngine {
    /// Builds the engine. `embedder` is ignored when `embedding.enabled` is
    /// false.
    pub fn new(
        config: &RecallConfig,
        store: Arc<dyn MemoryStore>,
        embedder: Option<Arc<dyn EmbeddingAdapter>>,
    ) -> Self {
        let embedder = embedder.filter(|_| config.embedding.enabled);
        let channel = match &embedder {
            Some(adapter) => EmbeddingChannel::new(
                adapter.clone(),
                Duration::from_millis(config.embedding.timeout_ms),
            ),
            None => EmbeddingChannel::disabled(),
        };
        let extractor = KeywordExtractor::new(&config.keywords);

        let retriever = Arc::new(HybridRetriever::new(
            store.clone(),
            channel.clone(),
            extractor,
            config.retrieval.clone(),
        ));
        let writer = MemoryWriter::new(store.clone(), channel, extractor, config.writer.clone());
        let assembler = ContextAssembler::new(store.clone(), retriever.clone(), config.context.clone());

        Self {
            store,
            embedder,
            retriever,
            writer,
            assembler,
        }
    }

    /// Handle carrying `user_id` for the calls of one turn.
    pub fn for_user(&self, user_id: UserId) -> UserMemory<'_> {
        UserMemory {
            engine: self,
            user_id,
        }
    }

    /// Recalls context for `query`. Store failures degrade to an empty
    /// retrieval.
    pub async fn retrieve(&self, user_id: UserId, query: &str) -> Retrieval {
        match self.retriever.retrieve(user_id, query).await {
            Ok(retrieval) => retrieval,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "memory retrieval failed, continuing without context");
                Retrieval::default()
            }
        }
    }

    pub async fn assemble(&self, user_id: UserId, query: &str) -> AssembledPrompt {
        self.assembler.assemble(user_id, query).await
    }

    pub async fn record(
        &self,
        user_id: UserId,
        input: &str,
        response: &str,
        model_name: &str,
    ) -> Result<InteractionId, RecallError> {
        self.writer.record(user_id, input, response, model_name).await
    }

    pub async fn record_with_feedback(
        &self,
        user_id: UserId,
        input: &str,
        response: &str,
        model_name: &str,
        used_ids: &BTreeSet<InteractionId>,
    ) -> Result<InteractionId, RecallError> {
        self.writer
            .record_with_feedback(user_id, input, response, model_name, used_ids)
            .await
    }

    /// Deletes every interaction and entity of the user.
    pub async fn forget(&self, user_id: UserId) -> Result<ClearSummary, RecallError> {
        let summary = self.store.clear_user(user_id).await?;
        info!(
            user_id = %user_id,
            interactions = summary.interactions_deleted,
            entities = summary.entities_deleted,
            "memory cleared"
        );
        Ok(summary)
    }

    pub async fn stats(&self, user_id: UserId, top_n: usize) -> Result<MemoryStats, RecallError> {
        self.store.stats(user_id, top_n).await
    }

    /// Health of the store and, when configured, the embedder.
    pub async fn health(&self) -> Vec<(String, HealthStatus)> {
        let mut out = vec![(
            self.store.name().to_string(),
            probe(self.store.health_check().await),
        )];
        if let Some(embedder) = &self.embedder {
            out.push((embedder.name().to_string(), probe(embedder.health_check().await)));
        }
        out
    }

    /// Shuts down the adapters, store last.
    pub async fn shutdown(&self) -> Result<(), RecallError> {
        if let Some(embedder) = &self.embedder {
            embedder.shutdown().await?;
        }
        self.store.shutdown().await
    }
}

fn probe(result: Result<HealthStatus, RecallError>) -> HealthStatus {
    result.unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()))
}

/// One user's view of the engine.
#[derive(Clone, Copy)]
pub struct UserMemory<'a> {
    engine: &'a MemoryEngine,
    user_id: UserId,
}

impl UserMemory<'_> {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub async fn retrieve(&self, query: &str) -> Retrieval {
        self.engine.retrieve(self.user_id, query).await
    }

    pub async fn assemble(&self, query: &str) -> AssembledPrompt {
        self.engine.assemble(self.user_id, query).await
    }

    pub async fn record(
        &self,
        input: &str,
        response: &str,
        model_name: &str,
    ) -> Result<InteractionId, RecallError> {
        self.engine.record(self.user_id, input, response, model_name).await
    }

    pub async fn record_with_feedback(
        &self,
        input: &str,
        response: &str,
        model_name: &str,
        used_ids: &BTreeSet<InteractionId>,
    ) -> Result<InteractionId, RecallError> {
        self.engine
            .record_with_feedback(self.user_id, input, response, model_name, used_ids)
            .await
    }

    pub async fn forget(&self) -> Result<ClearSummary, RecallError> {
        self.engine.forget(self.user_id).await
    }

    pub async fn stats(&self, top_n: usize) -> Result<MemoryStats, RecallError> {
        self.engine.stats(self.user_id, top_n).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_test_utils::{InMemoryStore, MockEmbedder};

    fn engine(store: Arc<InMemoryStore>) -> MemoryEngine {
        MemoryEngine::new(
            &RecallConfig::default(),
            store,
            Some(Arc::new(MockEmbedder::new())),
        )
    }

    #[tokio::test]
    async fn retrieve_degrades_on_store_failure() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        engine
            .for_user(UserId(1))
            .record("capital of Kenya", "Nairobi", "m")
            .await
            .unwrap();
        store.set_fail_reads(true);
        let retrieval = engine.retrieve(UserId(1), "Kenya").await;
        assert!(retrieval.is_empty());
    }

    #[tokio::test]
    async fn disabled_embedding_ignores_adapter() {
        let store = Arc::new(InMemoryStore::new());
        let embedder = Arc::new(MockEmbedder::new());
        let mut config = RecallConfig::default();
        config.embedding.enabled = false;
        let engine = MemoryEngine::new(&config, store.clone(), Some(embedder.clone()));
        engine.record(UserId(1), "kenya", "ok", "m").await.unwrap();
        assert_eq!(embedder.calls(), 0);
        assert!(!store.interactions(UserId(1)).await[0].has_embedding());
        assert_eq!(engine.health().await.len(), 1);
    }

    #[tokio::test]
    async fn forget_and_stats_are_user_scoped() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store);
        let alice = engine.for_user(UserId(1));
        let bob = engine.for_user(UserId(2));
        alice.record("kenya safari", "ok", "m").await.unwrap();
        bob.record("kenya coffee", "ok", "m").await.unwrap();

        let summary = alice.forget().await.unwrap();
        assert_eq!(summary.interactions_deleted, 1);
        assert_eq!(summary.entities_deleted, 2);
        assert_eq!(alice.stats(5).await.unwrap().interactions, 0);
        assert_eq!(bob.stats(5).await.unwrap().interactions, 1);
    }

    #[tokio::test]
    async fn health_reports_every_adapter() {
        let engine = engine(Arc::new(InMemoryStore::new()));
        let health = engine.health().await;
        assert_eq!(health.len(), 2);
        assert!(health.iter().all(|(_, h)| *h == HealthStatus::Healthy));
        engine.shutdown().await.unwrap();
    }
}
