// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory subcommands: `retrieve`, `prompt`, `record`, `stats`, `forget`.

use std::collections::BTreeSet;
use std::sync::Arc;

use recall_config::RecallConfig;
use recall_core::{EmbeddingAdapter, InteractionId, RecallError, UserId};
use recall_memory::{MemoryEngine, Retrieval};
use recall_storage::SqliteMemoryStore;
use serde::Serialize;
use tracing::debug;

/// Opens the store and, when enabled, the embedding backend.
pub async fn open_engine(config: &RecallConfig) -> Result<MemoryEngine, RecallError> {
    recall_memory::recording::register_metrics();
    let store = Arc::new(SqliteMemoryStore::open(&config.storage).await?);
    let embedder = open_embedder(config)?;
    debug!(
        database = %config.storage.database_path,
        embedding = embedder.is_some(),
        "memory engine ready"
    );
    Ok(MemoryEngine::new(config, store, embedder))
}

#[cfg(feature = "ollama")]
pub fn open_embedder(
    config: &RecallConfig,
) -> Result<Option<Arc<dyn EmbeddingAdapter>>, RecallError> {
    if !config.embedding.enabled {
        return Ok(None);
    }
    let embedder: Arc<dyn EmbeddingAdapter> =
        Arc::new(recall_ollama::OllamaEmbedder::new(&config.embedding)?);
    Ok(Some(embedder))
}

#[cfg(not(feature = "ollama"))]
pub fn open_embedder(
    _config: &RecallConfig,
) -> Result<Option<Arc<dyn EmbeddingAdapter>>, RecallError> {
    Ok(None)
}

#[derive(Debug, Serialize)]
struct RetrievedMemory {
    id: InteractionId,
    score: f64,
    vector_score: f64,
    keyword_score: f64,
    rendered: bool,
    user_input: String,
    ai_response: String,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct RetrieveOutput {
    context_text: String,
    memories: Vec<RetrievedMemory>,
}

impl From<&Retrieval> for RetrieveOutput {
    fn from(retrieval: &Retrieval) -> Self {
        Self {
            context_text: retrieval.context_text.clone(),
            memories: retrieval
                .memories
                .iter()
                .map(|m| RetrievedMemory {
                    id: m.interaction.id,
                    score: m.score,
                    vector_score: m.vector_score,
                    keyword_score: m.keyword_score,
                    rendered: retrieval.used_interaction_ids.contains(&m.interaction.id),
                    user_input: m.interaction.user_input.clone(),
                    ai_response: m.interaction.ai_response.clone(),
                    created_at: m.interaction.created_at.to_rfc3339(),
                })
                .collect(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, RecallError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| RecallError::Internal(format!("failed to render JSON: {e}")))
}

pub async fn run_retrieve(
    config: &RecallConfig,
    user_id: UserId,
    query: &str,
    json: bool,
) -> Result<(), RecallError> {
    let engine = open_engine(config).await?;
    let retrieval = engine.retrieve(user_id, query).await;

    if json {
        println!("{}", to_json(&RetrieveOutput::from(&retrieval))?);
    } else if retrieval.is_empty() {
        println!("no memories recalled");
    } else {
        for m in &retrieval.memories {
            println!(
                "#{:<6} score={:.4} (vector {:.4}, keyword {:.4})",
                m.interaction.id, m.score, m.vector_score, m.keyword_score
            );
        }
        println!();
        println!("{}", retrieval.context_text);
    }
    engine.shutdown().await
}

pub async fn run_prompt(
    config: &RecallConfig,
    user_id: UserId,
    query: &str,
    flat: bool,
) -> Result<(), RecallError> {
    let engine = open_engine(config).await?;
    let prompt = engine.for_user(user_id).assemble(query).await;
    if flat {
        println!("{}", prompt.to_prompt_text());
    } else {
        println!("{}", to_json(&prompt.chat_messages())?);
    }
    engine.shutdown().await
}

pub async fn run_record(
    config: &RecallConfig,
    user_id: UserId,
    input: &str,
    response: &str,
    model: &str,
    used: &[i64],
) -> Result<(), RecallError> {
    let engine = open_engine(config).await?;
    let used: BTreeSet<InteractionId> = used.iter().copied().map(InteractionId).collect();
    let id = engine
        .for_user(user_id)
        .record_with_feedback(input, response, model, &used)
        .await?;
    println!("recorded interaction {id}");
    engine.shutdown().await
}

pub async fn run_stats(
    config: &RecallConfig,
    user_id: UserId,
    top: usize,
    json: bool,
) -> Result<(), RecallError> {
    let engine = open_engine(config).await?;
    let stats = engine.stats(user_id, top).await?;
    if json {
        println!("{}", to_json(&stats)?);
    } else {
        println!("user {user_id}");
        println!(
            "  interactions: {} ({} embedded)",
            stats.interactions, stats.embedded_interactions
        );
        println!("  entities:     {}", stats.entities);
        for entity in &stats.top_entities {
            println!(
                "    {:<24} score={:.2} mentions={}",
                entity.display_name, entity.relevance_score, entity.access_count
            );
        }
    }
    engine.shutdown().await
}

pub async fn run_forget(config: &RecallConfig, user_id: UserId) -> Result<(), RecallError> {
    let engine = open_engine(config).await?;
    let summary = engine.forget(user_id).await?;
    println!(
        "deleted {} interactions and {} entities of user {user_id}",
        summary.interactions_deleted, summary.entities_deleted
    );
    engine.shutdown().await
}
