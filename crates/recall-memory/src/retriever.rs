// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid retrieval: vector similarity blended with the keyword channel.
//!
//! Scores from both channels are summed per interaction:
//!
//! - vector: `alpha * cosine(query, interaction)` over the most recent
//!   embedded interactions
//! - keyword: `(1 - alpha) * entity.relevance / normalizer` for every
//!   interaction linked to an entity whose key appears in the query
//!
//! The top K interactions are rendered into a character-bounded context.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use recall_config::model::RetrievalConfig;
use recall_core::{cosine_similarity, Interaction, InteractionId, MemoryStore, RecallError, UserId};
use tracing::debug;

use crate::embedding::EmbeddingChannel;
use crate::entity_index::EntityIndex;
use crate::keywords::KeywordExtractor;
use crate::recording;

/// An interaction with its combined and per-channel scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredInteraction {
    pub interaction: Interaction,
    pub score: f64,
    pub vector_score: f64,
    pub keyword_score: f64,
}

/// Result of a retrieval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieval {
    /// Rendered fragments, one per line, highest score first.
    pub context_text: String,
    /// Exactly the interactions rendered into `context_text`.
    pub used_interaction_ids: BTreeSet<InteractionId>,
    /// Top K interactions, best first. May hold more entries than were
    /// rendered when the budget ran out.
    pub memories: Vec<ScoredInteraction>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }
}

/// Renders one interaction as a single context line.
pub fn render_fragment(interaction: &Interaction) -> String {
    format!(
        "- User asked: \"{}\". You answered: \"{}\"",
        collapse_whitespace(&interaction.user_input),
        collapse_whitespace(&interaction.ai_response)
    )
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of leading `fragments` that fit in `budget` characters when
/// joined with newlines.
pub fn fit_to_budget<S: AsRef<str>>(fragments: &[S], budget: usize) -> usize {
    let mut used = 0usize;
    for (i, fragment) in fragments.iter().enumerate() {
        let sep = usize::from(i > 0);
        let len = fragment.as_ref().chars().count() + sep;
        if used + len > budget {
            return i;
        }
        used += len;
    }
    fragments.len()
}

#[derive(Debug, Clone, Copy, Default)]
struct Scores {
    vector: f64,
    keyword: f64,
}

impl Scores {
    fn total(&self) -> f64 {
        self.vector + self.keyword
    }
}

/// Hybrid retriever over a [`MemoryStore`].
#[derive(Clone)]
pub struct HybridRetriever {
    store: Arc<dyn MemoryStore>,
    entities: EntityIndex,
    embedder: EmbeddingChannel,
    extractor: KeywordExtractor,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        embedder: EmbeddingChannel,
        extractor: KeywordExtractor,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            entities: EntityIndex::new(store.clone()),
            store,
            embedder,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieves the most relevant past interactions for `query`.
    ///
    /// A missing embedding or an empty keyword set only disables the
    /// corresponding channel. Store failures are returned.
    pub async fn retrieve(&self, user_id: UserId, query: &str) -> Result<Retrieval, RecallError> {
        let started = Instant::now();
        let alpha = self.config.blend_alpha;
        let mut scores: HashMap<InteractionId, Scores> = HashMap::new();
        let mut loaded: HashMap<InteractionId, Interaction> = HashMap::new();

        let query_vector = self.embedder.embed(query).await;
        let query_keywords = self.extractor.extract(query);

        let mut vector_hits = 0usize;
        if let Some(query_vector) = &query_vector {
            let candidates = self
                .store
                .find_recent(user_id, self.config.candidate_window, true)
                .await?;
            for candidate in candidates {
                let Some(embedding) = candidate.embedding.as_deref() else {
                    continue;
                };
                if embedding.len() != query_vector.len() {
                    debug!(
                        interaction_id = %candidate.id,
                        expected = query_vector.len(),
                        actual = embedding.len(),
                        "skipping candidate with mismatched embedding dimension"
                    );
                    continue;
                }
                let sim = cosine_similarity(query_vector, embedding);
                if self.config.similarity_threshold.is_some_and(|t| sim < t) {
                    continue;
                }
                scores.entry(candidate.id).or_default().vector += alpha * sim;
                loaded.insert(candidate.id, candidate);
                vector_hits += 1;
            }
        }

        let mut keyword_hits = 0usize;
        if !query_keywords.is_empty() {
            let entities = self.entities.lookup(user_id, &query_keywords).await?;
            for entity in entities {
                let contribution =
                    (1.0 - alpha) * entity.relevance_score / self.config.entity_normalizer;
                for id in &entity.mentioned_in {
                    scores.entry(*id).or_default().keyword += contribution;
                    keyword_hits += 1;
                }
            }
        }

        recording::record_retrieval(match (vector_hits > 0, keyword_hits > 0) {
            (true, true) => "both",
            (true, false) => "vector",
            (false, true) => "keyword",
            (false, false) => "none",
        });

        let memories = self.select_top(user_id, scores, loaded).await?;

        let fragments: Vec<String> = memories
            .iter()
            .map(|m| render_fragment(&m.interaction))
            .collect();
        let fitted = fit_to_budget(&fragments, self.config.context_budget_chars);
        let context_text = fragments[..fitted].join("\n");
        let used_interaction_ids = memories[..fitted]
            .iter()
            .map(|m| m.interaction.id)
            .collect();

        debug!(
            user_id = %user_id,
            keywords = query_keywords.len(),
            embedded = query_vector.is_some(),
            vector_hits,
            keyword_hits,
            selected = memories.len(),
            rendered = fitted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "memory retrieval complete"
        );

        Ok(Retrieval {
            context_text,
            used_interaction_ids,
            memories,
        })
    }

    /// Picks the top K scored interactions that still exist for the user.
    ///
    /// With `require_positive_score` (the default) a candidate whose blended
    /// score is zero or negative is never returned, so an orthogonal vector
    /// hit does not fill a free slot. Rows tied with the cutoff score are
    /// loaded too so that recency can break the tie.
    async fn select_top(
        &self,
        user_id: UserId,
        scores: HashMap<InteractionId, Scores>,
        mut loaded: HashMap<InteractionId, Interaction>,
    ) -> Result<Vec<ScoredInteraction>, RecallError> {
        let k = self.config.top_k;
        let mut ranked: Vec<(InteractionId, Scores)> = scores
            .into_iter()
            .filter(|(_, s)| !self.config.require_positive_score || s.total() > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total().total_cmp(&a.1.total()).then(b.0.cmp(&a.0)));

        let mut resolved: BTreeMap<InteractionId, Interaction> = BTreeMap::new();
        let mut cursor = 0;
        while resolved.len() < k && cursor < ranked.len() {
            let mut end = (cursor + k - resolved.len()).min(ranked.len());
            while end < ranked.len() && ranked[end].1.total() == ranked[end - 1].1.total() {
                end += 1;
            }
            let batch = &ranked[cursor..end];

            let missing: Vec<InteractionId> = batch
                .iter()
                .map(|(id, _)| *id)
                .filter(|id| !loaded.contains_key(id))
                .collect();
            if !missing.is_empty() {
                for row in self.store.find_by_ids(user_id, &missing).await? {
                    if row.user_id == user_id {
                        loaded.insert(row.id, row);
                    }
                }
            }
            for (id, _) in batch {
                if let Some(row) = loaded.remove(id) {
                    resolved.insert(*id, row);
                }
            }
            cursor = end;
        }

        let by_id: HashMap<InteractionId, Scores> = ranked.into_iter().collect();
        let mut memories: Vec<ScoredInteraction> = resolved
            .into_values()
            .filter_map(|interaction| {
                let s = by_id.get(&interaction.id)?;
                Some(ScoredInteraction {
                    score: s.total(),
                    vector_score: s.vector,
                    keyword_score: s.keyword,
                    interaction,
                })
            })
            .collect();
        memories.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(b.interaction.created_at.cmp(&a.interaction.created_at))
                .then(b.interaction.id.cmp(&a.interaction.id))
        });
        memories.truncate(k);
        Ok(memories)
    }
}
