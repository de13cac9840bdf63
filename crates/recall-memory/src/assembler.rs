// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly from the preamble, recalled memories and short-term
//! history.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use recall_config::model::ContextConfig;
use recall_core::{Interaction, InteractionId, MemoryStore, UserId};
use serde::Serialize;
use strum::{Display, EnumString};
use tracing::warn;

use crate::retriever::{fit_to_budget, render_fragment, HybridRetriever, Retrieval};

/// Header of the memory block inside the system message.
pub const CONTEXT_HEADER: &str = "Relevant context from memory:";

/// Chat role of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A prompt ready for a chat-style generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledPrompt {
    /// Preamble plus the optional time line, without recalled memories.
    pub preamble: String,
    /// Rendered memory fragments, one per line. Empty when nothing was
    /// recalled.
    pub recalled_context: String,
    /// History exchanges in chronological order, then the current query.
    pub messages: Vec<PromptMessage>,
    /// Interactions whose fragments made it into `recalled_context`.
    pub used_interaction_ids: BTreeSet<InteractionId>,
}

impl AssembledPrompt {
    /// The full system message.
    pub fn system_prompt(&self) -> String {
        if self.recalled_context.is_empty() {
            self.preamble.clone()
        } else {
            format!(
                "{}\n\n{CONTEXT_HEADER}\n{}",
                self.preamble, self.recalled_context
            )
        }
    }

    /// System message followed by `messages`.
    pub fn chat_messages(&self) -> Vec<PromptMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        out.push(PromptMessage::new(Role::System, self.system_prompt()));
        out.extend(self.messages.iter().cloned());
        out
    }

    /// Single-string rendering for generation backends without chat roles.
    pub fn to_prompt_text(&self) -> String {
        let mut text = self.preamble.clone();
        if !self.recalled_context.is_empty() {
            text.push_str("\n\n---RECALLED CONTEXT---\n");
            text.push_str(&self.recalled_context);
            text.push_str("\n---END CONTEXT---");
        }
        let Some((query, history)) = self.messages.split_last() else {
            return text;
        };
        if !history.is_empty() {
            text.push('\n');
            for message in history {
                let speaker = match message.role {
                    Role::Assistant => "Assistant",
                    Role::System => "System",
                    Role::User => "User",
                };
                text.push_str(&format!("\n{speaker}: {}", message.content));
            }
        }
        text.push_str(&format!("\n\nUser query: \"{}\"", query.content));
        text
    }
}

/// Builds prompts for one turn. Never fails: a broken store or embedder
/// only shrinks the prompt.
#[derive(Clone)]
pub struct ContextAssembler {
    store: Arc<dyn MemoryStore>,
    retriever: Arc<HybridRetriever>,
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        retriever: Arc<HybridRetriever>,
        config: ContextConfig,
    ) -> Self {
        Self {
            store,
            retriever,
            config,
        }
    }

    pub async fn assemble(&self, user_id: UserId, query: &str) -> AssembledPrompt {
        let retrieval = match self.retriever.retrieve(user_id, query).await {
            Ok(retrieval) => retrieval,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "retrieval failed, assembling without memories");
                Retrieval::default()
            }
        };

        let history = if self.config.history_depth == 0 {
            Vec::new()
        } else {
            match self
                .store
                .find_recent(user_id, self.config.history_depth, false)
                .await
            {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "history unavailable, assembling without it");
                    Vec::new()
                }
            }
        };

        self.build(query, &retrieval, &history, Utc::now())
    }

    /// Characters left for fragments once the preamble and the context
    /// header are counted against `budget_chars`.
    fn fragment_budget(&self, preamble: &str) -> usize {
        let overhead =
            preamble.chars().count() + "\n\n".len() + CONTEXT_HEADER.len() + "\n".len();
        self.config.budget_chars.saturating_sub(overhead)
    }

    /// Assembles from already-fetched parts. `history` is newest first.
    ///
    /// The system message stays within `budget_chars` unless the preamble
    /// alone exceeds it, in which case no memories are included.
    pub fn build(
        &self,
        query: &str,
        retrieval: &Retrieval,
        history: &[Interaction],
        now: DateTime<Utc>,
    ) -> AssembledPrompt {
        let mut preamble = self.config.system_preamble.clone();
        if self.config.include_current_time {
            preamble.push_str(&format!(
                "\nCURRENT_TIME: {}",
                now.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }

        let fragments: Vec<String> = retrieval
            .memories
            .iter()
            .map(|m| render_fragment(&m.interaction))
            .collect();
        let fitted = fit_to_budget(&fragments, self.fragment_budget(&preamble));
        let recalled_context = fragments[..fitted].join("\n");
        let used_interaction_ids = retrieval.memories[..fitted]
            .iter()
            .map(|m| m.interaction.id)
            .collect();

        let mut messages = Vec::with_capacity(history.len() * 2 + 1);
        for past in history.iter().rev() {
            messages.push(PromptMessage::new(Role::User, past.user_input.clone()));
            messages.push(PromptMessage::new(Role::Assistant, past.ai_response.clone()));
        }
        messages.push(PromptMessage::new(Role::User, query));

        AssembledPrompt {
            preamble,
            recalled_context,
            messages,
            used_interaction_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingChannel;
    use crate::keywords::KeywordExtractor;
    use crate::retriever::ScoredInteraction;
    use recall_config::model::RetrievalConfig;
    use recall_test_utils::InMemoryStore;

    fn interaction(id: i64, input: &str, response: &str) -> Interaction {
        Interaction {
            id: InteractionId(id),
            user_id: UserId(1),
            prompt_hash: String::new(),
            user_input: input.into(),
            ai_response: response.into(),
            model_name: "llama3".into(),
            embedding: None,
            keywords: BTreeSet::new(),
            relevance_score: 1.0,
            created_at: Utc::now(),
        }
    }

    fn scored(id: i64, input: &str, response: &str, score: f64) -> ScoredInteraction {
        ScoredInteraction {
            interaction: interaction(id, input, response),
            score,
            vector_score: 0.0,
            keyword_score: score,
        }
    }

    fn assembler(store: Arc<InMemoryStore>, config: ContextConfig) -> ContextAssembler {
        let retriever = Arc::new(HybridRetriever::new(
            store.clone(),
            EmbeddingChannel::disabled(),
            KeywordExtractor::default(),
            RetrievalConfig::default(),
        ));
        ContextAssembler::new(store, retriever, config)
    }

    #[test]
    fn role_names_are_lowercase() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
    }

    #[test]
    fn build_without_memories_is_preamble_plus_query() {
        let a = assembler(Arc::new(InMemoryStore::new()), ContextConfig::default());
        let prompt = a.build("hello", &Retrieval::default(), &[], Utc::now());
        assert_eq!(prompt.system_prompt(), ContextConfig::default().system_preamble);
        assert_eq!(prompt.messages, vec![PromptMessage::new(Role::User, "hello")]);
        assert!(prompt.used_interaction_ids.is_empty());
        assert!(!prompt.to_prompt_text().contains("RECALLED CONTEXT"));
    }

    #[test]
    fn memories_and_history_are_laid_out_in_order() {
        let a = assembler(Arc::new(InMemoryStore::new()), ContextConfig::default());
        let retrieval = Retrieval {
            memories: vec![scored(1, "What is the capital of Kenya?", "Nairobi.", 0.3)],
            ..Retrieval::default()
        };
        // Newest first, as the store returns them.
        let history = vec![interaction(3, "second", "two"), interaction(2, "first", "one")];
        let prompt = a.build("Tell me more about Kenya", &retrieval, &history, Utc::now());

        assert!(prompt.system_prompt().contains(CONTEXT_HEADER));
        assert!(prompt
            .system_prompt()
            .contains("- User asked: \"What is the capital of Kenya?\". You answered: \"Nairobi.\""));
        let roles: Vec<_> = prompt.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(prompt.messages[0].content, "first");
        assert_eq!(prompt.messages[3].content, "two");
        assert_eq!(prompt.messages[4].content, "Tell me more about Kenya");
        assert_eq!(prompt.used_interaction_ids, [InteractionId(1)].into());
        assert_eq!(prompt.chat_messages()[0].role, Role::System);
    }

    #[test]
    fn lowest_scored_fragments_are_dropped_first() {
        let config = ContextConfig {
            budget_chars: 200,
            ..ContextConfig::default()
        };
        let a = assembler(Arc::new(InMemoryStore::new()), config);
        let retrieval = Retrieval {
            memories: vec![
                scored(1, "best question here", "best answer here", 0.9),
                scored(2, "worse question here", "worse answer here", 0.1),
            ],
            ..Retrieval::default()
        };
        let prompt = a.build("q", &retrieval, &[], Utc::now());
        assert_eq!(prompt.used_interaction_ids, [InteractionId(1)].into());
        assert!(prompt.recalled_context.contains("best"));
        assert!(!prompt.recalled_context.contains("worse"));
    }

    #[test]
    fn system_prompt_stays_within_budget() {
        let now = DateTime::parse_from_rfc3339("2026-03-01T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let retrieval = Retrieval {
            memories: vec![
                scored(1, &"kenya ".repeat(20), "Nairobi is the capital.", 0.9),
                scored(2, "safari season", "June to October.", 0.5),
                scored(3, "coffee", "Kenyan AA.", 0.2),
            ],
            ..Retrieval::default()
        };
        for budget in (0..=400).step_by(7) {
            let config = ContextConfig {
                budget_chars: budget,
                include_current_time: true,
                ..ContextConfig::default()
            };
            let a = assembler(Arc::new(InMemoryStore::new()), config);
            let prompt = a.build("q", &retrieval, &[], now);
            let preamble_len = prompt.preamble.chars().count();
            if budget >= preamble_len {
                assert!(
                    prompt.system_prompt().chars().count() <= budget,
                    "budget {budget}: {} chars",
                    prompt.system_prompt().chars().count()
                );
            } else {
                assert!(prompt.recalled_context.is_empty());
            }
            assert_eq!(
                prompt.used_interaction_ids.len(),
                prompt.recalled_context.lines().count()
            );
        }
    }

    #[test]
    fn oversized_fragment_is_left_out() {
        let config = ContextConfig {
            budget_chars: 200,
            ..ContextConfig::default()
        };
        let a = assembler(Arc::new(InMemoryStore::new()), config);
        let long_input = "what should I pack for a two week safari in the Maasai Mara next month";
        let retrieval = Retrieval {
            memories: vec![scored(1, long_input, "Light layers, a hat and binoculars.", 0.9)],
            ..Retrieval::default()
        };
        let prompt = a.build("q", &retrieval, &[], Utc::now());
        assert!(prompt.recalled_context.is_empty());
        assert!(prompt.used_interaction_ids.is_empty());
        assert!(prompt.system_prompt().chars().count() <= 200);
    }

    #[test]
    fn current_time_line_is_optional() {
        let now = DateTime::parse_from_rfc3339("2026-03-01T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let a = assembler(Arc::new(InMemoryStore::new()), ContextConfig::default());
        assert!(!a.build("q", &Retrieval::default(), &[], now).preamble.contains("CURRENT_TIME"));

        let config = ContextConfig {
            include_current_time: true,
            ..ContextConfig::default()
        };
        let a = assembler(Arc::new(InMemoryStore::new()), config);
        let prompt = a.build("q", &Retrieval::default(), &[], now);
        assert!(prompt.preamble.ends_with("\nCURRENT_TIME: 2026-03-01 08:30:00 UTC"));
    }

    #[test]
    fn flat_rendering_uses_delimiters() {
        let a = assembler(Arc::new(InMemoryStore::new()), ContextConfig::default());
        let retrieval = Retrieval {
            memories: vec![scored(1, "capital of Kenya?", "Nairobi.", 0.3)],
            ..Retrieval::default()
        };
        let history = vec![interaction(1, "capital of Kenya?", "Nairobi.")];
        let text = a.build("more", &retrieval, &history, Utc::now()).to_prompt_text();
        let expected = format!(
            "{}\n\n---RECALLED CONTEXT---\n- User asked: \"capital of Kenya?\". You answered: \"Nairobi.\"\n---END CONTEXT---\n\nUser: capital of Kenya?\nAssistant: Nairobi.\n\nUser query: \"more\"",
            ContextConfig::default().system_preamble
        );
        assert_eq!(text, expected);
    }

    #[tokio::test]
    async fn broken_store_still_yields_a_prompt() {
        let store = Arc::new(InMemoryStore::new());
        store.set_fail_reads(true);
        let prompt = assembler(store, ContextConfig::default())
            .assemble(UserId(1), "Tell me about Kenya")
            .await;
        assert!(prompt.recalled_context.is_empty());
        assert_eq!(prompt.messages.len(), 1);
    }
}
