// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational memory for Recall.
//!
//! Stores past exchanges, recalls the relevant ones for a new query through
//! a blend of vector similarity and keyword entities, and assembles them
//! into a bounded prompt. Memory is an enhancement: every read path degrades
//! instead of failing, and only a lost write is reported to the caller.

pub mod assembler;
pub mod embedding;
pub mod engine;
pub mod entity_index;
pub mod keywords;
pub mod recording;
pub mod retriever;
pub mod writer;

pub use assembler::{AssembledPrompt, ContextAssembler, PromptMessage, Role};
pub use embedding::EmbeddingChannel;
pub use engine::{MemoryEngine, UserMemory};
pub use entity_index::EntityIndex;
pub use keywords::KeywordExtractor;
pub use retriever::{HybridRetriever, Retrieval, ScoredInteraction};
pub use writer::{MemoryWriter, UserGuard, UserLocks};
