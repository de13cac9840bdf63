// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama embedding adapter.
//!
//! Talks to `POST /api/embed` and implements [`recall_core::EmbeddingAdapter`].

pub mod client;
pub mod types;

pub use client::OllamaEmbedder;
