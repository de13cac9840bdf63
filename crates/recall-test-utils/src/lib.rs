// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Recall integration tests.
//!
//! Provides mock adapters for fast, deterministic, CI-runnable tests
//! without an embedding server or a database file.
//!
//! # Components
//!
//! - [`MockEmbedder`] - hashed bag-of-words embedder with failing and hanging modes
//! - [`InMemoryStore`] - `MemoryStore` over plain collections with failure injection

pub mod memory_store;
pub mod mock_embedder;

pub use memory_store::InMemoryStore;
pub use mock_embedder::{EmbedMode, MockEmbedder, DEFAULT_DIMENSION};
