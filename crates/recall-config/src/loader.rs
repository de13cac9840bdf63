// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./recall.toml` > `~/.config/recall/recall.toml` > `/etc/recall/recall.toml`
//! with environment variable overrides via `RECALL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RecallConfig;

/// Top-level sections, used to map `RECALL_<SECTION>_<KEY>` env vars.
const SECTIONS: &[&str] = &[
    "storage",
    "embedding",
    "retrieval",
    "writer",
    "keywords",
    "context",
    "logging",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/recall/recall.toml` (system-wide)
/// 3. `~/.config/recall/recall.toml` (user XDG config)
/// 4. `./recall.toml` (local directory)
/// 5. `RECALL_*` environment variables
pub fn load_config() -> Result<RecallConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<RecallConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RecallConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RecallConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RecallConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    search_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(RecallConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Candidate config files, lowest precedence first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/recall/recall.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("recall").join("recall.toml"));
    }
    paths.push(PathBuf::from("recall.toml"));
    paths
}

/// Map a prefix-stripped env var name to a dotted config path.
///
/// Matching is case-insensitive and the result is lowercase. Only the leading section is split off, so `retrieval_context_budget_chars`
/// becomes `retrieval.context_budget_chars` and never `retrieval.context.budget_chars`.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

/// Environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `RECALL_WRITER_DECAY_RATE` must map to `writer.decay_rate`.
fn env_provider() -> Env {
    Env::prefixed("RECALL_").map(|key| map_env_key(key.as_str()).into())
}
