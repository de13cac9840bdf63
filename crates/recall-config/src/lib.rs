// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Recall memory engine.
//!
//! `recall.toml` is merged over compiled defaults, then `RECALL_*` environment
//! variables are applied on top. Unknown keys are rejected and every error
//! is reported as a miette diagnostic.
//!
//! ```no_run
//! let config = recall_config::load_and_validate().expect("config errors");
//! println!("top_k: {}", config.retrieval.top_k);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, render_to_string, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::RecallConfig;

/// Loads the layered configuration and validates it.
pub fn load_and_validate() -> Result<RecallConfig, Vec<ConfigError>> {
    checked(loader::load_config(), || {
        loader::search_paths()
            .iter()
            .filter_map(|path| read_source(path))
            .collect()
    })
}

/// Loads `path` plus environment overrides and validates the result.
pub fn load_and_validate_path(path: &Path) -> Result<RecallConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Parses `toml_content` alone and validates the result.
pub fn load_and_validate_str(toml_content: &str) -> Result<RecallConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validates an extracted config, or turns the figment error into
/// diagnostics. `sources` is only read on failure.
fn checked(
    extracted: Result<RecallConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<RecallConfig, Vec<ConfigError>> {
    match extracted {
        Ok(config) => validation::validate_config(&config).map(|()| config),
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Reads a config file for span lookup, keyed the way figment names it.
fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    let display = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    Some((display.display().to_string(), content))
}
