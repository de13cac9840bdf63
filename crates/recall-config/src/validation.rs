// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as value ranges, non-empty paths, and known log levels.

use crate::diagnostic::ConfigError;
use crate::model::RecallConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RecallConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail =
        |field: &str, message: String| errors.push(ConfigError::invalid(field, message));

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path", "must not be empty".to_string());
    }

    let embedding = &config.embedding;
    if embedding.enabled {
        let url = embedding.base_url.trim();
        if url.is_empty() {
            fail("embedding.base_url", "must not be empty".to_string());
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(
                "embedding.base_url",
                format!("`{url}` must start with http:// or https://"),
            );
        }
        if embedding.model.trim().is_empty() {
            fail("embedding.model", "must not be empty".to_string());
        }
    }
    if embedding.timeout_ms == 0 {
        fail("embedding.timeout_ms", "must be positive".to_string());
    }

    let retrieval = &config.retrieval;
    if !(0.0..=1.0).contains(&retrieval.blend_alpha) {
        fail(
            "retrieval.blend_alpha",
            format!("must be within [0, 1], got {}", retrieval.blend_alpha),
        );
    }
    if !(retrieval.entity_normalizer > 0.0) {
        fail(
            "retrieval.entity_normalizer",
            format!("must be positive, got {}", retrieval.entity_normalizer),
        );
    }
    if retrieval.top_k < 1 {
        fail("retrieval.top_k", "must be at least 1".to_string());
    }
    if retrieval.candidate_window < 1 {
        fail("retrieval.candidate_window", "must be at least 1".to_string());
    }
    if retrieval.context_budget_chars == 0 {
        fail("retrieval.context_budget_chars", "must be positive".to_string());
    }
    if let Some(threshold) = retrieval.similarity_threshold
        && !(-1.0..=1.0).contains(&threshold)
    {
        fail(
            "retrieval.similarity_threshold",
            format!("must be within [-1, 1], got {threshold}"),
        );
    }

    let writer = &config.writer;
    for (name, value) in [
        ("decay_rate", writer.decay_rate),
        ("boost_rate", writer.boost_rate),
        ("used_memory_boost", writer.used_memory_boost),
    ] {
        if !(value >= 0.0) {
            fail(&format!("writer.{name}"), format!("must be non-negative, got {value}"));
        }
    }
    if let Some(floor) = writer.score_floor
        && !floor.is_finite()
    {
        fail("writer.score_floor", format!("must be a finite number, got {floor}"));
    }

    if config.context.budget_chars == 0 {
        fail("context.budget_chars", "must be positive".to_string());
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(
            "logging.level",
            format!(
                "`{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { field, .. } if field == needle))
    }

    #[test]
    fn default_config_validates() {
        let config = RecallConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = RecallConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "storage.database_path"));
    }

    #[test]
    fn alpha_out_of_range_fails_validation() {
        let mut config = RecallConfig::default();
        config.retrieval.blend_alpha = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "retrieval.blend_alpha"));
    }

    #[test]
    fn boundary_alphas_are_accepted() {
        let mut config = RecallConfig::default();
        config.retrieval.blend_alpha = 0.0;
        assert!(validate_config(&config).is_ok());
        config.retrieval.blend_alpha = 1.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_normalizer_fails_validation() {
        let mut config = RecallConfig::default();
        config.retrieval.entity_normalizer = 0.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "retrieval.entity_normalizer"));
    }

    #[test]
    fn negative_rates_fail_validation() {
        let mut config = RecallConfig::default();
        config.writer.decay_rate = -0.05;
        config.writer.boost_rate = -1.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "writer.decay_rate"));
        assert!(has_error(&errors, "writer.boost_rate"));
    }

    #[test]
    fn disabled_embedding_skips_url_checks() {
        let mut config = RecallConfig::default();
        config.embedding.enabled = false;
        config.embedding.base_url = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_url_scheme_fails_validation() {
        let mut config = RecallConfig::default();
        config.embedding.base_url = "localhost:11434".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "embedding.base_url"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = RecallConfig::default();
        config.logging.level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "logging.level"));
    }

    #[test]
    fn parsed_toml_with_bad_values_fails_validation() {
        let toml_str = r#"
[retrieval]
blend_alpha = -0.1
entity_normalizer = 0.0

[writer]
used_memory_boost = -0.5
"#;
        let config: RecallConfig = toml::from_str(toml_str).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "retrieval.blend_alpha"));
        assert!(has_error(&errors, "retrieval.entity_normalizer"));
        assert!(has_error(&errors, "writer.used_memory_boost"));
    }

    #[test]
    fn parsed_toml_threshold_out_of_range_fails_validation() {
        let toml_str = r#"
[retrieval]
similarity_threshold = 1.5
"#;
        let config: RecallConfig = toml::from_str(toml_str).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "retrieval.similarity_threshold"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = RecallConfig::default();
        config.retrieval.top_k = 0;
        config.embedding.timeout_ms = 0;
        config.context.budget_chars = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
