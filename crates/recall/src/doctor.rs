// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `recall doctor` command implementation.
//!
//! Checks that the memory database opens and that the embedding backend
//! answers. A missing embedder is only a warning: retrieval then runs on
//! keywords alone.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use recall_config::RecallConfig;
use recall_core::{HealthStatus, PluginAdapter, RecallError};
use recall_storage::SqliteMemoryStore;

use crate::memory::open_embedder;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `recall doctor` command.
pub async fn run_doctor(config: &RecallConfig, plain: bool) -> Result<(), RecallError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = vec![
        check_database(config).await,
        check_embedding(config).await,
    ];

    println!();
    println!("  recall doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", format_line(result, use_color));
    }
    println!();

    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    if results.iter().any(|r| r.status == CheckStatus::Fail) {
        return Err(RecallError::Internal("doctor found failing checks".into()));
    }
    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

fn health_to_check(name: &str, health: Result<HealthStatus, RecallError>, start: Instant) -> CheckResult {
    match health {
        Ok(HealthStatus::Healthy) => CheckResult::new(name, CheckStatus::Pass, "healthy", start),
        Ok(HealthStatus::Degraded(reason)) => CheckResult::new(name, CheckStatus::Warn, reason, start),
        Ok(HealthStatus::Unhealthy(reason)) => CheckResult::new(name, CheckStatus::Fail, reason, start),
        Err(e) => CheckResult::new(name, CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_database(config: &RecallConfig) -> CheckResult {
    let start = Instant::now();
    let db_path = &config.storage.database_path;
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first record)"),
            start,
        );
    }
    match SqliteMemoryStore::open(&config.storage).await {
        Ok(store) => {
            let health = store.health_check().await;
            let mut result = health_to_check("Database", health, start);
            if result.status == CheckStatus::Pass {
                result.message = format!("{} v{} at {db_path}", store.name(), store.version());
            }
            if let Err(e) = store.shutdown().await {
                return CheckResult::new("Database", CheckStatus::Warn, format!("checkpoint failed: {e}"), start);
            }
            result
        }
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_embedding(config: &RecallConfig) -> CheckResult {
    let start = Instant::now();
    match open_embedder(config) {
        Ok(Some(embedder)) => {
            let health = embedder.health_check().await;
            let mut result = health_to_check("Embedding", health, start);
            if result.status == CheckStatus::Pass {
                result.message = format!("{} at {}", config.embedding.model, config.embedding.base_url);
            }
            result
        }
        Ok(None) => CheckResult::new(
            "Embedding",
            CheckStatus::Warn,
            "disabled (keyword-only retrieval)",
            start,
        ),
        Err(e) => CheckResult::new("Embedding", CheckStatus::Fail, e.to_string(), start),
    }
}
