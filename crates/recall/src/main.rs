// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recall - conversational memory engine.
//!
//! Operator CLI over the memory store: inspect what would be recalled for a
//! query, record exchanges by hand, and manage a user's memory.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod memory;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use recall_config::RecallConfig;
use recall_core::UserId;

/// Recall - conversational memory engine.
#[derive(Parser, Debug)]
#[command(name = "recall", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the default search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the memories recalled for a query.
    Retrieve {
        #[arg(long)]
        user: i64,
        query: String,
        /// Output JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Show the full prompt assembled for a query.
    Prompt {
        #[arg(long)]
        user: i64,
        query: String,
        /// Render a single string instead of chat messages.
        #[arg(long)]
        flat: bool,
    },
    /// Record a completed exchange.
    Record {
        #[arg(long)]
        user: i64,
        input: String,
        response: String,
        /// Model that produced the response.
        #[arg(long, default_value = "unknown")]
        model: String,
        /// Interaction ids recalled for this turn (reinforced when
        /// `writer.used_memory_boost` is set).
        #[arg(long = "used", value_delimiter = ',')]
        used: Vec<i64>,
    },
    /// Show memory counts and the top entities of a user.
    Stats {
        #[arg(long)]
        user: i64,
        #[arg(long, default_value_t = 10)]
        top: usize,
        #[arg(long)]
        json: bool,
    },
    /// Delete every memory of a user.
    Forget {
        #[arg(long)]
        user: i64,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Check the store and the embedding backend.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Validate and print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => recall_config::load_and_validate_path(path),
        None => recall_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            recall_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let result = match cli.command {
        Some(Commands::Retrieve { user, query, json }) => {
            memory::run_retrieve(&config, UserId(user), &query, json).await
        }
        Some(Commands::Prompt { user, query, flat }) => {
            memory::run_prompt(&config, UserId(user), &query, flat).await
        }
        Some(Commands::Record {
            user,
            input,
            response,
            model,
            used,
        }) => memory::run_record(&config, UserId(user), &input, &response, &model, &used).await,
        Some(Commands::Stats { user, top, json }) => {
            memory::run_stats(&config, UserId(user), top, json).await
        }
        Some(Commands::Forget { user, yes }) => {
            if !yes {
                eprintln!("recall: refusing to delete memories of user {user} without --yes");
                std::process::exit(2);
            }
            memory::run_forget(&config, UserId(user)).await
        }
        Some(Commands::Doctor { plain }) => doctor::run_doctor(&config, plain).await,
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("recall: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &RecallConfig) -> Result<(), recall_core::RecallError> {
    let rendered = serde_json::to_string_pretty(config)
        .map_err(|e| recall_core::RecallError::Internal(format!("failed to render config: {e}")))?;
    println!("{rendered}");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "recall={log_level},recall_memory={log_level},recall_storage={log_level},recall_ollama={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
