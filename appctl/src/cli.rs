//! CLI argument definitions for appctl.
//!
//! Separated from `main.rs` so that library code (e.g.,
//! `pipeline::ExecutionPlan::from_global`) and shell completion generation can
//! reference these types.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;

#[derive(Debug, Parser)]
#[command(name = "appctl")]
#[command(about = "Validate, normalize and deploy app configurations")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options accepted by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Directory of the app
    #[arg(long, global = true, default_value = ".")]
    pub path: PathBuf,

    /// Name of the app configuration (`shopify.app.<name>.toml`)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    /// Show what would be done without making changes
    #[arg(long, short = 'n', global = true)]
    pub dry_run: bool,

    /// Reject webhook subscriptions the platform would still accept
    ///
    /// Checks that top-level topics have an endpoint and that every
    /// subscription resolves to one.
    #[arg(long, global = true)]
    pub strict_webhooks: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check the app configuration, web processes and extensions
    Validate(commands::validate::ValidateArgs),

    /// Print normalized webhook subscriptions as JSON
    Webhooks(commands::webhooks::WebhooksArgs),

    /// Upload a new app version
    ///
    /// Builds extensions, uploads functions and the extension bundle,
    /// and submits declarative webhook subscriptions.
    Deploy(commands::deploy::DeployArgs),

    /// Work with extension drafts
    Draft(commands::draft::DraftArgs),

    /// Generate JSON schemas for configuration files
    Schema(commands::schema::SchemaArgs),

    /// Generate shell completions
    Completions(commands::completions::CompletionsArgs),
}
