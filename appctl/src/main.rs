use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use appctl::commands;
use appctl::pipeline;
use appctl::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing with RUST_LOG env filter
    // e.g., RUST_LOG=appctl=debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Cli { global, command } = Cli::parse();

    // Completions and schemas need neither an app nor settings
    let command = match command {
        Commands::Schema(args) => return commands::schema::run(args),
        Commands::Completions(args) => return commands::completions::run(args),
        other => other,
    };

    let plan = pipeline::ExecutionPlan::from_global(&global)?;
    tracing::debug!(
        app_dir = %plan.app_dir.display(),
        config = ?plan.config_name,
        dry_run = plan.dry_run,
        rules = ?plan.settings.subscription_rules,
        "Execution plan created"
    );

    match command {
        Commands::Validate(args) => commands::validate::run(args, &plan),
        Commands::Webhooks(args) => commands::webhooks::run(args, &plan),
        Commands::Deploy(args) => commands::deploy::run(args, &plan),
        Commands::Draft(args) => commands::draft::run(args, &plan),
        Commands::Schema(_) | Commands::Completions(_) => Ok(()),
    }
}
