//! Deploy command implementation.

use anyhow::Result;
use clap::Args;

use crate::deploy::{DeployOptions, DeployOutcome, Deployer, result_message};
use crate::output::Output;
use crate::pipeline::ExecutionPlan;
use crate::prompt::CliclackPrompter;

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Deploy without asking for confirmation
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Create a version without releasing it to users
    #[arg(long)]
    pub no_release: bool,

    /// Optional message describing the version
    #[arg(long)]
    pub message: Option<String>,

    /// Optional version name, generated when omitted
    #[arg(long)]
    pub version: Option<String>,

    /// URL of the commit this version was built from
    #[arg(long)]
    pub source_control_url: Option<String>,
}

impl From<DeployArgs> for DeployOptions {
    fn from(args: DeployArgs) -> Self {
        Self {
            force: args.force,
            no_release: args.no_release,
            message: args.message,
            version: args.version,
            source_control_url: args.source_control_url,
        }
    }
}

pub fn run(args: DeployArgs, plan: &ExecutionPlan) -> Result<()> {
    let options = DeployOptions::from(args);
    let app = plan.load_app()?;
    let api = plan.partners_client()?;

    let spinner = (!plan.dry_run && options.force).then(|| Output::spinner("Deploying..."));
    let outcome = Deployer {
        api: &api,
        runner: plan.runner(),
        prompter: &CliclackPrompter,
    }
    .run(&app, &options, plan.settings.subscription_rules, plan.dry_run);
    if let Some(spinner) = spinner {
        spinner.finish_clear();
    }

    match outcome? {
        DeployOutcome::Cancelled => Output::info("Deploy cancelled"),
        DeployOutcome::Planned(summary) => {
            Output::dry_run("No changes made");
            print!("{summary}");
        }
        DeployOutcome::Deployed(result) => {
            tracing::debug!(operations = result.report.success_count(), "deploy finished");
            Output::message(&result_message(&result.upload, &options, app.package_manager));
        }
    }
    Ok(())
}
