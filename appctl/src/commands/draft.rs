//! Draft command implementation.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::draft::{DraftOptions, DraftPushCommand};
use crate::output::Output;
use crate::pipeline::ExecutionPlan;
use crate::plan::{ExecuteContext, Plan, PlanContext, Plannable};

#[derive(Debug, Args)]
pub struct DraftArgs {
    #[command(subcommand)]
    pub action: DraftAction,
}

#[derive(Debug, Subcommand)]
pub enum DraftAction {
    /// Build every extension and push it as a draft
    Push {
        /// Turn on development store preview for the app
        #[arg(long)]
        enable_developer_preview: bool,
    },
}

pub fn run(args: DraftArgs, plan: &ExecutionPlan) -> Result<()> {
    match args.action {
        DraftAction::Push {
            enable_developer_preview,
        } => push(
            DraftOptions {
                enable_developer_preview,
            },
            plan,
        ),
    }
}

fn push(options: DraftOptions, plan: &ExecutionPlan) -> Result<()> {
    let app = plan.load_app()?;
    app.validate(plan.settings.subscription_rules)?;
    let api = plan.partners_client()?;

    let draft = DraftPushCommand::new(&options).plan(&PlanContext::new(&app, &api))?;
    if draft.is_empty() {
        Output::info("No extensions to push");
        return Ok(());
    }
    if plan.dry_run {
        Output::dry_run("No changes made");
        print!("{}", draft.describe());
        return Ok(());
    }

    let report = draft.execute(&mut ExecuteContext::new(plan.runner(), &api))?;
    print!("{report}");
    if options.enable_developer_preview {
        Output::success("Developer preview enabled");
    }
    Ok(())
}
