//! Validate command implementation.
//!
//! Loads the app and reports every configuration issue in one pass.

use anyhow::Result;
use appctl_common::{Issue, ValidationErrors, app_is_launchable};
use clap::Args;
use serde::Serialize;

use crate::error::AppctlError;
use crate::loader::LoadedApp;
use crate::output::Output;
use crate::pipeline::ExecutionPlan;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    valid: bool,
    configuration: String,
    extensions: usize,
    webs: usize,
    launchable: bool,
    issues: Vec<Issue>,
}

impl ValidationReport {
    fn new(app: &LoadedApp, issues: Vec<Issue>) -> Self {
        Self {
            valid: issues.is_empty(),
            configuration: app.configuration_path.display().to_string(),
            extensions: app.extensions.len(),
            webs: app.webs.len(),
            launchable: app_is_launchable(&app.webs),
            issues,
        }
    }
}

pub fn run(args: ValidateArgs, plan: &ExecutionPlan) -> Result<()> {
    let app = plan.load_app()?;
    let issues = app.issues(plan.settings.subscription_rules);
    tracing::debug!(count = issues.len(), "validation finished");
    let report = ValidationReport::new(&app, issues);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.valid {
        Output::success(format!("{} is valid", report.configuration));
        Output::kv("Extensions", report.extensions.to_string());
        Output::kv("Webs", report.webs.to_string());
        Output::kv("Launchable", if report.launchable { "yes" } else { "no" });
        if !report.launchable && report.webs > 0 {
            Output::warning("No web process has the frontend or backend role");
        }
    }

    if report.valid {
        Ok(())
    } else {
        Err(AppctlError::ValidationFailed(ValidationErrors::new(report.issues)).into())
    }
}
