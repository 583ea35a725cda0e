//! Print the app's webhook subscriptions in normalized form.

use anyhow::Result;
use appctl_common::normalize_subscriptions;
use clap::Args;

use crate::pipeline::ExecutionPlan;

#[derive(Debug, Args)]
pub struct WebhooksArgs {
    /// Skip validation before normalizing
    #[arg(long)]
    pub no_validate: bool,
}

pub fn run(args: WebhooksArgs, plan: &ExecutionPlan) -> Result<()> {
    let app = plan.load_app()?;
    if !args.no_validate {
        app.validate(plan.settings.subscription_rules)?;
    }

    let Some(webhooks) = app.configuration.webhooks() else {
        tracing::warn!("app configuration has no [webhooks] section");
        println!("[]");
        return Ok(());
    };

    let subscriptions = normalize_subscriptions(webhooks);
    tracing::debug!(count = subscriptions.len(), "normalized subscriptions");
    println!("{}", serde_json::to_string_pretty(&subscriptions)?);
    Ok(())
}
