//! `appctl draft push`: build every extension and push it as a draft.

use anyhow::{Context, Result};
use appctl_common::{DeployContext, ExtensionInstance};
use std::fs;
use std::path::PathBuf;

use crate::command_runner::{CommandOptions, run_command_line};
use crate::error::AppctlError;
use crate::identifiers::{EnvFile, find_registration};
use crate::package_manager::PackageManager;
use crate::plan::{
    ExecuteContext, ExecutionReport, Operation, Plan, PlanContext, PlanSummary, Plannable, Verb,
};

#[derive(Debug, Clone, Default)]
pub struct DraftOptions {
    pub enable_developer_preview: bool,
}

pub struct DraftPushCommand<'a> {
    options: &'a DraftOptions,
}

impl<'a> DraftPushCommand<'a> {
    pub fn new(options: &'a DraftOptions) -> Self {
        Self { options }
    }
}

/// An extension and the id of the registration its draft belongs to.
#[derive(Debug, Clone)]
pub struct DraftTarget {
    pub extension: ExtensionInstance,
    pub registration_id: String,
}

#[derive(Debug, Clone)]
pub struct DraftPlan {
    api_key: String,
    app_dir: PathBuf,
    package_manager: PackageManager,
    targets: Vec<DraftTarget>,
    enable_developer_preview: bool,
}

impl Plannable for DraftPushCommand<'_> {
    type Plan = DraftPlan;

    fn plan(&self, ctx: &PlanContext<'_>) -> Result<DraftPlan> {
        let app = ctx.app();
        let api_key = app.api_key()?;

        let mut targets = Vec::new();
        if !app.extensions.is_empty() {
            let registrations = ctx.api().app_extension_registrations(&api_key)?;
            let env = EnvFile::load(&app.directory)?;
            for extension in &app.extensions {
                let remote = find_registration(
                    extension,
                    env.extension_uuid(extension),
                    &registrations.extension_registrations,
                )
                .ok_or_else(|| AppctlError::MissingRegistration {
                    handle: extension.handle(),
                })?;
                targets.push(DraftTarget {
                    extension: extension.clone(),
                    registration_id: remote.id.clone(),
                });
            }
        }

        Ok(DraftPlan {
            api_key,
            app_dir: app.directory.clone(),
            package_manager: app.package_manager,
            targets,
            enable_developer_preview: self.options.enable_developer_preview,
        })
    }
}

impl DraftPlan {
    fn javy_check(&self) -> Vec<String> {
        self.package_manager.exec_args("javy", &["--version"])
    }
}

impl Plan for DraftPlan {
    type Outcome = ExecutionReport;

    fn describe(&self) -> PlanSummary {
        let mut summary = PlanSummary::new(format!(
            "Draft push: {} extension(s)",
            self.targets.len()
        ));
        for target in &self.targets {
            let extension = &target.extension;
            let name = format!("extension:{}", extension.handle());
            if extension.is_javascript_function() {
                summary.add_operation(Operation::with_details(
                    Verb::Check,
                    "javy",
                    format!("{} {}", self.package_manager, self.javy_check().join(" ")),
                ));
            }
            match extension.build_command() {
                Some(command) => {
                    summary.add_operation(Operation::with_details(Verb::Build, &name, command))
                }
                None => summary.add_operation(Operation::with_details(
                    Verb::Skip,
                    &name,
                    "no build command",
                )),
            }
            summary.add_operation(Operation::with_details(
                Verb::Update,
                &name,
                format!("registration {}", target.registration_id),
            ));
        }
        if self.enable_developer_preview {
            summary.add_operation(Operation::new(Verb::Enable, "developer preview"));
        }
        summary
    }

    fn execute(self, ctx: &mut ExecuteContext<'_>) -> Result<ExecutionReport> {
        let api = ctx.api();
        let runner = ctx.runner();
        let mut report = ExecutionReport::new();

        for target in &self.targets {
            let extension = &target.extension;
            let handle = extension.handle();
            let name = format!("extension:{handle}");

            if extension.is_javascript_function() {
                let args = self.javy_check();
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                let status = runner.run_status(
                    self.package_manager.as_str(),
                    &args,
                    &CommandOptions::with_cwd(&self.app_dir),
                )?;
                if !status.success() {
                    return Err(AppctlError::CommandFailed {
                        command: format!("{} {}", self.package_manager, args.join(" ")),
                        status: status.to_string(),
                    }
                    .into());
                }
                report.record_success(Verb::Check, "javy");
            }

            if let Some(command) = extension.build_command() {
                run_command_line(runner, command, &CommandOptions::with_cwd(&extension.directory))
                    .with_context(|| format!("Failed to build {handle}"))?;
                report.record_success(Verb::Build, &name);
            }

            let module_id = if extension.is_function() {
                let output = extension.output_path();
                let wasm = fs::read(&output)
                    .with_context(|| format!("Failed to read {}", output.display()))?;
                Some(api.upload_function(&self.api_key, &handle, &wasm)?)
            } else {
                None
            };
            let config = extension.deploy_config(&DeployContext {
                api_key: &self.api_key,
                module_id: module_id.as_deref(),
            })?;
            api.update_extension_draft(&self.api_key, &target.registration_id, &config)?;
            tracing::info!(%handle, registration = %target.registration_id, "pushed draft");
            report.record_success(Verb::Update, &name);
        }

        if self.enable_developer_preview {
            api.enable_developer_preview(&self.api_key)?;
            report.record_success(Verb::Enable, "developer preview");
        }

        Ok(report)
    }

    fn is_empty(&self) -> bool {
        self.targets.is_empty() && !self.enable_developer_preview
    }
}
