//! Planning and executing a version upload.

use anyhow::{Context, Result};
use appctl_common::{
    BundleEntry, DeployContext, ExtensionInstance, NormalizedSubscription, create_bundle,
    normalize_subscriptions,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use super::summary::SourceSummary;
use crate::command_runner::{CommandOptions, run_command_line};
use crate::error::AppctlError;
use crate::identifiers::EnvFile;
use crate::partners::{AppBetas, AppModule, BundleUpload, NewExtension, UploadResult};
use crate::plan::{
    ExecuteContext, ExecutionReport, Operation, Plan, PlanContext, PlanSummary, Plannable, Verb,
};

pub const BUNDLE_DIRECTORY: &str = ".shopify";
pub const BUNDLE_FILE: &str = "bundle.zip";

/// Flags of `appctl deploy`.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub force: bool,
    pub no_release: bool,
    pub message: Option<String>,
    pub version: Option<String>,
    pub source_control_url: Option<String>,
}

pub struct DeployCommand<'a> {
    options: &'a DeployOptions,
    summary: &'a SourceSummary,
    betas: &'a AppBetas,
}

impl<'a> DeployCommand<'a> {
    pub fn new(options: &'a DeployOptions, summary: &'a SourceSummary, betas: &'a AppBetas) -> Self {
        Self {
            options,
            summary,
            betas,
        }
    }
}

/// A local extension and its registration uuid, when it has one.
#[derive(Debug, Clone)]
pub struct PlannedExtension {
    pub extension: ExtensionInstance,
    pub uuid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeployPlan {
    api_key: String,
    app_dir: PathBuf,
    bundle_path: PathBuf,
    extensions: Vec<PlannedExtension>,
    extension_ids: BTreeMap<String, String>,
    webhooks: Option<Vec<NormalizedSubscription>>,
    release: bool,
    message: Option<String>,
    version: Option<String>,
    commit_reference: Option<String>,
}

/// What a deploy left behind.
#[derive(Debug, Clone)]
pub struct DeployResult {
    pub upload: UploadResult,
    pub report: ExecutionReport,
}

impl Plannable for DeployCommand<'_> {
    type Plan = DeployPlan;

    fn plan(&self, ctx: &PlanContext<'_>) -> Result<DeployPlan> {
        let app = ctx.app();
        let extensions = app
            .extensions
            .iter()
            .map(|extension| PlannedExtension {
                uuid: self.summary.identifiers.get(&extension.handle()).cloned(),
                extension: extension.clone(),
            })
            .collect();

        let webhooks = match app.configuration.webhooks() {
            Some(config) if self.betas.declarative_webhooks && config.declares_subscriptions() => {
                Some(normalize_subscriptions(config))
            }
            _ => None,
        };

        Ok(DeployPlan {
            api_key: app.api_key()?,
            app_dir: app.directory.clone(),
            bundle_path: app.directory.join(BUNDLE_DIRECTORY).join(BUNDLE_FILE),
            extensions,
            extension_ids: self.summary.extension_ids.clone(),
            webhooks,
            release: !self.options.no_release,
            message: self.options.message.clone(),
            version: self.options.version.clone(),
            commit_reference: self.options.source_control_url.clone(),
        })
    }
}

impl DeployPlan {
    fn bundles_extensions(&self) -> bool {
        self.extensions.iter().any(|p| !p.extension.is_function())
    }
}

impl Plan for DeployPlan {
    type Outcome = DeployResult;

    fn describe(&self) -> PlanSummary {
        let mut summary = PlanSummary::new(format!(
            "Deploy: {} extension(s)",
            self.extensions.len()
        ));

        for planned in &self.extensions {
            let extension = &planned.extension;
            let target = format!("extension:{}", extension.handle());
            if planned.uuid.is_none() {
                summary.add_operation(Operation::with_details(
                    Verb::Create,
                    &target,
                    extension.extension_type(),
                ));
            }
            if let Some(command) = extension.build_command() {
                summary.add_operation(Operation::with_details(Verb::Build, &target, command));
            }
            if extension.is_function() {
                summary.add_operation(Operation::with_details(
                    Verb::Upload,
                    format!("function:{}", extension.handle()),
                    extension.output_path().display().to_string(),
                ));
            }
        }

        if self.bundles_extensions() {
            summary.add_operation(Operation::with_details(
                Verb::Bundle,
                BUNDLE_FILE,
                self.bundle_path.display().to_string(),
            ));
        }

        let mode = if self.release { "release" } else { "no release" };
        summary.add_operation(Operation::with_details(
            Verb::Upload,
            "version",
            match &self.version {
                Some(name) => format!("{name}, {mode}"),
                None => mode.to_string(),
            },
        ));

        if let Some(webhooks) = &self.webhooks {
            summary.add_operation(Operation::with_details(
                Verb::Submit,
                "webhooks",
                format!("{} subscription(s)", webhooks.len()),
            ));
        }

        if !self.extensions.is_empty() {
            summary.add_operation(Operation::new(Verb::Write, ".env"));
        }

        summary
    }

    fn execute(self, ctx: &mut ExecuteContext<'_>) -> Result<DeployResult> {
        let api = ctx.api();
        let runner = ctx.runner();
        let mut report = ExecutionReport::new();
        let mut env = EnvFile::load(&self.app_dir)?;
        let mut extension_ids = self.extension_ids.clone();
        let mut app_modules = Vec::new();
        let mut entries = Vec::new();

        for planned in &self.extensions {
            let extension = &planned.extension;
            let handle = extension.handle();
            let target = format!("extension:{handle}");

            let uuid = match &planned.uuid {
                Some(uuid) => uuid.clone(),
                None => {
                    let created = api.create_extension(
                        &self.api_key,
                        &NewExtension {
                            title: extension.name().to_string(),
                            handle: handle.clone(),
                            extension_type: extension.extension_type().to_uppercase(),
                        },
                    )?;
                    tracing::info!(%handle, uuid = %created.uuid, "registered extension");
                    report.record_success(Verb::Create, &target);
                    extension_ids.insert(handle.clone(), created.id);
                    created.uuid
                }
            };

            if let Some(command) = extension.build_command() {
                run_command_line(runner, command, &CommandOptions::with_cwd(&extension.directory))
                    .with_context(|| format!("Failed to build {handle}"))?;
                report.record_success(Verb::Build, &target);
            }

            let output = extension.output_path();
            let config = if extension.is_function() {
                let wasm = fs::read(&output)
                    .with_context(|| format!("Failed to read {}", output.display()))?;
                let module_id = api.upload_function(&self.api_key, &handle, &wasm)?;
                report.record_success(Verb::Upload, format!("function:{handle}"));
                extension.deploy_config(&DeployContext {
                    api_key: &self.api_key,
                    module_id: Some(&module_id),
                })?
            } else {
                if output.is_file()
                    && let Some(name) = output.file_name()
                {
                    entries.push(BundleEntry::new(
                        format!("{uuid}/{}", name.to_string_lossy()),
                        &output,
                    ));
                }
                extension.deploy_config(&DeployContext {
                    api_key: &self.api_key,
                    module_id: None,
                })?
            };

            env.set(extension.id_env_var(), uuid.clone());
            app_modules.push(AppModule {
                uuid,
                config: config.to_string(),
                context: String::new(),
                handle,
            });
        }

        let bundle_path = if self.bundles_extensions() {
            create_bundle(&self.bundle_path, &entries)
                .with_context(|| format!("Failed to write {}", self.bundle_path.display()))?;
            report.record_success(Verb::Bundle, BUNDLE_FILE);
            Some(self.bundle_path.clone())
        } else {
            None
        };

        let upload = BundleUpload {
            bundle_path,
            app_modules,
            extension_ids,
            release: self.release,
            message: self.message.clone(),
            version: self.version.clone(),
            commit_reference: self.commit_reference.clone(),
        };
        let result = api.upload_extensions_bundle(&self.api_key, &upload)?;
        if !result.validation_errors.is_empty() {
            return Err(AppctlError::UploadRejected(rejections(&upload.app_modules, &result)).into());
        }
        tracing::info!(version = %result.version_tag, "uploaded version");
        report.record_success(Verb::Upload, "version");

        if let Some(webhooks) = &self.webhooks {
            api.submit_webhook_subscriptions(&self.api_key, webhooks)?;
            report.record_success(Verb::Submit, "webhooks");
        }

        if !self.extensions.is_empty() {
            env.save()?;
            report.record_success(Verb::Write, ".env");
        }

        Ok(DeployResult {
            upload: result,
            report,
        })
    }

    fn is_empty(&self) -> bool {
        false
    }
}

/// Upload validation errors, labelled with extension handles where known.
fn rejections(modules: &[AppModule], result: &UploadResult) -> Vec<String> {
    let handles: BTreeMap<&str, &str> = modules
        .iter()
        .map(|m| (m.uuid.as_str(), m.handle.as_str()))
        .collect();
    result
        .validation_errors
        .iter()
        .flat_map(|error| {
            let label = handles
                .get(error.uuid.as_str())
                .copied()
                .unwrap_or(error.uuid.as_str());
            error.errors.iter().map(move |e| format!("{label}: {e}"))
        })
        .collect()
}
