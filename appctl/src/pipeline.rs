//! Execution pipeline shared by every command.
//!
//! [`ExecutionPlan`] captures the global options (app location, dry run,
//! resolved settings) and hands out the collaborators commands need: a
//! command runner, the loaded app and a Partners API client.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalArgs;
use crate::command_runner::{CommandRunner, RealCommandRunner};
use crate::error::AppctlError;
use crate::loader::{LoadedApp, load_app};
use crate::partners::HttpPartnersClient;
use crate::settings::{Settings, SettingsOverrides, UserConfig};

/// Execution plan for an appctl command.
#[derive(Clone)]
pub struct ExecutionPlan {
    /// Directory holding the app configuration.
    pub app_dir: PathBuf,
    /// Name given with `--config`.
    pub config_name: Option<String>,
    /// Whether to perform a dry run
    pub dry_run: bool,
    pub settings: Settings,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("app_dir", &self.app_dir)
            .field("config_name", &self.config_name)
            .field("dry_run", &self.dry_run)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ExecutionPlan {
    /// Create an execution plan from the global CLI options.
    pub fn from_global(global: &GlobalArgs) -> Result<Self> {
        let settings = Settings::load(&SettingsOverrides {
            strict_webhooks: global.strict_webhooks,
        })?;
        Ok(Self {
            app_dir: global.path.clone(),
            config_name: global.config.clone(),
            dry_run: global.dry_run,
            settings,
            runner: Arc::new(RealCommandRunner),
        })
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Load the app this plan points at.
    pub fn load_app(&self) -> Result<LoadedApp> {
        load_app(&self.app_dir, self.config_name.as_deref())
    }

    /// Partners API client built from the resolved settings.
    pub fn partners_client(&self) -> Result<HttpPartnersClient> {
        let Some(token) = self.settings.token.as_deref() else {
            let config_path = UserConfig::path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the user settings file".to_string());
            return Err(AppctlError::MissingToken { config_path }.into());
        };
        HttpPartnersClient::new(&self.settings.partners_url, token)
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self {
            app_dir: PathBuf::from("."),
            config_name: None,
            dry_run: false,
            settings: Settings::default(),
            runner: Arc::new(RealCommandRunner),
        }
    }
}

/// Builder for creating execution plans in tests or programmatically.
#[derive(Default)]
pub struct ExecutionPlanBuilder {
    app_dir: Option<PathBuf>,
    config_name: Option<String>,
    dry_run: bool,
    settings: Option<Settings>,
    runner: Option<Arc<dyn CommandRunner>>,
}

impl ExecutionPlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.app_dir = Some(dir.into());
        self
    }

    pub fn config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = Some(name.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn build(self) -> ExecutionPlan {
        ExecutionPlan {
            app_dir: self.app_dir.unwrap_or_else(|| PathBuf::from(".")),
            config_name: self.config_name,
            dry_run: self.dry_run,
            settings: self.settings.unwrap_or_default(),
            runner: self.runner.unwrap_or_else(|| Arc::new(RealCommandRunner)),
        }
    }
}
