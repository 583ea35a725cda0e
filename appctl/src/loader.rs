//! Locating and loading an app from disk.
//!
//! An app is a directory holding `shopify.app.toml` (or a named variant
//! `shopify.app.<name>.toml`), extensions under its extension directories
//! and web processes described by `shopify.web.toml` files.

use anyhow::{Context, Result};
use appctl_common::extension::EXTENSION_CONFIG_FILE;
use appctl_common::validation::Issue;
use appctl_common::{
    AppConfiguration, ExtensionInstance, SubscriptionRules, ValidationErrors, Web,
    WebConfiguration, parse_app_configuration, validate_app_configuration,
    validate_function_extensions_with_ui_handle,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppctlError;
use crate::package_manager::PackageManager;

pub const APP_CONFIG_FILE: &str = "shopify.app.toml";
pub const WEB_CONFIG_FILE: &str = "shopify.web.toml";

const DEFAULT_EXTENSION_DIRECTORIES: &[&str] = &["extensions/*"];

/// File name for a configuration name given with `--config`.
pub fn config_file_name(name: Option<&str>) -> String {
    match name {
        None => APP_CONFIG_FILE.to_string(),
        Some(name) if name.ends_with(".toml") => name.to_string(),
        Some(name) => format!("shopify.app.{name}.toml"),
    }
}

/// An app loaded from disk.
#[derive(Debug, Clone)]
pub struct LoadedApp {
    pub directory: PathBuf,
    pub configuration_path: PathBuf,
    pub configuration: AppConfiguration,
    pub extensions: Vec<ExtensionInstance>,
    pub webs: Vec<Web>,
    pub web_configurations: Vec<(PathBuf, WebConfiguration)>,
    pub package_manager: PackageManager,
}

impl LoadedApp {
    /// The app's API key, required by every remote operation.
    pub fn api_key(&self) -> Result<String, AppctlError> {
        self.configuration
            .client_id()
            .filter(|id| !id.is_empty())
            .ok_or(AppctlError::MissingApiKey)
    }

    /// All issues across the app configuration, web configurations and
    /// function extensions.
    pub fn issues(&self, rules: SubscriptionRules) -> Vec<Issue> {
        let mut issues = match validate_app_configuration(&self.configuration, rules) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.into_issues(),
        };
        for (path, web) in &self.web_configurations {
            if let Err(errors) = web.validate() {
                let prefix = self.relative(path);
                issues.extend(
                    errors
                        .into_issues()
                        .into_iter()
                        .map(|i| Issue::new(format!("{prefix}: {}", i.path), i.message)),
                );
            }
        }
        issues.extend(
            validate_function_extensions_with_ui_handle(&self.extensions)
                .into_iter()
                .map(|message| Issue::new("extensions", message)),
        );
        issues
    }

    pub fn validate(&self, rules: SubscriptionRules) -> Result<(), AppctlError> {
        let issues = self.issues(rules);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppctlError::ValidationFailed(ValidationErrors::new(issues)))
        }
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.directory)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Load the app rooted at `directory`.
pub fn load_app(directory: &Path, config_name: Option<&str>) -> Result<LoadedApp> {
    let configuration_path = directory.join(config_file_name(config_name));
    if !configuration_path.is_file() {
        return Err(AppctlError::ConfigNotFound {
            path: configuration_path.display().to_string(),
        }
        .into());
    }
    let source = fs::read_to_string(&configuration_path)
        .with_context(|| format!("Failed to read {}", configuration_path.display()))?;
    let configuration = parse_app_configuration(&source)
        .with_context(|| format!("Failed to parse {}", configuration_path.display()))?;
    tracing::info!(path = %configuration_path.display(), shape = ?configuration.shape(), "loaded app configuration");

    let extensions = load_extensions(directory, configuration.extension_directories())?;
    let web_configurations = load_web_configurations(directory, configuration.web_directories())?;
    let webs = web_configurations
        .iter()
        .map(|(path, config)| Web {
            directory: path.parent().unwrap_or(directory).to_path_buf(),
            configuration: config.clone().process(),
        })
        .collect();

    Ok(LoadedApp {
        directory: directory.to_path_buf(),
        configuration_path,
        configuration,
        extensions,
        webs,
        web_configurations,
        package_manager: PackageManager::detect(directory),
    })
}

fn load_extensions(directory: &Path, patterns: Option<&[String]>) -> Result<Vec<ExtensionInstance>> {
    let patterns: Vec<&str> = match patterns {
        Some(patterns) => patterns.iter().map(String::as_str).collect(),
        None => DEFAULT_EXTENSION_DIRECTORIES.to_vec(),
    };
    let mut extensions = Vec::new();
    for config_path in find_files(directory, &patterns, EXTENSION_CONFIG_FILE)? {
        let Some(extension_dir) = config_path.parent() else {
            continue;
        };
        let extension = ExtensionInstance::load(extension_dir)
            .with_context(|| format!("Failed to load {}", config_path.display()))?;
        tracing::debug!(handle = %extension.handle(), kind = ?extension.kind(), "found extension");
        extensions.push(extension);
    }
    Ok(extensions)
}

fn load_web_configurations(
    directory: &Path,
    patterns: Option<&[String]>,
) -> Result<Vec<(PathBuf, WebConfiguration)>> {
    let paths = match patterns {
        Some(patterns) => {
            let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
            find_files(directory, &patterns, WEB_CONFIG_FILE)?
        }
        None => find_files(directory, &["**"], WEB_CONFIG_FILE)?,
    };
    paths
        .into_iter()
        .map(|path| {
            let source = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config = WebConfiguration::parse(&source)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok((path, config))
        })
        .collect()
}

/// Files named `file_name` inside directories matching `patterns`, sorted,
/// skipping anything under `node_modules`.
fn find_files(directory: &Path, patterns: &[&str], file_name: &str) -> Result<Vec<PathBuf>> {
    let mut found = BTreeSet::new();
    for pattern in patterns {
        let full = directory.join(pattern).join(file_name);
        let full = full.to_string_lossy();
        let entries = glob::glob(&full).with_context(|| format!("Invalid directory pattern '{pattern}'"))?;
        for entry in entries {
            let path = entry.context("Failed to read directory entry")?;
            if path.components().any(|c| c.as_os_str() == "node_modules") {
                continue;
            }
            found.insert(path);
        }
    }
    Ok(found.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use appctl_common::{ConfigShape, WebType};

    const CURRENT: &str = r#"
name = "my-app"
client_id = "api-key"
application_url = "https://example.com"
embedded = true

[webhooks]
api_version = "2024-01"
"#;

    fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn config_names() {
        assert_eq!(config_file_name(None), "shopify.app.toml");
        assert_eq!(config_file_name(Some("production")), "shopify.app.production.toml");
        assert_eq!(config_file_name(Some("custom.toml")), "custom.toml");
    }

    #[test]
    fn missing_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_app(dir.path(), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppctlError>(),
            Some(AppctlError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn loads_extensions_and_webs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "shopify.app.toml", CURRENT);
        write(
            dir.path(),
            "extensions/checkout/shopify.extension.toml",
            "name = \"Checkout\"\ntype = \"ui_extension\"",
        );
        write(
            dir.path(),
            "extensions/discount/shopify.extension.toml",
            "name = \"Discount\"\ntype = \"function\"",
        );
        write(
            dir.path(),
            "web/shopify.web.toml",
            "type = \"backend\"\n[commands]\ndev = \"npm run dev\"",
        );
        write(
            dir.path(),
            "web/node_modules/pkg/shopify.web.toml",
            "[commands]\ndev = \"ignored\"",
        );

        let app = load_app(dir.path(), None).unwrap();
        assert_eq!(app.configuration.shape(), ConfigShape::Current);
        let handles: Vec<String> = app.extensions.iter().map(|e| e.handle()).collect();
        assert_eq!(handles, vec!["checkout", "discount"]);
        assert_eq!(app.webs.len(), 1);
        assert!(app.webs[0].has_role(WebType::Backend));
        assert_eq!(app.api_key().unwrap(), "api-key");
        assert!(app.validate(SubscriptionRules::Disabled).is_ok());
    }

    #[test]
    fn custom_extension_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "shopify.app.toml",
            "scopes = \"\"\nextension_directories = [\"custom/*\"]",
        );
        write(
            dir.path(),
            "custom/a/shopify.extension.toml",
            "name = \"a\"\ntype = \"theme\"",
        );
        write(
            dir.path(),
            "extensions/b/shopify.extension.toml",
            "name = \"b\"\ntype = \"theme\"",
        );
        let app = load_app(dir.path(), None).unwrap();
        assert_eq!(app.extensions.len(), 1);
        assert_eq!(app.extensions[0].name(), "a");
        assert!(matches!(app.api_key(), Err(AppctlError::MissingApiKey)));
    }

    #[test]
    fn issues_span_every_source() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "shopify.app.toml", CURRENT);
        write(
            dir.path(),
            "extensions/f/shopify.extension.toml",
            "name = \"f\"\ntype = \"function\"\n[ui]\nhandle = \"missing\"",
        );
        write(
            dir.path(),
            "web/shopify.web.toml",
            "port = 70000\n[commands]\ndev = \"x\"",
        );
        let app = load_app(dir.path(), None).unwrap();
        let issues = app.issues(SubscriptionRules::Disabled);
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["web/shopify.web.toml: port", "extensions"]);
        assert!(matches!(
            app.validate(SubscriptionRules::Disabled),
            Err(AppctlError::ValidationFailed(_))
        ));
    }
}
