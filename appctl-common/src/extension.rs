//! Extensions declared by `shopify.extension.toml` files.

use crate::error::CommonError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const EXTENSION_CONFIG_FILE: &str = "shopify.extension.toml";

const UI_EXTENSION_TYPE: &str = "ui_extension";
const THEME_DIRECTORIES: &[&str] = &["assets", "blocks", "locales", "snippets"];
const DEFAULT_FUNCTION_OUTPUT: &str = "dist/index.wasm";

static NON_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

pub fn slugify(name: &str) -> String {
    NON_SLUG_RE
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct FunctionUi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_create: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ExtensionBuild {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// The on-disk extension configuration.
///
/// Type-specific keys beyond these are tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ExtensionConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub extension_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<FunctionUi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_ui: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<ExtensionBuild>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_points: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Ui,
    Theme,
    Function,
}

impl ExtensionKind {
    pub fn of(extension_type: &str) -> Self {
        match extension_type {
            "function" => ExtensionKind::Function,
            "theme" => ExtensionKind::Theme,
            _ => ExtensionKind::Ui,
        }
    }
}

/// Inputs to [`ExtensionInstance::deploy_config`] that come from the remote side.
#[derive(Debug, Clone, Default)]
pub struct DeployContext<'a> {
    pub api_key: &'a str,
    pub module_id: Option<&'a str>,
}

/// An extension found in the app, with its directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionInstance {
    pub directory: PathBuf,
    pub configuration: ExtensionConfig,
}

impl ExtensionInstance {
    pub fn new(directory: impl Into<PathBuf>, configuration: ExtensionConfig) -> Self {
        Self {
            directory: directory.into(),
            configuration,
        }
    }

    pub fn load(directory: &Path) -> Result<Self, CommonError> {
        let source = fs::read_to_string(directory.join(EXTENSION_CONFIG_FILE))?;
        Ok(Self::new(directory, toml::from_str(&source)?))
    }

    pub fn name(&self) -> &str {
        &self.configuration.name
    }

    pub fn extension_type(&self) -> &str {
        &self.configuration.extension_type
    }

    pub fn handle(&self) -> String {
        match &self.configuration.handle {
            Some(handle) => handle.clone(),
            None => slugify(&self.configuration.name),
        }
    }

    pub fn kind(&self) -> ExtensionKind {
        ExtensionKind::of(&self.configuration.extension_type)
    }

    pub fn is_function(&self) -> bool {
        self.kind() == ExtensionKind::Function
    }

    pub fn is_javascript_function(&self) -> bool {
        self.is_function()
            && (self.directory.join("src/index.js").exists()
                || self.directory.join("src/index.ts").exists())
    }

    pub fn ui_handle(&self) -> Option<&str> {
        self.configuration.ui.as_ref()?.handle.as_deref()
    }

    pub fn build_command(&self) -> Option<&str> {
        self.configuration.build.as_ref()?.command.as_deref()
    }

    /// Where the build writes its artifact.
    pub fn output_path(&self) -> PathBuf {
        let relative = match self.configuration.build.as_ref().and_then(|b| b.path.as_deref()) {
            Some(path) => path.to_string(),
            None if self.is_function() => DEFAULT_FUNCTION_OUTPUT.to_string(),
            None => format!("dist/{}.js", self.handle()),
        };
        self.directory.join(relative)
    }

    /// Name of the `.env` variable holding the registration id.
    pub fn id_env_var(&self) -> String {
        format!("SHOPIFY_{}_ID", self.handle().to_uppercase().replace('-', "_"))
    }

    /// JSON payload sent to the Partners API for this extension.
    pub fn deploy_config(&self, context: &DeployContext<'_>) -> Result<Value, CommonError> {
        match self.kind() {
            ExtensionKind::Ui => Ok(match &self.configuration.extension_points {
                Some(points) => json!({ "extension_points": points }),
                None => json!({}),
            }),
            ExtensionKind::Theme => {
                let mut files = BTreeMap::new();
                for dir in THEME_DIRECTORIES {
                    collect_theme_files(&self.directory, &self.directory.join(dir), &mut files)?;
                }
                Ok(json!({ "theme_extension": { "files": files } }))
            }
            ExtensionKind::Function => {
                let config = &self.configuration;
                let enable_creation_ui = config
                    .ui
                    .as_ref()
                    .and_then(|ui| ui.enable_create)
                    .unwrap_or(true);
                Ok(json!({
                    "title": config.name,
                    "module_id": context.module_id,
                    "description": config.description,
                    "app_key": context.api_key,
                    "api_type": config.extension_type,
                    "api_version": config.api_version,
                    "enable_creation_ui": enable_creation_ui,
                    "localization": Value::Object(Map::new()),
                }))
            }
        }
    }
}

fn collect_theme_files(
    root: &Path,
    dir: &Path,
    files: &mut BTreeMap<String, String>,
) -> Result<(), CommonError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_symlink() && path.is_dir() {
            tracing::warn!(path = %path.display(), "skipping symlinked directory in theme extension");
            continue;
        }
        if file_type.is_dir() {
            collect_theme_files(root, &path, files)?;
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(key, STANDARD.encode(fs::read(&path)?));
    }
    Ok(())
}

/// Check that every function's `ui.handle` points at a UI extension of the app.
pub fn validate_function_extensions_with_ui_handle(extensions: &[ExtensionInstance]) -> Vec<String> {
    let mut errors = Vec::new();
    for extension in extensions.iter().filter(|e| e.is_function()) {
        let Some(ui_handle) = extension.ui_handle() else {
            continue;
        };
        match extensions.iter().find(|e| e.handle() == ui_handle) {
            None => errors.push(format!(
                "[{}] - Local app must contain a ui_extension with handle '{ui_handle}'",
                extension.name()
            )),
            Some(found) if found.extension_type() != UI_EXTENSION_TYPE => errors.push(format!(
                "[{}] - Local app must contain one extension of type '{UI_EXTENSION_TYPE}' and handle '{ui_handle}'",
                extension.name()
            )),
            Some(_) => {}
        }
    }
    errors
}
