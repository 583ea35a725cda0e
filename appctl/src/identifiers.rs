//! Extension identifiers persisted in the app's `.env` file and matched
//! against remote registrations.

use anyhow::{Context, Result};
use appctl_common::ExtensionInstance;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::partners::RemoteExtension;

pub const ENV_FILE: &str = ".env";

/// A dotenv file whose values are read with `dotenv` and which is written
/// back by patching only the keys that changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    path: PathBuf,
    source: String,
    entries: BTreeMap<String, String>,
    updates: BTreeMap<String, String>,
}

impl EnvFile {
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = app_dir.join(ENV_FILE);
        if !path.exists() {
            return Ok(Self {
                path,
                ..Default::default()
            });
        }
        let source = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let entries = dotenv::from_path_iter(&path)
            .and_then(|iter| iter.collect::<Result<BTreeMap<_, _>, _>>())
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Self {
            path,
            source,
            entries,
            updates: BTreeMap::new(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if self.get(&key) == Some(value.as_str()) {
            return;
        }
        self.entries.insert(key.clone(), value.clone());
        self.updates.insert(key, value);
    }

    /// Stored registration uuid of `extension`.
    pub fn extension_uuid(&self, extension: &ExtensionInstance) -> Option<&str> {
        self.get(&extension.id_env_var())
    }

    /// Write changed keys back. Lines defining them are replaced, new keys
    /// are appended and every other line is kept as it was.
    pub fn save(&self) -> Result<()> {
        let mut pending = self.updates.clone();
        let mut content = String::with_capacity(self.source.len());
        for line in self.source.split_inclusive('\n') {
            let body = line.trim_end_matches(['\r', '\n']);
            match line_key(body).and_then(|key| pending.remove_entry(key)) {
                Some((key, value)) => {
                    content.push_str(&format!("{key}={value}"));
                    content.push_str(&line[body.len()..]);
                }
                None => content.push_str(line),
            }
        }
        if !pending.is_empty() && !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        for (key, value) in pending {
            content.push_str(&format!("{key}={value}\n"));
        }
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Key defined by a dotenv line, if any.
fn line_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, _) = line.split_once('=')?;
    Some(key.trim())
}

/// Find the registration a local extension corresponds to.
///
/// A stored uuid wins; otherwise a registration whose title equals the
/// extension's handle or name and whose type matches, ignoring case.
pub fn find_registration<'a>(
    extension: &ExtensionInstance,
    stored_uuid: Option<&str>,
    registrations: &'a [RemoteExtension],
) -> Option<&'a RemoteExtension> {
    if let Some(uuid) = stored_uuid
        && let Some(found) = registrations.iter().find(|r| r.uuid == uuid)
    {
        return Some(found);
    }
    let handle = extension.handle();
    registrations.iter().find(|r| {
        (r.title == handle || r.title == extension.name())
            && r.extension_type.eq_ignore_ascii_case(extension.extension_type())
    })
}
