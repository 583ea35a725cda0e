//! Node package manager detection and command formatting.

use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    /// Detect from the lock file in `dir`, defaulting to npm.
    pub fn detect(dir: &Path) -> Self {
        if dir.join("yarn.lock").exists() {
            PackageManager::Yarn
        } else if dir.join("pnpm-lock.yaml").exists() {
            PackageManager::Pnpm
        } else if dir.join("bun.lockb").exists() || dir.join("bun.lock").exists() {
            PackageManager::Bun
        } else {
            PackageManager::Npm
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    /// Command line that runs a package script with arguments.
    ///
    /// npm needs `run` and a `--` separator; the others pass arguments through.
    pub fn format_command(&self, script: &str, args: &[&str]) -> String {
        let mut parts = vec![self.as_str().to_string()];
        if *self == PackageManager::Npm {
            parts.push("run".to_string());
        }
        parts.push(script.to_string());
        if !args.is_empty() {
            if *self == PackageManager::Npm {
                parts.push("--".to_string());
            }
            parts.extend(args.iter().map(|a| a.to_string()));
        }
        parts.join(" ")
    }

    /// Arguments that execute a locally installed binary `tool`.
    pub fn exec_args(&self, tool: &str, args: &[&str]) -> Vec<String> {
        let prefix: &[&str] = match self {
            PackageManager::Npm => &["exec", "--"],
            PackageManager::Pnpm => &["exec"],
            PackageManager::Yarn => &[],
            PackageManager::Bun => &["x"],
        };
        prefix
            .iter()
            .chain(std::iter::once(&tool))
            .chain(args.iter())
            .map(|a| a.to_string())
            .collect()
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
