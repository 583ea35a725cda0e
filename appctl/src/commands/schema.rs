//! JSON Schema generation for the configuration files appctl reads.

use anyhow::{Context, Result};
use appctl_common::{
    CurrentAppConfiguration, ExtensionConfig, LegacyAppConfiguration, WebConfiguration,
};
use clap::{Args, Subcommand};
use schemars::{JsonSchema, schema_for};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub action: SchemaAction,
}

#[derive(Debug, Subcommand)]
pub enum SchemaAction {
    /// Generate JSON schemas for all configuration files
    Generate {
        /// Output directory (if not specified, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List available schema types
    List,
}

struct SchemaInfo {
    name: &'static str,
    filename: &'static str,
    description: &'static str,
    render: fn() -> Result<String>,
}

fn render<T: JsonSchema>() -> Result<String> {
    serde_json::to_string_pretty(&schema_for!(T)).context("Failed to serialize schema")
}

const SCHEMAS: &[SchemaInfo] = &[
    SchemaInfo {
        name: "CurrentAppConfiguration",
        filename: "app-configuration.schema.json",
        description: "shopify.app.toml with client_id, URLs and webhooks",
        render: render::<CurrentAppConfiguration>,
    },
    SchemaInfo {
        name: "LegacyAppConfiguration",
        filename: "legacy-app-configuration.schema.json",
        description: "shopify.app.toml holding only scopes and directories",
        render: render::<LegacyAppConfiguration>,
    },
    SchemaInfo {
        name: "WebConfiguration",
        filename: "web-configuration.schema.json",
        description: "shopify.web.toml describing a web process",
        render: render::<WebConfiguration>,
    },
    SchemaInfo {
        name: "ExtensionConfig",
        filename: "extension.schema.json",
        description: "shopify.extension.toml of a single extension",
        render: render::<ExtensionConfig>,
    },
];

/// Every schema as a (filename, json) pair.
fn generate_all_schemas() -> Result<Vec<(&'static str, String)>> {
    SCHEMAS
        .iter()
        .map(|info| Ok((info.filename, (info.render)()?)))
        .collect()
}

pub fn run(args: SchemaArgs) -> Result<()> {
    match args.action {
        SchemaAction::Generate { output } => {
            let schemas = generate_all_schemas()?;

            match output {
                Some(dir) => {
                    fs::create_dir_all(&dir)
                        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

                    for (filename, json) in schemas {
                        let path = dir.join(filename);
                        fs::write(&path, &json)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("Wrote {}", path.display());
                    }
                }
                None => {
                    // One object keyed by schema name
                    let mut combined = serde_json::Map::new();
                    for (filename, json) in schemas {
                        let value: serde_json::Value = serde_json::from_str(&json)?;
                        let name = filename.strip_suffix(".schema.json").unwrap_or(filename);
                        combined.insert(name.to_string(), value);
                    }
                    println!("{}", serde_json::to_string_pretty(&combined)?);
                }
            }
        }
        SchemaAction::List => {
            println!("Available schema types:\n");
            for info in SCHEMAS {
                println!("  {} ({})", info.name, info.filename);
                println!("    {}\n", info.description);
            }
        }
    }

    Ok(())
}
