//! appctl: validate, normalize and deploy app configurations.
//!
//! The configuration model itself lives in `appctl-common`; this crate adds
//! everything that touches the outside world.
//!
//! ## Workflows
//!
//! - **validate**: load `shopify.app.toml`, web and extension configs and
//!   report every issue at once
//! - **webhooks**: print the normalized subscription list
//! - **deploy**: reconcile extensions with their remote registrations,
//!   confirm, build, bundle and upload a version
//! - **draft push**: build extensions and update their drafts
//!
//! Remote work is planned first and executed second (see [`plan`]), so
//! `--dry-run` shows exactly what would happen.

pub mod cli;
pub mod command_runner;
pub mod commands;
pub mod deploy;
pub mod draft;
pub mod error;
pub mod identifiers;
pub mod loader;
pub mod output;
pub mod package_manager;
pub mod partners;
pub mod pipeline;
pub mod plan;
pub mod prompt;
pub mod settings;

pub use cli::{Cli, Commands};
pub use error::AppctlError;
