//! CLI command implementations.

pub mod completions;
pub mod deploy;
pub mod draft;
pub mod schema;
pub mod validate;
pub mod webhooks;
