//! Error conditions callers match on.

use appctl_common::ValidationErrors;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppctlError {
    #[error("Couldn't find an app configuration file at {path}")]
    ConfigNotFound { path: String },

    #[error("App configuration is invalid:\n{0}")]
    ValidationFailed(ValidationErrors),

    #[error("The app configuration has no client_id; link the app before running this command")]
    MissingApiKey,

    #[error("No Partners API token; set APPCTL_TOKEN or add `token` to {config_path}")]
    MissingToken { config_path: String },

    #[error("Partners API request to {endpoint} failed with status {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Version upload was rejected:\n{}", .0.join("\n"))]
    UploadRejected(Vec<String>),

    #[error("Extension '{handle}' is not registered; deploy the app first")]
    MissingRegistration { handle: String },

    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },
}
