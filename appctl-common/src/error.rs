use thiserror::Error;

/// Failures reading or writing app files.
///
/// Schema violations are reported separately as
/// [`ValidationErrors`](crate::validation::ValidationErrors).
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("archive error: {0}")]
    Archive(String),
}
