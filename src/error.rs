//! Error types for the tap and its configuration.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// These only ever surface at construction time. Once a tap exists,
/// nothing it does can fail the request it observes except an unreadable
/// inbound body.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for the schema.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// No collector destination was configured.
    #[error("collector_url is required")]
    MissingCollectorUrl,

    /// The collector destination is not a usable http(s) URL.
    #[error("invalid collector_url {url:?}: {reason}")]
    InvalidCollectorUrl { url: String, reason: String },

    /// Semantic checks failed; every problem is listed.
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors raised while building the tap itself.
#[derive(Debug, Error)]
pub enum TapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The collector HTTP client could not be constructed.
    #[error("failed to build collector client: {0}")]
    Client(#[from] reqwest::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
