//! Error types for the digest engine.

use thiserror::Error;

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Summary,
    Introduction,
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Summary => "summary",
            Stage::Introduction => "introduction",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum DigestError {
    // Input errors
    #[error("No valid transcript entries found")]
    Parse,

    #[error("Input text is empty")]
    EmptyInput,

    #[error("Segmentation produced no segments")]
    Segmentation,

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    #[error("Prompt error: {message}")]
    Prompt { message: String },

    // Completion service errors
    #[error("Completion service returned {status}: {body}")]
    ExternalCall { status: u16, body: String },

    #[error("Completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Completion service returned no usable content ({stage} stage)")]
    ContentMissing { stage: Stage },

    #[error("Completion content is not valid JSON: {0}")]
    MalformedStructuredOutput(#[source] serde_json::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DigestError>;

impl DigestError {
    pub(crate) fn invalid_config(key: &str, message: impl Into<String>) -> Self {
        DigestError::InvalidConfig {
            key: key.to_string(),
            message: message.into(),
        }
    }
}
