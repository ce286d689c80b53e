use reqwest::StatusCode;
use std::io;
use thiserror::Error;

pub type ChatResult<T> = std::result::Result<T, ChatError>;

/// Main error type for the chat client
#[derive(Error, Debug)]
pub enum ChatError {
    /// Endpoint answered with a non-2xx status before streaming began
    #[error("unexpected status {0}: {1}")]
    UnexpectedStatus(StatusCode, String),

    /// Endpoint answered without a readable body
    #[error("response has no body to stream")]
    MissingBody,

    /// Stream broke off while reading chunks
    #[error("stream disconnected before completion: {0}")]
    Stream(String),

    /// Invalid request parameters
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Environment variable error
    #[error("missing environment variable: {0}")]
    EnvVar(#[from] EnvVarError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Environment variable error
#[derive(Debug)]
pub struct EnvVarError {
    /// Name of the environment variable that is missing
    pub var: String,
    /// Optional instructions to help the user get a valid value
    pub instructions: Option<String>,
}

impl std::fmt::Display for EnvVarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Missing environment variable: `{}`", self.var)?;
        if let Some(instructions) = &self.instructions {
            write!(f, ". {}", instructions)?;
        }
        Ok(())
    }
}

impl std::error::Error for EnvVarError {}

impl ChatError {
    /// True for failures that happened before any reply text was streamed
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            ChatError::UnexpectedStatus(_, _) | ChatError::MissingBody | ChatError::Reqwest(_)
        )
    }

    /// Check if the error is a client error
    pub fn is_client_error(&self) -> bool {
        match self {
            ChatError::InvalidRequest(_) | ChatError::Configuration(_) | ChatError::EnvVar(_) => {
                true
            }
            ChatError::UnexpectedStatus(status, _) => status.is_client_error(),
            _ => false,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ChatError::UnexpectedStatus(status, _) => Some(*status),
            ChatError::Reqwest(e) => e.status(),
            _ => None,
        }
    }
}
