use std::path::PathBuf;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors returned by ASTR client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required connection parameter was neither given nor found in the environment.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Base URL is not a valid absolute URL.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// Endpoint path could not be joined to the API root.
    #[error("invalid endpoint path '{0}'")]
    InvalidPath(String),

    /// The server rejected the credentials (401 or 403).
    #[error("authentication failed for '{path}' ({status}): {body}")]
    Authentication {
        status: StatusCode,
        path: String,
        body: String,
    },

    /// The requested resource does not exist (404).
    #[error("'{path}' not found: {body}")]
    NotFound { path: String, body: String },

    /// Any other non-success status. `payload` is the server's error body,
    /// parsed as JSON when possible.
    #[error("server rejected request to '{path}' ({status}): {payload}")]
    Validation {
        status: StatusCode,
        path: String,
        payload: Value,
    },

    /// The server failed to handle the request (5xx).
    #[error("server error on '{path}' ({status}): {body}")]
    Server {
        status: StatusCode,
        path: String,
        body: String,
    },

    /// Connection, DNS or timeout failure, including a body stream that dropped midway.
    #[error("transport failure on '{path}': {source}")]
    Transport {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Response body could not be parsed as JSON.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem failure while reading or writing an archive file.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A downloaded archive could not be unpacked.
    #[error("failed to extract '{}': {source}", .path.display())]
    Extract {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    /// The list of files given for upload is not acceptable.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// The server refused to register a new archive.
    #[error("archive rejected by server: {0}")]
    ArchiveRejected(Value),
}

impl ClientError {
    /// Maps a non-success HTTP status to the matching variant.
    pub(crate) fn from_status(status: StatusCode, path: &str, body: String) -> Self {
        let path = path.to_owned();
        match status.as_u16() {
            401 | 403 => Self::Authentication { status, path, body },
            404 => Self::NotFound { path, body },
            500..=599 => Self::Server { status, path, body },
            _ => {
                let payload = serde_json::from_str(&body).unwrap_or(Value::String(body));
                Self::Validation {
                    status,
                    path,
                    payload,
                }
            }
        }
    }

    pub(crate) fn transport(
        path: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            path: path.to_owned(),
            source: source.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Authentication { status, .. }
            | Self::Validation { status, .. }
            | Self::Server { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            _ => None,
        }
    }
}
