use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum UnbloatError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Catalog endpoint unreachable ({url}): {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Could not extract a revision from the response of {url}: {reason}")]
    MalformedRevisionResponse { url: String, reason: String },

    #[error("Catalog document is not a package mapping: {0}")]
    InvalidDocument(String),

    #[error("No catalog available (nothing cached and refresh failed): {0}")]
    NoCatalog(Box<UnbloatError>),

    #[error("Privileged channel permission has not been granted")]
    PermissionDenied,

    #[error("Invalid package identifier '{0}'")]
    InvalidPackageId(String),

    #[error("Cache Error: {0}")]
    Cache(String),

    #[error("Failed to execute command: {0}")]
    CommandExecError(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl From<std::io::Error> for UnbloatError {
    fn from(err: std::io::Error) -> Self {
        UnbloatError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for UnbloatError {
    fn from(err: reqwest::Error) -> Self {
        UnbloatError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for UnbloatError {
    fn from(err: serde_json::Error) -> Self {
        UnbloatError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, UnbloatError>;
