//! Error types for datalab.

use std::path::PathBuf;

/// Result type alias for datalab operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, querying, or storing datasets.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid dataset configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// A filter or sort references a field the dataset does not declare.
    #[error("Column '{name}' is not declared by dataset '{dataset}'")]
    ColumnNotFound {
        /// Slug of the dataset being queried.
        dataset: String,
        /// The name of the undeclared column.
        name: String,
    },

    /// The remote API could not be reached or answered with a non-success
    /// status.
    #[error("API request failed{}: {message}", status_suffix(.status))]
    ApiRequestFailed {
        /// HTTP status code, when the server answered at all.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
    },

    /// The remote API answered with a body that does not have the configured
    /// shape.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// Description of the problem.
        message: String,
    },

    /// Row store error.
    #[error("Row store error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// Inbound request parameters could not be parsed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

impl Error {
    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create an I/O error without path context.
    pub fn io_no_path(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an undeclared column error.
    pub fn column_not_found(dataset: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            dataset: dataset.into(),
            name: name.into(),
        }
    }

    /// Create an API failure carrying the HTTP status.
    pub fn api_status(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create an API failure for a transport problem (no status available).
    pub fn api_transport(message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status: None,
            message: message.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by dataset configuration rather than by
    /// a backend.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. } | Self::ColumnNotFound { .. })
    }

    /// Returns the HTTP status carried by an API failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiRequestFailed { status, .. } => *status,
            _ => None,
        }
    }
}
