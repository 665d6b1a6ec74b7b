//! Error types for branch resolution and client selection

use thiserror::Error;

/// Storage API branch client error
#[derive(Debug, Error)]
pub enum ClientError {
    /// Option value rejected when it was set (URL, auth method)
    #[error("{0}")]
    InvalidConfiguration(String),

    /// Branch listing could not be turned into a current branch
    #[error("{0}")]
    BranchResolution(String),

    /// Argument has the wrong shape (e.g. non-numeric branch id)
    #[error("{0}")]
    InvalidArgument(String),

    /// Branch id not present in the branch listing
    #[error("{0}")]
    NotFound(String),

    /// No usable credential on an inbound request
    #[error("{message}")]
    Authentication { status: u16, message: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Unauthorized (401) error for a request without credentials
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ClientError::Authentication {
            status: 401,
            message: message.into(),
        }
    }

    /// HTTP-style status code associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Authentication { status, .. } | ClientError::Server { status, .. } => {
                Some(*status)
            }
            ClientError::NotFound(_) => Some(404),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
