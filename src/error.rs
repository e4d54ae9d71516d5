#![forbid(unsafe_code)]

//! Error taxonomy shared by every pipeline stage.

use thiserror::Error;

/// Failures surfaced by the fetch pipeline and the warehouse loader.
///
/// Nothing in the crate recovers from these locally; every variant is handed
/// back to the caller unchanged and aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network, auth or quota failure while talking to the video API.
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    /// An id lookup returned zero items.
    #[error("{resource} '{id}' was not found")]
    NotFound { resource: &'static str, id: String },

    /// The API answered, but not with the shape we need.
    #[error("malformed {endpoint} response: {details}")]
    MalformedResponse { endpoint: String, details: String },

    #[error("playlist '{playlist_id}' still had a continuation cursor after {max_pages} pages")]
    PageLimitExceeded {
        playlist_id: String,
        max_pages: usize,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("warehouse error: {0}")]
    Warehouse(#[from] libsql::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn malformed(endpoint: &str, details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.to_string(),
            details: details.into(),
        }
    }

    pub(crate) fn transport(
        endpoint: &str,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            status,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
