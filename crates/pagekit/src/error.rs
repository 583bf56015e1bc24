//! Error types for PageKit

use thiserror::Error;

/// Errors that can occur while fetching a page
///
/// Extraction itself never fails; every variant here is raised by the
/// fetch path and is terminal for the call.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL could not be parsed or has a non-HTTP scheme
    #[error("Invalid URL: must be an absolute http:// or https:// URL")]
    InvalidUrl,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// DNS, connect or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Server answered with something other than 200 OK
    #[error("Unexpected status code {code}")]
    UnexpectedStatus { code: u16 },
}

impl FetchError {
    /// Create an error from a reqwest error raised while sending the request
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_builder() {
            FetchError::ClientBuild(err)
        } else {
            FetchError::Transport(err)
        }
    }

    /// True if the request did not complete within the client timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Transport(err) if err.is_timeout())
    }

    /// Status code for [`FetchError::UnexpectedStatus`]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::UnexpectedStatus { code } => Some(*code),
            _ => None,
        }
    }
}
