//! Error types for the monitoring backend.

use thiserror::Error;

/// Errors from talking to the Cloud Monitoring and Dashboards APIs.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The HTTP request itself failed (connect, timeout, decode).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API returned a non-success status.
    #[error("{operation} failed for {resource:?}: HTTP {status}: {message}")]
    Api {
        /// The high-level operation being performed.
        operation: &'static str,
        /// The resource name or ID the operation targeted.
        resource: String,
        /// HTTP status code returned by the API.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No access token was available in the environment.
    #[error("GOOGLE_OAUTH_ACCESS_TOKEN is not set; cannot authenticate to Google Cloud")]
    MissingToken,

    /// A request could not be built from the given plan data.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
