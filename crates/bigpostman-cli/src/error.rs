//! Error types for the command-line client.

use bigpacks::PackError;
use bigpostman::{PostmanError, Status};
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by `postman`.
#[derive(Debug, Error)]
pub enum CliError {
    /// The request could not be completed.
    #[error(transparent)]
    Postman(#[from] PostmanError),

    /// JSON content could not be converted to a packable value.
    #[error("invalid content: {0}")]
    Pack(#[from] PackError),

    /// Content was not valid JSON, or a payload could not be printed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A content file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    ContentFile {
        /// File named on the command line.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A request failed on the link: timeout, bad CRC, token mismatch and
    /// the like.
    #[error("Cannot {action} the '{resource}' resource: {source}")]
    Request {
        /// Verb describing the request.
        action: &'static str,
        /// Resource as typed on the command line.
        resource: String,
        /// Underlying protocol error.
        source: PostmanError,
    },

    /// The device answered with a status other than the expected success.
    #[error("Cannot {action} the '{resource}' resource: {status}")]
    UnexpectedStatus {
        /// Verb describing the request.
        action: &'static str,
        /// Resource as typed on the command line.
        resource: String,
        /// Status returned by the device.
        status: Status,
    },
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
