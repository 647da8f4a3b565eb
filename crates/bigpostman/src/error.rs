//! Protocol error types.

use bigpacks::PackError;
use thiserror::Error;

/// Errors that can occur while talking to a device.
///
/// None of these are retried internally; the caller decides whether to send
/// the request again (with a fresh token).
#[derive(Error, Debug)]
pub enum PostmanError {
    /// Request could not be packed, or the response could not be unpacked.
    #[error("pack error: {0}")]
    Pack(#[from] PackError),

    /// The byte stream failed.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),

    /// No byte arrived within the read timeout.
    #[error("frame receiving timed out")]
    Timeout,

    /// Frame failed the CRC residue check.
    #[error("bad CRC: computed 0x{computed:08X}, frame carries 0x{expected:08X}")]
    Integrity {
        /// CRC computed over the received payload.
        computed: u32,
        /// CRC found at the end of the frame.
        expected: u32,
    },

    /// Response echoes a token other than the one just sent.
    #[error("response token {received:#08X} does not match request token {sent:#08X}")]
    TokenMismatch {
        /// Token of the request.
        sent: u32,
        /// Token echoed by the device.
        received: u32,
    },

    /// Response is well framed but not shaped like a response.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Result type alias for postman operations.
pub type PostmanResult<T> = Result<T, PostmanError>;
