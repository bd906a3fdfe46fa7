//! Error types specific to APDU responses

use super::status::StatusWord;

/// Error for APDU response processing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    /// Incomplete response (less than 2 bytes)
    #[error("Incomplete response")]
    Incomplete,

    /// Response payload could not be parsed
    #[error("Parse error: {0}")]
    Parse(&'static str),

    /// Card returned a non-success status word
    #[error("Status error {}: {}", .0, .0.description())]
    Status(StatusWord),
}

impl ResponseError {
    /// Create a parse error with a message
    pub const fn parse(message: &'static str) -> Self {
        Self::Parse(message)
    }

    /// Status word carried by this error, if any
    pub const fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }
}
