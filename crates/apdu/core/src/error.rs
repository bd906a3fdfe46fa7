//! Umbrella error type for APDU operations

use crate::command::CommandError;
use crate::response::ResponseError;
use crate::transport::TransportError;

/// Core error type that encompasses all errors of this crate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Physical channel failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed or unsuccessful response
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Command could not be encoded
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Context error with message and source error
    #[error("{context}: {source}")]
    Context {
        /// Contextual message
        context: String,
        /// Source error
        source: Box<Self>,
    },
}

impl Error {
    /// Create a new error with context information
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any context layers
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the innermost error is a transport failure
    pub fn is_transport(&self) -> bool {
        matches!(self.root(), Self::Transport(_))
    }
}

/// Extension trait for Result with APDU Errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, context: S) -> Result<T, Error>;
}

impl<T, E: Into<Error>> ResultExt<T> for Result<T, E> {
    fn context<S: Into<String>>(self, context: S) -> Result<T, Error> {
        self.map_err(|e| e.into().with_context(context))
    }
}
