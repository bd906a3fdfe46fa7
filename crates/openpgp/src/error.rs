//! Error types for OpenPGP card sessions

use std::fmt;

use sectoken_apdu_core::{StatusWord, TransportError};

use crate::pin::PinClass;
use crate::secure_messaging::SecureMessagingError;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Step of the secure messaging life cycle that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureMessagingStage {
    /// Key agreement during bring-up
    Establish,
    /// Protecting an outgoing command
    Wrap,
    /// Checking an incoming response
    Unwrap,
}

impl fmt::Display for SecureMessagingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Establish => write!(f, "establishment"),
            Self::Wrap => write!(f, "encrypt/sign"),
            Self::Unwrap => write!(f, "verify/decrypt"),
        }
    }
}

/// Coarse classification used to decide on recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Physical channel failed; reconnect
    Transport,
    /// Token refused an operation; retry or re-authenticate
    Card,
    /// Framing failed mid-exchange; the session likely needs a reconnect
    Protocol,
    /// Secure messaging failed and was torn down
    SecureMessaging,
    /// Caller misuse; do not retry
    Programmer,
}

/// Error type for OpenPGP card sessions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Failure below the session: transport, encoding or response parsing
    #[error(transparent)]
    Apdu(#[from] sectoken_apdu_core::Error),

    /// Token answered with a non-success status word
    #[error("{}: {} ({})", .message, .status, .status.description())]
    Card {
        /// Operation that failed
        message: &'static str,
        /// Status word returned by the token
        status: StatusWord,
    },

    /// A non-final segment of a command chain was rejected
    #[error("Failed to chain APDU {step}/{total}, status {status}")]
    ChainAborted {
        /// 1-based index of the failing segment
        step: usize,
        /// Number of segments in the chain
        total: usize,
        /// Status word of the failing segment
        status: StatusWord,
    },

    /// The token supports neither extended length nor chaining for this command
    #[error("Can't transmit command")]
    CannotTransmit,

    /// The token kept answering `61 XX`
    #[error("Response continuation exceeded {rounds} GET RESPONSE rounds")]
    ContinuationLimit {
        /// Rounds performed before giving up
        rounds: usize,
    },

    /// Secure messaging failed and was cleared
    #[error("Secure messaging {stage} failure: {source}")]
    SecureMessaging {
        /// What was being done
        stage: SecureMessagingStage,
        /// Underlying failure
        #[source]
        source: SecureMessagingError,
    },

    /// PIN verification requested but the session holds no PIN
    #[error("Session was not created with a PIN for {0}")]
    MissingPin(PinClass),

    /// Operation needs a completed bring-up
    #[error("Session is not connected")]
    NotConnected,

    /// Card data could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(&'static str),
}

impl Error {
    /// Non-success status word for a named operation
    pub const fn card(message: &'static str, status: StatusWord) -> Self {
        Self::Card { message, status }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Apdu(e) if e.is_transport() => ErrorKind::Transport,
            Self::Apdu(_) | Self::ChainAborted { .. } | Self::CannotTransmit => {
                ErrorKind::Protocol
            }
            Self::ContinuationLimit { .. } | Self::InvalidData(_) => ErrorKind::Protocol,
            Self::Card { .. } => ErrorKind::Card,
            Self::SecureMessaging { .. } => ErrorKind::SecureMessaging,
            Self::MissingPin(_) | Self::NotConnected => ErrorKind::Programmer,
        }
    }

    /// The token was removed or reset, so nothing learned from it still holds
    pub fn is_card_state_lost(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_card_state_lost(),
            Self::Apdu(e) => matches!(e.root(), sectoken_apdu_core::Error::Transport(t) if t.is_card_state_lost()),
            _ => false,
        }
    }

    /// Status word carried by the error, if any
    pub fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::Card { status, .. } | Self::ChainAborted { status, .. } => Some(*status),
            Self::Apdu(sectoken_apdu_core::Error::Response(e)) => e.status_word(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let status = StatusWord::new(0x69, 0x82);
        assert_eq!(Error::card("Bad PIN", status).kind(), ErrorKind::Card);
        assert_eq!(Error::CannotTransmit.kind(), ErrorKind::Protocol);
        assert_eq!(Error::MissingPin(PinClass::Signature).kind(), ErrorKind::Programmer);
        assert_eq!(
            Error::from(TransportError::NoCard).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            Error::from(sectoken_apdu_core::Error::from(TransportError::Timeout)).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            Error::SecureMessaging {
                stage: SecureMessagingStage::Unwrap,
                source: SecureMessagingError::MacMismatch,
            }
            .kind(),
            ErrorKind::SecureMessaging
        );
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::ChainAborted {
            step: 2,
            total: 3,
            status: StatusWord::new(0x67, 0x00),
        };
        assert_eq!(err.to_string(), "Failed to chain APDU 2/3, status 67 00");
        assert_eq!(err.status_word(), Some(StatusWord::new(0x67, 0x00)));

        let err = Error::card("Bad PIN", StatusWord::new(0x63, 0xC2));
        assert!(err.to_string().starts_with("Bad PIN: 63 C2"));
        assert_eq!(Error::NotConnected.status_word(), None);
    }
}
