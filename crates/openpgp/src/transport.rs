//! Token transports
//!
//! A [`TokenTransport`] is a [`CardTransport`] that also knows how it reaches
//! the token. Transports are owned by the caller and shared with sessions.

use std::sync::Arc;

use parking_lot::Mutex;
use sectoken_apdu_core::CardTransport;
use sectoken_apdu_transport_pcsc::{PcscTransport, ReaderInterface};

use crate::types::{TokenType, TransportType};

/// Transport shared between the caller, sessions and the session cache
pub type SharedTransport<T> = Arc<Mutex<T>>;

/// Wrap a transport for sharing
pub fn share<T: TokenTransport>(transport: T) -> SharedTransport<T> {
    Arc::new(Mutex::new(transport))
}

/// Byte-level channel to a token, plus what it knows about the connection
pub trait TokenTransport: CardTransport {
    /// Channel kind
    fn transport_type(&self) -> TransportType;

    /// The connection survives between operations and may be reused
    fn is_persistent_connection_allowed(&self) -> bool;

    /// Token type, when the transport can tell without probing
    fn token_type_if_available(&self) -> Option<TokenType> {
        None
    }
}

impl From<ReaderInterface> for TransportType {
    fn from(interface: ReaderInterface) -> Self {
        match interface {
            ReaderInterface::Contact => Self::Contact,
            ReaderInterface::Contactless => Self::Contactless,
        }
    }
}

impl TokenTransport for PcscTransport {
    fn transport_type(&self) -> TransportType {
        self.interface().into()
    }

    // A token in the field can leave at any moment
    fn is_persistent_connection_allowed(&self) -> bool {
        self.interface() == ReaderInterface::Contact
    }
}
