//! Common test utilities

use std::collections::VecDeque;

use sectoken_apdu_core::{Bytes, CardTransport, TransportError};
use sectoken_openpgp::{SharedTransport, TokenTransport, TransportType, share};

/// Application Related Data of a card with extended length and chaining
pub const APPLICATION_RELATED_DATA: &[u8] = &hex_literal::hex!(
    "6E4A"
    "4F10 D2760001240103040006123456780000"
    "5F5208 0073 0000C0 059000"
    "732B"
    "  C00A 7D000BFE080000FF0000"
    "  C407 007F7F7F030003"
    "  C514 1111111111111111111111111111111111111111"
);

/// Transport answering every command from a script
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: VecDeque<Bytes>,
    pub sent: Vec<Bytes>,
    pub connected: bool,
}

impl ScriptedTransport {
    /// Queue a raw response (data followed by status word)
    pub fn respond(mut self, raw: &[u8]) -> Self {
        self.responses.push_back(Bytes::copy_from_slice(raw));
        self
    }

    /// Queue the responses to a bring-up: vendor probe, SELECT, GET DATA
    pub fn with_bring_up(self) -> Self {
        let mut ard = APPLICATION_RELATED_DATA.to_vec();
        ard.extend_from_slice(&[0x90, 0x00]);
        self.respond(&[0x6A, 0x82]).respond(&[0x90, 0x00]).respond(&ard)
    }

    /// Share the transport
    pub fn shared(self) -> SharedTransport<Self> {
        share(self)
    }
}

impl CardTransport for ScriptedTransport {
    type Error = TransportError;

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        if !self.connected {
            return Err(TransportError::Connection);
        }
        self.sent.push(Bytes::copy_from_slice(command));
        self.responses.pop_front().ok_or(TransportError::Transmission)
    }
}

impl TokenTransport for ScriptedTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Contact
    }

    fn is_persistent_connection_allowed(&self) -> bool {
        true
    }
}
