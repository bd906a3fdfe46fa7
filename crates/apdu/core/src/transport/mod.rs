//! Transport traits for APDU communication with cards
//!
//! A transport moves raw frames between host and card. It knows nothing about
//! chaining, continuation or secure messaging; those live in the layers above.

pub mod error;

use std::fmt;

use bytes::Bytes;
pub use error::TransportError;
use tracing::{debug, trace};

use crate::{Command, Response};

/// Trait for byte-level card transports
pub trait CardTransport: Send + fmt::Debug {
    /// Error type returned by the transport
    type Error: Into<crate::Error> + fmt::Debug;

    /// Open the physical channel to the card
    fn connect(&mut self) -> Result<(), Self::Error>;

    /// Check if the transport is connected to a physical card
    fn is_connected(&self) -> bool;

    /// Reset the transport connection
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Send raw APDU bytes to card and return response bytes
    ///
    /// Implementors override [`CardTransport::do_transmit_raw`]; this wrapper
    /// only adds tracing.
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        trace!(command = %hex::encode(command), "Transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode(response), "Received raw response");
            }
            Err(e) => {
                debug!(error = ?e, "Transport error during transmission");
            }
        }
        result
    }

    /// Exchange exactly one frame with the card
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error>;

    /// Serialise a command, exchange it and parse the response
    fn transmit(&mut self, command: &Command) -> Result<Response, crate::Error> {
        command.validate()?;
        let raw = self.transmit_raw(&command.to_bytes()).map_err(Into::into)?;
        Ok(Response::from_bytes(&raw)?)
    }
}
