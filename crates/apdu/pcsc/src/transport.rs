//! PC/SC transport implementation

use std::{ffi::CString, fmt};

use bytes::Bytes;
use pcsc::{Card, Context, Disposition, MAX_BUFFER_SIZE_EXTENDED};
use sectoken_apdu_core::CardTransport;
use tracing::debug;

use crate::reader::ReaderInterface;
use crate::util::{is_contactless_atr, is_contactless_reader_name};
use crate::{config::PcscConfig, error::PcscError};

/// Transport implementation using PC/SC
///
/// The card is connected lazily, so a transport can be created for an empty
/// reader and connected once a token is inserted.
pub struct PcscTransport {
    context: Context,
    card: Option<Card>,
    reader_name: String,
    config: PcscConfig,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscTransport {
    pub(crate) fn new(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        if reader_name.is_empty() {
            return Err(PcscError::ReaderNotFound(reader_name.to_string()));
        }

        Ok(Self {
            context,
            card: None,
            reader_name: reader_name.to_string(),
            config,
        })
    }

    fn connect_card(&mut self) -> Result<(), PcscError> {
        if self.card.is_some() {
            return Ok(());
        }

        let reader_cstr = CString::new(self.reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;

        match self.context.connect(
            &reader_cstr,
            self.config.share_mode.into(),
            self.config.protocols,
        ) {
            Ok(card) => {
                debug!(reader = %self.reader_name, "Connected to card");
                self.card = Some(card);
                Ok(())
            }
            Err(pcsc::Error::NoSmartcard) => Err(PcscError::NoCard(self.reader_name.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the ATR of the current card
    pub fn atr(&self) -> Result<Vec<u8>, PcscError> {
        self.card.as_ref().map_or_else(
            || Err(PcscError::NoCard(self.reader_name.clone())),
            |card| {
                card.get_attribute_owned(pcsc::Attribute::AtrString)
                    .map_err(Into::into)
            },
        )
    }

    /// Get the reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Interface to the card, from the ATR when connected and the reader name otherwise
    pub fn interface(&self) -> ReaderInterface {
        let contactless_atr = self.atr().is_ok_and(|atr| is_contactless_atr(&atr));
        if contactless_atr || is_contactless_reader_name(&self.reader_name) {
            ReaderInterface::Contactless
        } else {
            ReaderInterface::Contact
        }
    }

    fn transmit_command(&mut self, command: &[u8]) -> Result<Bytes, PcscError> {
        self.connect_card()?;

        let card = self
            .card
            .as_mut()
            .ok_or_else(|| PcscError::NoCard(self.reader_name.clone()))?;

        let mut response_buffer = vec![0u8; MAX_BUFFER_SIZE_EXTENDED];

        match card.transmit(command, &mut response_buffer) {
            Ok(response) => Ok(Bytes::copy_from_slice(response)),
            Err(e) => {
                if is_connection_lost(e) {
                    debug!(reader = %self.reader_name, error = %e, "Card connection lost");
                    self.card = None;

                    // The frame is never resent: the card lost its selected
                    // application, so the caller has to bring it up again
                    if reconnects_after(e, self.config.auto_reconnect) {
                        if let Err(reconnect) = self.connect_card() {
                            debug!(error = %reconnect, "Reconnect after reset failed");
                        }
                    }
                }

                Err(e.into())
            }
        }
    }
}

const fn is_connection_lost(error: pcsc::Error) -> bool {
    matches!(error, pcsc::Error::ResetCard | pcsc::Error::RemovedCard)
}

const fn reconnects_after(error: pcsc::Error, auto_reconnect: bool) -> bool {
    auto_reconnect && matches!(error, pcsc::Error::ResetCard)
}

impl CardTransport for PcscTransport {
    type Error = PcscError;

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.connect_card()
    }

    fn is_connected(&self) -> bool {
        self.card.is_some()
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::ResetCard) {
                debug!(error = %e, "Failed to reset card on disconnect");
            }
        }

        self.connect_card()
    }

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        self.transmit_command(command)
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::LeaveCard);
        }
    }
}
