//! Reader discovery results

use pcsc::{ReaderState, State};

use crate::util::{is_contactless_atr, is_contactless_reader_name, match_atr};

/// Physical interface a reader talks to the card through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderInterface {
    /// ISO 7816-3 contacts (includes USB tokens exposing a CCID reader)
    Contact,
    /// ISO 14443 field
    Contactless,
}

/// Snapshot of a PC/SC reader taken while listing
#[derive(Debug, Clone)]
pub struct PcscReader {
    name: String,
    atr: Option<Vec<u8>>,
}

impl PcscReader {
    /// Reader with an optional card ATR; a present ATR means a card is inserted
    pub const fn new(name: String, atr: Option<Vec<u8>>) -> Self {
        Self { name, atr }
    }

    pub(crate) fn from_reader_state(reader_state: &ReaderState) -> Self {
        let state = reader_state.event_state();
        let present = state.contains(State::PRESENT) && !state.contains(State::EMPTY);

        Self::new(
            reader_state.name().to_string_lossy().into_owned(),
            present.then(|| reader_state.atr().to_vec()),
        )
    }

    /// Reader name as reported by PC/SC
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A card is inserted
    pub const fn has_card(&self) -> bool {
        self.atr.is_some()
    }

    /// ATR of the inserted card
    pub fn atr(&self) -> Option<&[u8]> {
        self.atr.as_deref()
    }

    /// Card ATR starts with `pattern` under `mask`
    pub fn atr_matches(&self, pattern: &[u8], mask: Option<&[u8]>) -> bool {
        self.atr().is_some_and(|atr| match_atr(atr, pattern, mask))
    }

    /// Interface guessed from the card ATR, falling back to the reader name
    pub fn interface(&self) -> ReaderInterface {
        if self.atr().is_some_and(is_contactless_atr) || is_contactless_reader_name(&self.name) {
            ReaderInterface::Contactless
        } else {
            ReaderInterface::Contact
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_presence_follows_atr() {
        let empty = PcscReader::new("Generic CCID Reader 00 00".into(), None);
        assert!(!empty.has_card());
        assert!(!empty.atr_matches(&[0x3B], None));

        let yubikey = PcscReader::new(
            "Yubico YubiKey OTP+FIDO+CCID 00 00".into(),
            Some(vec![0x3B, 0xFD, 0x13, 0x00, 0x00, 0x81, 0x31, 0xFE]),
        );
        assert!(yubikey.has_card());
        assert!(yubikey.atr_matches(&[0x3B, 0xFD], None));
        assert_eq!(yubikey.interface(), ReaderInterface::Contact);
    }

    #[test]
    fn test_contactless_interface() {
        let by_name = PcscReader::new("ACS ACR1252 Dual Reader PICC 00 01".into(), None);
        assert_eq!(by_name.interface(), ReaderInterface::Contactless);

        let by_atr = PcscReader::new(
            "ACS ACR1252 Dual Reader 00 00".into(),
            Some(vec![
                0x3B, 0x8A, 0x80, 0x01, 0x00, 0x31, 0xC1, 0x73, 0xC8, 0x40, 0x00, 0x00, 0x90,
                0x00, 0x90,
            ]),
        );
        assert_eq!(by_atr.interface(), ReaderInterface::Contactless);
    }
}
