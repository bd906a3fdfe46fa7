//! Card capabilities from the historical bytes (ISO/IEC 7816-4 §8.1.1)

use crate::{Error, Result};

const CATEGORY_COMPACT_TLV_WITH_STATUS: u8 = 0x00;
const TAG_CARD_CAPABILITIES: u8 = 0x73;
const MASK_CHAINING: u8 = 0x80;
const MASK_EXTENDED: u8 = 0x40;

/// Framing features of the card
///
/// The default value is the safe baseline used before the card has been
/// queried: short APDUs only, no chaining, no life cycle information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardCapabilities {
    chaining: bool,
    extended_length: bool,
    life_cycle_status: u8,
}

impl CardCapabilities {
    /// Create capabilities with the given framing features
    pub const fn new(extended_length: bool, chaining: bool) -> Self {
        Self {
            chaining,
            extended_length,
            life_cycle_status: 0,
        }
    }

    /// Parse the historical bytes of the card
    ///
    /// Only category indicator `00` is accepted: compact-TLV objects followed
    /// by a mandatory three byte status indicator (LCS, SW1, SW2).
    pub fn from_historical_bytes(historical_bytes: &[u8]) -> Result<Self> {
        let Some((&category, rest)) = historical_bytes.split_first() else {
            return Err(Error::InvalidData("Empty historical bytes"));
        };
        if category != CATEGORY_COMPACT_TLV_WITH_STATUS {
            return Err(Error::InvalidData(
                "Invalid historical bytes category indicator byte",
            ));
        }
        if rest.len() < 3 {
            return Err(Error::InvalidData("Missing status indicator"));
        }

        let (mut objects, status) = rest.split_at(rest.len() - 3);
        let mut capabilities = Self {
            life_cycle_status: status[0],
            ..Self::default()
        };

        while let Some((&header, tail)) = objects.split_first() {
            let len = (header & 0x0F) as usize;
            if tail.len() < len {
                return Err(Error::InvalidData("Truncated compact-TLV object"));
            }
            let (value, next) = tail.split_at(len);
            if header == TAG_CARD_CAPABILITIES {
                capabilities.chaining = value[2] & MASK_CHAINING != 0;
                capabilities.extended_length = value[2] & MASK_EXTENDED != 0;
            }
            objects = next;
        }

        Ok(capabilities)
    }

    /// Command chaining is supported
    pub const fn has_chaining(&self) -> bool {
        self.chaining
    }

    /// Extended Lc and Le fields are supported
    pub const fn has_extended_length(&self) -> bool {
        self.extended_length
    }

    /// The card reports a life cycle status
    pub const fn has_life_cycle_management(&self) -> bool {
        self.life_cycle_status != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_default_is_baseline() {
        let caps = CardCapabilities::default();
        assert!(!caps.has_chaining());
        assert!(!caps.has_extended_length());
        assert!(!caps.has_life_cycle_management());
    }

    #[test]
    fn test_parse_yubikey_historical_bytes() {
        let caps = CardCapabilities::from_historical_bytes(&hex!("0073 0000E0 059000")).unwrap();
        assert!(caps.has_chaining());
        assert!(caps.has_extended_length());
        assert!(caps.has_life_cycle_management());
    }

    #[test]
    fn test_parse_chaining_only() {
        // Card service data object ahead of the capabilities
        let caps =
            CardCapabilities::from_historical_bytes(&hex!("00 31C5 73 000080 009000")).unwrap();
        assert!(caps.has_chaining());
        assert!(!caps.has_extended_length());
        assert!(!caps.has_life_cycle_management());
    }

    #[test]
    fn test_reject_malformed_historical_bytes() {
        assert!(CardCapabilities::from_historical_bytes(&[]).is_err());
        assert!(CardCapabilities::from_historical_bytes(&hex!("80 73 0000E0")).is_err());
        assert!(CardCapabilities::from_historical_bytes(&hex!("00 9000")).is_err());
        assert!(CardCapabilities::from_historical_bytes(&hex!("00 73 00 059000")).is_err());
    }
}
