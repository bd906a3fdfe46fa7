//! OpenPGP application capabilities from Application Related Data (`6E`)

use std::fmt;

use iso7816_tlv::ber::Tlv;

use super::{CardCapabilities, find_primitive};
use crate::constants::tags;
use crate::{Error, Result};

const FLAG_SECURE_MESSAGING: u8 = 0x80;
const FLAG_GET_CHALLENGE: u8 = 0x40;
const FLAG_KEY_IMPORT: u8 = 0x20;
const FLAG_PW_STATUS_CHANGEABLE: u8 = 0x10;

/// Secure messaging algorithm advertised in the extended capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureMessagingScheme {
    /// AES-128 session keys
    Aes128,
    /// AES-256 session keys
    Aes256,
    /// GlobalPlatform SCP11b
    Scp11b,
    /// Not known to this crate
    Other(u8),
}

impl From<u8> for SecureMessagingScheme {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::Aes128,
            0x02 => Self::Aes256,
            0x03 => Self::Scp11b,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for SecureMessagingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes128 => write!(f, "AES-128"),
            Self::Aes256 => write!(f, "AES-256"),
            Self::Scp11b => write!(f, "SCP11b"),
            Self::Other(id) => write!(f, "unknown ({id:#04x})"),
        }
    }
}

/// What the OpenPGP application reports about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPgpCapabilities {
    aid: Vec<u8>,
    historical_bytes: Vec<u8>,
    card_capabilities: CardCapabilities,
    extended_capabilities: Option<[u8; 2]>,
    pw_status_bytes: Option<Vec<u8>>,
    fingerprints: Option<Vec<u8>>,
}

impl OpenPgpCapabilities {
    /// Parse the response to GET DATA `6E`
    ///
    /// Cards differ in whether the `6E` template itself is included, so both
    /// the wrapped and the flat form are accepted.
    pub fn from_application_related_data(data: &[u8]) -> Result<Self> {
        let tlvs = Tlv::parse_all(data);
        if tlvs.is_empty() {
            return Err(Error::InvalidData("Empty application related data"));
        }

        let historical_bytes = find_primitive(&tlvs, tags::HISTORICAL_BYTES)
            .ok_or(Error::InvalidData("Missing historical bytes"))?
            .to_vec();
        let card_capabilities = CardCapabilities::from_historical_bytes(&historical_bytes)?;

        let extended_capabilities = find_primitive(&tlvs, tags::EXTENDED_CAPABILITIES)
            .and_then(|value| value.get(..2))
            .map(|value| [value[0], value[1]]);

        Ok(Self {
            aid: find_primitive(&tlvs, tags::AID)
                .map(<[u8]>::to_vec)
                .unwrap_or_default(),
            historical_bytes,
            card_capabilities,
            extended_capabilities,
            pw_status_bytes: find_primitive(&tlvs, tags::PW_STATUS_BYTES).map(<[u8]>::to_vec),
            fingerprints: find_primitive(&tlvs, tags::FINGERPRINTS).map(<[u8]>::to_vec),
        })
    }

    /// Full application identifier (includes manufacturer and serial number)
    pub fn aid(&self) -> &[u8] {
        &self.aid
    }

    /// Raw historical bytes
    pub fn historical_bytes(&self) -> &[u8] {
        &self.historical_bytes
    }

    /// Framing capabilities from the historical bytes
    pub const fn card_capabilities(&self) -> CardCapabilities {
        self.card_capabilities
    }

    /// PW status bytes (`C4`)
    pub fn pw_status_bytes(&self) -> Option<&[u8]> {
        self.pw_status_bytes.as_deref()
    }

    /// Concatenated 20-byte fingerprints of all key slots (`C5`)
    pub fn fingerprints(&self) -> Option<&[u8]> {
        self.fingerprints.as_deref()
    }

    /// PW1 stays verified across several PSO:CDS commands
    pub fn is_pw1_valid_for_multiple_signatures(&self) -> bool {
        self.pw_status_bytes
            .as_deref()
            .and_then(<[u8]>::first)
            .is_some_and(|&policy| policy == 0x01)
    }

    fn has_flag(&self, flag: u8) -> bool {
        self.extended_capabilities
            .is_some_and(|[flags, _]| flags & flag != 0)
    }

    /// Secure messaging scheme, if the card supports one
    pub fn secure_messaging_scheme(&self) -> Option<SecureMessagingScheme> {
        match self.extended_capabilities {
            Some([flags, algorithm]) if flags & FLAG_SECURE_MESSAGING != 0 => {
                Some(algorithm.into())
            }
            _ => None,
        }
    }

    /// Card offers SCP11b secure messaging
    pub fn has_scp11b_secure_messaging(&self) -> bool {
        self.secure_messaging_scheme() == Some(SecureMessagingScheme::Scp11b)
    }

    /// GET CHALLENGE is supported
    pub fn has_get_challenge(&self) -> bool {
        self.has_flag(FLAG_GET_CHALLENGE)
    }

    /// Private keys can be imported
    pub fn has_key_import(&self) -> bool {
        self.has_flag(FLAG_KEY_IMPORT)
    }

    /// The PW1 signature policy byte can be changed
    pub fn has_pw_status_changeable(&self) -> bool {
        self.has_flag(FLAG_PW_STATUS_CHANGEABLE)
    }
}
