//! Token information snapshot

use tracing::warn;

use crate::constants::FINGERPRINT_LENGTH;
use crate::types::{TokenType, TransportType};

/// What a connected token reports about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// How the token is reached
    pub transport_type: TransportType,
    /// Token family
    pub token_type: TokenType,
    /// Fingerprints of the signature, decryption and authentication keys
    pub fingerprints: Vec<[u8; FINGERPRINT_LENGTH]>,
    /// Full application identifier
    pub aid: Vec<u8>,
    /// Cardholder name
    pub user_id: String,
    /// Public key URL
    pub url: String,
    /// Remaining PW1 attempts
    pub pw1_retry_counter: u8,
    /// Remaining PW3 attempts
    pub pw3_retry_counter: u8,
    /// Historical bytes carry a life cycle status
    pub has_life_cycle_management: bool,
}

impl TokenInfo {
    /// Serial number embedded in the AID (bytes 10..14), as hex
    pub fn serial_number(&self) -> Option<String> {
        self.aid.get(10..14).map(hex::encode_upper)
    }
}

/// Extract the name from cardholder related data (`65`)
///
/// The name is a `5B` object at the start of the template; the filler `<`
/// separating surname and given name becomes a space. Tokens that return
/// truncated data yield an empty name.
pub fn parse_holder_name(data: &[u8]) -> String {
    let Some(&len) = data.get(3) else {
        warn!(len = data.len(), "Cardholder data too short, no holder name");
        return String::new();
    };
    let Some(name) = data.get(4..4 + usize::from(len)) else {
        warn!(len = data.len(), declared = len, "Cardholder name truncated");
        return String::new();
    };
    String::from_utf8_lossy(name).replace('<', " ")
}
