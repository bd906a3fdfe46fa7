//! OpenPGP card constants

/// Application identifier of the OpenPGP card application
pub const OPENPGP_AID: [u8; 6] = [0xD2, 0x76, 0x00, 0x01, 0x24, 0x01];

/// RID prefix of applets hosted by Fidesmo
pub const FIDESMO_APPS_AID_PREFIX: [u8; 5] = [0xA0, 0x00, 0x00, 0x06, 0x17];

/// Size of one key fingerprint in the fingerprint block
pub const FINGERPRINT_LENGTH: usize = 20;

/// Largest Ne a short APDU can request
pub const MAX_SHORT_NE: u32 = sectoken_apdu_core::command::MAX_SHORT_NE;

/// Ne used for commands whose response size is unknown
pub const MAX_EXTENDED_NE: u32 = sectoken_apdu_core::command::MAX_EXTENDED_NE;

/// Instruction bytes
pub mod ins {
    /// SELECT
    pub const SELECT: u8 = 0xA4;
    /// GET DATA
    pub const GET_DATA: u8 = 0xCA;
    /// GET RESPONSE
    pub const GET_RESPONSE: u8 = 0xC0;
    /// VERIFY
    pub const VERIFY: u8 = 0x20;
    /// PERFORM SECURITY OPERATION
    pub const PSO: u8 = 0x2A;
}

/// Data object tags
pub mod tags {
    /// Application related data
    pub const APPLICATION_RELATED_DATA: u16 = 0x006E;
    /// Application identifier
    pub const AID: &[u8] = &[0x4F];
    /// Historical bytes
    pub const HISTORICAL_BYTES: &[u8] = &[0x5F, 0x52];
    /// Extended capabilities
    pub const EXTENDED_CAPABILITIES: &[u8] = &[0xC0];
    /// PW status bytes
    pub const PW_STATUS_BYTES: &[u8] = &[0xC4];
    /// Fingerprints of the signature, decryption and authentication keys
    pub const FINGERPRINTS: &[u8] = &[0xC5];
    /// Cardholder related data
    pub const CARDHOLDER_RELATED_DATA: u16 = 0x0065;
    /// URL of the public key
    pub const URL: u16 = 0x5F50;
}
