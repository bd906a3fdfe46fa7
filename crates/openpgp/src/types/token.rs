use std::fmt;

/// Physical channel a token is reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// Contact reader (PC/SC)
    Contact,
    /// NFC
    Contactless,
    /// USB CCID device
    UsbCcid,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contact => write!(f, "contact"),
            Self::Contactless => write!(f, "contactless"),
            Self::UsbCcid => write!(f, "usb-ccid"),
        }
    }
}

/// Kind of token hosting the OpenPGP application, resolved once at bring-up
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Generic OpenPGP card
    OpenPgpCard,
    /// OpenPGP applet hosted on a Fidesmo card
    Fidesmo,
    /// Vendor token identified by the transport (e.g. from USB ids)
    Vendor {
        /// Product name reported by the transport
        name: String,
    },
    /// Nothing more specific is known
    Unknown,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenPgpCard => write!(f, "OpenPGP card"),
            Self::Fidesmo => write!(f, "Fidesmo"),
            Self::Vendor { name } => write!(f, "{name}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// On-card key slots, in fingerprint block order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Signature key
    Signature,
    /// Decryption key
    Encryption,
    /// Authentication key
    Authentication,
}

impl KeyType {
    /// Position of the key's fingerprint in the fingerprint block
    pub const fn index(self) -> usize {
        match self {
            Self::Signature => 0,
            Self::Encryption => 1,
            Self::Authentication => 2,
        }
    }
}
