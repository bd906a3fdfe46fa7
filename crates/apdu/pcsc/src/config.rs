//! Configuration options for PC/SC transport

use pcsc::{Protocols as PcscProtocols, ShareMode as PcscShareMode};

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Exclusive access to the card
    Exclusive,
    /// Shared access to the card (default)
    Shared,
    /// Direct connection to the reader
    Direct,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
            ShareMode::Direct => Self::Direct,
        }
    }
}

/// Strategy for picking the reader to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectStrategy {
    /// A specific reader by name
    Reader(String),

    /// The first reader holding a card
    AnyCard,

    /// The first reader whose card ATR matches this pattern
    CardWithAtr(Vec<u8>, Option<Vec<u8>>), // (ATR, mask)

    /// The first reader, card or not
    FirstAvailable,
}

/// Configuration options for PC/SC transport
#[derive(Debug, Clone)]
pub struct PcscConfig {
    /// Sharing mode for card connections
    pub share_mode: ShareMode,

    /// Preferred protocols for card communication
    pub protocols: PcscProtocols,

    /// Reconnect when the card reports a reset
    ///
    /// The failing frame is not resent and the reset is still returned.
    pub auto_reconnect: bool,
}

impl Default for PcscConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Shared,
            protocols: PcscProtocols::ANY,
            auto_reconnect: true,
        }
    }
}

impl PcscConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the preferred protocols
    pub const fn with_protocols(mut self, protocols: PcscProtocols) -> Self {
        self.protocols = protocols;
        self
    }

    /// Set whether to automatically reconnect
    pub const fn with_auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.auto_reconnect = auto_reconnect;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = PcscConfig::new()
            .with_share_mode(ShareMode::Exclusive)
            .with_protocols(PcscProtocols::T1)
            .with_auto_reconnect(false);

        assert_eq!(config.share_mode, ShareMode::Exclusive);
        assert_eq!(config.protocols, PcscProtocols::T1);
        assert!(!config.auto_reconnect);

        let default = PcscConfig::default();
        assert_eq!(default.share_mode, ShareMode::Shared);
        assert!(default.auto_reconnect);
    }

    #[test]
    fn test_share_mode_conversion() {
        assert_eq!(PcscShareMode::from(ShareMode::Shared), PcscShareMode::Shared);
        assert_eq!(PcscShareMode::from(ShareMode::Direct), PcscShareMode::Direct);
    }
}
