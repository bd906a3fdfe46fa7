//! Transport failures

/// Failure of the physical channel to a card
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The channel could not be opened or is not open
    #[error("Failed to connect to card")]
    Connection,

    /// A frame could not be exchanged
    #[error("Failed to transmit data")]
    Transmission,

    /// Reader missing or unusable
    #[error("Reader unavailable")]
    Device,

    /// No card in the reader
    #[error("No card present")]
    NoCard,

    /// The card was removed during the session
    #[error("Card removed")]
    CardRemoved,

    /// The card was reset by another party; its application state is gone
    #[error("Card reset")]
    CardReset,

    /// Driver-specific error code
    #[error("Driver error code: {0:#x}")]
    Driver(i32),

    /// The card did not answer in time
    #[error("Operation timed out")]
    Timeout,

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Driver error from a raw code
    pub const fn driver(code: i32) -> Self {
        Self::Driver(code)
    }

    /// Free-form error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }

    /// The card lost its state and any session on it must be brought up again
    pub const fn is_card_state_lost(&self) -> bool {
        matches!(self, Self::CardRemoved | Self::CardReset | Self::NoCard)
    }
}
