//! Error types for PC/SC transport

use sectoken_apdu_core::TransportError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// Error reported by the PC/SC service
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in reader
    #[error("No card present in reader: {0}")]
    NoCard(String),
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::Pcsc(pcsc::Error::NoSmartcard) | PcscError::NoCard(_) => Self::NoCard,
            PcscError::Pcsc(pcsc::Error::RemovedCard) => Self::CardRemoved,
            PcscError::Pcsc(pcsc::Error::ResetCard) => Self::CardReset,
            PcscError::Pcsc(pcsc::Error::Timeout) => Self::Timeout,
            PcscError::Pcsc(e) => Self::Driver(e as i32),
            PcscError::NoReadersAvailable | PcscError::ReaderNotFound(_) => Self::Device,
        }
    }
}

impl From<PcscError> for sectoken_apdu_core::Error {
    fn from(error: PcscError) -> Self {
        TransportError::from(error).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_mapping() {
        assert_eq!(
            TransportError::from(PcscError::Pcsc(pcsc::Error::RemovedCard)),
            TransportError::CardRemoved
        );
        assert_eq!(
            TransportError::from(PcscError::Pcsc(pcsc::Error::ResetCard)),
            TransportError::CardReset
        );
        assert_eq!(
            TransportError::from(PcscError::NoCard("Yubikey".into())),
            TransportError::NoCard
        );
        assert_eq!(
            TransportError::from(PcscError::Pcsc(pcsc::Error::Timeout)),
            TransportError::Timeout
        );
        assert_eq!(
            TransportError::from(PcscError::NoReadersAvailable),
            TransportError::Device
        );
        assert!(matches!(
            TransportError::from(PcscError::Pcsc(pcsc::Error::SharingViolation)),
            TransportError::Driver(_)
        ));
    }
}
