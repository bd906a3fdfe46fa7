//! Secure messaging contract
//!
//! The cipher suites live outside this crate. A [`SecureMessagingProvider`]
//! runs the key agreement over an [`ApduChannel`] and hands back a
//! [`SecureMessaging`] that the session applies to every later exchange.

use std::fmt;

use sectoken_apdu_core::{Command, Response};

use crate::types::OpenPgpCapabilities;

/// Errors raised by secure messaging implementations
#[derive(Debug, thiserror::Error)]
pub enum SecureMessagingError {
    /// No usable secure messaging session
    #[error("Secure messaging not established")]
    NotEstablished,

    /// Token and host disagree on the MAC
    #[error("MAC verification failed")]
    MacMismatch,

    /// Protected data objects are malformed
    #[error("Malformed secure messaging data: {0}")]
    Malformed(&'static str),

    /// Encryption or decryption failed
    #[error("Cipher failure: {0}")]
    Cipher(String),

    /// Key agreement was rejected
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The card offers secure messaging but nothing here can speak it
    #[error("No secure messaging provider for this token")]
    Unavailable,

    /// Exchange with the card failed during key agreement
    #[error("Channel error during handshake: {0}")]
    Channel(#[source] Box<crate::Error>),
}

/// An established secure messaging session
pub trait SecureMessaging: Send + fmt::Debug {
    /// Keys are in place and wrapping is active
    fn is_established(&self) -> bool;

    /// Encrypt and authenticate an outgoing command
    fn encrypt_and_sign(&mut self, command: &Command) -> Result<Command, SecureMessagingError>;

    /// Verify and decrypt a reassembled response
    fn verify_and_decrypt(&mut self, response: Response) -> Result<Response, SecureMessagingError>;

    /// Wipe session keys
    fn clear_session(&mut self);
}

/// Plaintext command exchange used while secure messaging is negotiated
pub trait ApduChannel {
    /// Send a command and return the reassembled response
    fn exchange(&mut self, command: &Command) -> crate::Result<Response>;
}

/// Establishes secure messaging for a freshly selected OpenPGP application
pub trait SecureMessagingProvider: Send + Sync + fmt::Debug {
    /// Run the key agreement through `channel`
    fn establish(
        &self,
        channel: &mut dyn ApduChannel,
        capabilities: &OpenPgpCapabilities,
    ) -> Result<Box<dyn SecureMessaging>, SecureMessagingError>;
}
