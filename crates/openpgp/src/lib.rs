//! Session engine for OpenPGP smart cards
//!
//! This crate drives the OpenPGP card application over any
//! [`CardTransport`](sectoken_apdu_core::CardTransport):
//!
//! - Command framing: extended length, short conversion or command chaining,
//!   picked from what the card advertises
//! - `61 XX` continuation with GET RESPONSE
//! - Optional secure messaging through a pluggable provider
//! - PIN verification state, including single-use PW1 for signatures
//! - Capability, fingerprint and identity queries
//! - Reuse of a live session through [`SessionCache`]
//!
//! ## Example
//!
//! ```no_run
//! use sectoken_openpgp::{KeyType, Pin, Session, share};
//! use sectoken_apdu_transport_pcsc::PcscDeviceManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = PcscDeviceManager::new()?;
//! let reader = manager
//!     .list_readers()?
//!     .into_iter()
//!     .find(|r| r.has_card())
//!     .ok_or("no card")?;
//! let transport = share(manager.open_reader(reader.name())?);
//!
//! let mut session = Session::new(transport, Some(Pin::from("123456")));
//! session.connect_if_necessary()?;
//! println!("{:02X?}", session.key_fingerprint(KeyType::Signature));
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod cache;
mod config;
pub mod constants;
mod error;
mod factory;
mod info;
mod pin;
mod secure_messaging;
mod session;
mod transport;
mod types;

#[cfg(test)]
mod testing;

pub use cache::{SessionCache, SharedSession};
pub use config::SessionConfig;
pub use error::{Error, ErrorKind, Result, SecureMessagingStage};
pub use factory::{CommandFactory, OpenPgpCommandFactory};
pub use info::{TokenInfo, parse_holder_name};
pub use pin::{Pin, PinClass, PinEvent, PinState, PinStates};
pub use secure_messaging::{
    ApduChannel, SecureMessaging, SecureMessagingError, SecureMessagingProvider,
};
pub use session::{ChainOutcome, Session, transmit_chain};
pub use transport::{SharedTransport, TokenTransport, share};
pub use types::{
    CardCapabilities, KeyType, OpenPgpCapabilities, SecureMessagingScheme, TokenType,
    TransportType,
};

pub use sectoken_apdu_transport_pcsc::{PcscDeviceManager, PcscTransport};
