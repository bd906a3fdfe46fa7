//! PC/SC transport implementation for APDU exchanges
//!
//! This crate implements the `CardTransport` trait from `sectoken-apdu-core`
//! on top of the PC/SC API.
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sectoken_apdu_core::{CardTransport, Command};
//! use sectoken_apdu_transport_pcsc::{ConnectStrategy, PcscConfig, PcscDeviceManager};
//!
//! let manager = PcscDeviceManager::new()?;
//! for reader in manager.list_readers()? {
//!     println!("{} (card: {})", reader.name(), reader.has_card());
//! }
//!
//! let mut transport = manager.connect_strategy(ConnectStrategy::AnyCard, PcscConfig::default())?;
//! transport.connect()?;
//!
//! let select = Command::new_with_data(0x00, 0xA4, 0x04, 0x00, vec![0xD2, 0x76, 0x00, 0x01, 0x24, 0x01]);
//! let response = transport.transmit(&select)?;
//! println!("SELECT returned {}", response.status());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod config;
mod error;
mod manager;
mod reader;
mod transport;
mod util;

pub use config::{ConnectStrategy, PcscConfig, ShareMode};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use reader::{PcscReader, ReaderInterface};
pub use transport::PcscTransport;

// Re-export some pcsc types for convenience
pub use pcsc::{Protocol, Protocols};
