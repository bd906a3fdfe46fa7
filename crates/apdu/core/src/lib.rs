//! Core types and traits for APDU (Application Protocol Data Unit) exchanges
//!
//! This crate provides the foundational types for talking to smart cards
//! according to ISO/IEC 7816-4.
//!
//! ## Overview
//!
//! APDU is the message format used by smart cards. This crate provides:
//!
//! - Building and parsing command APDUs in short and extended form
//! - Parsing response APDUs and interpreting status words
//! - The [`CardTransport`] trait implemented by byte-level channels
//! - Error types shared by transports and higher protocol layers
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod response;
pub mod transport;

pub use command::{Command, CommandError, ExpectedLength};
pub use error::{Error, ResultExt};
pub use response::status::StatusWord;
pub use response::{Response, ResponseError};
pub use transport::{CardTransport, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, Command, Error, Response, ResultExt, StatusWord,
        command::ExpectedLength,
        response::status::common as status,
        response::utils,
        transport::{CardTransport, TransportError},
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        assert_eq!(cmd.cla, 0x00);
        assert_eq!(cmd.ins, 0xA4);
        assert_eq!(cmd.p1, 0x04);
        assert_eq!(cmd.p2, 0x00);

        let resp = Response::success(Bytes::from_static(&[0x01, 0x02, 0x03]));
        assert!(resp.is_success());
        assert_eq!(resp.data().as_ref(), &[0x01, 0x02, 0x03]);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}
