//! APDU response definitions
//!
//! This module provides the response APDU value type and status word
//! helpers according to ISO/IEC 7816-4.

pub mod error;
pub mod status;
pub mod utils;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

pub use error::ResponseError;
use status::StatusWord;

/// Response APDU: payload bytes followed by a two-byte status word
///
/// Reassembled responses carry the concatenated payload of every fragment
/// and the status word of the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    data: Bytes,
    status: StatusWord,
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(data: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            data: data.into(),
            status: status.into(),
        }
    }

    /// Create a success (90 00) response
    pub const fn success(data: Bytes) -> Self {
        Self {
            data,
            status: status::common::SUCCESS,
        }
    }

    /// Create a payload-less response from a status word
    pub fn error(status: impl Into<StatusWord>) -> Self {
        Self {
            data: Bytes::new(),
            status: status.into(),
        }
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ResponseError> {
        let (status, payload) = utils::extract_status_and_payload(raw)?;

        trace!(
            sw1 = format_args!("{:#04x}", status.sw1),
            sw2 = format_args!("{:#04x}", status.sw2),
            payload_len = payload.len(),
            "Parsed APDU response"
        );

        Ok(Self {
            data: Bytes::copy_from_slice(payload),
            status,
        })
    }

    /// Response payload without the status word
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Status word terminating the response
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Status is exactly 90 00
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Serialise back to payload followed by SW1 SW2
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.data.len() + 2);
        buf.put_slice(&self.data);
        buf.put_u8(self.status.sw1);
        buf.put_u8(self.status.sw2);
        buf.freeze()
    }

    /// Take the payload, or the status word as an error when not successful
    pub fn into_result(self) -> Result<Bytes, ResponseError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ResponseError::Status(self.status))
        }
    }

    /// Split into payload and status word
    pub fn into_parts(self) -> (Bytes, StatusWord) {
        (self.data, self.status)
    }
}

impl TryFrom<&[u8]> for Response {
    type Error = ResponseError;

    fn try_from(data: &[u8]) -> Result<Self, ResponseError> {
        Self::from_bytes(data)
    }
}

impl TryFrom<Bytes> for Response {
    type Error = ResponseError;

    fn try_from(data: Bytes) -> Result<Self, ResponseError> {
        Self::from_bytes(&data)
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        response.to_bytes()
    }
}
