//! APDU command definitions
//!
//! This module provides the command APDU value type and its ISO/IEC 7816-4
//! encoding in both short and extended form.

use bytes::{BufMut, Bytes, BytesMut};

/// Expected response length (Ne), from 1 up to [`MAX_EXTENDED_NE`]
pub type ExpectedLength = u32;

/// Largest data field a short APDU can carry
pub const MAX_SHORT_NC: usize = 255;
/// Largest response length a short APDU can request
pub const MAX_SHORT_NE: ExpectedLength = 256;
/// Largest data field an extended APDU can carry
pub const MAX_EXTENDED_NC: usize = 65535;
/// Largest response length an extended APDU can request
pub const MAX_EXTENDED_NE: ExpectedLength = 65536;
/// CLA bit signalling that more command segments follow
pub const CLA_CHAINING: u8 = 0x10;

/// Error for APDU command encoding and decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Raw command has an inconsistent length
    #[error("Invalid command length: {0}")]
    InvalidLength(usize),

    /// Data field exceeds the extended APDU limit
    #[error("Data too long: {0} bytes (max {1})")]
    DataTooLong(usize, usize),

    /// Expected length is zero or exceeds the extended APDU limit
    #[error("Expected length out of range: {0}")]
    ExpectedLengthOutOfRange(ExpectedLength),
}

/// Generic APDU command structure
///
/// Commands are plain values; the encoding (short or extended) is chosen
/// when they are serialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected response length, Ne (optional)
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Ne)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: None,
        }
    }

    /// Create a new command with both data and expected length
    pub fn new_with_data_and_le<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
        le: ExpectedLength,
    ) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: Some(le),
        }
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: ExpectedLength) -> Self {
        self.le = Some(le);
        self
    }

    /// Remove the expected length field
    pub const fn without_le(mut self) -> Self {
        self.le = None;
        self
    }

    /// Replace the class byte
    pub const fn with_class(mut self, cla: u8) -> Self {
        self.cla = cla;
        self
    }

    /// Command data, empty when absent
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Number of data bytes (Nc)
    pub fn nc(&self) -> usize {
        self.data.as_ref().map_or(0, Bytes::len)
    }

    /// Expected response length (Ne), zero when absent
    pub fn ne(&self) -> ExpectedLength {
        self.le.unwrap_or(0)
    }

    /// Whether this command needs the extended length encoding
    pub fn is_extended(&self) -> bool {
        self.nc() > MAX_SHORT_NC || self.ne() > MAX_SHORT_NE
    }

    /// Check that the command fits the extended APDU limits
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.nc() > MAX_EXTENDED_NC {
            return Err(CommandError::DataTooLong(self.nc(), MAX_EXTENDED_NC));
        }
        match self.le {
            Some(le) if le == 0 || le > MAX_EXTENDED_NE => {
                Err(CommandError::ExpectedLengthOutOfRange(le))
            }
            _ => Ok(()),
        }
    }

    /// Calculate length of serialized command
    pub fn command_length(&self) -> usize {
        // Header (CLA, INS, P1, P2) is always 4 bytes
        let mut length = 4;
        let extended = self.is_extended();
        let nc = self.nc();

        if nc > 0 {
            length += if extended { 3 + nc } else { 1 + nc };
        }

        if self.le.is_some() {
            length += match (extended, nc) {
                (false, _) => 1,
                (true, 0) => 3,
                (true, _) => 2,
            };
        }

        length
    }

    /// Convert to raw APDU bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());
        let extended = self.is_extended();
        let nc = self.nc();

        // Header: CLA, INS, P1, P2
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if nc > 0 {
            if extended {
                buffer.put_u8(0x00);
                buffer.put_u16(nc as u16);
            } else {
                buffer.put_u8(nc as u8);
            }
            buffer.put_slice(self.data());
        }

        if let Some(ne) = self.le {
            if extended {
                if nc == 0 {
                    buffer.put_u8(0x00);
                }
                // 65536 wraps to 00 00
                buffer.put_u16(ne as u16);
            } else {
                // 256 wraps to 00
                buffer.put_u8(ne as u8);
            }
        }

        buffer.freeze()
    }

    /// Parse a command from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, CommandError> {
        if data.len() < 4 {
            return Err(CommandError::InvalidLength(data.len()));
        }

        let mut command = Self::new(data[0], data[1], data[2], data[3]);
        let body = &data[4..];

        match body.len() {
            // Case 1
            0 => {}
            // Case 2 short
            1 => command.le = Some(decode_short_le(body[0])),
            // Case 3 / 4 short
            _ if body[0] != 0x00 => {
                let lc = body[0] as usize;
                if body.len() == 1 + lc {
                    command.data = Some(Bytes::copy_from_slice(&body[1..]));
                } else if body.len() == 2 + lc {
                    command.data = Some(Bytes::copy_from_slice(&body[1..=lc]));
                    command.le = Some(decode_short_le(body[1 + lc]));
                } else {
                    return Err(CommandError::InvalidLength(data.len()));
                }
            }
            // Case 2 extended
            3 => command.le = Some(decode_extended_le(body[1], body[2])),
            // Case 3 / 4 extended
            n if n > 3 => {
                let lc = u16::from_be_bytes([body[1], body[2]]) as usize;
                let rest = &body[3..];
                if lc == 0 {
                    return Err(CommandError::InvalidLength(data.len()));
                }
                if rest.len() == lc {
                    command.data = Some(Bytes::copy_from_slice(rest));
                } else if rest.len() == lc + 2 {
                    command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
                    command.le = Some(decode_extended_le(rest[lc], rest[lc + 1]));
                } else {
                    return Err(CommandError::InvalidLength(data.len()));
                }
            }
            _ => return Err(CommandError::InvalidLength(data.len())),
        }

        Ok(command)
    }
}

const fn decode_short_le(le: u8) -> ExpectedLength {
    if le == 0 { MAX_SHORT_NE } else { le as ExpectedLength }
}

const fn decode_extended_le(hi: u8, lo: u8) -> ExpectedLength {
    match u16::from_be_bytes([hi, lo]) {
        0 => MAX_EXTENDED_NE,
        le => le as ExpectedLength,
    }
}

impl From<Command> for Bytes {
    fn from(command: Command) -> Self {
        command.to_bytes()
    }
}
