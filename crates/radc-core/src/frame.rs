//! Command byte encoding
//!
//! Every transaction starts with a single command byte:
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! +-------+---------------+-------+
//! | dev   |   register    |  op   |
//! +-------+---------------+-------+
//! ```
//!
//! `op` is `0b01` for a static read and `0b10` for an incremental write.
//! Fast commands reuse the same layout with `op = 0b00` and are sent as
//! standalone bytes.

use crate::error::{Error, Result};

/// Device address of the MCP356x family (hard-wired in the part number)
pub const DEVICE_ADDRESS: u8 = 0x1;

/// Register operation carried in the two low bits of the command byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    /// Static register read
    Read = 0b01,
    /// Incremental register write
    Write = 0b10,
}

impl TryFrom<u8> for Operation {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            0b01 => Ok(Self::Read),
            0b10 => Ok(Self::Write),
            other => Err(Error::InvalidOperation(other)),
        }
    }
}

/// Decoded command byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandFrame {
    /// 2-bit device address
    pub device_address: u8,
    /// 4-bit register address
    pub register_address: u8,
    /// Read or write
    pub operation: Operation,
}

impl CommandFrame {
    /// Frame for a register of this device family
    pub fn new(register_address: u8, operation: Operation) -> Result<Self> {
        Self::with_device(DEVICE_ADDRESS, register_address, operation)
    }

    /// Frame with an explicit device address
    pub fn with_device(device_address: u8, register_address: u8, operation: Operation) -> Result<Self> {
        if device_address != DEVICE_ADDRESS {
            return Err(Error::InvalidDeviceAddress(device_address));
        }
        if register_address > 0xF {
            return Err(Error::InvalidRegisterAddress(register_address));
        }
        Ok(Self {
            device_address,
            register_address,
            operation,
        })
    }

    /// Wire byte for this frame
    pub const fn to_byte(&self) -> u8 {
        (self.device_address << 6) | (self.register_address << 2) | self.operation as u8
    }
}

/// Encode a command byte
///
/// `byte = device << 6 | register << 2 | operation`
pub fn encode_frame(device_address: u8, register_address: u8, operation: Operation) -> Result<u8> {
    CommandFrame::with_device(device_address, register_address, operation).map(|f| f.to_byte())
}

/// Decode a command byte, the exact inverse of [`encode_frame`]
pub fn decode_frame(byte: u8) -> Result<CommandFrame> {
    let operation = Operation::try_from(byte & 0b11)?;
    CommandFrame::with_device(byte >> 6, (byte >> 2) & 0xF, operation)
}

/// Device-level single-byte commands
///
/// Sent without payload; the device does not answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FastCommand {
    /// Start or restart a conversion
    Conversion = 0x68,
    /// Enter standby mode
    Standby = 0x6C,
    /// Enter shutdown mode
    Shutdown = 0x70,
    /// Reset every register to its default value
    FullReset = 0x78,
}

impl FastCommand {
    /// Wire byte
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Human readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Conversion => "conversion start",
            Self::Standby => "standby",
            Self::Shutdown => "shutdown",
            Self::FullReset => "full reset",
        }
    }
}

impl TryFrom<u8> for FastCommand {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x68 => Ok(Self::Conversion),
            0x6C => Ok(Self::Standby),
            0x70 => Ok(Self::Shutdown),
            0x78 => Ok(Self::FullReset),
            other => Err(Error::InvalidOperation(other & 0b11)),
        }
    }
}

impl core::fmt::Display for FastCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
