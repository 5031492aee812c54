//! Error types for radc-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Register/frame errors
    /// Register address is outside 0x0-0xF or reserved
    InvalidRegisterAddress(u8),
    /// Register name does not match any exposed register
    UnknownRegister,
    /// Device address is not the device-family constant
    InvalidDeviceAddress(u8),
    /// Operation bits do not encode a register read or write
    InvalidOperation(u8),
    /// Register cannot be read
    RegisterNotReadable,
    /// Register cannot be written
    RegisterNotWritable,
    /// Transfer or payload length does not fit the register
    InvalidLength,

    // Command errors
    /// Wrong number of arguments for a console command
    InvalidArgumentCount,
    /// Console command is not known
    UnknownCommand,
    /// Argument could not be parsed or does not fit the register
    InvalidValue,

    // Transport errors
    /// Transport rejected the submission
    TransportSubmitFailure,
    /// Transport (or the sequencer) already has a transaction in flight
    TransportBusy,
    /// Bounded wait expired before the transport became idle
    TransportTimeout,

    // Conversion errors
    /// Sample bytes or display precision are out of range
    DecodeOutOfRange,

    // State errors
    /// Operation not allowed in the current state
    InvalidState,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegisterAddress(addr) => {
                write!(f, "invalid register address 0x{:X}", addr)
            }
            Self::UnknownRegister => write!(f, "unknown register name"),
            Self::InvalidDeviceAddress(addr) => {
                write!(f, "invalid device address 0x{:X}", addr)
            }
            Self::InvalidOperation(bits) => {
                write!(f, "operation bits 0b{:02b} are not a register read/write", bits)
            }
            Self::RegisterNotReadable => write!(f, "register is not readable"),
            Self::RegisterNotWritable => write!(f, "register is not writable"),
            Self::InvalidLength => write!(f, "transfer length does not fit the register"),
            Self::InvalidArgumentCount => write!(f, "invalid number of arguments"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::InvalidValue => write!(f, "invalid value"),
            Self::TransportSubmitFailure => write!(f, "transport rejected the transfer"),
            Self::TransportBusy => write!(f, "transport is busy"),
            Self::TransportTimeout => write!(f, "transport did not become idle in time"),
            Self::DecodeOutOfRange => write!(f, "sample decode out of range"),
            Self::InvalidState => write!(f, "operation not allowed in current state"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
