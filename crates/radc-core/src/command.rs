//! Console command surface
//!
//! Parses one line of console input into a [`Command`]. Parsing validates
//! the argument count, register address and value range, so a rejected line
//! never reaches the device.

use crate::error::{Error, Result};
use crate::frame::FastCommand;
use crate::register::{parse_register, Register};

/// One console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// List the available commands
    Adc,
    /// List the accessible registers
    Registers,
    /// Read a register
    Read(Register),
    /// Write a register
    Write(Register, u32),
    /// Single conversion
    Single,
    /// Continuous conversion
    Scan,
    /// Conversion start/restart fast command
    Convert,
    /// Standby fast command
    Standby,
    /// Shutdown fast command
    Shutdown,
    /// Full reset fast command
    Default,
    /// Build information
    About,
}

/// Description of a console command for help output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    /// Name as listed (matching is case-insensitive)
    pub name: &'static str,
    /// Argument synopsis
    pub usage: &'static str,
    /// One-line description
    pub description: &'static str,
}

/// Command table in listing order
pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "ADC",
        usage: "",
        description: "View all ADC configuration commands",
    },
    CommandInfo {
        name: "REGISTERs",
        usage: "",
        description: "View all accessible internal ADC registers",
    },
    CommandInfo {
        name: "WRITE",
        usage: "<register> <value>",
        description: "Write the specified register",
    },
    CommandInfo {
        name: "READ",
        usage: "<register>",
        description: "Read the specified register",
    },
    CommandInfo {
        name: "SINGLE",
        usage: "",
        description: "Get a single conversion",
    },
    CommandInfo {
        name: "SCAN",
        usage: "",
        description: "Get continuous conversions",
    },
    CommandInfo {
        name: "CONVERT",
        usage: "",
        description: "Conversion start/restart fast command",
    },
    CommandInfo {
        name: "STANDBY",
        usage: "",
        description: "Standby mode fast command",
    },
    CommandInfo {
        name: "SHUTDOWN",
        usage: "",
        description: "Shutdown mode fast command",
    },
    CommandInfo {
        name: "DEFAULT",
        usage: "",
        description: "Full reset fast command",
    },
    CommandInfo {
        name: "about",
        usage: "",
        description: "About the software/hardware",
    },
];

impl Command {
    /// Parse one console line, e.g. `WRITE CONFIG0 0xE3`
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(Error::UnknownCommand)?;
        let first = words.next();
        let second = words.next();
        if words.next().is_some() {
            return Err(Error::InvalidArgumentCount);
        }

        let info = COMMANDS
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or(Error::UnknownCommand)?;

        match (info.name, first, second) {
            ("READ", Some(reg), None) => Ok(Self::Read(parse_register(reg)?.register)),
            ("WRITE", Some(reg), Some(value)) => {
                let info = parse_register(reg)?;
                let value = parse_value(value)?;
                if value > info.max_value() {
                    return Err(Error::InvalidValue);
                }
                Ok(Self::Write(info.register, value))
            }
            ("READ" | "WRITE", _, _) => Err(Error::InvalidArgumentCount),
            (_, Some(_), _) => Err(Error::InvalidArgumentCount),
            ("ADC", None, None) => Ok(Self::Adc),
            ("REGISTERs", None, None) => Ok(Self::Registers),
            ("SINGLE", None, None) => Ok(Self::Single),
            ("SCAN", None, None) => Ok(Self::Scan),
            ("CONVERT", None, None) => Ok(Self::Convert),
            ("STANDBY", None, None) => Ok(Self::Standby),
            ("SHUTDOWN", None, None) => Ok(Self::Shutdown),
            ("DEFAULT", None, None) => Ok(Self::Default),
            ("about", None, None) => Ok(Self::About),
            _ => Err(Error::UnknownCommand),
        }
    }

    /// Name as listed in [`COMMANDS`]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Adc => "ADC",
            Self::Registers => "REGISTERs",
            Self::Read(_) => "READ",
            Self::Write(..) => "WRITE",
            Self::Single => "SINGLE",
            Self::Scan => "SCAN",
            Self::Convert => "CONVERT",
            Self::Standby => "STANDBY",
            Self::Shutdown => "SHUTDOWN",
            Self::Default => "DEFAULT",
            Self::About => "about",
        }
    }

    /// Fast command sent by this console command, if any
    pub fn fast_command(&self) -> Option<FastCommand> {
        match self {
            Self::Convert => Some(FastCommand::Conversion),
            Self::Standby => Some(FastCommand::Standby),
            Self::Shutdown => Some(FastCommand::Shutdown),
            Self::Default => Some(FastCommand::FullReset),
            _ => None,
        }
    }
}

/// Parse a number that can be hex (0x...) or decimal
pub fn parse_value(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|_| Error::InvalidValue)
    } else {
        s.parse().map_err(|_| Error::InvalidValue)
    }
}
