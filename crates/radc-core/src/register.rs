//! Register map of the MCP356x ADC
//!
//! The device exposes sixteen 4-bit register addresses. Three of them
//! (0xB, 0xC and 0xE) are reserved and never dispatched.

use crate::error::{Error, Result};
use bitflags::bitflags;

/// Addressable registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    /// Conversion result (24-bit, read via a 4-byte capture)
    AdcData = 0x0,
    /// Clock, current source and ADC mode
    Config0 = 0x1,
    /// Prescaler and oversampling ratio
    Config1 = 0x2,
    /// Boost, gain and auto-zero
    Config2 = 0x3,
    /// Conversion mode, data format, CRC and calibration enables
    Config3 = 0x4,
    /// Interrupt status and mode
    Irq = 0x5,
    /// Input multiplexer
    Mux = 0x6,
    /// Scan mode channel selection
    Scan = 0x7,
    /// Delay between scan cycles
    Timer = 0x8,
    /// Offset calibration
    OffsetCal = 0x9,
    /// Gain calibration
    GainCal = 0xA,
    /// Write access lock
    Lock = 0xD,
    /// CRC checksum of the configuration
    CrcCfg = 0xF,
}

/// Static description of one register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterInfo {
    /// The register this entry describes
    pub register: Register,
    /// Display name as typed at the console
    pub name: &'static str,
    /// Width of the value in bits
    pub bit_width: u8,
    /// Register can be read
    pub readable: bool,
    /// Register can be written
    pub writable: bool,
}

impl RegisterInfo {
    const fn new(register: Register, name: &'static str, bit_width: u8, writable: bool) -> Self {
        Self {
            register,
            name,
            bit_width,
            readable: true,
            writable,
        }
    }

    /// 4-bit register address
    pub const fn address(&self) -> u8 {
        self.register as u8
    }

    /// Number of value bytes (1, 2 or 3)
    pub const fn data_len(&self) -> usize {
        (self.bit_width as usize) / 8
    }

    /// Number of bytes clocked for a read, including the leading dummy byte
    pub const fn capture_len(&self) -> usize {
        1 + self.data_len()
    }

    /// Largest value the register can hold
    pub const fn max_value(&self) -> u32 {
        if self.bit_width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bit_width) - 1
        }
    }
}

/// Exposed registers, in address order
static REGISTERS: [RegisterInfo; 13] = [
    RegisterInfo::new(Register::AdcData, "ADCDATA", 24, false),
    RegisterInfo::new(Register::Config0, "CONFIG0", 8, true),
    RegisterInfo::new(Register::Config1, "CONFIG1", 8, true),
    RegisterInfo::new(Register::Config2, "CONFIG2", 8, true),
    RegisterInfo::new(Register::Config3, "CONFIG3", 8, true),
    RegisterInfo::new(Register::Irq, "IRQ", 8, false),
    RegisterInfo::new(Register::Mux, "MUX", 8, true),
    RegisterInfo::new(Register::Scan, "SCAN", 24, true),
    RegisterInfo::new(Register::Timer, "TIMER", 24, true),
    RegisterInfo::new(Register::OffsetCal, "OFFSETCAL", 24, true),
    RegisterInfo::new(Register::GainCal, "GAINCAL", 24, true),
    RegisterInfo::new(Register::Lock, "LOCK", 8, true),
    RegisterInfo::new(Register::CrcCfg, "CRCCFG", 16, false),
];

/// Address-indexed view of `REGISTERS`; `None` marks reserved addresses
static BY_ADDRESS: [Option<Register>; 16] = [
    Some(Register::AdcData),
    Some(Register::Config0),
    Some(Register::Config1),
    Some(Register::Config2),
    Some(Register::Config3),
    Some(Register::Irq),
    Some(Register::Mux),
    Some(Register::Scan),
    Some(Register::Timer),
    Some(Register::OffsetCal),
    Some(Register::GainCal),
    None,
    None,
    Some(Register::Lock),
    None,
    Some(Register::CrcCfg),
];

impl Register {
    const fn table_index(self) -> usize {
        match self {
            Self::AdcData => 0,
            Self::Config0 => 1,
            Self::Config1 => 2,
            Self::Config2 => 3,
            Self::Config3 => 4,
            Self::Irq => 5,
            Self::Mux => 6,
            Self::Scan => 7,
            Self::Timer => 8,
            Self::OffsetCal => 9,
            Self::GainCal => 10,
            Self::Lock => 11,
            Self::CrcCfg => 12,
        }
    }

    /// Static description of this register
    pub fn info(self) -> &'static RegisterInfo {
        &REGISTERS[self.table_index()]
    }

    /// 4-bit register address
    pub const fn address(self) -> u8 {
        self as u8
    }

    /// Display name
    pub fn name(self) -> &'static str {
        self.info().name
    }
}

impl core::fmt::Display for Register {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Register {
    type Error = Error;

    fn try_from(address: u8) -> Result<Self> {
        lookup(address).map(|info| info.register)
    }
}

/// Look up a register by address
///
/// Fails with [`Error::InvalidRegisterAddress`] for addresses above 0xF and
/// for the reserved addresses 0xB, 0xC and 0xE.
pub fn lookup(address: u8) -> Result<&'static RegisterInfo> {
    BY_ADDRESS
        .get(address as usize)
        .copied()
        .flatten()
        .map(Register::info)
        .ok_or(Error::InvalidRegisterAddress(address))
}

/// Look up a register by name (case-insensitive)
pub fn lookup_name(name: &str) -> Result<&'static RegisterInfo> {
    REGISTERS
        .iter()
        .find(|info| info.name.eq_ignore_ascii_case(name))
        .ok_or(Error::UnknownRegister)
}

/// Resolve a console argument: hex (`0x1`), decimal (`1`) or a register name
pub fn parse_register(arg: &str) -> Result<&'static RegisterInfo> {
    if let Some(hex) = arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        let addr = u8::from_str_radix(hex, 16).map_err(|_| Error::InvalidValue)?;
        return lookup(addr);
    }
    if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) {
        let addr = arg.parse::<u8>().map_err(|_| Error::InvalidValue)?;
        return lookup(addr);
    }
    lookup_name(arg)
}

/// All exposed registers in address order
pub fn all() -> &'static [RegisterInfo] {
    &REGISTERS
}

bitflags! {
    /// CONFIG3 register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Config3: u8 {
        /// Conversion mode, high bit
        const CONV_MODE_1 = 1 << 7;
        /// Conversion mode, low bit
        const CONV_MODE_0 = 1 << 6;
        /// Data format, high bit
        const DATA_FORMAT_1 = 1 << 5;
        /// Data format, low bit
        const DATA_FORMAT_0 = 1 << 4;
        /// CRC format (16 or 32 bit)
        const CRC_FORMAT = 1 << 3;
        /// CRC on communications
        const EN_CRCCOM = 1 << 2;
        /// Digital offset calibration
        const EN_OFFCAL = 1 << 1;
        /// Digital gain calibration
        const EN_GAINCAL = 1 << 0;

        /// Continuous conversion mode (CONV_MODE = 0b11)
        const CONTINUOUS = Self::CONV_MODE_1.bits() | Self::CONV_MODE_0.bits();
    }
}

bitflags! {
    /// IRQ register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IrqStatus: u8 {
        /// Data ready status, active low
        const DR_STATUS = 1 << 6;
        /// CRC configuration error status, active low
        const CRCCFG_STATUS = 1 << 5;
        /// Power-on reset status, active low
        const POR_STATUS = 1 << 4;
        /// IRQ pin mode, high bit
        const IRQ_MODE_1 = 1 << 3;
        /// IRQ pin mode, low bit
        const IRQ_MODE_0 = 1 << 2;
        /// Fast commands enabled
        const EN_FASTCMD = 1 << 1;
        /// Conversion start interrupt enabled
        const EN_STP = 1 << 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_addresses_rejected() {
        for addr in [0xB, 0xC, 0xE, 0x10, 0x42, 0xFF] {
            assert_eq!(lookup(addr), Err(Error::InvalidRegisterAddress(addr)));
        }
    }

    #[test]
    fn test_lookup_matches_enum() {
        for info in all() {
            let found = lookup(info.address()).unwrap();
            assert_eq!(found.register, info.register);
            assert_eq!(info.register.info(), info);
        }
        assert_eq!(all().len(), 13);
    }

    #[test]
    fn test_widths() {
        assert_eq!(Register::AdcData.info().capture_len(), 4);
        assert_eq!(Register::Config0.info().capture_len(), 2);
        assert_eq!(Register::CrcCfg.info().data_len(), 2);
        assert_eq!(Register::OffsetCal.info().max_value(), 0xFF_FFFF);
        assert!(!Register::AdcData.info().writable);
        assert!(Register::Config3.info().writable);
    }

    #[test]
    fn test_parse_register() {
        assert_eq!(parse_register("0x1").unwrap().register, Register::Config0);
        assert_eq!(parse_register("0XA").unwrap().register, Register::GainCal);
        assert_eq!(parse_register("13").unwrap().register, Register::Lock);
        assert_eq!(parse_register("config3").unwrap().register, Register::Config3);
        assert_eq!(parse_register("0xB"), Err(Error::InvalidRegisterAddress(0xB)));
        assert_eq!(parse_register("0xZZ"), Err(Error::InvalidValue));
        assert_eq!(parse_register("BOGUS"), Err(Error::UnknownRegister));
    }

    #[test]
    fn test_continuous_payload() {
        assert_eq!(Config3::CONTINUOUS.bits(), 0xC0);
    }
}
