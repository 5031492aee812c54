//! Sample decoding and voltage conversion
//!
//! ADCDATA holds a 24-bit two's-complement code, most significant byte
//! first. A code of `±2^23` corresponds to `±full_scale` volts.

use crate::error::{Error, Result};
use core::fmt;

/// Default reference voltage in volts
pub const DEFAULT_FULL_SCALE: f32 = 3.3;

/// Default resolution (2^23 codes per full scale)
pub const DEFAULT_RESOLUTION: f32 = 8_388_608.0;

/// Default number of fractional digits shown
pub const DEFAULT_DIGITS: u8 = 5;

/// Largest supported number of fractional digits
pub const MAX_DIGITS: u8 = 9;

/// Decode a 24-bit two's-complement code
///
/// If bit 23 is set, bits 31-24 are filled with ones before the value is
/// interpreted as a signed 32-bit integer.
pub fn decode24(b1: u8, b2: u8, b3: u8) -> i32 {
    let mut raw = ((b1 as u32) << 16) | ((b2 as u32) << 8) | (b3 as u32);
    if raw & (1 << 23) != 0 {
        raw |= 0xFF << 24;
    }
    raw as i32
}

/// Decode a 3-byte slice, see [`decode24`]
pub fn decode_sample(bytes: &[u8]) -> Result<i32> {
    match *bytes {
        [b1, b2, b3] => Ok(decode24(b1, b2, b3)),
        _ => Err(Error::DecodeOutOfRange),
    }
}

/// Map a code to volts: `code * full_scale / resolution`
pub fn to_voltage(code: i32, full_scale: f32, resolution: f32) -> f32 {
    code as f32 * full_scale / resolution
}

/// Calibration used to turn codes into volts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converter {
    /// Reference voltage in volts
    pub full_scale: f32,
    /// Codes per full scale
    pub resolution: f32,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            full_scale: DEFAULT_FULL_SCALE,
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

impl Converter {
    /// Create a converter, rejecting a non-positive resolution
    pub fn new(full_scale: f32, resolution: f32) -> Result<Self> {
        if resolution.is_nan() || resolution <= 0.0 || !full_scale.is_finite() {
            return Err(Error::DecodeOutOfRange);
        }
        Ok(Self {
            full_scale,
            resolution,
        })
    }

    /// Map a code to volts
    pub fn to_voltage(&self, code: i32) -> f32 {
        to_voltage(code, self.full_scale, self.resolution)
    }

    /// Decode the value bytes of an ADCDATA read into a sample
    pub fn sample(&self, bytes: &[u8]) -> Result<AdcSample> {
        let raw_code = decode_sample(bytes)?;
        Ok(AdcSample {
            raw_code,
            voltage: self.to_voltage(raw_code),
        })
    }
}

/// One conversion result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcSample {
    /// Sign-extended 24-bit code
    pub raw_code: i32,
    /// Calibrated voltage
    pub voltage: f32,
}

impl AdcSample {
    /// Build a sample from the three value bytes of an ADCDATA capture
    pub fn from_bytes(bytes: &[u8], converter: &Converter) -> Result<Self> {
        converter.sample(bytes)
    }

    /// Format the voltage with `digits` fractional digits
    pub fn display(&self, digits: u8) -> Result<DisplayVoltage> {
        format_display(self.voltage, digits)
    }
}

/// Voltage split into sign, integer and fractional parts for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayVoltage {
    /// Sign is shown once, in front of the integer part
    pub negative: bool,
    /// Integer volts
    pub integer: u32,
    /// `round(|frac(voltage)| * 10^digits)`
    pub fraction: u32,
    /// Number of fractional digits
    pub digits: u8,
}

/// Split a voltage for display
///
/// The fraction is rounded to `digits` places; a fraction that rounds up to
/// `10^digits` carries into the integer part. Negative values are formatted
/// from their magnitude with a single leading sign.
pub fn format_display(voltage: f32, digits: u8) -> Result<DisplayVoltage> {
    if digits > MAX_DIGITS || !voltage.is_finite() {
        return Err(Error::DecodeOutOfRange);
    }

    let negative = voltage < 0.0;
    let magnitude = (if negative { -voltage } else { voltage }) as f64;
    if magnitude >= u32::MAX as f64 {
        return Err(Error::DecodeOutOfRange);
    }

    let scale = 10u64.pow(digits as u32);
    let mut integer = magnitude as u64;
    let mut fraction = ((magnitude - integer as f64) * scale as f64 + 0.5) as u64;
    if fraction >= scale {
        integer += 1;
        fraction -= scale;
    }

    Ok(DisplayVoltage {
        negative: negative && (integer != 0 || fraction != 0),
        integer: integer as u32,
        fraction: fraction as u32,
        digits,
    })
}

impl fmt::Display for DisplayVoltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        if self.digits == 0 {
            write!(f, "{}{}", sign, self.integer)
        } else {
            write!(
                f,
                "{}{}.{:0width$}",
                sign,
                self.integer,
                self.fraction,
                width = self.digits as usize
            )
        }
    }
}
