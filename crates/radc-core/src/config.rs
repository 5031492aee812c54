//! TOML configuration file
//!
//! All sections and keys are optional:
//!
//! ```toml
//! [converter]
//! full_scale = 3.3
//! resolution = 8388608
//! digits = 5
//!
//! [scan]
//! samples = 50
//!
//! [wait]
//! timeout_us = 100000
//! poll_delay_us = 10
//!
//! [startup]
//! register = "CONFIG0"
//! value = 0xE3
//! ```
//!
//! Without a `[wait]` section every busy poll is unbounded.

use std::fs;
use std::path::Path;
use std::string::String;

use serde::Deserialize;

use crate::app::StartupSequence;
use crate::bus::WaitPolicy;
use crate::cycle::DEFAULT_SCAN_SAMPLES;
use crate::register::{self, Register};
use crate::voltage::{Converter, DEFAULT_DIGITS, DEFAULT_FULL_SCALE, DEFAULT_RESOLUTION, MAX_DIGITS};

/// Errors from loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML or has wrongly typed keys
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid {field}: {source}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// Reason
        source: crate::Error,
    },
}

/// Resolved runtime configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Calibration
    pub converter: Converter,
    /// Fractional digits shown
    pub digits: u8,
    /// Samples per scan
    pub scan_samples: usize,
    /// Busy-poll behaviour
    pub wait: WaitPolicy,
    /// Self-test register write
    pub startup: StartupSequence,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            converter: Converter::default(),
            digits: DEFAULT_DIGITS,
            scan_samples: DEFAULT_SCAN_SAMPLES,
            wait: WaitPolicy::Unbounded,
            startup: StartupSequence::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    converter: ConverterSection,
    #[serde(default)]
    scan: ScanSection,
    wait: Option<WaitSection>,
    #[serde(default)]
    startup: StartupSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConverterSection {
    full_scale: Option<f32>,
    resolution: Option<f32>,
    digits: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScanSection {
    samples: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WaitSection {
    #[serde(deserialize_with = "deserialize_hex_u32")]
    timeout_us: u32,
    #[serde(default = "default_poll_delay", deserialize_with = "deserialize_hex_u32")]
    poll_delay_us: u32,
}

fn default_poll_delay() -> u32 {
    10
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StartupSection {
    register: Option<RegisterRef>,
    #[serde(default, deserialize_with = "deserialize_opt_hex_u32")]
    value: Option<u32>,
    #[serde(default)]
    separate_capture: bool,
}

/// Register given by address or by name
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegisterRef {
    Address(u8),
    Name(String),
}

/// Number written either as an integer or as a string
#[derive(Deserialize)]
#[serde(untagged)]
enum HexOrInt {
    Int(u32),
    Str(String),
}

impl HexOrInt {
    fn value<E: serde::de::Error>(self) -> Result<u32, E> {
        match self {
            Self::Int(n) => Ok(n),
            Self::Str(s) => crate::command::parse_value(&s)
                .map_err(|_| E::custom(std::format!("invalid number: {}", s))),
        }
    }
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    HexOrInt::deserialize(deserializer)?.value()
}

fn deserialize_opt_hex_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<HexOrInt>::deserialize(deserializer)?
        .map(HexOrInt::value)
        .transpose()
}

fn invalid(field: &'static str) -> impl FnOnce(crate::Error) -> ConfigError {
    move |source| ConfigError::Invalid { field, source }
}

impl Config {
    /// Load the configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::debug!("loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse the configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let defaults = Self::default();

        let converter = Converter::new(
            file.converter.full_scale.unwrap_or(DEFAULT_FULL_SCALE),
            file.converter.resolution.unwrap_or(DEFAULT_RESOLUTION),
        )
        .map_err(invalid("converter"))?;

        let digits = file.converter.digits.unwrap_or(DEFAULT_DIGITS);
        if digits > MAX_DIGITS {
            return Err(invalid("converter.digits")(crate::Error::DecodeOutOfRange));
        }

        let wait = match file.wait {
            Some(w) => WaitPolicy::Bounded {
                timeout_us: w.timeout_us,
                poll_delay_us: w.poll_delay_us,
            },
            None => WaitPolicy::Unbounded,
        };

        let register = match file.startup.register {
            Some(RegisterRef::Address(addr)) => register::lookup(addr),
            Some(RegisterRef::Name(name)) => register::parse_register(&name),
            None => Ok(defaults.startup.register.info()),
        }
        .map_err(invalid("startup.register"))?;
        if !register.writable {
            return Err(invalid("startup.register")(crate::Error::RegisterNotWritable));
        }

        let value = file.startup.value.unwrap_or(defaults.startup.value);
        if value > register.max_value() {
            return Err(invalid("startup.value")(crate::Error::InvalidValue));
        }

        Ok(Self {
            converter,
            digits,
            scan_samples: file.scan.samples.unwrap_or(DEFAULT_SCAN_SAMPLES),
            wait,
            startup: StartupSequence {
                register: register.register,
                value,
                separate_capture: file.startup.separate_capture,
            },
        })
    }

    /// Register selected for the self-test write
    pub fn startup_register(&self) -> Register {
        self.startup.register
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [converter]
            full_scale = 2.5
            resolution = 8388608
            digits = 3

            [scan]
            samples = 10

            [wait]
            timeout_us = "0x2710"
            poll_delay_us = 100

            [startup]
            register = "config3"
            value = "0xC0"
            "#,
        )
        .unwrap();

        assert_eq!(config.converter.full_scale, 2.5);
        assert_eq!(config.converter.resolution, 8_388_608.0);
        assert_eq!(config.digits, 3);
        assert_eq!(config.scan_samples, 10);
        assert_eq!(
            config.wait,
            WaitPolicy::Bounded {
                timeout_us: 10_000,
                poll_delay_us: 100
            }
        );
        assert_eq!(config.startup_register(), Register::Config3);
        assert_eq!(config.startup.value, 0xC0);
    }

    #[test]
    fn test_startup_by_address() {
        let config = Config::from_toml_str("[startup]\nregister = 6\nvalue = 0x01\n").unwrap();
        assert_eq!(config.startup.register, Register::Mux);
        assert_eq!(config.startup.value, 1);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            Config::from_toml_str("[converter]\ndigits = 12\n"),
            Err(ConfigError::Invalid { field: "converter.digits", .. })
        ));
        assert!(matches!(
            Config::from_toml_str("[converter]\nresolution = 0\n"),
            Err(ConfigError::Invalid { field: "converter", .. })
        ));
        assert!(matches!(
            Config::from_toml_str("[startup]\nregister = \"ADCDATA\"\n"),
            Err(ConfigError::Invalid {
                source: crate::Error::RegisterNotWritable,
                ..
            })
        ));
        assert!(matches!(
            Config::from_toml_str("[startup]\nregister = 11\n"),
            Err(ConfigError::Invalid {
                source: crate::Error::InvalidRegisterAddress(0xB),
                ..
            })
        ));
        assert!(matches!(
            Config::from_toml_str("[startup]\nvalue = 256\n"),
            Err(ConfigError::Invalid { field: "startup.value", .. })
        ));
        assert!(matches!(
            Config::from_toml_str("[scan]\nsampels = 3\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
