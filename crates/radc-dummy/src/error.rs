//! Error types for the emulated ADC

use thiserror::Error;

/// Errors from configuring the emulated ADC
#[derive(Debug, Error)]
pub enum DummyError {
    /// Option value could not be parsed
    #[error("Invalid value for {key}: {value}")]
    InvalidOption { key: &'static str, value: String },

    /// Calibration rejected by the converter
    #[error("Invalid calibration: {0}")]
    Calibration(#[source] radc_core::Error),
}

/// Result type for emulator configuration
pub type Result<T> = std::result::Result<T, DummyError>;
