//! Errors raised by the command-line front end

use radc_core::config::ConfigError;

/// Failure to set up a session
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Transport name not compiled in or misspelled
    #[error("Unknown transport: {name}\n\n{help}\nUse 'radc list-transports' for more details")]
    UnknownTransport { name: String, help: String },

    /// Emulator options rejected
    #[cfg(feature = "dummy")]
    #[error("Failed to open dummy transport: {0}")]
    Dummy(#[from] radc_dummy::DummyError),

    /// Configuration file could not be loaded
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    /// Device or protocol error
    #[error(transparent)]
    Device(#[from] radc_core::Error),
}
