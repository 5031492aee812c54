//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "radc")]
#[command(author, version, about = "MCP356x ADC command console", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Transport to use, with options (e.g. dummy:input=1.25,busy_polls=2)
    #[arg(short, long, default_value = "dummy", global = true)]
    pub transport: String,

    /// Configuration file (TOML format)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the console commands
    Adc,

    /// List the register map
    Registers,

    /// Read a register by address or name
    Read {
        /// Register address (0x0-0xF) or name (e.g. CONFIG0)
        register: String,
    },

    /// Write a register by address or name
    Write {
        /// Register address (0x0-0xF) or name (e.g. CONFIG0)
        register: String,

        /// Value to write (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_hex_u32)]
        value: u32,
    },

    /// Take a single conversion and print the voltage
    Single,

    /// Run a continuous-mode scan
    Scan {
        /// Number of samples (overrides the configuration file)
        #[arg(short = 'n', long)]
        samples: Option<usize>,

        /// Hide the progress bar and print every sample
        #[arg(long)]
        no_progress: bool,
    },

    /// Send the conversion start fast command
    Convert,

    /// Send the standby fast command
    Standby,

    /// Send the shutdown fast command
    Shutdown,

    /// Send the full reset fast command
    Default,

    /// Show build information
    About,

    /// Run the register write/read-back self test
    Selftest,

    /// Read console commands from standard input, one per line
    Shell,

    /// List available transports
    ListTransports,
}
