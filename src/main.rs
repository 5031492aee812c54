//! radc - MCP356x ADC command console
//!
//! Drives an MCP356x delta-sigma ADC through the command set of its
//! register protocol: register reads and writes, fast commands, single
//! conversions and continuous-mode scans.
//!
//! # Architecture
//!
//! All protocol logic lives in `radc-core`. The binary only selects a
//! transport (`-t name:key=value,...`), loads the optional TOML
//! configuration and maps each subcommand onto one console command of a
//! [`radc_core::session::Session`]. The `shell` subcommand feeds the same
//! session one console line at a time.

mod cli;
mod commands;
mod error;
mod transports;

use clap::Parser;
use cli::{Cli, Commands};
use error::CliError;
use radc_core::bus::{CancelToken, Completion};
use radc_core::command::Command;
use radc_core::config::Config;
use std::path::Path;

/// Completion slot the transport sets when a submitted transfer finishes
static TRANSFER_DONE: Completion = Completion::new();

/// Set by Ctrl-C; stops a running scan
static SCAN_CANCEL: CancelToken = CancelToken::new();

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Commands::ListTransports = cli.command {
        print!("{}", transports::transport_help());
        return Ok(());
    }

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Commands::Scan {
        samples: Some(samples),
        ..
    } = cli.command
    {
        config.scan_samples = samples;
    }

    let bus = transports::open_transport(&cli.transport)?;
    let mut session = commands::open_session(bus, &config, &TRANSFER_DONE)?;

    let command = match cli.command {
        Commands::Adc => Command::Adc,
        Commands::Registers => Command::Registers,
        Commands::Read { register } => Command::parse(&format!("READ {}", register))?,
        Commands::Write { register, value } => Command::parse(&format!("WRITE {} {}", register, value))?,
        Commands::Single => Command::Single,
        Commands::Scan { no_progress, .. } => {
            install_cancel_handler()?;
            return commands::cmd_scan(&mut session, &SCAN_CANCEL, !no_progress);
        }
        Commands::Convert => Command::Convert,
        Commands::Standby => Command::Standby,
        Commands::Shutdown => Command::Shutdown,
        Commands::Default => Command::Default,
        Commands::About => Command::About,
        Commands::Selftest => {
            let sample = session.self_test()?;
            println!(
                "Self test complete: wrote 0x{:X} to {}",
                config.startup.value, config.startup.register
            );
            return commands::print_sample(&session, &sample);
        }
        Commands::Shell => {
            install_cancel_handler()?;
            return commands::cmd_shell(&mut session, &SCAN_CANCEL);
        }
        Commands::ListTransports => return Ok(()),
    };

    let outcome = session.execute(command, None, |_| {})?;
    commands::print_outcome(&session, &outcome)
}

/// Route Ctrl-C to the scan cancel token
///
/// A second Ctrl-C before the scan has noticed the first one exits.
fn install_cancel_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        if SCAN_CANCEL.is_cancelled() {
            std::process::exit(130);
        }
        SCAN_CANCEL.cancel();
    })
}

/// Load the configuration from the specified path or the default location
fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    if let Some(path) = path {
        let config = Config::from_file(path)?;
        log::info!("Loaded configuration from {}", path.display());
        return Ok(config);
    }

    let default_path = Path::new("radc.toml");
    if default_path.is_file() {
        let config = Config::from_file(default_path)?;
        log::debug!("Loaded configuration from {}", default_path.display());
        Ok(config)
    } else {
        Ok(Config::default())
    }
}
