//! Transport registration and dispatch
//!
//! This module provides a centralized registry for all transports, with
//! support for feature-gated inclusion and dynamic help text generation.

use radc_core::bus::{ChipSelect, DataReady, Transport, TransportInfo};

use crate::error::CliError;

/// Get information about all available transports (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_transports() -> Vec<TransportInfo> {
    let mut transports = Vec::new();

    #[cfg(feature = "dummy")]
    transports.push(TransportInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "Emulated MCP356x (input=<V>,step=<V>,full_scale=<V>,busy_polls=N,drdy_polls=N,fail_at=N)",
    });

    transports
}

/// Generate help text listing all available transports
pub fn transport_help() -> String {
    let transports = available_transports();

    if transports.is_empty() {
        return "No transports available (recompile with transport features enabled)".to_string();
    }

    let mut help = String::from("Available transports:\n");
    for t in &transports {
        help.push_str(&format!("  {:12} - {}\n", t.name, t.description));
        if !t.aliases.is_empty() {
            help.push_str(&format!("  {:12}   aliases: {}\n", "", t.aliases.join(", ")));
        }
    }

    help
}

/// Resolve a transport name or alias to its primary name
pub fn find_transport(name: &str) -> Option<&'static str> {
    available_transports()
        .into_iter()
        .find(|t| t.name == name || t.aliases.contains(&name))
        .map(|t| t.name)
}

/// The three bus collaborators a session needs, type-erased
pub struct Bus {
    /// SPI peripheral
    pub transport: Box<dyn Transport>,
    /// Chip-select line
    pub cs: Box<dyn ChipSelect>,
    /// Data-ready line
    pub ready: Box<dyn DataReady>,
}

/// Open the transport named by a transport string
///
/// The string can be just the name (e.g., "dummy") or include parameters
/// (e.g., "dummy:input=0.5,busy_polls=3").
pub fn open_transport(transport: &str) -> Result<Bus, CliError> {
    let (name, options) = parse_transport_string(transport);

    let canonical_name = match find_transport(name) {
        Some(n) => n,
        None => return Err(unknown_transport_error(name)),
    };

    match canonical_name {
        #[cfg(feature = "dummy")]
        "dummy" => {
            let adc = radc_dummy::open(&options)?;
            Ok(Bus {
                transport: Box::new(adc.clone()),
                cs: Box::new(adc.clone()),
                ready: Box::new(adc),
            })
        }

        _ => {
            let _ = options;
            Err(unknown_transport_error(name))
        }
    }
}

/// Parse a transport string into name and options
///
/// Format: "name:key1=value1,key2=value2"
pub fn parse_transport_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_transport_error(name: &str) -> CliError {
    CliError::UnknownTransport {
        name: name.to_string(),
        help: transport_help(),
    }
}
