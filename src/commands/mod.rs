//! CLI command implementations
//!
//! Every console command runs through a [`DynSession`], a session over the
//! type-erased collaborators returned by the transport dispatch. This
//! module holds the output formatting shared by the one-shot subcommands
//! and the shell.

mod scan;
mod shell;

pub use scan::cmd_scan;
pub use shell::cmd_shell;

use radc_core::bus::{ChipSelect, Completion, DataReady, Transport};
use radc_core::config::Config;
use radc_core::register::Register;
use radc_core::sequencer::TransferSequencer;
use radc_core::session::{Outcome, Session};
use radc_core::voltage::{AdcSample, Converter};

use crate::transports::Bus;

/// Session over boxed bus collaborators
pub type DynSession = Session<Box<dyn Transport>, Box<dyn ChipSelect>, Box<dyn DataReady>>;

/// Build a session over an opened transport, applying the configuration
pub fn open_session(
    bus: Bus,
    config: &Config,
    completion: &'static Completion,
) -> Result<DynSession, Box<dyn std::error::Error>> {
    let seq = TransferSequencer::new(bus.transport, bus.cs).with_wait_policy(config.wait);
    let session = Session::new(seq, bus.ready, completion)
        .with_converter(config.converter)
        .with_scan_samples(config.scan_samples)
        .with_startup(config.startup)
        .with_digits(config.digits)?;
    log::debug!("session ready, wait policy {:?}", config.wait);
    Ok(session)
}

/// Print one conversion result
pub fn print_sample(session: &DynSession, sample: &AdcSample) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", format_sample(sample, session.digits())?);
    Ok(())
}

/// One output line for a conversion result: raw code, hex and volts
pub fn format_sample(sample: &AdcSample, digits: u8) -> radc_core::Result<String> {
    Ok(format!(
        "{:>9} (0x{:06X})  {} V",
        sample.raw_code,
        sample.raw_code as u32 & 0xFF_FFFF,
        sample.display(digits)?
    ))
}

/// Decode a raw ADCDATA register value as a conversion result
fn adcdata_sample(value: u32, converter: &Converter) -> radc_core::Result<AdcSample> {
    AdcSample::from_bytes(&value.to_be_bytes()[1..], converter)
}

/// Print the result of a console command
pub fn print_outcome(session: &DynSession, outcome: &Outcome) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        Outcome::Commands(commands) => {
            println!("Commands:");
            for c in commands.iter() {
                let synopsis = if c.usage.is_empty() {
                    c.name.to_string()
                } else {
                    format!("{} {}", c.name, c.usage)
                };
                println!("  {:<28} {}", synopsis, c.description);
            }
        }
        Outcome::Registers(registers) => {
            println!("{:<6} {:<10} {:>5} {:<6}", "Addr", "Name", "Bits", "Access");
            println!("{}", "-".repeat(30));
            for r in registers.iter() {
                let access = match (r.readable, r.writable) {
                    (true, true) => "RW",
                    (true, false) => "R",
                    (false, true) => "W",
                    (false, false) => "-",
                };
                println!("0x{:<4X} {:<10} {:>5} {:<6}", r.address(), r.name, r.bit_width, access);
            }
        }
        Outcome::RegisterValue {
            register: Register::AdcData,
            value,
        } => {
            let sample = adcdata_sample(*value, session.cycle().converter())?;
            print_sample(session, &sample)?;
        }
        Outcome::RegisterValue { register, value } => {
            println!("{} (0x{:X}) = 0x{:X}", register, register.address(), value);
        }
        Outcome::Written { register, value } => {
            println!("Wrote 0x{:X} to {} (0x{:X})", value, register, register.address());
        }
        Outcome::Sample(sample) => print_sample(session, sample)?,
        Outcome::Scan(report) => {
            if report.cancelled {
                println!("Scan cancelled after {} samples", report.samples);
            } else {
                println!("Scan complete: {} samples", report.samples);
            }
        }
        Outcome::FastCommand(cmd) => println!("Sent {} (0x{:02X})", cmd, cmd.byte()),
        Outcome::About(info) => {
            println!("{} {}", info.name, info.version);
            println!("Device: {}", info.device);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adcdata_value_decodes_to_volts() {
        let converter = Converter::default();
        let sample = adcdata_sample(0xC0_0000, &converter).unwrap();
        assert_eq!(sample.raw_code, -4_194_304);
        assert_eq!(sample.voltage, -1.65);
        assert_eq!(format_sample(&sample, 5).unwrap(), " -4194304 (0xC00000)  -1.65000 V");

        let sample = adcdata_sample(0x40_0000, &converter).unwrap();
        assert_eq!(format_sample(&sample, 2).unwrap(), "  4194304 (0x400000)  1.65 V");
    }
}
