//! radc-dummy - Emulated MCP356x ADC for testing
//!
//! This crate provides an in-memory MCP356x that speaks the same command
//! and register protocol as the real device. It implements the transport,
//! chip-select and data-ready contracts of `radc-core`, so the whole stack
//! can run without hardware.
//!
//! The emulation covers:
//!
//! - the register file with reset values, read-only registers and the
//!   LOCK register
//! - the fast commands (conversion start, standby, shutdown, full reset)
//! - one-shot and continuous conversions of a configurable input voltage
//! - busy and data-ready timing in poll counts, and submission fault
//!   injection

pub mod device;
pub mod error;

pub use device::{DummyAdc, DummyConfig, PowerMode, UNLOCK_CODE};
pub use error::{DummyError, Result};

use radc_core::voltage::Converter;

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| DummyError::InvalidOption {
        key,
        value: value.to_string(),
    })
}

/// Parse transport options into a configuration
///
/// # Options
///
/// - `input=<volts>` - Analog input (default 1.25)
/// - `step=<volts>` - Added to the input after every conversion
/// - `full_scale=<volts>` - Reference voltage (default 3.3)
/// - `busy_polls=N` - Polls reporting busy after each transfer
/// - `drdy_polls=N` - Data-ready polls reporting high between scan samples
/// - `fail_at=N` - Reject the Nth transfer submission (0-based)
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyConfig> {
    let mut config = DummyConfig::default();
    let mut full_scale = config.converter.full_scale;

    for (key, value) in options {
        match *key {
            "input" => config.input = parse_value("input", value)?,
            "step" => config.step = parse_value("step", value)?,
            "full_scale" => full_scale = parse_value("full_scale", value)?,
            "busy_polls" => config.busy_polls = parse_value("busy_polls", value)?,
            "drdy_polls" => config.drdy_polls = parse_value("drdy_polls", value)?,
            "fail_at" => config.fail_at = Some(parse_value("fail_at", value)?),
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    config.converter =
        Converter::new(full_scale, config.converter.resolution).map_err(DummyError::Calibration)?;
    Ok(config)
}

/// Create an emulated ADC from transport options
///
/// This is a convenience function for use in the CLI transport dispatch.
pub fn open(options: &[(&str, &str)]) -> Result<DummyAdc> {
    let config = parse_options(options)?;
    log::info!("Emulated MCP356x with {} V input", config.input);
    Ok(DummyAdc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use radc_core::bus::{Completion, WaitPolicy};
    use radc_core::register::Register;
    use radc_core::sequencer::TransferSequencer;
    use radc_core::session::{Outcome, Session};
    use radc_core::Error;

    fn session(adc: &DummyAdc, done: &'static Completion) -> Session<DummyAdc, DummyAdc, DummyAdc> {
        let seq = TransferSequencer::new(adc.clone(), adc.clone());
        Session::new(seq, adc.clone(), done)
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("input", "-0.5"), ("busy_polls", "3"), ("fail_at", "7")]).unwrap();
        assert_eq!(config.input, -0.5);
        assert_eq!(config.busy_polls, 3);
        assert_eq!(config.fail_at, Some(7));

        assert!(matches!(
            parse_options(&[("drdy_polls", "many")]),
            Err(DummyError::InvalidOption { key: "drdy_polls", .. })
        ));
        assert!(matches!(
            parse_options(&[("full_scale", "inf")]),
            Err(DummyError::Calibration(Error::DecodeOutOfRange))
        ));
    }

    #[test]
    fn test_single_shot() {
        static DONE: Completion = Completion::new();
        let adc = DummyAdc::new_default();
        let mut s = session(&adc, &DONE);

        match s.execute_line("SINGLE", None, |_| {}) {
            Ok(Outcome::Sample(sample)) => {
                assert_eq!(s.format(&sample).unwrap().to_string(), "1.25000");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(adc.conversions(), 1);
        assert!(!adc.is_selected());
    }

    #[test]
    fn test_scan_sets_continuous_mode_once() {
        static DONE: Completion = Completion::new();
        let adc = DummyAdc::new(DummyConfig {
            input: 0.0,
            step: 0.25,
            drdy_polls: 2,
            ..DummyConfig::default()
        });
        let mut s = session(&adc, &DONE).with_scan_samples(5);

        let mut voltages = Vec::new();
        let outcome = s.execute_line("SCAN", None, |sample| voltages.push(sample.voltage));
        assert!(matches!(outcome, Ok(Outcome::Scan(r)) if r.samples == 5 && !r.cancelled));
        assert!(adc.is_continuous());
        assert_eq!(voltages.len(), 5);
        assert!(voltages.windows(2).all(|w| w[1] > w[0]));

        let submissions_before = adc.submissions();
        s.execute_line("SCAN", None, |_| {}).unwrap();
        // Second scan: five reads and no setup traffic
        assert_eq!(adc.submissions() - submissions_before, 5);
    }

    #[test]
    fn test_scan_after_full_reset() {
        static DONE: Completion = Completion::new();
        let adc = DummyAdc::new(DummyConfig {
            drdy_polls: 1,
            ..DummyConfig::default()
        });
        let seq = TransferSequencer::new(adc.clone(), adc.clone()).with_wait_policy(WaitPolicy::Bounded {
            timeout_us: 100,
            poll_delay_us: 10,
        });
        let mut s = Session::new(seq, adc.clone(), &DONE).with_scan_samples(3);

        assert!(matches!(s.execute_line("SCAN", None, |_| {}), Ok(Outcome::Scan(r)) if r.samples == 3));
        s.execute_line("DEFAULT", None, |_| {}).unwrap();
        assert!(!adc.is_continuous());

        // The reset dropped continuous mode, so the scan sets it up again
        assert!(matches!(s.execute_line("SCAN", None, |_| {}), Ok(Outcome::Scan(r)) if r.samples == 3));
        assert!(adc.is_continuous());
    }

    #[test]
    fn test_self_test_writes_config0() {
        static DONE: Completion = Completion::new();
        let adc = DummyAdc::new(DummyConfig {
            busy_polls: 2,
            ..DummyConfig::default()
        });
        let mut s = session(&adc, &DONE);

        let sample = s.self_test().unwrap();
        assert_eq!(sample.raw_code, 0);
        assert_eq!(adc.register(Register::Config0), 0xE3);
        assert!(!adc.is_selected());
    }

    #[test]
    fn test_register_commands() {
        static DONE: Completion = Completion::new();
        let adc = DummyAdc::new_default();
        let mut s = session(&adc, &DONE);

        s.execute_line("WRITE MUX 0x12", None, |_| {}).unwrap();
        assert_eq!(
            s.execute_line("read 6", None, |_| {}),
            Ok(Outcome::RegisterValue {
                register: Register::Mux,
                value: 0x12
            })
        );
        assert_eq!(s.execute_line("WRITE CRCCFG 1", None, |_| {}), Err(Error::RegisterNotWritable));
        assert_eq!(s.execute_line("READ 0xC", None, |_| {}), Err(Error::InvalidRegisterAddress(0xC)));
    }

    #[test]
    fn test_power_commands() {
        static DONE: Completion = Completion::new();
        let adc = DummyAdc::new_default();
        let mut s = session(&adc, &DONE);

        s.execute_line("STANDBY", None, |_| {}).unwrap();
        assert_eq!(adc.mode(), PowerMode::Standby);
        s.execute_line("SHUTDOWN", None, |_| {}).unwrap();
        assert_eq!(adc.mode(), PowerMode::Shutdown);
        s.execute_line("WRITE CONFIG0 0x23", None, |_| {}).unwrap();
        s.execute_line("DEFAULT", None, |_| {}).unwrap();
        assert_eq!(adc.register(Register::Config0), 0xC0);
        assert_eq!(adc.mode(), PowerMode::Idle);
    }

    #[test]
    fn test_transport_failures_surface() {
        static DONE: Completion = Completion::new();
        let adc = DummyAdc::new(DummyConfig {
            fail_at: Some(0),
            ..DummyConfig::default()
        });
        let mut s = session(&adc, &DONE);

        assert_eq!(
            s.execute_line("CONVERT", None, |_| {}),
            Err(Error::TransportSubmitFailure)
        );
        assert!(!adc.is_selected());
        // Nothing is retried; the next command works
        assert!(s.execute_line("CONVERT", None, |_| {}).is_ok());
    }

    #[test]
    fn test_bounded_wait_times_out() {
        static DONE: Completion = Completion::new();
        let adc = DummyAdc::new(DummyConfig {
            busy_polls: 1_000,
            ..DummyConfig::default()
        });
        let seq = TransferSequencer::new(adc.clone(), adc.clone()).with_wait_policy(WaitPolicy::Bounded {
            timeout_us: 100,
            poll_delay_us: 10,
        });
        let mut s = Session::new(seq, adc.clone(), &DONE);

        assert_eq!(s.execute_line("READ CONFIG0", None, |_| {}), Err(Error::TransportTimeout));
        assert!(!adc.is_selected());
    }
}
