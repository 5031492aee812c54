//! Command execution against one device
//!
//! A [`Session`] owns everything that used to be global state: the
//! sequencer with its scratch buffers, the data-ready line, the conversion
//! cycle (and its scan-setup latch) and the completion slot used by the
//! self-test.

use crate::app::{AppStateMachine, StartupSequence};
use crate::bus::{CancelToken, ChipSelect, Completion, DataReady, Transport};
use crate::command::{Command, CommandInfo, COMMANDS};
use crate::cycle::{ConversionCycle, ScanReport};
use crate::error::{Error, Result};
use crate::frame::FastCommand;
use crate::register::{self, Register, RegisterInfo};
use crate::sequencer::TransferSequencer;
use crate::voltage::{AdcSample, Converter, DisplayVoltage, DEFAULT_DIGITS, MAX_DIGITS};

/// Build information shown by `about`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    /// Package name
    pub name: &'static str,
    /// Package version
    pub version: &'static str,
    /// Target device
    pub device: &'static str,
}

/// Information about this build
pub const BUILD_INFO: BuildInfo = BuildInfo {
    name: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
    device: "MCP3561/2/4 delta-sigma ADC",
};

/// Result of one executed command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Command listing
    Commands(&'static [CommandInfo]),
    /// Register listing
    Registers(&'static [RegisterInfo]),
    /// Value read from a register
    RegisterValue {
        /// Register read
        register: Register,
        /// Value, MSB first
        value: u32,
    },
    /// Value written to a register
    Written {
        /// Register written
        register: Register,
        /// Value, MSB first
        value: u32,
    },
    /// One conversion
    Sample(AdcSample),
    /// Scan summary; the samples went to the emit callback
    Scan(ScanReport),
    /// Fast command sent
    FastCommand(FastCommand),
    /// Build information
    About(BuildInfo),
}

/// One device and the controllers that drive it
pub struct Session<T, CS, D> {
    seq: TransferSequencer<T, CS>,
    ready: D,
    cycle: ConversionCycle,
    completion: &'static Completion,
    startup: StartupSequence,
    digits: u8,
}

impl<T, CS, D> Session<T, CS, D>
where
    T: Transport,
    CS: ChipSelect,
    D: DataReady,
{
    /// Create a session with default calibration and scan length
    pub fn new(seq: TransferSequencer<T, CS>, ready: D, completion: &'static Completion) -> Self {
        Self {
            seq,
            ready,
            cycle: ConversionCycle::default(),
            completion,
            startup: StartupSequence::default(),
            digits: DEFAULT_DIGITS,
        }
    }

    /// Use a different calibration
    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.cycle.set_converter(converter);
        self
    }

    /// Set the number of samples per scan
    pub fn with_scan_samples(mut self, samples: usize) -> Self {
        self.cycle = self.cycle.with_scan_samples(samples);
        self
    }

    /// Set the register write performed by the self-test
    pub fn with_startup(mut self, startup: StartupSequence) -> Self {
        self.startup = startup;
        self
    }

    /// Set the number of fractional digits used by [`format`](Self::format)
    pub fn with_digits(mut self, digits: u8) -> Result<Self> {
        if digits > MAX_DIGITS {
            return Err(Error::DecodeOutOfRange);
        }
        self.digits = digits;
        Ok(self)
    }

    /// Fractional digits used for display
    pub fn digits(&self) -> u8 {
        self.digits
    }

    /// Format a sample's voltage for display
    pub fn format(&self, sample: &AdcSample) -> Result<DisplayVoltage> {
        sample.display(self.digits)
    }

    /// The conversion cycle controller
    pub fn cycle(&self) -> &ConversionCycle {
        &self.cycle
    }

    /// The transfer sequencer
    pub fn sequencer(&self) -> &TransferSequencer<T, CS> {
        &self.seq
    }

    /// Execute a parsed command
    ///
    /// Scan samples are passed to `emit` as they arrive; `cancel` stops a
    /// running scan.
    pub fn execute<F>(&mut self, cmd: Command, cancel: Option<&CancelToken>, mut emit: F) -> Result<Outcome>
    where
        F: FnMut(AdcSample),
    {
        log::debug!("executing {}", cmd.name());
        match cmd {
            Command::Adc => Ok(Outcome::Commands(COMMANDS)),
            Command::Registers => Ok(Outcome::Registers(register::all())),
            Command::Read(register) => {
                let value = self.seq.read_register_value(register)?;
                log::info!("{} = 0x{:X}", register, value);
                Ok(Outcome::RegisterValue { register, value })
            }
            Command::Write(register, value) => {
                self.seq.write_register_value(register, value)?;
                log::info!("{} <- 0x{:X}", register, value);
                Ok(Outcome::Written { register, value })
            }
            Command::Single => self.cycle.single_shot(&mut self.seq).map(Outcome::Sample),
            Command::Scan => self
                .cycle
                .scan(&mut self.seq, &mut self.ready, cancel, &mut emit)
                .map(Outcome::Scan),
            Command::Convert => self.fast(FastCommand::Conversion),
            Command::Standby => self.fast(FastCommand::Standby),
            Command::Shutdown => self.fast(FastCommand::Shutdown),
            Command::Default => self.fast(FastCommand::FullReset),
            Command::About => Ok(Outcome::About(BUILD_INFO)),
        }
    }

    fn fast(&mut self, cmd: FastCommand) -> Result<Outcome> {
        self.seq.fast_command(cmd)?;
        if cmd != FastCommand::Conversion {
            self.cycle.invalidate_scan_setup();
        }
        log::info!("sent {}", cmd);
        Ok(Outcome::FastCommand(cmd))
    }

    /// Parse and execute one console line
    pub fn execute_line<F>(&mut self, line: &str, cancel: Option<&CancelToken>, emit: F) -> Result<Outcome>
    where
        F: FnMut(AdcSample),
    {
        let cmd = Command::parse(line)?;
        self.execute(cmd, cancel, emit)
    }

    /// Run the startup write/read/verify sequence
    pub fn self_test(&mut self) -> Result<AdcSample> {
        let mut app = AppStateMachine::new(self.completion, self.startup, *self.cycle.converter());
        let result = app.run(&mut self.seq);
        log::debug!("self-test visited {:?}", app.history());
        result
    }
}
