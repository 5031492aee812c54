//! Startup self-test state machine
//!
//! Writes a configuration register, reads ADCDATA back and logs the result.
//! Every call to [`AppStateMachine::step`] performs exactly one transition so
//! the machine can be driven from a cooperative polling loop; transaction
//! completion is observed through the registered [`Completion`] slot.
//!
//! ```text
//! Initialize -> WriteData -> TransferCompleteWait -> SendReadDataCmd
//!            -> TransferCompleteWait -> Verify -> Error (terminal)
//! ```
//!
//! The verify step does not compare against an expected value: it decodes,
//! logs and terminates.

use crate::bus::{ChipSelect, Completion, Transport};
use crate::error::{Error, Result};
use crate::register::Register;
use crate::sequencer::TransferSequencer;
use crate::voltage::{AdcSample, Converter};

/// Upper bound on recorded transitions
pub const HISTORY_LEN: usize = 16;

/// Where to continue once the outstanding transfer has completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Issue the ADCDATA read command
    SendReadDataCmd,
    /// Clock out the latched result without a command
    ReadData,
    /// Decode the captured sample
    Verify,
}

/// Application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Register the completion slot
    Initialize,
    /// Issue the startup register write
    WriteData,
    /// Issue the ADCDATA read
    SendReadDataCmd,
    /// Wait for transfer-complete and not-busy, then continue
    TransferCompleteWait(Resume),
    /// Issue a capture-only transfer
    ReadData,
    /// Decode, log, terminate
    Verify,
    /// Terminal
    Error,
}

impl From<Resume> for AppState {
    fn from(next: Resume) -> Self {
        match next {
            Resume::SendReadDataCmd => Self::SendReadDataCmd,
            Resume::ReadData => Self::ReadData,
            Resume::Verify => Self::Verify,
        }
    }
}

/// Register write performed by the self-test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupSequence {
    /// Register to write
    pub register: Register,
    /// Value written, MSB first
    pub value: u32,
    /// Collect the result with a separate capture-only transfer
    pub separate_capture: bool,
}

impl Default for StartupSequence {
    fn default() -> Self {
        Self {
            register: Register::Config0,
            value: 0xE3,
            separate_capture: false,
        }
    }
}

/// Cooperative startup state machine
pub struct AppStateMachine {
    state: AppState,
    cycle_active: bool,
    startup: StartupSequence,
    converter: Converter,
    completion: &'static Completion,
    history: heapless::Vec<AppState, HISTORY_LEN>,
    verified: Option<AdcSample>,
}

impl AppStateMachine {
    /// Create a machine in `Initialize`
    pub fn new(completion: &'static Completion, startup: StartupSequence, converter: Converter) -> Self {
        let mut machine = Self {
            state: AppState::Initialize,
            cycle_active: true,
            startup,
            converter,
            completion,
            history: heapless::Vec::new(),
            verified: None,
        };
        machine.record(AppState::Initialize);
        machine
    }

    /// Current state
    pub fn state(&self) -> AppState {
        self.state
    }

    /// The machine has not reached its terminal state yet
    pub fn is_cycle_active(&self) -> bool {
        self.cycle_active
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[AppState] {
        &self.history
    }

    /// Sample decoded by the verify step
    pub fn verified(&self) -> Option<AdcSample> {
        self.verified
    }

    /// Perform one transition
    ///
    /// A failing transaction releases the bus and moves to `Error`.
    pub fn step<T, CS>(&mut self, seq: &mut TransferSequencer<T, CS>) -> Result<AppState>
    where
        T: Transport,
        CS: ChipSelect,
    {
        match self.transition(seq) {
            Ok(next) => {
                if next != self.state {
                    log::debug!("app: {:?} -> {:?}", self.state, next);
                    self.enter(next);
                }
                Ok(next)
            }
            Err(e) => {
                log::warn!("app: {:?} failed: {}", self.state, e);
                seq.release();
                self.enter(AppState::Error);
                Err(e)
            }
        }
    }

    /// Step until the terminal state and return the verified sample
    pub fn run<T, CS>(&mut self, seq: &mut TransferSequencer<T, CS>) -> Result<AdcSample>
    where
        T: Transport,
        CS: ChipSelect,
    {
        if !self.cycle_active {
            return Err(Error::InvalidState);
        }
        while self.cycle_active {
            self.step(seq)?;
        }
        self.verified.ok_or(Error::InvalidState)
    }

    fn transition<T, CS>(&mut self, seq: &mut TransferSequencer<T, CS>) -> Result<AppState>
    where
        T: Transport,
        CS: ChipSelect,
    {
        let adcdata = Register::AdcData.info();

        Ok(match self.state {
            AppState::Initialize => {
                seq.register_completion(self.completion);
                AppState::WriteData
            }
            AppState::WriteData => {
                let StartupSequence { register, value, .. } = self.startup;
                let info = register.info();
                if value > info.max_value() {
                    return Err(Error::InvalidValue);
                }
                let bytes = value.to_be_bytes();
                seq.begin_register_write(register, &bytes[bytes.len() - info.data_len()..])?;
                AppState::TransferCompleteWait(Resume::SendReadDataCmd)
            }
            AppState::TransferCompleteWait(next) => {
                if seq.poll_transfer()? {
                    next.into()
                } else {
                    self.state
                }
            }
            AppState::SendReadDataCmd => {
                seq.begin_register_read(Register::AdcData, adcdata.capture_len())?;
                AppState::TransferCompleteWait(if self.startup.separate_capture {
                    Resume::ReadData
                } else {
                    Resume::Verify
                })
            }
            AppState::ReadData => {
                // Discard the command-phase capture before clocking again
                seq.take_capture()?;
                seq.begin_capture(adcdata.capture_len())?;
                AppState::TransferCompleteWait(Resume::Verify)
            }
            AppState::Verify => {
                let bytes = seq.take_capture()?;
                let sample = AdcSample::from_bytes(&bytes, &self.converter)?;
                log::info!(
                    "self-test: return value 0x{:06X}, {} V",
                    sample.raw_code as u32 & 0xFF_FFFF,
                    sample.voltage
                );
                self.verified = Some(sample);
                AppState::Error
            }
            AppState::Error => AppState::Error,
        })
    }

    fn enter(&mut self, next: AppState) {
        if next == AppState::Error {
            self.cycle_active = false;
        }
        if self.state != next {
            self.record(next);
        }
        self.state = next;
    }

    fn record(&mut self, state: AppState) {
        if self.history.push(state).is_err() {
            log::debug!("app: history full, dropping {:?}", state);
        }
    }
}
