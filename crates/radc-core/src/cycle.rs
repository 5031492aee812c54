//! Single-shot and continuous (scan) sampling
//!
//! The controller drives the sequencer through the conversion commands and
//! turns every ADCDATA capture into an [`AdcSample`]. Continuous mode needs a
//! one-time device setup (start conversion, then CONFIG3 = continuous) which
//! is latched after it first succeeds.

use crate::bus::{CancelToken, ChipSelect, DataReady, Level, Transport, WaitPolicy};
use crate::error::{Error, Result};
use crate::frame::FastCommand;
use crate::register::{Config3, Register};
use crate::sequencer::TransferSequencer;
use crate::voltage::{AdcSample, Converter};

/// Samples taken by one scan unless configured otherwise
pub const DEFAULT_SCAN_SAMPLES: usize = 50;

/// Conversion cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    /// Nothing in progress
    #[default]
    Idle,
    /// A single conversion has been started and not yet read
    SingleShotPending,
    /// Scan loop running
    ContinuousRunning,
    /// Last cycle failed; the next cycle starts over
    Error,
}

impl CycleState {
    /// Get a human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SingleShotPending => "single-shot pending",
            Self::ContinuousRunning => "continuous",
            Self::Error => "error",
        }
    }
}

/// Outcome of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Number of samples emitted
    pub samples: usize,
    /// The scan was stopped by its cancel token
    pub cancelled: bool,
}

/// Orchestrates single-shot and continuous sampling
#[derive(Debug, Clone)]
pub struct ConversionCycle {
    state: CycleState,
    scan_configured: bool,
    scan_samples: usize,
    converter: Converter,
}

impl Default for ConversionCycle {
    fn default() -> Self {
        Self::new(Converter::default())
    }
}

impl ConversionCycle {
    /// Create an idle controller using `converter` for all samples
    pub fn new(converter: Converter) -> Self {
        Self {
            state: CycleState::Idle,
            scan_configured: false,
            scan_samples: DEFAULT_SCAN_SAMPLES,
            converter,
        }
    }

    /// Set the number of samples per scan
    pub fn with_scan_samples(mut self, samples: usize) -> Self {
        self.scan_samples = samples;
        self
    }

    /// Current state
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Whether the continuous-mode setup has already been done
    pub fn is_scan_configured(&self) -> bool {
        self.scan_configured
    }

    /// Samples per scan
    pub fn scan_samples(&self) -> usize {
        self.scan_samples
    }

    /// Calibration in use
    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Replace the calibration
    pub fn set_converter(&mut self, converter: Converter) {
        self.converter = converter;
    }

    /// Forget the scan setup so the next scan reconfigures the device
    ///
    /// Needed after anything that leaves continuous mode behind the
    /// controller's back: standby, shutdown or a full reset.
    pub fn invalidate_scan_setup(&mut self) {
        if self.scan_configured {
            log::debug!("continuous mode setup invalidated");
        }
        self.scan_configured = false;
    }

    /// Start one conversion and read its result
    pub fn single_shot<T, CS>(&mut self, seq: &mut TransferSequencer<T, CS>) -> Result<AdcSample>
    where
        T: Transport,
        CS: ChipSelect,
    {
        self.enter(CycleState::SingleShotPending)?;
        let result = self.convert_and_read(seq);
        self.finish(seq, &result);
        result
    }

    /// Run the continuous-mode loop
    ///
    /// Every sample is handed to `emit`. Between samples the data-ready line
    /// is polled until it goes low. The loop ends after the configured number
    /// of samples or when `cancel` fires; chip-select is released either way.
    pub fn scan<T, CS, D, F>(
        &mut self,
        seq: &mut TransferSequencer<T, CS>,
        ready: &mut D,
        cancel: Option<&CancelToken>,
        mut emit: F,
    ) -> Result<ScanReport>
    where
        T: Transport,
        CS: ChipSelect,
        D: DataReady,
        F: FnMut(AdcSample),
    {
        self.enter(CycleState::ContinuousRunning)?;
        let result = self.scan_loop(seq, ready, cancel, &mut emit);
        self.finish(seq, &result);
        if let Ok(report) = &result {
            log::info!(
                "scan finished: {} samples{}",
                report.samples,
                if report.cancelled { " (cancelled)" } else { "" }
            );
        }
        result
    }

    fn enter(&mut self, next: CycleState) -> Result<()> {
        match self.state {
            CycleState::Idle | CycleState::Error => {
                log::debug!("cycle: {} -> {}", self.state.name(), next.name());
                self.state = next;
                Ok(())
            }
            _ => Err(Error::InvalidState),
        }
    }

    fn finish<T, CS, R>(&mut self, seq: &mut TransferSequencer<T, CS>, result: &Result<R>)
    where
        T: Transport,
        CS: ChipSelect,
    {
        seq.release();
        self.state = match result {
            Ok(_) => CycleState::Idle,
            Err(e) => {
                log::warn!("{} cycle failed: {}", self.state.name(), e);
                CycleState::Error
            }
        };
    }

    fn convert_and_read<T, CS>(&self, seq: &mut TransferSequencer<T, CS>) -> Result<AdcSample>
    where
        T: Transport,
        CS: ChipSelect,
    {
        seq.fast_command(FastCommand::Conversion)?;
        let sample = self.read_sample(seq)?;
        log::info!("single-shot: code {} = {} V", sample.raw_code, sample.voltage);
        Ok(sample)
    }

    fn read_sample<T, CS>(&self, seq: &mut TransferSequencer<T, CS>) -> Result<AdcSample>
    where
        T: Transport,
        CS: ChipSelect,
    {
        let info = Register::AdcData.info();
        let bytes = seq.read_register(Register::AdcData, info.capture_len())?;
        AdcSample::from_bytes(&bytes, &self.converter)
    }

    fn configure_scan<T, CS>(&mut self, seq: &mut TransferSequencer<T, CS>) -> Result<()>
    where
        T: Transport,
        CS: ChipSelect,
    {
        if self.scan_configured {
            return Ok(());
        }
        log::debug!("configuring continuous conversion mode");
        seq.fast_command(FastCommand::Conversion)?;
        seq.write_register(Register::Config3, &[Config3::CONTINUOUS.bits()])?;
        self.scan_configured = true;
        Ok(())
    }

    fn scan_loop<T, CS, D, F>(
        &mut self,
        seq: &mut TransferSequencer<T, CS>,
        ready: &mut D,
        cancel: Option<&CancelToken>,
        emit: &mut F,
    ) -> Result<ScanReport>
    where
        T: Transport,
        CS: ChipSelect,
        D: DataReady,
        F: FnMut(AdcSample),
    {
        self.configure_scan(seq)?;

        let cancelled = || cancel.map_or(false, CancelToken::is_cancelled);
        let mut report = ScanReport {
            samples: 0,
            cancelled: false,
        };

        while report.samples < self.scan_samples {
            if cancelled() {
                report.cancelled = true;
                break;
            }

            let sample = self.read_sample(seq)?;
            log::trace!("scan sample {}: {} V", report.samples, sample.voltage);
            emit(sample);
            report.samples += 1;

            if report.samples < self.scan_samples {
                let wait = seq.wait_policy();
                if !wait_data_ready(seq.transport_mut(), wait, ready, cancel)? {
                    report.cancelled = true;
                    break;
                }
            }
        }
        Ok(report)
    }
}

/// Poll the data-ready line until it is low
///
/// Returns `Ok(false)` if `cancel` fires first.
fn wait_data_ready<T, D>(
    transport: &mut T,
    wait: WaitPolicy,
    ready: &mut D,
    cancel: Option<&CancelToken>,
) -> Result<bool>
where
    T: Transport,
    D: DataReady,
{
    let cancelled = || cancel.map_or(false, CancelToken::is_cancelled);

    match wait.max_polls() {
        None => loop {
            if cancelled() {
                return Ok(false);
            }
            if ready.read() == Level::Low {
                return Ok(true);
            }
            core::hint::spin_loop();
        },
        Some(max_polls) => {
            for _ in 0..max_polls {
                if cancelled() {
                    return Ok(false);
                }
                if ready.read() == Level::Low {
                    return Ok(true);
                }
                transport.delay_us(wait.poll_delay_us());
            }
            if ready.read() == Level::Low {
                Ok(true)
            } else {
                Err(Error::TransportTimeout)
            }
        }
    }
}
