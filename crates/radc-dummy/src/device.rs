//! Emulated MCP356x register file and bus behaviour

use std::cell::RefCell;
use std::rc::Rc;

use radc_core::bus::{ChipSelect, Completion, DataReady, Level, Transport};
use radc_core::error::{Error, Result};
use radc_core::frame::{decode_frame, FastCommand, Operation, DEVICE_ADDRESS};
use radc_core::register::{Config3, IrqStatus, Register};
use radc_core::voltage::Converter;

/// Unlock code of the LOCK register
pub const UNLOCK_CODE: u32 = 0xA5;

/// Configuration for the emulated ADC
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Analog input in volts
    pub input: f32,
    /// Added to the input after every conversion
    pub step: f32,
    /// Reference used to turn the input into codes
    pub converter: Converter,
    /// Polls reporting busy after each submission
    pub busy_polls: u32,
    /// Data-ready reads reporting high after each ADCDATA read
    pub drdy_polls: u32,
    /// Reject the submission with this index (0-based)
    pub fail_at: Option<usize>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            input: 1.25,
            step: 0.0,
            converter: Converter::default(),
            busy_polls: 0,
            drdy_polls: 0,
            fail_at: None,
        }
    }
}

/// Power state selected by the fast commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    /// Powered, waiting for a conversion start
    Idle,
    /// Conversion running or result pending
    Converting,
    /// Standby fast command received
    Standby,
    /// Shutdown fast command received
    Shutdown,
}

/// Register values after power-on or a full reset
const RESET_VALUES: [(Register, u32); 13] = [
    (Register::AdcData, 0x00_0000),
    (Register::Config0, 0xC0),
    (Register::Config1, 0x0C),
    (Register::Config2, 0x8B),
    (Register::Config3, 0x00),
    (Register::Irq, 0x73),
    (Register::Mux, 0x01),
    (Register::Scan, 0x00_0000),
    (Register::Timer, 0x00_0000),
    (Register::OffsetCal, 0x00_0000),
    (Register::GainCal, 0x80_0000),
    (Register::Lock, UNLOCK_CODE),
    (Register::CrcCfg, 0x0000),
];

/// Bytes still expected for a register write in progress
#[derive(Debug, Clone, Copy)]
struct PendingWrite {
    register: Register,
    value: u32,
    remaining: usize,
}

struct State {
    config: DummyConfig,
    registers: [u32; 16],
    mode: PowerMode,
    cs_asserted: bool,
    command_seen: bool,
    pending_write: Option<PendingWrite>,
    last_read: Option<Register>,
    drdy_countdown: u32,
    busy_remaining: u32,
    submissions: usize,
    conversions: usize,
    completion: Option<&'static Completion>,
}

impl State {
    fn new(config: DummyConfig) -> Self {
        let mut state = Self {
            config,
            registers: [0; 16],
            mode: PowerMode::Idle,
            cs_asserted: false,
            command_seen: false,
            pending_write: None,
            last_read: None,
            drdy_countdown: 0,
            busy_remaining: 0,
            submissions: 0,
            conversions: 0,
            completion: None,
        };
        state.reset_registers();
        state
    }

    fn reset_registers(&mut self) {
        for (register, value) in RESET_VALUES {
            self.registers[register.address() as usize] = value;
        }
    }

    fn reg(&self, register: Register) -> u32 {
        self.registers[register.address() as usize]
    }

    fn irq(&self) -> IrqStatus {
        IrqStatus::from_bits_truncate(self.reg(Register::Irq) as u8)
    }

    /// DR_STATUS in IRQ is active low
    fn data_ready(&self) -> bool {
        !self.irq().contains(IrqStatus::DR_STATUS)
    }

    fn set_data_ready(&mut self, ready: bool) {
        let mut irq = self.irq();
        irq.set(IrqStatus::DR_STATUS, !ready);
        self.registers[Register::Irq.address() as usize] = irq.bits() as u32;
    }

    fn continuous(&self) -> bool {
        let config3 = Config3::from_bits_truncate(self.reg(Register::Config3) as u8);
        config3.contains(Config3::CONTINUOUS)
    }

    /// Count a submission, applying fault injection
    fn submit(&mut self) -> Result<()> {
        if !self.cs_asserted {
            log::warn!("dummy: transfer submitted with chip-select released");
            return Err(Error::TransportSubmitFailure);
        }
        let index = self.submissions;
        self.submissions += 1;
        if self.config.fail_at == Some(index) {
            log::debug!("dummy: rejecting submission {}", index);
            return Err(Error::TransportSubmitFailure);
        }
        Ok(())
    }

    fn complete(&mut self) {
        self.busy_remaining = self.config.busy_polls;
        if let Some(completion) = self.completion {
            completion.signal();
        }
    }

    fn convert(&mut self) {
        let fs = self.config.converter.full_scale;
        let res = self.config.converter.resolution;
        let ideal = (self.config.input / fs * res) as f64;
        let code = ideal.round().clamp(-8_388_608.0, 8_388_607.0) as i32;
        self.registers[Register::AdcData.address() as usize] = code as u32 & 0xFF_FFFF;
        self.conversions += 1;
        self.config.input += self.config.step;
        self.set_data_ready(true);
        log::trace!("dummy: conversion {} -> code {}", self.conversions, code);
    }

    fn fast_command(&mut self, cmd: FastCommand) {
        log::debug!("dummy: fast command {}", cmd);
        match cmd {
            FastCommand::Conversion => {
                self.mode = PowerMode::Converting;
                self.convert();
            }
            FastCommand::Standby => self.mode = PowerMode::Standby,
            FastCommand::Shutdown => self.mode = PowerMode::Shutdown,
            FastCommand::FullReset => {
                self.reset_registers();
                self.mode = PowerMode::Idle;
            }
        }
    }

    /// Status byte shifted out while the command byte goes in
    ///
    /// Bits 5-4 carry the device address, bits 2-0 mirror the DR, CRCCFG
    /// and POR flags of IRQ.
    fn status(&self) -> u8 {
        let flags = IrqStatus::DR_STATUS | IrqStatus::CRCCFG_STATUS | IrqStatus::POR_STATUS;
        (DEVICE_ADDRESS << 4) | ((self.irq() & flags).bits() >> 4)
    }

    /// Consume bytes written while chip-select is held
    fn accept(&mut self, mut data: &[u8]) -> Result<()> {
        if !self.command_seen {
            let Some((&cmd, rest)) = data.split_first() else {
                return Ok(());
            };
            self.command_seen = true;
            self.command(cmd)?;
            data = rest;
        }
        for &byte in data {
            self.payload(byte);
        }
        Ok(())
    }

    fn command(&mut self, byte: u8) -> Result<()> {
        if let Ok(cmd) = FastCommand::try_from(byte) {
            self.fast_command(cmd);
            return Ok(());
        }
        let frame = decode_frame(byte).map_err(|e| {
            log::warn!("dummy: unsupported command byte 0x{:02X}: {}", byte, e);
            Error::TransportSubmitFailure
        })?;
        let register = Register::try_from(frame.register_address)?;
        match frame.operation {
            Operation::Write => {
                self.pending_write = Some(PendingWrite {
                    register,
                    value: 0,
                    remaining: register.info().data_len(),
                });
            }
            Operation::Read => self.last_read = Some(register),
        }
        Ok(())
    }

    fn payload(&mut self, byte: u8) {
        let Some(mut write) = self.pending_write else {
            log::warn!("dummy: ignoring stray byte 0x{:02X}", byte);
            return;
        };
        write.value = (write.value << 8) | byte as u32;
        write.remaining -= 1;
        if write.remaining > 0 {
            self.pending_write = Some(write);
            return;
        }
        self.pending_write = None;
        self.commit(write.register, write.value);
    }

    fn commit(&mut self, register: Register, value: u32) {
        let info = register.info();
        if !info.writable {
            log::warn!("dummy: write to read-only {} ignored", register);
            return;
        }
        if register != Register::Lock && self.reg(Register::Lock) != UNLOCK_CODE {
            log::warn!("dummy: {} is locked", register);
            return;
        }
        log::debug!("dummy: {} <- 0x{:X}", register, value);
        self.registers[register.address() as usize] = value & info.max_value();
        if register == Register::Config3 && self.continuous() && self.mode == PowerMode::Converting {
            self.convert();
        }
    }

    /// Fill `rx` with the status byte followed by the register value
    fn clock_out(&mut self, register: Register, rx: &mut [u8]) {
        let Some((status, value)) = rx.split_first_mut() else {
            return;
        };
        *status = self.status();
        let bytes = self.reg(register).to_be_bytes();
        let width = register.info().data_len();
        for (dst, src) in value.iter_mut().zip(bytes[bytes.len() - width..].iter()) {
            *dst = *src;
        }

        if register == Register::AdcData && !value.is_empty() {
            self.set_data_ready(false);
            if self.continuous() && self.mode == PowerMode::Converting {
                self.drdy_countdown = self.config.drdy_polls;
                self.convert();
            }
        }
    }
}

/// Emulated MCP356x ADC
///
/// Cloning yields another handle to the same device, so one instance can be
/// handed out as transport, chip-select and data-ready line at once.
#[derive(Clone)]
pub struct DummyAdc {
    state: Rc<RefCell<State>>,
}

impl DummyAdc {
    /// Create an emulated ADC with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(State::new(config))),
        }
    }

    /// Create an emulated ADC with the default configuration (1.25 V input)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Current register value
    pub fn register(&self, register: Register) -> u32 {
        self.state.borrow().reg(register)
    }

    /// Change the analog input
    pub fn set_input(&self, volts: f32) {
        self.state.borrow_mut().config.input = volts;
    }

    /// Current analog input
    pub fn input(&self) -> f32 {
        self.state.borrow().config.input
    }

    /// Power state
    pub fn mode(&self) -> PowerMode {
        self.state.borrow().mode
    }

    /// Number of conversions performed so far
    pub fn conversions(&self) -> usize {
        self.state.borrow().conversions
    }

    /// Number of accepted or rejected submissions
    pub fn submissions(&self) -> usize {
        self.state.borrow().submissions
    }

    /// Whether the device is selected
    pub fn is_selected(&self) -> bool {
        self.state.borrow().cs_asserted
    }

    /// CONFIG3 selects continuous conversion
    pub fn is_continuous(&self) -> bool {
        self.state.borrow().continuous()
    }
}

impl Transport for DummyAdc {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.submit()?;
        state.accept(data)?;
        state.complete();
        Ok(())
    }

    fn write_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.submit()?;
        if !tx.is_empty() {
            state.command_seen = false;
            state.accept(&tx[..1])?;
        }
        // A capture without a command keeps streaming the last register read
        let register = state.last_read.ok_or(Error::TransportSubmitFailure)?;
        state.clock_out(register, rx);
        state.complete();
        Ok(())
    }

    fn is_busy(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.busy_remaining > 0 {
            state.busy_remaining -= 1;
            true
        } else {
            false
        }
    }

    fn is_transmitter_busy(&self) -> bool {
        false
    }

    fn register_completion(&mut self, completion: &'static Completion) {
        self.state.borrow_mut().completion = Some(completion);
    }
}

impl ChipSelect for DummyAdc {
    fn assert(&mut self) {
        let mut state = self.state.borrow_mut();
        state.cs_asserted = true;
        state.command_seen = false;
        state.pending_write = None;
    }

    fn deassert(&mut self) {
        let mut state = self.state.borrow_mut();
        if let Some(write) = state.pending_write.take() {
            log::warn!("dummy: {} write aborted with {} bytes missing", write.register, write.remaining);
        }
        state.cs_asserted = false;
        state.command_seen = false;
    }
}

impl DataReady for DummyAdc {
    fn read(&mut self) -> Level {
        let mut state = self.state.borrow_mut();
        if state.drdy_countdown > 0 {
            state.drdy_countdown -= 1;
            return Level::High;
        }
        if state.data_ready() {
            Level::Low
        } else {
            Level::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radc_core::sequencer::TransferSequencer;

    fn sequencer(adc: &DummyAdc) -> TransferSequencer<DummyAdc, DummyAdc> {
        TransferSequencer::new(adc.clone(), adc.clone())
    }

    #[test]
    fn test_reset_values() {
        let adc = DummyAdc::new_default();
        let mut seq = sequencer(&adc);
        assert_eq!(seq.read_register_value(Register::Config0).unwrap(), 0xC0);
        assert_eq!(seq.read_register_value(Register::GainCal).unwrap(), 0x80_0000);
        assert_eq!(seq.read_register_value(Register::Irq).unwrap(), 0x73);
        assert!(!adc.is_selected());
    }

    #[test]
    fn test_write_then_read_back() {
        let adc = DummyAdc::new_default();
        let mut seq = sequencer(&adc);

        seq.write_register_value(Register::Config0, 0xE3).unwrap();
        seq.write_register_value(Register::OffsetCal, 0x10_6E84).unwrap();
        assert_eq!(adc.register(Register::Config0), 0xE3);
        assert_eq!(seq.read_register_value(Register::OffsetCal).unwrap(), 0x10_6E84);
    }

    #[test]
    fn test_conversion_code() {
        let adc = DummyAdc::new(DummyConfig {
            input: -1.65,
            ..DummyConfig::default()
        });
        let mut seq = sequencer(&adc);

        seq.fast_command(FastCommand::Conversion).unwrap();
        assert_eq!(adc.mode(), PowerMode::Converting);
        let bytes = seq.read_register(Register::AdcData, 4).unwrap();
        assert_eq!(bytes.as_slice(), &[0xC0, 0x00, 0x00]);
    }

    #[test]
    fn test_lock_blocks_writes() {
        let adc = DummyAdc::new_default();
        let mut seq = sequencer(&adc);

        seq.write_register_value(Register::Lock, 0x00).unwrap();
        seq.write_register_value(Register::Mux, 0x23).unwrap();
        assert_eq!(adc.register(Register::Mux), 0x01);

        seq.write_register_value(Register::Lock, UNLOCK_CODE).unwrap();
        seq.write_register_value(Register::Mux, 0x23).unwrap();
        assert_eq!(adc.register(Register::Mux), 0x23);
    }

    #[test]
    fn test_full_reset() {
        let adc = DummyAdc::new_default();
        let mut seq = sequencer(&adc);

        seq.write_register_value(Register::Config3, 0xC0).unwrap();
        assert!(adc.is_continuous());
        seq.fast_command(FastCommand::FullReset).unwrap();
        assert!(!adc.is_continuous());
        assert_eq!(adc.register(Register::Config3), 0x00);
    }

    #[test]
    fn test_fault_injection_releases_cs() {
        let adc = DummyAdc::new(DummyConfig {
            fail_at: Some(1),
            ..DummyConfig::default()
        });
        let mut seq = sequencer(&adc);

        // Phase one is accepted, phase two rejected
        assert_eq!(
            seq.write_register_value(Register::Config0, 0xE3),
            Err(Error::TransportSubmitFailure)
        );
        assert!(!adc.is_selected());
        assert_eq!(adc.register(Register::Config0), 0xC0);
    }

    #[test]
    fn test_data_ready_follows_conversions() {
        let mut adc = DummyAdc::new(DummyConfig {
            drdy_polls: 2,
            ..DummyConfig::default()
        });
        let mut seq = sequencer(&adc);
        assert_eq!(adc.read(), Level::High);

        seq.fast_command(FastCommand::Conversion).unwrap();
        assert_eq!(adc.read(), Level::Low);

        seq.write_register_value(Register::Config3, 0xC0).unwrap();
        seq.read_register(Register::AdcData, 4).unwrap();
        assert_eq!(adc.read(), Level::High);
        assert_eq!(adc.read(), Level::High);
        assert_eq!(adc.read(), Level::Low);
    }

    #[test]
    fn test_irq_register_tracks_data_ready() {
        let adc = DummyAdc::new_default();
        let mut seq = sequencer(&adc);
        let dr_status = IrqStatus::DR_STATUS.bits() as u32;

        seq.fast_command(FastCommand::Conversion).unwrap();
        assert_eq!(seq.read_register_value(Register::Irq).unwrap() & dr_status, 0);

        // Status byte: address 1, DR low, CRCCFG and POR high
        seq.begin_register_read(Register::AdcData, 4).unwrap();
        assert_eq!(seq.poll_transfer(), Ok(true));
        seq.take_capture().unwrap();
        assert_eq!(adc.state.borrow().status(), 0x17);
        assert_eq!(adc.register(Register::Irq) & dr_status, dr_status);
    }

    #[test]
    fn test_set_input() {
        let adc = DummyAdc::new_default();
        let mut seq = sequencer(&adc);

        adc.set_input(-0.825);
        assert_eq!(adc.input(), -0.825);
        seq.fast_command(FastCommand::Conversion).unwrap();
        let bytes = seq.read_register(Register::AdcData, 4).unwrap();
        assert_eq!(bytes.as_slice(), &[0xE0, 0x00, 0x00]);
    }
}
