//! Chip-select scoped transactions
//!
//! Every logical transaction (command byte plus payload or capture) runs
//! inside one chip-select window. The window is only closed once the
//! transport is idle again, so two transactions never overlap.
//!
//! Register reads clock `len` bytes. The first captured byte is shifted in
//! while the command goes out and is stale; the value is the trailing
//! `len - 1` bytes, MSB first:
//!
//! ```text
//! MOSI: [CMD ] [ -- ] [ -- ] [ -- ]
//! MISO: [ XX ] [ D2 ] [ D1 ] [ D0 ]
//! ```
//!
//! Register writes go out in two phases (command byte, then payload),
//! each followed by a poll of the transmitter.

use crate::bus::{ChipSelect, Completion, Transport, WaitPolicy};
use crate::error::{Error, Result};
use crate::frame::{CommandFrame, FastCommand, Operation};
use crate::register::Register;

/// Longest transaction: one command byte and up to four data bytes
pub const MAX_TRANSFER_LEN: usize = 5;

/// Longest read capture (ADCDATA: dummy byte plus 24-bit value)
pub const MAX_CAPTURE_LEN: usize = 4;

/// Register value bytes with the dummy byte already dropped, MSB first
pub type RegisterBytes = heapless::Vec<u8, MAX_CAPTURE_LEN>;

/// Transaction currently holding the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Read { len: usize },
    Write,
}

/// Executes register and fast-command transactions over a transport
///
/// The sequencer owns the transmit/receive scratch buffers; they are only
/// touched while `&mut self` is held, i.e. for one transaction at a time.
pub struct TransferSequencer<T, CS> {
    transport: T,
    cs: CS,
    wait: WaitPolicy,
    completion: Option<&'static Completion>,
    tx: [u8; MAX_TRANSFER_LEN],
    rx: [u8; MAX_TRANSFER_LEN],
    pending: Option<Pending>,
    captured: usize,
}

/// Poll `idle` until it holds, honouring the wait policy
fn poll_until<T, F>(transport: &mut T, wait: WaitPolicy, idle: F) -> Result<()>
where
    T: Transport + ?Sized,
    F: Fn(&T) -> bool,
{
    match wait.max_polls() {
        None => {
            while !idle(&*transport) {
                core::hint::spin_loop();
            }
            Ok(())
        }
        Some(max_polls) => {
            for _ in 0..max_polls {
                if idle(&*transport) {
                    return Ok(());
                }
                transport.delay_us(wait.poll_delay_us());
            }
            if idle(&*transport) {
                Ok(())
            } else {
                Err(Error::TransportTimeout)
            }
        }
    }
}

impl<T: Transport, CS: ChipSelect> TransferSequencer<T, CS> {
    /// Create a sequencer with the unbounded (hardware-faithful) wait policy
    pub fn new(transport: T, cs: CS) -> Self {
        Self {
            transport,
            cs,
            wait: WaitPolicy::Unbounded,
            completion: None,
            tx: [0; MAX_TRANSFER_LEN],
            rx: [0; MAX_TRANSFER_LEN],
            pending: None,
            captured: 0,
        }
    }

    /// Set the wait policy used by all busy polls
    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Current wait policy
    pub fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }

    /// Register the transfer-complete slot with the transport
    ///
    /// Any stale notification in the slot is dropped first.
    pub fn register_completion(&mut self, completion: &'static Completion) {
        completion.clear();
        self.transport.register_completion(completion);
        self.completion = Some(completion);
    }

    /// Whether a completion slot has been registered
    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }

    /// No transaction is holding the bus
    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// Access the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ------------------------------------------------------------------
    // Blocking transactions
    // ------------------------------------------------------------------

    /// Read `len` bytes from a register, dropping the leading dummy byte
    ///
    /// `len` counts every clocked byte, so a full ADCDATA read uses 4 and
    /// returns 3 value bytes.
    pub fn read_register(&mut self, register: Register, len: usize) -> Result<RegisterBytes> {
        self.begin_register_read(register, len)?;
        self.finish_blocking()?;
        self.take_capture()
    }

    /// Read the full value of a register as an integer
    pub fn read_register_value(&mut self, register: Register) -> Result<u32> {
        let bytes = self.read_register(register, register.info().capture_len())?;
        Ok(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
    }

    /// Write a register; `payload` must match the register width
    pub fn write_register(&mut self, register: Register, payload: &[u8]) -> Result<()> {
        self.begin_register_write(register, payload)?;
        self.finish_blocking()
    }

    /// Write an integer value to a register, MSB first
    pub fn write_register_value(&mut self, register: Register, value: u32) -> Result<()> {
        let info = register.info();
        if value > info.max_value() {
            return Err(Error::InvalidValue);
        }
        let bytes = value.to_be_bytes();
        self.write_register(register, &bytes[bytes.len() - info.data_len()..])
    }

    /// Send a single-byte fast command
    ///
    /// On a rejected submission chip-select is released and the error is
    /// returned; nothing is retried.
    pub fn fast_command(&mut self, cmd: FastCommand) -> Result<()> {
        self.check_idle()?;
        self.tx[0] = cmd.byte();
        log::trace!("fast command {} (0x{:02X})", cmd, cmd.byte());

        self.cs.assert();
        let wait = self.wait;
        let result = self
            .transport
            .write(&self.tx[..1])
            .and_then(|()| poll_until(&mut self.transport, wait, |t| !t.is_transmitter_busy()));
        self.discard_completion();
        self.cs.deassert();

        if let Err(e) = result {
            log::warn!("fast command {} failed: {}", cmd, e);
        }
        result
    }

    // ------------------------------------------------------------------
    // Split-phase transactions for the cooperative state machine
    // ------------------------------------------------------------------

    /// Submit a register read and keep chip-select asserted
    ///
    /// Finish with [`poll_transfer`](Self::poll_transfer) and collect the
    /// value with [`take_capture`](Self::take_capture).
    pub fn begin_register_read(&mut self, register: Register, len: usize) -> Result<()> {
        self.check_idle()?;
        let info = register.info();
        if !info.readable {
            return Err(Error::RegisterNotReadable);
        }
        if len == 0 || len > info.capture_len() {
            return Err(Error::InvalidLength);
        }

        let frame = CommandFrame::new(register.address(), Operation::Read)?.to_byte();
        self.tx[0] = frame;
        self.rx = [0; MAX_TRANSFER_LEN];
        self.captured = 0;
        log::trace!("read {} frame 0x{:02X}, {} bytes", register, frame, len);

        self.cs.assert();
        if let Err(e) = self.transport.write_read(&self.tx[..1], &mut self.rx[..len]) {
            self.cs.deassert();
            log::warn!("read {} rejected: {}", register, e);
            return Err(e);
        }
        self.pending = Some(Pending::Read { len });
        Ok(())
    }

    /// Clock `len` bytes in without sending a command
    ///
    /// Used to collect a result that an earlier read command has latched.
    /// The capture keeps the same layout as a register read.
    pub fn begin_capture(&mut self, len: usize) -> Result<()> {
        self.check_idle()?;
        if len == 0 || len > MAX_CAPTURE_LEN {
            return Err(Error::InvalidLength);
        }

        self.rx = [0; MAX_TRANSFER_LEN];
        self.captured = 0;
        log::trace!("capture {} bytes", len);

        self.cs.assert();
        if let Err(e) = self.transport.write_read(&[], &mut self.rx[..len]) {
            self.cs.deassert();
            log::warn!("capture rejected: {}", e);
            return Err(e);
        }
        self.pending = Some(Pending::Read { len });
        Ok(())
    }

    /// Submit both phases of a register write and keep chip-select asserted
    pub fn begin_register_write(&mut self, register: Register, payload: &[u8]) -> Result<()> {
        self.check_idle()?;
        let info = register.info();
        if !info.writable {
            return Err(Error::RegisterNotWritable);
        }
        if payload.len() != info.data_len() {
            return Err(Error::InvalidLength);
        }

        let frame = CommandFrame::new(register.address(), Operation::Write)?.to_byte();
        self.tx[0] = frame;
        self.tx[1..=payload.len()].copy_from_slice(payload);
        log::trace!("write {} frame 0x{:02X}, payload {:02X?}", register, frame, payload);

        self.cs.assert();
        if let Err(e) = self.write_phases(payload.len()) {
            // A failure after phase one leaves the register half written;
            // the device has no rollback.
            self.discard_completion();
            self.cs.deassert();
            log::warn!("write {} failed: {}", register, e);
            return Err(e);
        }
        self.pending = Some(Pending::Write);
        Ok(())
    }

    /// Check whether the transaction in flight has completed
    ///
    /// Returns `Ok(true)` once the transport has signalled completion and is
    /// no longer busy; chip-select is released at that point. Without a
    /// registered completion slot only the busy flag is consulted.
    pub fn poll_transfer(&mut self) -> Result<bool> {
        let pending = self.pending.ok_or(Error::InvalidState)?;

        let signalled = match self.completion {
            Some(completion) => completion.take(),
            None => !self.transport.is_busy(),
        };
        if !signalled {
            return Ok(false);
        }

        let result = poll_until(&mut self.transport, self.wait, |t| !t.is_busy());
        self.release_pending(pending, result.is_ok());
        result.map(|()| true)
    }

    /// Value bytes of the last completed read, dummy byte dropped
    pub fn take_capture(&mut self) -> Result<RegisterBytes> {
        if self.captured == 0 {
            return Err(Error::InvalidState);
        }
        let len = core::mem::take(&mut self.captured);
        RegisterBytes::from_slice(&self.rx[1..len]).map_err(|_| Error::InvalidLength)
    }

    /// Abort whatever is in flight and release chip-select
    pub fn release(&mut self) {
        if self.pending.take().is_some() {
            log::debug!("releasing bus with a transaction in flight");
        }
        self.discard_completion();
        self.cs.deassert();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn check_idle(&self) -> Result<()> {
        if self.pending.is_some() {
            Err(Error::TransportBusy)
        } else {
            Ok(())
        }
    }

    fn write_phases(&mut self, payload_len: usize) -> Result<()> {
        // Phase one: command byte
        self.transport.write(&self.tx[..1])?;
        poll_until(&mut self.transport, self.wait, |t| !t.is_transmitter_busy())?;
        // Phase two: payload
        self.transport.write(&self.tx[1..=payload_len])?;
        poll_until(&mut self.transport, self.wait, |t| !t.is_transmitter_busy())
    }

    fn finish_blocking(&mut self) -> Result<()> {
        let pending = self.pending.ok_or(Error::InvalidState)?;
        let result = poll_until(&mut self.transport, self.wait, |t| !t.is_busy());
        self.discard_completion();
        self.release_pending(pending, result.is_ok());
        result
    }

    /// Close the transaction; a read only yields a capture if it completed
    fn release_pending(&mut self, pending: Pending, completed: bool) {
        self.pending = None;
        self.captured = match pending {
            Pending::Read { len } if completed => len,
            _ => 0,
        };
        self.cs.deassert();
    }

    fn discard_completion(&mut self) {
        if let Some(completion) = self.completion {
            completion.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, MockBus};
    use std::vec;

    #[test]
    fn test_adcdata_read_discards_dummy_byte() {
        let bus = MockBus::new();
        bus.set_response(&[0xA5, 0x12, 0x34, 0x56]);
        let mut seq = bus.sequencer();

        let bytes = seq.read_register(Register::AdcData, 4).unwrap();
        assert_eq!(bytes.as_slice(), &[0x12, 0x34, 0x56]);
        assert_eq!(
            bus.events(),
            vec![
                Event::Assert,
                Event::WriteRead(vec![0x41], 4),
                Event::Deassert,
            ]
        );
    }

    #[test]
    fn test_every_read_is_one_cs_window() {
        let bus = MockBus::new();
        bus.set_response(&[0x00, 0xE3]);
        let mut seq = bus.sequencer();

        for _ in 0..3 {
            assert_eq!(seq.read_register_value(Register::Config0).unwrap(), 0xE3);
        }
        assert_eq!(bus.count(&Event::Assert), 3);
        assert_eq!(bus.count(&Event::Deassert), 3);
    }

    #[test]
    fn test_read_waits_for_not_busy_before_release() {
        let bus = MockBus::new();
        bus.set_busy_polls(3);
        let mut seq = bus.sequencer();

        seq.read_register(Register::Irq, 2).unwrap();
        let events = bus.events();
        let busy_end = events.iter().position(|e| *e == Event::BusyCleared).unwrap();
        let release = events.iter().position(|e| *e == Event::Deassert).unwrap();
        assert!(busy_end < release);
    }

    #[test]
    fn test_two_phase_write() {
        let bus = MockBus::new();
        let mut seq = bus.sequencer();

        seq.write_register(Register::Config3, &[0xC0]).unwrap();
        assert_eq!(
            bus.events(),
            vec![
                Event::Assert,
                Event::Write(vec![0x52]),
                Event::Write(vec![0xC0]),
                Event::Deassert,
            ]
        );
    }

    #[test]
    fn test_write_value_is_msb_first() {
        let bus = MockBus::new();
        let mut seq = bus.sequencer();

        seq.write_register_value(Register::OffsetCal, 0x106E84).unwrap();
        assert!(bus.events().contains(&Event::Write(vec![0x10, 0x6E, 0x84])));
        assert_eq!(
            seq.write_register_value(Register::Config0, 0x100),
            Err(Error::InvalidValue)
        );
    }

    #[test]
    fn test_access_and_length_checks() {
        let bus = MockBus::new();
        let mut seq = bus.sequencer();

        assert_eq!(
            seq.write_register(Register::AdcData, &[0, 0, 0]),
            Err(Error::RegisterNotWritable)
        );
        assert_eq!(
            seq.write_register(Register::Config0, &[0, 0]),
            Err(Error::InvalidLength)
        );
        assert_eq!(
            seq.read_register(Register::Config0, 4),
            Err(Error::InvalidLength)
        );
        assert_eq!(seq.read_register(Register::AdcData, 0), Err(Error::InvalidLength));
        // Validation happens before the bus is touched
        assert!(bus.events().is_empty());
    }

    #[test]
    fn test_fast_command_submit_failure_releases_cs() {
        let bus = MockBus::new();
        bus.fail_submission(0, Error::TransportSubmitFailure);
        let mut seq = bus.sequencer();

        assert_eq!(
            seq.fast_command(FastCommand::Conversion),
            Err(Error::TransportSubmitFailure)
        );
        assert_eq!(bus.events(), vec![Event::Assert, Event::Deassert]);
        assert!(seq.is_idle());

        // Not retried, and the next command goes through
        seq.fast_command(FastCommand::Standby).unwrap();
        assert!(bus.events().contains(&Event::Write(vec![0x6C])));
    }

    #[test]
    fn test_phase_two_failure_leaves_partial_write() {
        let bus = MockBus::new();
        bus.fail_submission(1, Error::TransportBusy);
        let mut seq = bus.sequencer();

        assert_eq!(
            seq.write_register(Register::Config0, &[0xE3]),
            Err(Error::TransportBusy)
        );
        // Phase one reached the wire, phase two did not; CS is released anyway
        assert_eq!(
            bus.events(),
            vec![Event::Assert, Event::Write(vec![0x46]), Event::Deassert]
        );
        assert!(seq.is_idle());
    }

    #[test]
    fn test_bounded_wait_times_out() {
        let bus = MockBus::new();
        bus.set_stuck_busy(true);
        let mut seq = bus.sequencer().with_wait_policy(WaitPolicy::Bounded {
            timeout_us: 100,
            poll_delay_us: 10,
        });

        assert_eq!(
            seq.read_register(Register::AdcData, 4),
            Err(Error::TransportTimeout)
        );
        assert_eq!(bus.count(&Event::Deassert), 1);
        assert_eq!(bus.delay_total_us(), 100);
        assert!(seq.is_idle());
        // Nothing from the timed-out read can be collected
        assert_eq!(seq.take_capture(), Err(Error::InvalidState));
    }

    #[test]
    fn test_split_phase_timeout_drops_capture() {
        static DONE: Completion = Completion::new();
        let bus = MockBus::new();
        bus.set_response(&[0x00, 0x12, 0x34, 0x56]);
        let mut seq = bus.sequencer().with_wait_policy(WaitPolicy::Bounded {
            timeout_us: 20,
            poll_delay_us: 10,
        });
        seq.register_completion(&DONE);

        seq.begin_register_read(Register::AdcData, 4).unwrap();
        bus.set_stuck_busy(true);
        assert_eq!(seq.poll_transfer(), Err(Error::TransportTimeout));
        assert_eq!(bus.count(&Event::Deassert), 1);
        assert_eq!(seq.take_capture(), Err(Error::InvalidState));
    }

    #[test]
    fn test_split_phase_read_with_completion() {
        static DONE: Completion = Completion::new();
        let bus = MockBus::new();
        bus.set_response(&[0x00, 0x7F, 0xFF, 0xFF]);
        bus.set_defer_completion(true);
        let mut seq = bus.sequencer();
        seq.register_completion(&DONE);

        seq.begin_register_read(Register::AdcData, 4).unwrap();
        assert_eq!(seq.read_register(Register::Config0, 2), Err(Error::TransportBusy));
        assert_eq!(seq.poll_transfer(), Ok(false));
        assert_eq!(bus.count(&Event::Deassert), 0);

        bus.complete();
        assert_eq!(seq.poll_transfer(), Ok(true));
        assert_eq!(bus.count(&Event::Deassert), 1);
        assert_eq!(seq.take_capture().unwrap().as_slice(), &[0x7F, 0xFF, 0xFF]);
        assert_eq!(seq.take_capture(), Err(Error::InvalidState));
    }

    #[test]
    fn test_poll_without_transfer() {
        let bus = MockBus::new();
        let mut seq = bus.sequencer();
        assert_eq!(seq.poll_transfer(), Err(Error::InvalidState));
    }
}
