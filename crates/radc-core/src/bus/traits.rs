//! Collaborator trait definitions
//!
//! The physical bus peripheral, the chip-select GPIO and the data-ready
//! interrupt line all live outside this crate. These traits describe the
//! minimal contract the sequencer and the conversion loops rely on.

use super::Completion;
use crate::error::Result;

/// Half-duplex serial transport (the SPI peripheral)
///
/// Submissions are asynchronous on real hardware: `write` and `write_read`
/// only hand the bytes to the peripheral. Completion is reported through
/// `is_busy`/`is_transmitter_busy` and, when registered, by setting the
/// [`Completion`] slot once the last submitted transfer has finished.
///
/// ## Example: blocking peripheral
///
/// ```ignore
/// impl Transport for Spidev {
///     fn write(&mut self, data: &[u8]) -> Result<()> {
///         self.dev.write(data).map_err(|_| Error::TransportSubmitFailure)?;
///         self.signal_done();
///         Ok(())
///     }
///     // ...
/// }
/// ```
pub trait Transport {
    /// Submit bytes for transmission; received bytes are ignored
    ///
    /// Returns [`Error::TransportSubmitFailure`](crate::Error::TransportSubmitFailure)
    /// or [`Error::TransportBusy`](crate::Error::TransportBusy) if the
    /// peripheral rejects the request.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Submit a full-duplex transfer
    ///
    /// The peripheral clocks `max(tx.len(), rx.len())` bytes. `rx[0]` is
    /// captured while the first `tx` byte is shifted out.
    fn write_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()>;

    /// A transfer is still in progress (including reception)
    fn is_busy(&self) -> bool;

    /// The transmit shift register still holds data
    fn is_transmitter_busy(&self) -> bool;

    /// Register the slot to set when a submitted transfer completes
    fn register_completion(&mut self, completion: &'static Completion);

    /// Delay between polls of a bounded wait
    fn delay_us(&mut self, _us: u32) {}
}

/// Chip-select line of the ADC (active low on the wire)
pub trait ChipSelect {
    /// Select the device (drive CS low)
    fn assert(&mut self);

    /// Deselect the device (drive CS high)
    fn deassert(&mut self);
}

/// Electrical level of a digital input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Logic low
    Low,
    /// Logic high
    High,
}

/// Data-ready (IRQ) line of the ADC
///
/// The line is active low: it goes low when a new conversion result can
/// be read.
pub trait DataReady {
    /// Sample the current level
    fn read(&mut self) -> Level;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn write_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        (**self).write_read(tx, rx)
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn is_transmitter_busy(&self) -> bool {
        (**self).is_transmitter_busy()
    }

    fn register_completion(&mut self, completion: &'static Completion) {
        (**self).register_completion(completion)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

// Blanket impl for boxed transports to allow trait objects
#[cfg(feature = "alloc")]
impl Transport for alloc::boxed::Box<dyn Transport> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn write_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        (**self).write_read(tx, rx)
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn is_transmitter_busy(&self) -> bool {
        (**self).is_transmitter_busy()
    }

    fn register_completion(&mut self, completion: &'static Completion) {
        (**self).register_completion(completion)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

#[cfg(feature = "alloc")]
impl ChipSelect for alloc::boxed::Box<dyn ChipSelect> {
    fn assert(&mut self) {
        (**self).assert()
    }

    fn deassert(&mut self) {
        (**self).deassert()
    }
}

#[cfg(feature = "alloc")]
impl DataReady for alloc::boxed::Box<dyn DataReady> {
    fn read(&mut self) -> Level {
        (**self).read()
    }
}

/// Information about a transport backend
#[derive(Debug, Clone)]
pub struct TransportInfo {
    /// Name of the transport
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Description
    pub description: &'static str,
}
