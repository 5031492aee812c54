//! radc-core - Core library for MCP356x ADC register access and sampling
//!
//! This crate implements the command/register wire protocol of the MCP356x
//! family of delta-sigma ADCs, the chip-select scoped transaction
//! sequencing on top of an abstract half-duplex bus, sample decoding and
//! the state machines that drive single-shot, continuous and self-test
//! conversions. It is `no_std` compatible for use on the microcontroller
//! that hosts the ADC.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`) and the
//!   TOML configuration loader
//! - `alloc` - Enable boxed trait objects for the bus collaborators
//!
//! # Example
//!
//! ```ignore
//! use radc_core::bus::Completion;
//! use radc_core::sequencer::TransferSequencer;
//! use radc_core::session::{Outcome, Session};
//!
//! static TRANSFER_DONE: Completion = Completion::new();
//!
//! let seq = TransferSequencer::new(spi, cs);
//! let mut session = Session::new(seq, drdy, &TRANSFER_DONE);
//! if let Outcome::Sample(sample) = session.execute_line("SINGLE", None, |_| {})? {
//!     println!("{} V", session.format(&sample)?);
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod app;
pub mod bus;
pub mod command;
#[cfg(feature = "std")]
pub mod config;
pub mod cycle;
pub mod error;
pub mod frame;
pub mod register;
pub mod sequencer;
pub mod session;
pub mod voltage;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
