//! Bus collaborator traits and signals
//!
//! This module defines the traits the sequencer needs from the outside
//! world (transport, chip-select, data-ready line) and the small
//! single-slot signals shared with them.

mod signal;
mod traits;

pub use signal::{CancelToken, Completion, WaitPolicy};
pub use traits::*;
