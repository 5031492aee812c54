//! Single-slot signals shared between the transport and the controllers

use core::sync::atomic::{AtomicBool, Ordering};

/// Transfer-complete notification
///
/// A single slot, never a queue: the transport sets it once when the
/// submitted transfer finishes and the sequencer consumes it once. Usually
/// declared as a `static` so an interrupt handler can reach it.
///
/// ```ignore
/// static TRANSFER_DONE: Completion = Completion::new();
///
/// transport.register_completion(&TRANSFER_DONE);
/// ```
#[derive(Debug)]
pub struct Completion {
    done: AtomicBool,
}

impl Completion {
    /// An empty slot
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
        }
    }

    /// Mark the outstanding transfer as complete (producer side)
    pub fn signal(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Consume the notification if present (consumer side)
    pub fn take(&self) -> bool {
        self.done.swap(false, Ordering::AcqRel)
    }

    /// Peek without consuming
    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Drop a stale notification
    pub fn clear(&self) {
        self.done.store(false, Ordering::Release);
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation flag for long-running loops
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    /// A token that has not been cancelled
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Re-arm the token for the next run
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

/// How the busy-poll suspension points behave
///
/// The hardware-faithful default polls forever. The bounded variant gives
/// up with [`Error::TransportTimeout`](crate::Error::TransportTimeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Poll until the condition holds
    #[default]
    Unbounded,
    /// Poll at most `timeout_us / poll_delay_us` times
    Bounded {
        /// Maximum time to wait in microseconds
        timeout_us: u32,
        /// Delay between polls in microseconds
        poll_delay_us: u32,
    },
}

impl WaitPolicy {
    /// Number of polls allowed, `None` for unbounded
    pub fn max_polls(&self) -> Option<u32> {
        match *self {
            Self::Unbounded => None,
            Self::Bounded {
                timeout_us,
                poll_delay_us,
            } => Some(if poll_delay_us > 0 {
                timeout_us / poll_delay_us
            } else {
                // Fall back to polling once per microsecond
                timeout_us
            }),
        }
    }

    /// Delay between polls in microseconds
    pub fn poll_delay_us(&self) -> u32 {
        match *self {
            Self::Unbounded => 0,
            Self::Bounded { poll_delay_us, .. } => poll_delay_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_is_single_slot() {
        let done = Completion::new();
        assert!(!done.take());
        done.signal();
        done.signal();
        assert!(done.is_set());
        assert!(done.take());
        assert!(!done.take());
    }

    #[test]
    fn test_max_polls() {
        assert_eq!(WaitPolicy::Unbounded.max_polls(), None);
        let bounded = WaitPolicy::Bounded {
            timeout_us: 1000,
            poll_delay_us: 10,
        };
        assert_eq!(bounded.max_polls(), Some(100));
        let spin = WaitPolicy::Bounded {
            timeout_us: 50,
            poll_delay_us: 0,
        };
        assert_eq!(spin.max_polls(), Some(50));
    }
}
