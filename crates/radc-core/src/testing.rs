//! Recording mock collaborators shared by the unit tests

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use crate::bus::{ChipSelect, Completion, DataReady, Level, Transport};
use crate::error::{Error, Result};
use crate::sequencer::TransferSequencer;

/// Observable bus activity, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Assert,
    Deassert,
    Write(Vec<u8>),
    WriteRead(Vec<u8>, usize),
    BusyCleared,
    DataReadyRead(Level),
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    response: Vec<u8>,
    submissions: usize,
    fail_at: Option<(usize, Error)>,
    busy_polls: u32,
    busy_remaining: u32,
    stuck_busy: bool,
    defer_completion: bool,
    deferred: bool,
    completion: Option<&'static Completion>,
    delay_total_us: u64,
    ready_script: Vec<Level>,
}

/// Shared handle; transport, chip-select and data-ready all log into it
#[derive(Clone, Default)]
pub struct MockBus {
    state: Rc<RefCell<State>>,
}

pub struct MockTransport(MockBus);
pub struct MockCs(MockBus);
pub struct MockDataReady(MockBus);

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequencer(&self) -> TransferSequencer<MockTransport, MockCs> {
        TransferSequencer::new(MockTransport(self.clone()), MockCs(self.clone()))
    }

    pub fn data_ready(&self) -> MockDataReady {
        MockDataReady(self.clone())
    }

    /// Bytes returned by every `write_read`, starting with the dummy byte
    pub fn set_response(&self, bytes: &[u8]) {
        self.state.borrow_mut().response = bytes.to_vec();
    }

    /// Reject the submission with the given index (0-based)
    pub fn fail_submission(&self, index: usize, error: Error) {
        self.state.borrow_mut().fail_at = Some((index, error));
    }

    /// Report busy for this many polls after every submission
    pub fn set_busy_polls(&self, polls: u32) {
        self.state.borrow_mut().busy_polls = polls;
    }

    pub fn set_stuck_busy(&self, stuck: bool) {
        self.state.borrow_mut().stuck_busy = stuck;
    }

    /// Hold completion back until [`complete`](Self::complete) is called
    pub fn set_defer_completion(&self, defer: bool) {
        self.state.borrow_mut().defer_completion = defer;
    }

    pub fn complete(&self) {
        let mut s = self.state.borrow_mut();
        s.deferred = false;
        if let Some(completion) = s.completion {
            completion.signal();
        }
    }

    /// Levels returned by successive data-ready reads; `Low` once exhausted
    pub fn script_data_ready(&self, levels: &[Level]) {
        let mut s = self.state.borrow_mut();
        s.ready_script = levels.iter().rev().copied().collect();
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.state.borrow().events.iter().filter(|e| *e == event).count()
    }

    /// Bytes of every `Write` submission, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn delay_total_us(&self) -> u64 {
        self.state.borrow().delay_total_us
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    fn submit(&self, event: Event) -> Result<()> {
        let mut s = self.state.borrow_mut();
        let index = s.submissions;
        s.submissions += 1;
        if let Some((at, error)) = s.fail_at {
            if at == index {
                return Err(error);
            }
        }
        s.events.push(event);
        s.busy_remaining = s.busy_polls;
        if s.defer_completion {
            s.deferred = true;
        } else if let Some(completion) = s.completion {
            completion.signal();
        }
        Ok(())
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.0.submit(Event::Write(data.to_vec()))
    }

    fn write_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        self.0.submit(Event::WriteRead(tx.to_vec(), rx.len()))?;
        let s = self.0.state.borrow();
        for (dst, src) in rx.iter_mut().zip(s.response.iter()) {
            *dst = *src;
        }
        Ok(())
    }

    fn is_busy(&self) -> bool {
        let mut s = self.0.state.borrow_mut();
        if s.stuck_busy || s.deferred {
            return true;
        }
        if s.busy_remaining > 0 {
            s.busy_remaining -= 1;
            if s.busy_remaining == 0 {
                s.events.push(Event::BusyCleared);
            }
            return true;
        }
        false
    }

    fn is_transmitter_busy(&self) -> bool {
        false
    }

    fn register_completion(&mut self, completion: &'static Completion) {
        self.0.state.borrow_mut().completion = Some(completion);
    }

    fn delay_us(&mut self, us: u32) {
        self.0.state.borrow_mut().delay_total_us += us as u64;
    }
}

impl ChipSelect for MockCs {
    fn assert(&mut self) {
        self.0.state.borrow_mut().events.push(Event::Assert);
    }

    fn deassert(&mut self) {
        self.0.state.borrow_mut().events.push(Event::Deassert);
    }
}

impl DataReady for MockDataReady {
    fn read(&mut self) -> Level {
        let mut s = self.0.state.borrow_mut();
        let level = s.ready_script.pop().unwrap_or(Level::Low);
        s.events.push(Event::DataReadyRead(level));
        level
    }
}
