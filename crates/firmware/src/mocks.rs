//! Recording doubles for the hardware seams.

use crate::hal::CarrierTimer;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

/// Output pin that remembers every level it was driven to.
#[derive(Debug, Default)]
pub struct MockPin {
    history: Vec<bool>,
    fail: bool,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write fails with `ErrorKind::Other`.
    pub fn failing() -> Self {
        Self {
            history: Vec::new(),
            fail: true,
        }
    }

    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }

    pub fn history(&self) -> &[bool] {
        &self.history
    }

    pub fn is_set_high(&self) -> bool {
        self.history.last().copied().unwrap_or(false)
    }

    fn drive(&mut self, level: bool) -> Result<(), ErrorKind> {
        if self.fail {
            return Err(ErrorKind::Other);
        }
        self.history.push(level);
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    SetCount(u32),
    Start,
    Stop,
    ClearInterrupt,
}

/// Timer that records register operations in order.
#[derive(Debug, Default)]
pub struct MockTimer {
    ops: Vec<TimerOp>,
    running: bool,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[TimerOp] {
        &self.ops
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Counts programmed so far, in order.
    pub fn counts(&self) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                TimerOp::SetCount(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl CarrierTimer for MockTimer {
    fn set_count(&mut self, ticks: u32) {
        self.ops.push(TimerOp::SetCount(ticks));
    }

    fn start(&mut self) {
        self.running = true;
        self.ops.push(TimerOp::Start);
    }

    fn stop(&mut self) {
        self.running = false;
        self.ops.push(TimerOp::Stop);
    }

    fn clear_interrupt(&mut self) {
        self.ops.push(TimerOp::ClearInterrupt);
    }
}
