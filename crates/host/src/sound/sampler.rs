//! Per-sample callback that turns PCM bytes into duty values.

use bridge::{CarrierTiming, DutyControl};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Whether the periodic timer should fire again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRestart {
    Restart,
    NoRestart,
}

/// The upstream audio pipeline, as seen by the sampling callback.
///
/// The buffer is a ring of `buffer_frames` unsigned 8-bit mono frames
/// divided into periods of `period_frames`. The producer keeps writing into
/// it while the callback reads, one frame per tick.
pub trait PcmBuffer: Send + Sync {
    fn buffer_frames(&self) -> usize;
    fn period_frames(&self) -> usize;
    fn sample(&self, frame: usize) -> u8;

    /// A full period has been played. Called without any sampler lock
    /// held, so the implementation may stop the stream from here.
    fn period_elapsed(&self);
}

#[derive(Debug, Default)]
struct StreamState {
    running: bool,
    data_ptr: usize,
    period_ptr: usize,
}

/// Stream cursor and duty writer.
///
/// The trigger path and the periodic callback take the same lock, so the
/// duty struct has exactly one writer at a time and a stop can never be
/// overwritten by a late tick.
pub struct Sampler<B> {
    buffer: Arc<B>,
    duty: Arc<DutyControl>,
    timing: CarrierTiming,
    state: Mutex<StreamState>,
}

impl<B: PcmBuffer> Sampler<B> {
    pub fn new(buffer: Arc<B>, duty: Arc<DutyControl>, timing: CarrierTiming) -> Self {
        Self {
            buffer,
            duty,
            timing,
            state: Mutex::new(StreamState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Trigger start: play the first frame immediately and rewind.
    pub fn start(&self) {
        let mut state = self.state();
        let first = self.buffer.sample(0);
        self.duty.store_mono(self.timing.sample_to_duty(first));
        state.data_ptr = 0;
        state.period_ptr = 0;
        state.running = true;
    }

    /// Trigger stop: silence both channels. Returns `false` if the stream
    /// was not running.
    pub fn stop(&self) -> bool {
        let mut state = self.state();
        if !state.running {
            return false;
        }
        state.running = false;
        self.duty.mute();
        true
    }

    /// One sample period: advance, write the next duty, count the period.
    pub fn on_tick(&self) -> TimerRestart {
        let elapsed = {
            let mut state = self.state();
            if !state.running {
                return TimerRestart::NoRestart;
            }

            let frames = self.buffer.buffer_frames().max(1);
            state.data_ptr += 1;
            if state.data_ptr >= frames {
                state.data_ptr = 0;
            }

            let sample = self.buffer.sample(state.data_ptr);
            self.duty.store_mono(self.timing.sample_to_duty(sample));

            state.period_ptr += 1;
            if state.period_ptr >= self.buffer.period_frames() {
                state.period_ptr = 0;
                true
            } else {
                false
            }
        };

        if elapsed {
            self.buffer.period_elapsed();
        }
        TimerRestart::Restart
    }

    /// Current frame position in the buffer.
    pub fn pointer(&self) -> usize {
        self.state().data_ptr
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    pub fn buffer(&self) -> &Arc<B> {
        &self.buffer
    }
}
