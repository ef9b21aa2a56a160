//! Periodic high-resolution callback on a dedicated thread.
//!
//! Deadlines are absolute: each expiry is forwarded by whole periods from
//! the previous deadline, so jitter in one tick does not accumulate into
//! drift. Expiries missed while the callback ran late are counted as
//! overruns and skipped.

use super::sampler::TimerRestart;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimerStats {
    pub ticks: u64,
    pub overruns: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    overruns: AtomicU64,
}

pub struct PeriodicTimer {
    cancel: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<()>>,
}

/// Advance `deadline` past `now` by whole periods.
///
/// Returns the next deadline and how many expiries were skipped. A deadline
/// still in the future is forwarded by exactly one period.
pub fn forward(deadline: Instant, now: Instant, period: Duration) -> (Instant, u64) {
    let next = deadline + period;
    if next > now || period.is_zero() {
        return (next, 0);
    }
    let behind = now.duration_since(next).as_nanos() / period.as_nanos();
    let skipped = u64::try_from(behind + 1).unwrap_or(u64::MAX);
    let step = u32::try_from(skipped).unwrap_or(u32::MAX);
    (next + period.saturating_mul(step), skipped)
}

impl PeriodicTimer {
    /// Fire `callback` every `period`, first one period from now, until it
    /// returns [`TimerRestart::NoRestart`] or the timer is cancelled.
    pub fn start<F>(name: &str, period: Duration, mut callback: F) -> io::Result<Self>
    where
        F: FnMut() -> TimerRestart + Send + 'static,
    {
        if period.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "timer period must be non-zero",
            ));
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());

        let handle = {
            let cancel = Arc::clone(&cancel);
            let active = Arc::clone(&active);
            let counters = Arc::clone(&counters);
            thread::Builder::new().name(name.to_string()).spawn(move || {
                let mut deadline = Instant::now() + period;
                while !cancel.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if now < deadline {
                        thread::sleep(deadline - now);
                        continue;
                    }

                    counters.ticks.fetch_add(1, Ordering::Relaxed);
                    if callback() == TimerRestart::NoRestart {
                        break;
                    }

                    let (next, skipped) = forward(deadline, Instant::now(), period);
                    if skipped > 0 {
                        counters.overruns.fetch_add(skipped, Ordering::Relaxed);
                    }
                    deadline = next;
                }
                active.store(false, Ordering::Release);
            })?
        };

        Ok(Self {
            cancel,
            active,
            counters,
            handle: Some(handle),
        })
    }

    /// `false` once the callback declined a restart or the timer was cancelled.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> TimerStats {
        TimerStats {
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            overruns: self.counters.overruns.load(Ordering::Relaxed),
        }
    }

    /// Stop the timer and wait for a running callback to return.
    pub fn cancel(mut self) -> TimerStats {
        self.shutdown();
        self.stats()
    }

    fn shutdown(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                // Cancelled from inside the callback: the loop exits on its own.
                return;
            }
            if handle.join().is_err() {
                tracing::error!("Sampling timer callback panicked");
            }
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
