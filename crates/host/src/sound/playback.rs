//! Streaming a raw U8 PCM source through the soft-PWM device.

use super::device::{SoftPwmDevice, TriggerCommand};
use super::pcm::{AudioError, HwParams};
use super::sampler::PcmBuffer;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Midpoint of unsigned 8-bit PCM.
pub const SILENCE: u8 = 128;

/// How long to wait for a period before re-checking the shutdown flag.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Ring buffer shared between the writer thread and the sampling callback.
pub struct SharedPcm {
    area: Box<[AtomicU8]>,
    period_frames: usize,
    elapsed: Mutex<u64>,
    period_done: Condvar,
}

impl SharedPcm {
    pub fn new(params: &HwParams) -> Self {
        let area = (0..params.buffer_frames())
            .map(|_| AtomicU8::new(SILENCE))
            .collect();
        Self {
            area,
            period_frames: params.period_frames(),
            elapsed: Mutex::new(0),
            period_done: Condvar::new(),
        }
    }

    pub fn periods(&self) -> usize {
        self.area.len() / self.period_frames.max(1)
    }

    /// Copy `data` into period `index`, padding the rest with silence.
    pub fn write_period(&self, index: usize, data: &[u8]) {
        let start = (index % self.periods().max(1)) * self.period_frames;
        let slots = &self.area[start..start + self.period_frames];
        for (i, slot) in slots.iter().enumerate() {
            slot.store(data.get(i).copied().unwrap_or(SILENCE), Ordering::Relaxed);
        }
    }

    /// Periods played since the stream was created.
    pub fn elapsed_periods(&self) -> u64 {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until more than `seen` periods have elapsed or `timeout`
    /// passes. Returns the current count.
    pub fn wait_period(&self, seen: u64, timeout: Duration) -> u64 {
        let guard = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .period_done
            .wait_timeout_while(guard, timeout, |elapsed| *elapsed <= seen)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

impl PcmBuffer for SharedPcm {
    fn buffer_frames(&self) -> usize {
        self.area.len()
    }

    fn period_frames(&self) -> usize {
        self.period_frames
    }

    fn sample(&self, frame: usize) -> u8 {
        self.area
            .get(frame)
            .map_or(SILENCE, |slot| slot.load(Ordering::Relaxed))
    }

    fn period_elapsed(&self) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += 1;
        self.period_done.notify_all();
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStats {
    pub frames_queued: u64,
    pub periods_played: u64,
    pub interrupted: bool,
}

/// Fill `buf` from `source` until it is full or the source ends.
fn read_period(source: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Play `source` to the end, or until `shutdown` is raised.
///
/// Every period is filled before the stream starts. Each elapsed period is
/// then refilled while the sampler plays the next one. The stream is
/// stopped (and the carrier muted) once everything queued has been played,
/// and also when reading the source fails mid-stream.
pub fn play(
    device: &mut SoftPwmDevice<SharedPcm>,
    mut source: impl Read,
    params: &HwParams,
    shutdown: &AtomicBool,
) -> Result<PlaybackStats, AudioError> {
    // Validate before the buffer is sized from the parameters.
    params.validate()?;
    let pcm = Arc::new(SharedPcm::new(params));
    device.hw_params(params, Arc::clone(&pcm))?;

    let period_frames = params.period_frames();
    let periods = pcm.periods();
    let mut feeder = Feeder {
        chunk: vec![SILENCE; period_frames],
        eof: false,
    };
    let mut stats = PlaybackStats::default();

    for index in 0..periods {
        stats.frames_queued += feeder.refill(&pcm, index, &mut source)?;
    }

    if stats.frames_queued == 0 {
        tracing::info!("Nothing to play");
        return Ok(stats);
    }

    device.trigger(TriggerCommand::Start)?;
    tracing::info!(period_frames, periods, "Playback running");

    let streamed = stream(&pcm, &mut feeder, &mut source, shutdown, &mut stats);
    device.trigger(TriggerCommand::Stop)?;
    stats.periods_played = pcm.elapsed_periods();

    if let Err(e) = streamed {
        tracing::error!(error = %e, frames = stats.frames_queued, "Playback aborted");
        return Err(e.into());
    }
    tracing::info!(
        frames = stats.frames_queued,
        periods = stats.periods_played,
        interrupted = stats.interrupted,
        "Playback finished"
    );
    Ok(stats)
}

/// Reads the source one period at a time, padding with silence after EOF.
struct Feeder {
    chunk: Vec<u8>,
    eof: bool,
}

impl Feeder {
    fn refill(
        &mut self,
        pcm: &SharedPcm,
        index: usize,
        source: &mut impl Read,
    ) -> io::Result<u64> {
        let n = if self.eof {
            0
        } else {
            read_period(source, &mut self.chunk)?
        };
        self.eof |= n < self.chunk.len();
        pcm.write_period(index, &self.chunk[..n]);
        Ok(n as u64)
    }
}

/// Refill played periods until everything queued is out or shutdown.
fn stream(
    pcm: &SharedPcm,
    feeder: &mut Feeder,
    source: &mut impl Read,
    shutdown: &AtomicBool,
    stats: &mut PlaybackStats,
) -> io::Result<()> {
    let period_frames = pcm.period_frames() as u64;
    let mut seen = 0u64;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            stats.interrupted = true;
            return Ok(());
        }
        if seen * period_frames >= stats.frames_queued {
            return Ok(());
        }

        let now = pcm.wait_period(seen, WAIT_SLICE);
        while seen < now {
            // Period `seen` has just been played; the sampler is past it.
            stats.frames_queued += feeder.refill(pcm, seen as usize, source)?;
            seen += 1;
        }
    }
}
