//! Playback-only sound device that drives the shared duty struct.

use super::hrtimer::{PeriodicTimer, TimerStats};
use super::pcm::{AudioError, HwParams};
use super::sampler::{PcmBuffer, Sampler};
use bridge::{CarrierTiming, DutyControl, SharedRegion};
use std::sync::Arc;
use std::time::Duration;

pub const CARD_NAME: &str = "Soft PWM";
const TIMER_THREAD: &str = "pwm-sampler";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCommand {
    Start,
    Stop,
}

pub struct SoftPwmDevice<B> {
    duty: Arc<DutyControl>,
    timing: CarrierTiming,
    params: Option<HwParams>,
    sampler: Option<Arc<Sampler<B>>>,
    timer: Option<PeriodicTimer>,
}

impl<B: PcmBuffer + 'static> SoftPwmDevice<B> {
    /// Attach to the duty struct and silence it.
    pub fn probe(
        region: Arc<SharedRegion>,
        duty_offset: usize,
        timing: CarrierTiming,
    ) -> Result<Self, AudioError> {
        let duty = Arc::new(DutyControl::attach(region, duty_offset)?);
        duty.mute();

        tracing::info!(
            card = CARD_NAME,
            duty_offset,
            sample_period_ns = timing.sample_period_ns,
            "Sound card registered"
        );
        Ok(Self {
            duty,
            timing,
            params: None,
            sampler: None,
            timer: None,
        })
    }

    /// Accept stream parameters and bind the buffer the sampler will read.
    ///
    /// Stops a running stream first.
    pub fn hw_params(&mut self, params: &HwParams, buffer: Arc<B>) -> Result<(), AudioError> {
        params.validate()?;
        if buffer.buffer_frames() != params.buffer_frames() {
            return Err(AudioError::BufferMismatch {
                expected: params.buffer_frames(),
                actual: buffer.buffer_frames(),
            });
        }
        if buffer.period_frames() != params.period_frames() {
            return Err(AudioError::BufferMismatch {
                expected: params.period_frames(),
                actual: buffer.period_frames(),
            });
        }

        self.trigger(TriggerCommand::Stop)?;
        self.sampler = Some(Arc::new(Sampler::new(
            buffer,
            Arc::clone(&self.duty),
            self.timing,
        )));
        self.params = Some(*params);

        tracing::debug!(
            period_bytes = params.period_bytes,
            periods = params.periods,
            "Stream parameters set"
        );
        Ok(())
    }

    pub fn params(&self) -> Option<&HwParams> {
        self.params.as_ref()
    }

    pub fn trigger(&mut self, command: TriggerCommand) -> Result<(), AudioError> {
        match command {
            TriggerCommand::Start => {
                let sampler = self.sampler.clone().ok_or(AudioError::NotConfigured)?;
                self.cancel_timer();

                sampler.start();
                let period = Duration::from_nanos(self.timing.sample_period_ns);
                let ticker = Arc::clone(&sampler);
                let timer = PeriodicTimer::start(TIMER_THREAD, period, move || ticker.on_tick())
                    .map_err(|e| {
                        sampler.stop();
                        AudioError::Timer(e)
                    })?;
                self.timer = Some(timer);
                tracing::debug!("Playback started");
            }
            TriggerCommand::Stop => {
                if self.sampler.as_ref().is_some_and(|s| s.stop()) {
                    tracing::debug!("Playback stopped");
                }
                self.cancel_timer();
            }
        }
        Ok(())
    }

    /// Current frame position, `0` before parameters are set.
    pub fn pointer(&self) -> usize {
        self.sampler.as_ref().map_or(0, |s| s.pointer())
    }

    pub fn is_running(&self) -> bool {
        self.sampler.as_ref().is_some_and(|s| s.is_running())
    }

    pub fn duty(&self) -> &DutyControl {
        &self.duty
    }

    /// Cancel the sampling timer and leave the carrier silent.
    pub fn shutdown(&mut self) {
        if let Some(sampler) = &self.sampler {
            sampler.stop();
        }
        self.cancel_timer();
        self.duty.mute();
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            let TimerStats { ticks, overruns } = timer.cancel();
            if overruns > 0 {
                tracing::warn!(ticks, overruns, "Sampling timer fell behind");
            } else {
                tracing::debug!(ticks, "Sampling timer cancelled");
            }
        }
    }
}

impl<B> Drop for SoftPwmDevice<B> {
    fn drop(&mut self) {
        // Timer drop joins its thread; the duty struct outlives the device.
        self.timer.take();
        self.duty.mute();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::pcm::StreamDirection;
    use bridge::Channel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    struct Tone {
        frames: usize,
        period: usize,
        elapsed: AtomicUsize,
    }

    impl Tone {
        fn new(params: &HwParams) -> Arc<Self> {
            Arc::new(Self {
                frames: params.buffer_frames(),
                period: params.period_frames(),
                elapsed: AtomicUsize::new(0),
            })
        }
    }

    impl PcmBuffer for Tone {
        fn buffer_frames(&self) -> usize {
            self.frames
        }

        fn period_frames(&self) -> usize {
            self.period
        }

        fn sample(&self, _frame: usize) -> u8 {
            255
        }

        fn period_elapsed(&self) {
            self.elapsed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn device() -> SoftPwmDevice<Tone> {
        let region = Arc::new(SharedRegion::anonymous(4096).unwrap());
        SoftPwmDevice::probe(region, 0, CarrierTiming::default()).unwrap()
    }

    #[test]
    fn test_start_without_params_is_rejected() {
        let mut dev = device();
        assert!(matches!(
            dev.trigger(TriggerCommand::Start),
            Err(AudioError::NotConfigured)
        ));
        assert!(dev.trigger(TriggerCommand::Stop).is_ok());
    }

    #[test]
    fn test_hw_params_validates_and_checks_buffer() {
        let mut dev = device();
        let params = HwParams::mono_u8(64, 4);

        let capture = HwParams {
            direction: StreamDirection::Capture,
            ..params
        };
        assert!(matches!(
            dev.hw_params(&capture, Tone::new(&params)),
            Err(AudioError::NotPlayback)
        ));

        let other = HwParams::mono_u8(64, 8);
        assert!(matches!(
            dev.hw_params(&params, Tone::new(&other)),
            Err(AudioError::BufferMismatch {
                expected: 256,
                actual: 512
            })
        ));

        dev.hw_params(&params, Tone::new(&params)).unwrap();
        assert_eq!(dev.params(), Some(&params));
    }

    #[test]
    fn test_start_drives_duty_and_stop_mutes() {
        let mut dev = device();
        let params = HwParams::mono_u8(64, 4);
        let tone = Tone::new(&params);
        dev.hw_params(&params, Arc::clone(&tone)).unwrap();

        dev.trigger(TriggerCommand::Start).unwrap();
        assert!(dev.is_running());
        assert_eq!(dev.duty().load(Channel::Left), 374);

        let deadline = Instant::now() + Duration::from_secs(5);
        while tone.elapsed.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(tone.elapsed.load(Ordering::SeqCst) > 0, "timer never ticked");

        dev.trigger(TriggerCommand::Stop).unwrap();
        assert!(!dev.is_running());
        assert_eq!(dev.duty().load(Channel::Left), 0);
        assert_eq!(dev.duty().load(Channel::Right), 0);

        thread::sleep(Duration::from_millis(2));
        assert_eq!(dev.duty().load(Channel::Left), 0);
    }

    #[test]
    fn test_restart_replaces_timer() {
        let mut dev = device();
        let params = HwParams::mono_u8(64, 4);
        dev.hw_params(&params, Tone::new(&params)).unwrap();

        dev.trigger(TriggerCommand::Start).unwrap();
        dev.trigger(TriggerCommand::Start).unwrap();
        assert!(dev.is_running());
        dev.shutdown();
        assert!(!dev.is_running());
        assert_eq!(dev.duty().load(Channel::Right), 0);
    }

    #[test]
    fn test_probe_out_of_range_offset_fails() {
        let region = Arc::new(SharedRegion::anonymous(64).unwrap());
        let result = SoftPwmDevice::<Tone>::probe(region, 4096, CarrierTiming::default());
        assert!(matches!(result, Err(AudioError::Bridge(_))));
    }
}
