//! Carrier arithmetic shared by both cores.
//!
//! The microcontroller timer counts at `timer_hz`; one carrier cycle is
//! `carrier_period` ticks; the host feeds one sample every
//! `sample_period_ns`. An integer number of carrier cycles must fit in one
//! sample period.

use thiserror::Error;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimingError {
    #[error("Timer frequency must be non-zero")]
    ZeroTimerFrequency,

    #[error("Carrier period of {0} ticks is too short (need at least 2)")]
    CarrierTooShort(u32),

    #[error("Sample period must be non-zero")]
    ZeroSamplePeriod,

    #[error("Carrier of {carrier_hz} Hz cannot be derived from a {timer_hz} Hz timer")]
    CarrierNotDerivable { timer_hz: u32, carrier_hz: u32 },

    #[error(
        "Sample period of {sample_ticks} ticks is not a whole number of {carrier_period}-tick carrier cycles"
    )]
    FractionalCycles {
        sample_ticks: u64,
        carrier_period: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarrierTiming {
    pub timer_hz: u32,
    pub carrier_period: u32,
    pub sample_period_ns: u64,
}

impl Default for CarrierTiming {
    /// 24 MHz timer, 64 kHz carrier, 8 kHz audio: 8 carrier cycles per sample.
    fn default() -> Self {
        Self {
            timer_hz: 24_000_000,
            carrier_period: 375,
            sample_period_ns: 125_000,
        }
    }
}

impl CarrierTiming {
    /// Derive the carrier period from target rates.
    pub fn for_rates(
        timer_hz: u32,
        carrier_hz: u32,
        sample_rate_hz: u32,
    ) -> Result<Self, TimingError> {
        if timer_hz == 0 {
            return Err(TimingError::ZeroTimerFrequency);
        }
        if carrier_hz == 0 || carrier_hz > timer_hz {
            return Err(TimingError::CarrierNotDerivable {
                timer_hz,
                carrier_hz,
            });
        }
        if sample_rate_hz == 0 {
            return Err(TimingError::ZeroSamplePeriod);
        }

        let timing = Self {
            timer_hz,
            carrier_period: timer_hz / carrier_hz,
            sample_period_ns: NANOS_PER_SECOND / u64::from(sample_rate_hz),
        };
        timing.validate()?;
        Ok(timing)
    }

    pub fn validate(&self) -> Result<(), TimingError> {
        if self.timer_hz == 0 {
            return Err(TimingError::ZeroTimerFrequency);
        }
        if self.carrier_period < 2 {
            return Err(TimingError::CarrierTooShort(self.carrier_period));
        }
        if self.sample_period_ns == 0 {
            return Err(TimingError::ZeroSamplePeriod);
        }
        Ok(())
    }

    /// Timer ticks elapsing during one host sample period.
    pub fn sample_period_ticks(&self) -> u64 {
        self.sample_period_ns * u64::from(self.timer_hz) / NANOS_PER_SECOND
    }

    /// Carrier cycles per sample period; an error when they do not divide.
    pub fn cycles_per_sample(&self) -> Result<u32, TimingError> {
        self.validate()?;
        let sample_ticks = self.sample_period_ticks();
        let period = u64::from(self.carrier_period);
        if sample_ticks == 0 || !sample_ticks.is_multiple_of(period) {
            return Err(TimingError::FractionalCycles {
                sample_ticks,
                carrier_period: self.carrier_period,
            });
        }
        u32::try_from(sample_ticks / period).map_err(|_| TimingError::FractionalCycles {
            sample_ticks,
            carrier_period: self.carrier_period,
        })
    }

    pub fn carrier_hz(&self) -> u32 {
        self.timer_hz / self.carrier_period.max(1)
    }

    pub fn sample_rate_hz(&self) -> u32 {
        (NANOS_PER_SECOND / self.sample_period_ns.max(1)) as u32
    }

    /// Largest duty a sample can map to.
    pub fn max_duty(&self) -> u32 {
        self.carrier_period.saturating_sub(1)
    }

    /// Rescale an unsigned 8-bit sample from `[0, 255]` to
    /// `[0, carrier_period - 1]`.
    #[inline]
    pub fn sample_to_duty(&self, sample: u8) -> u32 {
        (u64::from(sample) * u64::from(self.max_duty()) / 255) as u32
    }

    /// Bring an arbitrary value read from shared memory back into range.
    #[inline]
    pub fn clamp_duty(&self, duty: u32) -> u32 {
        duty.min(self.max_duty())
    }
}
