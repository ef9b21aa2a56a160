use crate::log_device::LogChannelConfig;
use bridge::HandshakeConfig;
use bridge::layout::{
    DEFAULT_DUTY_OFFSET, DEFAULT_LOG_LENGTH, DEFAULT_LOG_OFFSET, DEFAULT_REGION_PATH,
    DEFAULT_REGION_SIZE,
};
use common::{env_opt, env_or};
use std::time::Duration;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub environment: Environment,
    pub shmem_path: String,
    pub shmem_size: usize,
    pub log_offset: usize,
    pub log_length: usize,
    pub duty_offset: usize,
    pub handshake_attempts: u32,
    pub handshake_poll_ms: u64,
    /// Delay between log reads while the ring is empty.
    pub log_poll_ms: u64,
    /// Raw U8 mono 8 kHz file to play once the devices are up.
    pub pcm_file: Option<String>,
    pub period_bytes: usize,
    pub periods: usize,
}

impl HostConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let shmem_path = env_or("SHMEM_PATH", DEFAULT_REGION_PATH.to_string())?;
        let shmem_size = env_or("SHMEM_SIZE", DEFAULT_REGION_SIZE)?;
        let log_offset = env_or("LOG_OFFSET", DEFAULT_LOG_OFFSET)?;
        let log_length = env_or("LOG_LENGTH", DEFAULT_LOG_LENGTH)?;
        let duty_offset = env_or("DUTY_OFFSET", DEFAULT_DUTY_OFFSET)?;
        let handshake_attempts = env_or("HANDSHAKE_ATTEMPTS", 100)?;
        let handshake_poll_ms = env_or("HANDSHAKE_POLL_MS", 1)?;
        let log_poll_ms = env_or("LOG_POLL_MS", 10)?;
        let pcm_file = env_opt("PCM_FILE")?;
        let period_bytes = env_or("PERIOD_BYTES", 1024)?;
        let periods = env_or("PERIODS", 4)?;

        Ok(Self {
            environment,
            shmem_path,
            shmem_size,
            log_offset,
            log_length,
            duty_offset,
            handshake_attempts,
            handshake_poll_ms,
            log_poll_ms,
            pcm_file,
            period_bytes,
            periods,
        })
    }

    pub fn log_channel(&self) -> LogChannelConfig {
        LogChannelConfig {
            offset: self.log_offset,
            length: self.log_length,
        }
    }

    pub fn handshake(&self) -> HandshakeConfig {
        HandshakeConfig {
            max_attempts: self.handshake_attempts,
            poll_interval: Duration::from_millis(self.handshake_poll_ms),
        }
    }
}
