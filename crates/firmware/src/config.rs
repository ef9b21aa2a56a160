use bridge::layout::{DEFAULT_DUTY_OFFSET, DEFAULT_LOG_OFFSET, DEFAULT_REGION_PATH};
use common::env_or;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub environment: Environment,
    pub shmem_path: String,
    pub log_offset: usize,
    pub duty_offset: usize,
    /// Delay between polls while the host has not created the region yet.
    pub region_poll_ms: u64,
    pub stats_interval_ms: u64,
    pub stereo: bool,
}

impl SimConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let shmem_path = env_or("SHMEM_PATH", DEFAULT_REGION_PATH.to_string())?;
        let log_offset = env_or("LOG_OFFSET", DEFAULT_LOG_OFFSET)?;
        let duty_offset = env_or("DUTY_OFFSET", DEFAULT_DUTY_OFFSET)?;
        let region_poll_ms = env_or("REGION_POLL_MS", 10)?;
        let stats_interval_ms = env_or("STATS_INTERVAL_MS", 1000)?;
        let stereo = env_or("STEREO", false)?;

        Ok(Self {
            environment,
            shmem_path,
            log_offset,
            duty_offset,
            region_poll_ms,
            stats_interval_ms,
            stereo,
        })
    }
}
