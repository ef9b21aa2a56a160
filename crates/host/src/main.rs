use anyhow::Context;
use bridge::{CarrierTiming, SharedRegion, ThreadSleep};
use common::setup_logging;
use host::config::HostConfig;
use host::sound::{SoftPwmDevice, SharedPcm, play};
use host::{HwParams, LogDevice};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Largest chunk moved from the log ring per read.
const LOG_CHUNK: usize = 512;

fn main() -> anyhow::Result<()> {
    let config = HostConfig::from_env()?;
    setup_logging(&config.environment);
    let shutdown = Arc::new(AtomicBool::new(false));

    for signal in [SIGTERM, SIGINT] {
        flag::register_conditional_shutdown(signal, 1, Arc::clone(&shutdown))?;
        flag::register(signal, Arc::clone(&shutdown))?;
    }

    tracing::info!("Signal handlers registered (SIGTERM, SIGINT)");
    tracing::info!(?config, "Host starting");

    let region = Arc::new(
        SharedRegion::create_and_init(&config.shmem_path, config.shmem_size)
            .with_context(|| format!("Failed to create shared region {}", config.shmem_path))?,
    );

    let timing = CarrierTiming::default();
    let mut sound: SoftPwmDevice<SharedPcm> =
        SoftPwmDevice::probe(Arc::clone(&region), config.duty_offset, timing)
            .context("Failed to register the soft-PWM sound card")?;

    tracing::info!(
        budget_ms = config.handshake().budget().as_millis() as u64,
        "Waiting for the microcontroller to take over the log buffer"
    );
    let log = LogDevice::probe(
        Arc::clone(&region),
        &config.log_channel(),
        &config.handshake(),
        &mut ThreadSleep,
    )
    .context("Log device did not come up")?;

    let pump = {
        let shutdown = Arc::clone(&shutdown);
        let poll = Duration::from_millis(config.log_poll_ms);
        thread::Builder::new()
            .name("log-pump".to_string())
            .spawn(move || pump_log(log, &shutdown, poll))?
    };

    match &config.pcm_file {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {path}"))?;
            let params = HwParams::mono_u8(config.period_bytes, config.periods);
            let stats = play(&mut sound, BufReader::new(file), &params, &shutdown)
                .with_context(|| format!("Playback of {path} failed"))?;
            tracing::info!(?stats, "Playback complete");
        }
        None => tracing::info!("No PCM_FILE set, only relaying logs"),
    }

    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));
    }

    tracing::info!("Shutting down");
    sound.shutdown();
    match pump.join() {
        Ok(Ok(bytes)) => tracing::info!(bytes, "Log relay stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Log relay failed"),
        Err(_) => tracing::error!("Log relay thread panicked"),
    }
    Ok(())
}

/// Copy the microcontroller log to stdout until shutdown.
fn pump_log(mut log: LogDevice, shutdown: &AtomicBool, poll: Duration) -> io::Result<u64> {
    let stdout = io::stdout();
    let mut total = 0u64;
    while !shutdown.load(Ordering::Relaxed) {
        let mut out = stdout.lock();
        let copied = log.read_to(LOG_CHUNK, &mut out)?;
        if copied == 0 {
            drop(out);
            thread::sleep(poll);
            continue;
        }
        out.flush()?;
        total += copied as u64;
    }
    // Drain what arrived before the signal, once.
    let mut out = stdout.lock();
    total += log.drain_to(&mut out)? as u64;
    out.flush()?;
    Ok(total)
}
