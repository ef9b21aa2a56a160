use anyhow::Context;
use bridge::{CarrierTiming, Channel, SharedRegion};
use common::{setup_logging, wait_for_resource};
use firmware::config::SimConfig;
use firmware::console_log;
use firmware::sim::{SimPin, TickClock, VirtualTimer, run_until};
use firmware::{BootLayout, Booted, SoftPwm, bring_up};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Wall time between main-loop passes.
const LOOP_SLICE: Duration = Duration::from_micros(500);

fn main() -> anyhow::Result<()> {
    let config = SimConfig::from_env()?;
    setup_logging(&config.environment);
    let shutdown = Arc::new(AtomicBool::new(false));

    // A second signal terminates immediately, e.g. while blocked on the host.
    for signal in [SIGTERM, SIGINT] {
        flag::register_conditional_shutdown(signal, 1, Arc::clone(&shutdown))?;
        flag::register(signal, Arc::clone(&shutdown))?;
    }

    tracing::info!("Signal handlers registered (SIGTERM, SIGINT)");
    tracing::info!(?config, "Microcontroller simulator starting");

    let region = Arc::new(wait_for_resource(
        || SharedRegion::open_existing(&config.shmem_path),
        config.region_poll_ms,
        "Shared region",
    ));

    let layout = BootLayout {
        log_offset: config.log_offset,
        duty_offset: config.duty_offset,
    };

    tracing::info!(log_offset = layout.log_offset, "Waiting for the host log driver");
    let relax = || thread::sleep(Duration::from_micros(50));
    let Booted { mut console, duty } =
        bring_up(region, &layout, relax).context("Boot layout does not fit the shared region")?;
    tracing::info!(
        capacity = console.producer().capacity(),
        "Took over the log buffer"
    );

    let timing = CarrierTiming::default();
    let cycles = timing
        .cycles_per_sample()
        .context("Carrier period does not fit the audio sample period")?;

    let mut pwm = if config.stereo {
        SoftPwm::stereo(
            (SimPin::new(), VirtualTimer::new()),
            (SimPin::new(), VirtualTimer::new()),
            timing,
        )?
    } else {
        SoftPwm::mono(SimPin::new(), VirtualTimer::new(), timing)?
    };

    console_log!(console, "Hello simulated mcu ({cycles} carrier cycles per sample)");

    let clock = TickClock::start(timing.timer_hz);
    let stats_interval = Duration::from_millis(config.stats_interval_ms);
    let mut last_stats = Instant::now();
    let mut reported = [0u64; 2];

    while !shutdown.load(Ordering::Relaxed) {
        let armed = pwm.poll(&duty)?;
        if armed.any() {
            console_log!(console, "Sound Start");
            tracing::debug!(left = armed.left, right = armed.right, "Carrier armed");
        }

        let edges = run_until(&mut pwm, &duty, clock.now())?;
        if edges.iter().any(|e| e.muted > 0) {
            console_log!(console, "Sound Stop");
            tracing::debug!("Carrier muted");
        }

        if last_stats.elapsed() >= stats_interval {
            for (i, ch) in pwm.channels().enumerate() {
                let total = ch.pin().rising_edges();
                let delta = total - reported[i];
                reported[i] = total;
                let name = match ch.channel() {
                    Channel::Left => "left",
                    Channel::Right => "right",
                };
                console_log!(
                    console,
                    "carrier {name}: {delta} cycles, duty {}",
                    ch.latched_duty()
                );
                tracing::info!(
                    channel = name,
                    cycles = delta,
                    duty = ch.latched_duty(),
                    running = ch.is_enabled(),
                    "Carrier stats"
                );
            }
            if console.dropped() > 0 {
                tracing::warn!(dropped = console.dropped(), "Log ring overflowed");
            }
            last_stats = Instant::now();
        }

        thread::sleep(LOOP_SLICE);
    }

    tracing::info!("Microcontroller simulator stopped");
    Ok(())
}
