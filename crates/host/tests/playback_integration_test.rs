use bridge::{
    CarrierTiming, Channel, DutyControl, HandshakeConfig, LogRing, SharedRegion, ThreadSleep,
    block_until_host_ready,
};
use host::sound::{SharedPcm, SoftPwmDevice, play};
use host::{HwParams, LogChannelConfig, LogDevice};
use std::collections::BTreeSet;
use host::AudioError;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const REGION_SIZE: usize = 16 * 1024;

fn host_region(dir: &TempDir) -> (Arc<SharedRegion>, std::path::PathBuf) {
    let path = dir.path().join("mcu_shared_region");
    let region = SharedRegion::create_and_init(&path, REGION_SIZE).unwrap();
    (Arc::new(region), path)
}

#[test]
fn test_log_device_relays_mcu_output_across_mappings() {
    let dir = TempDir::new().unwrap();
    let (region, path) = host_region(&dir);

    let mcu = thread::spawn(move || {
        let mcu_region = Arc::new(SharedRegion::open_existing(&path).unwrap());
        let ring = LogRing::attach(mcu_region, 32).unwrap();
        let relax = || thread::sleep(Duration::from_micros(50));
        let mut producer = block_until_host_ready(ring, relax);
        producer.write(b"Load log buffer on: 0x20\n");
        producer.write(b"Sound Start\n");
    });

    let channel = LogChannelConfig {
        offset: 32,
        length: 4096,
    };
    let patient = HandshakeConfig {
        max_attempts: 5_000,
        poll_interval: Duration::from_millis(1),
    };
    let mut device = LogDevice::probe(region, &channel, &patient, &mut ThreadSleep).unwrap();
    mcu.join().unwrap();

    let mut text = String::new();
    device.read_to_string(&mut text).unwrap();
    assert_eq!(text, "Load log buffer on: 0x20\nSound Start\n");
}

#[test]
fn test_playback_drives_duty_seen_by_second_mapping() {
    let dir = TempDir::new().unwrap();
    let (region, path) = host_region(&dir);
    let timing = CarrierTiming::default();

    let mut device: SoftPwmDevice<SharedPcm> =
        SoftPwmDevice::probe(Arc::clone(&region), 0, timing).unwrap();

    // The microcontroller's view of the same struct.
    let mcu_region = Arc::new(SharedRegion::open_existing(&path).unwrap());
    let mcu_duty = DutyControl::attach(mcu_region, 0).unwrap();

    let stop_watch = Arc::new(AtomicBool::new(false));
    let watcher = {
        let stop_watch = Arc::clone(&stop_watch);
        thread::spawn(move || {
            let mut seen = BTreeSet::new();
            while !stop_watch.load(Ordering::Relaxed) {
                seen.insert(mcu_duty.load(Channel::Left));
                seen.insert(mcu_duty.load(Channel::Right));
                thread::yield_now();
            }
            (seen, mcu_duty)
        })
    };

    // Three and a half periods of alternating levels.
    let source: Vec<u8> = (0..28).map(|i| if i % 2 == 0 { 51 } else { 204 }).collect();
    let params = HwParams::mono_u8(8, 4);
    let shutdown = AtomicBool::new(false);
    let stats = play(&mut device, source.as_slice(), &params, &shutdown).unwrap();

    thread::sleep(Duration::from_millis(5));
    stop_watch.store(true, Ordering::Relaxed);
    let (seen, mcu_duty) = watcher.join().unwrap();

    assert_eq!(stats.frames_queued, 28);
    assert!(!stats.interrupted);
    assert!(stats.periods_played >= 4);

    let allowed: BTreeSet<u32> = [0, 51, 128, 204]
        .into_iter()
        .map(|s| timing.sample_to_duty(s))
        .collect();
    assert!(
        seen.is_subset(&allowed),
        "unexpected duty values {:?}",
        seen.difference(&allowed).collect::<Vec<_>>()
    );
    assert!(seen.iter().any(|&duty| duty != 0), "watcher never saw sound");

    assert_eq!(mcu_duty.load(Channel::Left), 0, "stop mutes the carrier");
    assert_eq!(mcu_duty.load(Channel::Right), 0);
    assert!(!device.is_running());
}

#[test]
fn test_playback_interrupted_by_shutdown_mutes() {
    let region = Arc::new(SharedRegion::anonymous(4096).unwrap());
    let mut device: SoftPwmDevice<SharedPcm> =
        SoftPwmDevice::probe(region, 0, CarrierTiming::default()).unwrap();

    let source = vec![255u8; 64];
    let shutdown = AtomicBool::new(true);
    let params = HwParams::mono_u8(8, 4);
    let stats = play(&mut device, source.as_slice(), &params, &shutdown).unwrap();

    assert!(stats.interrupted);
    assert_eq!(device.duty().load(Channel::Left), 0);
    assert_eq!(device.duty().load(Channel::Right), 0);
}

#[test]
fn test_empty_source_never_starts_stream() {
    let region = Arc::new(SharedRegion::anonymous(4096).unwrap());
    let mut device: SoftPwmDevice<SharedPcm> =
        SoftPwmDevice::probe(region, 0, CarrierTiming::default()).unwrap();

    let shutdown = AtomicBool::new(false);
    let params = HwParams::mono_u8(8, 4);
    let stats = play(&mut device, std::io::empty(), &params, &shutdown).unwrap();

    assert_eq!(stats.frames_queued, 0);
    assert!(!device.is_running());
    assert_eq!(device.duty().load(Channel::Left), 0);
}

#[test]
fn test_stereo_parameters_are_rejected() {
    let region = Arc::new(SharedRegion::anonymous(4096).unwrap());
    let mut device: SoftPwmDevice<SharedPcm> =
        SoftPwmDevice::probe(region, 0, CarrierTiming::default()).unwrap();

    let params = HwParams {
        channels: 2,
        ..HwParams::mono_u8(8, 4)
    };
    let shutdown = AtomicBool::new(false);
    let result = play(&mut device, [128u8; 16].as_slice(), &params, &shutdown);
    assert!(result.is_err());
}

/// Delivers `left` bytes of full-scale audio, then fails.
struct FailingSource {
    left: usize,
}

impl Read for FailingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.left == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "source went away"));
        }
        let n = buf.len().min(self.left);
        buf[..n].fill(255);
        self.left -= n;
        Ok(n)
    }
}

#[test]
fn test_source_failure_mid_stream_stops_and_mutes() {
    let region = Arc::new(SharedRegion::anonymous(4096).unwrap());
    let mut device: SoftPwmDevice<SharedPcm> =
        SoftPwmDevice::probe(region, 0, CarrierTiming::default()).unwrap();

    // Exactly the prefill; the first refill after Start fails.
    let source = FailingSource { left: 32 };
    let shutdown = AtomicBool::new(false);
    let result = play(&mut device, source, &HwParams::mono_u8(8, 4), &shutdown);
    assert!(matches!(result, Err(AudioError::Io(_))));

    assert!(!device.is_running());
    thread::sleep(Duration::from_millis(20));
    assert_eq!(device.duty().load(Channel::Left), 0);
    assert_eq!(device.duty().load(Channel::Right), 0);
}

#[test]
fn test_oversized_parameters_return_error() {
    let region = Arc::new(SharedRegion::anonymous(4096).unwrap());
    let mut device: SoftPwmDevice<SharedPcm> =
        SoftPwmDevice::probe(region, 0, CarrierTiming::default()).unwrap();

    let shutdown = AtomicBool::new(false);
    let params = HwParams::mono_u8(usize::MAX / 2, usize::MAX / 2);
    let result = play(&mut device, std::io::empty(), &params, &shutdown);
    assert!(matches!(result, Err(AudioError::PeriodSize(_))));

    let params = HwParams::mono_u8(4096, 1024);
    let result = play(&mut device, std::io::empty(), &params, &shutdown);
    assert!(matches!(result, Err(AudioError::BufferTooLarge(_))));
    assert!(!device.is_running());
}
