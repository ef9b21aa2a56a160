use bridge::{
    HandshakeConfig, LogConsumer, LogHeader, LogProducer, LogRing, SharedRegion, host_handshake,
    try_accept_host,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use std::time::Duration;

fn connect(capacity: usize) -> (LogProducer, LogConsumer) {
    let length = LogHeader::SIZE + capacity;
    let region = Arc::new(SharedRegion::anonymous(length).unwrap());
    let host_ring = LogRing::attach(Arc::clone(&region), 0).unwrap();
    let mut pending = Some(LogRing::attach(Arc::clone(&region), 0).unwrap());
    let mut producer = None;

    let mut sleeper = |_: Duration| {
        if let Some(ring) = pending.take() {
            match try_accept_host(ring) {
                Ok(p) => producer = Some(p),
                Err(ring) => pending = Some(ring),
            }
        }
    };
    let consumer =
        host_handshake(host_ring, length, &HandshakeConfig::default(), &mut sleeper).unwrap();
    (producer.unwrap(), consumer)
}

fn benchmark_log_write_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_write_read");

    let lines = [
        (16, "16B"),   // Short status line
        (80, "80B"),   // Terminal-width line
        (512, "512B"), // Stack dump chunk
    ];

    for (size, label) in lines.iter() {
        let (mut producer, mut consumer) = connect(4096 - LogHeader::SIZE);
        let line = vec![b'x'; *size];
        let mut buf = vec![0u8; *size];

        group.bench_with_input(BenchmarkId::new("line", label), size, |b, _| {
            b.iter(|| {
                producer.write(black_box(&line));
                let n = consumer.read(&mut buf);
                black_box(n);
            });
        });
    }

    group.finish();
}

fn benchmark_wrapping_read(c: &mut Criterion) {
    let (mut producer, mut consumer) = connect(1000);
    let chunk = vec![0x55u8; 333];
    let mut sink = Vec::with_capacity(1024);

    // 333 does not divide 1000, so the reads regularly split at the wrap.
    c.bench_function("wrapping_read_to", |b| {
        b.iter(|| {
            producer.write(&chunk);
            sink.clear();
            let n = consumer.read_to(usize::MAX, &mut sink).unwrap();
            black_box(n);
        });
    });
}

fn benchmark_available(c: &mut Criterion) {
    let (mut producer, consumer) = connect(256);
    producer.write(b"pending");

    c.bench_function("available", |b| {
        b.iter(|| {
            black_box(consumer.available());
        });
    });
}

criterion_group!(
    benches,
    benchmark_log_write_read,
    benchmark_wrapping_read,
    benchmark_available
);
criterion_main!(benches);
