use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serial_bridge::{MockOpener, SerialBridge};
use std::time::Duration;

pub fn bench_write_read_round_trip(c: &mut Criterion) {
    let bridge = SerialBridge::with_opener(Box::new(MockOpener::echoing()));
    let handle = bridge.open_default("/mock/bench").unwrap();
    let payload = [0x55u8; 64];

    c.bench_function("write_read_round_trip_64b", |b| {
        b.iter(|| {
            bridge.write(handle, &payload).unwrap();
            let data = bridge.read(handle, 64, None).unwrap();
            black_box(data);
        })
    });
}

pub fn bench_open_close_churn(c: &mut Criterion) {
    let bridge = SerialBridge::with_opener(Box::new(MockOpener::echoing()));

    c.bench_function("open_close_churn", |b| {
        b.iter(|| {
            let handle = bridge.open_default("/mock/churn").unwrap();
            bridge.close(black_box(handle));
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_write_read_round_trip, bench_open_close_churn
}
criterion_main!(benches);
