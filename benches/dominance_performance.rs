use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sectorscope::aggregate::{best_sector_times, speed_trap_averages};
use sectorscope::dominance::{Channel, TelemetrySample, TelemetryTrace, dominance, resample};
use sectorscope::laps::{LapTable, RawDuration, RawLapRecord};
use std::time::Duration;

/// A ~5.3km lap sampled roughly every `step` metres with some jitter.
fn create_trace(step: f64, speed_offset: f64) -> TelemetryTrace {
    let total = 5300.;
    let count = (total / step) as usize;
    let samples: Vec<TelemetrySample> = (0..=count)
        .map(|i| {
            let distance = i as f64 * step;
            let angle = distance / total * std::f64::consts::TAU;
            TelemetrySample {
                distance,
                x: angle.cos() * 800.,
                y: angle.sin() * 500.,
                speed: 180. + 120. * (angle * 7.).sin().abs() + speed_offset,
                gear: Some(((i / 40) % 8 + 1) as f64),
                throttle: Some(if i % 50 < 35 { 100. } else { 0. }),
                ..Default::default()
            }
        })
        .collect();
    TelemetryTrace::from_samples(&samples)
}

fn create_lap_table(drivers: usize, laps_per_driver: u32) -> LapTable {
    let records: Vec<RawLapRecord> = (0..drivers)
        .flat_map(|d| {
            (1..=laps_per_driver).map(move |lap| RawLapRecord {
                driver: format!("D{:02}", d),
                team: format!("Team {}", d / 2),
                lap_number: lap,
                lap_time: Some(RawDuration::Text(format!("1:{:06.3}", 28. + d as f64 * 0.1))),
                sector1: Some(RawDuration::Seconds(29. + lap as f64 * 0.01)),
                sector2: Some(RawDuration::Seconds(30. + d as f64 * 0.02)),
                sector3: Some(RawDuration::Seconds(29.5)),
                speed_i1: Some(280. + d as f64),
                speed_i2: Some(250.),
                speed_fl: Some(300.),
                speed_st: Some(315. - d as f64),
                accurate: lap % 5 != 0,
                team_color: None,
            })
        })
        .collect();
    LapTable::from_raw(&records).expect("valid lap records")
}

fn bench_dominance(c: &mut Criterion) {
    let mut group = c.benchmark_group("dominance");
    group.measurement_time(Duration::from_secs(5));

    let trace_a = create_trace(1.5, 0.);
    let trace_b = create_trace(1.7, 1.5);

    for resolution in [200usize, 1000, 5000] {
        group.bench_with_input(
            BenchmarkId::new("dominance", resolution),
            &resolution,
            |b, &resolution| {
                b.iter(|| black_box(dominance(&trace_a, &trace_b, resolution).unwrap()));
            },
        );
    }

    group.bench_function("resample_200", |b| {
        b.iter(|| black_box(resample(&trace_a, 200).unwrap()));
    });

    group.finish();
}

fn bench_partial_channels(c: &mut Criterion) {
    let mut trace_a = create_trace(2., 0.);
    let trace_b = create_trace(2., 0.);
    // partial channels are copied index-wise instead of interpolated
    trace_a.extras.insert(Channel::Rpm, vec![11000.; 150]);

    c.bench_function("dominance_partial_channel", |b| {
        b.iter(|| black_box(dominance(&trace_a, &trace_b, 200).unwrap()));
    });
}

fn bench_aggregation(c: &mut Criterion) {
    let table = create_lap_table(20, 25);

    c.bench_function("best_sector_times_20_drivers", |b| {
        b.iter(|| black_box(best_sector_times(&table)));
    });
    c.bench_function("speed_trap_averages_20_drivers", |b| {
        b.iter(|| black_box(speed_trap_averages(&table)));
    });
}

criterion_group!(
    benches,
    bench_dominance,
    bench_partial_channels,
    bench_aggregation
);
criterion_main!(benches);
