//! Throughput benchmarks for the per-tick and per-recording hot paths

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fecg_core::ChannelView;
use fecg_processing::{DisplayController, HeartRateEstimator, WindowNormalizer};
use std::f64::consts::PI;

fn ecg_like(seconds: usize, scan_rate: usize) -> Vec<f64> {
    (0..seconds * scan_rate)
        .map(|i| {
            let t = i as f64 / scan_rate as f64;
            (2.0 * PI * 1.3 * t).sin().powi(15) + 0.01 * (2.0 * PI * 50.0 * t).sin()
        })
        .collect()
}

/// Peak scan over recordings of increasing length
fn bench_heart_rate(c: &mut Criterion) {
    let mut group = c.benchmark_group("heart_rate");

    for &seconds in &[10usize, 60, 550] {
        let data = ecg_like(seconds, 1000);
        group.bench_with_input(BenchmarkId::new("estimate", format!("{}s", seconds)), &data, |b, data| {
            let estimator = HeartRateEstimator::new(1000, 0.5);
            b.iter(|| black_box(estimator.estimate(&ChannelView::single(black_box(data)))));
        });
    }

    group.finish();
}

/// One display tick over a strided maternal channel and a fetal estimate
fn bench_display_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("display_tick");

    let ecg = ecg_like(120, 1000);
    let mut interleaved = Vec::with_capacity(ecg.len() * 5);
    for &value in &ecg {
        interleaved.extend_from_slice(&[0.0, value, 0.0, 0.0, 0.0]);
    }
    let fetal: Vec<f64> = ecg.iter().map(|v| v * 0.1).collect();

    for &window_seconds in &[2.0, 10.0] {
        group.bench_function(BenchmarkId::new("tick", format!("{}s_window", window_seconds)), |b| {
            let mut controller = DisplayController::new(WindowNormalizer::new(1280.0, 120.0, 1e-6));
            controller
                .add_timed_track("maternal", ChannelView::new(&interleaved, 5, 1).unwrap(), 1000, window_seconds)
                .add_timed_track("fetal", ChannelView::single(&fetal), 1000, window_seconds);
            b.iter(|| black_box(controller.tick()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_heart_rate, bench_display_tick);
criterion_main!(benches);
