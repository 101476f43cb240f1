//! Benchmarks for the per-frame analysis path
//!
//! Run with: cargo bench --bench analysis

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pitchscope::formant::durand_kerner;
use pitchscope::{find_peaks, Analyzer, FftEngine, FftSize, HpsEstimator, LpcAnalyzer, LpcSettings, Settings};
use std::f64::consts::PI;

const SAMPLE_RATE: f64 = 48000.0;

fn harmonic_block(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE;
            let s = (1..=6)
                .map(|h| 0.8f64.powi(h - 1) * (2.0 * PI * 220.0 * h as f64 * t).sin())
                .sum::<f64>();
            (0.05 * s) as f32
        })
        .collect()
}

// ============================================================================
// FFT
// ============================================================================

fn bench_fft(c: &mut Criterion) {
    let mut group = c.benchmark_group("fft_power_db");

    for size in FftSize::ALL {
        let n = size.samples();
        let mut engine = FftEngine::new(n).unwrap();
        let block = harmonic_block(n);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| engine.power_spectrum_db(black_box(&block)).unwrap())
        });
    }

    group.finish();
}

// ============================================================================
// Estimators
// ============================================================================

fn bench_estimators(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimators");

    let mut engine = FftEngine::new(4096).unwrap();
    let db = engine.power_spectrum_db(&harmonic_block(4096)).unwrap();
    let normalized: Vec<f32> = db.iter().map(|v| ((v + 100.0) / 70.0).clamp(0.0, 1.0)).collect();
    let hz_per_bin = SAMPLE_RATE / 4096.0;

    group.bench_function("find_peaks_3", |b| {
        b.iter(|| find_peaks(black_box(&db), 3, 50.0, hz_per_bin))
    });

    let hps = HpsEstimator::default();
    group.bench_function("hps_8_partials", |b| {
        b.iter(|| hps.estimate(black_box(&normalized), hz_per_bin))
    });

    let mut lpc = LpcAnalyzer::new(LpcSettings::default()).unwrap();
    let block = harmonic_block(4096);
    group.bench_function("lpc_order_10", |b| {
        b.iter(|| lpc.analyze(black_box(&block), SAMPLE_RATE).unwrap())
    });

    // (z - 0.5)(z + 0.25)(z² + 1)
    let poly = [1.0, -0.25, 0.875, -0.25, -0.125];
    group.bench_function("durand_kerner_deg4", |b| {
        b.iter(|| durand_kerner(black_box(&poly)).unwrap())
    });

    group.finish();
}

// ============================================================================
// Full pipeline
// ============================================================================

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyzer_process");

    for size in [FftSize::Fft2048, FftSize::Fft4096, FftSize::Fft8192] {
        let settings = Settings {
            fft_size: size,
            ..Settings::default()
        };
        let mut analyzer = Analyzer::new(settings).unwrap();
        let block = harmonic_block(size.samples());

        group.bench_with_input(BenchmarkId::from_parameter(size.samples()), &size, |b, _| {
            b.iter(|| {
                analyzer.process(black_box(&block), SAMPLE_RATE).unwrap();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fft, bench_estimators, bench_pipeline);
criterion_main!(benches);
