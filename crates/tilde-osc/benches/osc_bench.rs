//! Criterion benchmarks for tilde-osc generators
//!
//! Run with: cargo bench -p tilde-osc
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tilde_core::{ControlEvents, Kernel, Signal};
use tilde_osc::{
    BlepOscillator, BlepShape, Impulse, Interpolation, RandomInterp, RandomPulse, ShapeOscillator, Waveshape,
    WhiteNoise,
};

const SAMPLE_RATE: f64 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 256, 1024];

// ============================================================================
// Band-limited oscillators
// ============================================================================

fn bench_blep(c: &mut Criterion) {
    let mut group = c.benchmark_group("BlepOscillator");

    let shapes = [
        ("Saw", BlepShape::Saw),
        ("Square", BlepShape::Square),
        ("Triangle", BlepShape::Triangle),
        ("VariableSaw", BlepShape::VariableSaw),
    ];

    for (name, shape) in &shapes {
        for &block_size in BLOCK_SIZES {
            let mut osc = BlepOscillator::new(SAMPLE_RATE, *shape);
            osc.set_frequency(440.0);
            osc.set_pulse_width(0.3);
            let mut output = vec![0.0f32; block_size];
            let mut events = ControlEvents::new();

            group.bench_with_input(BenchmarkId::new(*name, block_size), &block_size, |b, _| {
                b.iter(|| {
                    osc.process_block(&[], black_box(&mut output), &mut events);
                });
            });
        }
    }

    // audio-rate frequency and sync inputs
    let sweep: Vec<f32> = (0..256).map(|i| 100.0 + i as f32 * 10.0).collect();
    let sync: Vec<f32> = (0..256).map(|i| if i % 100 == 0 { 0.5 } else { 0.0 }).collect();
    group.bench_function("Saw/modulated_256", |b| {
        let mut osc = BlepOscillator::new(SAMPLE_RATE, BlepShape::Saw);
        let mut output = vec![0.0f32; 256];
        let mut events = ControlEvents::new();
        b.iter(|| {
            osc.process_block(
                &[Signal::Audio(&sweep), Signal::Scalar(0.5), Signal::Audio(&sync)],
                &mut output,
                &mut events,
            );
        });
    });

    group.finish();
}

// ============================================================================
// Phase-shaped oscillators
// ============================================================================

fn bench_shapes(c: &mut Criterion) {
    let mut group = c.benchmark_group("ShapeOscillator");

    let shapes = [
        ("Sine", Waveshape::Sine),
        ("Triangle", Waveshape::Triangle),
        ("Parabolic", Waveshape::Parabolic),
        ("Gaussian", Waveshape::Gaussian(0.5)),
    ];

    for (name, shape) in &shapes {
        group.bench_function(*name, |b| {
            let mut osc = ShapeOscillator::new(SAMPLE_RATE, *shape);
            osc.set_frequency(440.0);
            b.iter(|| {
                for _ in 0..256 {
                    black_box(osc.advance());
                }
            });
        });
    }

    group.bench_function("Impulse", |b| {
        let mut imp = Impulse::new(SAMPLE_RATE);
        imp.set_frequency(440.0);
        b.iter(|| {
            for _ in 0..256 {
                black_box(imp.advance());
            }
        });
    });

    group.finish();
}

// ============================================================================
// Random sources
// ============================================================================

fn bench_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("Noise");

    group.bench_function("WhiteNoise_256", |b| {
        let mut noise = WhiteNoise::new(SAMPLE_RATE, 1);
        b.iter(|| {
            for _ in 0..256 {
                black_box(noise.next_sample());
            }
        });
    });

    group.bench_function("RandomInterp_256", |b| {
        let mut lfo = RandomInterp::new(SAMPLE_RATE, 1, Interpolation::Linear);
        lfo.set_frequency(50.0);
        b.iter(|| {
            for _ in 0..256 {
                black_box(lfo.advance());
            }
        });
    });

    group.bench_function("RandomPulse_256", |b| {
        let mut pulse = RandomPulse::new(SAMPLE_RATE, 1);
        pulse.set_frequency(50.0);
        b.iter(|| {
            for _ in 0..256 {
                black_box(pulse.advance());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_blep, bench_shapes, bench_noise);
criterion_main!(benches);
