//! Criterion benchmarks for tilde-core kernels
//!
//! Run with: cargo bench -p tilde-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tilde_core::{
    Asr, BiquadCascade, ControlEvents, Filter, FilterType, Kernel, PhaseAccumulator, Signal, StateVariableFilter,
    StepLimit, XorShift, lowpass_coefficients,
};

const SAMPLE_RATE: f64 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 256, 1024];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE;
            ((2.0 * std::f64::consts::PI * 440.0 * t).sin() * 0.5) as f32
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("Filter");

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);
        let mut output = vec![0.0f32; block_size];
        let sweep: Vec<f32> = (0..block_size).map(|i| 500.0 + i as f32).collect();

        group.bench_with_input(BenchmarkId::new("constant_controls", block_size), &block_size, |b, _| {
            let mut filter = Filter::new(SAMPLE_RATE, FilterType::Lowpass);
            let mut events = ControlEvents::new();
            b.iter(|| {
                filter.process_block(
                    &[Signal::Audio(black_box(&input)), Signal::Scalar(1000.0), Signal::Scalar(0.707)],
                    &mut output,
                    &mut events,
                );
            });
        });

        // Every sample changes frequency, so every sample redesigns
        group.bench_with_input(BenchmarkId::new("swept_frequency", block_size), &block_size, |b, _| {
            let mut filter = Filter::new(SAMPLE_RATE, FilterType::Lowpass);
            let mut events = ControlEvents::new();
            b.iter(|| {
                filter.process_block(
                    &[Signal::Audio(black_box(&input)), Signal::Audio(&sweep), Signal::Scalar(0.707)],
                    &mut output,
                    &mut events,
                );
            });
        });
    }

    group.bench_function("coefficient_calc", |b| {
        b.iter(|| black_box(lowpass_coefficients(black_box(1000.0), black_box(0.707), black_box(24000.0))));
    });

    group.finish();
}

fn bench_cascade_and_svf(c: &mut Criterion) {
    let mut group = c.benchmark_group("Cascade");
    let input = generate_test_signal(256);
    let coeffs = lowpass_coefficients(2000.0, 0.707, 24000.0);
    let list: Vec<f64> = (0..8).flat_map(|_| [coeffs.b1, coeffs.b2, coeffs.a0, coeffs.a1, coeffs.a2]).collect();

    group.bench_function("8_stages_256", |b| {
        let mut cascade = BiquadCascade::new(SAMPLE_RATE);
        cascade.set_coefficients(&list);
        b.iter(|| {
            for &x in &input {
                black_box(cascade.process(black_box(x)));
            }
        });
    });

    group.bench_function("svf_256", |b| {
        let mut svf = StateVariableFilter::new(SAMPLE_RATE);
        b.iter(|| {
            for &x in &input {
                black_box(svf.process(black_box(x)));
            }
        });
    });

    group.finish();
}

fn bench_generators(c: &mut Criterion) {
    let mut group = c.benchmark_group("Generators");

    group.bench_function("phase_step_1024", |b| {
        let mut acc = PhaseAccumulator::new(SAMPLE_RATE, StepLimit::Nyquist);
        b.iter(|| {
            for _ in 0..1024 {
                black_box(acc.step(black_box(440.0), 0.0, 0.0));
            }
        });
    });

    group.bench_function("xorshift_1024", |b| {
        let mut rng = XorShift::new(1);
        b.iter(|| {
            for _ in 0..1024 {
                black_box(rng.next_f32());
            }
        });
    });

    group.bench_function("asr_block_256", |b| {
        let mut env = Asr::new(SAMPLE_RATE);
        env.set_times(5.0, 50.0);
        let mut out = vec![0.0f32; 256];
        let mut events = ControlEvents::new();
        let mut gate = 1.0f32;
        b.iter(|| {
            events.clear();
            env.process_block(&[Signal::Scalar(gate)], &mut out, &mut events);
            gate = 1.0 - gate;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_filter, bench_cascade_and_svf, bench_generators);
criterion_main!(benches);
