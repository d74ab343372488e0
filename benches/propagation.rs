//! Criterion benchmarks for the forward-propagation hot path.
//!
//! Classification runs one inference per sliding window, so `predict` over a
//! window-sized feature batch dominates the classifier's run time.
//!
//! Run with: cargo bench --bench propagation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use exercise_sensing::network::{ActivationFunction, ForwardPropagator, Layer};

fn network(input: usize, hidden: usize, output: usize) -> ForwardPropagator {
    let weight_count = (input + 1) * hidden + (hidden + 1) * output;
    let weights: Vec<f32> = (0..weight_count)
        .map(|i| ((i % 17) as f32 - 8.0) * 0.05)
        .collect();
    let layers = vec![
        Layer {
            size: input,
            activation: ActivationFunction::Identity,
        },
        Layer {
            size: hidden,
            activation: ActivationFunction::Relu,
        },
        Layer {
            size: output,
            activation: ActivationFunction::Softmax,
        },
    ];
    ForwardPropagator::configure(layers, &weights).expect("valid configuration")
}

/// One 400-row, 3-column window per call, over networks of increasing
/// hidden-layer width.
fn predict_single_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict_window");
    let input = 400 * 3;
    let features: Vec<f32> = (0..input).map(|i| (i as f32 * 0.01).sin()).collect();

    for hidden in [25, 100, 250] {
        let mut net = network(input, hidden, 8);
        group.throughput(Throughput::Elements(input as u64));
        group.bench_with_input(BenchmarkId::new("hidden", hidden), &hidden, |b, _| {
            b.iter(|| net.predict(black_box(&features)).expect("valid batch"));
        });
    }

    group.finish();
}

/// A whole session's worth of stacked windows in one batched call.
fn predict_stacked_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict_batch");
    let input = 400 * 3;
    let mut net = network(input, 100, 8);

    for examples in [1usize, 16, 64] {
        let features: Vec<f32> = (0..input * examples).map(|i| (i as f32 * 0.01).cos()).collect();
        group.throughput(Throughput::Elements(examples as u64));
        group.bench_with_input(BenchmarkId::new("examples", examples), &examples, |b, _| {
            b.iter(|| net.predict(black_box(&features)).expect("valid batch"));
        });
    }

    group.finish();
}

criterion_group!(benches, predict_single_window, predict_stacked_batch);
criterion_main!(benches);
