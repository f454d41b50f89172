use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hl_ad::dual::{Dual, gradient};
use hl_ad::{Floating, SyncTrace, Trace, Trigonometric};
use std::hint::black_box;

// f(x) = sum_i ln(x_i^2 + 1), generic over every contract implementor.
fn objective<T: Floating>(xs: &[T]) -> T {
    let mut acc = xs[0].lift(0.0);
    for &x in xs {
        acc = acc + (x * x).add_scalar(1.0).ln();
    }
    acc
}

fn inputs(n: usize) -> Vec<f64> {
    (0..n).map(|i| 1.0 + (i as f64) * 1e-3).collect()
}

fn bench_tape_build_and_backward(c: &mut Criterion) {
    let mut group = c.benchmark_group("ad_tape");

    for n_vars in [4usize, 16, 64, 256, 1024] {
        let x0 = inputs(n_vars);

        group.bench_with_input(BenchmarkId::new("build_and_backward", n_vars), &n_vars, |b, &n| {
            b.iter(|| {
                let trace = Trace::with_capacity(n * 4);
                let vars: Vec<_> = x0.iter().map(|&x| trace.var(x)).collect();
                let f = objective(&vars);
                let g = f.backward().unwrap();
                // Read a couple of adjoints to keep it "used".
                black_box((g.wrt(&vars[0]), g.wrt(&vars[n / 2])));
            })
        });

        group.bench_with_input(BenchmarkId::new("reuse_trace", n_vars), &n_vars, |b, &n| {
            let mut trace = Trace::with_capacity(n * 4);
            b.iter(|| {
                trace.clear();
                let vars: Vec<_> = x0.iter().map(|&x| trace.var(x)).collect();
                let g = objective(&vars).backward().unwrap();
                black_box(g.wrt(&vars[0]));
            })
        });

        group.bench_with_input(BenchmarkId::new("sync_trace", n_vars), &n_vars, |b, _| {
            b.iter(|| {
                let trace = SyncTrace::new();
                let vars: Vec<_> = x0.iter().map(|&x| trace.var(x)).collect();
                let g = objective(&vars).backward().unwrap();
                black_box(g.wrt(&vars[0]));
            })
        });
    }

    group.finish();
}

fn bench_dual_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("ad_dual");

    for n_vars in [4usize, 16, 64, 256] {
        let x0 = inputs(n_vars);

        group.bench_with_input(BenchmarkId::new("forward_grad_n_evals", n_vars), &n_vars, |b, _| {
            // Forward-mode gradient: N evaluations, each with one seeded variable.
            b.iter(|| {
                let (_, grad) = gradient(|v| objective(v), &x0);
                black_box(grad[0]);
            })
        });
    }

    group.bench_function("nested_second_derivative", |b| {
        b.iter(|| {
            let (_, _, d2) = hl_ad::dual::second_derivative(|x| (x * x).add_scalar(1.0).ln(), black_box(0.7));
            black_box(d2);
        })
    });

    group.bench_function("single_dual_chain", |b| {
        b.iter(|| {
            let x = Dual::var(black_box(1.3_f64));
            black_box((x.sin() * x.exp()).ln());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_tape_build_and_backward, bench_dual_ops);
criterion_main!(benches);
