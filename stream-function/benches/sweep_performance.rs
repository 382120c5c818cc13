//! Sequential Gauss-Seidel against the parallel red-black sweep.
//!
//! Both orders relax the same channel to the same fixed point; the sweep
//! counts differ slightly, so the benchmark times a full solve rather than a
//! single sweep.
//!
//! ```bash
//! cargo bench --bench sweep_performance
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use stream_function::{solve, SolveParameters, SweepOrder};

fn bench_sweep_orders(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_solve");
    group.sample_size(10);

    for nx in [41, 81, 161] {
        let params = SolveParameters::new(1.0, 4.0, 2.0, nx, 1e-5, 100_000).unwrap();

        for sweep in [SweepOrder::GaussSeidel, SweepOrder::RedBlack] {
            let params = params.with_sweep(sweep);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", sweep), nx),
                &params,
                |b, p| b.iter(|| solve(black_box(p)).unwrap()),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_sweep_orders);
criterion_main!(benches);
