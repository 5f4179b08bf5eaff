use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use sim_sparse::{Config, Matrix};

/// RC-ladder MNA pattern: tridiagonal conductances with a drive at node 1.
/// Element baselines are recorded so `initialize` can restore the stamped
/// values between refactorizations.
fn build_ladder(n: usize) -> (Matrix, Vec<f64>) {
    let cfg = Config {
        initialize: true,
        ..Config::real_only()
    };
    let mut m = Matrix::new(n, cfg).unwrap();
    let mut ids = Vec::new();

    for i in 1..n {
        let q = m.get_admittance(i, i + 1).unwrap();
        m.add_quad_real(&q, 1e-3);
        ids.extend([q.element1, q.element2, q.element3_negated, q.element4_negated]);
    }
    for i in 1..=n {
        let q = m.get_admittance(i, 0).unwrap();
        m.add_quad_real(&q, 1e-4);
        ids.push(q.element1);
    }
    for id in ids {
        let v = m.value(id);
        m.set_init_info(id, v.re, v.im);
    }

    let mut b = vec![0.0; n + 1];
    b[1] = 1e-3;
    (m, b)
}

fn bench_order_and_factor(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_and_factor");
    for n in [50usize, 200] {
        group.bench_function(BenchmarkId::new("ladder", n), |bench| {
            bench.iter_batched(
                || build_ladder(n),
                |(mut m, b)| {
                    m.order_and_factor(Some(&b), 1e-3, 0.0, true).unwrap();
                    m.solve(&b).unwrap()
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_refactor(c: &mut Criterion) {
    let mut group = c.benchmark_group("refactor");
    for n in [50usize, 200] {
        // Order once; the measured path is restore + value-only refactor +
        // solve, the inner loop of a transient analysis.
        let (mut m, b) = build_ladder(n);
        m.order_and_factor(Some(&b), 1e-3, 0.0, true).unwrap();

        group.bench_function(BenchmarkId::new("ladder", n), |bench| {
            bench.iter(|| {
                m.initialize();
                m.factor().unwrap();
                m.solve(&b).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_order_and_factor, bench_refactor);
criterion_main!(benches);
