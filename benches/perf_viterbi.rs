use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use flipflop_decode::{
    BackendRequest, Capabilities, Scores, Traceback, ViterbiEngine, ViterbiEngineBuilder,
};
use ndarray::Array3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use sysinfo::{get_current_pid, ProcessRefreshKind, System};

const CHANNELS: usize = 40;

fn random_scores(rng: &mut StdRng, t: usize, b: usize) -> Scores {
    Scores::host(Array3::from_shape_fn((t, b, CHANNELS), |_| {
        rng.gen_range(-4.0f32..4.0)
    }))
}

fn rss_kib() -> u64 {
    let mut sys = System::new();
    sys.refresh_processes_specifics(ProcessRefreshKind::new());
    if let Some(p) = sys.process(get_current_pid().unwrap()) {
        p.memory()
    } else {
        0
    }
}

fn engine(request: BackendRequest, traceback: Traceback) -> ViterbiEngine {
    ViterbiEngineBuilder::new()
        .with_backend(request)
        .with_traceback(traceback)
        .with_capabilities(Capabilities::probe())
        .build()
}

fn bench_viterbi_perf(c: &mut Criterion) {
    let mut group = c.benchmark_group("flipflop_viterbi");
    group.sample_size(10);
    let mut backends = vec![("portable", BackendRequest::Portable)];
    if Capabilities::probe().native_kernel.is_available() {
        backends.push(("native", BackendRequest::Native { fallback: false }));
    }
    let tracebacks = [
        ("full", Traceback::Full),
        ("checkpointed", Traceback::Checkpointed { block_size: None }),
    ];
    for &(t, batch) in &[(1_000usize, 16usize), (4_000, 64)] {
        for &(backend_name, request) in &backends {
            for &(tb_name, traceback) in &tracebacks {
                let decoder = engine(request, traceback);
                group.bench_function(format!("{backend_name}_{tb_name}_t{t}_b{batch}"), |b| {
                    b.iter_batched(
                        || {
                            let mut rng = StdRng::seed_from_u64(44);
                            random_scores(&mut rng, t, batch)
                        },
                        |scores| {
                            let before = rss_kib();
                            let out = decoder.decode(&scores).unwrap();
                            let after = rss_kib();
                            criterion::black_box(out.best_score);
                            eprintln!(
                                "RSS KiB delta ({backend_name} {tb_name} {t}x{batch}): {}",
                                after.saturating_sub(before)
                            );
                        },
                        BatchSize::PerIteration,
                    )
                });
            }
        }
    }
    group.finish();
}

criterion_group!(benches, bench_viterbi_perf);
criterion_main!(benches);
