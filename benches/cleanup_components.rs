use criterion::*;
use slotec::test_util::Position;
use slotec::Manager;

fn cleanup_components(c: &mut Criterion) {
    let mut group = c.benchmark_group("cleanup components");

    for log_count in (4..=12).step_by(4) {
        let count = 1_u64 << log_count;
        group.throughput(Throughput::Elements(count / 2));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count} slots, half released")),
            &count,
            |b, &count| {
                b.iter_batched(
                    || {
                        let mut manager = Manager::new();
                        let refs: Vec<_> = (1..=count)
                            .map(|entity| {
                                manager.create_with(entity, Position::new(1.0, 2.0))
                            })
                            .collect();
                        for typed in refs.iter().step_by(2) {
                            manager.destroy(typed.handle());
                        }
                        manager
                    },
                    |mut manager| {
                        manager.cleanup();
                        manager
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, cleanup_components);
criterion_main!(benches);
