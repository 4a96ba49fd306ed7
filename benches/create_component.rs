use criterion::*;
use slotec::test_util::Position;
use slotec::Manager;

fn create_component(c: &mut Criterion) {
    let mut group = c.benchmark_group("create component");

    for log_count in (0..=12).step_by(4) {
        let count = 1_u64 << log_count;
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count} components")),
            &count,
            |b, &count| {
                b.iter_batched(
                    Manager::new,
                    |mut manager| {
                        for entity in 1..=count {
                            manager.create_with(entity, Position::new(1.0, 2.0));
                        }
                        manager
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, create_component);
criterion_main!(benches);
