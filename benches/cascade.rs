use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use clipmark::partition::{merge_adjacent, partition_range, Overlap};
use clipmark::{
    CascadeResolver, Container, EndRef, Graph, Pointer, PoolConfig, RangePointer, Relation, ResolutionPool,
    ResolverConfig,
};

/// A book of `chapters` chapters, each holding one long text clip annotated
/// by `spans` targeted spans plus class, clip-type and sequence rules.
fn make_graph(chapters: u32, spans: u32) -> Graph {
    let defaults = Container::new("defaults")
        .with_relation(
            Relation::new("body-font", Pointer::literal("markup"))
                .with_end("container-types", vec![Pointer::literal("book")])
                .endow_content("font", "serif"),
        )
        .with_relation(
            Relation::new("heading-size", Pointer::literal("markup"))
                .with_end("types", vec![Pointer::literal("heading")])
                .with_end("levels", vec![Pointer::literal("chapter")])
                .endow_direct("size", 18),
        )
        .with_relation(
            Relation::new("list-rule", Pointer::literal("sequence"))
                .with_end("applies-to", vec![Pointer::literal("list")])
                .with_end("member-end", vec![Pointer::literal("items")]),
        );

    let mut book = Container::new("book").with_type(Pointer::literal("book"));
    let mut containers = Vec::new();
    for c in 0..chapters {
        let name = format!("chapter{c}");
        let origin = format!("text{c}");
        book = book.with_clip(Pointer::container(name.clone()));

        let mut chapter = Container::new(name.clone())
            .with_type(Pointer::literal("chapter"))
            .with_clip(Pointer::range(origin.clone(), 0, u64::from(spans) * 10))
            .with_relation(
                Relation::new(format!("{name}-heading"), Pointer::literal("heading"))
                    .with_end("class", vec![Pointer::range(origin.clone(), 0, 8)]),
            )
            .with_relation(
                Relation::new(format!("{name}-list"), Pointer::literal("list"))
                    .with_end(
                        "items",
                        (1..4).map(|i| Pointer::range(origin.clone(), i * 10, 5)).collect(),
                    )
                    .endow_content("bullet", "disc"),
            );
        for s in 0..spans {
            chapter = chapter.with_relation(
                Relation::new(format!("{name}-span{s}"), Pointer::literal("markup"))
                    .with_end("target", vec![Pointer::range(origin.clone(), u64::from(s) * 10 + 3, 9)])
                    .endow_direct("weight", if s % 2 == 0 { "bold" } else { "normal" }),
            );
        }
        containers.push(chapter);
    }

    Graph::builder()
        .defaults(defaults)
        .container(book)
        .containers(containers)
        .build()
        .unwrap()
}

fn bench_partition(c: &mut Criterion) {
    let graph = Graph::builder()
        .container((0..64).fold(Container::new("doc"), |doc, i| {
            doc.with_relation(Relation::new(format!("r{i}"), Pointer::literal("markup")))
        }))
        .build()
        .unwrap();
    let clip = RangePointer::new("t", 0, 10_000);
    let overlaps: Vec<Overlap> = (0..64u64)
        .map(|i| {
            let reference = EndRef::new(graph.relation_id(&format!("r{i}")).unwrap(), 0);
            Overlap::new(RangePointer::new("t", (i * 157) % 9_000, 400), reference)
        })
        .collect();
    let merged = merge_adjacent(overlaps);

    let mut group = c.benchmark_group("partition");
    group.throughput(Throughput::Elements(merged.len() as u64));
    group.bench_function("range_64_overlaps", |b| b.iter(|| partition_range(&clip, &merged)));
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let graph = make_graph(16, 32);
    let config = ResolverConfig::default();
    let containers: Vec<_> = graph.container_ids().collect();

    let mut group = c.benchmark_group("cascade");
    group.throughput(Throughput::Elements(containers.len() as u64));
    group.bench_function("resolve_book_cold", |b| {
        b.iter_batched(
            || CascadeResolver::new(&graph, &config),
            |mut resolver| {
                for &container in &containers {
                    resolver.resolve_container(container);
                }
                resolver
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_pool(c: &mut Criterion) {
    let graph = Arc::new(make_graph(16, 32));
    let config = Arc::new(ResolverConfig::default());

    c.bench_function("cascade/pool_resolve_all", |b| {
        b.iter_batched(
            || {
                ResolutionPool::start(
                    Arc::clone(&graph),
                    Arc::clone(&config),
                    PoolConfig {
                        workers: 4,
                        queue_capacity: 64,
                    },
                )
                .unwrap()
            },
            |pool| pool.resolve_all().unwrap(),
            BatchSize::PerIteration,
        );
    });
}

criterion_group!(benches, bench_partition, bench_resolve, bench_pool);
criterion_main!(benches);
