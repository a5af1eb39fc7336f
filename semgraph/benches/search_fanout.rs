use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use semgraph::prelude::*;

/// One anchor with `fanout` outgoing arcs, matched by the star pattern
/// `C -> y`. Measures candidate enumeration and per-branch map cloning.
fn build_star(fanout: u64) -> (MemStore, Pattern) {
    let mut store = MemStore::new();
    let anchor = store.create_node(TypeTag::node()).unwrap();
    for _ in 0..fanout {
        let spoke = store.create_node(TypeTag::node()).unwrap();
        store
            .create_arc(TypeTag::membership(), anchor, spoke)
            .unwrap();
    }
    let root = store.create_node(TypeTag::node()).unwrap();
    let y = store.create_node(TypeTag::var_node()).unwrap();
    let a = store
        .create_arc(TypeTag::var_membership(), anchor, y)
        .unwrap();
    for member in [anchor, y, a] {
        store
            .create_arc(TypeTag::membership(), root, member)
            .unwrap();
    }
    (store, Pattern::new(root))
}

fn bench_search_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_fanout");
    for fanout in [4u64, 32, 256] {
        let (store, pattern) = build_star(fanout);
        group.bench_with_input(BenchmarkId::from_parameter(fanout), &fanout, |b, _| {
            b.iter(|| {
                let results = search(black_box(&store), black_box(&pattern), &[]).unwrap();
                assert_eq!(results.len(), fanout as usize);
                results
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search_fanout);
criterion_main!(benches);
