//! Randomized invariants over small stores and patterns.

mod common;

use common::*;
use proptest::prelude::*;
use semgraph::prelude::*;
use std::collections::HashSet;

/// Fan-out store: one hub with `edges` outgoing arcs, some doubled up as
/// parallel arcs. The star pattern `C -> y` must report one result per arc.
fn star_case(fanout: usize, parallel: usize) -> (MemStore, Pattern, ElementId, usize) {
    let mut store = MemStore::new();
    let hub = const_node(&mut store);
    let mut arc_count = 0;
    for i in 0..fanout {
        let spoke = const_node(&mut store);
        data_arc(&mut store, hub, spoke);
        arc_count += 1;
        if i < parallel {
            data_arc(&mut store, hub, spoke);
            arc_count += 1;
        }
    }
    let root = pattern_root(&mut store);
    let y = var_node(&mut store);
    let a = var_arc(&mut store, hub, y);
    add_members(&mut store, root, &[hub, a, y]);
    (store, Pattern::new(root), y, arc_count)
}

proptest! {
    /// One result per concrete arc, descending sizes, pairwise distinct, and
    /// full-only agrees since every match is complete.
    #[test]
    fn star_results_are_exhaustive_and_distinct(
        fanout in 0usize..8,
        parallel in 0usize..4,
    ) {
        let parallel = parallel.min(fanout);
        let (store, pattern, _y, arc_count) = star_case(fanout, parallel);

        let results = search(&store, &pattern, &[]).unwrap();
        prop_assert_eq!(results.len(), arc_count);
        for pair in results.windows(2) {
            prop_assert!(pair[0].len() >= pair[1].len());
        }
        let distinct: HashSet<_> = results.iter().map(|m| m.canonical()).collect();
        prop_assert_eq!(distinct.len(), results.len());

        let full = search_full_only(&store, &pattern, &[]).unwrap();
        if arc_count > 0 {
            prop_assert_eq!(full, results);
        } else {
            prop_assert!(full.is_empty());
        }
    }

    /// Random connected chain-plus-shortcut patterns: generating a copy and
    /// searching from the generated anchor recovers the generated map.
    #[test]
    fn generated_copies_are_recovered(
        extra_arcs in proptest::collection::vec((0usize..6, 0usize..6), 0..6),
        node_count in 2usize..6,
    ) {
        let mut store = MemStore::new();
        let root = pattern_root(&mut store);
        let mut nodes = Vec::new();
        for _ in 0..node_count {
            nodes.push(var_node(&mut store));
        }
        let mut arcs = Vec::new();
        // a chain keeps everything reachable from the first node
        for i in 1..node_count {
            arcs.push(var_arc(&mut store, nodes[i - 1], nodes[i]));
        }
        for &(s, t) in &extra_arcs {
            arcs.push(var_arc(&mut store, nodes[s % node_count], nodes[t % node_count]));
        }
        let members: Vec<ElementId> = nodes.iter().chain(arcs.iter()).copied().collect();
        add_members(&mut store, root, &members);
        let pattern = Pattern::new(root);

        let generated = generate(&mut store, &pattern, &[]).unwrap();
        prop_assert_eq!(generated.len(), members.len());

        let seed = [(nodes[0], generated.get(nodes[0]).unwrap())];
        let results = search_full_only(&store, &pattern, &seed).unwrap();
        prop_assert!(!results.is_empty());
        prop_assert!(results.iter().any(|r| r == &generated));
        for r in &results {
            prop_assert_eq!(r.len(), members.len());
        }
    }
}
