//! Generation feeding back into search, and the atomicity guarantee on the
//! generation failure path.

mod common;

use common::*;
use semgraph::prelude::*;
use semgraph::{StoreResult, Triple, TripleQuery};
use std::collections::HashSet;

/// Whatever generation stamps out, a search over the same pattern must find,
/// agreeing with the generated map on the seed and on the arc structure.
#[test]
fn generated_copy_is_searchable() {
    let mut store = MemStore::new();
    let c = const_node(&mut store);

    let root = pattern_root(&mut store);
    let y = var_node(&mut store);
    let z = var_node(&mut store);
    let a1 = var_arc(&mut store, c, y);
    let a2 = var_arc(&mut store, y, z);
    add_members(&mut store, root, &[c, y, z, a1, a2]);
    let pattern = Pattern::new(root);

    let generated = generate(&mut store, &pattern, &[]).unwrap();
    let results = search(&store, &pattern, &[]).unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().any(|r| {
        [y, z, a1, a2]
            .iter()
            .all(|&el| r.get(el) == generated.get(el))
    }));
}

/// Seeded round trip: the seed survives into the results verbatim.
#[test]
fn seeded_round_trip_preserves_the_seed() {
    let mut store = MemStore::new();
    let c = const_node(&mut store);

    let root = pattern_root(&mut store);
    let x = var_node(&mut store);
    let y = var_node(&mut store);
    let a = var_arc(&mut store, x, y);
    add_members(&mut store, root, &[x, a, y]);
    let pattern = Pattern::new(root);
    let seed = [(x, c)];

    let generated = generate(&mut store, &pattern, &seed).unwrap();
    assert_eq!(generated.get(x), Some(c));

    let results = search(&store, &pattern, &seed).unwrap();
    assert!(!results.is_empty());
    assert!(
        results
            .iter()
            .any(|r| r.get(x) == Some(c) && r.get(y) == generated.get(y))
    );
}

/// The filtered variant creates everything but only surfaces the requested
/// variables.
#[test]
fn filtered_generation_surfaces_only_requested() {
    let mut store = MemStore::new();
    let root = pattern_root(&mut store);
    let x = var_node(&mut store);
    let y = var_node(&mut store);
    let a = var_arc(&mut store, x, y);
    add_members(&mut store, root, &[x, a, y]);

    let before = store.len();
    let map = generate_filtered(
        &mut store,
        &Pattern::new(root),
        &[],
        &HashSet::from([y]),
    )
    .unwrap();
    // the structure exists in full even though the map is narrowed
    assert_eq!(store.len(), before + 3);
    assert_eq!(map.len(), 1);
    assert!(map.get(y).is_some());
    assert_eq!(map.get(x), None);
    assert_eq!(map.get(a), None);
}

/// Store wrapper whose allocation budget runs out mid-generation.
struct FlakyStore {
    inner: MemStore,
    creates_left: u32,
}

impl GraphStore for FlakyStore {
    fn is_valid(&self, el: ElementId) -> bool {
        self.inner.is_valid(el)
    }
    fn type_of(&self, el: ElementId) -> StoreResult<TypeTag> {
        self.inner.type_of(el)
    }
    fn endpoints(&self, arc: ElementId) -> StoreResult<(ElementId, ElementId)> {
        self.inner.endpoints(arc)
    }
    fn create_node(&mut self, tag: TypeTag) -> StoreResult<ElementId> {
        if self.creates_left == 0 {
            return Err(StoreError::BadCreateTag(tag));
        }
        self.creates_left -= 1;
        self.inner.create_node(tag)
    }
    fn create_link(&mut self, tag: TypeTag, content: Vec<u8>) -> StoreResult<ElementId> {
        if self.creates_left == 0 {
            return Err(StoreError::BadCreateTag(tag));
        }
        self.creates_left -= 1;
        self.inner.create_link(tag, content)
    }
    fn create_arc(
        &mut self,
        tag: TypeTag,
        source: ElementId,
        target: ElementId,
    ) -> StoreResult<ElementId> {
        if self.creates_left == 0 {
            return Err(StoreError::BadCreateTag(tag));
        }
        self.creates_left -= 1;
        self.inner.create_arc(tag, source, target)
    }
    fn erase_element(&mut self, el: ElementId) -> StoreResult<()> {
        self.inner.erase_element(el)
    }
    fn link_content(&self, el: ElementId) -> StoreResult<Vec<u8>> {
        self.inner.link_content(el)
    }
    fn triples(&self, query: TripleQuery) -> Vec<Triple> {
        self.inner.triples(query)
    }
}

/// Generation that fails partway leaves the store exactly as it found it.
#[test]
fn failed_generation_leaves_no_debris() {
    let mut inner = MemStore::new();
    let root = pattern_root(&mut inner);
    let x = var_node(&mut inner);
    let y = var_node(&mut inner);
    let a = var_arc(&mut inner, x, y);
    add_members(&mut inner, root, &[x, a, y]);
    let before = inner.len();

    // both nodes fit the budget, the arc does not
    let mut store = FlakyStore {
        inner,
        creates_left: 2,
    };
    let err = generate(&mut store, &Pattern::new(root), &[]).unwrap_err();
    assert_eq!(*err.current_context(), EngineError::Allocation);
    assert_eq!(store.inner.len(), before);
}
