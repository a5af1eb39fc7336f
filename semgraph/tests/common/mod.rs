#![allow(dead_code)]

use semgraph::prelude::*;
use semgraph::NodeRole;

/// A fresh pattern set node.
pub fn pattern_root(store: &mut MemStore) -> ElementId {
    store
        .create_node(TypeTag::node().with_role(NodeRole::Structure))
        .unwrap()
}

/// Wires `members` into the pattern set in the given order.
pub fn add_members(store: &mut MemStore, root: ElementId, members: &[ElementId]) {
    for &member in members {
        store
            .create_arc(TypeTag::membership(), root, member)
            .unwrap();
    }
}

pub fn const_node(store: &mut MemStore) -> ElementId {
    store.create_node(TypeTag::node()).unwrap()
}

pub fn var_node(store: &mut MemStore) -> ElementId {
    store.create_node(TypeTag::var_node()).unwrap()
}

/// Concrete membership-flavored arc, the type the test patterns match.
pub fn data_arc(store: &mut MemStore, source: ElementId, target: ElementId) -> ElementId {
    store
        .create_arc(TypeTag::membership(), source, target)
        .unwrap()
}

pub fn var_arc(store: &mut MemStore, source: ElementId, target: ElementId) -> ElementId {
    store
        .create_arc(TypeTag::var_membership(), source, target)
        .unwrap()
}
