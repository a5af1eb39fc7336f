//! Semantic hypergraph pattern engine.
//!
//! A store holds typed elements: nodes, content-bearing links, and directed
//! arcs whose endpoints may themselves be arcs. A *pattern* is ordinary
//! graph content, a set node whose membership arcs point at constant
//! (anchor) and variable (to-be-bound) elements. This crate provides the two
//! operations that make patterns useful:
//!
//! - [`search`]: find every sub-graph of the store isomorphic to the pattern
//!   up to variable substitution, as a list of [`BindingMap`]s
//!   (variants: [`search_full_only`], [`search_exists`], [`search_with`]);
//! - [`generate`]: stamp a fresh concrete isomorphic copy of the pattern
//!   into the store, reusing whatever the seed bindings already pin down
//!   (variant: [`generate_filtered`]).
//!
//! Storage stays abstract behind [`GraphStore`]; [`MemStore`] is the
//! in-memory reference implementation.
//!
//! ```
//! use semgraph::prelude::*;
//!
//! let mut store = MemStore::new();
//! // concrete data: C -> D
//! let c = store.create_node(TypeTag::node()).unwrap();
//! let d = store.create_node(TypeTag::node()).unwrap();
//! store.create_arc(TypeTag::membership(), c, d).unwrap();
//!
//! // pattern: C -> y, with C anchored and y a variable
//! let root = store.create_node(TypeTag::node()).unwrap();
//! let y = store.create_node(TypeTag::var_node()).unwrap();
//! let a = store.create_arc(TypeTag::var_membership(), c, y).unwrap();
//! for member in [c, y, a] {
//!     store.create_arc(TypeTag::membership(), root, member).unwrap();
//! }
//!
//! let results = search(&store, &Pattern::new(root), &[]).unwrap();
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].get(y), Some(d));
//! ```

use thiserror::Error;

pub mod binding;
pub mod generate;
pub mod names;
pub mod pattern;
pub mod search;
pub mod store;
pub mod util;

pub use binding::{BindingMap, WorkingSet, dedup_maps, sort_by_size_desc};
pub use generate::{generate, generate_filtered};
pub use names::{NameTable, VarName};
pub use pattern::{Pattern, PatternIndex};
pub use search::{
    CancelToken, SearchMode, SearchOptions, search, search_exists, search_full_only, search_with,
};
pub use store::{
    ArcFlavor, Constness, ElementId, ElementKind, GraphStore, MemStore, NodeRole, Permanence,
    Polarity, Slot, StoreError, StoreResult, Triple, TripleQuery, TypeTag,
};

pub type EngineResult<T> = error_stack::Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The pattern embeds no constant element and the caller supplied no
    /// seed binding, so the search has nowhere to start.
    #[error("pattern has no constant anchor and no seed bindings were supplied")]
    NoAnchor,
    #[error("search anchor {0:?} is not a valid store element")]
    AnchorUnreadable(ElementId),
    /// Generation seeds must map variable, non-arc pattern members to valid
    /// store elements.
    #[error("seed binding for {0:?} is not usable")]
    InvalidSeed(ElementId),
    #[error("store lookup failed for element {0:?}")]
    Store(ElementId),
    #[error("element allocation failed during generation")]
    Allocation,
    #[error("unknown variable name {0}")]
    UnknownVariable(VarName),
    #[error("search cancelled")]
    Cancelled,
}

pub mod prelude {
    pub use crate::binding::{BindingMap, WorkingSet};
    pub use crate::generate::{generate, generate_filtered};
    pub use crate::names::{NameTable, VarName};
    pub use crate::pattern::{Pattern, PatternIndex};
    pub use crate::search::{
        CancelToken, SearchMode, SearchOptions, search, search_exists, search_full_only,
        search_with,
    };
    pub use crate::store::{ElementId, GraphStore, MemStore, StoreError, TypeTag};
    pub use crate::{EngineError, EngineResult};
}
