//! Pattern handles and the pattern indexer.
//!
//! A pattern is ordinary graph content: a set node whose membership arcs
//! point at the elements making up the template. Indexing resolves each
//! member's type tag once, so the traversal never re-derives modifier flags
//! mid-search.

use crate::binding::WorkingSet;
use crate::store::{ElementId, GraphStore, Slot, TripleQuery, TypeTag};
use crate::util::log;
use std::collections::HashMap;

/// A pattern, named by its set node in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    /// The set node whose members make up the pattern.
    pub root: ElementId,
    /// Which arcs count as pattern membership. Only elements reached over
    /// arcs of exactly this tag belong to the pattern.
    pub membership: TypeTag,
}

impl Pattern {
    pub fn new(root: ElementId) -> Self {
        Pattern {
            root,
            membership: TypeTag::membership(),
        }
    }

    pub fn with_membership(root: ElementId, membership: TypeTag) -> Self {
        Pattern { root, membership }
    }
}

/// Snapshot of a pattern's members taken at the start of a search or
/// generation call.
#[derive(Debug, Clone)]
pub struct PatternIndex {
    root: ElementId,
    tags: HashMap<ElementId, TypeTag>,
    /// Members in store-iteration order; drives deterministic generation and
    /// anchor selection.
    member_order: Vec<ElementId>,
    var_count: usize,
}

impl PatternIndex {
    /// Indexes every membership target of `pattern.root`. A member whose type
    /// cannot be read is dropped: it could never match or be generated.
    pub fn build(store: &impl GraphStore, pattern: &Pattern) -> Self {
        let mut tags = HashMap::new();
        let mut member_order = Vec::new();
        let mut var_count = 0;
        let probe = TripleQuery::new(
            Slot::Is(pattern.root),
            Slot::Tagged(pattern.membership),
            Slot::Any,
        );
        for triple in store.triples(probe) {
            let member = triple.target;
            if tags.contains_key(&member) {
                continue;
            }
            let Ok(tag) = store.type_of(member) else {
                log::warn!("pattern member {member:?} has no readable type, skipping");
                continue;
            };
            tags.insert(member, tag);
            member_order.push(member);
            if tag.is_var() {
                var_count += 1;
            }
        }
        PatternIndex {
            root: pattern.root,
            tags,
            member_order,
            var_count,
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn contains(&self, el: ElementId) -> bool {
        self.tags.contains_key(&el)
    }

    pub fn tag(&self, el: ElementId) -> Option<TypeTag> {
        self.tags.get(&el).copied()
    }

    pub fn member_order(&self) -> &[ElementId] {
        &self.member_order
    }

    pub fn is_empty(&self) -> bool {
        self.member_order.is_empty()
    }

    /// Number of variable members. A complete match binds exactly this many
    /// pattern elements.
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// The first constant member in store order, if any: the search anchor
    /// embedded in the pattern itself.
    pub fn first_const_member(&self) -> Option<ElementId> {
        self.member_order
            .iter()
            .copied()
            .find(|el| self.tags[el].is_const())
    }

    pub fn working_set(&self) -> WorkingSet {
        WorkingSet::from_members(self.member_order.iter().copied())
    }
}
