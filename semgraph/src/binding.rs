//! Binding maps and the working pattern set.
//!
//! A [`BindingMap`] is one match hypothesis: a partial function from pattern
//! elements to concrete elements. Hypotheses are exclusively owned: a map
//! belongs either to the branch currently extending it or to the finalized
//! result list, never to both.

use crate::store::ElementId;
use std::collections::{HashMap, HashSet};

/// Partial mapping from pattern elements to concrete elements.
///
/// The forward direction is a function (each pattern element has at most one
/// counterpart). The reverse direction is deliberately *not* unique: two
/// pattern variables may bind the same concrete element, so reverse lookups
/// scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindingMap {
    #[cfg_attr(feature = "serde", serde(with = "serde_json_any_key::any_key_map"))]
    map: HashMap<ElementId, ElementId>,
}

impl BindingMap {
    pub fn new() -> Self {
        BindingMap::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (ElementId, ElementId)>) -> Self {
        BindingMap {
            map: pairs.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, pattern_el: ElementId) -> Option<ElementId> {
        self.map.get(&pattern_el).copied()
    }

    pub fn contains(&self, pattern_el: ElementId) -> bool {
        self.map.contains_key(&pattern_el)
    }

    pub fn insert(&mut self, pattern_el: ElementId, concrete_el: ElementId) {
        self.map.insert(pattern_el, concrete_el);
    }

    pub fn remove(&mut self, pattern_el: ElementId) -> Option<ElementId> {
        self.map.remove(&pattern_el)
    }

    /// Reverse lookup: which pattern element is bound to `concrete_el`?
    /// Linear, and returns the first hit in map order; callers only use it to
    /// detect that *some* binding exists or that it differs from an expected
    /// pattern element.
    pub fn pattern_for(&self, concrete_el: ElementId) -> Option<ElementId> {
        self.map
            .iter()
            .find(|&(_, &c)| c == concrete_el)
            .map(|(&p, _)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, ElementId)> + '_ {
        self.map.iter().map(|(&p, &c)| (p, c))
    }

    /// Drops every entry whose key is not in `keep`.
    pub fn restrict_to(&mut self, keep: &HashSet<ElementId>) {
        self.map.retain(|p, _| keep.contains(p));
    }

    /// Stable identity of the map's content, independent of hash order.
    pub fn canonical(&self) -> Vec<(ElementId, ElementId)> {
        let mut pairs: Vec<_> = self.iter().collect();
        pairs.sort_unstable();
        pairs
    }
}

impl FromIterator<(ElementId, ElementId)> for BindingMap {
    fn from_iter<T: IntoIterator<Item = (ElementId, ElementId)>>(iter: T) -> Self {
        BindingMap::from_pairs(iter)
    }
}

/// Removes content-duplicate maps, keeping first occurrences. Running it
/// twice is the same as running it once.
pub fn dedup_maps(maps: &mut Vec<BindingMap>) {
    let mut seen = HashSet::new();
    maps.retain(|m| seen.insert(m.canonical()));
}

/// Stable descending sort by binding count.
pub fn sort_by_size_desc(maps: &mut [BindingMap]) {
    maps.sort_by(|a, b| b.len().cmp(&a.len()));
}

/// The set of pattern elements the current search or generation branch has
/// not consumed yet. Mutation is transactional: whatever a branch removes it
/// reinserts before returning to its caller.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    set: HashSet<ElementId>,
}

impl WorkingSet {
    pub fn from_members(members: impl IntoIterator<Item = ElementId>) -> Self {
        WorkingSet {
            set: members.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, el: ElementId) -> bool {
        self.set.contains(&el)
    }

    /// Returns whether the element was actually present, so the caller knows
    /// what to restore.
    pub fn remove(&mut self, el: ElementId) -> bool {
        self.set.remove(&el)
    }

    pub fn reinsert(&mut self, el: ElementId) {
        self.set.insert(el);
    }
}
