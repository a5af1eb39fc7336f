//! In-memory reference implementation of [`GraphStore`].
//!
//! Adjacency is kept in insertion order so iteration is reproducible: a
//! search returns the same "first" match on every run against the same store.

use super::{
    ElementId, ElementKind, GraphStore, Slot, StoreError, StoreResult, Triple, TripleQuery, TypeTag,
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Record {
    tag: TypeTag,
    ends: Option<(ElementId, ElementId)>,
    content: Option<Vec<u8>>,
    /// Incident arcs with this element as source, in creation order.
    out: Vec<ElementId>,
    /// Incident arcs with this element as target, in creation order.
    inc: Vec<ElementId>,
}

#[derive(Debug, Clone, Default)]
pub struct MemStore {
    elements: HashMap<ElementId, Record>,
    /// Creation order of all elements, for full scans.
    order: Vec<ElementId>,
    next: ElementId,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.order.iter().copied()
    }

    fn alloc(&mut self, record: Record) -> ElementId {
        let id = self.next;
        self.next += ElementId(1);
        self.elements.insert(id, record);
        self.order.push(id);
        id
    }

    fn record(&self, el: ElementId) -> StoreResult<&Record> {
        self.elements.get(&el).ok_or(StoreError::NoSuchElement(el))
    }

    fn slot_matches(&self, slot: Slot, el: ElementId) -> bool {
        match slot {
            Slot::Any => true,
            Slot::Is(want) => want == el,
            Slot::Tagged(tag) => self.elements.get(&el).is_some_and(|r| r.tag == tag),
        }
    }
}

impl GraphStore for MemStore {
    fn is_valid(&self, el: ElementId) -> bool {
        self.elements.contains_key(&el)
    }

    fn type_of(&self, el: ElementId) -> StoreResult<TypeTag> {
        Ok(self.record(el)?.tag)
    }

    fn endpoints(&self, arc: ElementId) -> StoreResult<(ElementId, ElementId)> {
        self.record(arc)?.ends.ok_or(StoreError::NotAnArc(arc))
    }

    fn create_node(&mut self, tag: TypeTag) -> StoreResult<ElementId> {
        if !tag.is_node() {
            return Err(StoreError::BadCreateTag(tag));
        }
        Ok(self.alloc(Record {
            tag,
            ends: None,
            content: None,
            out: Vec::new(),
            inc: Vec::new(),
        }))
    }

    fn create_link(&mut self, tag: TypeTag, content: Vec<u8>) -> StoreResult<ElementId> {
        if !tag.is_link() {
            return Err(StoreError::BadCreateTag(tag));
        }
        Ok(self.alloc(Record {
            tag,
            ends: None,
            content: Some(content),
            out: Vec::new(),
            inc: Vec::new(),
        }))
    }

    fn create_arc(
        &mut self,
        tag: TypeTag,
        source: ElementId,
        target: ElementId,
    ) -> StoreResult<ElementId> {
        if !tag.is_arc() {
            return Err(StoreError::BadCreateTag(tag));
        }
        if !self.is_valid(source) {
            return Err(StoreError::NoSuchElement(source));
        }
        if !self.is_valid(target) {
            return Err(StoreError::NoSuchElement(target));
        }
        let id = self.alloc(Record {
            tag,
            ends: Some((source, target)),
            content: None,
            out: Vec::new(),
            inc: Vec::new(),
        });
        // a self-loop shows up once per direction
        if let Some(r) = self.elements.get_mut(&source) {
            r.out.push(id);
        }
        if let Some(r) = self.elements.get_mut(&target) {
            r.inc.push(id);
        }
        Ok(id)
    }

    fn erase_element(&mut self, el: ElementId) -> StoreResult<()> {
        let record = self.elements.get(&el).ok_or(StoreError::NoSuchElement(el))?;
        // arcs hanging off the erased element go with it
        let mut incident: Vec<ElementId> = Vec::new();
        incident.extend(&record.out);
        incident.extend(&record.inc);
        for arc in incident {
            if arc != el && self.elements.contains_key(&arc) {
                self.erase_element(arc)?;
            }
        }
        let record = self
            .elements
            .remove(&el)
            .ok_or(StoreError::NoSuchElement(el))?;
        if let Some((source, target)) = record.ends {
            if let Some(r) = self.elements.get_mut(&source) {
                r.out.retain(|&a| a != el);
            }
            if let Some(r) = self.elements.get_mut(&target) {
                r.inc.retain(|&a| a != el);
            }
        }
        self.order.retain(|&e| e != el);
        Ok(())
    }

    fn link_content(&self, el: ElementId) -> StoreResult<Vec<u8>> {
        self.record(el)?
            .content
            .clone()
            .ok_or(StoreError::NotALink(el))
    }

    fn triples(&self, query: TripleQuery) -> Vec<Triple> {
        let candidates: Vec<ElementId> = match (query.source, query.target) {
            (Slot::Is(s), _) => self
                .elements
                .get(&s)
                .map(|r| r.out.clone())
                .unwrap_or_default(),
            (_, Slot::Is(t)) => self
                .elements
                .get(&t)
                .map(|r| r.inc.clone())
                .unwrap_or_default(),
            _ => self
                .order
                .iter()
                .copied()
                .filter(|e| self.elements[e].ends.is_some())
                .collect(),
        };
        let mut result = Vec::new();
        for arc in candidates {
            let Some((source, target)) = self.elements.get(&arc).and_then(|r| r.ends) else {
                continue;
            };
            if self.slot_matches(query.source, source)
                && self.slot_matches(query.arc, arc)
                && self.slot_matches(query.target, target)
            {
                result.push(Triple {
                    source,
                    arc,
                    target,
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_inspect() {
        let mut store = MemStore::new();
        let a = store.create_node(TypeTag::node()).unwrap();
        let b = store.create_node(TypeTag::node()).unwrap();
        let arc = store.create_arc(TypeTag::membership(), a, b).unwrap();
        assert!(store.is_valid(arc));
        assert_eq!(store.endpoints(arc).unwrap(), (a, b));
        assert_eq!(store.type_of(a).unwrap(), TypeTag::node());
        assert_eq!(
            store.endpoints(a),
            Err(StoreError::NotAnArc(a)),
        );
    }

    #[test]
    fn triples_by_source_in_creation_order() {
        let mut store = MemStore::new();
        let a = store.create_node(TypeTag::node()).unwrap();
        let b = store.create_node(TypeTag::node()).unwrap();
        let c = store.create_node(TypeTag::node()).unwrap();
        let ab = store.create_arc(TypeTag::membership(), a, b).unwrap();
        let ac = store.create_arc(TypeTag::membership(), a, c).unwrap();
        let found: Vec<_> = store
            .triples(TripleQuery::new(Slot::Is(a), Slot::Any, Slot::Any))
            .into_iter()
            .map(|t| t.arc)
            .collect();
        assert_eq!(found, vec![ab, ac]);
    }

    #[test]
    fn triples_tag_filter() {
        let mut store = MemStore::new();
        let a = store.create_node(TypeTag::node()).unwrap();
        let b = store.create_node(TypeTag::node()).unwrap();
        let _mem = store.create_arc(TypeTag::membership(), a, b).unwrap();
        let common = store.create_arc(TypeTag::common_arc(), a, b).unwrap();
        let found: Vec<_> = store
            .triples(TripleQuery::new(
                Slot::Is(a),
                Slot::Tagged(TypeTag::common_arc()),
                Slot::Any,
            ))
            .into_iter()
            .map(|t| t.arc)
            .collect();
        assert_eq!(found, vec![common]);
    }

    #[test]
    fn erase_cascades_to_incident_arcs() {
        let mut store = MemStore::new();
        let a = store.create_node(TypeTag::node()).unwrap();
        let b = store.create_node(TypeTag::node()).unwrap();
        let ab = store.create_arc(TypeTag::membership(), a, b).unwrap();
        // arc into an arc
        let c = store.create_node(TypeTag::node()).unwrap();
        let c_ab = store.create_arc(TypeTag::membership(), c, ab).unwrap();
        store.erase_element(b).unwrap();
        assert!(!store.is_valid(b));
        assert!(!store.is_valid(ab));
        assert!(!store.is_valid(c_ab));
        assert!(store.is_valid(a));
        assert!(store.is_valid(c));
        assert!(
            store
                .triples(TripleQuery::new(Slot::Is(c), Slot::Any, Slot::Any))
                .is_empty()
        );
    }

    #[test]
    fn self_loop_listed_in_both_directions() {
        let mut store = MemStore::new();
        let a = store.create_node(TypeTag::node()).unwrap();
        let aa = store.create_arc(TypeTag::membership(), a, a).unwrap();
        let out = store.triples(TripleQuery::new(Slot::Is(a), Slot::Any, Slot::Any));
        let inc = store.triples(TripleQuery::new(Slot::Any, Slot::Any, Slot::Is(a)));
        assert_eq!(out.len(), 1);
        assert_eq!(inc.len(), 1);
        assert_eq!(out[0].arc, aa);
        assert_eq!(inc[0].arc, aa);
    }
}
