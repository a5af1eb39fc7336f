//! The generation engine: stamps a concrete isomorphic copy of a pattern
//! into the store.
//!
//! Resolution is post-order and memoized through the binding map, so a
//! pattern element referenced from several places is allocated exactly once.
//! Generation is atomic: if any allocation fails, everything created so far
//! is erased before the error surfaces.

use crate::binding::BindingMap;
use crate::pattern::{Pattern, PatternIndex};
use crate::store::{ElementId, ElementKind, GraphStore};
use crate::util::log;
use crate::{EngineError, EngineResult};
use error_stack::{Report, report};
use std::collections::HashSet;

/// Produces a binding map covering every pattern member, allocating fresh
/// concrete elements for unbound variables and materializing every arc.
pub fn generate<S: GraphStore>(
    store: &mut S,
    pattern: &Pattern,
    seed: &[(ElementId, ElementId)],
) -> EngineResult<BindingMap> {
    let index = PatternIndex::build(&*store, pattern);

    let mut map = BindingMap::new();
    for &(pe, ce) in seed {
        if !index.is_empty() {
            let Some(tag) = index.tag(pe) else {
                return Err(report!(EngineError::InvalidSeed(pe)));
            };
            if tag.is_const() || tag.is_arc() {
                return Err(report!(EngineError::InvalidSeed(pe)));
            }
        }
        if !store.is_valid(ce) {
            return Err(report!(EngineError::InvalidSeed(pe)));
        }
        map.insert(pe, ce);
    }
    // no members: the trivial anchor mapping
    if index.is_empty() {
        return Ok(map);
    }

    // constants stand for themselves and are never re-allocated
    for &member in index.member_order() {
        if index.tag(member).is_some_and(|t| t.is_const()) && !map.contains(member) {
            map.insert(member, member);
        }
    }

    let mut generator = Generator {
        store,
        index: &index,
        created: Vec::new(),
    };
    for &member in index.member_order() {
        if let Err(err) = generator.resolve(member, &mut map) {
            generator.rollback();
            return Err(err);
        }
    }
    log::debug!(
        "generated {} element(s) for pattern {:?}",
        generator.created.len(),
        pattern.root
    );
    Ok(map)
}

/// Like [`generate`], but the returned map only surfaces the pattern
/// elements in `keep`. Everything is still created in the store.
pub fn generate_filtered<S: GraphStore>(
    store: &mut S,
    pattern: &Pattern,
    seed: &[(ElementId, ElementId)],
    keep: &HashSet<ElementId>,
) -> EngineResult<BindingMap> {
    let mut map = generate(store, pattern, seed)?;
    map.restrict_to(keep);
    Ok(map)
}

struct Generator<'a, S: GraphStore> {
    store: &'a mut S,
    index: &'a PatternIndex,
    created: Vec<ElementId>,
}

impl<S: GraphStore> Generator<'_, S> {
    fn resolve(&mut self, pe: ElementId, map: &mut BindingMap) -> EngineResult<ElementId> {
        if let Some(concrete) = map.get(pe) {
            return Ok(concrete);
        }
        let tag = self
            .index
            .tag(pe)
            .ok_or_else(|| report!(EngineError::Store(pe)))?;
        let concrete = match tag.kind {
            ElementKind::Node(_) => self.create(pe, |s, t| s.create_node(t))?,
            ElementKind::Link => self.create(pe, |s, t| s.create_link(t, Vec::new()))?,
            ElementKind::Arc(_) => {
                let (src, tgt) = self
                    .store
                    .endpoints(pe)
                    .map_err(|e| Report::new(e).change_context(EngineError::Store(pe)))?;
                // endpoints outside the pattern pass through unchanged
                let concrete_src = if self.index.contains(src) {
                    self.resolve(src, map)?
                } else {
                    src
                };
                let concrete_tgt = if self.index.contains(tgt) {
                    self.resolve(tgt, map)?
                } else {
                    tgt
                };
                self.create(pe, |s, t| s.create_arc(t, concrete_src, concrete_tgt))?
            }
        };
        map.insert(pe, concrete);
        Ok(concrete)
    }

    fn create(
        &mut self,
        pe: ElementId,
        alloc: impl FnOnce(&mut S, crate::store::TypeTag) -> crate::store::StoreResult<ElementId>,
    ) -> EngineResult<ElementId> {
        let tag = self
            .index
            .tag(pe)
            .ok_or_else(|| report!(EngineError::Store(pe)))?;
        match alloc(self.store, tag.as_const()) {
            Ok(id) => {
                self.created.push(id);
                Ok(id)
            }
            Err(err) => Err(Report::new(err).change_context(EngineError::Allocation)),
        }
    }

    /// Erases everything this call created, newest first so no element is
    /// erased before its dependents.
    fn rollback(&mut self) {
        for el in self.created.drain(..).rev() {
            if let Err(err) = self.store.erase_element(el) {
                log::warn!("rollback failed to erase {el:?}: {err}");
            }
        }
    }
}
