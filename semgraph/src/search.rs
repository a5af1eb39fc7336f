//! The isomorphism search engine.
//!
//! A single recursive transition drives every search mode. One state is
//! `(pattern element, concrete element, hypothesis, working set)`: the engine
//! expands the frontier of pattern arcs incident to the pattern element that
//! the working set still owes, branching once per candidate concrete arc.
//! Hypotheses are cloned on every branch; a map visible to a sibling branch
//! is never mutated. The working set is restored before a branch returns, so
//! sibling candidates always start from the same obligations.

use crate::binding::{BindingMap, WorkingSet, dedup_maps, sort_by_size_desc};
use crate::pattern::{Pattern, PatternIndex};
use crate::store::{ElementId, GraphStore, Slot, TripleQuery, TypeTag};
use crate::util::log;
use crate::{EngineError, EngineResult};
use error_stack::report;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation handle. Clone it, hand one clone to the caller,
/// and the search aborts with [`EngineError::Cancelled`] at the next
/// recursion entry after `cancel()` is called.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Keep the largest matches found, complete or not.
    #[default]
    BestEffort,
    /// Accept only matches that bind every pattern variable.
    FullOnly,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub cancel: Option<CancelToken>,
}

/// Best-effort search: all maximal matches, partial ones included.
pub fn search<S: GraphStore>(
    store: &S,
    pattern: &Pattern,
    seed: &[(ElementId, ElementId)],
) -> EngineResult<Vec<BindingMap>> {
    search_with(store, pattern, seed, &SearchOptions::default())
}

/// Search accepting only matches that bind every pattern variable.
pub fn search_full_only<S: GraphStore>(
    store: &S,
    pattern: &Pattern,
    seed: &[(ElementId, ElementId)],
) -> EngineResult<Vec<BindingMap>> {
    search_with(
        store,
        pattern,
        seed,
        &SearchOptions {
            mode: SearchMode::FullOnly,
            cancel: None,
        },
    )
}

/// Does at least one complete match exist?
pub fn search_exists<S: GraphStore>(
    store: &S,
    pattern: &Pattern,
    seed: &[(ElementId, ElementId)],
) -> EngineResult<bool> {
    Ok(!search_full_only(store, pattern, seed)?.is_empty())
}

pub fn search_with<S: GraphStore>(
    store: &S,
    pattern: &Pattern,
    seed: &[(ElementId, ElementId)],
    options: &SearchOptions,
) -> EngineResult<Vec<BindingMap>> {
    let index = PatternIndex::build(store, pattern);
    let (start_pe, start_ce) = resolve_anchor(&index, seed)?;
    if !store.is_valid(start_ce) {
        return Err(report!(EngineError::AnchorUnreadable(start_ce)));
    }
    log::trace!(
        "search of pattern {:?}: {} members, {} variables, anchor {start_pe:?} -> {start_ce:?}",
        pattern.root,
        index.member_order().len(),
        index.var_count()
    );

    let input = BindingMap::from_pairs(seed.iter().copied());
    let seed_len = input.len();
    let mut working = index.working_set();
    working.remove(start_pe);

    let searcher = Searcher {
        store,
        index: &index,
        cancel: options.cancel.as_ref(),
    };
    let mut results = searcher.recurse(start_pe, start_ce, input, &mut working)?;

    sort_by_size_desc(&mut results);
    match options.mode {
        SearchMode::BestEffort => {
            // a hypothesis that never grew past the seed matched nothing
            results.retain(|m| m.len() > seed_len);
            if let Some(max) = results.first().map(BindingMap::len) {
                results.retain(|m| m.len() == max);
            }
        }
        SearchMode::FullOnly => {
            let need = index.var_count();
            results.retain(|m| m.len() >= need);
        }
    }
    log::debug!(
        "search of pattern {:?} produced {} result(s)",
        pattern.root,
        results.len()
    );
    Ok(results)
}

/// The anchor is the constant element embedded in the pattern, or failing
/// that the first caller-supplied seed pair (in the caller's order, so the
/// fallback is deterministic).
fn resolve_anchor(
    index: &PatternIndex,
    seed: &[(ElementId, ElementId)],
) -> EngineResult<(ElementId, ElementId)> {
    if let Some(anchor) = index.first_const_member() {
        return Ok((anchor, anchor));
    }
    match seed.first() {
        Some(&(pe, ce)) => Ok((pe, ce)),
        None => Err(report!(EngineError::NoAnchor)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Out,
    In,
}

/// One pattern arc the current state owes, classified against the state's
/// entry hypothesis: which side of it is already pinned to a concrete
/// element, and what that pin requires of every candidate.
#[derive(Debug, Clone, Copy)]
struct Obligation {
    pa: ElementId,
    pa_tag: TypeTag,
    dir: Dir,
    far: ElementId,
    far_tag: TypeTag,
    /// Endpoints of an arc-valued far element; both are pattern members.
    far_ends: Option<(ElementId, ElementId)>,
    /// Concrete counterpart of `pa` fixed by the entry hypothesis.
    arc_fixed: Option<ElementId>,
    /// Far element pinned (constant, or bound before this state started).
    far_known: bool,
    far_required: Option<ElementId>,
    begin_known: bool,
    begin_required: Option<ElementId>,
    end_known: bool,
    end_required: Option<ElementId>,
}

struct Searcher<'a, S: GraphStore> {
    store: &'a S,
    index: &'a PatternIndex,
    cancel: Option<&'a CancelToken>,
}

impl<S: GraphStore> Searcher<'_, S> {
    /// Expands one state. Returns every hypothesis alive after all pattern
    /// arcs incident to `pe` were either crossed or found uncrossable: the
    /// entry map if nothing applied, plus every extension, minus maps
    /// superseded by their own extensions.
    fn recurse(
        &self,
        pe: ElementId,
        ce: ElementId,
        input: BindingMap,
        working: &mut WorkingSet,
    ) -> EngineResult<Vec<BindingMap>> {
        if let Some(token) = self.cancel {
            if token.is_cancelled() {
                return Err(report!(EngineError::Cancelled));
            }
        }
        let snapshot = input.clone();
        let mut live = vec![input];

        for (pa, dir) in self.pending_incident_arcs(pe, working) {
            let Some(ob) = self.classify(pa, dir, &snapshot) else {
                continue;
            };

            let mut spawned: Vec<BindingMap> = Vec::new();
            let mut consumed = vec![false; live.len()];

            for ca in self.candidates(&ob, ce) {
                // the candidate's actual far element and, for arc-valued far
                // elements, its actual endpoints
                let Ok((cs, ct)) = self.store.endpoints(ca) else {
                    continue;
                };
                let far_c = match ob.dir {
                    Dir::Out => ct,
                    Dir::In => cs,
                };
                if let Some(required) = ob.far_required {
                    if far_c != required {
                        continue;
                    }
                }
                let Ok(far_c_tag) = self.store.type_of(far_c) else {
                    continue;
                };
                if !far_c_tag.same_shape(&ob.far_tag) {
                    continue;
                }
                let far_c_ends = if ob.far_ends.is_some() {
                    let Ok(ends) = self.store.endpoints(far_c) else {
                        continue;
                    };
                    if ob.begin_known && ob.begin_required != Some(ends.0) {
                        continue;
                    }
                    if ob.end_known && ob.end_required != Some(ends.1) {
                        continue;
                    }
                    Some(ends)
                } else {
                    None
                };

                for k in 0..live.len() {
                    let Some((derived, rebind)) =
                        self.derive(&ob, ca, far_c, far_c_ends, &live[k], &snapshot)
                    else {
                        continue;
                    };

                    // transactional descent: everything removed here is put
                    // back before the next candidate runs
                    let mut removed = Vec::new();
                    for el in [
                        Some(ob.pa),
                        Some(ob.far),
                        ob.far_ends.map(|(b, _)| b),
                        ob.far_ends.map(|(_, e)| e),
                    ]
                    .into_iter()
                    .flatten()
                    {
                        if working.remove(el) {
                            removed.push(el);
                        }
                    }
                    let outcome = self.descend(&ob, ca, far_c, far_c_ends, derived, working);
                    for el in removed {
                        working.reinsert(el);
                    }
                    spawned.extend(outcome?);
                    if !rebind {
                        consumed[k] = true;
                    }
                }
            }

            // extended hypotheses supersede the map they grew from; untouched
            // maps stay live for the remaining pattern arcs
            let mut next_live = Vec::with_capacity(live.len() + spawned.len());
            for (k, map) in live.into_iter().enumerate() {
                if !consumed[k] {
                    next_live.push(map);
                }
            }
            next_live.extend(spawned);
            live = next_live;
        }

        dedup_maps(&mut live);
        Ok(live)
    }

    /// Pattern arcs incident to `pe` that the working set still owes.
    /// Outgoing arcs first; incoming arcs skip the pattern root as a source
    /// so the walk never re-ascends out of the pattern.
    fn pending_incident_arcs(&self, pe: ElementId, working: &WorkingSet) -> Vec<(ElementId, Dir)> {
        let mut arcs = Vec::new();
        for t in self
            .store
            .triples(TripleQuery::new(Slot::Is(pe), Slot::Any, Slot::Any))
        {
            if working.contains(t.arc) {
                arcs.push((t.arc, Dir::Out));
            }
        }
        for t in self
            .store
            .triples(TripleQuery::new(Slot::Any, Slot::Any, Slot::Is(pe)))
        {
            if t.source == self.index.root() {
                continue;
            }
            if working.contains(t.arc) {
                arcs.push((t.arc, Dir::In));
            }
        }
        arcs
    }

    /// Classifies one pattern arc against the entry hypothesis. `None` means
    /// the arc cannot be crossed from this state at all (not pattern
    /// structure, constant, contradicting a pin, or unreadable).
    fn classify(&self, pa: ElementId, dir: Dir, snapshot: &BindingMap) -> Option<Obligation> {
        let pa_tag = self.index.tag(pa)?;
        if pa_tag.is_const() {
            return None;
        }
        let (pa_src, pa_tgt) = self.store.endpoints(pa).ok()?;
        let far = match dir {
            Dir::Out => pa_tgt,
            Dir::In => pa_src,
        };
        let far_tag = self.index.tag(far)?;
        let far_ends = if far_tag.is_arc() {
            let (b, e) = self.store.endpoints(far).ok()?;
            if !self.index.contains(b) || !self.index.contains(e) {
                return None;
            }
            Some((b, e))
        } else {
            None
        };

        let arc_fixed = snapshot.get(pa);
        let mut far_required = None;
        if let Some(ca) = arc_fixed {
            let (s, t) = self.store.endpoints(ca).ok()?;
            far_required = Some(match dir {
                Dir::Out => t,
                Dir::In => s,
            });
        }
        let mut far_known = false;
        if far_tag.is_const() {
            match far_required {
                Some(required) if required != far => return None,
                None => far_required = Some(far),
                _ => {}
            }
            far_known = true;
        } else if let Some(bound) = snapshot.get(far) {
            match far_required {
                Some(required) if required != bound => return None,
                None => far_required = Some(bound),
                _ => {}
            }
            far_known = true;
        }

        let mut begin_known = false;
        let mut begin_required = None;
        let mut end_known = false;
        let mut end_required = None;
        if let Some((pb, pe_end)) = far_ends {
            let pb_tag = self.index.tag(pb)?;
            let pe_tag = self.index.tag(pe_end)?;
            let (mut cb, mut ce) = (None, None);
            if let Some(concrete_far) = far_required {
                let (b, e) = self.store.endpoints(concrete_far).ok()?;
                cb = Some(b);
                ce = Some(e);
            }
            (begin_known, begin_required) = endpoint_requirement(pb, pb_tag, cb, snapshot)?;
            (end_known, end_required) = endpoint_requirement(pe_end, pe_tag, ce, snapshot)?;
        }

        Some(Obligation {
            pa,
            pa_tag,
            dir,
            far,
            far_tag,
            far_ends,
            arc_fixed,
            far_known,
            far_required,
            begin_known,
            begin_required,
            end_known,
            end_required,
        })
    }

    /// Concrete arcs that could stand in for the obligation's pattern arc:
    /// the pinned arc if there is one, otherwise every store arc of the
    /// matching constant type leaving (or entering) `ce` in the obligation's
    /// direction.
    fn candidates(&self, ob: &Obligation, ce: ElementId) -> Vec<ElementId> {
        if let Some(ca) = ob.arc_fixed {
            return vec![ca];
        }
        let want = Slot::Tagged(ob.pa_tag.as_const());
        let far_slot = ob.far_required.map(Slot::Is).unwrap_or(Slot::Any);
        let query = match ob.dir {
            Dir::Out => TripleQuery::new(Slot::Is(ce), want, far_slot),
            Dir::In => TripleQuery::new(far_slot, want, Slot::Is(ce)),
        };
        let mut found = Vec::new();
        for t in self.store.triples(query) {
            if ob.dir == Dir::In && t.source == self.index.root() {
                continue;
            }
            found.push(t.arc);
        }
        found
    }

    /// Tries to extend one hypothesis with one candidate. Returns the
    /// extended clone and whether this was a re-binding (a re-binding leaves
    /// the base hypothesis alive; a plain extension supersedes it).
    fn derive(
        &self,
        ob: &Obligation,
        ca: ElementId,
        far_c: ElementId,
        far_c_ends: Option<(ElementId, ElementId)>,
        base: &BindingMap,
        snapshot: &BindingMap,
    ) -> Option<(BindingMap, bool)> {
        let mut rebind = false;
        let mut derived;
        if ob.arc_fixed.is_none() {
            // the candidate arc must be fresh for this hypothesis
            if base.pattern_for(ca).is_some() {
                return None;
            }
            if !ob.far_known {
                if let Some(p) = base.pattern_for(far_c) {
                    if p != ob.far {
                        return None;
                    }
                }
            }
            if let (Some((pb, pe_end)), Some((cb, ce))) = (ob.far_ends, far_c_ends) {
                if !ob.begin_known {
                    if let Some(p) = base.pattern_for(cb) {
                        if p != pb {
                            return None;
                        }
                    }
                }
                if !ob.end_known {
                    if let Some(p) = base.pattern_for(ce) {
                        if p != pe_end {
                            return None;
                        }
                    }
                }
            }
            if base.contains(ob.pa) {
                // this hypothesis already crossed `pa` on an earlier branch;
                // re-binding is only sound if no sibling arc of the far
                // element was fixed during this state
                if !self.check_coherence(ob.far, ob.pa, ob.dir, base, snapshot) {
                    return None;
                }
                rebind = true;
                derived = base.clone();
                derived.remove(ob.pa);
                if !ob.far_known {
                    derived.remove(ob.far);
                }
                if let Some((pb, pe_end)) = ob.far_ends {
                    if !ob.begin_known {
                        derived.remove(pb);
                    }
                    if !ob.end_known {
                        derived.remove(pe_end);
                    }
                }
            } else {
                if !ob.far_known {
                    if let Some(v) = base.get(ob.far) {
                        if v != far_c {
                            return None;
                        }
                    }
                }
                if let (Some((pb, pe_end)), Some((cb, ce))) = (ob.far_ends, far_c_ends) {
                    if !ob.begin_known {
                        if let Some(v) = base.get(pb) {
                            if v != cb {
                                return None;
                            }
                        }
                    }
                    if !ob.end_known {
                        if let Some(v) = base.get(pe_end) {
                            if v != ce {
                                return None;
                            }
                        }
                    }
                }
                derived = base.clone();
            }
            derived.insert(ob.pa, ca);
        } else {
            // the arc came pinned from the caller: only verify agreement
            if let Some(p) = base.pattern_for(ca) {
                if p != ob.pa {
                    return None;
                }
            }
            if let Some(v) = base.get(ob.pa) {
                if v != ca {
                    return None;
                }
            }
            if !ob.far_known {
                if let Some(p) = base.pattern_for(far_c) {
                    if p != ob.far {
                        return None;
                    }
                }
                if let Some(v) = base.get(ob.far) {
                    if v != far_c {
                        return None;
                    }
                }
            }
            if let (Some((pb, pe_end)), Some((cb, ce))) = (ob.far_ends, far_c_ends) {
                if !ob.begin_known {
                    if let Some(p) = base.pattern_for(cb) {
                        if p != pb {
                            return None;
                        }
                    }
                    if let Some(v) = base.get(pb) {
                        if v != cb {
                            return None;
                        }
                    }
                }
                if !ob.end_known {
                    if let Some(p) = base.pattern_for(ce) {
                        if p != pe_end {
                            return None;
                        }
                    }
                    if let Some(v) = base.get(pe_end) {
                        if v != ce {
                            return None;
                        }
                    }
                }
            }
            derived = base.clone();
        }

        if !ob.far_known {
            derived.insert(ob.far, far_c);
        }
        if let (Some((pb, pe_end)), Some((cb, ce))) = (ob.far_ends, far_c_ends) {
            if !ob.begin_known {
                derived.insert(pb, cb);
            }
            if !ob.end_known {
                derived.insert(pe_end, ce);
            }
        }
        Some((derived, rebind))
    }

    /// Continues the walk across a committed branch: first from the arc
    /// itself (arcs can carry their own incident pattern arcs), then from the
    /// far element, then (for an arc-valued far element) from each of its
    /// endpoints, threading the surviving hypotheses through every step.
    fn descend(
        &self,
        ob: &Obligation,
        ca: ElementId,
        far_c: ElementId,
        far_c_ends: Option<(ElementId, ElementId)>,
        first: BindingMap,
        working: &mut WorkingSet,
    ) -> EngineResult<Vec<BindingMap>> {
        let maps = self.recurse(ob.pa, ca, first, working)?;
        let mut out = Vec::new();
        for map in maps {
            out.extend(self.recurse(ob.far, far_c, map, working)?);
        }
        if let (Some((pb, pe_end)), Some((cb, ce))) = (ob.far_ends, far_c_ends) {
            let mut mid = Vec::new();
            for map in out {
                mid.extend(self.recurse(pb, cb, map, working)?);
            }
            out = Vec::new();
            for map in mid {
                out.extend(self.recurse(pe_end, ce, map, working)?);
            }
        }
        Ok(out)
    }

    /// Re-binding `element` (the far element of `checked`) must not
    /// contradict sibling pattern arcs of `element` that were bound during
    /// the current state: a binding present in `result` but absent from the
    /// state's entry hypothesis pins `element` down. For an arc-valued
    /// element the check extends to both of its endpoints.
    fn check_coherence(
        &self,
        element: ElementId,
        checked: ElementId,
        dir: Dir,
        result: &BindingMap,
        snapshot: &BindingMap,
    ) -> bool {
        // `checked` crossed into `element`, so it is an outgoing arc of
        // `element` exactly when it was incoming at the state's element
        let checked_is_out = dir == Dir::In;
        for t in self
            .store
            .triples(TripleQuery::new(Slot::Is(element), Slot::Any, Slot::Any))
        {
            if !self.index.contains(t.arc) {
                continue;
            }
            if checked_is_out && t.arc == checked {
                continue;
            }
            if result.contains(t.arc) && !snapshot.contains(t.arc) {
                return false;
            }
        }
        for t in self
            .store
            .triples(TripleQuery::new(Slot::Any, Slot::Any, Slot::Is(element)))
        {
            if t.source == self.index.root() {
                continue;
            }
            if !self.index.contains(t.arc) {
                continue;
            }
            if !checked_is_out && t.arc == checked {
                continue;
            }
            if result.contains(t.arc) && !snapshot.contains(t.arc) {
                return false;
            }
        }
        let tag = self
            .index
            .tag(element)
            .or_else(|| self.store.type_of(element).ok());
        if let Some(tag) = tag {
            if tag.is_arc() {
                let Ok((begin, end)) = self.store.endpoints(element) else {
                    return false;
                };
                return self.check_coherence(begin, element, Dir::In, result, snapshot)
                    && self.check_coherence(end, element, Dir::Out, result, snapshot);
            }
        }
        true
    }
}

/// Works out what a pinned far arc's endpoint demands of candidates: `known`
/// when the endpoint is constant or already bound, together with the concrete
/// element it must equal. `None` drops the whole pattern arc as
/// contradictory.
fn endpoint_requirement(
    p_end: ElementId,
    tag: TypeTag,
    concrete: Option<ElementId>,
    snapshot: &BindingMap,
) -> Option<(bool, Option<ElementId>)> {
    if tag.is_const() {
        match concrete {
            Some(c) if c != p_end => None,
            Some(c) => Some((true, Some(c))),
            None => Some((true, Some(p_end))),
        }
    } else if let Some(bound) = snapshot.get(p_end) {
        match concrete {
            Some(c) if c != bound => None,
            Some(c) => Some((true, Some(c))),
            None => Some((true, Some(bound))),
        }
    } else {
        Some((false, None))
    }
}
