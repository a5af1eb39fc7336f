//! Optional naming layer for pattern variables.
//!
//! The engine is id-keyed end to end. Callers that track their operands by
//! name can register names here once and translate named seeds into engine
//! seed pairs, and engine results back into name-keyed maps. The engine
//! itself never sees a name.

use crate::binding::BindingMap;
use crate::interned_string_newtype;
use crate::store::ElementId;
use crate::util::InternString;
use crate::util::bimap::BiMap;
use crate::{EngineError, EngineResult};
use derive_more::{From, Into};
use error_stack::report;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, From, Into)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarName(InternString);
interned_string_newtype!(VarName);

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bidirectional registry of variable names for one pattern.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: BiMap<VarName, ElementId>,
}

impl NameTable {
    pub fn new() -> Self {
        NameTable::default()
    }

    pub fn register(&mut self, name: impl Into<VarName>, el: ElementId) {
        self.names.insert(name.into(), el);
    }

    pub fn element(&self, name: impl Into<VarName>) -> Option<ElementId> {
        self.names.get_left(&name.into()).copied()
    }

    pub fn name_of(&self, el: ElementId) -> Option<VarName> {
        self.names.get_right(&el).copied()
    }

    /// Translates a name-keyed seed into engine seed pairs, in the caller's
    /// order. Unknown names are an error: a silently dropped seed would turn
    /// a constrained search into an unconstrained one.
    pub fn seed(
        &self,
        named: &[(&str, ElementId)],
    ) -> EngineResult<Vec<(ElementId, ElementId)>> {
        let mut pairs = Vec::with_capacity(named.len());
        for &(name, concrete) in named {
            let var = VarName::from(name);
            let Some(pattern_el) = self.names.get_left(&var).copied() else {
                return Err(report!(EngineError::UnknownVariable(var)));
            };
            pairs.push((pattern_el, concrete));
        }
        Ok(pairs)
    }

    /// Re-keys a result map by name. Unnamed bindings are dropped.
    pub fn rekey(&self, map: &BindingMap) -> HashMap<VarName, ElementId> {
        map.iter()
            .filter_map(|(pattern_el, concrete)| {
                self.name_of(pattern_el).map(|name| (name, concrete))
            })
            .collect()
    }
}
