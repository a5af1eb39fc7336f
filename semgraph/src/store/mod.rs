//! Element handles, type tags, and the graph-store contract.
//!
//! The engine never owns storage. It sees the graph through [`GraphStore`]:
//! typed elements addressed by an opaque [`ElementId`], where arcs are
//! first-class elements whose endpoints may themselves be arcs.

use derive_more::From;
use thiserror::Error;

pub mod dot;
pub mod mem;

pub use mem::MemStore;

/// Opaque handle of a single store element (node, arc, or link).
///
/// Handles are plain identifiers. They carry no address information and must
/// never be produced by casting pointers.
#[derive(
    Hash,
    Eq,
    PartialEq,
    derive_more::Debug,
    Clone,
    Copy,
    PartialOrd,
    Ord,
    Default,
    derive_more::Add,
    derive_more::AddAssign,
    From,
)]
#[debug("E({_0})")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementId(pub u64);

/// Whether an element is concrete or a pattern variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Constness {
    Const,
    Var,
}

/// Semantic sub-tag of a node element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeRole {
    #[default]
    Generic,
    Tuple,
    Structure,
    Role,
    Relation,
    Class,
}

/// Whether a membership arc asserts, denies, or hedges membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Polarity {
    #[default]
    Positive,
    Negative,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Permanence {
    #[default]
    Permanent,
    Temporary,
}

/// Structural flavor of an arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArcFlavor {
    /// Set-membership arc, the connective patterns are built from.
    Membership {
        polarity: Polarity,
        permanence: Permanence,
    },
    /// Plain directed binary relation between two elements.
    Common,
}

/// Coarse element classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementKind {
    Node(NodeRole),
    /// Content-bearing leaf.
    Link,
    Arc(ArcFlavor),
}

/// Full type of an element: its structural kind crossed with constness.
///
/// The tag is a closed value resolved once per element; the engine never
/// re-derives modifier flags by comparing against well-known elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeTag {
    pub kind: ElementKind,
    pub constness: Constness,
}

impl TypeTag {
    pub const fn new(kind: ElementKind, constness: Constness) -> Self {
        TypeTag { kind, constness }
    }

    pub const fn node() -> Self {
        TypeTag::new(ElementKind::Node(NodeRole::Generic), Constness::Const)
    }

    pub const fn var_node() -> Self {
        TypeTag::new(ElementKind::Node(NodeRole::Generic), Constness::Var)
    }

    pub const fn link() -> Self {
        TypeTag::new(ElementKind::Link, Constness::Const)
    }

    pub const fn var_link() -> Self {
        TypeTag::new(ElementKind::Link, Constness::Var)
    }

    /// Constant positive permanent membership arc, the conventional
    /// pattern-structure relation.
    pub const fn membership() -> Self {
        TypeTag::new(
            ElementKind::Arc(ArcFlavor::Membership {
                polarity: Polarity::Positive,
                permanence: Permanence::Permanent,
            }),
            Constness::Const,
        )
    }

    pub const fn var_membership() -> Self {
        let mut tag = TypeTag::membership();
        tag.constness = Constness::Var;
        tag
    }

    pub const fn common_arc() -> Self {
        TypeTag::new(ElementKind::Arc(ArcFlavor::Common), Constness::Const)
    }

    pub const fn var_common_arc() -> Self {
        TypeTag::new(ElementKind::Arc(ArcFlavor::Common), Constness::Var)
    }

    pub fn with_role(mut self, role: NodeRole) -> Self {
        if let ElementKind::Node(_) = self.kind {
            self.kind = ElementKind::Node(role);
        }
        self
    }

    pub fn is_node(&self) -> bool {
        matches!(self.kind, ElementKind::Node(_))
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, ElementKind::Link)
    }

    pub fn is_arc(&self) -> bool {
        matches!(self.kind, ElementKind::Arc(_))
    }

    pub fn is_const(&self) -> bool {
        self.constness == Constness::Const
    }

    pub fn is_var(&self) -> bool {
        self.constness == Constness::Var
    }

    /// The same tag with the variable flag cleared. A concrete counterpart of
    /// a pattern variable carries exactly this tag.
    pub fn as_const(mut self) -> Self {
        self.constness = Constness::Const;
        self
    }

    /// Kind-level compatibility: node with node (roles are not compared),
    /// link with link, arc with arc of the same flavor.
    pub fn same_shape(&self, other: &TypeTag) -> bool {
        match (&self.kind, &other.kind) {
            (ElementKind::Node(_), ElementKind::Node(_)) => true,
            (ElementKind::Link, ElementKind::Link) => true,
            (ElementKind::Arc(a), ElementKind::Arc(b)) => a == b,
            _ => false,
        }
    }
}

/// One slot of a [`TripleQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Exactly this element.
    Is(ElementId),
    /// Any element carrying exactly this tag.
    Tagged(TypeTag),
    Any,
}

/// A partially specified `(source, arc, target)` probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripleQuery {
    pub source: Slot,
    pub arc: Slot,
    pub target: Slot,
}

impl TripleQuery {
    pub fn new(source: Slot, arc: Slot, target: Slot) -> Self {
        TripleQuery {
            source,
            arc,
            target,
        }
    }
}

/// A concrete `(source, arc, target)` connection reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triple {
    pub source: ElementId,
    pub arc: ElementId,
    pub target: ElementId,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("element {0:?} does not exist")]
    NoSuchElement(ElementId),
    #[error("element {0:?} is not an arc")]
    NotAnArc(ElementId),
    #[error("element {0:?} is not a link")]
    NotALink(ElementId),
    #[error("tag {0:?} cannot be used to create this kind of element")]
    BadCreateTag(TypeTag),
}

/// The storage contract the engine runs against.
///
/// Searching only reads; generation additionally creates elements and, on its
/// rollback path, erases elements it created itself. The engine never mutates
/// pre-existing elements.
pub trait GraphStore {
    fn is_valid(&self, el: ElementId) -> bool;

    fn type_of(&self, el: ElementId) -> StoreResult<TypeTag>;

    /// `(source, target)` of an arc. Fails on non-arc elements.
    fn endpoints(&self, arc: ElementId) -> StoreResult<(ElementId, ElementId)>;

    fn create_node(&mut self, tag: TypeTag) -> StoreResult<ElementId>;

    fn create_link(&mut self, tag: TypeTag, content: Vec<u8>) -> StoreResult<ElementId>;

    fn create_arc(
        &mut self,
        tag: TypeTag,
        source: ElementId,
        target: ElementId,
    ) -> StoreResult<ElementId>;

    fn erase_element(&mut self, el: ElementId) -> StoreResult<()>;

    fn link_content(&self, el: ElementId) -> StoreResult<Vec<u8>>;

    /// All connections matching the query, in the store's stable iteration
    /// order. Every combination of slots is legal; the engine always pins at
    /// least one slot.
    fn triples(&self, query: TripleQuery) -> Vec<Triple>;
}
