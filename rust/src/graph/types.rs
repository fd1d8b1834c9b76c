//! Identifiers and small value types shared by the graph model.

use std::fmt;

use super::dfg::GraphError;

/// Maximum number of replication dimensions a node may declare.
pub const MAX_DIMENSIONS: usize = 3;

/// Stable handle of a node in the graph arena.
///
/// Node IDs are assigned sequentially and never reused within a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of the node in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw numeric identifier (used by the Python bindings).
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Stable handle of an edge in the graph arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Opaque reference to the function a node was extracted from.
///
/// The graph never dereferences it; it only travels with the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionRef(pub u64);

/// Trip count of one replication dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DimLimit {
    /// Statically known number of instances.
    Constant(u64),
    /// Instance count only known at run time.
    NotConstant,
}

impl DimLimit {
    pub fn as_constant(self) -> Option<u64> {
        match self {
            DimLimit::Constant(n) => Some(n),
            DimLimit::NotConstant => None,
        }
    }
}

impl From<Option<u64>> for DimLimit {
    fn from(value: Option<u64>) -> Self {
        value.map_or(DimLimit::NotConstant, DimLimit::Constant)
    }
}

/// Replication dimensions of a node.
///
/// The limit sequence always has exactly `count()` entries and at most
/// [`MAX_DIMENSIONS`] of them; both are checked on construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dimensions {
    limits: Vec<DimLimit>,
}

impl Dimensions {
    /// A node that is not replicated.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build dimensions from a declared count and its limits.
    pub fn new(count: usize, limits: Vec<DimLimit>) -> Result<Self, GraphError> {
        if count > MAX_DIMENSIONS || limits.len() != count {
            return Err(GraphError::InvalidDimensions {
                count,
                limits: limits.len(),
            });
        }
        Ok(Self { limits })
    }

    /// Build dimensions whose count is the number of limits given.
    pub fn from_limits(limits: Vec<DimLimit>) -> Result<Self, GraphError> {
        Self::new(limits.len(), limits)
    }

    pub fn count(&self) -> usize {
        self.limits.len()
    }

    pub fn limits(&self) -> &[DimLimit] {
        &self.limits
    }

    pub fn is_replicated(&self) -> bool {
        !self.limits.is_empty()
    }
}

/// Execution backend a node is hinted at or was tagged for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Target {
    #[default]
    None,
    Cpu,
    Gpu,
    Accelerator,
}

/// Replica connection discipline of an edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Replica `i` of the source feeds replica `i` of the destination.
    #[default]
    OneToOne,
    /// Every source replica feeds every destination replica.
    /// One-to-many is the special case of a single source replica.
    AllToAll,
}
