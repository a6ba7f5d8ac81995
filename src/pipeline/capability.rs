//! Capability tags for the node system.
//!
//! Each node type declares the capabilities it consumes (inputs) and the
//! capabilities it can produce (outputs). The tree uses these to validate
//! connections: a child may only hang under a parent whose outputs cover all
//! of the child's inputs.

use std::fmt;

/// The kind of data a node can produce or require.
///
/// Capabilities are compared by identity, never by payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Location of the underlying data source.
    Uri,
    /// An opened handle onto a container file.
    FileHandle,
    /// Row-major numeric table.
    Table,
    /// A single numeric series.
    Series,
    /// A set of selected sample indices.
    Selection,
    /// Summary statistics over a series.
    Statistics,
    /// Plugin-defined capability, identified by name.
    Custom(&'static str),
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Uri => "Uri",
            Capability::FileHandle => "FileHandle",
            Capability::Table => "Table",
            Capability::Series => "Series",
            Capability::Selection => "Selection",
            Capability::Statistics => "Statistics",
            Capability::Custom(name) => name,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Insertion-ordered, deduplicated set of capabilities.
///
/// Iteration follows declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    items: Vec<Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slice(caps: &[Capability]) -> Self {
        let mut set = Self::new();
        for &cap in caps {
            set.insert(cap);
        }
        set
    }

    /// Insert a capability. Returns `false` if it was already present.
    pub fn insert(&mut self, cap: Capability) -> bool {
        if self.contains(cap) {
            return false;
        }
        self.items.push(cap);
        true
    }

    #[inline]
    pub fn contains(&self, cap: Capability) -> bool {
        self.items.contains(&cap)
    }

    /// First capability of `self` (in declaration order) missing from `other`.
    pub fn first_missing_from(&self, other: &CapabilitySet) -> Option<Capability> {
        self.items.iter().copied().find(|cap| !other.contains(*cap))
    }

    pub fn is_subset_of(&self, other: &CapabilitySet) -> bool {
        self.first_missing_from(other).is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.items.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::new();
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.items.iter().map(|c| c.name()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
