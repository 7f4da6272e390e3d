//! Capability tagging for expression nodes.
//!
//! Every expression records the set of node kinds that occur anywhere in its
//! subtree. Passes declare the kinds they support, and the dispatch protocol
//! compares the two sets before any node is visited.

use std::fmt;

use itertools::Itertools;

/// The closed set of node kinds an expression tree can be built from.
///
/// The declaration order is the canonical order used for sorting operands and
/// for listing kinds in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Constant,
    Variable,
    Addition,
    Multiplication,
    Negation,
    Reciprocal,
}

impl NodeKind {
    /// All node kinds in canonical order.
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Constant,
        NodeKind::Variable,
        NodeKind::Addition,
        NodeKind::Multiplication,
        NodeKind::Negation,
        NodeKind::Reciprocal,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Constant => "Constant",
            NodeKind::Variable => "Variable",
            NodeKind::Addition => "Addition",
            NodeKind::Multiplication => "Multiplication",
            NodeKind::Negation => "Negation",
            NodeKind::Reciprocal => "Reciprocal",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A small copyable set of [`NodeKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u8);

impl KindSet {
    pub const fn empty() -> Self {
        KindSet(0)
    }

    /// The set of every node kind.
    pub fn all() -> Self {
        Self::from_kinds(&NodeKind::ALL)
    }

    pub fn single(kind: NodeKind) -> Self {
        KindSet(kind.bit())
    }

    pub fn from_kinds(kinds: &[NodeKind]) -> Self {
        kinds.iter().fold(KindSet::empty(), |set, kind| set.with(*kind))
    }

    /// Returns a copy of this set with `kind` added.
    pub fn with(self, kind: NodeKind) -> Self {
        KindSet(self.0 | kind.bit())
    }

    pub fn contains(self, kind: NodeKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn union(self, other: KindSet) -> Self {
        KindSet(self.0 | other.0)
    }

    /// Kinds in `self` that are not in `other`.
    pub fn difference(self, other: KindSet) -> Self {
        KindSet(self.0 & !other.0)
    }

    pub fn is_subset(self, other: KindSet) -> bool {
        self.difference(other).is_empty()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates the contained kinds in canonical order.
    pub fn iter(self) -> impl Iterator<Item = NodeKind> {
        NodeKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }
}

impl FromIterator<NodeKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = NodeKind>>(iter: I) -> Self {
        iter.into_iter().fold(KindSet::empty(), KindSet::with)
    }
}

impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        write!(f, "{{{}}}", self.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations() {
        let used = KindSet::from_kinds(&[
            NodeKind::Reciprocal,
            NodeKind::Constant,
            NodeKind::Variable,
        ]);
        let supported = KindSet::from_kinds(&[NodeKind::Constant, NodeKind::Variable]);

        assert!(supported.is_subset(used));
        assert!(!used.is_subset(supported));
        assert_eq!(
            used.difference(supported),
            KindSet::single(NodeKind::Reciprocal)
        );
        assert_eq!(used.len(), 3);
        assert!(KindSet::empty().is_subset(supported));
    }

    #[test]
    fn test_display_is_canonically_ordered() {
        let set: KindSet = [NodeKind::Negation, NodeKind::Addition, NodeKind::Constant]
            .into_iter()
            .collect();
        assert_eq!(set.to_string(), "{Constant, Addition, Negation}");
        assert_eq!(KindSet::empty().to_string(), "{}");
        assert_eq!(KindSet::all().len(), 6);
    }
}
