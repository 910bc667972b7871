use serde::{Deserialize, Serialize};

use crate::fragment::Fragment;

/// Stereo parity of a node or connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    pub(crate) fn code(self) -> u8 {
        match self {
            Parity::None => 0,
            Parity::Odd => 1,
            Parity::Even => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FragmentClass {
    #[default]
    Molecule,
    SubGroup,
    Other,
}

/// A nested structure carried by a fragment-valued node.
///
/// External connectors attach to the owning node; after flattening they are
/// rewired onto `anchor`, a node of the nested structure. Without an anchor
/// the group has no attachment point and external connectors are dropped by
/// the flattener.
#[derive(Debug, Clone)]
pub struct NestedStructure {
    pub structure: Box<Fragment>,
    pub anchor: Option<crate::fragment::NodeId>,
}

impl NestedStructure {
    pub fn new(structure: Fragment, anchor: Option<crate::fragment::NodeId>) -> Self {
        Self {
            structure: Box::new(structure),
            anchor,
        }
    }
}

/// The closed set of node kinds.
///
/// Comparison and matching dispatch on this enum instead of inspecting
/// runtime types.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Atom { atomic_number: u8, mass_number: u16 },
    Pseudoatom { symbol: String },
    /// An atom list (`[N,O,S]`). Candidates are atomic numbers.
    VariableAtom { candidates: Vec<u8> },
    UnspecifiedAtom,
    SubGroup(NestedStructure),
    Molecule(NestedStructure),
    Other,
}

/// Tag identifying the kind of a node without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeTag {
    Atom,
    Pseudoatom,
    VariableAtom,
    UnspecifiedAtom,
    SubGroup,
    Molecule,
    Other,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub charge: i8,
    pub parity: Parity,
    /// Implicit (suppressed) hydrogens. Explicit hydrogen atoms linked to the
    /// node are counted separately by [`Fragment::hydrogen_count`].
    pub hydrogen_count: u8,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            charge: 0,
            parity: Parity::None,
            hydrogen_count: 0,
        }
    }

    /// An atom of the given element at natural abundance.
    ///
    /// ```
    /// use molperceive::Node;
    ///
    /// let carbon = Node::atom(6).with_hydrogens(3);
    /// assert_eq!(carbon.atomic_number(), Some(6));
    /// assert_eq!(carbon.hydrogen_count, 3);
    /// ```
    pub fn atom(atomic_number: u8) -> Self {
        Self::new(NodeKind::Atom {
            atomic_number,
            mass_number: 0,
        })
    }

    pub fn isotope(atomic_number: u8, mass_number: u16) -> Self {
        Self::new(NodeKind::Atom {
            atomic_number,
            mass_number,
        })
    }

    pub fn pseudoatom(symbol: impl Into<String>) -> Self {
        Self::new(NodeKind::Pseudoatom {
            symbol: symbol.into(),
        })
    }

    pub fn sub_group(structure: Fragment, anchor: Option<crate::fragment::NodeId>) -> Self {
        Self::new(NodeKind::SubGroup(NestedStructure::new(structure, anchor)))
    }

    pub fn with_charge(mut self, charge: i8) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_hydrogens(mut self, count: u8) -> Self {
        self.hydrogen_count = count;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn tag(&self) -> NodeTag {
        match self.kind {
            NodeKind::Atom { .. } => NodeTag::Atom,
            NodeKind::Pseudoatom { .. } => NodeTag::Pseudoatom,
            NodeKind::VariableAtom { .. } => NodeTag::VariableAtom,
            NodeKind::UnspecifiedAtom => NodeTag::UnspecifiedAtom,
            NodeKind::SubGroup(_) => NodeTag::SubGroup,
            NodeKind::Molecule(_) => NodeTag::Molecule,
            NodeKind::Other => NodeTag::Other,
        }
    }

    pub fn atomic_number(&self) -> Option<u8> {
        match self.kind {
            NodeKind::Atom { atomic_number, .. } => Some(atomic_number),
            _ => None,
        }
    }

    pub fn mass_number(&self) -> Option<u16> {
        match self.kind {
            NodeKind::Atom { mass_number, .. } if mass_number > 0 => Some(mass_number),
            _ => None,
        }
    }

    pub fn is_hydrogen(&self) -> bool {
        self.atomic_number() == Some(1)
    }

    pub fn nested(&self) -> Option<&NestedStructure> {
        match &self.kind {
            NodeKind::SubGroup(n) | NodeKind::Molecule(n) => Some(n),
            _ => None,
        }
    }
}
