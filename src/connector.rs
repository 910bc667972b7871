use serde::{Deserialize, Serialize};

use crate::node::Parity;

/// Chemical nature of a bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondType {
    #[default]
    Covalent,
    Ionic,
    Coordinate,
    Metallic,
    Hydrogen,
    /// Anything the producer could not classify.
    Unknown,
}

impl BondType {
    pub(crate) fn code(self) -> u8 {
        match self {
            BondType::Covalent => 1,
            BondType::Ionic => 2,
            BondType::Coordinate => 3,
            BondType::Metallic => 4,
            BondType::Hydrogen => 9,
            BondType::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BondOrder {
    Unset,
    #[default]
    Single,
    Double,
    Triple,
    Quad,
    Aromatic,
}

impl BondOrder {
    /// Number of bonding electrons, `3` for aromatic bonds and `0` when unset.
    pub fn electron_count(self) -> u8 {
        match self {
            BondOrder::Unset => 0,
            BondOrder::Single => 2,
            BondOrder::Double => 4,
            BondOrder::Triple => 6,
            BondOrder::Quad => 8,
            BondOrder::Aromatic => 3,
        }
    }
}

/// Class of a connector. Only bonds carry a bond type and order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorClass {
    Bond,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorKind {
    Bond { bond_type: BondType, order: BondOrder },
    Other,
}

/// A structure connector.
///
/// The objects it joins are held by the owning [`Fragment`](crate::Fragment);
/// a connector may join more than two objects (multi-center bonds) and may
/// join other connectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub kind: ConnectorKind,
    pub parity: Parity,
}

impl Connector {
    pub fn bond(order: BondOrder) -> Self {
        Self {
            kind: ConnectorKind::Bond {
                bond_type: BondType::Covalent,
                order,
            },
            parity: Parity::None,
        }
    }

    pub fn typed_bond(bond_type: BondType, order: BondOrder) -> Self {
        Self {
            kind: ConnectorKind::Bond { bond_type, order },
            parity: Parity::None,
        }
    }

    pub fn other() -> Self {
        Self {
            kind: ConnectorKind::Other,
            parity: Parity::None,
        }
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn class(&self) -> ConnectorClass {
        match self.kind {
            ConnectorKind::Bond { .. } => ConnectorClass::Bond,
            ConnectorKind::Other => ConnectorClass::Other,
        }
    }

    pub fn bond_type(&self) -> Option<BondType> {
        match self.kind {
            ConnectorKind::Bond { bond_type, .. } => Some(bond_type),
            ConnectorKind::Other => None,
        }
    }

    pub fn bond_order(&self) -> Option<BondOrder> {
        match self.kind {
            ConnectorKind::Bond { order, .. } => Some(order),
            ConnectorKind::Other => None,
        }
    }

    pub fn set_bond_order(&mut self, new_order: BondOrder) {
        if let ConnectorKind::Bond { order, .. } = &mut self.kind {
            *order = new_order;
        }
    }
}

impl Default for Connector {
    fn default() -> Self {
        Self::bond(BondOrder::Single)
    }
}
