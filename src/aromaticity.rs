use crate::connector::BondOrder;
use crate::fragment::{ConnectorId, Fragment, NodeId};
use crate::node::NodeKind;
use crate::rings::Ring;

const SP2_CAPABLE: [u8; 9] = [
    5,  // B
    6,  // C
    7,  // N
    8,  // O
    15, // P
    16, // S
    33, // As
    34, // Se
    52, // Te
];

/// SSSR rings of the top-level fragment that satisfy Hückel's rule.
///
/// Bonds already marked aromatic count as double bonds; a ring whose bonds
/// are all aromatic is reported as is.
pub fn find_aromatic_rings(frag: &Fragment) -> Vec<Ring> {
    let Some(info) = frag.ring_info() else {
        return Vec::new();
    };
    info.sssr_rings()
        .into_iter()
        .filter(|ring| ring.nodes.iter().all(|p| p.is_top_level()))
        .filter(|ring| is_aromatic_ring(frag, ring))
        .cloned()
        .collect()
}

/// Mark the bonds of every aromatic ring as [`BondOrder::Aromatic`],
/// descending into nested structures.
///
/// All rings of a fragment are judged before any of its bonds change.
/// Returns the number of aromatic rings, nested ones included.
pub fn perceive_aromaticity(frag: &mut Fragment) -> usize {
    let nested: Vec<NodeId> = frag
        .nodes()
        .filter(|&n| frag.node(n).is_some_and(|node| node.nested().is_some()))
        .collect();
    let mut nested_rings = 0;
    for id in nested {
        if let Some(NodeKind::SubGroup(inner) | NodeKind::Molecule(inner)) =
            frag.node_mut(id).map(|node| &mut node.kind)
        {
            nested_rings += perceive_aromaticity(&mut inner.structure);
        }
    }

    let rings = find_aromatic_rings(frag);
    let bonds: Vec<ConnectorId> = rings
        .iter()
        .flat_map(|r| r.connectors.iter().map(|p| p.id))
        .collect();
    for id in bonds {
        if let Some(conn) = frag.connector_mut(id) {
            conn.set_bond_order(BondOrder::Aromatic);
        }
    }
    tracing::debug!(rings = rings.len(), nested_rings, "aromaticity perceived");
    rings.len() + nested_rings
}

fn bond_order(frag: &Fragment, id: ConnectorId) -> Option<BondOrder> {
    frag.connector(id).and_then(|c| c.bond_order())
}

fn counts_as_double(order: Option<BondOrder>) -> bool {
    matches!(order, Some(BondOrder::Double | BondOrder::Aromatic))
}

fn is_aromatic_ring(frag: &Fragment, ring: &Ring) -> bool {
    let len = ring.size();
    if len < 3 || ring.connectors.len() != len {
        return false;
    }

    let orders: Vec<Option<BondOrder>> =
        ring.connectors.iter().map(|p| bond_order(frag, p.id)).collect();
    if orders.iter().all(|&o| o == Some(BondOrder::Aromatic)) {
        return true;
    }
    if orders
        .iter()
        .any(|&o| matches!(o, Some(BondOrder::Triple | BondOrder::Quad)))
    {
        return false;
    }

    for p in &ring.nodes {
        let z = frag.node(p.id).and_then(|n| n.atomic_number());
        if !z.is_some_and(|z| SP2_CAPABLE.contains(&z)) {
            return false;
        }
    }

    let mut pi_total: u8 = 0;
    for (i, p) in ring.nodes.iter().enumerate() {
        let in_ring = [orders[(i + len - 1) % len], orders[i]];
        match pi_electrons(frag, p.id, in_ring) {
            Some(e) => pi_total = pi_total.saturating_add(e),
            None => return false,
        }
    }

    is_huckel(pi_total)
}

fn pi_electrons(frag: &Fragment, id: NodeId, ring_bonds: [Option<BondOrder>; 2]) -> Option<u8> {
    let node = frag.node(id)?;
    let anum = node.atomic_number()?;
    let charge = node.charge;

    let has_double = frag
        .linked_connectors(id.into())
        .iter()
        .any(|&c| counts_as_double(bond_order(frag, c)));
    let has_double_in_ring = ring_bonds.into_iter().any(counts_as_double);

    let total_degree = frag.neighbors(id).count() + usize::from(node.hydrogen_count);

    match anum {
        6 => match charge {
            0 => has_double.then_some(1),
            -1 => Some(2),
            1 => Some(if has_double { 1 } else { 0 }),
            _ => None,
        },
        7 => match charge {
            0 => {
                if has_double {
                    Some(1)
                } else if total_degree <= 3 {
                    Some(2)
                } else {
                    None
                }
            }
            1 => has_double_in_ring.then_some(1),
            _ => None,
        },
        8 | 16 | 34 | 52 => Some(if has_double_in_ring { 1 } else { 2 }),
        5 => Some(if has_double { 1 } else { 0 }),
        15 | 33 => {
            if has_double {
                Some(1)
            } else if total_degree <= 3 {
                Some(2)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn is_huckel(pi_electrons: u8) -> bool {
    if pi_electrons < 2 {
        return false;
    }
    (pi_electrons - 2).is_multiple_of(4)
}
