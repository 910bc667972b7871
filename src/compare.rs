//! Packed priority values and the structure comparator built on them.
//!
//! Each node or connector is reduced to a fixed set of small decimal fields.
//! Packing those fields most-significant first into one `u64` makes integer
//! order equal to field-by-field order, so equality under a set of
//! [`CompareOptions`] is a single integer comparison.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::connector::ConnectorKind;
use crate::error::StructureError;
use crate::fragment::{ConnectorId, Fragment, NodeId, ObjId};
use crate::node::{FragmentClass, NodeKind};

/// Granularity of structure comparison, from loosest to strictest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonLevel {
    /// Graph shape only: connectivity counts, no element or bond identity.
    Skeletal,
    /// Elements, bonds and hydrogen counts.
    Constitution,
    /// Constitution plus stereo parity.
    Configuration,
    /// Everything, including isotopes and charges.
    #[default]
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompareOptions {
    pub atom: bool,
    pub mass: bool,
    pub linked_connector_count: bool,
    pub charge: bool,
    pub stereo: bool,
    pub hydrogen_count: bool,
    pub connected_obj_count: bool,
    pub bond_type: bool,
    pub bond_order: bool,
}

impl CompareOptions {
    pub const fn for_level(level: ComparisonLevel) -> Self {
        match level {
            ComparisonLevel::Skeletal => Self {
                atom: false,
                mass: false,
                linked_connector_count: true,
                charge: false,
                stereo: false,
                hydrogen_count: false,
                connected_obj_count: true,
                bond_type: false,
                bond_order: false,
            },
            ComparisonLevel::Constitution => Self {
                atom: true,
                mass: false,
                linked_connector_count: true,
                charge: false,
                stereo: false,
                hydrogen_count: true,
                connected_obj_count: true,
                bond_type: true,
                bond_order: true,
            },
            ComparisonLevel::Configuration => Self {
                atom: true,
                mass: false,
                linked_connector_count: true,
                charge: false,
                stereo: true,
                hydrogen_count: true,
                connected_obj_count: true,
                bond_type: true,
                bond_order: true,
            },
            ComparisonLevel::Exact => Self {
                atom: true,
                mass: true,
                linked_connector_count: true,
                charge: true,
                stereo: true,
                hydrogen_count: true,
                connected_obj_count: true,
                bond_type: true,
                bond_order: true,
            },
        }
    }
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self::for_level(ComparisonLevel::default())
    }
}

/// Caller-facing comparison settings: an optional level plus optional
/// per-field overrides. Unset fields follow the level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOverrides {
    pub level: Option<ComparisonLevel>,
    pub atom: Option<bool>,
    pub mass: Option<bool>,
    pub linked_connector_count: Option<bool>,
    pub charge: Option<bool>,
    pub stereo: Option<bool>,
    pub hydrogen_count: Option<bool>,
    pub connected_obj_count: Option<bool>,
    pub bond_type: Option<bool>,
    pub bond_order: Option<bool>,
}

impl CompareOverrides {
    pub fn level(level: ComparisonLevel) -> Self {
        Self {
            level: Some(level),
            ..Self::default()
        }
    }

    pub fn resolve(&self, default_level: ComparisonLevel) -> CompareOptions {
        let base = CompareOptions::for_level(self.level.unwrap_or(default_level));
        CompareOptions {
            atom: self.atom.unwrap_or(base.atom),
            mass: self.mass.unwrap_or(base.mass),
            linked_connector_count: self
                .linked_connector_count
                .unwrap_or(base.linked_connector_count),
            charge: self.charge.unwrap_or(base.charge),
            stereo: self.stereo.unwrap_or(base.stereo),
            hydrogen_count: self.hydrogen_count.unwrap_or(base.hydrogen_count),
            connected_obj_count: self.connected_obj_count.unwrap_or(base.connected_obj_count),
            bond_type: self.bond_type.unwrap_or(base.bond_type),
            bond_order: self.bond_order.unwrap_or(base.bond_order),
        }
    }
}

pub fn resolve_compare_options(overrides: &CompareOverrides) -> CompareOptions {
    overrides.resolve(crate::config::Config::global().comparison_level)
}

#[derive(Debug, Clone, Copy)]
pub enum StructObj<'a> {
    Node(&'a Fragment, NodeId),
    Connector(&'a Fragment, ConnectorId),
    Fragment(&'a Fragment),
}

impl<'a> StructObj<'a> {
    pub fn from_obj(fragment: &'a Fragment, obj: ObjId) -> Self {
        match obj {
            ObjId::Node(n) => StructObj::Node(fragment, n),
            ObjId::Connector(c) => StructObj::Connector(fragment, c),
        }
    }

    pub fn as_fragment(&self) -> Option<&'a Fragment> {
        match *self {
            StructObj::Fragment(f) => Some(f),
            StructObj::Node(f, n) => f.node(n)?.nested().map(|nested| &*nested.structure),
            StructObj::Connector(..) => None,
        }
    }
}

fn push_field(acc: u64, value: u64, digits: u32) -> u64 {
    let base = 10u64.pow(digits);
    acc * base + value.min(base - 1)
}

/// Decoded node priority fields.
///
/// | field       | digits | content                                              |
/// |-------------|--------|------------------------------------------------------|
/// | class       | 1      | 1 atom, 2 pseudo, 3 variable, 4 sub-group, 5 molecule, 8 unspecified, 0 other |
/// | major       | 4      | atomic number, 9998 pseudo, 9999 variable, fragment node count |
/// | mass        | 4      | mass number, fragment connector count                 |
/// | linked      | 2      | non-hydrogen linked connectors                        |
/// | charge      | 3      | charge + 500                                          |
/// | parity      | 1      | 0 none, 1 odd, 2 even                                 |
/// | hydrogens   | 2      | implicit plus attached hydrogen atoms                 |
///
/// Values beyond a field's width are clamped to its maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodePriority {
    pub class: u8,
    pub major: u16,
    pub mass: u16,
    pub linked: u8,
    pub charge: u16,
    pub parity: u8,
    pub hydrogens: u8,
}

impl NodePriority {
    pub const CHARGE_OFFSET: i32 = 500;

    pub fn packed(&self) -> u64 {
        let mut v = 1;
        v = push_field(v, self.class.into(), 1);
        v = push_field(v, self.major.into(), 4);
        v = push_field(v, self.mass.into(), 4);
        v = push_field(v, self.linked.into(), 2);
        v = push_field(v, self.charge.into(), 3);
        v = push_field(v, self.parity.into(), 1);
        push_field(v, self.hydrogens.into(), 2)
    }
}

/// Decoded connector priority fields.
///
/// | field     | digits | content                                            |
/// |-----------|--------|----------------------------------------------------|
/// | class     | 1      | 1 bond, 0 other                                    |
/// | bond type | 1      | 1 covalent, 2 ionic, 3 coordinate, 4 metallic, 9 hydrogen, 0 unknown |
/// | parity    | 1      | 0 none, 1 odd, 2 even                              |
/// | electrons | 2      | 2 single, 4 double, 6 triple, 8 quad, 3 aromatic   |
/// | connected | 2      | number of connected objects                        |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectorPriority {
    pub class: u8,
    pub bond_type: u8,
    pub parity: u8,
    pub electrons: u8,
    pub connected: u8,
}

impl ConnectorPriority {
    pub fn packed(&self) -> u64 {
        let mut v = 0;
        v = push_field(v, self.class.into(), 1);
        v = push_field(v, self.bond_type.into(), 1);
        v = push_field(v, self.parity.into(), 1);
        v = push_field(v, self.electrons.into(), 2);
        push_field(v, self.connected.into(), 2)
    }
}

/// Priority of one object. Ordering, equality and hashing all go through
/// [`PriorityValue::packed`]; every node outranks every connector.
#[derive(Debug, Clone, Copy, Default)]
pub enum PriorityValue {
    #[default]
    Null,
    Node(NodePriority),
    Connector(ConnectorPriority),
}

impl PriorityValue {
    pub fn packed(&self) -> u64 {
        match self {
            PriorityValue::Null => 0,
            PriorityValue::Node(p) => p.packed(),
            PriorityValue::Connector(p) => p.packed(),
        }
    }
}

impl PartialEq for PriorityValue {
    fn eq(&self, other: &Self) -> bool {
        self.packed() == other.packed()
    }
}

impl Eq for PriorityValue {}

impl PartialOrd for PriorityValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.packed().cmp(&other.packed())
    }
}

impl Hash for PriorityValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.packed().hash(state);
    }
}

fn clamp_u8(n: usize) -> u8 {
    u8::try_from(n).unwrap_or(u8::MAX)
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn fragment_class_code(class: FragmentClass) -> u8 {
    match class {
        FragmentClass::SubGroup => 4,
        FragmentClass::Molecule => 5,
        FragmentClass::Other => 0,
    }
}

fn fragment_size_fields(frag: &Fragment) -> (u16, u16) {
    (
        clamp_u16(frag.non_hydrogen_nodes().len()),
        clamp_u16(frag.non_hydrogen_connectors().len()),
    )
}

fn node_priority(frag: &Fragment, id: NodeId, opts: &CompareOptions) -> Option<NodePriority> {
    let node = frag.node(id)?;
    let mut p = NodePriority::default();
    if opts.atom {
        match &node.kind {
            NodeKind::Atom {
                atomic_number,
                mass_number,
            } => {
                p.class = 1;
                p.major = (*atomic_number).into();
                if opts.mass {
                    p.mass = *mass_number;
                }
            }
            NodeKind::Pseudoatom { .. } => {
                p.class = 2;
                p.major = 9998;
            }
            NodeKind::VariableAtom { .. } => {
                p.class = 3;
                p.major = 9999;
            }
            NodeKind::UnspecifiedAtom => p.class = 8,
            NodeKind::SubGroup(nested) => {
                p.class = 4;
                (p.major, p.mass) = fragment_size_fields(&nested.structure);
            }
            NodeKind::Molecule(nested) => {
                p.class = 5;
                (p.major, p.mass) = fragment_size_fields(&nested.structure);
            }
            NodeKind::Other => {}
        }
    }
    if opts.linked_connector_count {
        p.linked = clamp_u8(frag.linked_non_hydrogen_connectors(ObjId::Node(id)).len());
    }
    if opts.charge {
        let shifted = i32::from(node.charge) + NodePriority::CHARGE_OFFSET;
        p.charge = u16::try_from(shifted.max(0)).unwrap_or(0);
    }
    if opts.stereo {
        p.parity = node.parity.code();
    }
    if opts.hydrogen_count {
        p.hydrogens = frag.hydrogen_count(id);
    }
    Some(p)
}

fn connector_priority(
    frag: &Fragment,
    id: ConnectorId,
    opts: &CompareOptions,
) -> Option<ConnectorPriority> {
    let conn = frag.connector(id)?;
    let mut p = ConnectorPriority::default();
    if let ConnectorKind::Bond { bond_type, order } = conn.kind {
        p.class = 1;
        if opts.bond_type {
            p.bond_type = bond_type.code();
        }
        if opts.bond_order {
            p.electrons = order.electron_count();
        }
    }
    if opts.stereo {
        p.parity = conn.parity.code();
    }
    if opts.connected_obj_count {
        p.connected = clamp_u8(frag.connected_objs(id).len());
    }
    Some(p)
}

fn whole_fragment_priority(frag: &Fragment, opts: &CompareOptions) -> NodePriority {
    let mut p = NodePriority::default();
    if opts.atom {
        p.class = fragment_class_code(frag.class());
        (p.major, p.mass) = fragment_size_fields(frag);
    }
    if opts.charge {
        let shifted = i32::from(frag.charge()) + NodePriority::CHARGE_OFFSET;
        p.charge = u16::try_from(shifted.max(0)).unwrap_or(0);
    }
    p
}

/// Priority of `obj` under `opts`. Missing objects and dangling handles
/// score [`PriorityValue::Null`].
pub fn priority_value(obj: Option<StructObj<'_>>, opts: &CompareOptions) -> PriorityValue {
    let value = match obj {
        None => None,
        Some(StructObj::Node(f, n)) => node_priority(f, n, opts).map(PriorityValue::Node),
        Some(StructObj::Connector(f, c)) => {
            connector_priority(f, c, opts).map(PriorityValue::Connector)
        }
        Some(StructObj::Fragment(f)) => Some(PriorityValue::Node(whole_fragment_priority(f, opts))),
    };
    value.unwrap_or_default()
}

/// Order two objects by priority. Fragment-like objects that tie are then
/// compared by their non-hydrogen nodes and connectors, pairwise in their
/// current iteration order.
pub fn compare(a: Option<StructObj<'_>>, b: Option<StructObj<'_>>, opts: &CompareOptions) -> Ordering {
    let ord = priority_value(a, opts).cmp(&priority_value(b, opts));
    if ord != Ordering::Equal {
        return ord;
    }
    match (a.and_then(|o| o.as_fragment()), b.and_then(|o| o.as_fragment())) {
        (Some(fa), Some(fb)) => compare_children(fa, fb, opts),
        _ => Ordering::Equal,
    }
}

fn compare_children(fa: &Fragment, fb: &Fragment, opts: &CompareOptions) -> Ordering {
    let na = fa.non_hydrogen_nodes();
    let nb = fb.non_hydrogen_nodes();
    let ord = na.len().cmp(&nb.len()).then_with(|| {
        na.iter()
            .zip(&nb)
            .map(|(&x, &y)| compare(Some(StructObj::Node(fa, x)), Some(StructObj::Node(fb, y)), opts))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    if ord.is_ne() {
        return ord;
    }
    let ca = fa.non_hydrogen_connectors();
    let cb = fb.non_hydrogen_connectors();
    ca.len().cmp(&cb.len()).then_with(|| {
        ca.iter()
            .zip(&cb)
            .map(|(&x, &y)| {
                compare(
                    Some(StructObj::Connector(fa, x)),
                    Some(StructObj::Connector(fb, y)),
                    opts,
                )
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    })
}

pub fn compare_structures(
    a: StructObj<'_>,
    b: StructObj<'_>,
    opts: &CompareOptions,
) -> Result<Ordering, StructureError> {
    if a.as_fragment().is_none() || b.as_fragment().is_none() {
        return Err(StructureError::NotAFragment);
    }
    Ok(compare(Some(a), Some(b), opts))
}

pub fn sort(objs: &mut [StructObj<'_>], ascending: bool, opts: &CompareOptions) {
    objs.sort_by(|&a, &b| {
        let ord = compare(Some(a), Some(b), opts);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
}

/// The highest-priority object; the first one wins a tie.
pub fn max<'a>(
    objs: impl IntoIterator<Item = StructObj<'a>>,
    opts: &CompareOptions,
) -> Option<StructObj<'a>> {
    objs.into_iter().fold(None, |best, obj| match best {
        Some(b) if compare(Some(obj), Some(b), opts) != Ordering::Greater => Some(b),
        _ => Some(obj),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{BondOrder, BondType, Connector};
    use crate::node::{Node, Parity};

    fn opts(level: ComparisonLevel) -> CompareOptions {
        CompareOptions::for_level(level)
    }

    #[test]
    fn levels_are_increasingly_strict() {
        let levels = [
            ComparisonLevel::Skeletal,
            ComparisonLevel::Constitution,
            ComparisonLevel::Configuration,
            ComparisonLevel::Exact,
        ];
        let as_bits = |o: CompareOptions| {
            [
                o.atom,
                o.mass,
                o.linked_connector_count,
                o.charge,
                o.stereo,
                o.hydrogen_count,
                o.connected_obj_count,
                o.bond_type,
                o.bond_order,
            ]
        };
        for pair in levels.windows(2) {
            let loose = as_bits(opts(pair[0]));
            let strict = as_bits(opts(pair[1]));
            for (l, s) in loose.iter().zip(&strict) {
                assert!(!l || *s, "{:?} -> {:?}", pair[0], pair[1]);
            }
        }
        assert!(!opts(ComparisonLevel::Configuration).charge);
        assert!(opts(ComparisonLevel::Configuration).stereo);
    }

    #[test]
    fn overrides_win_and_resolution_is_pure() {
        let o = CompareOverrides {
            level: Some(ComparisonLevel::Skeletal),
            atom: Some(true),
            connected_obj_count: Some(false),
            ..CompareOverrides::default()
        };
        let first = o.resolve(ComparisonLevel::Exact);
        assert!(first.atom);
        assert!(!first.connected_obj_count);
        assert!(!first.bond_order);
        assert_eq!(first, o.resolve(ComparisonLevel::Exact));

        let unset = CompareOverrides::default();
        assert_eq!(
            unset.resolve(ComparisonLevel::Constitution),
            opts(ComparisonLevel::Constitution)
        );
        assert_eq!(resolve_compare_options(&unset), opts(ComparisonLevel::Exact));
    }

    #[test]
    fn packed_layout() {
        let p = NodePriority {
            class: 1,
            major: 6,
            mass: 13,
            linked: 3,
            charge: 501,
            parity: 2,
            hydrogens: 1,
        };
        assert_eq!(p.packed(), 1_1_0006_0013_03_501_2_01);

        let c = ConnectorPriority {
            class: 1,
            bond_type: 1,
            parity: 0,
            electrons: 4,
            connected: 2,
        };
        assert_eq!(c.packed(), 1_1_0_04_02);
        assert!(PriorityValue::Node(NodePriority::default()) > PriorityValue::Connector(c));
    }

    #[test]
    fn oversized_values_are_clamped() {
        let p = NodePriority {
            linked: 250,
            ..NodePriority::default()
        };
        let q = NodePriority {
            linked: 99,
            ..NodePriority::default()
        };
        assert_eq!(p.packed(), q.packed());
    }

    #[test]
    fn atoms_by_level() {
        let mut frag = Fragment::new();
        let c12 = frag.add_node(Node::atom(6));
        let c13 = frag.add_node(Node::isotope(6, 13));
        let n = frag.add_node(Node::atom(7));
        let cation = frag.add_node(Node::atom(7).with_charge(1));

        let cmp = |a, b, level| {
            compare(
                Some(StructObj::Node(&frag, a)),
                Some(StructObj::Node(&frag, b)),
                &opts(level),
            )
        };
        assert_eq!(cmp(c12, c13, ComparisonLevel::Constitution), Ordering::Equal);
        assert_eq!(cmp(c12, c13, ComparisonLevel::Exact), Ordering::Less);
        assert_eq!(cmp(c12, n, ComparisonLevel::Constitution), Ordering::Less);
        assert_eq!(cmp(c12, n, ComparisonLevel::Skeletal), Ordering::Equal);
        assert_eq!(cmp(n, cation, ComparisonLevel::Configuration), Ordering::Equal);
        assert_eq!(cmp(n, cation, ComparisonLevel::Exact), Ordering::Less);
    }

    #[test]
    fn bonds_by_level() {
        let mut frag = Fragment::new();
        let a = frag.add_node(Node::atom(6));
        let b = frag.add_node(Node::atom(6));
        let c = frag.add_node(Node::atom(6));
        let single = frag.add_bond(a, b, BondOrder::Single).unwrap();
        let double = frag.add_bond(b, c, BondOrder::Double).unwrap();
        let ionic = frag
            .add_connector(
                Connector::typed_bond(BondType::Ionic, BondOrder::Single),
                &[a.into(), c.into()],
            )
            .unwrap();

        let pv = |c, level| priority_value(Some(StructObj::Connector(&frag, c)), &opts(level));
        assert!(pv(single, ComparisonLevel::Constitution) < pv(double, ComparisonLevel::Constitution));
        assert_eq!(pv(single, ComparisonLevel::Skeletal), pv(double, ComparisonLevel::Skeletal));
        assert_ne!(pv(single, ComparisonLevel::Exact), pv(ionic, ComparisonLevel::Exact));
    }

    #[test]
    fn stereo_needs_configuration() {
        let mut frag = Fragment::new();
        let a = frag.add_node(Node::atom(6).with_parity(Parity::Odd));
        let b = frag.add_node(Node::atom(6).with_parity(Parity::Even));
        let pv = |n, level| priority_value(Some(StructObj::Node(&frag, n)), &opts(level));
        assert_eq!(pv(a, ComparisonLevel::Constitution), pv(b, ComparisonLevel::Constitution));
        assert!(pv(a, ComparisonLevel::Configuration) < pv(b, ComparisonLevel::Configuration));
    }

    #[test]
    fn missing_objects_score_zero() {
        let frag = Fragment::new();
        let o = opts(ComparisonLevel::Exact);
        assert_eq!(priority_value(None, &o).packed(), 0);
        assert_eq!(
            priority_value(Some(StructObj::Node(&frag, NodeId::new(3))), &o).packed(),
            0
        );
        assert_eq!(compare(None, None, &o), Ordering::Equal);
    }

    #[test]
    fn comparator_is_antisymmetric_and_transitive() {
        let mut frag = Fragment::new();
        let nodes = vec![
            frag.add_node(Node::atom(6)),
            frag.add_node(Node::atom(6).with_hydrogens(2)),
            frag.add_node(Node::atom(8)),
            frag.add_node(Node::isotope(6, 14)),
            frag.add_node(Node::pseudoatom("R")),
            frag.add_node(Node::atom(7).with_charge(-1)),
            frag.add_node(Node::atom(6)),
        ];
        frag.add_bond(nodes[0], nodes[2], BondOrder::Single).unwrap();
        frag.add_bond(nodes[6], nodes[5], BondOrder::Double).unwrap();
        let objs: Vec<_> = nodes.iter().map(|&n| StructObj::Node(&frag, n)).collect();

        for level in [
            ComparisonLevel::Skeletal,
            ComparisonLevel::Constitution,
            ComparisonLevel::Configuration,
            ComparisonLevel::Exact,
        ] {
            let o = opts(level);
            for &a in &objs {
                for &b in &objs {
                    let ab = compare(Some(a), Some(b), &o);
                    assert_eq!(ab, compare(Some(b), Some(a), &o).reverse());
                    for &c in &objs {
                        if ab.is_eq() && compare(Some(b), Some(c), &o).is_eq() {
                            assert!(compare(Some(a), Some(c), &o).is_eq());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn fragments_tie_break_on_children() {
        let ethanol = Fragment::from_atoms(
            &[6, 6, 8],
            &[(0, 1, BondOrder::Single), (1, 2, BondOrder::Single)],
        )
        .unwrap();
        let methylamine_ish = Fragment::from_atoms(
            &[6, 6, 7],
            &[(0, 1, BondOrder::Single), (1, 2, BondOrder::Single)],
        )
        .unwrap();
        let o = opts(ComparisonLevel::Constitution);

        let a = StructObj::Fragment(&ethanol);
        let b = StructObj::Fragment(&methylamine_ish);
        assert_eq!(priority_value(Some(a), &o), priority_value(Some(b), &o));
        assert_eq!(compare_structures(a, b, &o), Ok(Ordering::Greater));
        assert_eq!(compare_structures(a, a, &o), Ok(Ordering::Equal));
    }

    #[test]
    fn compare_structures_rejects_plain_nodes() {
        let frag = Fragment::from_atoms(&[6], &[]).unwrap();
        let o = opts(ComparisonLevel::Exact);
        assert_eq!(
            compare_structures(StructObj::Node(&frag, NodeId::new(0)), StructObj::Fragment(&frag), &o),
            Err(StructureError::NotAFragment)
        );
    }

    #[test]
    fn sub_group_nodes_compare_by_content() {
        let methyl = Fragment::from_atoms(&[6], &[]).unwrap();
        let ethyl = Fragment::from_atoms(&[6, 6], &[(0, 1, BondOrder::Single)]).unwrap();
        let mut frag = Fragment::new();
        let g1 = frag.add_node(Node::sub_group(methyl, Some(NodeId::new(0))));
        let g2 = frag.add_node(Node::sub_group(ethyl, Some(NodeId::new(0))));
        let o = opts(ComparisonLevel::Exact);
        assert_eq!(
            compare(Some(StructObj::Node(&frag, g1)), Some(StructObj::Node(&frag, g2)), &o),
            Ordering::Less
        );
    }

    #[test]
    fn sort_and_max() {
        let frag = Fragment::from_atoms(&[8, 6, 7], &[]).unwrap();
        let o = opts(ComparisonLevel::Exact);
        let mut objs: Vec<_> = frag.nodes().map(|n| StructObj::Node(&frag, n)).collect();
        sort(&mut objs, true, &o);
        let order: Vec<_> = objs
            .iter()
            .map(|o| match o {
                StructObj::Node(f, n) => f.node(*n).and_then(Node::atomic_number),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec![Some(6), Some(7), Some(8)]);

        let top = max(objs.iter().copied(), &o).unwrap();
        assert!(matches!(top, StructObj::Node(_, n) if n == NodeId::new(0)));
        assert!(max(std::iter::empty(), &o).is_none());
    }
}
