use std::collections::{HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::connector::{BondType, Connector, ConnectorClass};
use crate::flatten::{all_connectors, leaf_nodes, resolve_anchor};
use crate::fragment::{ConnectorPath, Fragment, NodePath, ObjId};

/// Controls which objects of a fragment become vertices and edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// Only connectors of these classes become edges. `None` admits all.
    pub connector_classes: Option<Vec<ConnectorClass>>,
    /// Only bonds of these types become edges. `None` admits all.
    pub bond_types: Option<Vec<BondType>>,
    /// Replace fragment-valued nodes with the nodes of their nested
    /// structures.
    pub expand_sub_structures: bool,
    /// Leave out hydrogen atoms joined by at most one connector.
    pub ignore_bonded_hydrogen: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            connector_classes: None,
            bond_types: None,
            expand_sub_structures: true,
            ignore_bonded_hydrogen: true,
        }
    }
}

impl GraphOptions {
    fn accepts_connector(&self, connector: &Connector) -> bool {
        if let Some(classes) = &self.connector_classes {
            if !classes.contains(&connector.class()) {
                return false;
            }
        }
        match (&self.bond_types, connector.bond_type()) {
            (Some(types), Some(bt)) => types.contains(&bt),
            _ => true,
        }
    }
}

/// Undirected graph view of a fragment.
///
/// Vertex weights are node addresses and edge weights connector addresses,
/// both relative to the fragment the graph was built from.
#[derive(Debug, Clone)]
pub struct StructureGraph {
    graph: UnGraph<NodePath, ConnectorPath>,
    index: HashMap<NodePath, NodeIndex>,
}

impl StructureGraph {
    pub fn graph(&self) -> &UnGraph<NodePath, ConnectorPath> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, path: &NodePath) -> Option<NodeIndex> {
        self.index.get(path).copied()
    }

    fn vertex(&mut self, path: &NodePath) -> NodeIndex {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.clone());
        self.index.insert(path.clone(), idx);
        idx
    }
}

/// Build the graph view of `fragment`.
///
/// Each accepted connector becomes one edge between the first two accepted
/// nodes it joins; connector-to-connector links are not represented. Accepted
/// nodes that no edge reaches are added as isolated vertices. Returns `None`
/// for a fragment without topology.
pub fn build_graph(fragment: &Fragment, options: &GraphOptions) -> Option<StructureGraph> {
    if !fragment.has_topology() {
        return None;
    }
    let expand = options.expand_sub_structures;
    let leaves = leaf_nodes(fragment, expand);
    let leaf_set: HashSet<&NodePath> = leaves.iter().collect();
    let connectors = all_connectors(fragment, expand);

    let accepts_node = |path: &NodePath| -> bool {
        if !options.ignore_bonded_hydrogen {
            return true;
        }
        let Some(owner) = fragment.resolve_owner(&path.groups) else {
            return false;
        };
        if !owner.is_hydrogen(path.id) {
            return true;
        }
        owner.linked_connectors(ObjId::Node(path.id)).len() > 1
    };

    let mut out = StructureGraph {
        graph: UnGraph::with_capacity(leaves.len(), connectors.len()),
        index: HashMap::with_capacity(leaves.len()),
    };
    let mut visited: HashSet<NodePath> = HashSet::new();

    for cpath in &connectors {
        let Some(owner) = fragment.resolve_owner(&cpath.groups) else {
            continue;
        };
        let Some(connector) = owner.connector(cpath.id) else {
            continue;
        };
        if !options.accepts_connector(connector) {
            continue;
        }
        let mut ends: Vec<NodePath> = Vec::with_capacity(2);
        for &obj in owner.connected_objs(cpath.id) {
            let ObjId::Node(n) = obj else {
                continue;
            };
            let local = NodePath::new(cpath.groups.clone(), n);
            let path = if expand {
                resolve_anchor(fragment, local)
            } else {
                Some(local)
            };
            let Some(path) = path.filter(|p| leaf_set.contains(p)) else {
                continue;
            };
            if accepts_node(&path) {
                if !ends.contains(&path) {
                    ends.push(path);
                }
            } else {
                visited.insert(path);
            }
            if ends.len() == 2 {
                break;
            }
        }
        if let [a, b] = ends.as_slice() {
            let ia = out.vertex(a);
            let ib = out.vertex(b);
            out.graph.add_edge(ia, ib, cpath.clone());
            visited.insert(a.clone());
            visited.insert(b.clone());
        }
    }

    for leaf in &leaves {
        if !visited.contains(leaf) && accepts_node(leaf) {
            out.vertex(leaf);
        }
    }

    tracing::trace!(
        vertices = out.node_count(),
        edges = out.edge_count(),
        "built structure graph"
    );
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::BondOrder;
    use crate::fragment::NodeId;
    use crate::node::Node;

    #[test]
    fn explicit_hydrogens_are_skipped() {
        let mut frag = Fragment::new();
        let c = frag.add_node(Node::atom(6));
        let o = frag.add_node(Node::atom(8));
        let h = frag.add_node(Node::atom(1));
        frag.add_bond(c, o, BondOrder::Single).unwrap();
        frag.add_bond(o, h, BondOrder::Single).unwrap();

        let g = build_graph(&frag, &GraphOptions::default()).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.index_of(&NodePath::from(h)).is_none());

        let keep_h = GraphOptions {
            ignore_bonded_hydrogen: false,
            ..GraphOptions::default()
        };
        let g = build_graph(&frag, &keep_h).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn bridging_hydrogen_is_kept() {
        // Diborane-like B-H-B bridge.
        let mut frag = Fragment::new();
        let b1 = frag.add_node(Node::atom(5));
        let b2 = frag.add_node(Node::atom(5));
        let h = frag.add_node(Node::atom(1));
        frag.add_bond(b1, h, BondOrder::Single).unwrap();
        frag.add_bond(h, b2, BondOrder::Single).unwrap();

        let g = build_graph(&frag, &GraphOptions::default()).unwrap();
        assert_eq!(g.node_count(), 3);
        assert!(g.index_of(&NodePath::from(h)).is_some());
    }

    #[test]
    fn bond_type_filter_and_isolated_nodes() {
        let mut frag = Fragment::new();
        let na = frag.add_node(Node::atom(11).with_charge(1));
        let cl = frag.add_node(Node::atom(17).with_charge(-1));
        frag.add_connector(
            Connector::typed_bond(BondType::Ionic, BondOrder::Single),
            &[na.into(), cl.into()],
        )
        .unwrap();

        let covalent_only = GraphOptions {
            bond_types: Some(vec![BondType::Covalent]),
            ..GraphOptions::default()
        };
        let g = build_graph(&frag, &covalent_only).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 0);

        let g = build_graph(&frag, &GraphOptions::default()).unwrap();
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn nested_groups_follow_expand_flag() {
        let mut group = Fragment::new();
        let gc = group.add_node(Node::atom(6));
        let go = group.add_node(Node::atom(8));
        group.add_bond(gc, go, BondOrder::Double).unwrap();

        let mut frag = Fragment::new();
        let c = frag.add_node(Node::atom(6));
        let g = frag.add_node(Node::sub_group(group, Some(gc)));
        frag.add_bond(c, g, BondOrder::Single).unwrap();

        let g_expanded = build_graph(&frag, &GraphOptions::default()).unwrap();
        assert_eq!(g_expanded.node_count(), 3);
        assert_eq!(g_expanded.edge_count(), 2);
        assert!(g_expanded
            .index_of(&NodePath::new(vec![g], NodeId::new(0)))
            .is_some());

        let flat_only = GraphOptions {
            expand_sub_structures: false,
            ..GraphOptions::default()
        };
        let g_top = build_graph(&frag, &flat_only).unwrap();
        assert_eq!(g_top.node_count(), 2);
        assert_eq!(g_top.edge_count(), 1);
    }

    #[test]
    fn empty_fragment_has_no_graph() {
        assert!(build_graph(&Fragment::new(), &GraphOptions::default()).is_none());
    }
}
