//! Expansion of nested sub-structures into a single flat fragment.
//!
//! Sub-group and molecule nodes are replaced by the nodes of their nested
//! structures. A connector that attached to a group node attaches to the
//! group's anchor instead. Every flat object remembers the path of the
//! object it was copied from so results can be mapped back.

use std::collections::HashMap;
use std::sync::Arc;

use crate::fragment::{ConnectorId, ConnectorPath, Fragment, NodeId, NodePath, ObjId, ObjPath};

/// A flattened copy of a fragment plus the mapping to its source objects.
#[derive(Debug, Clone)]
pub struct Flattened {
    pub fragment: Fragment,
    node_origins: Vec<NodePath>,
    connector_origins: Vec<ConnectorPath>,
    node_lookup: HashMap<NodePath, NodeId>,
    connector_lookup: HashMap<ConnectorPath, ConnectorId>,
}

impl Flattened {
    /// Source path of a flat node.
    pub fn origin_node(&self, id: NodeId) -> Option<&NodePath> {
        self.node_origins.get(id.index())
    }

    /// Source path of a flat connector.
    pub fn origin_connector(&self, id: ConnectorId) -> Option<&ConnectorPath> {
        self.connector_origins.get(id.index())
    }

    pub fn origin(&self, obj: ObjId) -> Option<ObjPath<ObjId>> {
        match obj {
            ObjId::Node(n) => self.origin_node(n).cloned().map(ObjPath::into_obj),
            ObjId::Connector(c) => self.origin_connector(c).cloned().map(ObjPath::into_obj),
        }
    }

    /// Flat node copied from the source node at `path`.
    pub fn flat_node(&self, path: &NodePath) -> Option<NodeId> {
        self.node_lookup.get(path).copied()
    }

    pub fn flat_connector(&self, path: &ConnectorPath) -> Option<ConnectorId> {
        self.connector_lookup.get(path).copied()
    }
}

/// Follow anchors from a possibly fragment-valued node down to a leaf.
///
/// Returns `None` when a group on the way has no anchor.
pub(crate) fn resolve_anchor(root: &Fragment, mut path: NodePath) -> Option<NodePath> {
    loop {
        let owner = root.resolve_owner(&path.groups)?;
        let node = owner.node(path.id)?;
        match node.nested() {
            None => return Some(path),
            Some(nested) => {
                let anchor = nested.anchor?;
                path.groups.push(path.id);
                path.id = anchor;
            }
        }
    }
}

/// Leaf nodes in iteration order, descending into nested structures.
pub(crate) fn leaf_nodes(fragment: &Fragment, expand: bool) -> Vec<NodePath> {
    fn walk(frag: &Fragment, prefix: &mut Vec<NodeId>, expand: bool, out: &mut Vec<NodePath>) {
        for n in frag.nodes() {
            let nested = frag.node(n).and_then(|node| node.nested());
            match nested {
                Some(nested) if expand => {
                    prefix.push(n);
                    walk(&nested.structure, prefix, expand, out);
                    prefix.pop();
                }
                _ => out.push(NodePath::new(prefix.clone(), n)),
            }
        }
    }
    let mut out = Vec::new();
    walk(fragment, &mut Vec::new(), expand, &mut out);
    out
}

/// Connectors of the fragment and, when `expand` is set, of every nested
/// structure. Outer connectors come before the connectors of a group.
pub(crate) fn all_connectors(fragment: &Fragment, expand: bool) -> Vec<ConnectorPath> {
    fn walk(frag: &Fragment, prefix: &mut Vec<NodeId>, expand: bool, out: &mut Vec<ConnectorPath>) {
        out.extend(frag.connectors().map(|c| ConnectorPath::new(prefix.clone(), c)));
        if !expand {
            return;
        }
        for n in frag.nodes() {
            if let Some(nested) = frag.node(n).and_then(|node| node.nested()) {
                prefix.push(n);
                walk(&nested.structure, prefix, expand, out);
                prefix.pop();
            }
        }
    }
    let mut out = Vec::new();
    walk(fragment, &mut Vec::new(), expand, &mut out);
    out
}

/// Build the flat shadow of `source`.
///
/// A source without nested structures yields a structurally identical copy.
/// A ring analysis already cached on the source is carried over, remapped to
/// flat handles, so the shadow does not recompute it.
pub fn flatten(source: &Fragment) -> Flattened {
    let mut fragment = Fragment::with_class(source.class());
    fragment.set_charge(source.charge());

    let mut node_origins = Vec::new();
    let mut node_lookup = HashMap::new();
    for path in leaf_nodes(source, true) {
        let Some(node) = source.resolve_node(&path) else {
            continue;
        };
        let id = fragment.add_node(node.clone());
        node_lookup.insert(path.clone(), id);
        node_origins.push(path);
    }

    let sources = all_connectors(source, true);
    let mut connector_origins = Vec::with_capacity(sources.len());
    let mut connector_lookup = HashMap::with_capacity(sources.len());
    for path in &sources {
        let Some(conn) = source.resolve_connector(path) else {
            continue;
        };
        // Objects are attached in a second pass; connectors may join
        // connectors that are not allocated yet.
        if let Ok(id) = fragment.add_connector(conn.clone(), &[]) {
            connector_lookup.insert(path.clone(), id);
            connector_origins.push(path.clone());
        }
    }

    for path in &sources {
        let (Some(owner), Some(&flat)) = (
            source.resolve_owner(&path.groups),
            connector_lookup.get(path),
        ) else {
            continue;
        };
        for &obj in owner.connected_objs(path.id) {
            let target = match obj {
                ObjId::Node(n) => resolve_anchor(source, NodePath::new(path.groups.clone(), n))
                    .and_then(|p| node_lookup.get(&p).copied())
                    .map(ObjId::Node),
                ObjId::Connector(c) => connector_lookup
                    .get(&ConnectorPath::new(path.groups.clone(), c))
                    .copied()
                    .map(ObjId::Connector),
            };
            let Some(target) = target else {
                tracing::trace!(?obj, "connected object has no flat counterpart");
                continue;
            };
            if let Err(err) = fragment.connect(flat, target) {
                tracing::trace!(%err, "skipped connection while flattening");
            }
        }
    }

    let mut flat = Flattened {
        fragment,
        node_origins,
        connector_origins,
        node_lookup,
        connector_lookup,
    };

    if let Some(info) = source.cached_ring_info() {
        let remapped = info.remap(
            |p| flat.flat_node(p).map(NodePath::from),
            |p| flat.flat_connector(p).map(ConnectorPath::from),
        );
        flat.fragment.install_ring_info(Arc::new(remapped));
    }

    tracing::trace!(
        nodes = flat.fragment.node_count(),
        connectors = flat.fragment.connector_count(),
        "flattened structure"
    );
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::BondOrder;
    use crate::node::Node;

    /// Hydroxymethyl group, anchored on its carbon.
    fn hydroxymethyl() -> Fragment {
        let mut g = Fragment::new();
        let c = g.add_node(Node::atom(6).with_hydrogens(2));
        let o = g.add_node(Node::atom(8).with_hydrogens(1));
        g.add_bond(c, o, BondOrder::Single).unwrap();
        g
    }

    #[test]
    fn plain_fragment_is_copied() {
        let mut frag = Fragment::new();
        let a = frag.add_node(Node::atom(6));
        let b = frag.add_node(Node::atom(7));
        frag.add_bond(a, b, BondOrder::Triple).unwrap();

        let flat = flatten(&frag);
        assert_eq!(flat.fragment.node_count(), 2);
        assert_eq!(flat.fragment.connector_count(), 1);
        let fb = flat.flat_node(&NodePath::from(b)).unwrap();
        assert_eq!(flat.fragment.node(fb).unwrap().atomic_number(), Some(7));
        assert_eq!(flat.origin_node(fb), Some(&NodePath::from(b)));
    }

    #[test]
    fn sub_group_is_expanded_and_rewired_to_anchor() {
        let mut frag = Fragment::new();
        let n = frag.add_node(Node::atom(7).with_hydrogens(2));
        let g = frag.add_node(Node::sub_group(hydroxymethyl(), Some(NodeId::new(0))));
        let outer = frag.add_bond(n, g, BondOrder::Single).unwrap();

        let flat = flatten(&frag);
        assert_eq!(flat.fragment.node_count(), 3);
        assert_eq!(flat.fragment.connector_count(), 2);

        let fc = flat.flat_node(&NodePath::new(vec![g], NodeId::new(0))).unwrap();
        let fn_ = flat.flat_node(&NodePath::from(n)).unwrap();
        let fouter = flat.flat_connector(&ConnectorPath::from(outer)).unwrap();
        assert_eq!(
            flat.fragment.connected_objs(fouter),
            &[ObjId::Node(fn_), ObjId::Node(fc)]
        );
        assert_eq!(
            flat.origin(ObjId::Node(fc)),
            Some(ObjPath::new(vec![g], ObjId::Node(NodeId::new(0))))
        );
    }

    #[test]
    fn group_without_anchor_loses_external_bond_end() {
        let mut frag = Fragment::new();
        let n = frag.add_node(Node::atom(7));
        let g = frag.add_node(Node::sub_group(hydroxymethyl(), None));
        let outer = frag.add_bond(n, g, BondOrder::Single).unwrap();

        let flat = flatten(&frag);
        let fouter = flat.flat_connector(&ConnectorPath::from(outer)).unwrap();
        assert_eq!(flat.fragment.connected_objs(fouter).len(), 1);
    }

    #[test]
    fn cached_rings_are_carried_over() {
        let mut frag = Fragment::new();
        let ids: Vec<_> = (0..4).map(|_| frag.add_node(Node::atom(6))).collect();
        for i in 0..4 {
            frag.add_bond(ids[i], ids[(i + 1) % 4], BondOrder::Single).unwrap();
        }
        let info = frag.ring_info().unwrap();

        let flat = flatten(&frag);
        let carried = flat.fragment.cached_ring_info().unwrap();
        assert_eq!(carried.all_rings().len(), info.all_rings().len());
        assert_eq!(carried.sssr_rings()[0].nodes.len(), 4);
    }
}
