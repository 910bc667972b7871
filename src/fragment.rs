use std::sync::{Arc, OnceLock};

use crate::connector::{BondOrder, Connector};
use crate::error::StructureError;
use crate::node::{FragmentClass, Node};
use crate::rings::RingInfo;

/// Handle of a node inside one [`Fragment`].
///
/// Handles are stable: removing other nodes never renumbers a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorId(usize);

impl ConnectorId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjId {
    Node(NodeId),
    Connector(ConnectorId),
}

impl From<NodeId> for ObjId {
    fn from(id: NodeId) -> Self {
        ObjId::Node(id)
    }
}

impl From<ConnectorId> for ObjId {
    fn from(id: ConnectorId) -> Self {
        ObjId::Connector(id)
    }
}

/// Address of an object that may live inside nested sub-structures.
///
/// `groups` lists the fragment-valued nodes to descend through, outermost
/// first; an empty list addresses the top-level fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjPath<T> {
    pub groups: Vec<NodeId>,
    pub id: T,
}

pub type NodePath = ObjPath<NodeId>;
pub type ConnectorPath = ObjPath<ConnectorId>;

impl<T> ObjPath<T> {
    pub fn new(groups: Vec<NodeId>, id: T) -> Self {
        Self { groups, id }
    }

    pub fn is_top_level(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<T: Into<ObjId>> ObjPath<T> {
    pub fn into_obj(self) -> ObjPath<ObjId> {
        ObjPath {
            groups: self.groups,
            id: self.id.into(),
        }
    }
}

impl From<NodeId> for ObjPath<NodeId> {
    fn from(id: NodeId) -> Self {
        Self::new(Vec::new(), id)
    }
}

impl From<ConnectorId> for ObjPath<ConnectorId> {
    fn from(id: ConnectorId) -> Self {
        Self::new(Vec::new(), id)
    }
}

impl From<ObjId> for ObjPath<ObjId> {
    fn from(id: ObjId) -> Self {
        Self::new(Vec::new(), id)
    }
}

#[derive(Debug, Clone)]
struct NodeSlot {
    node: Node,
    linked: Vec<ConnectorId>,
}

#[derive(Debug, Clone)]
struct ConnectorSlot {
    connector: Connector,
    connected: Vec<ObjId>,
    linked: Vec<ConnectorId>,
}

/// A structure: nodes, connectors and the connection table between them.
///
/// Nodes and connectors live in slot arenas addressed by [`NodeId`] and
/// [`ConnectorId`]. Iteration follows an explicit order that canonicalization
/// may permute without touching any handle.
///
/// The fragment owns a lazily computed [`RingInfo`]. Every mutation that can
/// affect topology, bond types or node kinds clears it.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    class: FragmentClass,
    charge: i8,
    nodes: Vec<Option<NodeSlot>>,
    connectors: Vec<Option<ConnectorSlot>>,
    node_order: Vec<NodeId>,
    connector_order: Vec<ConnectorId>,
    ring_info: OnceLock<Arc<RingInfo>>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(class: FragmentClass) -> Self {
        Self {
            class,
            ..Self::default()
        }
    }

    /// Build a fragment of plain atoms joined by covalent bonds. Bond ends
    /// index into `atomic_numbers`.
    ///
    /// ```
    /// use molperceive::{BondOrder, Fragment};
    ///
    /// // Ethene
    /// let frag = Fragment::from_atoms(&[6, 6], &[(0, 1, BondOrder::Double)]).unwrap();
    /// assert_eq!(frag.connector_count(), 1);
    /// ```
    pub fn from_atoms(
        atomic_numbers: &[u8],
        bonds: &[(usize, usize, BondOrder)],
    ) -> Result<Self, StructureError> {
        let mut frag = Self::new();
        let ids: Vec<NodeId> = atomic_numbers
            .iter()
            .map(|&z| frag.add_node(Node::atom(z)))
            .collect();
        for &(a, b, order) in bonds {
            let a = ids.get(a).copied().unwrap_or(NodeId(a));
            let b = ids.get(b).copied().unwrap_or(NodeId(b));
            frag.add_bond(a, b, order)?;
        }
        Ok(frag)
    }

    pub fn class(&self) -> FragmentClass {
        self.class
    }

    pub fn charge(&self) -> i8 {
        self.charge
    }

    pub fn set_charge(&mut self, charge: i8) {
        self.charge = charge;
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(NodeSlot {
            node,
            linked: Vec::new(),
        }));
        self.node_order.push(id);
        self.invalidate_rings();
        id
    }

    /// Add a connector joining `objs`, in that order.
    pub fn add_connector(
        &mut self,
        connector: Connector,
        objs: &[ObjId],
    ) -> Result<ConnectorId, StructureError> {
        let id = ConnectorId(self.connectors.len());
        for (i, &obj) in objs.iter().enumerate() {
            self.check_obj(obj)?;
            if objs[..i].contains(&obj) {
                return Err(StructureError::AlreadyConnected { connector: id, obj });
            }
        }
        self.connectors.push(Some(ConnectorSlot {
            connector,
            connected: Vec::with_capacity(objs.len()),
            linked: Vec::new(),
        }));
        self.connector_order.push(id);
        for &obj in objs {
            self.link(id, obj);
        }
        self.invalidate_rings();
        Ok(id)
    }

    pub fn add_bond(
        &mut self,
        a: NodeId,
        b: NodeId,
        order: BondOrder,
    ) -> Result<ConnectorId, StructureError> {
        self.add_connector(Connector::bond(order), &[a.into(), b.into()])
    }

    pub fn connect(&mut self, connector: ConnectorId, obj: ObjId) -> Result<(), StructureError> {
        self.check_obj(ObjId::Connector(connector))?;
        self.check_obj(obj)?;
        if obj == ObjId::Connector(connector) {
            return Err(StructureError::SelfConnection(connector));
        }
        if self.connected_objs(connector).contains(&obj) {
            return Err(StructureError::AlreadyConnected { connector, obj });
        }
        self.link(connector, obj);
        self.invalidate_rings();
        Ok(())
    }

    /// Detach `obj` from `connector`. Returns whether it was attached.
    pub fn disconnect(&mut self, connector: ConnectorId, obj: ObjId) -> Result<bool, StructureError> {
        self.check_obj(ObjId::Connector(connector))?;
        let removed = self.unlink(connector, obj);
        if removed {
            self.invalidate_rings();
        }
        Ok(removed)
    }

    /// Remove a connector, detaching it from everything it joins and from
    /// every connector that joins it.
    pub fn remove_connector(&mut self, id: ConnectorId) -> Result<Connector, StructureError> {
        self.check_obj(ObjId::Connector(id))?;
        let connected = self.connected_objs(id).to_vec();
        for obj in connected {
            self.unlink(id, obj);
        }
        let linked = self.linked_connectors(ObjId::Connector(id)).to_vec();
        for other in linked {
            self.unlink(other, ObjId::Connector(id));
        }
        self.connector_order.retain(|&c| c != id);
        let slot = self.connectors[id.0]
            .take()
            .ok_or(StructureError::UnknownConnector(id))?;
        self.invalidate_rings();
        Ok(slot.connector)
    }

    /// Remove a node. Connectors left joining fewer than two objects are
    /// removed with it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, StructureError> {
        self.check_obj(ObjId::Node(id))?;
        let linked = self.linked_connectors(ObjId::Node(id)).to_vec();
        for conn in linked {
            self.unlink(conn, ObjId::Node(id));
            if self.connected_objs(conn).len() < 2 && self.contains(ObjId::Connector(conn)) {
                self.remove_connector(conn)?;
            }
        }
        self.node_order.retain(|&n| n != id);
        let slot = self.nodes[id.0].take().ok_or(StructureError::UnknownNode(id))?;
        self.invalidate_rings();
        Ok(slot.node)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.invalidate_rings();
        self.nodes
            .get_mut(id.0)
            .and_then(|s| s.as_mut())
            .map(|s| &mut s.node)
    }

    pub fn connector_mut(&mut self, id: ConnectorId) -> Option<&mut Connector> {
        self.invalidate_rings();
        self.connectors
            .get_mut(id.0)
            .and_then(|s| s.as_mut())
            .map(|s| &mut s.connector)
    }

    /// Replace the iteration order of nodes and connectors.
    ///
    /// Both lists must be permutations of the live handles; otherwise the
    /// order is left untouched and `false` is returned.
    pub(crate) fn reorder(&mut self, nodes: Vec<NodeId>, connectors: Vec<ConnectorId>) -> bool {
        let same_set = |mut a: Vec<usize>, mut b: Vec<usize>| {
            a.sort_unstable();
            b.sort_unstable();
            a == b
        };
        if !same_set(
            nodes.iter().map(|n| n.0).collect(),
            self.node_order.iter().map(|n| n.0).collect(),
        ) || !same_set(
            connectors.iter().map(|c| c.0).collect(),
            self.connector_order.iter().map(|c| c.0).collect(),
        ) {
            return false;
        }
        self.node_order = nodes;
        self.connector_order = connectors;
        true
    }

    fn check_obj(&self, obj: ObjId) -> Result<(), StructureError> {
        if self.contains(obj) {
            return Ok(());
        }
        Err(match obj {
            ObjId::Node(id) => StructureError::UnknownNode(id),
            ObjId::Connector(id) => StructureError::UnknownConnector(id),
        })
    }

    fn link(&mut self, connector: ConnectorId, obj: ObjId) {
        if let Some(slot) = self.connectors[connector.0].as_mut() {
            slot.connected.push(obj);
        }
        match obj {
            ObjId::Node(n) => {
                if let Some(slot) = self.nodes[n.0].as_mut() {
                    slot.linked.push(connector);
                }
            }
            ObjId::Connector(c) => {
                if let Some(slot) = self.connectors[c.0].as_mut() {
                    slot.linked.push(connector);
                }
            }
        }
    }

    fn unlink(&mut self, connector: ConnectorId, obj: ObjId) -> bool {
        let mut removed = false;
        if let Some(slot) = self.connectors.get_mut(connector.0).and_then(|s| s.as_mut()) {
            let before = slot.connected.len();
            slot.connected.retain(|&o| o != obj);
            removed = slot.connected.len() != before;
        }
        let linked = match obj {
            ObjId::Node(n) => self
                .nodes
                .get_mut(n.0)
                .and_then(|s| s.as_mut())
                .map(|s| &mut s.linked),
            ObjId::Connector(c) => self
                .connectors
                .get_mut(c.0)
                .and_then(|s| s.as_mut())
                .map(|s| &mut s.linked),
        };
        if let Some(linked) = linked {
            linked.retain(|&c| c != connector);
        }
        removed
    }

    fn invalidate_rings(&mut self) {
        if self.ring_info.get().is_some() {
            tracing::trace!("ring cache cleared");
        }
        self.ring_info = OnceLock::new();
    }

    // ------------------------------------------------------------------
    // Read-only access
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(|s| s.as_ref()).map(|s| &s.node)
    }

    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors
            .get(id.0)
            .and_then(|s| s.as_ref())
            .map(|s| &s.connector)
    }

    pub fn contains(&self, obj: ObjId) -> bool {
        match obj {
            ObjId::Node(id) => self.node(id).is_some(),
            ObjId::Connector(id) => self.connector(id).is_some(),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_order.iter().copied()
    }

    pub fn connectors(&self) -> impl Iterator<Item = ConnectorId> + '_ {
        self.connector_order.iter().copied()
    }

    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    pub fn connector_count(&self) -> usize {
        self.connector_order.len()
    }

    /// Whether the fragment has a connection table worth analysing.
    pub fn has_topology(&self) -> bool {
        !self.node_order.is_empty()
    }

    pub fn has_nested(&self) -> bool {
        self.nodes().any(|n| self.node(n).is_some_and(|node| node.nested().is_some()))
    }

    pub fn connected_objs(&self, id: ConnectorId) -> &[ObjId] {
        self.connectors
            .get(id.0)
            .and_then(|s| s.as_ref())
            .map(|s| s.connected.as_slice())
            .unwrap_or(&[])
    }

    pub fn linked_connectors(&self, obj: ObjId) -> &[ConnectorId] {
        let linked = match obj {
            ObjId::Node(n) => self
                .nodes
                .get(n.0)
                .and_then(|s| s.as_ref())
                .map(|s| s.linked.as_slice()),
            ObjId::Connector(c) => self
                .connectors
                .get(c.0)
                .and_then(|s| s.as_ref())
                .map(|s| s.linked.as_slice()),
        };
        linked.unwrap_or(&[])
    }

    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.linked_connectors(ObjId::Node(id))
            .iter()
            .flat_map(move |&c| self.connected_objs(c).iter())
            .filter_map(move |&o| match o {
                ObjId::Node(n) if n != id => Some(n),
                _ => None,
            })
    }

    pub fn is_hydrogen(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(Node::is_hydrogen)
    }

    /// A connector joining exactly two objects, one of them a hydrogen atom.
    pub fn is_connector_to_hydrogen(&self, id: ConnectorId) -> bool {
        let objs = self.connected_objs(id);
        objs.len() == 2
            && objs.iter().any(|&o| match o {
                ObjId::Node(n) => self.is_hydrogen(n),
                ObjId::Connector(_) => false,
            })
    }

    pub fn non_hydrogen_nodes(&self) -> Vec<NodeId> {
        self.nodes().filter(|&n| !self.is_hydrogen(n)).collect()
    }

    pub fn non_hydrogen_connectors(&self) -> Vec<ConnectorId> {
        self.connectors()
            .filter(|&c| !self.is_connector_to_hydrogen(c))
            .collect()
    }

    pub fn linked_non_hydrogen_connectors(&self, obj: ObjId) -> Vec<ConnectorId> {
        self.linked_connectors(obj)
            .iter()
            .copied()
            .filter(|&c| !self.is_connector_to_hydrogen(c))
            .collect()
    }

    /// Implicit hydrogens plus hydrogen atoms attached through connectors.
    pub fn hydrogen_count(&self, id: NodeId) -> u8 {
        let Some(node) = self.node(id) else {
            return 0;
        };
        let explicit = self
            .linked_connectors(ObjId::Node(id))
            .iter()
            .filter(|&&c| self.is_connector_to_hydrogen(c))
            .filter(|&&c| {
                self.connected_objs(c)
                    .iter()
                    .any(|&o| o != ObjId::Node(id) && matches!(o, ObjId::Node(n) if self.is_hydrogen(n)))
            })
            .count();
        node.hydrogen_count
            .saturating_add(u8::try_from(explicit).unwrap_or(u8::MAX))
    }

    pub fn resolve_node(&self, path: &NodePath) -> Option<&Node> {
        self.resolve_owner(&path.groups)?.node(path.id)
    }

    pub fn resolve_connector(&self, path: &ConnectorPath) -> Option<&Connector> {
        self.resolve_owner(&path.groups)?.connector(path.id)
    }

    /// The fragment that owns objects addressed with `groups`.
    pub fn resolve_owner(&self, groups: &[NodeId]) -> Option<&Fragment> {
        let mut current = self;
        for &g in groups {
            current = &current.node(g)?.nested()?.structure;
        }
        Some(current)
    }

    // ------------------------------------------------------------------
    // Ring cache
    // ------------------------------------------------------------------

    /// Ring analysis with the process-wide default ring-search options,
    /// computed on first request and kept until the next mutation.
    ///
    /// Returns `None` for a fragment without topology.
    pub fn ring_info(&self) -> Option<Arc<RingInfo>> {
        if !self.has_topology() {
            return None;
        }
        let info = self.ring_info.get_or_init(|| {
            let options = &crate::config::Config::global().ring_search;
            Arc::new(crate::rings::analysis_rings(self, options).unwrap_or_default())
        });
        Some(Arc::clone(info))
    }

    pub fn cached_ring_info(&self) -> Option<Arc<RingInfo>> {
        self.ring_info.get().cloned()
    }

    pub(crate) fn install_ring_info(&mut self, info: Arc<RingInfo>) {
        self.ring_info = OnceLock::new();
        let _ = self.ring_info.set(info);
    }
}
