use std::collections::{HashMap, HashSet};

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::connector::BondType;
use crate::fragment::{ConnectorPath, Fragment, NodePath, ObjId, ObjPath};
use crate::graph::{build_graph, GraphOptions};

/// Options for ring analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingSearchOptions {
    /// Only bonds of these types close rings. `None` admits every type.
    pub bond_types: Option<Vec<BondType>>,
    /// Search rings through the nodes of nested sub-structures.
    pub expand_sub_structures: bool,
    pub ignore_bonded_hydrogen: bool,
}

impl Default for RingSearchOptions {
    fn default() -> Self {
        Self {
            bond_types: Some(vec![BondType::Covalent]),
            expand_sub_structures: true,
            ignore_bonded_hydrogen: true,
        }
    }
}

impl RingSearchOptions {
    fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            connector_classes: None,
            bond_types: self.bond_types.clone(),
            expand_sub_structures: self.expand_sub_structures,
            ignore_bonded_hydrogen: self.ignore_bonded_hydrogen,
        }
    }
}

/// One elementary ring. Nodes are in walk order; `connectors[i]` joins
/// `nodes[i]` and `nodes[i + 1]` (wrapping).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ring {
    pub nodes: Vec<NodePath>,
    pub connectors: Vec<ConnectorPath>,
}

impl Ring {
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, obj: &ObjPath<ObjId>) -> bool {
        match obj.id {
            ObjId::Node(n) => self.nodes.iter().any(|p| p.id == n && p.groups == obj.groups),
            ObjId::Connector(c) => self
                .connectors
                .iter()
                .any(|p| p.id == c && p.groups == obj.groups),
        }
    }
}

/// A biconnected component that contains at least one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleBlock {
    pub nodes: Vec<NodePath>,
    pub connectors: Vec<ConnectorPath>,
    /// Every elementary ring of the block.
    pub all_rings: Vec<Ring>,
    /// SSSR members, as indices into `all_rings`.
    pub sssr: Vec<usize>,
}

impl CycleBlock {
    pub fn sssr_rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        self.sssr.iter().filter_map(|&i| self.all_rings.get(i))
    }

    /// Size of the cycle basis, `|E| - |V| + 1`.
    pub fn cyclomatic_number(&self) -> usize {
        (self.connectors.len() + 1).saturating_sub(self.nodes.len())
    }
}

/// Result of ring analysis over one fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingInfo {
    cycle_blocks: Vec<CycleBlock>,
}

impl RingInfo {
    pub fn cycle_blocks(&self) -> &[CycleBlock] {
        &self.cycle_blocks
    }

    pub fn all_rings(&self) -> Vec<&Ring> {
        self.cycle_blocks.iter().flat_map(|b| b.all_rings.iter()).collect()
    }

    pub fn sssr_rings(&self) -> Vec<&Ring> {
        self.cycle_blocks.iter().flat_map(|b| b.sssr_rings()).collect()
    }

    pub fn num_rings(&self) -> usize {
        self.cycle_blocks.iter().map(|b| b.sssr.len()).sum()
    }

    pub fn is_ring_node(&self, path: &NodePath) -> bool {
        self.cycle_blocks.iter().any(|b| b.nodes.contains(path))
    }

    pub fn is_ring_connector(&self, path: &ConnectorPath) -> bool {
        self.cycle_blocks.iter().any(|b| b.connectors.contains(path))
    }

    /// SSSR rings that contain the node or connector at `obj`.
    pub fn belonged_sssr_rings(&self, obj: &ObjPath<ObjId>) -> Vec<&Ring> {
        self.sssr_rings().into_iter().filter(|r| r.contains(obj)).collect()
    }

    /// Size of the smallest SSSR ring containing `obj`.
    pub fn min_ring_size(&self, obj: &ObjPath<ObjId>) -> Option<usize> {
        self.belonged_sssr_rings(obj).iter().map(|r| r.size()).min()
    }

    /// Rewrite every node and connector reference. References the maps
    /// reject are dropped.
    pub fn remap(
        &self,
        node_map: impl Fn(&NodePath) -> Option<NodePath>,
        connector_map: impl Fn(&ConnectorPath) -> Option<ConnectorPath>,
    ) -> RingInfo {
        let map_nodes =
            |nodes: &[NodePath]| -> Vec<NodePath> { nodes.iter().filter_map(&node_map).collect() };
        let map_conns = |conns: &[ConnectorPath]| -> Vec<ConnectorPath> {
            conns.iter().filter_map(&connector_map).collect()
        };
        let cycle_blocks = self
            .cycle_blocks
            .iter()
            .map(|b| CycleBlock {
                nodes: map_nodes(&b.nodes),
                connectors: map_conns(&b.connectors),
                all_rings: b
                    .all_rings
                    .iter()
                    .map(|r| Ring {
                        nodes: map_nodes(&r.nodes),
                        connectors: map_conns(&r.connectors),
                    })
                    .collect(),
                sssr: b.sssr.clone(),
            })
            .collect();
        RingInfo { cycle_blocks }
    }
}

/// Run the full ring analysis of `fragment`.
///
/// Returns `None` only when the fragment has no topology; a fragment
/// without rings yields an empty [`RingInfo`].
pub fn analysis_rings(fragment: &Fragment, options: &RingSearchOptions) -> Option<RingInfo> {
    let graph = build_graph(fragment, &options.graph_options())?;
    let g = graph.graph();

    let mut cycle_blocks = Vec::new();
    for edges in biconnected_blocks(g) {
        let vertices = block_vertices(g, &edges);
        if edges.len() < vertices.len() {
            continue;
        }
        let rings = if edges.len() == vertices.len() {
            vec![walk_single_ring(g, &vertices, &edges)]
        } else {
            hanser_rings(g, &vertices, &edges)
        };
        let sssr = select_sssr(&rings, &edges, edges.len() + 1 - vertices.len());
        cycle_blocks.push(CycleBlock {
            nodes: vertices.iter().map(|&v| g[v].clone()).collect(),
            connectors: edges.iter().map(|&e| g[e].clone()).collect(),
            all_rings: rings
                .into_iter()
                .map(|r| Ring {
                    nodes: r.vertices.iter().map(|&v| g[v].clone()).collect(),
                    connectors: r.edges.iter().map(|&e| g[e].clone()).collect(),
                })
                .collect(),
            sssr,
        });
    }

    let info = RingInfo { cycle_blocks };
    tracing::debug!(
        blocks = info.cycle_blocks.len(),
        all_rings = info.all_rings().len(),
        sssr = info.num_rings(),
        "ring analysis"
    );
    Some(info)
}

/// Cycle blocks of the fragment, from its cached analysis.
pub fn find_cycle_blocks(fragment: &Fragment) -> Vec<CycleBlock> {
    fragment
        .ring_info()
        .map(|info| info.cycle_blocks.clone())
        .unwrap_or_default()
}

/// Every elementary ring, concatenated across blocks.
pub fn find_all_rings(fragment: &Fragment) -> Vec<Ring> {
    fragment
        .ring_info()
        .map(|info| info.all_rings().into_iter().cloned().collect())
        .unwrap_or_default()
}

/// SSSR rings, concatenated across blocks.
pub fn find_sssr(fragment: &Fragment) -> Vec<Ring> {
    fragment
        .ring_info()
        .map(|info| info.sssr_rings().into_iter().cloned().collect())
        .unwrap_or_default()
}

pub fn collect_cycle_blocks<'a>(fragments: impl IntoIterator<Item = &'a Fragment>) -> Vec<CycleBlock> {
    fragments.into_iter().flat_map(find_cycle_blocks).collect()
}

pub fn collect_all_rings<'a>(fragments: impl IntoIterator<Item = &'a Fragment>) -> Vec<Ring> {
    fragments.into_iter().flat_map(find_all_rings).collect()
}

pub fn collect_sssr<'a>(fragments: impl IntoIterator<Item = &'a Fragment>) -> Vec<Ring> {
    fragments.into_iter().flat_map(find_sssr).collect()
}

// ---------------------------------------------------------------------------
// Graph algorithms
// ---------------------------------------------------------------------------

type Graph = UnGraph<NodePath, ConnectorPath>;

#[derive(Debug, Clone)]
struct GraphRing {
    vertices: Vec<NodeIndex>,
    edges: Vec<EdgeIndex>,
}

fn incident(g: &Graph, v: NodeIndex) -> Vec<(EdgeIndex, NodeIndex)> {
    let mut out: Vec<_> = g
        .edges(v)
        .map(|er| {
            let w = if er.source() == v { er.target() } else { er.source() };
            (er.id(), w)
        })
        .collect();
    out.sort_by_key(|&(e, _)| e.index());
    out
}

/// Edge sets of the biconnected components (Tarjan, edge stack).
///
/// Parallel edges are handled by skipping only the tree edge itself, not
/// every edge back to the parent.
fn biconnected_blocks(g: &Graph) -> Vec<Vec<EdgeIndex>> {
    const UNSEEN: usize = usize::MAX;
    let n = g.node_count();
    let mut disc = vec![UNSEEN; n];
    let mut low = vec![0usize; n];
    let mut time = 0usize;
    let mut edge_stack: Vec<EdgeIndex> = Vec::new();
    let mut blocks = Vec::new();

    struct Frame {
        v: NodeIndex,
        via: Option<EdgeIndex>,
        adj: Vec<(EdgeIndex, NodeIndex)>,
        next: usize,
    }

    for root in g.node_indices() {
        if disc[root.index()] != UNSEEN {
            continue;
        }
        disc[root.index()] = time;
        low[root.index()] = time;
        time += 1;
        let mut stack = vec![Frame {
            v: root,
            via: None,
            adj: incident(g, root),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let v = frame.v;
            if frame.next < frame.adj.len() {
                let (e, w) = frame.adj[frame.next];
                frame.next += 1;
                if Some(e) == frame.via {
                    continue;
                }
                if disc[w.index()] == UNSEEN {
                    edge_stack.push(e);
                    disc[w.index()] = time;
                    low[w.index()] = time;
                    time += 1;
                    stack.push(Frame {
                        v: w,
                        via: Some(e),
                        adj: incident(g, w),
                        next: 0,
                    });
                } else if disc[w.index()] < disc[v.index()] {
                    edge_stack.push(e);
                    low[v.index()] = low[v.index()].min(disc[w.index()]);
                }
                continue;
            }

            let via = frame.via;
            stack.pop();
            let (Some(parent), Some(via)) = (stack.last(), via) else {
                continue;
            };
            let u = parent.v;
            low[u.index()] = low[u.index()].min(low[v.index()]);
            if low[v.index()] >= disc[u.index()] {
                let mut block = Vec::new();
                while let Some(e) = edge_stack.pop() {
                    block.push(e);
                    if e == via {
                        break;
                    }
                }
                block.sort_by_key(|e| e.index());
                blocks.push(block);
            }
        }
    }
    blocks
}

fn block_vertices(g: &Graph, edges: &[EdgeIndex]) -> Vec<NodeIndex> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for &e in edges {
        if let Some((a, b)) = g.edge_endpoints(e) {
            for v in [a, b] {
                if seen.insert(v) {
                    out.push(v);
                }
            }
        }
    }
    out.sort_by_key(|v| v.index());
    out
}

fn walk_single_ring(g: &Graph, vertices: &[NodeIndex], edges: &[EdgeIndex]) -> GraphRing {
    let in_block: HashSet<EdgeIndex> = edges.iter().copied().collect();
    let mut used = HashSet::new();
    let start = vertices[0];
    let mut ring = GraphRing {
        vertices: vec![start],
        edges: Vec::with_capacity(edges.len()),
    };
    let mut current = start;
    loop {
        let next = incident(g, current)
            .into_iter()
            .find(|(e, _)| in_block.contains(e) && !used.contains(e));
        let Some((e, w)) = next else {
            break;
        };
        used.insert(e);
        ring.edges.push(e);
        if w == start {
            break;
        }
        ring.vertices.push(w);
        current = w;
    }
    ring
}

/// Elementary rings of a block by path-graph reduction.
///
/// Every edge starts as a path. Vertices are removed in ascending in-block
/// degree; removing `vx` joins every pair of paths that end at `vx` and share
/// no other vertex except possibly their far ends. A joined path whose ends
/// coincide is a ring.
fn hanser_rings(g: &Graph, vertices: &[NodeIndex], edges: &[EdgeIndex]) -> Vec<GraphRing> {
    let mut degree: HashMap<NodeIndex, usize> = HashMap::new();
    let mut paths: Vec<GraphRing> = Vec::with_capacity(edges.len());
    for &e in edges {
        let Some((a, b)) = g.edge_endpoints(e) else {
            continue;
        };
        *degree.entry(a).or_default() += 1;
        *degree.entry(b).or_default() += 1;
        paths.push(GraphRing {
            vertices: vec![a, b],
            edges: vec![e],
        });
    }

    let mut order = vertices.to_vec();
    order.sort_by_key(|v| degree.get(v).copied().unwrap_or(0));

    let ends_at = |p: &GraphRing, v: NodeIndex| {
        p.vertices.first() == Some(&v) || p.vertices.last() == Some(&v)
    };

    let mut rings: Vec<GraphRing> = Vec::new();
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    for vx in order {
        let mut i = paths.len();
        while i > 0 {
            i -= 1;
            if !ends_at(&paths[i], vx) {
                continue;
            }
            for j in (0..i).rev() {
                if !ends_at(&paths[j], vx) {
                    continue;
                }
                let Some((merged, closed)) = join_paths(&paths[i], &paths[j], vx) else {
                    continue;
                };
                if closed {
                    let mut key: Vec<usize> = merged.edges.iter().map(|e| e.index()).collect();
                    key.sort_unstable();
                    if seen.insert(key) {
                        rings.push(merged);
                    }
                } else {
                    paths.push(merged);
                }
            }
            paths.remove(i);
        }
    }
    rings
}

/// Join two paths at their shared end `vx`. The flag tells whether the
/// result is closed.
fn join_paths(p1: &GraphRing, p2: &GraphRing, vx: NodeIndex) -> Option<(GraphRing, bool)> {
    let mut a = p1.clone();
    let mut b = p2.clone();
    if a.vertices.first() == Some(&vx) {
        a.vertices.reverse();
        a.edges.reverse();
    }
    if b.vertices.last() == Some(&vx) {
        b.vertices.reverse();
        b.edges.reverse();
    }
    let a_far = *a.vertices.first()?;
    let b_far = *b.vertices.last()?;
    let closed = a_far == b_far;

    let b_rest: HashSet<NodeIndex> = b.vertices[1..].iter().copied().collect();
    for &v in &a.vertices[..a.vertices.len() - 1] {
        if b_rest.contains(&v) && !(closed && v == a_far) {
            return None;
        }
    }
    if a.edges.iter().any(|e| b.edges.contains(e)) {
        return None;
    }

    a.vertices.pop();
    a.vertices.extend(b.vertices);
    a.edges.extend(b.edges);
    if closed {
        a.vertices.pop();
    }
    Some((a, closed))
}

/// Smallest-first greedy cycle basis over the block's edges.
fn select_sssr(rings: &[GraphRing], edges: &[EdgeIndex], expected: usize) -> Vec<usize> {
    let position: HashMap<EdgeIndex, usize> =
        edges.iter().enumerate().map(|(i, &e)| (e, i)).collect();
    let words = edges.len().div_ceil(64);

    let mut candidates: Vec<usize> = (0..rings.len()).collect();
    candidates.sort_by_key(|&i| rings[i].edges.len());

    let mut basis: Vec<Vec<u64>> = Vec::with_capacity(expected);
    let mut selected = Vec::with_capacity(expected);
    for i in candidates {
        if selected.len() >= expected {
            break;
        }
        let mut bv = vec![0u64; words];
        for e in &rings[i].edges {
            if let Some(&p) = position.get(e) {
                bv[p / 64] ^= 1u64 << (p % 64);
            }
        }
        if try_add_to_basis(&mut basis, bv) {
            selected.push(i);
        }
    }
    selected.sort_unstable();
    selected
}

fn try_add_to_basis(basis: &mut Vec<Vec<u64>>, candidate: Vec<u64>) -> bool {
    let mut v = candidate;
    for row in basis.iter() {
        if let Some(p) = leading_bit(row) {
            if v[p / 64] & (1u64 << (p % 64)) != 0 {
                xor_into(&mut v, row);
            }
        }
    }
    if v.iter().all(|&w| w == 0) {
        return false;
    }
    basis.push(v);
    true
}

fn leading_bit(bv: &[u64]) -> Option<usize> {
    bv.iter()
        .enumerate()
        .find(|&(_, w)| *w != 0)
        .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
}

fn xor_into(a: &mut [u64], b: &[u64]) {
    for (aw, bw) in a.iter_mut().zip(b.iter()) {
        *aw ^= *bw;
    }
}
