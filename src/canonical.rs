use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::compare::{priority_value, CompareOptions, ComparisonLevel, StructObj};
use crate::fragment::{ConnectorId, Fragment, NodeId, ObjId};

struct Fnv1aHasher(u64);

impl Fnv1aHasher {
    fn new() -> Self {
        Self(0xcbf29ce484222325)
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(0x100000001b3);
        }
    }
}

/// Dense view of the node graph: position `i` is `nodes[i]`.
struct Topology {
    nodes: Vec<NodeId>,
    neighbors: Vec<Vec<usize>>,
}

impl Topology {
    fn new(frag: &Fragment) -> Self {
        let nodes: Vec<NodeId> = frag.nodes().collect();
        let pos: HashMap<NodeId, usize> = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let neighbors = nodes
            .iter()
            .map(|&n| frag.neighbors(n).filter_map(|m| pos.get(&m).copied()).collect())
            .collect();
        Self { nodes, neighbors }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn ranks_from_values(values: &[u64]) -> Vec<usize> {
    let n = values.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by_key(|&i| values[i]);
    let mut ranks = vec![0usize; n];
    for i in 1..n {
        ranks[indices[i]] = if values[indices[i]] == values[indices[i - 1]] {
            ranks[indices[i - 1]]
        } else {
            i
        };
    }
    ranks
}

fn count_distinct(ranks: &[usize]) -> usize {
    let mut sorted: Vec<usize> = ranks.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

fn morgan_refine(topo: &Topology, ranks: &mut Vec<usize>) {
    let mut prev_distinct = count_distinct(ranks);
    loop {
        let new_values: Vec<u64> = (0..topo.len())
            .map(|i| {
                let mut neighbor_ranks: Vec<usize> =
                    topo.neighbors[i].iter().map(|&nb| ranks[nb]).collect();
                neighbor_ranks.sort_unstable();
                let mut h = Fnv1aHasher::new();
                ranks[i].hash(&mut h);
                neighbor_ranks.hash(&mut h);
                h.finish()
            })
            .collect();
        let new_ranks = ranks_from_values(&new_values);
        let distinct = count_distinct(&new_ranks);
        if distinct <= prev_distinct {
            return;
        }
        *ranks = new_ranks;
        prev_distinct = distinct;
    }
}

fn break_ties(topo: &Topology, ranks: &mut Vec<usize>, invariants: &[u64]) {
    let n = ranks.len();
    while count_distinct(ranks) < n {
        let Some(tied_rank) = lowest_tied_rank(ranks) else {
            return;
        };
        let tied: Vec<usize> = (0..n).filter(|&i| ranks[i] == tied_rank).collect();
        let max_rank = ranks.iter().copied().max().unwrap_or(0);

        // Promote each tied node in turn and keep the promotion whose
        // invariant trace (in resulting rank order) is smallest.
        let mut best: Option<(Vec<u64>, Vec<usize>)> = None;
        for &candidate in &tied {
            let mut trial = ranks.clone();
            trial[candidate] = max_rank + 1;
            morgan_refine(topo, &mut trial);

            let mut indexed: Vec<usize> = (0..n).collect();
            indexed.sort_by_key(|&i| trial[i]);
            let trace: Vec<u64> = indexed
                .iter()
                .map(|&i| {
                    let mut h = Fnv1aHasher::new();
                    invariants[i].hash(&mut h);
                    let mut nb_ranks: Vec<usize> =
                        topo.neighbors[i].iter().map(|&nb| trial[nb]).collect();
                    nb_ranks.sort_unstable();
                    nb_ranks.hash(&mut h);
                    h.finish()
                })
                .collect();
            if best.as_ref().is_none_or(|(t, _)| trace < *t) {
                best = Some((trace, trial));
            }
        }
        match best {
            Some((_, trial)) => *ranks = trial,
            None => return,
        }
    }
}

fn lowest_tied_rank(ranks: &[usize]) -> Option<usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &r in ranks {
        *counts.entry(r).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(rank, _)| rank)
        .min()
}

/// Canonical rank of every node, independent of insertion order.
///
/// Initial invariants are the exact-level priority values, so two nodes
/// share an initial class only when the comparator cannot tell them apart.
/// Ranks are dense from `0`.
pub fn canonical_ranks(frag: &Fragment) -> HashMap<NodeId, usize> {
    let topo = Topology::new(frag);
    let n = topo.len();
    if n == 0 {
        return HashMap::new();
    }
    let opts = CompareOptions::for_level(ComparisonLevel::Exact);
    let invariants: Vec<u64> = topo
        .nodes
        .iter()
        .map(|&id| priority_value(Some(StructObj::Node(frag, id)), &opts).packed())
        .collect();

    let mut ranks = ranks_from_values(&invariants);
    morgan_refine(&topo, &mut ranks);
    if count_distinct(&ranks) < n {
        break_ties(&topo, &mut ranks, &invariants);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| ranks[i]);
    order
        .into_iter()
        .enumerate()
        .map(|(rank, i)| (topo.nodes[i], rank))
        .collect()
}

/// Reorder nodes and connectors of `frag` canonically. Handles are kept;
/// only iteration order changes.
///
/// Non-hydrogen nodes come first by canonical rank, hydrogen atoms after.
/// Connectors are ordered by priority, then by the sorted ranks of the
/// nodes they join.
pub fn canonicalize(frag: &mut Fragment) {
    let ranks = canonical_ranks(frag);
    let rank_of = |n: NodeId| ranks.get(&n).copied().unwrap_or(usize::MAX);

    let mut nodes: Vec<NodeId> = frag.nodes().collect();
    nodes.sort_by_key(|&n| (frag.is_hydrogen(n), rank_of(n)));

    let opts = CompareOptions::for_level(ComparisonLevel::Exact);
    let connector_key = |c: ConnectorId| {
        let mut ends: Vec<usize> = frag
            .connected_objs(c)
            .iter()
            .filter_map(|&o| match o {
                ObjId::Node(n) => Some(rank_of(n)),
                ObjId::Connector(_) => None,
            })
            .collect();
        ends.sort_unstable();
        let priority = priority_value(Some(StructObj::Connector(frag, c)), &opts).packed();
        (frag.is_connector_to_hydrogen(c), ends, priority)
    };
    let mut connectors: Vec<ConnectorId> = frag.connectors().collect();
    connectors.sort_by_cached_key(|&c| connector_key(c));

    if !frag.reorder(nodes, connectors) {
        tracing::warn!("canonical order rejected; fragment left unchanged");
    }
    tracing::trace!(nodes = frag.node_count(), "canonicalized fragment");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::BondOrder;
    use crate::node::Node;

    fn elements(frag: &Fragment) -> Vec<Option<u8>> {
        frag.nodes()
            .map(|n| frag.node(n).and_then(Node::atomic_number))
            .collect()
    }

    #[test]
    fn empty_fragment() {
        assert!(canonical_ranks(&Fragment::new()).is_empty());
    }

    #[test]
    fn single_atom() {
        let frag = Fragment::from_atoms(&[6], &[]).unwrap();
        let ranks = canonical_ranks(&frag);
        assert_eq!(ranks.get(&NodeId::new(0)), Some(&0));
    }

    #[test]
    fn ranks_are_a_total_order_for_symmetric_rings() {
        let bonds: Vec<_> = (0..6).map(|i| (i, (i + 1) % 6, BondOrder::Aromatic)).collect();
        let frag = Fragment::from_atoms(&[6; 6], &bonds).unwrap();
        let mut ranks: Vec<usize> = canonical_ranks(&frag).into_values().collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn order_is_independent_of_insertion_order() {
        // Ethanol built from either end.
        let mut a = Fragment::from_atoms(
            &[6, 6, 8],
            &[(0, 1, BondOrder::Single), (1, 2, BondOrder::Single)],
        )
        .unwrap();
        let mut b = Fragment::from_atoms(
            &[8, 6, 6],
            &[(0, 1, BondOrder::Single), (1, 2, BondOrder::Single)],
        )
        .unwrap();
        canonicalize(&mut a);
        canonicalize(&mut b);
        assert_eq!(elements(&a), elements(&b));

        let bond_ends = |f: &Fragment| -> Vec<Vec<Option<u8>>> {
            f.connectors()
                .map(|c| {
                    f.connected_objs(c)
                        .iter()
                        .map(|&o| match o {
                            ObjId::Node(n) => f.node(n).and_then(Node::atomic_number),
                            ObjId::Connector(_) => None,
                        })
                        .collect()
                })
                .map(|mut v: Vec<_>| {
                    v.sort();
                    v
                })
                .collect()
        };
        assert_eq!(bond_ends(&a), bond_ends(&b));
    }

    #[test]
    fn hydrogens_go_last_and_handles_are_stable() {
        let mut frag = Fragment::new();
        let h = frag.add_node(Node::atom(1));
        let c = frag.add_node(Node::atom(6));
        let o = frag.add_node(Node::atom(8));
        frag.add_bond(h, c, BondOrder::Single).unwrap();
        frag.add_bond(c, o, BondOrder::Single).unwrap();
        canonicalize(&mut frag);

        let order: Vec<_> = frag.nodes().collect();
        assert_eq!(order.last(), Some(&h));
        assert_eq!(frag.node(o).unwrap().atomic_number(), Some(8));
        let last_conn = frag.connectors().last().unwrap();
        assert!(frag.is_connector_to_hydrogen(last_conn));
    }
}
