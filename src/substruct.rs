//! Substructure search over flattened structures.
//!
//! The matcher grows a mapping from one query node outward. Each step pairs a
//! query object with a target object that compares equal, checks that
//! already-paired neighbours line up, then pairs the remaining neighbours.
//! The partial mapping is copied on every extension, so a failed branch never
//! disturbs its caller; sibling branches also do not see each other's pairs,
//! which is why results are de-duplicated at the end.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::compare::{
    compare, compare_structures, resolve_compare_options, CompareOptions, CompareOverrides,
    ComparisonLevel, StructObj,
};
use crate::config::Config;
use crate::flatten::flatten;
use crate::fragment::{ConnectorId, Fragment, NodeId, ObjId, ObjPath};
use crate::standardize::{standardized, DefaultStandardizer, StandardizeOptions, Standardizer};

/// How the query neighbours of a matched pair are assigned to target
/// neighbours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorAssignment {
    /// Each query neighbour takes the first target neighbour that matches;
    /// a choice is never revisited. Fast, but can miss embeddings when an
    /// early choice blocks a later sibling.
    #[default]
    Greedy,
    /// Backtrack over neighbour pairings until every query neighbour is
    /// placed.
    Exhaustive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Require the whole query to equal the whole target.
    pub exact_match: bool,
    /// Standardize both structures first. `None` follows the global default.
    pub do_standardize: Option<bool>,
    pub strategy: ConnectorAssignment,
    #[serde(flatten)]
    pub compare: CompareOverrides,
}

impl SearchOptions {
    pub fn with_level(level: ComparisonLevel) -> Self {
        Self {
            compare: CompareOverrides::level(level),
            ..Self::default()
        }
    }

    /// Comparison switches for the non-exact search.
    ///
    /// The level defaults to constitution, and connectivity counts are off
    /// unless the caller turns them on: a target may carry substituents the
    /// query does not have.
    pub fn search_compare_options(&self) -> CompareOptions {
        let user = &self.compare;
        CompareOverrides {
            linked_connector_count: Some(user.linked_connector_count.unwrap_or(false)),
            hydrogen_count: Some(user.hydrogen_count.unwrap_or(false)),
            connected_obj_count: Some(user.connected_obj_count.unwrap_or(false)),
            ..*user
        }
        .resolve(ComparisonLevel::Constitution)
    }

    fn standardize_enabled(&self) -> bool {
        self.do_standardize
            .unwrap_or(Config::global().structure_search.do_standardize)
    }
}

/// Target objects covered by a match, addressed in the caller's target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstructureMatch {
    pub objects: Vec<ObjPath<ObjId>>,
}

impl SubstructureMatch {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ObjPath<ObjId>> + '_ {
        self.objects
            .iter()
            .filter(|p| matches!(p.id, ObjId::Node(_)))
    }

    pub fn connectors(&self) -> impl Iterator<Item = &ObjPath<ObjId>> + '_ {
        self.objects
            .iter()
            .filter(|p| matches!(p.id, ObjId::Connector(_)))
    }

    pub fn contains(&self, path: &ObjPath<ObjId>) -> bool {
        self.objects.contains(path)
    }
}

/// Find `query` inside `target` with the default standardizer.
///
/// Returns `None` when there is no embedding, including when either side
/// has no topology.
pub fn find_sub_structure(
    query: &Fragment,
    target: &Fragment,
    options: &SearchOptions,
) -> Option<SubstructureMatch> {
    find_sub_structure_with(query, target, options, &DefaultStandardizer)
}

/// [`find_sub_structure`] with a caller-supplied standardizer.
pub fn find_sub_structure_with(
    query: &Fragment,
    target: &Fragment,
    options: &SearchOptions,
    standardizer: &dyn Standardizer,
) -> Option<SubstructureMatch> {
    if !query.has_topology() || !target.has_topology() {
        return None;
    }
    if options.exact_match {
        return exact_match(query, target, options, standardizer);
    }

    let opts = options.search_compare_options();
    // Standardize after flattening so rings inside sub-groups are seen whole.
    let mut flat_query = flatten(query);
    let mut flat_target = flatten(target);
    if options.standardize_enabled() {
        let std_opts = StandardizeOptions {
            do_canonicalization: opts.stereo,
            do_aromatic_perception: true,
        };
        standardizer.standardize(&mut flat_query.fragment, &std_opts);
        standardizer.standardize(&mut flat_target.fragment, &std_opts);
    }

    let seed = *flat_query.fragment.non_hydrogen_nodes().first()?;
    let matcher = Matcher {
        query: &flat_query.fragment,
        target: &flat_target.fragment,
        opts,
        strategy: options.strategy,
    };

    let matched = flat_target
        .fragment
        .non_hydrogen_nodes()
        .into_iter()
        .find_map(|candidate| {
            let found = matcher.match_node(seed, candidate, &MatchState::default());
            if found.is_some() {
                tracing::debug!(seed = seed.index(), target = candidate.index(), "seed matched");
            }
            found
        });
    let Some(matched) = matched else {
        tracing::debug!("no substructure match");
        return None;
    };

    let mut seen = HashSet::new();
    let objects: Vec<ObjPath<ObjId>> = matched
        .into_iter()
        .filter(|obj| seen.insert(*obj))
        .filter_map(|obj| flat_target.origin(obj))
        .collect();
    tracing::debug!(objects = objects.len(), "substructure found");
    Some(SubstructureMatch { objects })
}

fn exact_match(
    query: &Fragment,
    target: &Fragment,
    options: &SearchOptions,
    standardizer: &dyn Standardizer,
) -> Option<SubstructureMatch> {
    let opts = resolve_compare_options(&options.compare);
    let std_opts = StandardizeOptions {
        do_canonicalization: true,
        do_aromatic_perception: options.standardize_enabled(),
    };
    let flat_query = standardized(&flatten(query).fragment, standardizer, &std_opts);
    let flat_target = standardized(&flatten(target).fragment, standardizer, &std_opts);

    let same = compare_structures(
        StructObj::Fragment(&flat_target),
        StructObj::Fragment(&flat_query),
        &opts,
    );
    if !matches!(same, Ok(Ordering::Equal)) {
        tracing::debug!("structures differ");
        return None;
    }
    let objects = target
        .nodes()
        .map(|n| ObjPath::from(ObjId::Node(n)))
        .chain(target.connectors().map(|c| ObjPath::from(ObjId::Connector(c))))
        .collect();
    Some(SubstructureMatch { objects })
}

/// Parallel lists of paired objects; position `i` of one list is the
/// partner of position `i` of the other.
#[derive(Debug, Clone, Default)]
struct MatchState {
    query: Vec<ObjId>,
    target: Vec<ObjId>,
}

impl MatchState {
    fn extended(&self, q: ObjId, t: ObjId) -> Self {
        let mut next = self.clone();
        next.query.push(q);
        next.target.push(t);
        next
    }

    /// Every paired query neighbour must sit at a position shared by some
    /// paired target neighbour.
    fn neighbours_agree(&self, q_paired: &[ObjId], t_paired: &[ObjId]) -> bool {
        if q_paired.len() > t_paired.len() {
            return false;
        }
        let t_positions: Vec<Option<usize>> = t_paired
            .iter()
            .map(|o| self.target.iter().position(|x| x == o))
            .collect();
        q_paired.iter().all(|o| {
            let pos = self.query.iter().position(|x| x == o);
            t_positions.contains(&pos)
        })
    }
}

/// Objects a connector joins, followed by connectors that join it, so a
/// multi-center connector is reachable from either side.
fn connector_neighbours(frag: &Fragment, id: ConnectorId) -> Vec<ObjId> {
    frag.connected_objs(id)
        .iter()
        .copied()
        .chain(
            frag.linked_non_hydrogen_connectors(id.into())
                .into_iter()
                .map(ObjId::from),
        )
        .collect()
}

struct Matcher<'a> {
    query: &'a Fragment,
    target: &'a Fragment,
    opts: CompareOptions,
    strategy: ConnectorAssignment,
}

impl Matcher<'_> {
    fn match_node(&self, q: NodeId, t: NodeId, state: &MatchState) -> Option<Vec<ObjId>> {
        let ord = compare(
            Some(StructObj::Node(self.query, q)),
            Some(StructObj::Node(self.target, t)),
            &self.opts,
        );
        if ord != Ordering::Equal {
            tracing::trace!(q = q.index(), t = t.index(), "node rejected");
            return None;
        }
        let q_conns: Vec<ObjId> = self
            .query
            .linked_non_hydrogen_connectors(q.into())
            .into_iter()
            .map(ObjId::from)
            .collect();
        let t_conns: Vec<ObjId> = self
            .target
            .linked_non_hydrogen_connectors(t.into())
            .into_iter()
            .map(ObjId::from)
            .collect();
        if q_conns.len() > t_conns.len() {
            return None;
        }
        let state = state.extended(q.into(), t.into());
        let tail = self.extend(&state, q_conns, t_conns)?;
        Some(std::iter::once(ObjId::from(t)).chain(tail).collect())
    }

    fn match_connector(
        &self,
        q: ConnectorId,
        t: ConnectorId,
        state: &MatchState,
    ) -> Option<Vec<ObjId>> {
        let ord = compare(
            Some(StructObj::Connector(self.query, q)),
            Some(StructObj::Connector(self.target, t)),
            &self.opts,
        );
        if ord != Ordering::Equal {
            tracing::trace!(q = q.index(), t = t.index(), "connector rejected");
            return None;
        }
        let q_objs = connector_neighbours(self.query, q);
        let t_objs = connector_neighbours(self.target, t);
        if q_objs.len() > t_objs.len() {
            return None;
        }
        let state = state.extended(q.into(), t.into());
        let tail = self.extend(&state, q_objs, t_objs)?;
        Some(std::iter::once(ObjId::from(t)).chain(tail).collect())
    }

    /// Check the already-paired neighbours, then pair the rest.
    fn extend(
        &self,
        state: &MatchState,
        q_neighbours: Vec<ObjId>,
        t_neighbours: Vec<ObjId>,
    ) -> Option<Vec<ObjId>> {
        let (q_paired, q_rest): (Vec<ObjId>, Vec<ObjId>) =
            q_neighbours.into_iter().partition(|o| state.query.contains(o));
        let (t_paired, t_rest): (Vec<ObjId>, Vec<ObjId>) =
            t_neighbours.into_iter().partition(|o| state.target.contains(o));
        if !state.neighbours_agree(&q_paired, &t_paired) || q_rest.len() > t_rest.len() {
            return None;
        }
        match self.strategy {
            ConnectorAssignment::Greedy => self.assign_greedy(state, &q_rest, t_rest),
            ConnectorAssignment::Exhaustive => self.assign_exhaustive(state, &q_rest, &t_rest),
        }
    }

    fn assign_greedy(
        &self,
        state: &MatchState,
        q_rest: &[ObjId],
        mut pool: Vec<ObjId>,
    ) -> Option<Vec<ObjId>> {
        let mut out = Vec::new();
        for &q in q_rest {
            let (i, found) = pool
                .iter()
                .enumerate()
                .find_map(|(i, &t)| self.match_obj(q, t, state).map(|r| (i, r)))?;
            pool.remove(i);
            out.extend(found);
        }
        Some(out)
    }

    fn assign_exhaustive(
        &self,
        state: &MatchState,
        q_rest: &[ObjId],
        pool: &[ObjId],
    ) -> Option<Vec<ObjId>> {
        let Some((&q, rest)) = q_rest.split_first() else {
            return Some(Vec::new());
        };
        for (i, &t) in pool.iter().enumerate() {
            let Some(mut found) = self.match_obj(q, t, state) else {
                continue;
            };
            let mut remaining = pool.to_vec();
            remaining.remove(i);
            if let Some(tail) = self.assign_exhaustive(state, rest, &remaining) {
                found.extend(tail);
                return Some(found);
            }
        }
        None
    }

    /// Pair two objects of the same class; nodes of different kinds and
    /// connectors of different classes never pair.
    fn match_obj(&self, q: ObjId, t: ObjId, state: &MatchState) -> Option<Vec<ObjId>> {
        match (q, t) {
            (ObjId::Node(qn), ObjId::Node(tn)) => {
                let same_kind = self.query.node(qn)?.tag() == self.target.node(tn)?.tag();
                if !same_kind {
                    return None;
                }
                self.match_node(qn, tn, state)
            }
            (ObjId::Connector(qc), ObjId::Connector(tc)) => {
                let same_class =
                    self.query.connector(qc)?.class() == self.target.connector(tc)?.class();
                if !same_class {
                    return None;
                }
                self.match_connector(qc, tc, state)
            }
            _ => None,
        }
    }
}
