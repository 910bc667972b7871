use std::sync::OnceLock;

use serde::Deserialize;

use molperceive::{find_sub_structure, BondOrder, Fragment, RingSearchOptions, SearchOptions};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn init_test_logger() {
    static INIT: OnceLock<()> = OnceLock::new();
    let _ = INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Deserialize)]
struct Structure {
    atoms: Vec<u8>,
    bonds: Vec<(usize, usize, BondOrder)>,
}

impl Structure {
    fn build(&self) -> Fragment {
        Fragment::from_atoms(&self.atoms, &self.bonds).unwrap()
    }
}

// ---------------------------------------------------------------------------
// 1. Ring perception
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RingEntry {
    name: String,
    #[serde(flatten)]
    structure: Structure,
    cycle_blocks: usize,
    all_rings: Option<usize>,
    sssr_sizes: Vec<usize>,
    ring_nodes: usize,
}

#[test]
fn approval_rings() {
    init_test_logger();

    let data: Vec<RingEntry> =
        serde_json::from_str(include_str!("approval_data/rings.json")).unwrap();

    let mut failures = Vec::new();
    for entry in &data {
        let frag = entry.structure.build();
        let info = frag.ring_info().unwrap();

        if info.cycle_blocks().len() != entry.cycle_blocks {
            failures.push(format!(
                "[blocks] {}: expected {}, got {}",
                entry.name,
                entry.cycle_blocks,
                info.cycle_blocks().len()
            ));
        }

        if let Some(expected) = entry.all_rings {
            let got = info.all_rings().len();
            if got != expected {
                failures.push(format!(
                    "[all_rings] {}: expected {expected}, got {got}",
                    entry.name
                ));
            }
        }

        let mut sizes: Vec<usize> = info.sssr_rings().iter().map(|r| r.size()).collect();
        sizes.sort_unstable();
        if sizes != entry.sssr_sizes {
            failures.push(format!(
                "[sssr] {}: expected {:?}, got {:?}",
                entry.name, entry.sssr_sizes, sizes
            ));
        }

        let ring_nodes = frag.nodes().filter(|&n| info.is_ring_node(&n.into())).count();
        if ring_nodes != entry.ring_nodes {
            failures.push(format!(
                "[ring_nodes] {}: expected {}, got {}",
                entry.name, entry.ring_nodes, ring_nodes
            ));
        }

        // A cached analysis must agree with a fresh one.
        let fresh = molperceive::analysis_rings(&frag, &RingSearchOptions::default()).unwrap();
        if fresh != *info {
            failures.push(format!("[cache] {}: cached analysis differs", entry.name));
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} ring failures:\n{}",
            failures.len(),
            failures.join("\n")
        );
    }
}

// ---------------------------------------------------------------------------
// 2. Substructure search
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SearchEntry {
    name: String,
    query: Structure,
    target: Structure,
    options: SearchOptions,
    expected: Option<usize>,
}

#[test]
fn approval_search() {
    init_test_logger();

    let data: Vec<SearchEntry> =
        serde_json::from_str(include_str!("approval_data/search.json")).unwrap();

    let mut failures = Vec::new();
    for entry in &data {
        let query = entry.query.build();
        let target = entry.target.build();
        let got = find_sub_structure(&query, &target, &entry.options).map(|m| m.len());
        if got != entry.expected {
            failures.push(format!(
                "[search] {}: expected {:?}, got {:?}",
                entry.name, entry.expected, got
            ));
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} search failures:\n{}",
            failures.len(),
            failures.join("\n")
        );
    }
}

// ---------------------------------------------------------------------------
// 3. Cross-module properties
// ---------------------------------------------------------------------------

#[test]
fn every_structure_contains_itself() {
    init_test_logger();

    let data: Vec<RingEntry> =
        serde_json::from_str(include_str!("approval_data/rings.json")).unwrap();

    for entry in &data {
        let frag = entry.structure.build();
        let expected = frag.non_hydrogen_nodes().len() + frag.non_hydrogen_connectors().len();
        let got = find_sub_structure(&frag, &frag, &SearchOptions::default()).map(|m| m.len());
        assert_eq!(got, Some(expected), "{}", entry.name);
    }
}
