pub mod aromaticity;
pub mod canonical;
pub mod compare;
pub mod config;
pub mod connector;
pub mod error;
pub mod flatten;
pub mod fragment;
pub mod graph;
pub mod node;
pub mod rings;
pub mod standardize;
pub mod substruct;

pub use aromaticity::{find_aromatic_rings, perceive_aromaticity};
pub use canonical::{canonical_ranks, canonicalize};
pub use compare::{
    compare, compare_structures, priority_value, resolve_compare_options, CompareOptions,
    CompareOverrides, ComparisonLevel, PriorityValue, StructObj,
};
pub use config::{Config, SearchDefaults};
pub use connector::{BondOrder, BondType, Connector, ConnectorClass, ConnectorKind};
pub use error::StructureError;
pub use flatten::{flatten, Flattened};
pub use fragment::{ConnectorId, ConnectorPath, Fragment, NodeId, NodePath, ObjId, ObjPath};
pub use graph::{build_graph, GraphOptions, StructureGraph};
pub use node::{FragmentClass, NestedStructure, Node, NodeKind, NodeTag, Parity};
pub use rings::{
    analysis_rings, find_all_rings, find_cycle_blocks, find_sssr, CycleBlock, Ring, RingInfo,
    RingSearchOptions,
};
pub use standardize::{standardized, DefaultStandardizer, StandardizeOptions, Standardizer};
pub use substruct::{
    find_sub_structure, find_sub_structure_with, ConnectorAssignment, SearchOptions,
    SubstructureMatch,
};
