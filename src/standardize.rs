use serde::{Deserialize, Serialize};

use crate::aromaticity::perceive_aromaticity;
use crate::canonical::canonicalize;
use crate::fragment::Fragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardizeOptions {
    pub do_canonicalization: bool,
    pub do_aromatic_perception: bool,
}

impl Default for StandardizeOptions {
    fn default() -> Self {
        Self {
            do_canonicalization: true,
            do_aromatic_perception: true,
        }
    }
}

/// Normalizes a structure in place before comparison or search.
///
/// Implementations must keep every node and connector handle valid: only
/// iteration order and object attributes may change.
pub trait Standardizer {
    fn standardize(&self, fragment: &mut Fragment, options: &StandardizeOptions);
}

/// Aromaticity perception followed by canonical ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStandardizer;

impl Standardizer for DefaultStandardizer {
    fn standardize(&self, fragment: &mut Fragment, options: &StandardizeOptions) {
        if options.do_aromatic_perception {
            perceive_aromaticity(fragment);
        }
        if options.do_canonicalization {
            canonicalize(fragment);
        }
    }
}

/// Standardize a copy of `fragment`.
pub fn standardized(
    fragment: &Fragment,
    standardizer: &dyn Standardizer,
    options: &StandardizeOptions,
) -> Fragment {
    let mut copy = fragment.clone();
    standardizer.standardize(&mut copy, options);
    copy
}
