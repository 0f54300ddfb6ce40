//! Nested check detection and chain construction.
//!
//! Two checks are nested when the larger interval is close to 2, 3 or 4
//! times the smaller one; the smaller check's work can then ride along with
//! the larger check. Pairwise relationships are linked into chains that walk
//! upward in scale.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use crate::model::{NestedChain, NestedRelationship};

/// Fixed ×3 window, inclusive.
pub const TRIPLE_WINDOW: (f64, f64) = (2.7, 3.3);
/// Fixed ×4 window, inclusive.
pub const QUADRUPLE_WINDOW: (f64, f64) = (3.6, 4.4);

fn within(ratio: f64, (min, max): (f64, f64)) -> bool {
    min <= ratio && ratio <= max
}

/// Integer multiple whose window contains `ratio`, if any.
///
/// The ×2 window is configurable; config validation keeps it below the ×3
/// window so the windows never overlap.
pub fn classify_ratio(ratio: f64, double_window: (f64, f64)) -> Option<u8> {
    if within(ratio, double_window) {
        Some(2)
    } else if within(ratio, TRIPLE_WINDOW) {
        Some(3)
    } else if within(ratio, QUADRUPLE_WINDOW) {
        Some(4)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedDetection {
    pub relationships: Vec<NestedRelationship>,
    /// Distinct groups appearing as the small side of a relationship.
    pub nested_groups: usize,
    /// `nested_groups / total groups`, zero when there are no groups.
    pub reduction_ratio: f64,
}

/// Every `(i, j)` with `i < j` whose ratio lands in a multiple window.
///
/// Output is ordered by `i`, then `j`.
pub fn detect_nested(centers: &[f64], double_window: (f64, f64)) -> NestedDetection {
    let mut relationships = Vec::new();

    for (i, &small) in centers.iter().enumerate() {
        for (j, &large) in centers.iter().enumerate().skip(i + 1) {
            let ratio = large / small;
            if let Some(multiple) = classify_ratio(ratio, double_window) {
                relationships.push(NestedRelationship {
                    small_group: i,
                    small_center: small,
                    large_group: j,
                    large_center: large,
                    ratio,
                    multiple,
                });
            }
        }
    }

    let nested_groups = relationships
        .iter()
        .map(|r| r.small_group)
        .collect::<BTreeSet<_>>()
        .len();
    let reduction_ratio = if centers.is_empty() {
        0.0
    } else {
        nested_groups as f64 / centers.len() as f64
    };

    NestedDetection {
        relationships,
        nested_groups,
        reduction_ratio,
    }
}

/// Link relationships into chains.
///
/// Roots are groups that are a small side but never a large side, visited in
/// ascending index order. From each root the walk follows the outgoing edge
/// with the largest target center and stops at a dead end, at a node already
/// in the chain, or at a node already claimed by an earlier chain. Chains
/// shorter than two are dropped.
///
/// Terminates on any input, including cyclic edge sets: every step adds a
/// node not yet in the chain.
pub fn build_nested_chains(relationships: &[NestedRelationship]) -> Vec<NestedChain> {
    if relationships.is_empty() {
        return Vec::new();
    }

    let large_side: HashSet<usize> = relationships.iter().map(|r| r.large_group).collect();
    let roots: BTreeSet<usize> = relationships
        .iter()
        .map(|r| r.small_group)
        .filter(|g| !large_side.contains(g))
        .collect();

    let mut chains = Vec::new();
    let mut processed: HashSet<usize> = HashSet::new();

    for root in roots {
        if processed.contains(&root) {
            continue;
        }

        let mut chain = vec![root];
        let mut current = root;

        loop {
            // First maximum in relationship order wins ties.
            let next = relationships
                .iter()
                .filter(|r| r.small_group == current)
                .reduce(|best, r| if r.cmp_large_center(best).is_gt() { r } else { best });

            let Some(edge) = next else { break };
            let target = edge.large_group;
            if chain.contains(&target) || processed.contains(&target) {
                break;
            }

            chain.push(target);
            current = target;
        }

        if chain.len() >= 2 {
            processed.extend(chain.iter().copied());
            chains.push(chain);
        }
    }

    chains
}
