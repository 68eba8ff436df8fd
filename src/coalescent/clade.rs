use crate::types::VertexId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Size of the subtree below a vertex and how many probands it holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CladeStats {
    /// Vertices in the subtree, the vertex itself included
    pub size: usize,
    /// Sink vertices in the subtree
    pub probands: usize,
}

/// Internal vertex maximising `metric`; ties go to the lowest id
pub(crate) fn largest_by<F>(stats: &BTreeMap<VertexId, CladeStats>, metric: F) -> Option<VertexId>
where
    F: Fn(&CladeStats) -> usize,
{
    let mut best: Option<(VertexId, usize)> = None;
    // BTreeMap iterates in ascending id order, so a strict comparison keeps the lowest id
    for (&vertex, clade) in stats {
        if clade.size < 2 {
            continue;
        }
        let value = metric(clade);
        if best.map_or(true, |(_, best_value)| value > best_value) {
            best = Some((vertex, value));
        }
    }
    best.map(|(vertex, _)| vertex)
}
