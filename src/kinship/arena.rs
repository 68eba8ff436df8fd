//! Dense, level-ordered vertex records used by the kinship recurrences

use crate::error::{Error, Result};
use crate::genealogy::GenealogicalGraph;
use crate::types::VertexId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub(crate) struct VertexRecord {
    pub id: VertexId,
    pub parents: [Option<u32>; 2],
    /// Children inside the arena only
    pub children: Vec<u32>,
}

impl VertexRecord {
    pub fn parent_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.parents.iter().flatten().copied()
    }
}

/// Vertices of an ancestor-closed set, indexed densely in `(level, id)` order.
///
/// Because parents always sit on a lower level than their children, every parent
/// index is smaller than the index of its child.
#[derive(Debug, Clone)]
pub(crate) struct KinshipArena {
    records: Vec<VertexRecord>,
    index: HashMap<VertexId, u32>,
}

impl KinshipArena {
    /// Builds the arena over `vertices`, which must contain every ancestor of its members
    pub fn build(graph: &GenealogicalGraph, vertices: &HashSet<VertexId>) -> Result<Self> {
        let mut ordered = Vec::with_capacity(vertices.len());
        for &vertex in vertices {
            ordered.push((graph.vertex_level(vertex)?, vertex));
        }
        ordered.sort_unstable();

        let index: HashMap<VertexId, u32> = ordered
            .iter()
            .enumerate()
            .map(|(position, &(_, vertex))| (vertex, position as u32))
            .collect();

        let mut records = Vec::with_capacity(ordered.len());
        for &(_, vertex) in &ordered {
            let parent_ids = graph.parents(vertex)?;
            if parent_ids.len() > 2 {
                return Err(Error::structural(format!(
                    "kinship requires at most two parents, vertex {} has {}",
                    vertex,
                    parent_ids.len()
                )));
            }

            let mut parents = [None, None];
            for (slot, parent) in parents.iter_mut().zip(&parent_ids) {
                let parent_index = index.get(parent).copied().ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "parent {} of vertex {} is outside the kinship vertex set",
                        parent, vertex
                    ))
                })?;
                *slot = Some(parent_index);
            }

            let children = graph
                .children(vertex)?
                .iter()
                .filter_map(|child| index.get(child).copied())
                .collect();

            records.push(VertexRecord {
                id: vertex,
                parents,
                children,
            });
        }

        Ok(Self { records, index })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn record(&self, position: u32) -> &VertexRecord {
        &self.records[position as usize]
    }

    pub fn index_of(&self, vertex: VertexId) -> Option<u32> {
        self.index.get(&vertex).copied()
    }

    pub fn id_of(&self, position: u32) -> VertexId {
        self.records[position as usize].id
    }
}
