use crate::error::{Error, Result};
use crate::genealogy::graph::GenealogicalGraph;
use crate::types::VertexId;
use petgraph::unionfind::UnionFind;
use petgraph::visit::NodeIndexable;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::debug;

/// Graph traversal utilities for genealogy analysis
pub struct GraphTraversal;

impl GraphTraversal {
    /// Breadth-first search collecting every vertex reachable from the seeds.
    ///
    /// Each vertex is enqueued at most once, so converging lines of descent through
    /// shared ancestors are visited a single time.
    pub fn bfs_reachable(
        graph: &GenealogicalGraph,
        seeds: &[VertexId],
        direction: TraversalDirection,
    ) -> Result<HashSet<VertexId>> {
        let mut visited = HashSet::with_capacity(seeds.len());
        let mut queue = VecDeque::with_capacity(seeds.len());

        for &seed in seeds {
            let index = graph.index_of(seed)?;
            if visited.insert(seed) {
                queue.push_back(index);
            }
        }

        let petgraph_direction = direction.into();
        while let Some(current) = queue.pop_front() {
            for neighbor in graph.petgraph().neighbors_directed(current, petgraph_direction) {
                if visited.insert(graph.vertex_at(neighbor)) {
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(visited)
    }

    /// Weakly connected components, each sorted by id, ordered by their smallest member
    pub fn connected_components(graph: &GenealogicalGraph) -> Vec<Vec<VertexId>> {
        let inner = graph.petgraph();
        let mut sets = UnionFind::<usize>::new(inner.node_bound());
        for edge in inner.edge_indices() {
            if let Some((source, target)) = inner.edge_endpoints(edge) {
                sets.union(source.index(), target.index());
            }
        }

        let mut grouped: BTreeMap<usize, Vec<VertexId>> = BTreeMap::new();
        for index in inner.node_indices() {
            grouped
                .entry(sets.find(index.index()))
                .or_default()
                .push(inner[index]);
        }

        let mut components: Vec<Vec<VertexId>> = grouped
            .into_values()
            .map(|mut component| {
                component.sort_unstable();
                component
            })
            .collect();
        components.sort_unstable_by_key(|component| component[0]);

        debug!("Found {} connected components", components.len());
        components
    }
}

/// Direction of a genealogy walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    /// Towards parents
    Ancestors,
    /// Towards children
    Descendants,
}

impl From<TraversalDirection> for Direction {
    fn from(direction: TraversalDirection) -> Self {
        match direction {
            TraversalDirection::Ancestors => Direction::Incoming,
            TraversalDirection::Descendants => Direction::Outgoing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub total_vertices: usize,
    pub total_edges: usize,
    pub founders: usize,
    pub sinks: usize,
    pub depth: usize,
    pub average_degree: f64,
}

impl GenealogicalGraph {
    /// Every seed together with all of its ancestors
    pub fn ascending_vertices(&self, seeds: &[VertexId]) -> Result<HashSet<VertexId>> {
        GraphTraversal::bfs_reachable(self, seeds, TraversalDirection::Ancestors)
    }

    /// Induced subgraph on the seeds and their ancestors, as a new graph
    pub fn ascending_subgraph(&self, seeds: &[VertexId]) -> Result<GenealogicalGraph> {
        let ascending = self.ascending_vertices(seeds)?;
        debug!(
            "Ascending genealogy of {} seeds has {} vertices",
            seeds.len(),
            ascending.len()
        );
        Ok(self.induced_subgraph(&ascending))
    }

    /// In-place variant of [`ascending_subgraph`](Self::ascending_subgraph).
    /// Returns the number of removed vertices.
    pub fn reduce_to_ascending_subgraph(&mut self, seeds: &[VertexId]) -> Result<usize> {
        let ascending = self.ascending_vertices(seeds)?;
        Ok(self.reduce_to_subgraph(&ascending))
    }

    /// Ascending genealogy grouped by the vertices' levels in this graph
    pub fn ascending_by_levels(&self, seeds: &[VertexId]) -> Result<Vec<Vec<VertexId>>> {
        let ascending = self.ascending_vertices(seeds)?;
        let mut grouped: Vec<Vec<VertexId>> = Vec::new();
        for level in self.levels()? {
            let retained: Vec<VertexId> = level
                .iter()
                .filter(|vertex| ascending.contains(vertex))
                .copied()
                .collect();
            if retained.is_empty() {
                break;
            }
            grouped.push(retained);
        }
        Ok(grouped)
    }

    /// All strict descendants of the vertex, ascending by id
    pub fn descendants(&self, vertex: VertexId) -> Result<Vec<VertexId>> {
        self.strict_closure(vertex, TraversalDirection::Descendants)
    }

    /// All strict ancestors of the vertex, ascending by id
    pub fn ancestors(&self, vertex: VertexId) -> Result<Vec<VertexId>> {
        self.strict_closure(vertex, TraversalDirection::Ancestors)
    }

    pub fn connected_components(&self) -> Vec<Vec<VertexId>> {
        GraphTraversal::connected_components(self)
    }

    /// The weakly connected component containing the vertex, ascending by id
    pub fn connected_component_of(&self, vertex: VertexId) -> Result<Vec<VertexId>> {
        let index = self.index_of(vertex)?;
        let inner = self.petgraph();
        let mut visited = HashSet::from([vertex]);
        let mut queue = VecDeque::from([index]);

        while let Some(current) = queue.pop_front() {
            for neighbor in inner.neighbors_undirected(current) {
                if visited.insert(inner[neighbor]) {
                    queue.push_back(neighbor);
                }
            }
        }

        let mut component: Vec<VertexId> = visited.into_iter().collect();
        component.sort_unstable();
        Ok(component)
    }

    pub fn statistics(&self) -> Result<GraphStatistics> {
        let total_vertices = self.vertex_count();
        let total_edges = self.edge_count();
        // Every edge adds one to an in-degree and one to an out-degree
        let average_degree = if total_vertices > 0 {
            (2 * total_edges) as f64 / total_vertices as f64
        } else {
            0.0
        };

        Ok(GraphStatistics {
            total_vertices,
            total_edges,
            founders: self.founders().len(),
            sinks: self.sinks().len(),
            depth: self.levels()?.len(),
            average_degree,
        })
    }

    fn strict_closure(&self, vertex: VertexId, direction: TraversalDirection) -> Result<Vec<VertexId>> {
        let mut reachable = GraphTraversal::bfs_reachable(self, &[vertex], direction)?;
        reachable.remove(&vertex);
        let mut reachable: Vec<VertexId> = reachable.into_iter().collect();
        reachable.sort_unstable();
        Ok(reachable)
    }
}

/// Rejects an empty seed list for operations where it would be meaningless
pub(crate) fn require_seeds(seeds: &[VertexId]) -> Result<()> {
    if seeds.is_empty() {
        return Err(Error::InvalidArgument("at least one seed vertex is required".to_string()));
    }
    Ok(())
}
