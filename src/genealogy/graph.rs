use crate::error::{Error, Result};
use crate::types::VertexId;
use once_cell::unsync::OnceCell;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Default number of parents a vertex may have (biological parents).
pub const DEFAULT_MAX_PARENTS: usize = 2;

/// Edge payload. `length` is the branch length in generations or time units, when known.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Branch {
    pub length: Option<f64>,
}

impl Branch {
    pub fn with_length(length: f64) -> Self {
        Self { length: Some(length) }
    }

    /// Combines two consecutive branches into one, summing the known lengths
    pub fn join(self, other: Branch) -> Branch {
        match (self.length, other.length) {
            (None, None) => Branch::default(),
            (a, b) => Branch::with_length(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
        }
    }
}

/// Generation depth of every vertex, grouped by level
#[derive(Debug, Clone)]
pub(crate) struct LevelIndex {
    by_vertex: HashMap<VertexId, usize>,
    levels: Vec<Vec<VertexId>>,
}

/// Directed multi-parent graph over individual identifiers.
///
/// An edge `parent -> child` means the parent contributes to the child. The graph
/// keeps two invariants on every mutation: no vertex has more than `max_parents`
/// parents, and the parent relation is acyclic. Levels are computed lazily and the
/// cache is dropped by any mutating call.
#[derive(Debug, Clone)]
pub struct GenealogicalGraph {
    graph: StableDiGraph<VertexId, Branch>,
    node_map: HashMap<VertexId, NodeIndex>,
    max_parents: usize,
    levels: OnceCell<LevelIndex>,
}

impl Default for GenealogicalGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl GenealogicalGraph {
    pub fn new() -> Self {
        Self::with_max_parents(DEFAULT_MAX_PARENTS)
    }

    pub fn with_max_parents(max_parents: usize) -> Self {
        Self {
            graph: StableDiGraph::new(),
            node_map: HashMap::new(),
            max_parents,
            levels: OnceCell::new(),
        }
    }

    /// Builds a graph from `(child, parents)` records.
    ///
    /// Parent counts are checked per record; acyclicity is verified once at the end
    /// rather than per edge, which keeps loading linear in the input size.
    pub fn from_records<I>(records: I, max_parents: usize) -> Result<Self>
    where
        I: IntoIterator<Item = (VertexId, Vec<VertexId>)>,
    {
        let mut genealogy = Self::with_max_parents(max_parents);

        for (child, parents) in records {
            let child_index = genealogy.ensure_vertex(child);
            for parent in parents {
                if parent == child {
                    return Err(Error::Cycle(vec![child]));
                }
                let parent_index = genealogy.ensure_vertex(parent);
                if genealogy.graph.contains_edge(parent_index, child_index) {
                    continue;
                }
                genealogy.check_parent_capacity(child, child_index)?;
                genealogy.graph.add_edge(parent_index, child_index, Branch::default());
            }
        }

        genealogy.levels()?;
        debug!(
            "Built genealogical graph with {} vertices and {} edges",
            genealogy.vertex_count(),
            genealogy.edge_count()
        );
        Ok(genealogy)
    }

    pub fn max_parents(&self) -> usize {
        self.max_parents
    }

    /// Changes the parent limit; fails if some vertex already exceeds the new limit
    pub fn set_max_parents(&mut self, max_parents: usize) -> Result<()> {
        if !self.verify_max_parents(max_parents) {
            return Err(Error::structural(format!(
                "some vertex has more than {} parents",
                max_parents
            )));
        }
        self.max_parents = max_parents;
        Ok(())
    }

    /// Get the number of vertices in the graph
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        self.node_map.contains_key(&vertex)
    }

    /// All vertices in ascending id order
    pub fn vertices(&self) -> Vec<VertexId> {
        let mut vertices: Vec<VertexId> = self.node_map.keys().copied().collect();
        vertices.sort_unstable();
        vertices
    }

    /// All `(parent, child)` pairs, ordered by child then parent insertion order
    pub fn edges(&self) -> Vec<(VertexId, VertexId)> {
        let mut edges = Vec::with_capacity(self.edge_count());
        for child in self.vertices() {
            let index = self.node_map[&child];
            for parent in self.neighbors(index, Direction::Incoming) {
                edges.push((self.graph[parent], child));
            }
        }
        edges
    }

    /// Adds an isolated vertex. Returns false if the vertex was already present.
    pub fn add_vertex(&mut self, vertex: VertexId) -> bool {
        if self.contains(vertex) {
            return false;
        }
        self.ensure_vertex(vertex);
        true
    }

    /// Adds a `parent -> child` edge, creating missing vertices.
    ///
    /// Adding an edge that already exists is a no-op. Fails with
    /// [`Error::Structural`] when the child already has the maximum number of
    /// parents and with [`Error::Cycle`] when the child is an ancestor of the parent.
    pub fn add_edge(&mut self, parent: VertexId, child: VertexId) -> Result<()> {
        self.add_edge_with_branch(parent, child, Branch::default())
    }

    pub fn add_edge_with_branch(
        &mut self,
        parent: VertexId,
        child: VertexId,
        branch: Branch,
    ) -> Result<()> {
        if parent == child {
            return Err(Error::Cycle(vec![child]));
        }

        let existing_parent = self.node_map.get(&parent).copied();
        let existing_child = self.node_map.get(&child).copied();

        if let (Some(parent_index), Some(child_index)) = (existing_parent, existing_child) {
            if self.graph.contains_edge(parent_index, child_index) {
                return Ok(());
            }
            self.check_parent_capacity(child, child_index)?;
            // Only a child with descendants can reach the parent
            if self.graph.neighbors_directed(child_index, Direction::Outgoing).next().is_some()
                && petgraph::algo::has_path_connecting(&self.graph, child_index, parent_index, None)
            {
                return Err(Error::Cycle(vec![parent, child]));
            }
        } else if let Some(child_index) = existing_child {
            self.check_parent_capacity(child, child_index)?;
        }

        let parent_index = self.ensure_vertex(parent);
        let child_index = self.ensure_vertex(child);
        self.graph.add_edge(parent_index, child_index, branch);
        self.invalidate_levels();
        Ok(())
    }

    /// Adds the given parents for the specified vertex
    pub fn add_parents(&mut self, child: VertexId, parents: &[VertexId]) -> Result<()> {
        for &parent in parents {
            self.add_edge(parent, child)?;
        }
        Ok(())
    }

    /// Adds the children for the specified vertex
    pub fn add_children(&mut self, parent: VertexId, children: &[VertexId]) -> Result<()> {
        for &child in children {
            self.add_edge(parent, child)?;
        }
        Ok(())
    }

    /// Removes the edge and returns its branch data
    pub fn remove_edge(&mut self, parent: VertexId, child: VertexId) -> Result<Branch> {
        let not_found = || Error::EdgeNotFound { parent, child };
        let parent_index = *self.node_map.get(&parent).ok_or_else(not_found)?;
        let child_index = *self.node_map.get(&child).ok_or_else(not_found)?;
        let edge = self.graph.find_edge(parent_index, child_index).ok_or_else(not_found)?;
        let branch = self.graph.remove_edge(edge).ok_or_else(not_found)?;
        self.invalidate_levels();
        Ok(branch)
    }

    /// Removes every listed edge; fails on the first absent one
    pub fn remove_edges(&mut self, edges: &[(VertexId, VertexId)]) -> Result<()> {
        for &(parent, child) in edges {
            self.remove_edge(parent, child)?;
        }
        Ok(())
    }

    /// Removes the vertex together with all its edges
    pub fn remove_vertex(&mut self, vertex: VertexId) -> Result<()> {
        let index = self
            .node_map
            .remove(&vertex)
            .ok_or(Error::VertexNotFound(vertex))?;
        self.graph.remove_node(index);
        self.invalidate_levels();
        Ok(())
    }

    /// Removes the given vertices, skipping absent ones. Returns how many were removed.
    pub fn remove_vertices<I>(&mut self, vertices: I) -> usize
    where
        I: IntoIterator<Item = VertexId>,
    {
        let mut removed = 0;
        for vertex in vertices {
            if let Some(index) = self.node_map.remove(&vertex) {
                self.graph.remove_node(index);
                removed += 1;
            }
        }
        if removed > 0 {
            self.invalidate_levels();
        }
        removed
    }

    /// Removes all the edges going to this vertex from its parents
    pub fn remove_edges_to_parents(&mut self, vertex: VertexId) -> Result<()> {
        self.remove_incident_edges(vertex, Direction::Incoming)
    }

    /// Removes all the edges going from this vertex to its children
    pub fn remove_edges_to_children(&mut self, vertex: VertexId) -> Result<()> {
        self.remove_incident_edges(vertex, Direction::Outgoing)
    }

    /// Removes every vertex without parents and children
    pub fn remove_isolated_vertices(&mut self) -> usize {
        let isolated: Vec<VertexId> = self
            .node_map
            .iter()
            .filter(|(_, &index)| {
                self.graph.neighbors_undirected(index).next().is_none()
            })
            .map(|(&vertex, _)| vertex)
            .collect();
        self.remove_vertices(isolated)
    }

    /// Takes the induced subgraph on the given vertices, in place
    pub fn reduce_to_subgraph(&mut self, vertices: &HashSet<VertexId>) -> usize {
        let outside: Vec<VertexId> = self
            .node_map
            .keys()
            .filter(|vertex| !vertices.contains(vertex))
            .copied()
            .collect();
        self.remove_vertices(outside)
    }

    /// The vertex's parents in insertion order
    pub fn parents(&self, vertex: VertexId) -> Result<Vec<VertexId>> {
        let index = self.index_of(vertex)?;
        Ok(self.neighbor_ids(index, Direction::Incoming))
    }

    /// The vertex's children in insertion order
    pub fn children(&self, vertex: VertexId) -> Result<Vec<VertexId>> {
        let index = self.index_of(vertex)?;
        Ok(self.neighbor_ids(index, Direction::Outgoing))
    }

    pub fn has_edge(&self, parent: VertexId, child: VertexId) -> bool {
        match (self.node_map.get(&parent), self.node_map.get(&child)) {
            (Some(&parent_index), Some(&child_index)) => {
                self.graph.contains_edge(parent_index, child_index)
            }
            _ => false,
        }
    }

    pub fn branch(&self, parent: VertexId, child: VertexId) -> Option<Branch> {
        let parent_index = *self.node_map.get(&parent)?;
        let child_index = *self.node_map.get(&child)?;
        let edge = self.graph.find_edge(parent_index, child_index)?;
        self.graph.edge_weight(edge).copied()
    }

    /// True if the vertex has no recorded parents
    pub fn is_founder(&self, vertex: VertexId) -> Result<bool> {
        let index = self.index_of(vertex)?;
        Ok(self.degree(index, Direction::Incoming) == 0)
    }

    /// True if the vertex has no children
    pub fn is_sink(&self, vertex: VertexId) -> Result<bool> {
        let index = self.index_of(vertex)?;
        Ok(self.degree(index, Direction::Outgoing) == 0)
    }

    /// Vertices without parents, ascending by id
    pub fn founders(&self) -> Vec<VertexId> {
        self.vertices_with_no(Direction::Incoming)
    }

    /// Vertices without children (proband candidates), ascending by id
    pub fn sinks(&self) -> Vec<VertexId> {
        self.vertices_with_no(Direction::Outgoing)
    }

    /// Whether every vertex has no more than `max_parents` parents
    pub fn verify_max_parents(&self, max_parents: usize) -> bool {
        self.graph
            .node_indices()
            .all(|index| self.degree(index, Direction::Incoming) <= max_parents)
    }

    /// Vertices grouped by generation depth; level 0 holds the founders.
    ///
    /// Each level is sorted by id. Fails with [`Error::Cycle`] if the parent relation
    /// is not acyclic.
    pub fn levels(&self) -> Result<&[Vec<VertexId>]> {
        let index = self.levels.get_or_try_init(|| self.compute_levels())?;
        Ok(&index.levels)
    }

    /// Length of the longest path from any founder to the vertex
    pub fn vertex_level(&self, vertex: VertexId) -> Result<usize> {
        let index = self.levels.get_or_try_init(|| self.compute_levels())?;
        index
            .by_vertex
            .get(&vertex)
            .copied()
            .ok_or(Error::VertexNotFound(vertex))
    }

    pub fn vertices_at_level(&self, level: usize) -> Result<&[VertexId]> {
        let levels = self.levels()?;
        levels.get(level).map(Vec::as_slice).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "level {} is out of range, the graph has {} levels",
                level,
                levels.len()
            ))
        })
    }

    /// Vertices on the deepest level
    pub fn top_level_vertices(&self) -> Result<&[VertexId]> {
        Ok(self.levels()?.last().map(Vec::as_slice).unwrap_or(&[]))
    }

    pub(crate) fn index_of(&self, vertex: VertexId) -> Result<NodeIndex> {
        self.node_map
            .get(&vertex)
            .copied()
            .ok_or(Error::VertexNotFound(vertex))
    }

    pub(crate) fn vertex_at(&self, index: NodeIndex) -> VertexId {
        self.graph[index]
    }

    pub(crate) fn petgraph(&self) -> &StableDiGraph<VertexId, Branch> {
        &self.graph
    }

    /// Neighbor indices in edge insertion order
    pub(crate) fn neighbors(&self, index: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        // petgraph walks adjacency lists newest-first
        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(index, direction).collect();
        neighbors.reverse();
        neighbors
    }

    pub(crate) fn neighbor_ids(&self, index: NodeIndex, direction: Direction) -> Vec<VertexId> {
        self.neighbors(index, direction)
            .into_iter()
            .map(|neighbor| self.graph[neighbor])
            .collect()
    }

    /// Copies the vertices in `keep` and every edge among them into a new graph
    pub(crate) fn induced_subgraph(&self, keep: &HashSet<VertexId>) -> GenealogicalGraph {
        let mut subgraph = Self::with_max_parents(self.max_parents);
        let mut retained: Vec<VertexId> = keep
            .iter()
            .filter(|vertex| self.contains(**vertex))
            .copied()
            .collect();
        retained.sort_unstable();

        for &vertex in &retained {
            subgraph.ensure_vertex(vertex);
        }
        for &child in &retained {
            let child_index = self.node_map[&child];
            let sub_child = subgraph.node_map[&child];
            for parent_index in self.neighbors(child_index, Direction::Incoming) {
                let parent = self.graph[parent_index];
                if let Some(&sub_parent) = subgraph.node_map.get(&parent) {
                    let branch = self
                        .graph
                        .find_edge(parent_index, child_index)
                        .and_then(|edge| self.graph.edge_weight(edge).copied())
                        .unwrap_or_default();
                    subgraph.graph.add_edge(sub_parent, sub_child, branch);
                }
            }
        }
        subgraph
    }

    /// Links `parent -> child` checking only the parent count.
    ///
    /// Callers guarantee the edge cannot close a cycle (e.g. re-linking a vertex to
    /// its former grandparent during contraction).
    pub(crate) fn relink(&mut self, parent: VertexId, child: VertexId, branch: Branch) -> Result<()> {
        let parent_index = self.index_of(parent)?;
        let child_index = self.index_of(child)?;
        if self.graph.contains_edge(parent_index, child_index) {
            return Ok(());
        }
        self.check_parent_capacity(child, child_index)?;
        self.graph.add_edge(parent_index, child_index, branch);
        self.invalidate_levels();
        Ok(())
    }

    fn degree(&self, index: NodeIndex, direction: Direction) -> usize {
        self.graph.neighbors_directed(index, direction).count()
    }

    fn vertices_with_no(&self, direction: Direction) -> Vec<VertexId> {
        let mut vertices: Vec<VertexId> = self
            .graph
            .node_indices()
            .filter(|&index| self.degree(index, direction) == 0)
            .map(|index| self.graph[index])
            .collect();
        vertices.sort_unstable();
        vertices
    }

    fn ensure_vertex(&mut self, vertex: VertexId) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&vertex) {
            return index;
        }
        let index = self.graph.add_node(vertex);
        self.node_map.insert(vertex, index);
        self.invalidate_levels();
        index
    }

    fn check_parent_capacity(&self, child: VertexId, child_index: NodeIndex) -> Result<()> {
        let parent_count = self.degree(child_index, Direction::Incoming);
        if parent_count >= self.max_parents {
            return Err(Error::structural(format!(
                "vertex {} already has {} parents (maximum is {})",
                child, parent_count, self.max_parents
            )));
        }
        Ok(())
    }

    fn remove_incident_edges(&mut self, vertex: VertexId, direction: Direction) -> Result<()> {
        let index = self.index_of(vertex)?;
        let edges: Vec<_> = self
            .graph
            .edges_directed(index, direction)
            .map(|edge| edge.id())
            .collect();
        for edge in edges {
            self.graph.remove_edge(edge);
        }
        self.invalidate_levels();
        Ok(())
    }

    fn invalidate_levels(&mut self) {
        if self.levels.get().is_some() {
            self.levels = OnceCell::new();
        }
    }

    /// Kahn's algorithm with longest-path-from-founder levels
    fn compute_levels(&self) -> Result<LevelIndex> {
        let mut remaining_parents: HashMap<NodeIndex, usize> =
            HashMap::with_capacity(self.vertex_count());
        let mut level_of: HashMap<NodeIndex, usize> = HashMap::with_capacity(self.vertex_count());
        let mut queue = VecDeque::new();

        for index in self.graph.node_indices() {
            let parent_count = self.degree(index, Direction::Incoming);
            if parent_count == 0 {
                level_of.insert(index, 0);
                queue.push_back(index);
            } else {
                remaining_parents.insert(index, parent_count);
            }
        }

        let mut resolved = 0;
        while let Some(current) = queue.pop_front() {
            resolved += 1;
            let current_level = level_of[&current];
            for child in self.graph.neighbors_directed(current, Direction::Outgoing) {
                let child_level = level_of.entry(child).or_insert(0);
                *child_level = (*child_level).max(current_level + 1);
                if let Some(count) = remaining_parents.get_mut(&child) {
                    *count -= 1;
                    if *count == 0 {
                        remaining_parents.remove(&child);
                        queue.push_back(child);
                    }
                }
            }
        }

        if resolved < self.vertex_count() {
            let mut unresolved: Vec<VertexId> = remaining_parents
                .keys()
                .map(|&index| self.graph[index])
                .collect();
            unresolved.sort_unstable();
            return Err(Error::Cycle(unresolved));
        }

        let depth = level_of.values().copied().max().map_or(0, |max| max + 1);
        let mut levels = vec![Vec::new(); depth];
        let mut by_vertex = HashMap::with_capacity(level_of.len());
        for (index, level) in level_of {
            let vertex = self.graph[index];
            levels[level].push(vertex);
            by_vertex.insert(vertex, level);
        }
        for level in &mut levels {
            level.sort_unstable();
        }

        debug!("Computed {} levels for {} vertices", levels.len(), by_vertex.len());
        Ok(LevelIndex { by_vertex, levels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1   2
    //  \ / \
    //   3   4
    //    \ /
    //     5
    fn create_test_graph() -> GenealogicalGraph {
        let mut graph = GenealogicalGraph::new();
        graph.add_parents(3, &[1, 2]).unwrap();
        graph.add_parents(4, &[2]).unwrap();
        graph.add_parents(5, &[3, 4]).unwrap();
        graph
    }

    #[test]
    fn test_parents_and_children_keep_insertion_order() {
        let mut graph = GenealogicalGraph::new();
        graph.add_edge(9, 1).unwrap();
        graph.add_edge(3, 1).unwrap();
        graph.add_edge(9, 7).unwrap();
        graph.add_edge(9, 2).unwrap();

        assert_eq!(graph.parents(1).unwrap(), vec![9, 3]);
        assert_eq!(graph.children(9).unwrap(), vec![1, 7, 2]);
        assert!(graph.parents(9).unwrap().is_empty());
    }

    #[test]
    fn test_founders_and_sinks() {
        let graph = create_test_graph();
        assert_eq!(graph.founders(), vec![1, 2]);
        assert_eq!(graph.sinks(), vec![5]);
        assert!(graph.is_founder(1).unwrap());
        assert!(!graph.is_founder(3).unwrap());
        assert!(graph.is_sink(5).unwrap());
    }

    #[test]
    fn test_levels_are_longest_path_from_founders() {
        let mut graph = create_test_graph();
        // 6 has a founder parent and a level-2 parent
        graph.add_parents(6, &[1, 5]).unwrap();

        let levels = graph.levels().unwrap();
        assert_eq!(levels.len(), 4);
        assert_eq!(levels[0], vec![1, 2]);
        assert_eq!(levels[1], vec![3, 4]);
        assert_eq!(levels[2], vec![5]);
        assert_eq!(levels[3], vec![6]);
        assert_eq!(graph.vertex_level(6).unwrap(), 3);
        assert_eq!(graph.top_level_vertices().unwrap(), &[6]);
    }

    #[test]
    fn test_levels_are_invalidated_by_mutation() {
        let mut graph = create_test_graph();
        assert_eq!(graph.vertex_level(5).unwrap(), 2);

        graph.remove_edge(3, 5).unwrap();
        graph.remove_edge(4, 5).unwrap();
        assert_eq!(graph.vertex_level(5).unwrap(), 0);

        graph.add_edge(4, 5).unwrap();
        assert_eq!(graph.vertex_level(5).unwrap(), 2);
    }

    #[test]
    fn test_parent_limit_is_structural_error() {
        let mut graph = create_test_graph();
        let result = graph.add_edge(4, 3);
        assert!(matches!(result, Err(Error::Structural(_))));
        // Nothing was changed by the failed call
        assert_eq!(graph.parents(3).unwrap(), vec![1, 2]);

        let mut haploid = GenealogicalGraph::with_max_parents(1);
        haploid.add_edge(1, 2).unwrap();
        assert!(matches!(haploid.add_edge(3, 2), Err(Error::Structural(_))));
        assert!(!haploid.contains(3));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = create_test_graph();
        assert!(matches!(graph.add_edge(5, 1), Err(Error::Cycle(_))));
        assert!(matches!(graph.add_edge(7, 7), Err(Error::Cycle(_))));
        assert!(!graph.has_edge(5, 1));
    }

    #[test]
    fn test_duplicate_edge_is_noop() {
        let mut graph = create_test_graph();
        let edges = graph.edge_count();
        graph.add_edge(1, 3).unwrap();
        assert_eq!(graph.edge_count(), edges);
    }

    #[test]
    fn test_from_records_detects_cycles() {
        let records = vec![(2, vec![1]), (3, vec![2]), (1, vec![3]), (4, vec![])];
        match GenealogicalGraph::from_records(records, 2) {
            Err(Error::Cycle(vertices)) => assert_eq!(vertices, vec![1, 2, 3]),
            other => panic!("expected a cycle error, got {:?}", other.map(|g| g.vertex_count())),
        }
    }

    #[test]
    fn test_from_records_enforces_parent_limit() {
        let records = vec![(4, vec![1, 2, 3])];
        assert!(matches!(
            GenealogicalGraph::from_records(records, 2),
            Err(Error::Structural(_))
        ));
    }

    #[test]
    fn test_remove_vertex_drops_edges() {
        let mut graph = create_test_graph();
        graph.remove_vertex(3).unwrap();
        assert!(!graph.contains(3));
        assert_eq!(graph.parents(5).unwrap(), vec![4]);
        assert_eq!(graph.children(1).unwrap(), Vec::<VertexId>::new());
        assert!(matches!(graph.remove_vertex(3), Err(Error::VertexNotFound(3))));
    }

    #[test]
    fn test_remove_missing_edge() {
        let mut graph = create_test_graph();
        assert!(matches!(
            graph.remove_edge(1, 4),
            Err(Error::EdgeNotFound { parent: 1, child: 4 })
        ));
    }

    #[test]
    fn test_remove_isolated_vertices() {
        let mut graph = create_test_graph();
        graph.add_vertex(10);
        graph.add_vertex(11);
        assert_eq!(graph.remove_isolated_vertices(), 2);
        assert_eq!(graph.vertex_count(), 5);
    }

    #[test]
    fn test_remove_edges_to_parents() {
        let mut graph = create_test_graph();
        graph.remove_edges_to_parents(5).unwrap();
        assert!(graph.is_founder(5).unwrap());
        assert_eq!(graph.sinks(), vec![3, 4, 5]);
    }

    #[test]
    fn test_verify_max_parents() {
        let graph = create_test_graph();
        assert!(graph.verify_max_parents(2));
        assert!(!graph.verify_max_parents(1));
    }

    #[test]
    fn test_edges_enumeration() {
        let graph = create_test_graph();
        assert_eq!(graph.edges(), vec![(1, 3), (2, 3), (2, 4), (3, 5), (4, 5)]);
    }

    #[test]
    fn test_branch_join() {
        let a = Branch::with_length(1.5);
        let b = Branch::with_length(2.0);
        assert_eq!(a.join(b).length, Some(3.5));
        assert_eq!(a.join(Branch::default()).length, Some(1.5));
        assert_eq!(Branch::default().join(Branch::default()).length, None);
    }

    #[test]
    fn test_vertices_at_level_out_of_range() {
        let graph = create_test_graph();
        assert_eq!(graph.vertices_at_level(1).unwrap(), &[3, 4]);
        assert!(matches!(graph.vertices_at_level(9), Err(Error::InvalidArgument(_))));
    }
}
