use crate::coalescent::clade::{largest_by, CladeStats};
use crate::error::{Error, Result};
use crate::genealogy::traversal::require_seeds;
use crate::genealogy::{Branch, GenealogicalGraph, Genealogy};
use crate::types::VertexId;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// A genealogy in which every vertex has at most one parent.
///
/// The sinks are the probands. Forests are accepted; queries that need a single
/// root say so in their errors.
#[derive(Debug, Clone)]
pub struct CoalescentTree {
    graph: GenealogicalGraph,
}

impl Default for CoalescentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Genealogy for CoalescentTree {
    fn graph(&self) -> &GenealogicalGraph {
        &self.graph
    }
}

impl CoalescentTree {
    pub fn new() -> Self {
        Self {
            graph: GenealogicalGraph::with_max_parents(1),
        }
    }

    /// Takes over a graph whose vertices have at most one parent each
    pub fn from_graph(mut graph: GenealogicalGraph) -> Result<Self> {
        graph.set_max_parents(1)?;
        Ok(Self { graph })
    }

    /// Tree spanned by the probands and all their ancestors in `graph`
    pub fn from_ascending(graph: &GenealogicalGraph, probands: &[VertexId]) -> Result<Self> {
        require_seeds(probands)?;
        Self::from_graph(graph.ascending_subgraph(probands)?)
    }

    pub fn add_edge(&mut self, parent: VertexId, child: VertexId) -> Result<()> {
        self.graph.add_edge(parent, child)
    }

    pub fn add_edge_with_length(&mut self, parent: VertexId, child: VertexId, length: f64) -> Result<()> {
        self.graph.add_edge_with_branch(parent, child, Branch::with_length(length))
    }

    pub fn into_graph(self) -> GenealogicalGraph {
        self.graph
    }

    /// Sink vertices, ascending by id
    pub fn probands(&self) -> Vec<VertexId> {
        self.graph.sinks()
    }

    /// The single root; fails on an empty tree or a forest
    pub fn root(&self) -> Result<VertexId> {
        match self.graph.founders().as_slice() {
            [root] => Ok(*root),
            [] => Err(Error::structural("the tree is empty")),
            roots => Err(Error::structural(format!(
                "the tree has {} roots",
                roots.len()
            ))),
        }
    }

    pub fn vertex_parent(&self, vertex: VertexId) -> Result<Option<VertexId>> {
        Ok(self.graph.parents(vertex)?.first().copied())
    }

    /// Root of the component containing `vertex`
    pub fn root_for_clade(&self, vertex: VertexId) -> Result<VertexId> {
        let mut current = vertex;
        while let Some(parent) = self.vertex_parent(current)? {
            current = parent;
        }
        Ok(current)
    }

    /// Subtree size and proband count of every vertex, in one bottom-up pass
    pub fn clade_statistics(&self) -> Result<BTreeMap<VertexId, CladeStats>> {
        let mut stats: BTreeMap<VertexId, CladeStats> = BTreeMap::new();
        for level in self.graph.levels()?.iter().rev() {
            for &vertex in level {
                let children = self.graph.children(vertex)?;
                let mut clade = CladeStats {
                    size: 1,
                    probands: usize::from(children.is_empty()),
                };
                for child in children {
                    if let Some(child_clade) = stats.get(&child) {
                        clade.size += child_clade.size;
                        clade.probands += child_clade.probands;
                    }
                }
                stats.insert(vertex, clade);
            }
        }
        Ok(stats)
    }

    /// Probands descending from `vertex` (the vertex itself if it is a proband)
    pub fn clade_probands(&self, vertex: VertexId) -> Result<Vec<VertexId>> {
        if self.graph.is_sink(vertex)? {
            return Ok(vec![vertex]);
        }
        let mut probands = Vec::new();
        for descendant in self.graph.descendants(vertex)? {
            if self.graph.is_sink(descendant)? {
                probands.push(descendant);
            }
        }
        Ok(probands)
    }

    /// Internal vertex with the largest subtree; ties go to the lowest id
    pub fn largest_clade_by_size(&self) -> Result<Option<VertexId>> {
        Ok(largest_by(&self.clade_statistics()?, |clade| clade.size))
    }

    /// Internal vertex with the most probands below it; ties go to the lowest id
    pub fn largest_clade_by_probands(&self) -> Result<Option<VertexId>> {
        Ok(largest_by(&self.clade_statistics()?, |clade| clade.probands))
    }

    /// The unique path from `source` to `target` through their least common ancestor
    pub fn path_between(&self, source: VertexId, target: VertexId) -> Result<Vec<VertexId>> {
        let upward_from_source = self.path_to_root(source)?;
        let on_source_path: HashSet<VertexId> = upward_from_source.iter().copied().collect();

        let mut upward_from_target = Vec::new();
        let mut current = Some(target);
        while let Some(vertex) = current {
            if on_source_path.contains(&vertex) {
                let lca_position = upward_from_source
                    .iter()
                    .position(|&candidate| candidate == vertex)
                    .unwrap_or(0);
                let mut path: Vec<VertexId> = upward_from_source[..=lca_position].to_vec();
                path.extend(upward_from_target.iter().rev());
                return Ok(path);
            }
            upward_from_target.push(vertex);
            current = self.vertex_parent(vertex)?;
        }

        Err(Error::NotConnected(source, target))
    }

    /// Contracts every vertex with exactly one parent and one child until none is left.
    ///
    /// Branch lengths of the two contracted edges are summed. Returns the number of
    /// removed vertices.
    pub fn remove_unary_nodes(&mut self) -> Result<usize> {
        let mut removed = 0;
        loop {
            let mut contracted = 0;
            for vertex in self.graph.vertices() {
                if self.contract_if_unary(vertex)? {
                    contracted += 1;
                }
            }
            if contracted == 0 {
                break;
            }
            removed += contracted;
        }
        if removed > 0 {
            info!("Removed {} unary vertices", removed);
        }
        Ok(removed)
    }

    /// Collapses the edge `parent -> child`: the child's children move to `parent`
    /// and the child is removed
    pub fn merge_edge(&mut self, parent: VertexId, child: VertexId) -> Result<()> {
        let upper = self
            .graph
            .branch(parent, child)
            .ok_or(Error::EdgeNotFound { parent, child })?;
        let grandchildren = self.graph.children(child)?;
        if grandchildren.is_empty() {
            return Err(Error::structural(format!(
                "cannot merge {} -> {}: {} is a proband",
                parent, child, child
            )));
        }

        let relinks: Vec<(VertexId, Branch)> = grandchildren
            .into_iter()
            .map(|grandchild| {
                let lower = self.graph.branch(child, grandchild).unwrap_or_default();
                (grandchild, upper.join(lower))
            })
            .collect();

        self.graph.remove_vertex(child)?;
        for (grandchild, branch) in relinks {
            self.graph.relink(parent, grandchild, branch)?;
        }
        debug!("Merged edge {} -> {}", parent, child);
        Ok(())
    }

    /// Splits `child` off a polytomy.
    ///
    /// The child's parent `P` must have at least three children. A new vertex takes
    /// over `P`'s own parent edge and gets `P` and `child` as its two children.
    /// Returns the id of the new vertex.
    pub fn unmerge_edge(&mut self, child: VertexId) -> Result<VertexId> {
        let parent = self
            .vertex_parent(child)?
            .ok_or_else(|| Error::structural(format!("vertex {} has no parent", child)))?;
        let siblings = self.graph.children(parent)?.len();
        if siblings < 3 {
            return Err(Error::structural(format!(
                "vertex {} is not part of a polytomy ({} has {} children)",
                child, parent, siblings
            )));
        }

        let new_vertex = match self.graph.vertices().last() {
            Some(&max) => max.checked_add(1).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "no free vertex id above {} for the split of {}",
                    max, child
                ))
            })?,
            None => 0,
        };
        let child_branch = self.graph.remove_edge(parent, child)?;
        self.graph.add_vertex(new_vertex);
        self.graph.relink(new_vertex, child, child_branch)?;

        if let Some(grandparent) = self.vertex_parent(parent)? {
            let parent_branch = self.graph.remove_edge(grandparent, parent)?;
            self.graph.relink(grandparent, new_vertex, parent_branch)?;
        }
        self.graph.relink(new_vertex, parent, Branch::default())?;

        debug!("Unmerged {} from {} through new vertex {}", child, parent, new_vertex);
        Ok(new_vertex)
    }

    /// Cuts the edge above `edge_child` and returns the `(upper, lower)` trees, both
    /// without unary vertices
    pub fn subdivide(&self, edge_child: VertexId) -> Result<(CoalescentTree, CoalescentTree)> {
        let mut lower_vertices: HashSet<VertexId> =
            self.graph.descendants(edge_child)?.into_iter().collect();
        lower_vertices.insert(edge_child);
        let upper_vertices: HashSet<VertexId> = self
            .graph
            .vertices()
            .into_iter()
            .filter(|vertex| !lower_vertices.contains(vertex))
            .collect();

        let mut upper = CoalescentTree::from_graph(self.graph.induced_subgraph(&upper_vertices))?;
        let mut lower = CoalescentTree::from_graph(self.graph.induced_subgraph(&lower_vertices))?;
        upper.remove_unary_nodes()?;
        lower.remove_unary_nodes()?;
        Ok((upper, lower))
    }

    fn path_to_root(&self, vertex: VertexId) -> Result<Vec<VertexId>> {
        let mut path = vec![vertex];
        let mut current = vertex;
        while let Some(parent) = self.vertex_parent(current)? {
            path.push(parent);
            current = parent;
        }
        Ok(path)
    }

    fn contract_if_unary(&mut self, vertex: VertexId) -> Result<bool> {
        if !self.graph.contains(vertex) {
            return Ok(false);
        }
        let parents = self.graph.parents(vertex)?;
        let children = self.graph.children(vertex)?;
        let (&[parent], &[child]) = (parents.as_slice(), children.as_slice()) else {
            return Ok(false);
        };

        let upper = self.graph.branch(parent, vertex).unwrap_or_default();
        let lower = self.graph.branch(vertex, child).unwrap_or_default();
        self.graph.remove_vertex(vertex)?;
        self.graph.relink(parent, child, upper.join(lower))?;
        Ok(true)
    }
}
