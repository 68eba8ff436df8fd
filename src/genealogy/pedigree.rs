use crate::error::{Error, Result};
use crate::genealogy::graph::{GenealogicalGraph, DEFAULT_MAX_PARENTS};
use crate::genealogy::Genealogy;
use crate::types::{Sex, VertexId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Parents of an individual split by their recorded sex
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentsBySex {
    pub father: Option<VertexId>,
    pub mother: Option<VertexId>,
    pub unknown: Vec<VertexId>,
}

/// A genealogical graph of individuals with at most two biological parents each,
/// plus an optional sex side table.
#[derive(Debug, Clone, Default)]
pub struct Pedigree {
    graph: GenealogicalGraph,
    sexes: HashMap<VertexId, Sex>,
}

impl Genealogy for Pedigree {
    fn graph(&self) -> &GenealogicalGraph {
        &self.graph
    }
}

impl Pedigree {
    pub fn new() -> Self {
        Self {
            graph: GenealogicalGraph::with_max_parents(DEFAULT_MAX_PARENTS),
            sexes: HashMap::new(),
        }
    }

    /// Wraps an existing graph, rejecting one that allows more than two parents
    pub fn from_graph(graph: GenealogicalGraph) -> Result<Self> {
        if graph.max_parents() > DEFAULT_MAX_PARENTS
            || !graph.verify_max_parents(DEFAULT_MAX_PARENTS)
        {
            return Err(Error::structural(format!(
                "a pedigree allows at most {} parents per individual",
                DEFAULT_MAX_PARENTS
            )));
        }
        Ok(Self {
            graph,
            sexes: HashMap::new(),
        })
    }

    pub fn graph_mut(&mut self) -> &mut GenealogicalGraph {
        &mut self.graph
    }

    pub fn into_graph(self) -> GenealogicalGraph {
        self.graph
    }

    pub fn set_sex(&mut self, vertex: VertexId, sex: Sex) -> Result<()> {
        if !self.graph.contains(vertex) {
            return Err(Error::VertexNotFound(vertex));
        }
        self.sexes.insert(vertex, sex);
        Ok(())
    }

    /// Recorded sex, [`Sex::Unknown`] when none was set
    pub fn sex(&self, vertex: VertexId) -> Sex {
        self.sexes.get(&vertex).copied().unwrap_or_default()
    }

    pub fn parents_by_sex(&self, child: VertexId) -> Result<ParentsBySex> {
        let mut parents = ParentsBySex::default();
        for parent in self.graph.parents(child)? {
            match self.sex(parent) {
                Sex::Male if parents.father.is_none() => parents.father = Some(parent),
                Sex::Female if parents.mother.is_none() => parents.mother = Some(parent),
                _ => parents.unknown.push(parent),
            }
        }
        Ok(parents)
    }

    /// Individuals who co-parent at least one child with `vertex`, ascending by id
    pub fn spouses(&self, vertex: VertexId) -> Result<Vec<VertexId>> {
        let mut spouses = BTreeSet::new();
        for child in self.graph.children(vertex)? {
            for parent in self.graph.parents(child)? {
                if parent != vertex {
                    spouses.insert(parent);
                }
            }
        }
        Ok(spouses.into_iter().collect())
    }

    /// Number of distinct spouses for every individual that has children
    pub fn spouse_counts(&self) -> Result<BTreeMap<VertexId, usize>> {
        let mut spouses: BTreeMap<VertexId, BTreeSet<VertexId>> = BTreeMap::new();
        for vertex in self.graph.vertices() {
            let parents = self.graph.parents(vertex)?;
            for &parent in &parents {
                let entry = spouses.entry(parent).or_default();
                entry.extend(parents.iter().copied().filter(|&other| other != parent));
            }
        }
        Ok(spouses
            .into_iter()
            .map(|(vertex, partners)| (vertex, partners.len()))
            .collect())
    }

    /// Expected number of target genomes descending from each vertex.
    ///
    /// `c(v) = [v in targets] + 1/2 * sum of c(w) over the children w of v`, evaluated
    /// in one pass from the deepest level upwards. Targets default to the sinks.
    pub fn contribution_factors(
        &self,
        targets: Option<&[VertexId]>,
    ) -> Result<BTreeMap<VertexId, f64>> {
        let targets = self.target_set(targets)?;
        let mut factors: BTreeMap<VertexId, f64> = BTreeMap::new();

        for level in self.graph.levels()?.iter().rev() {
            for &vertex in level {
                let factor = self.factor_from_children(vertex, &targets, &factors)?;
                factors.insert(vertex, factor);
            }
        }

        debug!(
            "Computed contribution factors for {} vertices towards {} targets",
            factors.len(),
            targets.len()
        );
        Ok(factors)
    }

    /// Contribution factor of a single vertex, visiting only its descendants
    pub fn vertex_contribution_factor(
        &self,
        vertex: VertexId,
        targets: Option<&[VertexId]>,
    ) -> Result<f64> {
        let targets = self.target_set(targets)?;
        let mut scope = self.graph.descendants(vertex)?;
        scope.push(vertex);

        let mut ordered = Vec::with_capacity(scope.len());
        for member in scope {
            ordered.push((self.graph.vertex_level(member)?, member));
        }
        ordered.sort_unstable_by(|a, b| b.cmp(a));

        let mut factors = BTreeMap::new();
        for (_, member) in ordered {
            let factor = self.factor_from_children(member, &targets, &factors)?;
            factors.insert(member, factor);
        }
        factors
            .get(&vertex)
            .copied()
            .ok_or(Error::VertexNotFound(vertex))
    }

    /// The two ploid vertices `2x` and `2x + 1` of individual `x`
    pub fn ploid_ids(individual: VertexId) -> (VertexId, VertexId) {
        (2 * individual, 2 * individual + 1)
    }

    pub fn individual_id(ploid: VertexId) -> VertexId {
        ploid / 2
    }

    pub fn other_ploid(ploid: VertexId) -> VertexId {
        ploid ^ 1
    }

    /// Expands every individual into its two ploids.
    ///
    /// The first recorded parent `p` passes one of its ploids (`2p` or `2p + 1`) to
    /// ploid `2x`, the second parent passes one of its ploids to `2x + 1`. Ids above
    /// `u64::MAX / 2` have no ploid ids and are rejected.
    pub fn to_ploid_graph(&self) -> Result<GenealogicalGraph> {
        if let Some(&largest) = self.graph.vertices().last() {
            if largest > VertexId::MAX / 2 {
                return Err(Error::InvalidArgument(format!(
                    "individual {} is too large to be split into ploids",
                    largest
                )));
            }
        }

        let mut ploid_graph = GenealogicalGraph::with_max_parents(DEFAULT_MAX_PARENTS);
        for individual in self.graph.vertices() {
            let (first, second) = Self::ploid_ids(individual);
            ploid_graph.add_vertex(first);
            ploid_graph.add_vertex(second);
        }

        for individual in self.graph.vertices() {
            let ploids = Self::ploid_ids(individual);
            for (parent, child_ploid) in self.graph.parents(individual)?.into_iter().zip([ploids.0, ploids.1]) {
                let (parent_first, parent_second) = Self::ploid_ids(parent);
                ploid_graph.relink(parent_first, child_ploid, Default::default())?;
                ploid_graph.relink(parent_second, child_ploid, Default::default())?;
            }
        }

        debug!(
            "Expanded {} individuals into {} ploids",
            self.graph.vertex_count(),
            ploid_graph.vertex_count()
        );
        Ok(ploid_graph)
    }

    fn target_set(&self, targets: Option<&[VertexId]>) -> Result<HashSet<VertexId>> {
        match targets {
            None => Ok(self.graph.sinks().into_iter().collect()),
            Some(targets) => {
                for &target in targets {
                    if !self.graph.contains(target) {
                        return Err(Error::VertexNotFound(target));
                    }
                }
                Ok(targets.iter().copied().collect())
            }
        }
    }

    fn factor_from_children(
        &self,
        vertex: VertexId,
        targets: &HashSet<VertexId>,
        factors: &BTreeMap<VertexId, f64>,
    ) -> Result<f64> {
        let own = if targets.contains(&vertex) { 1.0 } else { 0.0 };
        let inherited: f64 = self
            .graph
            .children(vertex)?
            .iter()
            .map(|child| factors.get(child).copied().unwrap_or(0.0))
            .sum();
        Ok(own + inherited / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //  1 (m)   2 (f)   3 (m)
    //     \   /  \    /
    //       4      5
    //      / \      \
    //     6   7      8
    fn create_test_pedigree() -> Pedigree {
        let mut pedigree = Pedigree::new();
        let graph = pedigree.graph_mut();
        graph.add_parents(4, &[1, 2]).unwrap();
        graph.add_parents(5, &[3, 2]).unwrap();
        graph.add_parents(6, &[4]).unwrap();
        graph.add_parents(7, &[4]).unwrap();
        graph.add_parents(8, &[5]).unwrap();
        pedigree.set_sex(1, Sex::Male).unwrap();
        pedigree.set_sex(2, Sex::Female).unwrap();
        pedigree.set_sex(3, Sex::Male).unwrap();
        pedigree
    }

    #[test]
    fn test_from_graph_rejects_three_parents() {
        let mut graph = GenealogicalGraph::with_max_parents(3);
        graph.add_parents(4, &[1, 2, 3]).unwrap();
        assert!(matches!(Pedigree::from_graph(graph), Err(Error::Structural(_))));
    }

    #[test]
    fn test_parents_by_sex() {
        let pedigree = create_test_pedigree();
        let parents = pedigree.parents_by_sex(5).unwrap();
        assert_eq!(parents.father, Some(3));
        assert_eq!(parents.mother, Some(2));
        assert!(parents.unknown.is_empty());

        let parents = pedigree.parents_by_sex(6).unwrap();
        assert_eq!(parents.father, None);
        assert_eq!(parents.unknown, vec![4]);
    }

    #[test]
    fn test_set_sex_requires_vertex() {
        let mut pedigree = create_test_pedigree();
        assert!(matches!(pedigree.set_sex(99, Sex::Female), Err(Error::VertexNotFound(99))));
        assert_eq!(pedigree.sex(7), Sex::Unknown);
    }

    #[test]
    fn test_spouses() {
        let pedigree = create_test_pedigree();
        assert_eq!(pedigree.spouses(2).unwrap(), vec![1, 3]);
        assert_eq!(pedigree.spouses(1).unwrap(), vec![2]);
        assert!(pedigree.spouses(4).unwrap().is_empty());

        let counts = pedigree.spouse_counts().unwrap();
        assert_eq!(counts.get(&2), Some(&2));
        assert_eq!(counts.get(&1), Some(&1));
        assert_eq!(counts.get(&4), Some(&0));
        assert_eq!(counts.get(&6), None);
    }

    #[test]
    fn test_contribution_factors() {
        let pedigree = create_test_pedigree();
        let factors = pedigree.contribution_factors(None).unwrap();
        assert!((factors[&6] - 1.0).abs() < 1e-9);
        assert!((factors[&4] - 1.0).abs() < 1e-9);
        assert!((factors[&5] - 0.5).abs() < 1e-9);
        assert!((factors[&1] - 0.5).abs() < 1e-9);
        assert!((factors[&2] - 0.75).abs() < 1e-9);
        assert!((factors[&3] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_single_vertex_contribution_matches_full_pass() {
        let pedigree = create_test_pedigree();
        let targets = [6, 8];
        let factors = pedigree.contribution_factors(Some(&targets)).unwrap();
        for vertex in pedigree.graph().vertices() {
            let single = pedigree.vertex_contribution_factor(vertex, Some(&targets)).unwrap();
            assert!((single - factors[&vertex]).abs() < 1e-9, "vertex {}", vertex);
        }
    }

    #[test]
    fn test_contribution_unknown_target() {
        let pedigree = create_test_pedigree();
        assert!(matches!(
            pedigree.contribution_factors(Some(&[42])),
            Err(Error::VertexNotFound(42))
        ));
    }

    #[test]
    fn test_ploid_helpers() {
        assert_eq!(Pedigree::ploid_ids(7), (14, 15));
        assert_eq!(Pedigree::individual_id(15), 7);
        assert_eq!(Pedigree::other_ploid(14), 15);
        assert_eq!(Pedigree::other_ploid(15), 14);
    }

    #[test]
    fn test_ploid_graph_rejects_huge_ids() {
        let mut pedigree = Pedigree::new();
        pedigree.graph_mut().add_edge(1, VertexId::MAX / 2 + 1).unwrap();
        assert!(matches!(pedigree.to_ploid_graph(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_ploid_graph() {
        let pedigree = create_test_pedigree();
        let ploids = pedigree.to_ploid_graph().unwrap();
        assert_eq!(ploids.vertex_count(), 16);
        // Individual 5 has parents [3, 2]
        assert_eq!(ploids.parents(10).unwrap(), vec![6, 7]);
        assert_eq!(ploids.parents(11).unwrap(), vec![4, 5]);
        // Individual 6 has a single parent 4
        assert_eq!(ploids.parents(12).unwrap(), vec![8, 9]);
        assert!(ploids.is_founder(13).unwrap());
    }
}
