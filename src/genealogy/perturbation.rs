//! Simulated parentage errors that can be applied to a graph and undone again

use crate::error::{Error, Result};
use crate::genealogy::graph::GenealogicalGraph;
use crate::genealogy::pedigree::Pedigree;
use crate::types::VertexId;
use rand::seq::index;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One perturbed child: the parents it lost and the parents it gained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentageError {
    pub child: VertexId,
    pub removed_parents: Vec<VertexId>,
    pub added_parents: Vec<VertexId>,
}

impl GenealogicalGraph {
    /// Draws parentage errors without touching the graph.
    ///
    /// Every vertex is treated as one individual. The number of errors is Poisson
    /// distributed with mean `rate * n`, where `n` is the number of vertices with at
    /// least one parent, capped at `n`. Each error swaps one parent for another vertex
    /// of the same level, so applying any subset of the returned errors keeps the
    /// graph acyclic. For graphs built by [`Pedigree::to_ploid_graph`] use
    /// [`simulate_ploid_parentage_errors`](Self::simulate_ploid_parentage_errors).
    pub fn simulate_parentage_errors<R: Rng + ?Sized>(
        &self,
        rate: f64,
        rng: &mut R,
    ) -> Result<Vec<ParentageError>> {
        let candidates: Vec<VertexId> = self
            .vertices()
            .into_iter()
            .filter(|&vertex| matches!(self.is_founder(vertex), Ok(false)))
            .collect();
        let count = draw_error_count(rate, candidates.len(), rng)?;

        let mut errors = Vec::with_capacity(count);
        for position in index::sample(rng, candidates.len(), count) {
            let child = candidates[position];
            let parents = self.parents(child)?;
            let removed = parents[rng.gen_range(0..parents.len())];
            let level = self.vertices_at_level(self.vertex_level(removed)?)?;

            match pick_replacement(level, &parents, rng) {
                Some(added) => errors.push(ParentageError {
                    child,
                    removed_parents: vec![removed],
                    added_parents: vec![added],
                }),
                None => warn!(
                    "Skipping parentage error for {}: no replacement for parent {} on its level",
                    child, removed
                ),
            }
        }

        Ok(errors)
    }

    /// Draws parentage errors on a ploid graph, moving whole parent individuals.
    ///
    /// Vertices `2x` and `2x + 1` are the ploids of individual `x`. The error count is
    /// drawn as in [`simulate_parentage_errors`](Self::simulate_parentage_errors), with
    /// `n` counting individuals that have a ploid with parents. For each chosen
    /// individual one parent individual `w` is picked, and the child ploid fed by
    /// `2w` and `2w + 1` gets the two ploids of another individual `u` instead. `u`
    /// has a ploid on the level of `2w`, is not already a parent, and both of its
    /// ploids lie on levels above the child ploid.
    pub fn simulate_ploid_parentage_errors<R: Rng + ?Sized>(
        &self,
        rate: f64,
        rng: &mut R,
    ) -> Result<Vec<ParentageError>> {
        let mut candidates: Vec<VertexId> = Vec::new();
        for ploid in self.vertices() {
            if !self.is_founder(ploid)? {
                candidates.push(Pedigree::individual_id(ploid));
            }
        }
        candidates.dedup();
        let count = draw_error_count(rate, candidates.len(), rng)?;

        let mut errors = Vec::with_capacity(count);
        for position in index::sample(rng, candidates.len(), count) {
            let individual = candidates[position];
            match self.ploid_error_for(individual, rng)? {
                Some(error) => errors.push(error),
                None => warn!(
                    "Skipping parentage error for individual {}: no replacement parent",
                    individual
                ),
            }
        }

        Ok(errors)
    }

    /// Draws parentage errors and, when `apply` is set, applies them to the graph
    pub fn introduce_and_record_errors<R: Rng + ?Sized>(
        &mut self,
        rate: f64,
        rng: &mut R,
        apply: bool,
    ) -> Result<Vec<ParentageError>> {
        let errors = self.simulate_parentage_errors(rate, rng)?;
        if apply {
            self.apply_errors(&errors)?;
        }
        info!("Recorded {} parentage errors (applied: {})", errors.len(), apply);
        Ok(errors)
    }

    /// Removes then adds the recorded parents of every error, in order
    pub fn apply_errors(&mut self, errors: &[ParentageError]) -> Result<()> {
        for error in errors {
            for &parent in &error.removed_parents {
                self.remove_edge(parent, error.child)?;
            }
            for &parent in &error.added_parents {
                self.add_edge(parent, error.child)?;
            }
        }
        Ok(())
    }

    /// Undoes [`apply_errors`](Self::apply_errors), restoring the original edge set
    pub fn reverse_errors(&mut self, errors: &[ParentageError]) -> Result<()> {
        for error in errors.iter().rev() {
            for &parent in &error.added_parents {
                self.remove_edge(parent, error.child)?;
            }
            for &parent in &error.removed_parents {
                self.add_edge(parent, error.child)?;
            }
        }
        Ok(())
    }
}

impl GenealogicalGraph {
    fn ploid_error_for<R: Rng + ?Sized>(
        &self,
        individual: VertexId,
        rng: &mut R,
    ) -> Result<Option<ParentageError>> {
        let (first, second) = Pedigree::ploid_ids(individual);
        let mut child_ploids = Vec::with_capacity(2);
        for ploid in [first, second] {
            if self.contains(ploid) {
                let mut parents = self.parents(ploid)?;
                parents.sort_unstable();
                child_ploids.push((ploid, parents));
            }
        }

        let mut parent_individuals: Vec<VertexId> = child_ploids
            .iter()
            .flat_map(|(_, parents)| parents.iter().map(|&p| Pedigree::individual_id(p)))
            .collect();
        parent_individuals.sort_unstable();
        parent_individuals.dedup();
        if parent_individuals.is_empty() {
            return Ok(None);
        }

        let removed = parent_individuals[rng.gen_range(0..parent_individuals.len())];
        let (removed_first, removed_second) = Pedigree::ploid_ids(removed);
        let Some(child) = child_ploids
            .iter()
            .find(|(_, parents)| parents.as_slice() == [removed_first, removed_second])
            .map(|(ploid, _)| *ploid)
        else {
            return Ok(None);
        };

        let child_level = self.vertex_level(child)?;
        let mut replacements: Vec<VertexId> = Vec::new();
        for &ploid in self.vertices_at_level(self.vertex_level(removed_first)?)? {
            let candidate = Pedigree::individual_id(ploid);
            if parent_individuals.contains(&candidate) || replacements.contains(&candidate) {
                continue;
            }
            let (candidate_first, candidate_second) = Pedigree::ploid_ids(candidate);
            let mut above_child = true;
            for candidate_ploid in [candidate_first, candidate_second] {
                above_child &= self.contains(candidate_ploid)
                    && self.vertex_level(candidate_ploid)? < child_level;
            }
            if above_child {
                replacements.push(candidate);
            }
        }
        if replacements.is_empty() {
            return Ok(None);
        }

        let added = replacements[rng.gen_range(0..replacements.len())];
        let (added_first, added_second) = Pedigree::ploid_ids(added);
        Ok(Some(ParentageError {
            child,
            removed_parents: vec![removed_first, removed_second],
            added_parents: vec![added_first, added_second],
        }))
    }
}

/// Poisson number of errors with mean `rate * candidates`, capped at `candidates`
fn draw_error_count<R: Rng + ?Sized>(rate: f64, candidates: usize, rng: &mut R) -> Result<usize> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(Error::InvalidArgument(format!(
            "error rate must lie in [0, 1], got {}",
            rate
        )));
    }
    let mean = rate * candidates as f64;
    if mean <= 0.0 {
        return Ok(0);
    }

    let poisson = Poisson::new(mean)
        .map_err(|e| Error::InvalidArgument(format!("invalid Poisson mean {}: {}", mean, e)))?;
    let count = (poisson.sample(rng) as usize).min(candidates);
    debug!(
        "Drawing {} parentage errors among {} individuals with parents",
        count, candidates
    );
    Ok(count)
}

/// A random vertex from `level` that is not among `parents`
fn pick_replacement<R: Rng + ?Sized>(
    level: &[VertexId],
    parents: &[VertexId],
    rng: &mut R,
) -> Option<VertexId> {
    for _ in 0..2 * level.len() {
        let candidate = level[rng.gen_range(0..level.len())];
        if !parents.contains(&candidate) {
            return Some(candidate);
        }
    }

    let remaining: Vec<VertexId> = level
        .iter()
        .copied()
        .filter(|candidate| !parents.contains(candidate))
        .collect();
    if remaining.is_empty() {
        None
    } else {
        Some(remaining[rng.gen_range(0..remaining.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genealogy::Genealogy;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // Three founder couples with two children each, and a grandchild generation
    fn create_test_graph() -> GenealogicalGraph {
        let mut graph = GenealogicalGraph::new();
        for (couple, child_base) in [((1, 2), 10), ((3, 4), 20), ((5, 6), 30)] {
            graph.add_parents(child_base, &[couple.0, couple.1]).unwrap();
            graph.add_parents(child_base + 1, &[couple.0, couple.1]).unwrap();
        }
        graph.add_parents(40, &[10, 21]).unwrap();
        graph.add_parents(41, &[20, 31]).unwrap();
        graph.add_parents(42, &[30, 11]).unwrap();
        graph
    }

    #[test]
    fn test_rate_out_of_range() {
        let graph = create_test_graph();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            graph.simulate_parentage_errors(1.5, &mut rng),
            Err(Error::InvalidArgument(_))
        ));
        assert!(graph.simulate_parentage_errors(f64::NAN, &mut rng).is_err());
    }

    #[test]
    fn test_zero_rate_draws_nothing() {
        let graph = create_test_graph();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(graph.simulate_parentage_errors(0.0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_errors_replace_within_level() {
        let graph = create_test_graph();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let errors = graph.simulate_parentage_errors(1.0, &mut rng).unwrap();
        assert!(errors.len() <= 9);

        let mut children: Vec<VertexId> = errors.iter().map(|error| error.child).collect();
        children.sort_unstable();
        children.dedup();
        assert_eq!(children.len(), errors.len());

        for error in &errors {
            let removed = error.removed_parents[0];
            let added = error.added_parents[0];
            assert!(graph.has_edge(removed, error.child));
            assert!(!graph.has_edge(added, error.child));
            assert_eq!(
                graph.vertex_level(removed).unwrap(),
                graph.vertex_level(added).unwrap()
            );
        }
    }

    #[test]
    fn test_apply_and_reverse_restores_edges() {
        let mut graph = create_test_graph();
        let mut original = graph.edges();
        original.sort_unstable();

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let errors = graph.introduce_and_record_errors(1.0, &mut rng, true).unwrap();
        assert!(graph.levels().is_ok());
        for error in &errors {
            assert!(graph.has_edge(error.added_parents[0], error.child));
            assert!(!graph.has_edge(error.removed_parents[0], error.child));
        }

        graph.reverse_errors(&errors).unwrap();
        let mut restored = graph.edges();
        restored.sort_unstable();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_record_without_applying() {
        let mut graph = create_test_graph();
        let before = graph.edges();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        graph.introduce_and_record_errors(0.5, &mut rng, false).unwrap();
        assert_eq!(graph.edges(), before);
    }

    #[test]
    fn test_ploid_errors_move_whole_individuals() {
        let pedigree = Pedigree::from_graph(create_test_graph()).unwrap();
        let mut ploids = pedigree.to_ploid_graph().unwrap();
        let mut original = ploids.edges();
        original.sort_unstable();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let errors = ploids.simulate_ploid_parentage_errors(1.0, &mut rng).unwrap();
        assert!(!errors.is_empty());

        let mut individuals: Vec<VertexId> = errors
            .iter()
            .map(|error| Pedigree::individual_id(error.child))
            .collect();
        individuals.sort_unstable();
        individuals.dedup();
        assert_eq!(individuals.len(), errors.len());

        for error in &errors {
            let [removed_first, removed_second] = error.removed_parents[..] else {
                panic!("expected two removed ploids");
            };
            let [added_first, added_second] = error.added_parents[..] else {
                panic!("expected two added ploids");
            };
            assert_eq!(Pedigree::other_ploid(removed_first), removed_second);
            assert_eq!(Pedigree::other_ploid(added_first), added_second);
            assert!(ploids.has_edge(removed_first, error.child));
            assert!(ploids.has_edge(removed_second, error.child));

            let child = Pedigree::individual_id(error.child);
            let added = Pedigree::individual_id(added_first);
            assert!(!pedigree.graph().parents(child).unwrap().contains(&added));
        }

        ploids.apply_errors(&errors).unwrap();
        assert!(ploids.levels().is_ok());
        for error in &errors {
            let mut parents = ploids.parents(error.child).unwrap();
            parents.sort_unstable();
            assert_eq!(parents, error.added_parents);
        }

        ploids.reverse_errors(&errors).unwrap();
        let mut restored = ploids.edges();
        restored.sort_unstable();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_ploid_errors_reject_bad_rate() {
        let ploids = Pedigree::from_graph(create_test_graph())
            .unwrap()
            .to_ploid_graph()
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            ploids.simulate_ploid_parentage_errors(-0.1, &mut rng),
            Err(Error::InvalidArgument(_))
        ));
        assert!(ploids.simulate_ploid_parentage_errors(0.0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_pick_replacement_exhausted() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(pick_replacement(&[1, 2], &[1, 2], &mut rng), None);
        assert_eq!(pick_replacement(&[1, 2, 3], &[1, 2], &mut rng), Some(3));
    }
}
