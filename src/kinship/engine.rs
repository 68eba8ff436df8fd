use crate::error::{Error, Result};
use crate::genealogy::{GenealogicalGraph, Genealogy};
use crate::kinship::arena::KinshipArena;
use crate::kinship::matrix::KinshipMatrix;
use crate::kinship::pair::PairSolver;
use crate::kinship::state::{KinshipState, KinshipStats, Row};
use crate::kinship::KinshipMode;
use crate::types::VertexId;
use tracing::{debug, info, instrument};

/// Pairwise kinship coefficients over a genealogy.
///
/// The engine only reads the graph; each call builds and discards its own
/// transient state.
pub struct KinshipEngine<'a> {
    graph: &'a GenealogicalGraph,
}

impl<'a> KinshipEngine<'a> {
    pub fn new<G: Genealogy + ?Sized>(genealogy: &'a G) -> Self {
        Self {
            graph: genealogy.graph(),
        }
    }

    /// Kinship coefficient of a single pair
    #[instrument(skip(self))]
    pub fn calculate_kinship(&self, first: VertexId, second: VertexId) -> Result<f64> {
        let vertices = self.graph.ascending_vertices(&[first, second])?;
        let arena = KinshipArena::build(self.graph, &vertices)?;
        let (Some(a), Some(b)) = (arena.index_of(first), arena.index_of(second)) else {
            return Err(Error::VertexNotFound(first));
        };

        let mut solver = PairSolver::new(&arena);
        let value = solver.kinship(a, b);
        debug!(
            "Kinship of ({}, {}) = {} after {} pair evaluations",
            first,
            second,
            value,
            solver.evaluated_pairs()
        );
        Ok(value)
    }

    /// Kinship matrix over the sinks, or over `probands` when given
    #[instrument(skip(self, probands))]
    pub fn calculate_probands_kinship(
        &self,
        mode: KinshipMode,
        probands: Option<&[VertexId]>,
    ) -> Result<KinshipMatrix> {
        self.calculate_probands_kinship_with_stats(mode, probands)
            .map(|(matrix, _)| matrix)
    }

    /// Same as [`calculate_probands_kinship`](Self::calculate_probands_kinship), also
    /// returning the sweep counters
    pub fn calculate_probands_kinship_with_stats(
        &self,
        mode: KinshipMode,
        probands: Option<&[VertexId]>,
    ) -> Result<(KinshipMatrix, KinshipStats)> {
        let targets = match probands {
            Some(probands) => probands.to_vec(),
            None => self.graph.sinks(),
        };
        self.sweep(mode, &targets)
    }

    /// Kinship between every pair of vertices in the graph
    pub fn calculate_all_kinship(&self) -> Result<KinshipMatrix> {
        let vertices = self.graph.vertices();
        self.sweep(KinshipMode::FullRetention, &vertices)
            .map(|(matrix, _)| matrix)
    }

    /// Level-ordered evaluation of the recurrence over the targets' ascending genealogy.
    ///
    /// For a vertex `v` with parents `p`: `phi(v, u) = 1/2 * sum phi(p, u)` for every
    /// previously processed `u`, which is accumulated from the parents' stored rows
    /// plus their self-kinship for the parent-offspring terms.
    fn sweep(&self, mode: KinshipMode, targets: &[VertexId]) -> Result<(KinshipMatrix, KinshipStats)> {
        let vertices = self.graph.ascending_vertices(targets)?;
        let arena = KinshipArena::build(self.graph, &vertices)?;
        info!(
            "Computing kinship for {} targets over {} ancestral vertices ({})",
            targets.len(),
            arena.len(),
            mode
        );

        let child_counts = (0..arena.len() as u32)
            .map(|position| arena.record(position).children.len() as u32)
            .collect();
        let mut pinned = vec![false; arena.len()];
        for &target in targets {
            if let Some(position) = arena.index_of(target) {
                pinned[position as usize] = true;
            }
        }
        let mut state = KinshipState::new(mode, child_counts, pinned);

        for position in 0..arena.len() as u32 {
            let record = arena.record(position);
            let self_value = match record.parents {
                [Some(p), Some(q)] => 0.5 * (1.0 + state.get(p, q)),
                _ => 0.5,
            };

            let mut row = Row::new();
            if state.needs_row(position) {
                for parent in record.parent_indices() {
                    if let Some(parent_row) = state.row(parent) {
                        for (&partner, &value) in parent_row {
                            *row.entry(partner).or_insert(0.0) += value / 2.0;
                        }
                    }
                    *row.entry(parent).or_insert(0.0) += state.self_kinship(parent) / 2.0;
                }
            }
            state.store(position, self_value, row);

            for parent in record.parent_indices() {
                state.child_done(parent);
            }
        }

        let mut matrix = KinshipMatrix::new(targets.to_vec());
        let ids = matrix.ids().to_vec();
        for target in ids {
            let Some(position) = arena.index_of(target) else {
                continue;
            };
            matrix.set(target, target, state.self_kinship(position));
            if let Some(row) = state.row(position) {
                for (&partner, &value) in row {
                    let partner_id = arena.id_of(partner);
                    if partner_id > target {
                        matrix.set(target, partner_id, value);
                    }
                }
            }
        }

        let stats = state.stats();
        debug!(
            "Kinship sweep done: {} processed, {} evicted, peak {} rows / {} pairs",
            stats.processed, stats.evicted, stats.peak_live, stats.peak_pairs
        );
        Ok((matrix, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genealogy::Pedigree;
    use rand::seq::index::sample;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const TOLERANCE: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    // Founders A=1, B=2 with child C=3
    fn create_trio() -> GenealogicalGraph {
        let mut graph = GenealogicalGraph::new();
        graph.add_parents(3, &[1, 2]).unwrap();
        graph
    }

    // Full siblings 5 and 6 have children 8 and 9 with outsiders 3 and 4.
    // The first cousins 8 and 9 then have children 10 and 11; 9 also has 12 with 7.
    fn create_cousin_pedigree() -> GenealogicalGraph {
        let mut graph = GenealogicalGraph::new();
        graph.add_parents(5, &[1, 2]).unwrap();
        graph.add_parents(6, &[1, 2]).unwrap();
        graph.add_parents(8, &[5, 3]).unwrap();
        graph.add_parents(9, &[6, 4]).unwrap();
        graph.add_parents(10, &[8, 9]).unwrap();
        graph.add_parents(11, &[8, 9]).unwrap();
        graph.add_parents(12, &[9, 7]).unwrap();
        graph
    }

    #[test]
    fn test_trio() {
        let graph = create_trio();
        let engine = KinshipEngine::new(&graph);
        assert_close(engine.calculate_kinship(1, 1).unwrap(), 0.5);
        assert_close(engine.calculate_kinship(1, 2).unwrap(), 0.0);
        assert_close(engine.calculate_kinship(3, 3).unwrap(), 0.5);
        assert_close(engine.calculate_kinship(1, 3).unwrap(), 0.25);
        assert_close(engine.calculate_kinship(2, 3).unwrap(), 0.25);
    }

    #[test]
    fn test_full_siblings() {
        let mut graph = create_trio();
        graph.add_parents(4, &[1, 2]).unwrap();
        let engine = KinshipEngine::new(&graph);
        assert_close(engine.calculate_kinship(3, 4).unwrap(), 0.25);

        let matrix = engine
            .calculate_probands_kinship(KinshipMode::IncrementalEviction, None)
            .unwrap();
        assert_eq!(matrix.ids(), &[3, 4]);
        assert_close(matrix.get(3, 4).unwrap(), 0.25);
        assert_close(matrix.get(4, 4).unwrap(), 0.5);
    }

    #[test]
    fn test_missing_vertex() {
        let graph = create_trio();
        let engine = KinshipEngine::new(&graph);
        assert!(matches!(engine.calculate_kinship(1, 42), Err(Error::VertexNotFound(42))));
        assert!(matches!(
            engine.calculate_probands_kinship(KinshipMode::FullRetention, Some(&[3, 42])),
            Err(Error::VertexNotFound(42))
        ));
    }

    #[test]
    fn test_inbred_self_kinship() {
        let graph = create_cousin_pedigree();
        let engine = KinshipEngine::new(&graph);
        // 8 and 9 are first cousins: phi = 1/16
        assert_close(engine.calculate_kinship(8, 9).unwrap(), 0.0625);
        assert_close(engine.calculate_kinship(10, 10).unwrap(), 0.53125);
        for vertex in graph.vertices() {
            assert!(engine.calculate_kinship(vertex, vertex).unwrap() >= 0.5);
        }
    }

    // Vertices 0..size in id order; each non-founder draws up to two earlier parents
    fn random_pedigree(rng: &mut ChaCha8Rng, size: usize) -> GenealogicalGraph {
        let mut graph = GenealogicalGraph::new();
        for vertex in 0..size {
            graph.add_vertex(vertex as VertexId);
            if vertex < 4 {
                continue;
            }
            let count = rng.gen_range(0..=2);
            let parents: Vec<VertexId> = sample(rng, vertex, count)
                .into_iter()
                .map(|parent| parent as VertexId)
                .collect();
            graph.add_parents(vertex as VertexId, &parents).unwrap();
        }
        graph
    }

    #[test]
    fn test_modes_agree_on_random_pedigrees() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for _ in 0..25 {
            let graph = random_pedigree(&mut rng, 30);
            let engine = KinshipEngine::new(&graph);
            let all = engine.calculate_all_kinship().unwrap();

            let subset_size = rng.gen_range(1..=graph.vertex_count());
            let subset: Vec<VertexId> = sample(&mut rng, graph.vertex_count(), subset_size)
                .into_iter()
                .map(|vertex| vertex as VertexId)
                .collect();

            for probands in [None, Some(subset.as_slice())] {
                let full = engine
                    .calculate_probands_kinship(KinshipMode::FullRetention, probands)
                    .unwrap();
                let evicting = engine
                    .calculate_probands_kinship(KinshipMode::IncrementalEviction, probands)
                    .unwrap();
                assert_eq!(full.ids(), evicting.ids());

                for &a in full.ids() {
                    for &b in full.ids() {
                        let value = full.get(a, b).unwrap();
                        assert_close(evicting.get(a, b).unwrap(), value);
                        assert_close(evicting.get(b, a).unwrap(), value);
                        assert_close(all.get(a, b).unwrap(), value);
                    }
                }
            }

            for &a in &subset {
                for &b in &subset {
                    let value = engine.calculate_kinship(a, b).unwrap();
                    assert_close(engine.calculate_kinship(b, a).unwrap(), value);
                    assert_close(all.get(a, b).unwrap(), value);
                }
            }
        }
    }

    #[test]
    fn test_modes_are_equivalent_and_match_pairs() {
        let graph = create_cousin_pedigree();
        let engine = KinshipEngine::new(&graph);
        let (full, full_stats) = engine
            .calculate_probands_kinship_with_stats(KinshipMode::FullRetention, None)
            .unwrap();
        let (evicting, evicting_stats) = engine
            .calculate_probands_kinship_with_stats(KinshipMode::IncrementalEviction, None)
            .unwrap();

        assert_eq!(full.ids(), &[10, 11, 12]);
        assert_eq!(full.ids(), evicting.ids());
        for &a in full.ids() {
            for &b in full.ids() {
                let value = full.get(a, b).unwrap();
                assert_close(evicting.get(a, b).unwrap(), value);
                assert_close(full.get(b, a).unwrap(), value);
                assert_close(engine.calculate_kinship(a, b).unwrap(), value);
            }
        }

        assert_eq!(full_stats.evicted, 0);
        assert!(evicting_stats.evicted > 0);
        assert!(evicting_stats.peak_live <= full_stats.peak_live);
        assert_eq!(full_stats.processed, evicting_stats.processed);
    }

    #[test]
    fn test_all_kinship_matches_single_pairs() {
        let graph = create_cousin_pedigree();
        let engine = KinshipEngine::new(&graph);
        let matrix = engine.calculate_all_kinship().unwrap();
        assert_eq!(matrix.len(), graph.vertex_count());
        for &a in matrix.ids() {
            for &b in matrix.ids() {
                assert_close(matrix.get(a, b).unwrap(), engine.calculate_kinship(a, b).unwrap());
            }
        }
        // Unrelated founders
        assert_close(matrix.get(1, 3).unwrap(), 0.0);
        assert_close(matrix.get(4, 7).unwrap(), 0.0);
    }

    #[test]
    fn test_proband_subset_with_ancestor() {
        let graph = create_cousin_pedigree();
        let engine = KinshipEngine::new(&graph);
        let matrix = engine
            .calculate_probands_kinship(KinshipMode::IncrementalEviction, Some(&[1, 10]))
            .unwrap();
        // 1 is a great-grandparent of 10 through both parents
        assert_close(matrix.get(1, 10).unwrap(), engine.calculate_kinship(1, 10).unwrap());
        assert_close(matrix.get(1, 10).unwrap(), 0.125);
    }

    #[test]
    fn test_engine_accepts_pedigree() {
        let pedigree = Pedigree::from_graph(create_trio()).unwrap();
        let engine = KinshipEngine::new(&pedigree);
        assert_close(engine.calculate_kinship(3, 1).unwrap(), 0.25);
    }

    #[test]
    fn test_empty_subset() {
        let graph = create_trio();
        let engine = KinshipEngine::new(&graph);
        let matrix = engine
            .calculate_probands_kinship(KinshipMode::FullRetention, Some(&[]))
            .unwrap();
        assert!(matrix.is_empty());
    }
}
