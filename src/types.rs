//! Core types shared by the genealogy, kinship and coalescent modules

use crate::genealogy::{GraphStatistics, ParentageError};
use crate::kinship::{KinshipMode, KinshipStats};
use serde::{Deserialize, Serialize};

/// Identifier of an individual (or of a ploid, in ploid-expanded graphs)
pub type VertexId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Default for Sex {
    fn default() -> Self {
        Sex::Unknown
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinshipEntry {
    pub first: VertexId,
    pub second: VertexId,
    pub kinship: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinshipReport {
    pub mode: KinshipMode,
    pub vertices: Vec<VertexId>,
    /// Non-zero coefficients with `first <= second`
    pub entries: Vec<KinshipEntry>,
    pub stats: Option<KinshipStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSummary {
    pub level: usize,
    pub vertices: Vec<VertexId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AscendingReport {
    pub seeds: Vec<VertexId>,
    pub total_vertices: usize,
    pub levels: Vec<LevelSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CladeReport {
    pub criterion: CladeCriterion,
    pub root: Option<VertexId>,
    pub vertex: Option<VertexId>,
    pub clade_size: usize,
    pub proband_count: usize,
    pub probands: Vec<VertexId>,
    pub unary_removed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CladeCriterion {
    Size,
    Probands,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionEntry {
    pub vertex: VertexId,
    pub factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionReport {
    pub target_count: usize,
    /// Founders ordered by decreasing contribution
    pub founders: Vec<ContributionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerturbationReport {
    pub error_rate: f64,
    pub seed: Option<u64>,
    pub candidates: usize,
    pub errors: Vec<ParentageError>,
}

/// Any report the command-line tool can render
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Report {
    Kinship(KinshipReport),
    Ascending(AscendingReport),
    Statistics(GraphStatistics),
    Clade(CladeReport),
    Contribution(ContributionReport),
    Perturbation(PerturbationReport),
}

impl KinshipReport {
    /// Mean of the off-diagonal coefficients over all pairs, zeros included
    pub fn mean_pairwise_kinship(&self) -> f64 {
        let n = self.vertices.len();
        if n < 2 {
            return 0.0;
        }
        let sum: f64 = self
            .entries
            .iter()
            .filter(|entry| entry.first != entry.second)
            .map(|entry| entry.kinship)
            .sum();
        sum / (n * (n - 1) / 2) as f64
    }

    pub fn related_pair_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.first != entry.second)
            .count()
    }
}

impl PerturbationReport {
    pub fn edges_changed(&self) -> usize {
        self.errors
            .iter()
            .map(|error| error.removed_parents.len() + error.added_parents.len())
            .sum()
    }
}
