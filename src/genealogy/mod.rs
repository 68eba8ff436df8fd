pub mod graph;
pub mod pedigree;
pub mod perturbation;
pub mod traversal;

pub use graph::{Branch, GenealogicalGraph, DEFAULT_MAX_PARENTS};
pub use pedigree::{ParentsBySex, Pedigree};
pub use perturbation::ParentageError;
pub use traversal::{GraphStatistics, GraphTraversal, TraversalDirection};

/// Shared read access to the underlying genealogical graph.
///
/// Implemented by the plain graph and by its refinements so that analyses such as
/// kinship can run on any of them.
pub trait Genealogy {
    fn graph(&self) -> &GenealogicalGraph;
}

impl Genealogy for GenealogicalGraph {
    fn graph(&self) -> &GenealogicalGraph {
        self
    }
}
