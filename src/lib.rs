pub mod coalescent;
pub mod config;
pub mod error;
pub mod genealogy;
pub mod io;
pub mod kinship;
pub mod reports;
pub mod types;

pub use coalescent::CoalescentTree;
pub use error::{Error, Result};
pub use genealogy::{GenealogicalGraph, Genealogy, Pedigree};
pub use io::PedigreeParser;
pub use kinship::{KinshipEngine, KinshipMatrix, KinshipMode};
pub use types::VertexId;
