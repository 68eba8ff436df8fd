pub mod clade;
pub mod tree;

pub use clade::CladeStats;
pub use tree::CoalescentTree;
