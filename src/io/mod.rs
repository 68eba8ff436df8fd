pub mod parser;

pub use parser::{ParserSettings, PedigreeParser};
