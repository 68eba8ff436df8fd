//! Error types for genealogical graph operations

use crate::types::VertexId;
use thiserror::Error;

/// Result type alias using the crate's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by graph mutation, kinship and clade queries
#[derive(Error, Debug)]
pub enum Error {
    /// Parent-count or tree-invariant violation
    #[error("Structural error: {0}")]
    Structural(String),

    /// The parent relation is not acyclic; carries the vertices left unresolved
    #[error("Cycle detected among {} vertices", .0.len())]
    Cycle(Vec<VertexId>),

    #[error("Vertex not found: {0}")]
    VertexNotFound(VertexId),

    #[error("Edge not found: {parent} -> {child}")]
    EdgeNotFound { parent: VertexId, child: VertexId },

    #[error("Vertices {0} and {1} are not connected")]
    NotConnected(VertexId, VertexId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::VertexNotFound(7).to_string(), "Vertex not found: 7");
        assert_eq!(
            Error::EdgeNotFound { parent: 1, child: 2 }.to_string(),
            "Edge not found: 1 -> 2"
        );
        assert_eq!(Error::Cycle(vec![1, 2, 3]).to_string(), "Cycle detected among 3 vertices");
        assert_eq!(Error::NotConnected(4, 5).to_string(), "Vertices 4 and 5 are not connected");
    }
}
