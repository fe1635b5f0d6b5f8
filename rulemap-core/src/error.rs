//! Error types for the rulemap core library.

use thiserror::Error;

use crate::types::VertexId;

/// Top-level error type for all rulemap operations.
///
/// Conformance findings are deliberately *not* represented here: a rule that
/// disagrees with the schema is data (see [`crate::checker::Finding`]), not a
/// failure of the checking machinery.
#[derive(Error, Debug)]
pub enum RulemapError {
    /// Rule text was structurally malformed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A serialized schema file did not match the expected line format.
    #[error("schema format error at line {line}: {message}")]
    SchemaFormat {
        /// 1-based line number in the schema file.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// An edge was added with a leaf vertex as its source.
    #[error("vertex {vertex} does not allow emanating edges")]
    LeafEdgeSource {
        /// The offending source vertex.
        vertex: VertexId,
    },

    /// A vertex id that is not present in the graph.
    #[error("unknown vertex: {vertex}")]
    UnknownVertex {
        /// The id that failed to resolve.
        vertex: VertexId,
    },

    /// A value could not be written in the schema text format.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A positioned rule-text parse failure.
///
/// The first structural error aborts parsing of the remainder of the file;
/// `line` and `column` let an editor mark the exact spot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ParseError {
    /// Create a parse error at the given position.
    #[must_use]
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, RulemapError>;
