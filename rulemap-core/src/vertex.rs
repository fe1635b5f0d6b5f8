//! Vertex kinds — the small type system of the schema graph.
//!
//! Every node in the schema graph is either an *identifier* (a sub-structure
//! that other attributes hang off) or a leaf value constraint: an enumeration
//! of legal literals, a bounded or unbounded number, or free text. The kinds
//! form a single tagged union so that adding a kind forces every `match` in
//! the crate to be revisited.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::VertexId;

/// The kind (and kind-specific payload) of a schema vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VertexKind {
    /// A sub-structure node. The only kind that allows outgoing edges;
    /// has no literal form of its own.
    Identifier,
    /// A finite, mutable set of legal string literals. Insertion-ordered
    /// and duplicate-free; grows in place during checking (the graph's only
    /// checker-driven mutation).
    Enumeration(Vec<String>),
    /// Any literal that parses as a signed 64-bit integer.
    Integer,
    /// An integer with inclusive bounds.
    IntegerRange {
        /// Smallest legal value.
        low: i64,
        /// Largest legal value.
        high: i64,
    },
    /// Any literal that parses as a 64-bit float (integer literals qualify).
    Float,
    /// A float with inclusive bounds.
    FloatRange {
        /// Smallest legal value.
        low: f64,
        /// Largest legal value.
        high: f64,
    },
    /// Free text; accepts any literal.
    Text,
}

impl VertexKind {
    /// Whether vertices of this kind may be the source of outgoing edges.
    ///
    /// Holds exactly for [`VertexKind::Identifier`]; every leaf kind rejects
    /// emanating edges.
    #[must_use]
    pub fn allows_emanating_edges(&self) -> bool {
        matches!(self, Self::Identifier)
    }

    /// Whether `literal` is a legal value for this kind.
    ///
    /// Identifiers have no literal form and always return `false`. For the
    /// numeric kinds a parse failure is simply an invalid literal, never an
    /// error — the checker reports it as a type mismatch.
    #[must_use]
    pub fn is_valid(&self, literal: &str) -> bool {
        match self {
            Self::Identifier => false,
            Self::Enumeration(choices) => choices.iter().any(|c| c == literal),
            Self::Integer => literal.parse::<i64>().is_ok(),
            Self::IntegerRange { low, high } => literal
                .parse::<i64>()
                .is_ok_and(|v| *low <= v && v <= *high),
            Self::Float => parse_float(literal).is_some(),
            Self::FloatRange { low, high } => {
                parse_float(literal).is_some_and(|v| *low <= v && v <= *high)
            }
            Self::Text => true,
        }
    }

    /// Parse-only validity, ignoring range bounds.
    ///
    /// Used by the checker for ordering relations: a probe like `^count < 20`
    /// against an integer range `[0, 10]` is a legal *test* even though 20 is
    /// not a legal *value*. Non-numeric kinds fall back to [`Self::is_valid`].
    #[must_use]
    pub fn accepts_numeric(&self, literal: &str) -> bool {
        match self {
            Self::Integer | Self::IntegerRange { .. } => literal.parse::<i64>().is_ok(),
            Self::Float | Self::FloatRange { .. } => parse_float(literal).is_some(),
            _ => self.is_valid(literal),
        }
    }

    /// Add a literal to an [`VertexKind::Enumeration`].
    ///
    /// Returns whether membership changed: `true` exactly the first time a
    /// literal is added, `false` for duplicates and for non-enumeration
    /// kinds. The idempotence is what suppresses duplicate growth findings.
    pub fn add_literal(&mut self, value: &str) -> bool {
        match self {
            Self::Enumeration(choices) => {
                if choices.iter().any(|c| c == value) {
                    false
                } else {
                    choices.push(value.to_string());
                    true
                }
            }
            _ => false,
        }
    }

    /// Short lowercase name used in log events and findings.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Enumeration(_) => "enumeration",
            Self::Integer => "integer",
            Self::IntegerRange { .. } => "integer-range",
            Self::Float => "float",
            Self::FloatRange { .. } => "float-range",
            Self::Text => "string",
        }
    }
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Float grammar shared by [`VertexKind::Float`] and [`VertexKind::FloatRange`]:
/// anything Rust's `f64` parser accepts except NaN/infinity keywords, which
/// are not legal working-memory literals.
fn parse_float(literal: &str) -> Option<f64> {
    let v = literal.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

/// A vertex of the schema graph: a stable identity plus its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    id: VertexId,
    kind: VertexKind,
}

impl Vertex {
    pub(crate) fn new(id: VertexId, kind: VertexKind) -> Self {
        Self { id, kind }
    }

    /// The vertex's identity within its graph.
    #[must_use]
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// The vertex's kind.
    #[must_use]
    pub fn kind(&self) -> &VertexKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut VertexKind {
        &mut self.kind
    }

    /// Whether this vertex may be the source of outgoing edges.
    #[must_use]
    pub fn allows_emanating_edges(&self) -> bool {
        self.kind.allows_emanating_edges()
    }

    /// Whether `literal` is a legal value for this vertex.
    #[must_use]
    pub fn is_valid(&self, literal: &str) -> bool {
        self.kind.is_valid(literal)
    }

    /// Deep copy of the kind payload for clone-with-new-identity; the graph
    /// assigns the fresh id.
    pub(crate) fn duplicate_kind(&self) -> VertexKind {
        self.kind.clone()
    }
}
