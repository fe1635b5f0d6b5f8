//! The structured rule model produced by parsing.
//!
//! Productions are transient: they are rebuilt fresh from rule text on every
//! check run and never persisted. The checker consumes this model, not raw
//! text, so any conforming parser can be substituted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named rule: an ordered condition side plus an ordered action side.
///
/// Variable bindings chain across condition lines — a variable bound in one
/// line's value position becomes the subject of a later line, which is how
/// multi-level memory paths are expressed one hop at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    /// The production's name.
    pub name: String,
    /// Optional documentation string following the name.
    pub doc: Option<String>,
    /// Condition side, in source order.
    pub conditions: Vec<Condition>,
    /// Action side, in source order.
    pub actions: Vec<Action>,
}

/// The subject a condition line is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    /// `(state <s> …)` — the variable denotes the implicit root.
    State(String),
    /// `(<v> …)` — a plain variable bound by an earlier condition line.
    Variable(String),
}

impl Subject {
    /// The variable name regardless of the state designation.
    #[must_use]
    pub fn variable(&self) -> &str {
        match self {
            Self::State(v) | Self::Variable(v) => v,
        }
    }

    /// Whether this subject claims the root role.
    #[must_use]
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }
}

/// One condition line: a subject plus its attribute-value tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Whether the whole condition is negated (`-( … )`).
    pub negated: bool,
    /// The variable the tests are scoped to.
    pub subject: Subject,
    /// Attribute-value tests, in source order.
    pub tests: Vec<AttributeTest>,
}

/// A single `^attribute value` test within a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeTest {
    /// Whether the test is negated (`-^attr value`).
    pub negated: bool,
    /// Attribute path segments; `^position.x` parses into two segments.
    pub path: Vec<String>,
    /// The test applied to the value position.
    pub value: ValueTest,
}

impl AttributeTest {
    /// The dotted attribute path as written in the rule.
    #[must_use]
    pub fn path_display(&self) -> String {
        self.path.join(".")
    }
}

/// Relational operators of the rule language — a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    /// `=`
    Equal,
    /// `<>`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `<=>` — same-type test.
    SameType,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::SameType => "<=>",
        };
        f.write_str(s)
    }
}

/// The term a relational test compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestTerm {
    /// A literal constant.
    Constant(String),
    /// A variable; its value is only known at run time.
    Variable(String),
}

impl fmt::Display for TestTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => f.write_str(c),
            Self::Variable(v) => write!(f, "<{v}>"),
        }
    }
}

/// A test applied to the value position of an attribute test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueTest {
    /// No value written; matches anything.
    Anything,
    /// Plain equality against a literal.
    Constant(String),
    /// A variable; binds to the destination vertex for later lines.
    Variable(String),
    /// A relational comparison, e.g. `< 5`.
    Relational(Relation, TestTerm),
    /// `<< a b c >>` — satisfied if any constant matches.
    Disjunction(Vec<String>),
    /// `{ … }` — all sub-tests must hold.
    Conjunction(Vec<ValueTest>),
}

impl fmt::Display for ValueTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anything => f.write_str("*"),
            Self::Constant(c) => f.write_str(c),
            Self::Variable(v) => write!(f, "<{v}>"),
            Self::Relational(rel, term) => write!(f, "{rel} {term}"),
            Self::Disjunction(items) => {
                f.write_str("<<")?;
                for item in items {
                    write!(f, " {item}")?;
                }
                f.write_str(" >>")
            }
            Self::Conjunction(tests) => {
                f.write_str("{")?;
                for (i, t) in tests.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// One `^attribute value+` assertion on the action side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// The variable the assertion is made against.
    pub subject: String,
    /// Attribute path segments.
    pub path: Vec<String>,
    /// Asserted values with their preference markers.
    pub values: Vec<ActionValue>,
}

impl Action {
    /// The dotted attribute path as written in the rule.
    #[must_use]
    pub fn path_display(&self) -> String {
        self.path.join(".")
    }
}

/// A single asserted value plus its preference annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionValue {
    /// The value expression.
    pub value: RhsValue,
    /// Preference markers following the value, in source order.
    pub preferences: Vec<Preference>,
}

/// A value expression on the right-hand side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RhsValue {
    /// A literal constant.
    Constant(String),
    /// A variable reference.
    Variable(String),
    /// A function call, e.g. `(+ <x> 1)`; cannot be statically validated.
    FunctionCall {
        /// Function name.
        name: String,
        /// Argument expressions.
        args: Vec<RhsValue>,
    },
}

impl fmt::Display for RhsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => f.write_str(c),
            Self::Variable(v) => write!(f, "<{v}>"),
            Self::FunctionCall { name, args } => {
                write!(f, "({name}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Unary preference markers on asserted values — a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preference {
    /// `+`
    Acceptable,
    /// `-`
    Reject,
    /// `!`
    Require,
    /// `~`
    Prohibit,
    /// `=`
    Indifferent,
    /// `>`
    Best,
    /// `<`
    Worst,
    /// `&`
    Unary,
}

/// A flattened (variable, attribute, value) unit, carried inside conformance
/// findings so tools can point at the exact expression that was checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    /// The subject variable name.
    pub variable: String,
    /// The dotted attribute path.
    pub attribute: String,
    /// The value expression as written.
    pub value: String,
    /// Whether the subject denotes the implicit state/root.
    pub from_state: bool,
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(<{}> ^{} {})", self.variable, self.attribute, self.value)
    }
}
