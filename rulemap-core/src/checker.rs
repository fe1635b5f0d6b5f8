//! The conformance checker — rule productions against the schema graph.
//!
//! Given a graph and a file's parsed productions, the checker decides for
//! every attribute-value expression whether the memory path it describes is
//! consistent with the declared schema. Conditions only ever *test* the
//! schema; actions may *grow* it in two controlled ways: widening an
//! enumeration with a newly asserted literal, and synthesizing a brand-new
//! attribute (vertex plus edge) that a rule introduces. Ranges are never
//! widened — growth never loosens an existing bound.
//!
//! Findings are non-fatal. The checker keeps evaluating every remaining
//! test, line and production after recording one, so a single run surfaces
//! every violation in one pass. Findings are delivered through a
//! caller-supplied [`FindingSink`]; the graph mutation is the only other
//! output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CheckerConfig;
use crate::graph::SchemaGraph;
use crate::parser::{
    Action, ActionValue, AttributeTest, Production, Relation, RhsValue, Subject, TestTerm, Triple,
    ValueTest,
};
use crate::types::{SubscriptionId, VertexId};
use crate::vertex::VertexKind;

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// The rule references structure or values the schema does not declare.
    Error,
    /// Informational: the schema grew to accommodate the rule.
    Note,
}

/// A single conformance finding.
///
/// The generated variants are not errors — they record schema growth so a
/// caller can decide whether drift is acceptable or a review trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Finding {
    /// A triple's path or value does not match the declared schema.
    BadConstraint {
        /// Production the triple came from.
        production: String,
        /// The offending (variable, attribute, value) expression.
        triple: Triple,
        /// Why the triple failed.
        reason: String,
    },
    /// A condition or action is scoped to a variable no earlier line bound.
    NoStateVariable {
        /// Production the line came from.
        production: String,
        /// The unbound variable.
        variable: String,
    },
    /// More than one condition line claims the root role.
    TooManyStateVariables {
        /// Production the line came from.
        production: String,
        /// The second state variable encountered.
        variable: String,
    },
    /// A new identifier vertex and edge were synthesized for the rule.
    GeneratedIdentifier {
        /// Production that introduced the attribute.
        production: String,
        /// The expression that drove the synthesis.
        triple: Triple,
    },
    /// An enumeration gained a newly observed literal (or a new enumeration
    /// attribute was synthesized around one).
    GeneratedEnumerationValue {
        /// Production that introduced the literal.
        production: String,
        /// The expression that drove the growth.
        triple: Triple,
    },
    /// A new integer vertex and edge were synthesized for the rule.
    GeneratedInteger {
        /// Production that introduced the attribute.
        production: String,
        /// The expression that drove the synthesis.
        triple: Triple,
    },
    /// A new float vertex and edge were synthesized for the rule.
    GeneratedFloat {
        /// Production that introduced the attribute.
        production: String,
        /// The expression that drove the synthesis.
        triple: Triple,
    },
}

impl Finding {
    /// The finding's severity: growth is informational, the rest are errors.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::BadConstraint { .. }
            | Self::NoStateVariable { .. }
            | Self::TooManyStateVariables { .. } => Severity::Error,
            Self::GeneratedIdentifier { .. }
            | Self::GeneratedEnumerationValue { .. }
            | Self::GeneratedInteger { .. }
            | Self::GeneratedFloat { .. } => Severity::Note,
        }
    }

    /// The production the finding belongs to.
    #[must_use]
    pub fn production(&self) -> &str {
        match self {
            Self::BadConstraint { production, .. }
            | Self::NoStateVariable { production, .. }
            | Self::TooManyStateVariables { production, .. }
            | Self::GeneratedIdentifier { production, .. }
            | Self::GeneratedEnumerationValue { production, .. }
            | Self::GeneratedInteger { production, .. }
            | Self::GeneratedFloat { production, .. } => production,
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadConstraint {
                production,
                triple,
                reason,
            } => write!(f, "{production}: bad constraint {triple}: {reason}"),
            Self::NoStateVariable {
                production,
                variable,
            } => write!(f, "{production}: no state variable binds <{variable}>"),
            Self::TooManyStateVariables {
                production,
                variable,
            } => write!(f, "{production}: too many state variables (<{variable}>)"),
            Self::GeneratedIdentifier { production, triple } => {
                write!(f, "{production}: generated identifier for {triple}")
            }
            Self::GeneratedEnumerationValue { production, triple } => {
                write!(f, "{production}: generated enumeration value for {triple}")
            }
            Self::GeneratedInteger { production, triple } => {
                write!(f, "{production}: generated integer for {triple}")
            }
            Self::GeneratedFloat { production, triple } => {
                write!(f, "{production}: generated float for {triple}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receives findings as the checker produces them.
///
/// A silent sink, a collecting sink and a GUI-marker sink (outside this
/// crate) all reuse the same checker through this seam.
pub trait FindingSink {
    /// Called once per finding, in discovery order.
    fn report(&mut self, finding: &Finding);
}

/// Discards every finding.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FindingSink for NullSink {
    fn report(&mut self, _finding: &Finding) {}
}

/// Accumulates findings for batch reporting.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    findings: Vec<Finding>,
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All findings collected so far, in discovery order.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Consume the sink, yielding its findings.
    #[must_use]
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    /// Number of error-severity findings.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity() == Severity::Error)
            .count()
    }

    /// Number of informational (schema growth) findings.
    #[must_use]
    pub fn note_count(&self) -> usize {
        self.findings.len() - self.error_count()
    }

    /// Serialize the batch report as pretty JSON.
    ///
    /// # Errors
    /// Returns [`crate::error::RulemapError::Serialization`] if encoding
    /// fails.
    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(&self.findings)
            .map_err(|e| crate::error::RulemapError::Serialization(e.to_string()))
    }
}

impl FindingSink for CollectingSink {
    fn report(&mut self, finding: &Finding) {
        self.findings.push(finding.clone());
    }
}

/// Fans findings out to any number of registered sinks, in registration
/// order — the checker-side counterpart of the graph's listener set.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<(SubscriptionId, Box<dyn FindingSink>)>,
    next_id: u64,
}

impl SinkSet {
    /// Create an empty sink set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink; returns a handle for unsubscription.
    pub fn subscribe(&mut self, sink: Box<dyn FindingSink>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.sinks.push((id, sink));
        id
    }

    /// Remove a sink. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(sid, _)| *sid != id);
        self.sinks.len() != before
    }
}

impl FindingSink for SinkSet {
    fn report(&mut self, finding: &Finding) {
        for (_, sink) in &mut self.sinks {
            sink.report(finding);
        }
    }
}

impl std::fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSet")
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// The check run
// ---------------------------------------------------------------------------

/// Check `productions` against `graph` with default configuration.
///
/// Purely a function of its inputs plus controlled graph mutation; no file
/// I/O, no presentation. See [`check_with_config`] for the growth gates.
pub fn check(graph: &mut SchemaGraph, productions: &[Production], sink: &mut dyn FindingSink) {
    check_with_config(graph, productions, &CheckerConfig::default(), sink);
}

/// Check `productions` against `graph`, honoring `config`'s growth gates and
/// reporting cap.
pub fn check_with_config(
    graph: &mut SchemaGraph,
    productions: &[Production],
    config: &CheckerConfig,
    sink: &mut dyn FindingSink,
) {
    debug!(productions = productions.len(), "conformance check started");
    let mut run = CheckRun {
        graph,
        config,
        sink,
        errors: 0,
        notes: 0,
        capped: false,
    };
    for production in productions {
        run.check_production(production);
    }
    info!(
        productions = productions.len(),
        errors = run.errors,
        notes = run.notes,
        "conformance check finished"
    );
}

struct CheckRun<'a> {
    graph: &'a mut SchemaGraph,
    config: &'a CheckerConfig,
    sink: &'a mut dyn FindingSink,
    errors: usize,
    notes: usize,
    capped: bool,
}

impl CheckRun<'_> {
    fn report(&mut self, finding: Finding) {
        match finding.severity() {
            Severity::Error => self.errors += 1,
            Severity::Note => self.notes += 1,
        }
        let cap = self.config.max_findings_per_run;
        if cap > 0 && self.errors + self.notes > cap {
            if !self.capped {
                self.capped = true;
                warn!(cap, "finding cap reached; further findings suppressed");
            }
            return;
        }
        self.sink.report(&finding);
    }

    /// Conditions strictly before actions; lines in source order — later
    /// lines depend on bindings established earlier.
    fn check_production(&mut self, production: &Production) {
        let mut bindings: HashMap<String, VertexId> = HashMap::new();
        let mut state_bound = false;

        for condition in &production.conditions {
            match &condition.subject {
                Subject::State(variable) => {
                    if state_bound && !bindings.contains_key(variable) {
                        self.report(Finding::TooManyStateVariables {
                            production: production.name.clone(),
                            variable: variable.clone(),
                        });
                    }
                    state_bound = true;
                    bindings.insert(variable.clone(), self.graph.root());
                }
                Subject::Variable(variable) => {
                    if !bindings.contains_key(variable) {
                        self.report(Finding::NoStateVariable {
                            production: production.name.clone(),
                            variable: variable.clone(),
                        });
                        continue;
                    }
                }
            }
            let subject_id = bindings[condition.subject.variable()];
            for test in &condition.tests {
                self.check_condition_test(production, condition, subject_id, test, &mut bindings);
            }
        }

        for action in &production.actions {
            self.check_action(production, action, &mut bindings);
        }
    }

    // -- condition side ----------------------------------------------------

    fn check_condition_test(
        &mut self,
        production: &Production,
        condition: &crate::parser::Condition,
        subject_id: VertexId,
        test: &AttributeTest,
        bindings: &mut HashMap<String, VertexId>,
    ) {
        let triple = Triple {
            variable: condition.subject.variable().to_string(),
            attribute: test.path_display(),
            value: test.value.to_string(),
            from_state: condition.subject.is_state(),
        };

        let Some(destination) = self.resolve_path(production, &triple, subject_id, &test.path)
        else {
            return;
        };

        let kind = match self.graph.vertex(destination) {
            Some(v) => v.kind().clone(),
            None => return,
        };
        self.check_value_test(production, &triple, destination, &kind, &test.value, bindings);
    }

    /// Walk the dotted attribute path from `start`. Conditions never grow
    /// the schema: every segment must already be declared.
    fn resolve_path(
        &mut self,
        production: &Production,
        triple: &Triple,
        start: VertexId,
        path: &[String],
    ) -> Option<VertexId> {
        let mut current = start;
        for (i, segment) in path.iter().enumerate() {
            let Some(edge) = self.graph.edge_to(current, segment) else {
                self.report(Finding::BadConstraint {
                    production: production.name.clone(),
                    triple: triple.clone(),
                    reason: format!("attribute '{segment}' is not declared"),
                });
                return None;
            };
            let to = edge.to;
            if i + 1 < path.len() {
                let allows = self
                    .graph
                    .vertex(to)
                    .is_some_and(crate::vertex::Vertex::allows_emanating_edges);
                if !allows {
                    self.report(Finding::BadConstraint {
                        production: production.name.clone(),
                        triple: triple.clone(),
                        reason: format!("attribute '{segment}' is a leaf; the path cannot continue"),
                    });
                    return None;
                }
            }
            current = to;
        }
        Some(current)
    }

    fn check_value_test(
        &mut self,
        production: &Production,
        triple: &Triple,
        destination: VertexId,
        kind: &VertexKind,
        value: &ValueTest,
        bindings: &mut HashMap<String, VertexId>,
    ) {
        match value {
            ValueTest::Anything => {}
            ValueTest::Constant(c) => {
                if !kind.is_valid(c) {
                    self.report(Finding::BadConstraint {
                        production: production.name.clone(),
                        triple: triple.clone(),
                        reason: format!("'{c}' is not a legal {kind} value"),
                    });
                }
            }
            ValueTest::Variable(v) => {
                // One hop per condition line: the binding lets a later line
                // continue the path from here.
                bindings.insert(v.clone(), destination);
            }
            ValueTest::Relational(relation, term) => {
                self.check_relational(production, triple, destination, kind, *relation, term, bindings);
            }
            ValueTest::Disjunction(items) => {
                if !items.iter().any(|c| kind.is_valid(c)) {
                    for c in items {
                        self.report(Finding::BadConstraint {
                            production: production.name.clone(),
                            triple: triple.clone(),
                            reason: format!("'{c}' is not a legal {kind} value"),
                        });
                    }
                }
            }
            ValueTest::Conjunction(tests) => {
                for t in tests {
                    self.check_value_test(production, triple, destination, kind, t, bindings);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_relational(
        &mut self,
        production: &Production,
        triple: &Triple,
        destination: VertexId,
        kind: &VertexKind,
        relation: Relation,
        term: &TestTerm,
        bindings: &mut HashMap<String, VertexId>,
    ) {
        match term {
            TestTerm::Variable(v) => {
                // Only `= <v>` establishes a binding; ordering relations
                // against variables are run-time-only and pass statically.
                if relation == Relation::Equal {
                    bindings.insert(v.clone(), destination);
                }
            }
            TestTerm::Constant(c) => {
                // Equality must name a legal value. Ordering relations and
                // the same-type probe only need the right shape: `^count < 20`
                // against [0, 10] is a legal test.
                let ok = match relation {
                    Relation::Equal => kind.is_valid(c),
                    _ => kind.accepts_numeric(c),
                };
                if !ok {
                    self.report(Finding::BadConstraint {
                        production: production.name.clone(),
                        triple: triple.clone(),
                        reason: format!("'{relation} {c}' does not fit a {kind} value"),
                    });
                }
            }
        }
    }

    // -- action side -------------------------------------------------------

    fn check_action(
        &mut self,
        production: &Production,
        action: &Action,
        bindings: &mut HashMap<String, VertexId>,
    ) {
        let rendered: Vec<String> = action.values.iter().map(|v| v.value.to_string()).collect();
        let triple = Triple {
            variable: action.subject.clone(),
            attribute: action.path_display(),
            value: rendered.join(" "),
            from_state: false,
        };

        let Some(&subject_id) = bindings.get(&action.subject) else {
            self.report(Finding::BadConstraint {
                production: production.name.clone(),
                triple,
                reason: format!("variable <{}> is not bound by any condition", action.subject),
            });
            return;
        };

        let Some(destination) =
            self.resolve_action_path(production, &triple, subject_id, action, bindings)
        else {
            return;
        };

        let kind = match self.graph.vertex(destination) {
            Some(v) => v.kind().clone(),
            None => return,
        };
        for value in &action.values {
            self.check_action_value(production, action, destination, &kind, value, bindings);
        }
    }

    /// Walk the action's attribute path, synthesizing missing segments when
    /// attribute synthesis is enabled. The final segment is synthesized from
    /// the asserted values' shapes.
    fn resolve_action_path(
        &mut self,
        production: &Production,
        triple: &Triple,
        start: VertexId,
        action: &Action,
        bindings: &mut HashMap<String, VertexId>,
    ) -> Option<VertexId> {
        let path = &action.path;
        let mut current = start;
        for (i, segment) in path.iter().enumerate() {
            let last = i + 1 == path.len();
            if let Some(edge) = self.graph.edge_to(current, segment) {
                let to = edge.to;
                if !last {
                    let allows = self
                        .graph
                        .vertex(to)
                        .is_some_and(crate::vertex::Vertex::allows_emanating_edges);
                    if !allows {
                        self.report(Finding::BadConstraint {
                            production: production.name.clone(),
                            triple: triple.clone(),
                            reason: format!(
                                "attribute '{segment}' is a leaf; the path cannot continue"
                            ),
                        });
                        return None;
                    }
                }
                current = to;
                continue;
            }

            if !self.config.synthesize_attributes {
                self.report(Finding::BadConstraint {
                    production: production.name.clone(),
                    triple: triple.clone(),
                    reason: format!("attribute '{segment}' is not declared"),
                });
                return None;
            }

            if last {
                return self.synthesize_attribute(production, triple, current, segment, action, bindings);
            }
            // Interior segments can only be sub-structure.
            let id = self.graph.create_vertex(VertexKind::Identifier);
            if self.graph.add_edge(current, segment, id).is_err() {
                return None;
            }
            self.report(Finding::GeneratedIdentifier {
                production: production.name.clone(),
                triple: triple.clone(),
            });
            current = id;
        }
        Some(current)
    }

    /// Introduce a brand-new attribute: the vertex kind comes from the shape
    /// of the first statically known asserted value.
    fn synthesize_attribute(
        &mut self,
        production: &Production,
        triple: &Triple,
        from: VertexId,
        name: &str,
        action: &Action,
        bindings: &mut HashMap<String, VertexId>,
    ) -> Option<VertexId> {
        let seed = action.values.iter().find_map(|v| match &v.value {
            RhsValue::FunctionCall { .. } => None,
            other => Some(other),
        })?;

        let (kind, finding) = match seed {
            RhsValue::Variable(_) => (
                VertexKind::Identifier,
                Finding::GeneratedIdentifier {
                    production: production.name.clone(),
                    triple: triple.clone(),
                },
            ),
            RhsValue::Constant(c) => {
                if c.parse::<i64>().is_ok() {
                    (
                        VertexKind::Integer,
                        Finding::GeneratedInteger {
                            production: production.name.clone(),
                            triple: triple.clone(),
                        },
                    )
                } else if c.parse::<f64>().is_ok_and(f64::is_finite) {
                    (
                        VertexKind::Float,
                        Finding::GeneratedFloat {
                            production: production.name.clone(),
                            triple: triple.clone(),
                        },
                    )
                } else {
                    (
                        VertexKind::Enumeration(vec![c.clone()]),
                        Finding::GeneratedEnumerationValue {
                            production: production.name.clone(),
                            triple: triple.clone(),
                        },
                    )
                }
            }
            RhsValue::FunctionCall { .. } => unreachable!("function seeds are filtered out"),
        };

        let id = self.graph.create_vertex(kind);
        if self.graph.add_edge(from, name, id).is_err() {
            return None;
        }
        self.report(finding);
        if let RhsValue::Variable(v) = seed {
            bindings.entry(v.clone()).or_insert(id);
        }
        Some(id)
    }

    fn check_action_value(
        &mut self,
        production: &Production,
        action: &Action,
        destination: VertexId,
        kind: &VertexKind,
        value: &ActionValue,
        bindings: &mut HashMap<String, VertexId>,
    ) {
        let triple = Triple {
            variable: action.subject.clone(),
            attribute: action.path_display(),
            value: value.value.to_string(),
            from_state: false,
        };

        match &value.value {
            // Function results are only known at run time.
            RhsValue::FunctionCall { .. } => {}
            RhsValue::Variable(v) => {
                bindings.entry(v.clone()).or_insert(destination);
            }
            RhsValue::Constant(c) => match kind {
                VertexKind::Identifier => {
                    self.report(Finding::BadConstraint {
                        production: production.name.clone(),
                        triple,
                        reason: format!("'{c}' asserted against an identifier attribute"),
                    });
                }
                VertexKind::Enumeration(_) => {
                    if !kind.is_valid(c) {
                        if self.config.grow_enumerations {
                            let grew = self
                                .graph
                                .add_enum_literal(destination, c)
                                .unwrap_or(false);
                            if grew {
                                self.report(Finding::GeneratedEnumerationValue {
                                    production: production.name.clone(),
                                    triple,
                                });
                            }
                        } else {
                            self.report(Finding::BadConstraint {
                                production: production.name.clone(),
                                triple,
                                reason: format!("'{c}' is not a legal {kind} value"),
                            });
                        }
                    }
                }
                // Ranges are never widened by a rule.
                _ => {
                    if !kind.is_valid(c) {
                        self.report(Finding::BadConstraint {
                            production: production.name.clone(),
                            triple,
                            reason: format!("'{c}' is not a legal {kind} value"),
                        });
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_rules;

    /// Root with: color? no. count -> IntegerRange[0,10], mode ->
    /// Enumeration{idle,run}, position -> Identifier -> x -> Integer.
    fn sample_graph() -> SchemaGraph {
        let mut graph = SchemaGraph::new();
        let root = graph.root();
        let count = graph.create_vertex(VertexKind::IntegerRange { low: 0, high: 10 });
        graph.add_edge(root, "count", count).expect("edge");
        let mode = graph.create_vertex(VertexKind::Enumeration(vec!["idle".into(), "run".into()]));
        graph.add_edge(root, "mode", mode).expect("edge");
        let position = graph.create_vertex(VertexKind::Identifier);
        graph.add_edge(root, "position", position).expect("edge");
        let x = graph.create_vertex(VertexKind::Integer);
        graph.add_edge(position, "x", x).expect("edge");
        graph
    }

    fn run(graph: &mut SchemaGraph, text: &str) -> Vec<Finding> {
        let productions = parse_rules(text).expect("parse");
        let mut sink = CollectingSink::new();
        check(graph, &productions, &mut sink);
        sink.into_findings()
    }

    #[test]
    fn missing_attribute_yields_one_bad_constraint_and_no_mutation() {
        let mut graph = sample_graph();
        let vertices_before = graph.vertex_count();
        let findings = run(
            &mut graph,
            "sp {p (state <s> ^color red) --> (<s> ^count 5)}",
        );

        assert_eq!(findings.len(), 1);
        match &findings[0] {
            Finding::BadConstraint { triple, .. } => {
                assert_eq!(triple.attribute, "color");
                assert_eq!(triple.value, "red");
                assert!(triple.from_state);
            }
            other => panic!("unexpected finding: {other:?}"),
        }
        assert_eq!(graph.vertex_count(), vertices_before);
    }

    #[test]
    fn range_check_on_conditions() {
        let mut graph = sample_graph();
        let findings = run(&mut graph, "sp {high (state <s> ^count 15) --> (<s> ^count 5)}");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity(), Severity::Error);

        let findings = run(&mut graph, "sp {ok (state <s> ^count 5) --> (<s> ^count 5)}");
        assert!(findings.is_empty());
    }

    #[test]
    fn ordering_relations_ignore_range_bounds() {
        let mut graph = sample_graph();
        let findings = run(&mut graph, "sp {p (state <s> ^count < 20) --> (<s> ^count 5)}");
        assert!(findings.is_empty(), "{findings:?}");

        let findings = run(
            &mut graph,
            "sp {p (state <s> ^count < twenty) --> (<s> ^count 5)}",
        );
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn enumeration_grows_on_action_only() {
        let mut graph = sample_graph();

        // Condition side: genuine mismatch, no mutation.
        let findings = run(&mut graph, "sp {c (state <s> ^mode stop) --> (<s> ^count 5)}");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity(), Severity::Error);
        let mode = graph.edge_to(graph.root(), "mode").expect("edge").to;
        assert!(!graph.vertex(mode).expect("mode").is_valid("stop"));

        // Action side: growth, informational finding.
        let findings = run(&mut graph, "sp {a (state <s> ^mode idle) --> (<s> ^mode stop)}");
        assert_eq!(findings.len(), 1);
        assert!(matches!(findings[0], Finding::GeneratedEnumerationValue { .. }));
        assert!(graph.vertex(mode).expect("mode").is_valid("stop"));

        // Second assertion of the same literal is silent.
        let findings = run(&mut graph, "sp {b (state <s> ^mode idle) --> (<s> ^mode stop)}");
        assert!(findings.is_empty());
    }

    #[test]
    fn multi_level_path_binding() {
        let mut graph = sample_graph();
        let findings = run(
            &mut graph,
            "sp {p (state <s> ^position <p>) (<p> ^x 5) --> (<s> ^count 5)}",
        );
        assert!(findings.is_empty(), "{findings:?}");

        let findings = run(
            &mut graph,
            "sp {p (state <s> ^position <p>) (<p> ^y 5) --> (<s> ^count 5)}",
        );
        assert_eq!(findings.len(), 1);
        match &findings[0] {
            Finding::BadConstraint { triple, .. } => {
                assert_eq!(triple.variable, "p");
                assert_eq!(triple.attribute, "y");
                assert!(!triple.from_state);
            }
            other => panic!("unexpected finding: {other:?}"),
        }
    }

    #[test]
    fn dotted_paths_traverse_identifiers() {
        let mut graph = sample_graph();
        let findings = run(&mut graph, "sp {p (state <s> ^position.x 5) --> (<s> ^count 5)}");
        assert!(findings.is_empty(), "{findings:?}");

        // Path through a leaf cannot continue.
        let findings = run(&mut graph, "sp {p (state <s> ^count.x 5) --> (<s> ^count 5)}");
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn unbound_condition_variable_reports_no_state() {
        let mut graph = sample_graph();
        let findings = run(
            &mut graph,
            "sp {p (state <s> ^count 5) (<q> ^x 1) --> (<s> ^count 5)}",
        );
        assert_eq!(findings.len(), 1);
        assert!(matches!(
            &findings[0],
            Finding::NoStateVariable { variable, .. } if variable == "q"
        ));
    }

    #[test]
    fn second_state_condition_reports_too_many() {
        let mut graph = sample_graph();
        let findings = run(
            &mut graph,
            "sp {p (state <s> ^count 5) (state <t> ^count 5) --> (<s> ^count 5)}",
        );
        assert_eq!(findings.len(), 1);
        assert!(matches!(
            &findings[0],
            Finding::TooManyStateVariables { variable, .. } if variable == "t"
        ));
    }

    #[test]
    fn disjunction_reports_every_constant_when_none_match() {
        let mut graph = sample_graph();
        let findings = run(
            &mut graph,
            "sp {p (state <s> ^mode << stop halt >>) --> (<s> ^count 5)}",
        );
        assert_eq!(findings.len(), 2);

        let findings = run(
            &mut graph,
            "sp {p (state <s> ^mode << stop run >>) --> (<s> ^count 5)}",
        );
        assert!(findings.is_empty(), "one matching constant satisfies the test");
    }

    #[test]
    fn action_synthesizes_new_attributes_by_value_shape() {
        let mut graph = sample_graph();
        let findings = run(
            &mut graph,
            "sp {p (state <s> ^count 5) -->\n\
             \x20 (<s> ^tally 3 ^weight 2.5 ^label fresh ^child <c>)\n\
             \x20 (<c> ^depth 1)}",
        );

        let kinds: Vec<_> = findings
            .iter()
            .map(|f| match f {
                Finding::GeneratedInteger { .. } => "int",
                Finding::GeneratedFloat { .. } => "float",
                Finding::GeneratedEnumerationValue { .. } => "enum",
                Finding::GeneratedIdentifier { .. } => "id",
                other => panic!("unexpected finding: {other:?}"),
            })
            .collect();
        assert_eq!(kinds, vec!["int", "float", "enum", "id", "int"]);

        // The synthesized structure is immediately usable.
        let tally = graph.edge_to(graph.root(), "tally").expect("tally").to;
        assert!(graph.vertex(tally).expect("tally").is_valid("7"));
        let child = graph.edge_to(graph.root(), "child").expect("child").to;
        assert!(graph.edge_to(child, "depth").is_some());
    }

    #[test]
    fn ranges_are_never_widened_by_actions() {
        let mut graph = sample_graph();
        let findings = run(&mut graph, "sp {p (state <s> ^count 5) --> (<s> ^count 15)}");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity(), Severity::Error);
        let count = graph.edge_to(graph.root(), "count").expect("edge").to;
        assert!(!graph.vertex(count).expect("count").is_valid("15"));
    }

    #[test]
    fn growth_gates_turn_growth_into_errors() {
        let mut graph = sample_graph();
        let config = CheckerConfig {
            grow_enumerations: false,
            synthesize_attributes: false,
            ..CheckerConfig::default()
        };
        let productions = parse_rules(
            "sp {p (state <s> ^count 5) --> (<s> ^mode stop ^brand-new 1)}",
        )
        .expect("parse");
        let mut sink = CollectingSink::new();
        check_with_config(&mut graph, &productions, &config, &mut sink);

        assert_eq!(sink.error_count(), 2);
        assert_eq!(sink.note_count(), 0);
        let mode = graph.edge_to(graph.root(), "mode").expect("edge").to;
        assert!(!graph.vertex(mode).expect("mode").is_valid("stop"));
        assert!(graph.edge_to(graph.root(), "brand-new").is_none());
    }

    #[test]
    fn function_values_pass_statically() {
        let mut graph = sample_graph();
        let findings = run(
            &mut graph,
            "sp {p (state <s> ^count <c>) --> (<s> ^count (+ <c> 1))}",
        );
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn finding_cap_limits_reporting_not_checking() {
        let mut graph = sample_graph();
        let config = CheckerConfig {
            max_findings_per_run: 1,
            ..CheckerConfig::default()
        };
        let productions = parse_rules(
            "sp {p (state <s> ^missing-a 1 ^missing-b 2 ^mode idle) --> (<s> ^mode halted)}",
        )
        .expect("parse");
        let mut sink = CollectingSink::new();
        check_with_config(&mut graph, &productions, &config, &mut sink);

        assert_eq!(sink.findings().len(), 1, "reporting stops at the cap");
        let mode = graph.edge_to(graph.root(), "mode").expect("edge").to;
        assert!(
            graph.vertex(mode).expect("mode").is_valid("halted"),
            "checking (and growth) continues past the cap"
        );
    }

    #[test]
    fn sink_set_fans_out_in_registration_order() {
        let mut graph = sample_graph();
        let productions =
            parse_rules("sp {p (state <s> ^color red) --> (<s> ^count 5)}").expect("parse");

        let mut set = SinkSet::new();
        let first = set.subscribe(Box::new(CollectingSink::new()));
        set.subscribe(Box::new(CollectingSink::new()));
        assert!(set.unsubscribe(first));
        check(&mut graph, &productions, &mut set);
    }
}
