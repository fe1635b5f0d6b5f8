//! Property-based tests for the schema graph invariants.
//!
//! Uses `proptest` to exercise the ordering, kind/edge-allowance, growth
//! idempotence and serialization round-trip guarantees under random inputs.

use std::io::Cursor;

use proptest::prelude::*;

use rulemap_core::persistence::{read_graph, write_graph};
use rulemap_core::vertex::VertexKind;
use rulemap_core::SchemaGraph;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Whitespace-free token usable as an edge name or enumeration literal.
fn arb_token() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,8}"
}

fn arb_kind() -> impl Strategy<Value = VertexKind> {
    prop_oneof![
        Just(VertexKind::Identifier),
        prop::collection::vec(arb_token(), 1..5).prop_map(|lits| {
            let mut unique = Vec::new();
            for lit in lits {
                if !unique.contains(&lit) {
                    unique.push(lit);
                }
            }
            VertexKind::Enumeration(unique)
        }),
        Just(VertexKind::Integer),
        (any::<i32>(), any::<i32>()).prop_map(|(a, b)| VertexKind::IntegerRange {
            low: i64::from(a.min(b)),
            high: i64::from(a.max(b)),
        }),
        Just(VertexKind::Float),
        (-1000.0f64..1000.0, -1000.0f64..1000.0).prop_map(|(a, b)| VertexKind::FloatRange {
            low: a.min(b),
            high: a.max(b),
        }),
        Just(VertexKind::Text),
    ]
}

// ---------------------------------------------------------------------------
// Property: adjacency is sorted at every observation point
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn adjacency_is_sorted_after_every_insertion(names in prop::collection::vec(arb_token(), 1..20)) {
        let mut graph = SchemaGraph::new();
        let root = graph.root();
        for name in &names {
            let leaf = graph.create_vertex(VertexKind::Text);
            graph.add_edge(root, name, leaf).expect("add_edge");
            // Observed mid-construction, not just at the end.
            let adjacent: Vec<_> = graph.emanating(root).iter().map(|e| e.name.clone()).collect();
            let mut sorted = adjacent.clone();
            sorted.sort();
            prop_assert_eq!(adjacent, sorted);
        }
    }
}

// ---------------------------------------------------------------------------
// Property: edge allowance tracks the kind, across create and duplicate
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn edge_allowance_matches_kind_after_create_and_duplicate(kind in arb_kind()) {
        let expected = matches!(kind, VertexKind::Identifier);
        let mut graph = SchemaGraph::new();

        let id = graph.create_vertex(kind);
        prop_assert_eq!(graph.vertex(id).expect("vertex").allows_emanating_edges(), expected);

        let copy = graph.duplicate_vertex(id).expect("duplicate");
        prop_assert_eq!(graph.vertex(copy).expect("copy").allows_emanating_edges(), expected);
        prop_assert_ne!(id, copy);
    }
}

// ---------------------------------------------------------------------------
// Property: enumeration growth is idempotent
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn add_literal_changes_membership_exactly_once(
        initial in prop::collection::vec(arb_token(), 0..5),
        literal in arb_token(),
    ) {
        let mut kind = VertexKind::Enumeration(initial.clone());
        let already_present = initial.iter().any(|l| l == &literal);

        prop_assert_eq!(kind.add_literal(&literal), !already_present);
        prop_assert!(!kind.add_literal(&literal), "second add never changes membership");
        prop_assert!(kind.is_valid(&literal));
    }
}

// ---------------------------------------------------------------------------
// Property: serialize → deserialize → serialize is byte-identical
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn serialization_round_trip_is_byte_identical(
        kinds in prop::collection::vec(arb_kind(), 0..12),
        edge_specs in prop::collection::vec((any::<prop::sample::Index>(), arb_token(), any::<prop::sample::Index>()), 0..24),
    ) {
        let mut graph = SchemaGraph::new();
        for kind in kinds {
            graph.create_vertex(kind);
        }

        let identifiers: Vec<_> = graph
            .vertices()
            .filter(|v| v.allows_emanating_edges())
            .map(rulemap_core::Vertex::id)
            .collect();
        let all: Vec<_> = graph.vertices().map(rulemap_core::Vertex::id).collect();
        for (from_sel, name, to_sel) in edge_specs {
            let from = *from_sel.get(&identifiers);
            let to = *to_sel.get(&all);
            // Duplicate names resolve to the existing edge; that is fine.
            graph.add_edge(from, &name, to).expect("add_edge");
        }

        let mut first = Vec::new();
        write_graph(&graph, &mut first).expect("write");
        let reloaded = read_graph(&mut Cursor::new(&first)).expect("read");
        let mut second = Vec::new();
        write_graph(&reloaded, &mut second).expect("write");
        prop_assert_eq!(first, second);
    }
}
