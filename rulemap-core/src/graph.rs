//! The schema graph — an adjacency-list structure over typed vertices.
//!
//! The graph owns every vertex and edge of one agent project's declared
//! working-memory shape. Exactly one vertex is distinguished as the **root**
//! (the agent's top-level "state"); it is created at graph construction and
//! never removed. Edges leaving a vertex are kept sorted by name at all
//! times, so lookups are binary searches and any path-listing feature
//! observes a deterministic order.
//!
//! The graph is single-threaded by design: one check run mutates it in place
//! and fires listeners inline. Exclusive access is the caller's obligation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RulemapError};
use crate::event::{GraphEvent, GraphListener, ListenerSet};
use crate::types::{SubscriptionId, VertexId};
use crate::vertex::{Vertex, VertexKind};

/// A directed, named relation (an "attribute") between two vertices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source vertex (always an identifier).
    pub from: VertexId,
    /// Attribute name; the sort key of the adjacency list.
    pub name: String,
    /// Destination vertex.
    pub to: VertexId,
}

/// Result of [`SchemaGraph::add_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The edge was inserted at its sorted position; listeners were notified.
    Inserted,
    /// An edge `(from, name)` already existed; the call resolved to it
    /// without inserting or notifying.
    Existing,
}

/// Adjacency-list schema graph with per-instance id allocation.
pub struct SchemaGraph {
    /// Dense vertex store; `VertexId` doubles as the index. Vertices are
    /// never removed, which keeps ids dense — the serialized format's
    /// append/offset rule depends on this.
    vertices: Vec<Vertex>,
    /// Per-vertex outgoing edges, sorted by name. Parallel to `vertices`.
    adjacency: Vec<Vec<Edge>>,
    listeners: ListenerSet,
}

impl SchemaGraph {
    /// Create a graph containing only the root identifier (id 0).
    #[must_use]
    pub fn new() -> Self {
        let mut graph = Self {
            vertices: Vec::new(),
            adjacency: Vec::new(),
            listeners: ListenerSet::new(),
        };
        let root = graph.create_vertex(VertexKind::Identifier);
        debug_assert_eq!(root, VertexId::ROOT);
        graph
    }

    /// The distinguished root ("state") vertex.
    #[must_use]
    pub fn root(&self) -> VertexId {
        VertexId::ROOT
    }

    /// Number of vertices, which is also the next id to be allocated.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Allocate the next identity and create a vertex of `kind`.
    ///
    /// Ids increase monotonically and are never reused within a session.
    pub fn create_vertex(&mut self, kind: VertexKind) -> VertexId {
        let id = VertexId(u32::try_from(self.vertices.len()).unwrap_or(u32::MAX));
        self.vertices.push(Vertex::new(id, kind));
        self.adjacency.push(Vec::new());
        id
    }

    /// Deep clone-with-new-identity of an existing vertex (template
    /// instantiation). Edges are not copied.
    ///
    /// # Errors
    /// Returns [`RulemapError::UnknownVertex`] if `id` does not resolve.
    pub fn duplicate_vertex(&mut self, id: VertexId) -> Result<VertexId> {
        let kind = self
            .vertex(id)
            .ok_or(RulemapError::UnknownVertex { vertex: id })?
            .duplicate_kind();
        Ok(self.create_vertex(kind))
    }

    /// Look a vertex up by id.
    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    /// Iterate all vertices in id order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    /// The sorted outgoing edges of `from`; empty for leaves and unknown ids.
    #[must_use]
    pub fn emanating(&self, from: VertexId) -> &[Edge] {
        self.adjacency
            .get(from.index())
            .map_or(&[], Vec::as_slice)
    }

    /// Find the outgoing edge of `from` named `name` by binary search —
    /// valid because adjacency is sorted at every observation point.
    #[must_use]
    pub fn edge_to(&self, from: VertexId, name: &str) -> Option<&Edge> {
        let edges = self.adjacency.get(from.index())?;
        let pos = edges
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()?;
        Some(&edges[pos])
    }

    /// Insert a named edge at its sorted position.
    ///
    /// If `(from, name)` already exists the call resolves to the existing
    /// edge regardless of its destination: a production can still grow an
    /// enumeration behind an existing edge without a parallel edge.
    /// Insertion fires [`GraphEvent::EdgeAdded`] after the mutation.
    ///
    /// # Errors
    /// [`RulemapError::UnknownVertex`] if either endpoint is missing,
    /// [`RulemapError::LeafEdgeSource`] if `from` is not an identifier.
    pub fn add_edge(&mut self, from: VertexId, name: &str, to: VertexId) -> Result<EdgeOutcome> {
        let source = self
            .vertex(from)
            .ok_or(RulemapError::UnknownVertex { vertex: from })?;
        if !source.allows_emanating_edges() {
            return Err(RulemapError::LeafEdgeSource { vertex: from });
        }
        if self.vertex(to).is_none() {
            return Err(RulemapError::UnknownVertex { vertex: to });
        }

        let edges = &mut self.adjacency[from.index()];
        match edges.binary_search_by(|e| e.name.as_str().cmp(name)) {
            Ok(_) => Ok(EdgeOutcome::Existing),
            Err(pos) => {
                edges.insert(
                    pos,
                    Edge {
                        from,
                        name: name.to_string(),
                        to,
                    },
                );
                debug!(%from, name, %to, "edge added");
                self.listeners.notify(&GraphEvent::EdgeAdded {
                    from,
                    name: name.to_string(),
                    to,
                });
                Ok(EdgeOutcome::Inserted)
            }
        }
    }

    /// Remove the edge matching all three of `(from, name, to)`.
    ///
    /// Returns whether an edge was removed; removal fires
    /// [`GraphEvent::EdgeRemoved`].
    pub fn remove_edge(&mut self, from: VertexId, name: &str, to: VertexId) -> bool {
        let Some(edges) = self.adjacency.get_mut(from.index()) else {
            return false;
        };
        let Ok(pos) = edges.binary_search_by(|e| e.name.as_str().cmp(name)) else {
            return false;
        };
        if edges[pos].to != to {
            return false;
        }
        edges.remove(pos);
        debug!(%from, name, %to, "edge removed");
        self.listeners.notify(&GraphEvent::EdgeRemoved {
            from,
            name: name.to_string(),
            to,
        });
        true
    }

    /// Widen an enumeration vertex with a newly observed literal.
    ///
    /// Returns whether membership changed. This is the only checker-driven
    /// vertex mutation.
    ///
    /// # Errors
    /// [`RulemapError::UnknownVertex`] if `id` does not resolve.
    pub fn add_enum_literal(&mut self, id: VertexId, literal: &str) -> Result<bool> {
        let vertex = self
            .vertices
            .get_mut(id.index())
            .ok_or(RulemapError::UnknownVertex { vertex: id })?;
        let changed = vertex.kind_mut().add_literal(literal);
        if changed {
            debug!(%id, literal, "enumeration widened");
        }
        Ok(changed)
    }

    /// Register a listener for edge mutations; fires synchronously, in
    /// registration order, immediately after each mutation.
    pub fn subscribe(&mut self, listener: GraphListener) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

impl Default for SchemaGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaGraph")
            .field("vertices", &self.vertices.len())
            .field(
                "edges",
                &self.adjacency.iter().map(Vec::len).sum::<usize>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn new_graph_has_identifier_root() {
        let graph = SchemaGraph::new();
        assert_eq!(graph.vertex_count(), 1);
        let root = graph.vertex(graph.root()).expect("root exists");
        assert!(root.allows_emanating_edges());
    }

    #[test]
    fn ids_are_monotonic() {
        let mut graph = SchemaGraph::new();
        let a = graph.create_vertex(VertexKind::Integer);
        let b = graph.create_vertex(VertexKind::Text);
        assert_eq!(a, VertexId(1));
        assert_eq!(b, VertexId(2));
    }

    #[test]
    fn edges_stay_sorted_under_arbitrary_insertion() {
        let mut graph = SchemaGraph::new();
        let root = graph.root();
        for name in ["zebra", "apple", "mango", "banana"] {
            let leaf = graph.create_vertex(VertexKind::Text);
            graph.add_edge(root, name, leaf).expect("add");
        }
        let names: Vec<_> = graph.emanating(root).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "banana", "mango", "zebra"]);
    }

    #[test]
    fn duplicate_name_resolves_to_existing_edge() {
        let mut graph = SchemaGraph::new();
        let root = graph.root();
        let a = graph.create_vertex(VertexKind::Integer);
        let b = graph.create_vertex(VertexKind::Integer);
        assert_eq!(graph.add_edge(root, "count", a).expect("add"), EdgeOutcome::Inserted);
        assert_eq!(graph.add_edge(root, "count", b).expect("add"), EdgeOutcome::Existing);
        assert_eq!(graph.emanating(root).len(), 1);
        assert_eq!(graph.edge_to(root, "count").expect("edge").to, a);
    }

    #[test]
    fn leaf_rejects_emanating_edges() {
        let mut graph = SchemaGraph::new();
        let leaf = graph.create_vertex(VertexKind::Text);
        let other = graph.create_vertex(VertexKind::Text);
        let err = graph.add_edge(leaf, "x", other).expect_err("must fail");
        assert!(matches!(err, RulemapError::LeafEdgeSource { vertex } if vertex == leaf));
    }

    #[test]
    fn remove_edge_requires_identity_match() {
        let mut graph = SchemaGraph::new();
        let root = graph.root();
        let a = graph.create_vertex(VertexKind::Integer);
        let b = graph.create_vertex(VertexKind::Integer);
        graph.add_edge(root, "count", a).expect("add");

        assert!(!graph.remove_edge(root, "count", b), "wrong destination");
        assert!(!graph.remove_edge(root, "missing", a), "wrong name");
        assert!(graph.remove_edge(root, "count", a));
        assert!(graph.emanating(root).is_empty());
    }

    #[test]
    fn duplicate_vertex_copies_kind_with_new_identity() {
        let mut graph = SchemaGraph::new();
        let original = graph.create_vertex(VertexKind::Enumeration(vec!["idle".into()]));
        let copy = graph.duplicate_vertex(original).expect("duplicate");

        assert_ne!(original, copy);
        assert_eq!(
            graph.vertex(original).expect("original").kind(),
            graph.vertex(copy).expect("copy").kind()
        );
    }

    #[test]
    fn mutations_notify_subscribers() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut graph = SchemaGraph::new();
        let sink = Rc::clone(&events);
        graph.subscribe(Box::new(move |e| sink.borrow_mut().push(e.clone())));

        let root = graph.root();
        let leaf = graph.create_vertex(VertexKind::Text);
        graph.add_edge(root, "color", leaf).expect("add");
        // Resolving to an existing edge must not notify.
        graph.add_edge(root, "color", leaf).expect("add");
        graph.remove_edge(root, "color", leaf);

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], GraphEvent::EdgeAdded { .. }));
        assert!(matches!(events[1], GraphEvent::EdgeRemoved { .. }));
    }

    #[test]
    fn enum_growth_is_idempotent() {
        let mut graph = SchemaGraph::new();
        let e = graph.create_vertex(VertexKind::Enumeration(vec!["idle".into()]));
        assert!(graph.add_enum_literal(e, "run").expect("grow"));
        assert!(!graph.add_enum_literal(e, "run").expect("grow"));
    }
}
