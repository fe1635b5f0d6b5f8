//! Change notification for schema graph mutations.
//!
//! Dependent views (tree editors, markers — all outside this crate) refresh
//! from the affected edge alone instead of re-scanning the whole graph. The
//! contract is intentionally simple: listeners fire synchronously, in
//! registration order, immediately after the mutation that caused the event.
//! Debouncing or UI-thread marshaling belongs to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::types::{SubscriptionId, VertexId};

/// A mutation of the schema graph's edge set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphEvent {
    /// An edge was inserted into the (sorted) adjacency of `from`.
    EdgeAdded {
        /// Source vertex.
        from: VertexId,
        /// Attribute name.
        name: String,
        /// Destination vertex.
        to: VertexId,
    },
    /// An edge was removed from the adjacency of `from`.
    EdgeRemoved {
        /// Source vertex.
        from: VertexId,
        /// Attribute name.
        name: String,
        /// Destination vertex.
        to: VertexId,
    },
}

/// A listener callback invoked for every graph event.
pub type GraphListener = Box<dyn FnMut(&GraphEvent)>;

/// Registry of graph listeners.
///
/// Listeners are keyed by the [`SubscriptionId`] handed out at subscription
/// time; unsubscribing an unknown id is a no-op.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Vec<(SubscriptionId, GraphListener)>,
    next_id: u64,
}

impl ListenerSet {
    /// Create an empty listener set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it will be invoked for every subsequent event,
    /// after listeners registered earlier.
    pub fn subscribe(&mut self, listener: GraphListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener, in registration order.
    pub fn notify(&mut self, event: &GraphEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn added(from: u32, name: &str, to: u32) -> GraphEvent {
        GraphEvent::EdgeAdded {
            from: VertexId(from),
            name: name.to_string(),
            to: VertexId(to),
        }
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut set = ListenerSet::new();
        for tag in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            set.subscribe(Box::new(move |_| order.borrow_mut().push(tag)));
        }

        set.notify(&added(0, "color", 1));
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut set = ListenerSet::new();
        let id = {
            let count = Rc::clone(&count);
            set.subscribe(Box::new(move |_| *count.borrow_mut() += 1))
        };

        set.notify(&added(0, "a", 1));
        assert!(set.unsubscribe(id));
        assert!(!set.unsubscribe(id), "second unsubscribe is a no-op");
        set.notify(&added(0, "b", 2));

        assert_eq!(*count.borrow(), 1);
    }
}
