//! # Rulemap Core Library
//!
//! Design-time schema graph and conformance checker for agent production
//! rules. An agent project declares the legal shape of its working memory as
//! a [`SchemaGraph`]; rule files are parsed into [`Production`]s and every
//! memory-path expression in them is statically validated against the graph:
//!
//! - **Vertex kinds** — identifier, enumeration, bounded/unbounded numbers,
//!   free text ([`vertex`])
//! - **Schema graph** — name-sorted adjacency with change notification
//!   ([`graph`], [`event`])
//! - **Rule parser** — production text to a structured triple model
//!   ([`parser`])
//! - **Conformance checker** — path resolution, value validation, controlled
//!   schema growth ([`checker`])
//! - **Persistence** — the line-oriented schema text format ([`persistence`])
//!
//! The checker never *executes* rules; it only checks their text against the
//! declared schema. Everything here is single-threaded and synchronous —
//! callers wanting parallel checking run one graph instance per file.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod checker;
pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod parser;
pub mod persistence;
pub mod types;
pub mod vertex;

pub use checker::{check, check_with_config, CollectingSink, Finding, FindingSink, NullSink};
pub use config::RulemapConfig;
pub use error::{ParseError, Result, RulemapError};
pub use event::GraphEvent;
pub use graph::{Edge, SchemaGraph};
pub use parser::{parse_rules, Production, Triple};
pub use types::VertexId;
pub use vertex::{Vertex, VertexKind};
