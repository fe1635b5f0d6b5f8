//! Schema persistence — the line-oriented text format.
//!
//! A serialized graph is a vertex count, one record per vertex, an edge
//! count, then one record per edge:
//!
//! ```text
//! 3
//! SOAR_ID 0
//! ENUMERATION 1 2 idle run
//! INTEGER_RANGE 2 0 10
//! 2
//! 0 mode 1
//! 0 count 2
//! ```
//!
//! Record kinds are `SOAR_ID`, `ENUMERATION` (followed by a literal count and
//! that many tokens), `INTEGER_RANGE`, `INTEGER`, `FLOAT_RANGE`, `FLOAT` and
//! `STRING`. Vertices appear in ascending id order and edges in source-id
//! then name order, so a serialize → deserialize → serialize round-trip is
//! byte-identical. Literals and edge names are whitespace-delimited tokens;
//! writing one that contains whitespace is a serialization error rather than
//! a silent round-trip break.
//!
//! Appending a second serialized graph into an existing one offsets all
//! incoming ids by the current vertex count before reinsertion — the
//! documented mechanism for composing sub-schemas.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::{Result, RulemapError};
use crate::graph::SchemaGraph;
use crate::types::VertexId;
use crate::vertex::VertexKind;

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Serialize `graph` to `writer` in the text format.
///
/// # Errors
/// [`RulemapError::Serialization`] if a literal or edge name contains
/// whitespace; [`RulemapError::Io`] on write failures.
pub fn write_graph(graph: &SchemaGraph, writer: &mut impl Write) -> Result<()> {
    writeln!(writer, "{}", graph.vertex_count())?;
    for vertex in graph.vertices() {
        let id = vertex.id();
        match vertex.kind() {
            VertexKind::Identifier => writeln!(writer, "SOAR_ID {id}")?,
            VertexKind::Enumeration(choices) => {
                write!(writer, "ENUMERATION {id} {}", choices.len())?;
                for literal in choices {
                    check_token(literal, "enumeration literal")?;
                    write!(writer, " {literal}")?;
                }
                writeln!(writer)?;
            }
            VertexKind::IntegerRange { low, high } => {
                writeln!(writer, "INTEGER_RANGE {id} {low} {high}")?;
            }
            VertexKind::Integer => writeln!(writer, "INTEGER {id}")?,
            VertexKind::FloatRange { low, high } => {
                writeln!(writer, "FLOAT_RANGE {id} {low} {high}")?;
            }
            VertexKind::Float => writeln!(writer, "FLOAT {id}")?,
            VertexKind::Text => writeln!(writer, "STRING {id}")?,
        }
    }

    let edges: Vec<_> = graph
        .vertices()
        .flat_map(|v| graph.emanating(v.id()))
        .collect();
    writeln!(writer, "{}", edges.len())?;
    for edge in edges {
        check_token(&edge.name, "edge name")?;
        writeln!(writer, "{} {} {}", edge.from, edge.name, edge.to)?;
    }
    Ok(())
}

fn check_token(token: &str, what: &str) -> Result<()> {
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(RulemapError::Serialization(format!(
            "{what} '{token}' is not a whitespace-free token"
        )));
    }
    Ok(())
}

/// Serialize `graph` to the file at `path`.
///
/// # Errors
/// See [`write_graph`]; additionally I/O errors opening the file.
pub fn save_graph(graph: &SchemaGraph, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_graph(graph, &mut writer)?;
    writer.flush()?;
    info!(
        path = %path.display(),
        vertices = graph.vertex_count(),
        "schema saved"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Deserialize a graph from `reader`.
///
/// # Errors
/// [`RulemapError::SchemaFormat`] with the offending line on malformed input.
pub fn read_graph(reader: &mut impl BufRead) -> Result<SchemaGraph> {
    let (kinds, edges) = parse_records(reader)?;
    if kinds.is_empty() {
        return Err(RulemapError::SchemaFormat {
            line: 1,
            message: "a schema has at least its root vertex".to_string(),
        });
    }
    if !matches!(kinds[0], VertexKind::Identifier) {
        return Err(RulemapError::SchemaFormat {
            line: 2,
            message: "vertex 0 (the root) must be SOAR_ID".to_string(),
        });
    }

    let mut graph = SchemaGraph::new();
    for kind in kinds.into_iter().skip(1) {
        graph.create_vertex(kind);
    }
    insert_edges(&mut graph, &edges, 0)?;
    Ok(graph)
}

/// Deserialize a graph from the file at `path`.
///
/// # Errors
/// See [`read_graph`]; additionally I/O errors opening the file.
pub fn load_graph(path: impl AsRef<Path>) -> Result<SchemaGraph> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let graph = read_graph(&mut reader)?;
    info!(
        path = %path.display(),
        vertices = graph.vertex_count(),
        "schema loaded"
    );
    Ok(graph)
}

/// Import a serialized sub-schema into `graph`, offsetting every incoming id
/// by the current vertex count.
///
/// The imported root becomes an ordinary identifier vertex; bridge it into
/// the host graph with an explicit [`SchemaGraph::add_edge`]. Returns the
/// offset id of the imported root.
///
/// # Errors
/// [`RulemapError::SchemaFormat`] on malformed input.
pub fn append_graph(graph: &mut SchemaGraph, reader: &mut impl BufRead) -> Result<VertexId> {
    let (kinds, edges) = parse_records(reader)?;
    if kinds.is_empty() {
        return Err(RulemapError::SchemaFormat {
            line: 1,
            message: "a schema has at least its root vertex".to_string(),
        });
    }
    let offset = u32::try_from(graph.vertex_count()).map_err(|_| {
        RulemapError::Serialization("vertex count exceeds the id space".to_string())
    })?;
    let imported_root = VertexId(offset);
    for kind in kinds {
        graph.create_vertex(kind);
    }
    insert_edges(graph, &edges, offset)?;
    Ok(imported_root)
}

fn insert_edges(graph: &mut SchemaGraph, edges: &[EdgeRecord], offset: u32) -> Result<()> {
    for record in edges {
        graph
            .add_edge(
                VertexId(record.from + offset),
                &record.name,
                VertexId(record.to + offset),
            )
            .map_err(|e| RulemapError::SchemaFormat {
                line: record.line,
                message: e.to_string(),
            })?;
    }
    Ok(())
}

struct EdgeRecord {
    from: u32,
    name: String,
    to: u32,
    line: usize,
}

/// Parse the full record stream: vertex kinds in id order plus edge records.
/// Vertex ids must be dense and sequential from 0.
fn parse_records(reader: &mut impl BufRead) -> Result<(Vec<VertexKind>, Vec<EdgeRecord>)> {
    let mut lines = LineReader::new(reader);

    let vertex_count: usize = lines.next_required("vertex count")?.parse_field()?;
    let mut kinds = Vec::with_capacity(vertex_count);
    for expected in 0..vertex_count {
        let line = lines.next_required("vertex record")?;
        kinds.push(line.parse_vertex(expected)?);
    }

    let edge_count: usize = lines.next_required("edge count")?.parse_field()?;
    let mut edges = Vec::with_capacity(edge_count);
    for _ in 0..edge_count {
        let line = lines.next_required("edge record")?;
        edges.push(line.parse_edge()?);
    }
    Ok((kinds, edges))
}

struct LineReader<'a, R: BufRead> {
    reader: &'a mut R,
    line: usize,
}

struct Line {
    tokens: Vec<String>,
    number: usize,
}

impl<'a, R: BufRead> LineReader<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self { reader, line: 0 }
    }

    /// The next non-blank line, split on whitespace.
    fn next_required(&mut self, what: &str) -> Result<Line> {
        loop {
            let mut buf = String::new();
            let read = self.reader.read_line(&mut buf).map_err(RulemapError::Io)?;
            self.line += 1;
            if read == 0 {
                return Err(RulemapError::SchemaFormat {
                    line: self.line,
                    message: format!("expected {what}, found end of file"),
                });
            }
            let tokens: Vec<String> = buf.split_whitespace().map(str::to_string).collect();
            if !tokens.is_empty() {
                return Ok(Line {
                    tokens,
                    number: self.line,
                });
            }
        }
    }
}

impl Line {
    fn fail<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(RulemapError::SchemaFormat {
            line: self.number,
            message: message.into(),
        })
    }

    fn parse_field<T: std::str::FromStr>(&self) -> Result<T> {
        if self.tokens.len() != 1 {
            return self.fail("expected a single number");
        }
        self.token(0)
    }

    fn token<T: std::str::FromStr>(&self, index: usize) -> Result<T> {
        let raw = self
            .tokens
            .get(index)
            .ok_or(RulemapError::SchemaFormat {
                line: self.number,
                message: "record is truncated".to_string(),
            })?;
        raw.parse().map_err(|_| RulemapError::SchemaFormat {
            line: self.number,
            message: format!("'{raw}' is not a valid field value"),
        })
    }

    fn parse_vertex(&self, expected_id: usize) -> Result<VertexKind> {
        let kind_name = &self.tokens[0];
        let id: usize = self.token(1)?;
        if id != expected_id {
            return self.fail(format!(
                "vertex ids must be dense: expected {expected_id}, found {id}"
            ));
        }
        let expect_len = |n: usize| -> Result<()> {
            if self.tokens.len() == n {
                Ok(())
            } else {
                self.fail(format!("{kind_name} record has the wrong field count"))
            }
        };
        match kind_name.as_str() {
            "SOAR_ID" => {
                expect_len(2)?;
                Ok(VertexKind::Identifier)
            }
            "ENUMERATION" => {
                let count: usize = self.token(2)?;
                expect_len(3 + count)?;
                let choices = self.tokens[3..].to_vec();
                Ok(VertexKind::Enumeration(choices))
            }
            "INTEGER_RANGE" => {
                expect_len(4)?;
                Ok(VertexKind::IntegerRange {
                    low: self.token(2)?,
                    high: self.token(3)?,
                })
            }
            "INTEGER" => {
                expect_len(2)?;
                Ok(VertexKind::Integer)
            }
            "FLOAT_RANGE" => {
                expect_len(4)?;
                Ok(VertexKind::FloatRange {
                    low: self.token(2)?,
                    high: self.token(3)?,
                })
            }
            "FLOAT" => {
                expect_len(2)?;
                Ok(VertexKind::Float)
            }
            "STRING" => {
                expect_len(2)?;
                Ok(VertexKind::Text)
            }
            other => self.fail(format!("unknown vertex kind '{other}'")),
        }
    }

    fn parse_edge(&self) -> Result<EdgeRecord> {
        if self.tokens.len() != 3 {
            return self.fail("edge records are '<from> <name> <to>'");
        }
        Ok(EdgeRecord {
            from: self.token(0)?,
            name: self.tokens[1].clone(),
            to: self.token(2)?,
            line: self.number,
        })
    }
}
