//! Undirected input graphs and the two supported on-disk formats.
//!
//! An [`UndirectedGraph`] is a validated edge list over vertices `0..n`:
//! self-loops are rejected and duplicate edges (unordered pair equality) are
//! collapsed, so edge ids are stable positions in the deduplicated list. The
//! readers accept either a plain edge list (`n m` header followed by `m`
//! vertex pairs) or the Chaco adjacency format used by graph partitioning
//! tools.

use std::collections::HashSet;
use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::{DecompositionError, Result};

/// An undirected edge between two distinct vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub u: usize,
    pub v: usize,
}

impl GraphEdge {
    /// Create an edge. Orientation is irrelevant; `(u, v)` equals `(v, u)`
    /// for deduplication purposes.
    pub fn new(u: usize, v: usize) -> Self {
        Self { u, v }
    }

    fn canonical(&self) -> (usize, usize) {
        if self.u <= self.v {
            (self.u, self.v)
        } else {
            (self.v, self.u)
        }
    }
}

/// A simple undirected graph with stable edge ids.
#[derive(Debug, Clone)]
pub struct UndirectedGraph {
    vertex_count: usize,
    edges: Vec<GraphEdge>,
}

impl UndirectedGraph {
    /// Build a graph over vertices `0..n` from an edge list.
    ///
    /// Duplicate edges are dropped (first occurrence wins, so edge ids are
    /// positions in the deduplicated list). Self-loops and out-of-range
    /// endpoints are rejected.
    pub fn new(n: usize, edges: Vec<GraphEdge>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(edges.len());
        let mut deduped = Vec::with_capacity(edges.len());
        for e in edges {
            if e.u == e.v {
                return Err(DecompositionError::InvalidGraph(format!(
                    "self-loop at vertex {}",
                    e.u
                )));
            }
            if e.u >= n || e.v >= n {
                return Err(DecompositionError::InvalidGraph(format!(
                    "edge ({}, {}) out of range for {} vertices",
                    e.u, e.v, n
                )));
            }
            if seen.insert(e.canonical()) {
                deduped.push(e);
            }
        }
        Ok(Self {
            vertex_count: n,
            edges: deduped,
        })
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of (deduplicated) edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The deduplicated edge list; the position of an edge is its id.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Degree of `u`.
    pub fn degree(&self, u: usize) -> usize {
        self.edges
            .iter()
            .filter(|e| e.u == u || e.v == u)
            .count()
    }
}

/// Read a graph given as a `n m` header followed by `m` lines `u v`.
///
/// Duplicate edges are ignored; self-loops are skipped.
pub fn read_edge_list<R: BufRead>(reader: R) -> Result<UndirectedGraph> {
    let mut lines = reader.lines();
    let (n, m) = read_header(&mut lines)?;

    let mut edges = Vec::with_capacity(m);
    let mut count = 0;
    for line in lines {
        if count == m {
            break;
        }
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let u = parse_vertex(parts.next(), count)?;
        let v = parse_vertex(parts.next(), count)?;
        if u != v {
            edges.push(GraphEdge::new(u, v));
        }
        count += 1;
    }
    if count < m {
        return Err(DecompositionError::Parse(format!(
            "expected {} edges, found {}",
            m, count
        )));
    }
    UndirectedGraph::new(n, edges)
}

/// Read a graph in the Chaco adjacency format: a `n m` header followed by one
/// whitespace-separated, 1-indexed neighbor line per vertex.
///
/// Each edge appears on both endpoints' lines; it is taken from the smaller
/// endpoint's line only, which also drops self-loops.
pub fn read_chaco<R: BufRead>(reader: R) -> Result<UndirectedGraph> {
    let mut lines = reader.lines();
    let (n, _m) = read_header(&mut lines)?;

    let mut edges = Vec::new();
    let mut u = 0;
    for line in lines {
        if u == n {
            break;
        }
        let line = line?;
        for token in line.split_whitespace() {
            let v: usize = token.parse().map_err(|_| {
                DecompositionError::Parse(format!(
                    "bad neighbor {:?} on adjacency line {}",
                    token,
                    u + 1
                ))
            })?;
            if v == 0 || v > n {
                return Err(DecompositionError::Parse(format!(
                    "neighbor {} out of range on adjacency line {}",
                    v,
                    u + 1
                )));
            }
            let v = v - 1;
            if u < v {
                edges.push(GraphEdge::new(u, v));
            }
        }
        u += 1;
    }
    if u < n {
        return Err(DecompositionError::Parse(format!(
            "expected {} adjacency lines, found {}",
            n, u
        )));
    }
    UndirectedGraph::new(n, edges)
}

fn read_header<I>(lines: &mut I) -> Result<(usize, usize)>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    for line in lines {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let n = parse_count(parts.next(), "vertex count")?;
        let m = parse_count(parts.next(), "edge count")?;
        return Ok((n, m));
    }
    Err(DecompositionError::Parse("missing `n m` header".into()))
}

fn parse_count(token: Option<&str>, what: &str) -> Result<usize> {
    token
        .ok_or_else(|| DecompositionError::Parse(format!("missing {} in header", what)))?
        .parse()
        .map_err(|_| DecompositionError::Parse(format!("bad {} in header", what)))
}

fn parse_vertex(token: Option<&str>, edge_idx: usize) -> Result<usize> {
    token
        .ok_or_else(|| {
            DecompositionError::Parse(format!("edge {} is missing an endpoint", edge_idx))
        })?
        .parse()
        .map_err(|_| DecompositionError::Parse(format!("bad endpoint on edge {}", edge_idx)))
}
