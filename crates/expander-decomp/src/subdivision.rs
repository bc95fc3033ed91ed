//! Subdivision flow graphs and the compact split-vertex index.
//!
//! Subdividing an edge e=(u,v) inserts the split vertex `n + e.id` between
//! its endpoints, so `|V(G')| = n + m` and vertices `0..n` coincide with the
//! original graph. Split vertices carry the flow identity of their edge.

use crate::graph::UndirectedGraph;
use crate::unit_flow::UnitFlowGraph;

/// Sentinel for vertices that are not split vertices.
const NOT_SPLIT: i64 = -1;

/// Bidirectional map between subdivision-graph vertex ids and compact split
/// indices, kept as parallel dense arrays.
///
/// `compact[u]` is the compact index of split vertex `u` (or −1 for an
/// original vertex); `original[k]` maps a compact index back to its vertex
/// id. The cut-matching solver re-densifies the compact range over alive
/// split vertices when it starts.
#[derive(Debug, Clone)]
pub struct SubdivisionIndex {
    /// Compact index per subdivision-graph vertex; −1 marks original vertices.
    pub compact: Vec<i64>,
    /// Vertex id per compact index.
    pub original: Vec<usize>,
}

impl SubdivisionIndex {
    /// Identity indexing for a fresh subdivision graph over `n` original
    /// vertices and `m` edges.
    pub fn new(n: usize, m: usize) -> Self {
        let mut compact = vec![NOT_SPLIT; n + m];
        let mut original = vec![0; m];
        for k in 0..m {
            compact[n + k] = k as i64;
            original[k] = n + k;
        }
        Self { compact, original }
    }

    /// Whether `u` is a split vertex.
    pub fn is_split(&self, u: usize) -> bool {
        self.compact[u] >= 0
    }

    /// Total number of split vertices (alive or not).
    pub fn split_count(&self) -> usize {
        self.original.len()
    }
}

/// Flow-graph twin of `g`: same topology, zero capacities.
pub fn flow_graph(g: &UndirectedGraph) -> UnitFlowGraph {
    let mut flow = UnitFlowGraph::new(g.vertex_count());
    for e in g.edges() {
        flow.add_edge(e.u, e.v, 0);
    }
    flow
}

/// Subdivision flow graph of `g` plus its index maps; capacities start at
/// zero and are overwritten by the solver.
pub fn subdivision_flow_graph(g: &UndirectedGraph) -> (UnitFlowGraph, SubdivisionIndex) {
    let n = g.vertex_count();
    let m = g.edge_count();
    let mut flow = UnitFlowGraph::new(n + m);
    for (id, e) in g.edges().iter().enumerate() {
        let split = n + id;
        flow.add_edge(e.u, split, 0);
        flow.add_edge(split, e.v, 0);
    }
    (flow, SubdivisionIndex::new(n, m))
}
