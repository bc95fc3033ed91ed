//! Expander decomposition of undirected graphs via cut-matching games.
//!
//! Given a graph G=(V,E) and a conductance parameter φ∈(0,1], the
//! decomposition partitions V into clusters such that each cluster induces a
//! φ-expander while only O(φ·m·polylog n) edges cross between clusters. The
//! inner procedure is the randomized cut-matching game played on a
//! *subdivision graph* (every edge replaced by a two-hop path through a fresh
//! split vertex), with bounded-height push–relabel rounds providing either a
//! routing certificate or a sparse level cut.
//!
//! ## Quick Start
//!
//! ```rust
//! use expander_decomp::{
//!     configure_randomness, CutMatchingConfig, ExpanderDecomposition, GraphEdge,
//!     UndirectedGraph,
//! };
//!
//! // Two triangles joined by a single edge.
//! let g = UndirectedGraph::new(
//!     6,
//!     vec![
//!         GraphEdge::new(0, 1),
//!         GraphEdge::new(1, 2),
//!         GraphEdge::new(2, 0),
//!         GraphEdge::new(3, 4),
//!         GraphEdge::new(4, 5),
//!         GraphEdge::new(5, 3),
//!         GraphEdge::new(2, 3),
//!     ],
//! )
//! .unwrap();
//!
//! let decomposition = ExpanderDecomposition::new(
//!     &g,
//!     0.1,
//!     CutMatchingConfig::default(),
//!     configure_randomness(42),
//! )
//! .unwrap();
//! let clusters = decomposition.compute();
//! assert!(!clusters.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`graph`] - validated undirected graphs and the input readers
//! - [`unit_flow`] - residual flow graphs with bounded-height push–relabel
//! - [`subdivision`] - subdivision flow graphs and the split-vertex index
//! - [`cut_matching`] - the cut-matching game and its classification
//! - [`decomposition`] - the recursive per-component driver

pub mod cut_matching;
pub mod decomposition;
pub mod error;
pub mod graph;
pub mod subdivision;
pub mod unit_flow;

pub use cut_matching::{
    project_flow, CutMatchingConfig, CutMatchingResult, CutMatchingSolver, Matching, Outcome,
};
pub use decomposition::{configure_randomness, cut_edges, ExpanderDecomposition};
pub use error::{DecompositionError, Result};
pub use graph::{read_chaco, read_edge_list, GraphEdge, UndirectedGraph};
pub use subdivision::{flow_graph, subdivision_flow_graph, SubdivisionIndex};
pub use unit_flow::{Flow, FlowEdge, UnitFlowGraph, Vertex};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_decomposition() {
        let g = UndirectedGraph::new(2, vec![GraphEdge::new(0, 1)]).unwrap();
        let clusters = ExpanderDecomposition::new(
            &g,
            0.5,
            CutMatchingConfig::default(),
            configure_randomness(1),
        )
        .unwrap()
        .compute();
        assert_eq!(clusters.iter().map(|c| c.len()).sum::<usize>(), 2);
    }
}
