//! Recursive expander decomposition driver.
//!
//! Builds the flow graph and subdivision flow graph once, then recurses:
//! every connected subset is handed to the cut-matching game, and the outcome
//! decides whether the subset becomes a cluster, is split in two, or has a
//! small side peeled off. Subsets are isolated by removing their complement
//! behind a checkpoint and rolled back before recursing, so the two flow
//! graphs are reused across the whole recursion.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::cut_matching::{CutMatchingConfig, CutMatchingSolver, Outcome};
use crate::error::{DecompositionError, Result};
use crate::graph::UndirectedGraph;
use crate::subdivision::{self, SubdivisionIndex};
use crate::unit_flow::{UnitFlowGraph, Vertex};

/// Process-level RNG setup: seed 0 draws from OS entropy, anything else is
/// fully deterministic.
pub fn configure_randomness(seed: u64) -> StdRng {
    if seed == 0 {
        StdRng::from_entropy()
    } else {
        StdRng::seed_from_u64(seed)
    }
}

/// Recursive expander decomposition of an undirected graph.
pub struct ExpanderDecomposition {
    graph: UnitFlowGraph,
    subdiv_graph: UnitFlowGraph,
    index: SubdivisionIndex,
    phi: f64,
    config: CutMatchingConfig,
    rng: StdRng,
    clusters: Vec<Vec<Vertex>>,
}

impl ExpanderDecomposition {
    /// Set up the decomposition of `g` with conductance target `phi`.
    pub fn new(
        g: &UndirectedGraph,
        phi: f64,
        config: CutMatchingConfig,
        rng: StdRng,
    ) -> Result<Self> {
        if g.vertex_count() == 0 {
            return Err(DecompositionError::InvalidGraph(
                "cannot decompose an empty graph".into(),
            ));
        }
        if !(phi > 0.0 && phi <= 1.0) {
            return Err(DecompositionError::InvalidParameter(format!(
                "phi must lie in (0, 1], got {phi}"
            )));
        }
        if !(0.0..=1.0).contains(&config.min_balance) {
            return Err(DecompositionError::InvalidParameter(format!(
                "min_balance must lie in [0, 1], got {}",
                config.min_balance
            )));
        }

        let graph = subdivision::flow_graph(g);
        let (subdiv_graph, index) = subdivision::subdivision_flow_graph(g);
        Ok(Self {
            graph,
            subdiv_graph,
            index,
            phi,
            config,
            rng,
            clusters: Vec::new(),
        })
    }

    /// Run the decomposition and return disjoint clusters covering V(G).
    pub fn compute(mut self) -> Vec<Vec<Vertex>> {
        let n = self.graph.len();
        let everything: Vec<Vertex> = (0..n).collect();
        self.decompose(everything);
        info!(
            vertices = n,
            clusters = self.clusters.len(),
            "expander decomposition finished"
        );
        self.clusters
    }

    fn decompose(&mut self, xs: Vec<Vertex>) {
        if xs.is_empty() {
            return;
        }
        if xs.len() == 1 {
            self.clusters.push(xs);
            return;
        }

        let graph_mark = self.graph.checkpoint();
        let subdiv_mark = self.subdiv_graph.checkpoint();
        self.isolate(&xs);

        // Cut-matching expects one component at a time.
        let components = self.graph.connected_components();
        if components.len() > 1 {
            self.graph.restore_to(graph_mark);
            self.subdiv_graph.restore_to(subdiv_mark);
            for component in components {
                self.decompose(component);
            }
            return;
        }

        let child_seed = self.rng.gen::<u64>();
        let result = CutMatchingSolver::new(
            &mut self.graph,
            &mut self.subdiv_graph,
            &mut self.index,
            self.phi,
            self.config.clone(),
            StdRng::seed_from_u64(child_seed),
        )
        .compute();

        let (alive, removed): (Vec<Vertex>, Vec<Vertex>) =
            xs.iter().copied().partition(|&u| self.graph.is_alive(u));
        self.graph.restore_to(graph_mark);
        self.subdiv_graph.restore_to(subdiv_mark);

        debug!(
            subset = xs.len(),
            outcome = ?result.outcome,
            iterations = result.iterations,
            alive = alive.len(),
            removed = removed.len(),
            "cut-matching round finished"
        );

        match result.outcome {
            Outcome::Expander => self.clusters.push(alive),
            Outcome::NearExpander => {
                self.clusters.push(alive);
                self.decompose(removed);
            }
            Outcome::Balanced => {
                self.decompose(alive);
                self.decompose(removed);
            }
        }
    }

    /// Remove everything outside `xs` from both graphs, then drop split
    /// vertices whose edge is no longer internal to the subset.
    fn isolate(&mut self, xs: &[Vertex]) {
        let n = self.graph.len();
        let mut keep = vec![false; n];
        for &u in xs {
            keep[u] = true;
        }
        for u in 0..n {
            if self.graph.is_alive(u) && !keep[u] {
                self.graph.remove(u);
                self.subdiv_graph.remove(u);
            }
        }
        for s in n..self.subdiv_graph.len() {
            if self.subdiv_graph.is_alive(s) && self.subdiv_graph.degree(s) < 2 {
                self.subdiv_graph.remove(s);
            }
        }
    }
}

/// Number of edges of `g` whose endpoints fall into different clusters.
pub fn cut_edges(g: &UndirectedGraph, clusters: &[Vec<Vertex>]) -> usize {
    let mut label = vec![usize::MAX; g.vertex_count()];
    for (c, cluster) in clusters.iter().enumerate() {
        for &u in cluster {
            label[u] = c;
        }
    }
    g.edges().iter().filter(|e| label[e.u] != label[e.v]).count()
}
