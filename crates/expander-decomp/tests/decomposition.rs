//! End-to-end scenarios for the cut-matching game and the recursive driver.

use rand::rngs::StdRng;
use rand::SeedableRng;

use expander_decomp::{
    configure_randomness, flow_graph, subdivision_flow_graph, CutMatchingConfig,
    CutMatchingResult, CutMatchingSolver, ExpanderDecomposition, GraphEdge, Outcome,
    SubdivisionIndex, UndirectedGraph, UnitFlowGraph,
};

fn clique(n: usize) -> UndirectedGraph {
    let mut edges = Vec::new();
    for u in 0..n {
        for v in u + 1..n {
            edges.push(GraphEdge::new(u, v));
        }
    }
    UndirectedGraph::new(n, edges).unwrap()
}

fn path(n: usize) -> UndirectedGraph {
    let edges = (0..n - 1).map(|u| GraphEdge::new(u, u + 1)).collect();
    UndirectedGraph::new(n, edges).unwrap()
}

fn star(leaves: usize) -> UndirectedGraph {
    let edges = (1..=leaves).map(|v| GraphEdge::new(0, v)).collect();
    UndirectedGraph::new(leaves + 1, edges).unwrap()
}

/// Two K4 cliques joined by a single bridge edge (3, 4).
fn dumbbell() -> UndirectedGraph {
    let mut edges = Vec::new();
    for u in 0..4 {
        for v in u + 1..4 {
            edges.push(GraphEdge::new(u, v));
            edges.push(GraphEdge::new(u + 4, v + 4));
        }
    }
    edges.push(GraphEdge::new(3, 4));
    UndirectedGraph::new(8, edges).unwrap()
}

struct Solved {
    result: CutMatchingResult,
    graph: UnitFlowGraph,
    subdiv: UnitFlowGraph,
    index: SubdivisionIndex,
}

fn solve(g: &UndirectedGraph, phi: f64, config: CutMatchingConfig, seed: u64) -> Solved {
    let mut graph = flow_graph(g);
    let (mut subdiv, mut index) = subdivision_flow_graph(g);
    let result = CutMatchingSolver::new(
        &mut graph,
        &mut subdiv,
        &mut index,
        phi,
        config,
        StdRng::seed_from_u64(seed),
    )
    .compute();
    Solved {
        result,
        graph,
        subdiv,
        index,
    }
}

fn rounds_budget(config: &CutMatchingConfig, m: usize) -> usize {
    let log = (m.max(1) as f64).log10();
    config.t_const + (config.t_factor * log * log).ceil() as usize
}

/// Check the structural invariants every run must leave behind.
fn assert_invariants(g: &UndirectedGraph, config: &CutMatchingConfig, solved: &Solved) {
    let n = g.vertex_count();
    let m = g.edge_count();
    let t = rounds_budget(config, m);

    // Alive and removed always partition the vertex sets.
    assert_eq!(solved.graph.vertex_count() + solved.graph.removed_count(), n);
    assert_eq!(
        solved.subdiv.vertex_count() + solved.subdiv.removed_count(),
        n + m
    );

    // Index maps stay mutually inverse on alive split vertices.
    for u in 0..solved.subdiv.len() {
        if solved.subdiv.is_alive(u) && solved.index.compact[u] >= 0 {
            assert_eq!(solved.index.original[solved.index.compact[u] as usize], u);
        }
    }

    assert!(solved.result.iterations <= t);

    // The classification is total and each case is consistent with the
    // graphs it left behind.
    let alive = solved.graph.vertex_count();
    let removed = solved.graph.removed_count();
    match solved.result.outcome {
        Outcome::Balanced => {
            assert!(alive >= 1);
            assert!(removed >= 1);
            assert!(solved.subdiv.removed_volume(0) > m / (10 * t.max(1)));
        }
        Outcome::Expander => assert_eq!(removed, 0),
        Outcome::NearExpander => {
            assert!(alive >= 1);
            assert!(removed >= 1);
        }
    }
}

#[test]
fn singleton_is_an_expander() {
    let g = UndirectedGraph::new(1, vec![]).unwrap();
    let solved = solve(&g, 0.5, CutMatchingConfig::default(), 1);
    assert_eq!(solved.result.outcome, Outcome::Expander);
    assert_eq!(solved.result.iterations, 0);
    assert_invariants(&g, &CutMatchingConfig::default(), &solved);
}

#[test]
fn single_edge_exits_early() {
    let g = UndirectedGraph::new(2, vec![GraphEdge::new(0, 1)]).unwrap();
    let solved = solve(&g, 0.5, CutMatchingConfig::default(), 2);
    assert_eq!(solved.result.outcome, Outcome::Expander);
    assert_eq!(solved.result.iterations, 0);
    assert_invariants(&g, &CutMatchingConfig::default(), &solved);
}

#[test]
fn complete_graph_is_certified() {
    let g = clique(6);
    let solved = solve(&g, 0.1, CutMatchingConfig::default(), 3);
    assert_eq!(solved.result.outcome, Outcome::Expander);
    assert!(solved.result.iterations >= 1);
    assert_eq!(solved.graph.removed_count(), 0);
    assert_eq!(solved.subdiv.removed_count(), 0);
    assert_invariants(&g, &CutMatchingConfig::default(), &solved);
}

#[test]
fn dumbbell_finds_balanced_cut() {
    let g = dumbbell();
    let solved = solve(&g, 0.2, CutMatchingConfig::default(), 4);
    assert_eq!(solved.result.outcome, Outcome::Balanced);
    assert_invariants(&g, &CutMatchingConfig::default(), &solved);
}

#[test]
fn dumbbell_decomposition_splits_the_bridge() {
    let g = dumbbell();
    let clusters = ExpanderDecomposition::new(
        &g,
        0.2,
        CutMatchingConfig::default(),
        configure_randomness(5),
    )
    .unwrap()
    .compute();

    let mut seen = vec![false; 8];
    for cluster in &clusters {
        assert!(!cluster.is_empty());
        for &u in cluster {
            assert!(!seen[u]);
            seen[u] = true;
        }
    }
    assert!(seen.iter().all(|&s| s));
    assert!(clusters.len() >= 2);
}

#[test]
fn long_path_is_not_an_expander() {
    let g = path(10);
    let solved = solve(&g, 0.5, CutMatchingConfig::default(), 6);
    assert_ne!(solved.result.outcome, Outcome::Expander);
    assert!(solved.graph.removed_count() + solved.subdiv.removed_count() > 0);
    assert_invariants(&g, &CutMatchingConfig::default(), &solved);
}

#[test]
fn star_classification_is_consistent() {
    let g = star(10);
    for seed in [7, 8, 9] {
        let solved = solve(&g, 0.3, CutMatchingConfig::default(), seed);
        assert_invariants(&g, &CutMatchingConfig::default(), &solved);
    }
}

#[test]
fn restore_recovers_the_vertex_set() {
    let g = path(10);
    let mut solved = solve(&g, 0.5, CutMatchingConfig::default(), 10);
    solved.graph.restore_removes();
    solved.subdiv.restore_removes();
    assert_eq!(solved.graph.vertex_count(), 10);
    assert_eq!(solved.subdiv.vertex_count(), 10 + 9);
}

#[test]
fn fixed_seed_reproduces_results() {
    let g = dumbbell();
    let config = CutMatchingConfig {
        sample_potential: 2,
        ..Default::default()
    };
    let a = solve(&g, 0.2, config.clone(), 123);
    let b = solve(&g, 0.2, config, 123);
    assert_eq!(a.result.outcome, b.result.outcome);
    assert_eq!(a.result.iterations, b.result.iterations);
    assert_eq!(a.result.sampled_potentials, b.result.sampled_potentials);
}

#[test]
fn resampling_mode_is_well_behaved() {
    let g = clique(5);
    let config = CutMatchingConfig {
        resample_unit_vector: true,
        random_walk_steps: 2,
        ..Default::default()
    };
    let solved = solve(&g, 0.2, config.clone(), 11);
    assert_invariants(&g, &config, &solved);
}

#[test]
fn decomposition_covers_a_random_sparse_graph() {
    // Cycle plus chords: connected, far from an expander at phi = 0.3.
    let n = 24;
    let mut edges: Vec<GraphEdge> = (0..n).map(|u| GraphEdge::new(u, (u + 1) % n)).collect();
    edges.push(GraphEdge::new(0, 12));
    edges.push(GraphEdge::new(6, 18));
    let g = UndirectedGraph::new(n, edges).unwrap();

    let clusters = ExpanderDecomposition::new(
        &g,
        0.3,
        CutMatchingConfig::default(),
        configure_randomness(21),
    )
    .unwrap()
    .compute();

    let mut seen = vec![false; n];
    for cluster in &clusters {
        for &u in cluster {
            assert!(!seen[u]);
            seen[u] = true;
        }
    }
    assert!(seen.iter().all(|&s| s));
}
