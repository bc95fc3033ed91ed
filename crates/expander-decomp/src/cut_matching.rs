//! The cut-matching game on a subdivision graph.
//!
//! Implementation of the flow-based cut player from the Saranurak–Wang style
//! of expander decomposition: a projection of the current flow vector picks
//! source and sink sides among the split vertices, a bounded-height unit-flow
//! round either routes every source to a sink or exposes a sparse level cut,
//! and the decoded source→sink matching averages the flow vector pairwise.
//! After at most T rounds the subset is classified as one of
//!
//! - **Expander** — no vertex was ever cut away (or everything was, in which
//!   case the removals are undone),
//! - **Balanced** — the removed side carries enough volume to recurse on both
//!   sides,
//! - **NearExpander** — a small side was peeled off and only it needs further
//!   work.
//!
//! The round budget is `T = t_const + ceil(t_factor · log10(m)²)` and every
//! subdivision edge gets capacity `ceil(1/(φT))`; both knobs live in
//! [`CutMatchingConfig`].
//!
//! The solver owns its RNG so a caller that seeds it gets bit-identical
//! outcomes; the flow vector, the matchings recorded for re-projection, and
//! the diagnostic potential samples are all driven by that single generator.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::subdivision::SubdivisionIndex;
use crate::unit_flow::{Flow, UnitFlowGraph, Vertex};

/// One round's matching, as pairs of compact split-vertex indices.
pub type Matching = Vec<(u32, u32)>;

/// Tunables of the cut-matching game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutMatchingConfig {
    /// Constant part of the round budget T.
    pub t_const: usize,
    /// Multiplier on log10(m)² in the round budget T.
    pub t_factor: f64,
    /// Target balance as a fraction of the subdivision graph's volume.
    pub min_balance: f64,
    /// Draw a fresh unit vector every round and re-project it through all
    /// recorded matchings, instead of updating one vector incrementally.
    pub resample_unit_vector: bool,
    /// Extra projections applied after each resample (smoothing only).
    pub random_walk_steps: usize,
    /// If positive, sample this many potential values per round and once
    /// after termination, for diagnostics.
    pub sample_potential: usize,
}

impl Default for CutMatchingConfig {
    fn default() -> Self {
        Self {
            t_const: 22,
            t_factor: 5.0,
            min_balance: 0.45,
            resample_unit_vector: false,
            random_walk_steps: 0,
            sample_potential: 0,
        }
    }
}

/// How the subset was classified after the rounds finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// A balanced sparse cut was found; both sides are worth recursing on.
    Balanced,
    /// The subset is an expander; nothing was removed (or removals were
    /// undone because everything was cut away).
    Expander,
    /// The alive side is a near-expander; only the removed side needs more
    /// work.
    NearExpander,
}

/// Result of one cut-matching run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutMatchingResult {
    pub outcome: Outcome,
    /// Rounds actually executed (≤ T).
    pub iterations: usize,
    /// One vector of `sample_potential` values per round, plus a final one;
    /// empty when sampling is off.
    pub sampled_potentials: Vec<Vec<f64>>,
}

/// Project a flow vector through a sequence of matchings, in place.
///
/// Every pair averages its two entries; pairs within a single round are
/// disjoint. O(Σ|M_i|).
pub fn project_flow(rounds: &[Matching], flow: &mut [f64]) {
    for matching in rounds {
        for &(i, j) in matching {
            let avg = 0.5 * (flow[i as usize] + flow[j as usize]);
            flow[i as usize] = avg;
            flow[j as usize] = avg;
        }
    }
}

/// The cut-matching game, played once per `compute` call.
///
/// Holds exclusive references to the subset's flow graph, its subdivision
/// graph and the split-vertex index for the whole run; removals performed
/// during the game are visible to the caller afterwards.
pub struct CutMatchingSolver<'a> {
    graph: &'a mut UnitFlowGraph,
    subdiv_graph: &'a mut UnitFlowGraph,
    index: &'a mut SubdivisionIndex,
    phi: f64,
    config: CutMatchingConfig,
    rng: StdRng,
    /// Round budget T.
    rounds_budget: usize,
    /// Alive split vertices at construction time; fixed for the whole run.
    num_split_nodes: usize,
    /// Removal-stack checkpoints taken at entry; classification and volume
    /// queries are relative to these.
    graph_mark: usize,
    subdiv_mark: usize,
}

impl<'a> CutMatchingSolver<'a> {
    /// Set up the game and assign subdivision edge capacities.
    ///
    /// Panics on caller bugs: an empty subset, φ outside (0,1], or index
    /// maps that do not match the graphs.
    pub fn new(
        graph: &'a mut UnitFlowGraph,
        subdiv_graph: &'a mut UnitFlowGraph,
        index: &'a mut SubdivisionIndex,
        phi: f64,
        config: CutMatchingConfig,
        rng: StdRng,
    ) -> Self {
        assert!(graph.vertex_count() != 0, "cut-matching needs a non-empty subset");
        assert!(phi > 0.0 && phi <= 1.0, "phi must lie in (0, 1]");
        assert_eq!(
            index.compact.len(),
            subdiv_graph.len(),
            "compact index map must cover the subdivision graph"
        );
        assert_eq!(
            index.original.len(),
            subdiv_graph.len() - graph.len(),
            "inverse index map must cover all split vertices"
        );

        let m = graph.edge_count().max(1) as f64;
        let rounds_budget =
            config.t_const + (config.t_factor * m.log10() * m.log10()).ceil() as usize;
        let num_split_nodes = subdiv_graph.vertex_count() - graph.vertex_count();

        let capacity = (1.0 / phi / rounds_budget.max(1) as f64).ceil() as Flow;
        for u in 0..graph.len() {
            if graph.is_alive(u) {
                subdiv_graph.set_capacity(u, capacity);
            }
        }

        let graph_mark = graph.checkpoint();
        let subdiv_mark = subdiv_graph.checkpoint();
        Self {
            graph,
            subdiv_graph,
            index,
            phi,
            config,
            rng,
            rounds_budget,
            num_split_nodes,
            graph_mark,
            subdiv_mark,
        }
    }

    /// Play the game to completion and classify the subset.
    pub fn compute(mut self) -> CutMatchingResult {
        if self.num_split_nodes <= 1 {
            debug!(
                split_nodes = self.num_split_nodes,
                "cut-matching exited early, nothing to subdivide"
            );
            return CutMatchingResult {
                outcome: Outcome::Expander,
                iterations: 0,
                sampled_potentials: Vec::new(),
            };
        }

        // Re-densify the compact index over currently-alive split vertices.
        let mut count: i64 = 0;
        for u in 0..self.subdiv_graph.len() {
            if self.subdiv_graph.is_alive(u) && self.index.compact[u] >= 0 {
                self.index.compact[u] = count;
                self.index.original[count as usize] = u;
                count += 1;
            }
        }
        debug_assert_eq!(count as usize, self.num_split_nodes);

        let t = self.rounds_budget;
        let lower_volume_balance = self.num_split_nodes / (10 * t.max(1));
        let target_volume_balance = lower_volume_balance
            .max((self.config.min_balance * self.subdiv_graph.volume() as f64).floor() as usize);
        let maintain_matchings =
            self.config.resample_unit_vector || self.config.sample_potential > 0;

        let mut rounds: Vec<Matching> = Vec::new();
        let mut sampled_potentials: Vec<Vec<f64>> = Vec::new();
        let mut flow = self.random_unit_vector();

        let mut iterations = 0;
        while iterations < t
            && self.subdiv_graph.removed_volume(self.subdiv_mark) <= target_volume_balance
        {
            trace!(round = iterations, budget = t, "cut-matching round");

            if self.config.sample_potential > 0 {
                sampled_potentials
                    .push(self.sample_potential(&rounds, self.config.sample_potential));
            }

            if self.config.resample_unit_vector {
                flow = self.random_unit_vector();
                for _ in 0..self.config.random_walk_steps {
                    project_flow(&rounds, &mut flow);
                }
            }

            // Bipartition the alive split vertices around the mean projection.
            let mut sum = 0.0;
            let mut alive_splits = 0usize;
            for u in 0..self.subdiv_graph.len() {
                if self.subdiv_graph.is_alive(u) && self.index.compact[u] >= 0 {
                    sum += flow[self.index.compact[u] as usize];
                    alive_splits += 1;
                }
            }
            if alive_splits == 0 {
                break;
            }
            let avg_flow = sum / alive_splits as f64;

            let mut ax_left: Vec<Vertex> = Vec::new();
            let mut ax_right: Vec<Vertex> = Vec::new();
            for u in 0..self.subdiv_graph.len() {
                if self.subdiv_graph.is_alive(u) && self.index.compact[u] >= 0 {
                    if flow[self.index.compact[u] as usize] < avg_flow {
                        ax_left.push(u);
                    } else {
                        ax_right.push(u);
                    }
                }
            }

            let key = |u: Vertex| flow[self.index.compact[u] as usize];
            ax_left.sort_by(|&a, &b| key(a).partial_cmp(&key(b)).expect("finite projections"));
            ax_right.sort_by(|&a, &b| key(a).partial_cmp(&key(b)).expect("finite projections"));
            ax_right.reverse();

            // Trim to |axLeft| ≤ N/8 and |axLeft| ≤ |axRight| ≤ N/2.
            let n_subdiv = ax_left.len() + ax_right.len();
            while 2 * ax_right.len() > n_subdiv {
                ax_right.pop();
            }
            while 8 * ax_left.len() > n_subdiv || ax_left.len() > ax_right.len() {
                ax_left.pop();
            }

            self.subdiv_graph.reset();
            for &u in &ax_left {
                self.subdiv_graph.add_source(u, 1);
            }
            for &u in &ax_right {
                self.subdiv_graph.add_sink(u, 1);
            }

            let ns = self.num_split_nodes as f64;
            let h = ((1.0 / self.phi / ns.log10()).round() as usize)
                .max(ns.log10().floor() as usize);
            trace!(
                sources = ax_left.len(),
                sinks = ax_right.len(),
                max_height = h,
                "routing flow"
            );
            let has_excess = self.subdiv_graph.compute(h);

            // A failed routing certifies a sparse cut; peel it off.
            let mut removed_mark = vec![false; self.subdiv_graph.len()];
            let mut removed_list: Vec<Vertex> = Vec::new();
            if has_excess.is_empty() {
                trace!("all flow routed");
            } else {
                let cut = self.subdiv_graph.level_cut(h);
                trace!(stuck = has_excess.len(), cut = cut.len(), "level cut");
                for u in cut {
                    if !removed_mark[u] {
                        removed_mark[u] = true;
                        removed_list.push(u);
                    }
                }
            }

            ax_left.retain(|&u| !removed_mark[u]);
            ax_right.retain(|&u| !removed_mark[u]);

            for &u in &removed_list {
                if self.index.compact[u] < 0 {
                    self.graph.remove(u);
                }
                self.subdiv_graph.remove(u);
            }

            // Peeling may strand vertices; drop them by the same rule.
            let isolated: Vec<Vertex> = self
                .subdiv_graph
                .vertices()
                .filter(|&u| self.subdiv_graph.degree(u) == 0)
                .collect();
            for u in isolated {
                removed_mark[u] = true;
                removed_list.push(u);
                if self.index.compact[u] < 0 {
                    self.graph.remove(u);
                }
                self.subdiv_graph.remove(u);
            }

            if maintain_matchings && !removed_list.is_empty() {
                for matching in rounds.iter_mut() {
                    matching.retain(|&(i, j)| {
                        !removed_mark[self.index.original[i as usize]]
                            && !removed_mark[self.index.original[j as usize]]
                    });
                }
            }

            let pairs = self.subdiv_graph.matching(&ax_left);
            let mut matching: Matching = Vec::with_capacity(pairs.len());
            for (u, v) in pairs {
                let i = self.index.compact[u];
                let j = self.index.compact[v];
                debug_assert!(i >= 0 && j >= 0, "matched vertices must be split vertices");
                let (i, j) = (i as usize, j as usize);
                let matched = 0.5 * (flow[i] + flow[j]);
                flow[i] = matched;
                flow[j] = matched;
                matching.push((i as u32, j as u32));
            }
            trace!(
                matched = matching.len(),
                removed = removed_list.len(),
                "round finished"
            );
            if maintain_matchings {
                rounds.push(matching);
            }

            iterations += 1;
        }

        if self.config.sample_potential > 0 {
            sampled_potentials.push(self.sample_potential(&rounds, self.config.sample_potential));
        }

        let alive = self.graph.vertex_count();
        let removed = self.graph.removed_count() - self.graph_mark;
        let removed_volume = self.subdiv_graph.removed_volume(self.subdiv_mark);

        let outcome = if alive != 0 && removed != 0 && removed_volume > lower_volume_balance {
            debug!(
                iterations,
                alive,
                removed,
                removed_volume,
                "cut-matching found a balanced cut"
            );
            Outcome::Balanced
        } else if removed == 0 {
            debug!(iterations, alive, "cut-matching certified an expander");
            Outcome::Expander
        } else if alive == 0 {
            // The game ate the whole subset; undo and call it an expander.
            self.graph.restore_to(self.graph_mark);
            debug!(iterations, "cut-matching removed everything, restoring");
            Outcome::Expander
        } else {
            debug!(
                iterations,
                alive,
                removed,
                "cut-matching found a near-expander"
            );
            Outcome::NearExpander
        };

        CutMatchingResult {
            outcome,
            iterations,
            sampled_potentials,
        }
    }

    /// Round budget T of this run.
    pub fn rounds_budget(&self) -> usize {
        self.rounds_budget
    }

    /// Fresh random unit vector over the alive compact slots.
    fn random_unit_vector(&mut self) -> Vec<f64> {
        let mut result = vec![0.0; self.num_split_nodes];
        let mut total = 0.0;
        for u in 0..self.subdiv_graph.len() {
            if self.subdiv_graph.is_alive(u) && self.index.compact[u] >= 0 {
                let x: f64 = self.rng.sample(StandardNormal);
                result[self.index.compact[u] as usize] = x;
                total += x * x;
            }
        }
        let norm = total.sqrt();
        if norm > 0.0 {
            for x in &mut result {
                *x /= norm;
            }
        }
        result
    }

    /// Variance of `k` freshly projected unit vectors against the uniform
    /// mean; diagnostics only, leaves the rounds history untouched.
    fn sample_potential(&mut self, rounds: &[Matching], k: usize) -> Vec<f64> {
        let mut samples = Vec::with_capacity(k);
        for _ in 0..k {
            let mut flow = self.random_unit_vector();
            project_flow(rounds, &mut flow);

            let n = (self.subdiv_graph.vertex_count() - self.graph.vertex_count()) as f64;
            let avg_flow = 1.0 / n;
            let mut total = 0.0;
            for u in 0..self.subdiv_graph.len() {
                if self.subdiv_graph.is_alive(u) && self.index.compact[u] >= 0 {
                    let d = avg_flow - flow[self.index.compact[u] as usize];
                    total += d * d;
                }
            }
            samples.push(total);
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, UndirectedGraph};
    use crate::subdivision;
    use rand::SeedableRng;

    fn clique(n: usize) -> UndirectedGraph {
        let mut edges = Vec::new();
        for u in 0..n {
            for v in u + 1..n {
                edges.push(GraphEdge::new(u, v));
            }
        }
        UndirectedGraph::new(n, edges).unwrap()
    }

    fn solve(
        g: &UndirectedGraph,
        phi: f64,
        config: CutMatchingConfig,
        seed: u64,
    ) -> CutMatchingResult {
        let mut graph = subdivision::flow_graph(g);
        let (mut subdiv, mut index) = subdivision::subdivision_flow_graph(g);
        CutMatchingSolver::new(
            &mut graph,
            &mut subdiv,
            &mut index,
            phi,
            config,
            StdRng::seed_from_u64(seed),
        )
        .compute()
    }

    fn l2_to_uniform(flow: &[f64]) -> f64 {
        let mean = flow.iter().sum::<f64>() / flow.len() as f64;
        flow.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>().sqrt()
    }

    #[test]
    fn test_config_defaults() {
        let cfg = CutMatchingConfig::default();
        assert_eq!(cfg.t_const, 22);
        assert!((cfg.t_factor - 5.0).abs() < f64::EPSILON);
        assert!(!cfg.resample_unit_vector);
        assert_eq!(cfg.sample_potential, 0);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let cfg = CutMatchingConfig {
            t_const: 3,
            t_factor: 1.5,
            min_balance: 0.25,
            resample_unit_vector: true,
            random_walk_steps: 2,
            sample_potential: 4,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: CutMatchingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.t_const, 3);
        assert!(back.resample_unit_vector);
        assert_eq!(back.sample_potential, 4);
    }

    #[test]
    fn test_project_flow_averages_pairs() {
        let rounds = vec![vec![(0u32, 1u32)], vec![(1u32, 2u32)]];
        let mut flow = vec![1.0, 0.0, 0.0];
        project_flow(&rounds, &mut flow);
        assert!((flow[0] - 0.5).abs() < 1e-12);
        assert!((flow[1] - 0.25).abs() < 1e-12);
        assert!((flow[2] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_projection_is_contraction() {
        let mut flow = vec![0.9, -0.3, 0.2, -0.8, 0.0, 0.0];
        let mut before = l2_to_uniform(&flow);
        let rounds = vec![
            vec![(0u32, 3u32), (1, 2)],
            vec![(0u32, 1u32), (2, 4)],
            vec![(3u32, 5u32)],
        ];
        for round in &rounds {
            project_flow(std::slice::from_ref(round), &mut flow);
            let after = l2_to_uniform(&flow);
            assert!(after <= before + 1e-12);
            before = after;
        }
    }

    #[test]
    fn test_random_unit_vector_is_normalized() {
        let g = clique(5);
        let mut graph = subdivision::flow_graph(&g);
        let (mut subdiv, mut index) = subdivision::subdivision_flow_graph(&g);
        let mut solver = CutMatchingSolver::new(
            &mut graph,
            &mut subdiv,
            &mut index,
            0.1,
            CutMatchingConfig::default(),
            StdRng::seed_from_u64(7),
        );
        for _ in 0..5 {
            let v = solver.random_unit_vector();
            assert_eq!(v.len(), 10);
            let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rounds_budget_formula() {
        let g = clique(6); // m = 15
        let mut graph = subdivision::flow_graph(&g);
        let (mut subdiv, mut index) = subdivision::subdivision_flow_graph(&g);
        let solver = CutMatchingSolver::new(
            &mut graph,
            &mut subdiv,
            &mut index,
            0.1,
            CutMatchingConfig {
                t_const: 2,
                t_factor: 3.0,
                ..Default::default()
            },
            StdRng::seed_from_u64(0),
        );
        let log = 15f64.log10();
        let expected = 2 + (3.0 * log * log).ceil() as usize;
        assert_eq!(solver.rounds_budget(), expected);
    }

    #[test]
    fn test_single_edge_exits_early() {
        let g = UndirectedGraph::new(2, vec![GraphEdge::new(0, 1)]).unwrap();
        let result = solve(&g, 0.5, CutMatchingConfig::default(), 1);
        assert_eq!(result.outcome, Outcome::Expander);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_clique_is_certified() {
        let g = clique(6);
        let result = solve(&g, 0.1, CutMatchingConfig::default(), 11);
        assert_eq!(result.outcome, Outcome::Expander);
        assert!(result.iterations >= 1);
    }

    #[test]
    fn test_iterations_bounded_by_budget() {
        let g = clique(5);
        let cfg = CutMatchingConfig {
            t_const: 4,
            t_factor: 0.0,
            ..Default::default()
        };
        let result = solve(&g, 0.2, cfg, 3);
        assert!(result.iterations <= 4);
    }

    #[test]
    fn test_sampled_potentials_shape() {
        let g = clique(5);
        let cfg = CutMatchingConfig {
            sample_potential: 3,
            ..Default::default()
        };
        let result = solve(&g, 0.2, cfg, 5);
        // One sample vector per round plus the final one.
        assert_eq!(result.sampled_potentials.len(), result.iterations + 1);
        assert!(result.sampled_potentials.iter().all(|s| s.len() == 3));
        assert!(result
            .sampled_potentials
            .iter()
            .flatten()
            .all(|&p| p.is_finite() && p >= 0.0));
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let g = clique(6);
        let cfg = CutMatchingConfig {
            sample_potential: 2,
            ..Default::default()
        };
        let a = solve(&g, 0.1, cfg.clone(), 99);
        let b = solve(&g, 0.1, cfg, 99);
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.iterations, b.iterations);
        assert_eq!(a.sampled_potentials, b.sampled_potentials);
    }

    #[test]
    fn test_index_maps_stay_inverse() {
        let g = clique(6);
        let mut graph = subdivision::flow_graph(&g);
        let (mut subdiv, mut index) = subdivision::subdivision_flow_graph(&g);
        let _ = CutMatchingSolver::new(
            &mut graph,
            &mut subdiv,
            &mut index,
            0.1,
            CutMatchingConfig::default(),
            StdRng::seed_from_u64(13),
        )
        .compute();
        for u in 0..subdiv.len() {
            if subdiv.is_alive(u) && index.compact[u] >= 0 {
                assert_eq!(index.original[index.compact[u] as usize], u);
            }
        }
        // Alive and removed counts always add up to the full vertex set.
        assert_eq!(graph.vertex_count() + graph.removed_count(), g.vertex_count());
        assert_eq!(
            subdiv.vertex_count() + subdiv.removed_count(),
            g.vertex_count() + g.edge_count()
        );
    }

    #[test]
    #[should_panic(expected = "phi must lie in (0, 1]")]
    fn test_invalid_phi_panics() {
        let g = clique(3);
        let mut graph = subdivision::flow_graph(&g);
        let (mut subdiv, mut index) = subdivision::subdivision_flow_graph(&g);
        let _ = CutMatchingSolver::new(
            &mut graph,
            &mut subdiv,
            &mut index,
            0.0,
            CutMatchingConfig::default(),
            StdRng::seed_from_u64(0),
        );
    }
}
