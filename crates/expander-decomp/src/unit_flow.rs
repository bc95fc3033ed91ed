//! Unit-flow graphs: residual networks with bounded-height push–relabel.
//!
//! A [`UnitFlowGraph`] stores each undirected edge as two directed half-edges
//! with a shared capacity and a reverse pointer, plus the per-vertex state the
//! flow rounds need (excess, height label, edge cursor, absorbed mass and
//! remaining sink capacity). Vertices can be removed and restored in LIFO
//! order; a removed vertex keeps the degree it had at removal time, so volume
//! queries over the removed slice stay meaningful while neighbors' degrees
//! shrink.
//!
//! Three operations drive the cut-matching game:
//!
//! - [`UnitFlowGraph::compute`]: push–relabel with heights capped at `h`.
//!   Mass that cannot reach a sink is returned as residual excess, never an
//!   error.
//! - [`UnitFlowGraph::level_cut`]: after a failed routing, pick the level
//!   whose crossing-edge count is smallest and return everything above it.
//! - [`UnitFlowGraph::matching`]: decode source→sink pairs by walking and
//!   consuming flow paths.

use std::collections::VecDeque;

/// Vertex id inside a flow graph.
pub type Vertex = usize;

/// Integral flow amount.
pub type Flow = i64;

/// A directed half-edge of the residual network.
#[derive(Debug, Clone)]
pub struct FlowEdge {
    /// Head of the half-edge.
    pub to: Vertex,
    /// Index of the reverse half-edge in `adj[to]`.
    pub rev: usize,
    /// Shared capacity of the underlying undirected edge.
    pub capacity: Flow,
    /// Signed flow; the reverse half-edge always carries the negation.
    pub flow: Flow,
}

impl FlowEdge {
    #[inline]
    fn residual(&self) -> Flow {
        self.capacity - self.flow
    }
}

/// Mutable flow graph with reversible vertex removal.
#[derive(Debug, Clone)]
pub struct UnitFlowGraph {
    adj: Vec<Vec<FlowEdge>>,
    /// Alive-degree per vertex; frozen at removal time for removed vertices.
    degree: Vec<usize>,
    alive: Vec<bool>,
    /// LIFO stack of removed vertices.
    removed: Vec<Vertex>,
    num_alive: usize,
    /// Undirected edges with both endpoints alive.
    num_edges: usize,

    excess: Vec<Flow>,
    height: Vec<usize>,
    next_edge: Vec<usize>,
    absorbed: Vec<Flow>,
    sink: Vec<Flow>,
}

impl UnitFlowGraph {
    /// Create an edgeless graph over vertices `0..n`.
    pub fn new(n: usize) -> Self {
        Self {
            adj: vec![Vec::new(); n],
            degree: vec![0; n],
            alive: vec![true; n],
            removed: Vec::new(),
            num_alive: n,
            num_edges: 0,
            excess: vec![0; n],
            height: vec![0; n],
            next_edge: vec![0; n],
            absorbed: vec![0; n],
            sink: vec![0; n],
        }
    }

    /// Add an undirected edge as two residual half-edges.
    ///
    /// Must be called before any removal; both endpoints must be distinct.
    pub fn add_edge(&mut self, u: Vertex, v: Vertex, capacity: Flow) {
        assert!(u != v, "flow graphs carry no self-loops");
        assert!(capacity >= 0, "negative capacity on edge ({u}, {v})");
        let rev_u = self.adj[v].len();
        let rev_v = self.adj[u].len();
        self.adj[u].push(FlowEdge {
            to: v,
            rev: rev_u,
            capacity,
            flow: 0,
        });
        self.adj[v].push(FlowEdge {
            to: u,
            rev: rev_v,
            capacity,
            flow: 0,
        });
        self.degree[u] += 1;
        self.degree[v] += 1;
        self.num_edges += 1;
    }

    /// Total number of vertices, alive or removed.
    pub fn len(&self) -> usize {
        self.adj.len()
    }

    /// True when the graph has no vertices at all.
    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    /// Number of alive vertices.
    pub fn vertex_count(&self) -> usize {
        self.num_alive
    }

    /// Number of removed vertices.
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// Number of undirected edges with both endpoints alive.
    pub fn edge_count(&self) -> usize {
        self.num_edges
    }

    /// Whether `u` is alive.
    pub fn is_alive(&self, u: Vertex) -> bool {
        self.alive[u]
    }

    /// Alive vertices in ascending id order.
    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        (0..self.adj.len()).filter(move |&u| self.alive[u])
    }

    /// All half-edges out of `u`, including ones to removed vertices.
    pub fn edges(&self, u: Vertex) -> &[FlowEdge] {
        &self.adj[u]
    }

    /// Alive-degree of `u` (frozen at removal time if `u` is removed).
    pub fn degree(&self, u: Vertex) -> usize {
        self.degree[u]
    }

    /// Sum of degrees over all alive vertices.
    pub fn volume(&self) -> usize {
        self.vertices().map(|u| self.degree[u]).sum()
    }

    /// Sum of (frozen) degrees over vertices removed after `mark`.
    pub fn removed_volume(&self, mark: usize) -> usize {
        self.removed[mark..].iter().map(|&u| self.degree[u]).sum()
    }

    /// Overwrite the capacity of every edge incident to `u`, both directions.
    pub fn set_capacity(&mut self, u: Vertex, capacity: Flow) {
        for i in 0..self.adj[u].len() {
            let FlowEdge { to, rev, .. } = self.adj[u][i];
            self.adj[u][i].capacity = capacity;
            self.adj[to][rev].capacity = capacity;
        }
    }

    // --- removal -----------------------------------------------------------

    /// Current position of the removal stack, for later [`restore_to`].
    ///
    /// [`restore_to`]: UnitFlowGraph::restore_to
    pub fn checkpoint(&self) -> usize {
        self.removed.len()
    }

    /// Remove `u`. Degrees of alive neighbors shrink; `u`'s own degree is
    /// frozen at its current value.
    pub fn remove(&mut self, u: Vertex) {
        assert!(self.alive[u], "vertex {u} removed twice");
        self.alive[u] = false;
        self.num_alive -= 1;
        self.num_edges -= self.degree[u];
        for i in 0..self.adj[u].len() {
            let to = self.adj[u][i].to;
            if self.alive[to] {
                self.degree[to] -= 1;
            }
        }
        self.removed.push(u);
    }

    /// Undo removals down to `mark`, in LIFO order.
    pub fn restore_to(&mut self, mark: usize) {
        while self.removed.len() > mark {
            let u = self.removed.pop().expect("non-empty removal stack");
            self.alive[u] = true;
            self.num_alive += 1;
            self.num_edges += self.degree[u];
            for i in 0..self.adj[u].len() {
                let to = self.adj[u][i].to;
                if self.alive[to] {
                    self.degree[to] += 1;
                }
            }
        }
    }

    /// Undo every removal.
    pub fn restore_removes(&mut self) {
        self.restore_to(0);
    }

    // --- flow state --------------------------------------------------------

    /// Give `u` `capacity` units of excess to route.
    pub fn add_source(&mut self, u: Vertex, capacity: Flow) {
        self.excess[u] += capacity;
    }

    /// Let `u` absorb up to `capacity` units.
    pub fn add_sink(&mut self, u: Vertex, capacity: Flow) {
        self.sink[u] += capacity;
    }

    /// Zero all flow, excess, heights, cursors, absorbed mass and sink
    /// capacities. Edge capacities are kept.
    pub fn reset(&mut self) {
        for u in 0..self.adj.len() {
            self.excess[u] = 0;
            self.height[u] = 0;
            self.next_edge[u] = 0;
            self.absorbed[u] = 0;
            self.sink[u] = 0;
            for e in &mut self.adj[u] {
                e.flow = 0;
            }
        }
    }

    /// Run push–relabel with height labels capped at `max_height`.
    ///
    /// A vertex lifted to the cap freezes with whatever excess it still
    /// holds. Returns the alive vertices left with positive excess: unrouted
    /// sources and stuck intermediate nodes. An empty return means all mass
    /// reached a sink.
    pub fn compute(&mut self, max_height: usize) -> Vec<Vertex> {
        let mut queue: VecDeque<Vertex> = VecDeque::new();
        for u in 0..self.adj.len() {
            if self.alive[u] && self.excess[u] > 0 {
                self.absorb(u);
                if self.excess[u] > 0 {
                    queue.push_back(u);
                }
            }
        }

        while let Some(u) = queue.pop_front() {
            if !self.alive[u] {
                continue;
            }
            while self.excess[u] > 0 && self.height[u] < max_height {
                if self.next_edge[u] == self.adj[u].len() {
                    self.relabel(u, max_height);
                } else {
                    let FlowEdge {
                        to,
                        rev,
                        capacity,
                        flow,
                    } = self.adj[u][self.next_edge[u]];
                    let admissible = self.alive[to]
                        && capacity - flow > 0
                        && self.height[u] == self.height[to] + 1;
                    if admissible {
                        let delta = self.excess[u].min(capacity - flow);
                        self.adj[u][self.next_edge[u]].flow += delta;
                        self.adj[to][rev].flow -= delta;
                        self.excess[u] -= delta;
                        self.excess[to] += delta;
                        self.absorb(to);
                        if self.excess[to] > 0 {
                            queue.push_back(to);
                        }
                    } else {
                        self.next_edge[u] += 1;
                    }
                }
            }
        }

        (0..self.adj.len())
            .filter(|&u| self.alive[u] && self.excess[u] > 0)
            .collect()
    }

    /// Move as much of `u`'s excess as possible into its sink capacity.
    #[inline]
    fn absorb(&mut self, u: Vertex) {
        if self.sink[u] > 0 && self.excess[u] > 0 {
            let delta = self.excess[u].min(self.sink[u]);
            self.absorbed[u] += delta;
            self.sink[u] -= delta;
            self.excess[u] -= delta;
        }
    }

    /// Lift `u` to one above its lowest residual neighbor, capped at
    /// `max_height` where it freezes.
    fn relabel(&mut self, u: Vertex, max_height: usize) {
        let mut new_height = max_height;
        for e in &self.adj[u] {
            if self.alive[e.to] && e.residual() > 0 {
                new_height = new_height.min(self.height[e.to] + 1);
            }
        }
        debug_assert!(new_height > self.height[u], "relabel must raise {u}");
        self.height[u] = new_height;
        self.next_edge[u] = 0;
    }

    /// Extract a sparse level cut after a bounded-height routing left excess
    /// behind.
    ///
    /// Chooses the smallest level `l` in `1..=max_height` minimizing the
    /// number of alive edges crossing from height ≥ l+1 down to height ≤ l,
    /// among levels with vertices on both sides, and returns every alive
    /// vertex above `l`. Falls back to the excess set when no such level
    /// exists or no edge crosses any level.
    pub fn level_cut(&self, max_height: usize) -> Vec<Vertex> {
        let excess_set = || -> Vec<Vertex> {
            (0..self.adj.len())
                .filter(|&u| self.alive[u] && self.excess[u] > 0)
                .collect()
        };

        // above[l] = number of alive vertices with height > l;
        // crossing[l] via a difference array over half-edges going downhill.
        let mut above = vec![0usize; max_height + 2];
        let mut diff = vec![0i64; max_height + 2];
        let mut total_crossing = 0i64;
        for u in self.vertices() {
            let hu = self.height[u].min(max_height + 1);
            if hu > 0 {
                above[hu - 1] += 1;
            }
            for e in &self.adj[u] {
                if !self.alive[e.to] {
                    continue;
                }
                let hv = self.height[e.to].min(max_height + 1);
                if hu > hv {
                    let lo = hv.max(1);
                    let hi = (hu - 1).min(max_height);
                    if lo <= hi {
                        diff[lo] += 1;
                        diff[hi + 1] -= 1;
                        total_crossing += 1;
                    }
                }
            }
        }
        // Suffix-sum: above[l] counts vertices strictly above l.
        for l in (0..=max_height).rev() {
            above[l] += above[l + 1];
        }

        if total_crossing == 0 {
            return excess_set();
        }

        let mut best: Option<(i64, usize)> = None;
        let mut crossing = 0i64;
        for l in 1..=max_height {
            crossing += diff[l];
            let non_trivial = above[l] > 0 && above[l] < self.num_alive;
            if non_trivial && best.map_or(true, |(z, _)| crossing < z) {
                best = Some((crossing, l));
            }
        }

        match best {
            Some((_, level)) => self
                .vertices()
                .filter(|&u| self.height[u] > level)
                .collect(),
            None => excess_set(),
        }
    }

    /// Decode a source→sink matching by tracing and consuming flow paths.
    ///
    /// Sources are processed in the given order; a source whose path is
    /// broken (its mass was only partially routed) is omitted. Each absorbed
    /// unit at a sink is consumed at most once.
    pub fn matching(&mut self, sources: &[Vertex]) -> Vec<(Vertex, Vertex)> {
        let mut cursor = vec![0usize; self.adj.len()];
        let mut pairs = Vec::with_capacity(sources.len());

        for &start in sources {
            let mut u = start;
            let sink = loop {
                if u != start && self.absorbed[u] > 0 {
                    break Some(u);
                }
                // Walk one unit down any outgoing edge that still carries flow.
                let mut next = None;
                while cursor[u] < self.adj[u].len() {
                    let e = &self.adj[u][cursor[u]];
                    if e.flow > 0 && self.alive[e.to] {
                        next = Some(cursor[u]);
                        break;
                    }
                    cursor[u] += 1;
                }
                match next {
                    Some(i) => {
                        self.adj[u][i].flow -= 1;
                        u = self.adj[u][i].to;
                    }
                    None => break None,
                }
            };
            if let Some(v) = sink {
                self.absorbed[v] -= 1;
                pairs.push((start, v));
            }
        }
        pairs
    }

    /// Connected components of the alive subgraph, each in ascending id
    /// order, ordered by smallest member.
    pub fn connected_components(&self) -> Vec<Vec<Vertex>> {
        let mut seen = vec![false; self.adj.len()];
        let mut components = Vec::new();
        let mut queue = VecDeque::new();
        for start in self.vertices() {
            if seen[start] {
                continue;
            }
            let mut component = Vec::new();
            seen[start] = true;
            queue.push_back(start);
            while let Some(u) = queue.pop_front() {
                component.push(u);
                for e in &self.adj[u] {
                    if self.alive[e.to] && !seen[e.to] {
                        seen[e.to] = true;
                        queue.push_back(e.to);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Excess currently held at `u`.
    pub fn excess(&self, u: Vertex) -> Flow {
        self.excess[u]
    }

    /// Height label of `u`.
    pub fn height(&self, u: Vertex) -> usize {
        self.height[u]
    }

    /// Mass absorbed at `u` while acting as a sink.
    pub fn absorbed(&self, u: Vertex) -> Flow {
        self.absorbed[u]
    }
}
