use std::collections::{HashMap, VecDeque};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Weighted flow graph shared by both flow builders.
///
/// Nodes are keyed by a string id and kept in insertion order; parallel
/// flows between the same pair of nodes are merged into one weighted edge.
pub struct FlowGraph {
    graph: DiGraph<String, f64>,
    /// Map from node id → NodeIndex for fast lookup.
    node_map: HashMap<String, NodeIndex>,
}

impl Default for FlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    pub fn node(&mut self, id: &str) -> NodeIndex {
        let graph = &mut self.graph;
        *self
            .node_map
            .entry(id.to_string())
            .or_insert_with(|| graph.add_node(id.to_string()))
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    pub fn id(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    /// Add `value` to the `source → target` edge, creating nodes and edge as needed.
    pub fn add_flow(&mut self, source: &str, target: &str, value: f64) -> EdgeIndex {
        let src = self.node(source);
        let dst = self.node(target);
        match self.graph.find_edge(src, dst) {
            Some(edge) => {
                self.graph[edge] += value;
                edge
            }
            None => self.graph.add_edge(src, dst, value),
        }
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Edges in insertion order as `(source, target, value)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, f64)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), *e.weight()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// A node nothing flows into.
    pub fn is_root(&self, idx: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .is_none()
    }

    pub fn inflow(&self, idx: NodeIndex) -> f64 {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| *e.weight())
            .sum()
    }

    pub fn outflow(&self, idx: NodeIndex) -> f64 {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| *e.weight())
            .sum()
    }

    /// Value a node carries: the larger of what enters and what leaves it.
    pub fn throughput(&self, idx: NodeIndex) -> f64 {
        self.inflow(idx).max(self.outflow(idx))
    }

    /// Upstream neighbours, in edge insertion order.
    pub fn sources_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut sources: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.source())
            .collect();
        sources.sort_by_key(|n| n.index());
        sources.dedup();
        sources
    }

    /// Column of every node: the longest path from any root.
    ///
    /// Cyclic graphs have no longest path; they fall back to breadth-first
    /// distance from the roots (nodes only reachable through a cycle get 0).
    pub fn depths(&self) -> HashMap<NodeIndex, usize> {
        let mut depth: HashMap<NodeIndex, usize> =
            self.graph.node_indices().map(|n| (n, 0)).collect();

        match toposort(&self.graph, None) {
            Ok(order) => {
                for node in order {
                    let d = depth[&node];
                    for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                        let entry = depth.entry(next).or_insert(0);
                        *entry = (*entry).max(d + 1);
                    }
                }
            }
            Err(_) => {
                let mut queue: VecDeque<NodeIndex> = self
                    .graph
                    .node_indices()
                    .filter(|n| self.is_root(*n))
                    .collect();
                let mut seen: std::collections::HashSet<NodeIndex> =
                    queue.iter().copied().collect();
                while let Some(node) = queue.pop_front() {
                    let d = depth[&node];
                    for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                        if seen.insert(next) {
                            depth.insert(next, d + 1);
                            queue.push_back(next);
                        }
                    }
                }
            }
        }

        depth
    }
}
