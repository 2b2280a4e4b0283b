//! Machine shape analyzer
//!
//! Summarises the shape of a state graph for the `inspect` report: whether the
//! machine is a straight pipeline, a branching workflow or contains loops.

use super::StateGraph;
use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::DfsPostOrder;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachinePattern {
    /// A -> B -> C -> D
    Linear,

    /// A -> B
    ///   -> C
    Branching,

    /// A -> B -> A
    Cyclic,

    /// No states at all
    Empty,
}

impl MachinePattern {
    pub fn display_name(&self) -> &'static str {
        match self {
            MachinePattern::Linear => "Linear",
            MachinePattern::Branching => "Branching",
            MachinePattern::Cyclic => "Cyclic",
            MachinePattern::Empty => "Empty",
        }
    }
}

/// Analysis report containing pattern and metrics
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub pattern: MachinePattern,
    /// Average out-degree over all declared states
    pub branching_factor: f64,
    /// Longest acyclic path from the initial state, in transitions
    pub max_depth: usize,
    pub has_cycles: bool,
}

/// Detect the pattern of a state graph
pub fn detect_pattern(graph: &StateGraph<'_>) -> AnalysisReport {
    let node_count = graph.graph.node_count();

    if node_count == 0 {
        return AnalysisReport {
            pattern: MachinePattern::Empty,
            branching_factor: 0.0,
            max_depth: 0,
            has_cycles: false,
        };
    }

    let has_cycles = graph.has_cycles();

    let out_degrees: Vec<usize> = graph
        .graph
        .node_indices()
        .map(|idx| graph.graph.edges_directed(idx, Direction::Outgoing).count())
        .collect();
    let branching_factor = out_degrees.iter().sum::<usize>() as f64 / node_count as f64;

    let pattern = if has_cycles {
        MachinePattern::Cyclic
    } else if out_degrees.iter().all(|&degree| degree <= 1) {
        MachinePattern::Linear
    } else {
        MachinePattern::Branching
    };

    AnalysisReport {
        pattern,
        branching_factor,
        max_depth: max_depth(graph),
        has_cycles,
    }
}

/// Longest path from the initial state once the edges closing a cycle are
/// dropped, every transition weighing 1.
///
/// Reverse DFS post-order is a topological order of the reachable graph minus
/// its back edges, so one pass relaxes every remaining edge.
fn max_depth(graph: &StateGraph<'_>) -> usize {
    let Some(&start) = graph.state_index.get(graph.model().initial()) else {
        return 0;
    };

    let mut order = Vec::new();
    let mut dfs = DfsPostOrder::new(&graph.graph, start);
    while let Some(node) = dfs.next(&graph.graph) {
        order.push(node);
    }
    order.reverse();

    let position: HashMap<NodeIndex, usize> =
        order.iter().enumerate().map(|(i, &node)| (node, i)).collect();
    let mut depth = vec![0usize; order.len()];

    for (i, &node) in order.iter().enumerate() {
        for next in graph.graph.neighbors(node) {
            if let Some(&j) = position.get(&next)
                && j > i
            {
                depth[j] = depth[j].max(depth[i] + 1);
            }
        }
    }

    depth.into_iter().max().unwrap_or(0)
}
