use crate::state_machine::{Model, State, Transition};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{Dfs, NodeIndexable};
use std::collections::{HashMap, HashSet};

/// A directed graph view over a [`Model`]'s transitions.
///
/// The `StateGraph` never mutates the model. It derives the facts the validator
/// and the driver need: forward and reverse adjacency, reachability from the
/// initial state and cycles.
pub struct StateGraph<'a> {
    /// The underlying graph structure.
    /// Nodes are the declared states; each edge carries the index of its
    /// transition in the model's insertion-ordered transition list.
    pub graph: StableGraph<&'a State, usize>,

    /// A lookup table mapping state names to their internal graph indices.
    ///
    /// Every declared state has an entry, including states with no transitions.
    pub state_index: HashMap<&'a str, NodeIndex>,

    model: &'a Model,

    /// States visited by the traversal from the initial state
    reachable: HashSet<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    OnStack,
    Finished,
}

impl<'a> StateGraph<'a> {
    /// Builds the adjacency views and computes reachability
    pub fn build(model: &'a Model) -> Self {
        let mut graph = StableGraph::new();
        let mut state_index = HashMap::new();

        for state in model.states() {
            let node_index = graph.add_node(state);
            state_index.insert(state.name.as_str(), node_index);
        }

        for (idx, transition) in model.transitions().iter().enumerate() {
            if let (Some(&from_idx), Some(&to_idx)) = (
                state_index.get(transition.from.as_str()),
                state_index.get(transition.to.as_str()),
            ) {
                graph.add_edge(from_idx, to_idx, idx);
            } else {
                tracing::warn!(
                    "Skipping transition with unknown endpoint: {}",
                    transition.display_label()
                );
            }
        }

        let mut state_graph = Self {
            graph,
            state_index,
            model,
            reachable: HashSet::new(),
        };
        state_graph.compute_reachability();
        state_graph
    }

    /// Iterative depth-first traversal from the initial state with one visited set
    fn compute_reachability(&mut self) {
        let Some(&start) = self.state_index.get(self.model.initial()) else {
            tracing::debug!(
                initial = %self.model.initial(),
                "Initial state is not declared, nothing is reachable"
            );
            return;
        };

        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node_idx) = dfs.next(&self.graph) {
            if let Some(&state) = self.graph.node_weight(node_idx) {
                self.reachable.insert(state.name.as_str());
            }
        }
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    /// Whether `state` is reachable from the initial state. Unknown names are not.
    pub fn is_reachable(&self, state: &str) -> bool {
        self.reachable.contains(state)
    }

    /// Declared states the traversal from the initial state never visits
    pub fn unreachable_states(&self) -> Vec<&'a str> {
        self.model
            .states()
            .iter()
            .map(|s| s.name.as_str())
            .filter(|name| !self.reachable.contains(name))
            .collect()
    }

    /// Three-colour depth-first search over every declared state.
    ///
    /// Uses an explicit stack so very large machines cannot overflow the call
    /// stack. A self-transition is a back edge to the node itself.
    pub fn has_cycles(&self) -> bool {
        let mut color = vec![Color::Unvisited; self.graph.node_bound()];

        for start in self.graph.node_indices() {
            if color[start.index()] != Color::Unvisited {
                continue;
            }

            color[start.index()] = Color::OnStack;
            let mut stack = vec![(start, self.graph.neighbors(start))];

            while let Some((node, successors)) = stack.last_mut() {
                let node = *node;
                match successors.next() {
                    Some(next) => match color[next.index()] {
                        Color::OnStack => return true,
                        Color::Unvisited => {
                            color[next.index()] = Color::OnStack;
                            stack.push((next, self.graph.neighbors(next)));
                        }
                        Color::Finished => {}
                    },
                    None => {
                        color[node.index()] = Color::Finished;
                        stack.pop();
                    }
                }
            }
        }

        false
    }

    /// The state sets forming cycles: strongly connected components with more
    /// than one state, or a single state with a self-transition. Each cycle is
    /// sorted by name, and the list is sorted for stable output.
    pub fn cycles(&self) -> Vec<Vec<&'a str>> {
        let mut cycles: Vec<Vec<&'a str>> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&n| self.graph.find_edge(n, n).is_some())
            })
            .map(|component| {
                let mut names: Vec<&'a str> = component
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).copied())
                    .map(|state| state.name.as_str())
                    .collect();
                names.sort_unstable();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Transitions leaving `state`, in insertion order. Unknown names yield nothing.
    pub fn outgoing_transitions(&self, state: &str) -> Vec<&'a Transition> {
        self.transitions_directed(state, Direction::Outgoing)
    }

    /// Transitions entering `state`, in insertion order. Unknown names yield nothing.
    pub fn incoming_transitions(&self, state: &str) -> Vec<&'a Transition> {
        self.transitions_directed(state, Direction::Incoming)
    }

    fn transitions_directed(&self, state: &str, direction: Direction) -> Vec<&'a Transition> {
        let Some(&node_idx) = self.state_index.get(state) else {
            return Vec::new();
        };

        let mut indices: Vec<usize> = self
            .graph
            .edges_directed(node_idx, direction)
            .map(|edge| *edge.weight())
            .collect();
        indices.sort_unstable();

        let model: &'a Model = self.model;
        indices
            .into_iter()
            .filter_map(|idx| model.transitions().get(idx))
            .collect()
    }

    /// Declared states without outgoing transitions, in declaration order
    pub fn terminal_states(&self) -> Vec<&'a str> {
        self.model
            .states()
            .iter()
            .filter(|state| {
                self.state_index.get(state.name.as_str()).is_some_and(|&idx| {
                    self.graph
                        .edges_directed(idx, Direction::Outgoing)
                        .next()
                        .is_none()
                })
            })
            .map(|state| state.name.as_str())
            .collect()
    }

    /// Export to DOT format for Graphviz
    pub fn to_dot(&self) -> String {
        let mut dot = format!("digraph {} {{\n", self.model.name());
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=box, style=\"rounded,filled\"];\n\n");
        dot.push_str("  __start [shape=point];\n");
        dot.push_str(&format!("  __start -> \"{}\";\n\n", self.model.initial()));

        for state in self.model.states() {
            let color = if state.name == self.model.initial() {
                "lightblue"
            } else if !self.is_reachable(&state.name) {
                "gray"
            } else if self.outgoing_transitions(&state.name).is_empty() {
                "green"
            } else {
                "lightgreen"
            };

            dot.push_str(&format!(
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n",
                state.name,
                state.display_short(),
                color
            ));
        }

        dot.push('\n');

        for transition in self.model.transitions() {
            let mut label = transition.event.clone();
            if let Some(guard) = &transition.guard {
                label.push_str(&format!(" [{}]", guard));
            }
            if let Some(action) = &transition.action {
                label.push_str(&format!(" / {}", action));
            }

            dot.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                transition.from, transition.to, label
            ));
        }

        dot.push_str("}\n");
        dot
    }

    /// Get graph statistics
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total_states: self.graph.node_count(),
            total_transitions: self.graph.edge_count(),
            reachable_states: self.reachable.len(),
            unreachable_states: self.unreachable_states().len(),
            terminal_states: self.terminal_states().len(),
            self_transitions: self
                .model
                .transitions()
                .iter()
                .filter(|t| t.is_self_transition())
                .count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStats {
    pub total_states: usize,
    pub total_transitions: usize,
    pub reachable_states: usize,
    pub unreachable_states: usize,
    pub terminal_states: usize,
    pub self_transitions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::Event;

    /// pending --approve--> approved --ship--> shipped, pending --reject--> rejected
    fn order_model() -> Model {
        let mut model = Model::new("OrderStateMachine", "pending").unwrap();
        for name in ["pending", "approved", "rejected", "shipped"] {
            model.add_state(State::new(name)).unwrap();
        }
        for name in ["approve", "reject", "ship"] {
            model.add_event(Event::new(name)).unwrap();
        }
        for (from, to, event) in [
            ("pending", "approved", "approve"),
            ("pending", "rejected", "reject"),
            ("approved", "shipped", "ship"),
        ] {
            model
                .add_transition(Transition::new(from, to, event))
                .unwrap();
        }
        model
    }

    #[test]
    fn test_every_state_has_an_entry() {
        let model = order_model();
        let graph = StateGraph::build(&model);
        assert_eq!(graph.state_index.len(), 4);
        assert!(graph.outgoing_transitions("shipped").is_empty());
        assert!(graph.incoming_transitions("pending").is_empty());
    }

    #[test]
    fn test_reachability() {
        let model = order_model();
        let graph = StateGraph::build(&model);
        for state in ["pending", "approved", "rejected", "shipped"] {
            assert!(graph.is_reachable(state), "{} should be reachable", state);
        }
        assert!(graph.unreachable_states().is_empty());
        assert!(!graph.is_reachable("unknown"));
    }

    #[test]
    fn test_unreachable_state() {
        let mut model = order_model();
        model.add_state(State::new("archived")).unwrap();
        let graph = StateGraph::build(&model);
        assert_eq!(graph.unreachable_states(), vec!["archived"]);
        assert!(!graph.is_reachable("archived"));
    }

    #[test]
    fn test_no_transitions_only_initial_reachable() {
        let mut model = Model::new("Idle", "idle").unwrap();
        model.add_state(State::new("idle")).unwrap();
        model.add_state(State::new("busy")).unwrap();
        let graph = StateGraph::build(&model);
        assert!(graph.is_reachable("idle"));
        assert_eq!(graph.unreachable_states(), vec!["busy"]);
        assert!(!graph.has_cycles());
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_missing_initial_reaches_nothing() {
        let mut model = Model::new("Broken", "start").unwrap();
        model.add_state(State::new("idle")).unwrap();
        let graph = StateGraph::build(&model);
        assert!(!graph.is_reachable("start"));
        assert_eq!(graph.unreachable_states(), vec!["idle"]);
    }

    #[test]
    fn test_acyclic_graph() {
        let model = order_model();
        let graph = StateGraph::build(&model);
        assert!(!graph.has_cycles());
        assert!(!petgraph::algo::is_cyclic_directed(&graph.graph));
    }

    #[test]
    fn test_shared_successor_is_not_a_cycle() {
        let mut model = order_model();
        model
            .add_transition(Transition::new("approved", "rejected", "reject"))
            .unwrap();
        let graph = StateGraph::build(&model);
        assert!(!graph.has_cycles());
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_back_edge_is_cycle() {
        let mut model = order_model();
        model
            .add_transition(Transition::new("shipped", "pending", "ship"))
            .unwrap();
        let graph = StateGraph::build(&model);
        assert!(graph.has_cycles());
        assert_eq!(
            graph.cycles(),
            vec![vec!["approved", "pending", "shipped"]]
        );
    }

    #[test]
    fn test_self_transition_is_cycle() {
        let mut model = order_model();
        model
            .add_transition(Transition::new("rejected", "rejected", "reject"))
            .unwrap();
        let graph = StateGraph::build(&model);
        assert!(graph.has_cycles());
        assert_eq!(graph.cycles(), vec![vec!["rejected"]]);
    }

    #[test]
    fn test_cycle_unreachable_from_initial() {
        let mut model = order_model();
        model.add_state(State::new("left")).unwrap();
        model.add_state(State::new("right")).unwrap();
        model
            .add_transition(Transition::new("left", "right", "ship"))
            .unwrap();
        model
            .add_transition(Transition::new("right", "left", "ship"))
            .unwrap();
        let graph = StateGraph::build(&model);
        assert!(graph.has_cycles());
        assert!(!graph.is_reachable("left"));
    }

    #[test]
    fn test_transitions_keep_insertion_order() {
        let mut model = order_model();
        model
            .add_transition(Transition::new("pending", "shipped", "ship"))
            .unwrap();
        let graph = StateGraph::build(&model);
        let events: Vec<&str> = graph
            .outgoing_transitions("pending")
            .iter()
            .map(|t| t.event.as_str())
            .collect();
        assert_eq!(events, vec!["approve", "reject", "ship"]);

        let sources: Vec<&str> = graph
            .incoming_transitions("shipped")
            .iter()
            .map(|t| t.from.as_str())
            .collect();
        assert_eq!(sources, vec!["approved", "pending"]);
        assert!(graph.outgoing_transitions("unknown").is_empty());
    }

    #[test]
    fn test_to_dot_output() {
        let model = order_model();
        let graph = StateGraph::build(&model);
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph OrderStateMachine {"));
        assert!(dot.contains("__start -> \"pending\""));
        assert!(dot.contains("\"pending\" -> \"approved\" [label=\"approve\"]"));
        assert!(dot.contains("lightblue"));
    }

    #[test]
    fn test_graph_stats() {
        let mut model = order_model();
        model.add_state(State::new("archived")).unwrap();
        let graph = StateGraph::build(&model);
        let stats = graph.stats();
        assert_eq!(stats.total_states, 5);
        assert_eq!(stats.total_transitions, 3);
        assert_eq!(stats.reachable_states, 4);
        assert_eq!(stats.unreachable_states, 1);
        assert_eq!(stats.terminal_states, 3);
        assert_eq!(stats.self_transitions, 0);
        assert_eq!(
            graph.terminal_states(),
            vec!["rejected", "shipped", "archived"]
        );
    }
}
