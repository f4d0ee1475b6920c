// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 siteflow contributors

//! Step dependency graph
//!
//! Validates a step set (duplicate ids, unknown dependencies, cycles) and
//! produces the execution order before anything external is invoked. Also
//! renders the graph for the `graph` command.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

use crate::errors::SiteflowError;
use crate::pipeline::{Step, StepKind};

/// Validated dependency DAG over a step set.
///
/// Node weights are indices into the originating slice; `ids` mirrors them
/// so graph nodes can be named without holding the steps.
pub struct StepDag {
    graph: DiGraph<usize, ()>,
    nodes: HashMap<String, NodeIndex>,
    ids: Vec<String>,
}

impl StepDag {
    /// Build and validate a DAG from a step set
    pub fn build(steps: &[Step]) -> Result<Self, SiteflowError> {
        let mut graph = DiGraph::with_capacity(steps.len(), steps.len());
        let mut nodes = HashMap::with_capacity(steps.len());
        let mut ids = Vec::with_capacity(steps.len());

        for (idx, step) in steps.iter().enumerate() {
            if nodes.contains_key(&step.id) {
                return Err(SiteflowError::DuplicateStep {
                    step: step.id.clone(),
                });
            }
            nodes.insert(step.id.clone(), graph.add_node(idx));
            ids.push(step.id.clone());
        }

        for step in steps {
            let to = nodes[&step.id];
            for dep in &step.depends_on {
                let from = *nodes.get(dep).ok_or_else(|| SiteflowError::UnknownDependency {
                    step: step.id.clone(),
                    dependency: dep.clone(),
                })?;
                graph.add_edge(from, to, ());
            }
        }

        let dag = Self { graph, nodes, ids };
        // Surfaces cycles before the executor ever sees the set
        dag.topological_order()?;
        Ok(dag)
    }

    fn id_of(&self, node: NodeIndex) -> &str {
        &self.ids[self.graph[node]]
    }

    /// Step indices in a valid execution order
    pub fn topological_order(&self) -> Result<Vec<usize>, SiteflowError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|n| self.graph[n]).collect()),
            Err(cycle) => Err(SiteflowError::CircularDependency {
                steps: self.cycle_members(cycle.node_id()),
            }),
        }
    }

    /// Step ids in a valid execution order
    pub fn topological_order_ids(&self) -> Result<Vec<String>, SiteflowError> {
        Ok(self
            .topological_order()?
            .into_iter()
            .map(|idx| self.ids[idx].clone())
            .collect())
    }

    /// Steps on the same cycle as `start`, i.e. mutually reachable with it
    fn cycle_members(&self, start: NodeIndex) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&node| {
                node == start
                    || (has_path_connecting(&self.graph, start, node, None)
                        && has_path_connecting(&self.graph, node, start, None))
            })
            .map(|node| self.id_of(node).to_string())
            .collect()
    }

    /// Direct dependencies of a step (its prerequisites)
    pub fn dependencies(&self, step_id: &str) -> Option<Vec<String>> {
        let node = *self.nodes.get(step_id)?;
        Some(self.neighbor_ids(node, Direction::Incoming))
    }

    /// Direct dependents of a step (steps gated on it)
    pub fn dependents(&self, step_id: &str) -> Option<Vec<String>> {
        let node = *self.nodes.get(step_id)?;
        Some(self.neighbor_ids(node, Direction::Outgoing))
    }

    fn neighbor_ids(&self, node: NodeIndex, dir: Direction) -> Vec<String> {
        self.graph
            .neighbors_directed(node, dir)
            .map(|n| self.id_of(n).to_string())
            .collect()
    }

    /// Whether `step_a` depends on `step_b`, directly or transitively
    pub fn depends_on(&self, step_a: &str, step_b: &str) -> bool {
        match (self.nodes.get(step_a), self.nodes.get(step_b)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, b, a, None),
            _ => false,
        }
    }

    /// Mermaid diagram. Extraction steps render as stadiums, generation
    /// steps as boxes.
    pub fn to_mermaid(&self, steps: &[Step]) -> String {
        let mut out = String::from("graph TD\n");

        for node in self.graph.node_indices() {
            let step = &steps[self.graph[node]];
            match step.kind {
                StepKind::Extraction { .. } => {
                    out.push_str(&format!("    {id}([{id}])\n", id = step.id));
                }
                StepKind::Generation => {
                    out.push_str(&format!("    {id}[{id}]\n", id = step.id));
                }
            }
        }

        for edge in self.graph.edge_indices() {
            let (from, to) = self.graph.edge_endpoints(edge).unwrap();
            out.push_str(&format!("    {} --> {}\n", self.id_of(from), self.id_of(to)));
        }

        out
    }

    /// DOT diagram, critical steps outlined bold
    pub fn to_dot(&self, steps: &[Step]) -> String {
        let mut out = String::from("digraph steps {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for node in self.graph.node_indices() {
            let step = &steps[self.graph[node]];
            if step.critical {
                out.push_str(&format!(
                    "    \"{}\" [style=\"rounded,bold\"];\n",
                    step.id
                ));
            } else if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", step.id));
            }
        }

        for edge in self.graph.edge_indices() {
            let (from, to) = self.graph.edge_endpoints(edge).unwrap();
            out.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                self.id_of(from),
                self.id_of(to)
            ));
        }

        out.push_str("}\n");
        out
    }

    /// Numbered execution order with dependency annotations
    pub fn to_text(&self, steps: &[Step]) -> Result<String, SiteflowError> {
        let mut out = String::new();

        for (i, idx) in self.topological_order()?.into_iter().enumerate() {
            let step = &steps[idx];
            out.push_str(&format!("{}. {}", i + 1, step.id));
            if step.critical {
                out.push_str(" (critical)");
            }
            let deps = self.dependencies(&step.id).unwrap_or_default();
            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }
            out.push('\n');
        }

        Ok(out)
    }
}
