use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::node::{InputSource, Node};

/// A compiled flow ready for execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flow {
  /// node_id -> node
  pub nodes: HashMap<String, Node>,
  /// Node whose successful output is the result of the flow.
  pub output_node_id: String,
}

impl Flow {
  pub fn new(output_node_id: impl Into<String>) -> Self {
    Self {
      nodes: HashMap::new(),
      output_node_id: output_node_id.into(),
    }
  }

  /// Add a node, keyed by its id.
  pub fn with_node(mut self, node: Node) -> Self {
    self.nodes.insert(node.id.clone(), node);
    self
  }

  pub fn get_node(&self, node_id: &str) -> Option<&Node> {
    self.nodes.get(node_id)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Build the dependency graph for traversal and analysis.
  pub fn graph(&self) -> DependencyGraph {
    DependencyGraph::new(&self.nodes)
  }

  /// Nodes that must be seeded explicitly: those never referenced as an
  /// anchor target or iteration target. Sorted by id.
  pub fn root_nodes(&self) -> Vec<&Node> {
    self
      .graph()
      .roots()
      .iter()
      .filter_map(|id| self.nodes.get(id))
      .collect()
  }

  /// Distinct command names referenced by the flow, sorted.
  pub fn used_commands(&self) -> Vec<String> {
    self
      .nodes
      .values()
      .map(|node| node.command.clone())
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect()
  }

  /// Check that every reference resolves and the dependencies form a DAG.
  pub fn validate(&self) -> Result<(), GraphError> {
    let mut ids: Vec<&String> = self.nodes.keys().collect();
    ids.sort();

    for id in ids {
      let node = &self.nodes[id];
      for input in &node.inputs {
        if let InputSource::Anchor(anchor) = &input.source
          && anchor.is_bound()
          && !self.nodes.contains_key(&anchor.node_id)
        {
          return Err(GraphError::UnknownAnchorTarget {
            node_id: node.id.clone(),
            input: input.key.clone(),
            target: anchor.node_id.clone(),
          });
        }
      }

      if let Some(iteration) = &node.iteration
        && !iteration.node_id.is_empty()
        && !self.nodes.contains_key(&iteration.node_id)
      {
        return Err(GraphError::UnknownIterationTarget {
          node_id: node.id.clone(),
          target: iteration.node_id.clone(),
        });
      }
    }

    if !self.output_node_id.is_empty() && !self.nodes.contains_key(&self.output_node_id) {
      return Err(GraphError::OutputNodeNotFound(self.output_node_id.clone()));
    }

    if let Some(cycle) = self.graph().find_cycle() {
      return Err(GraphError::Cycle(cycle));
    }

    Ok(())
  }
}
