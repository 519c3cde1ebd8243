use std::collections::{BTreeSet, HashMap, HashSet};

use crate::Node;

/// Dependency structure of a flow, derived from anchors and iteration bindings.
///
/// Edges point from a consumer to the node it pulls from.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
  /// node_id -> nodes it depends on, in declaration order.
  dependencies: HashMap<String, Vec<String>>,
  /// node_id -> nodes consuming it.
  consumers: HashMap<String, Vec<String>>,
  /// Nodes no other node consumes, sorted by id.
  roots: Vec<String>,
}

impl DependencyGraph {
  pub fn new(nodes: &HashMap<String, Node>) -> Self {
    let mut dependencies: HashMap<String, Vec<String>> = HashMap::new();
    let mut consumers: HashMap<String, Vec<String>> = HashMap::new();

    for node_id in nodes.keys() {
      dependencies.entry(node_id.clone()).or_default();
      consumers.entry(node_id.clone()).or_default();
    }

    for (node_id, node) in nodes {
      for dep in node.dependencies() {
        dependencies
          .entry(node_id.clone())
          .or_default()
          .push(dep.to_string());

        let entry = consumers.entry(dep.to_string()).or_default();
        if !entry.contains(node_id) {
          entry.push(node_id.clone());
        }
      }
    }

    let roots: BTreeSet<String> = nodes
      .keys()
      .filter(|id| consumers.get(*id).is_none_or(|v| v.is_empty()))
      .cloned()
      .collect();

    Self {
      dependencies,
      consumers,
      roots: roots.into_iter().collect(),
    }
  }

  /// Nodes nothing depends on, in id order.
  pub fn roots(&self) -> &[String] {
    &self.roots
  }

  pub fn dependencies(&self, node_id: &str) -> &[String] {
    self
      .dependencies
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  pub fn consumers(&self, node_id: &str) -> &[String] {
    self
      .consumers
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Find a dependency cycle, returned as the path that closes it.
  ///
  /// Walks with an explicit stack, so chain length is not bounded by the
  /// call stack.
  pub fn find_cycle(&self) -> Option<Vec<String>> {
    let mut done: HashSet<&str> = HashSet::new();
    let mut on_path: HashSet<&str> = HashSet::new();
    // (node, index of the next dependency to visit)
    let mut stack: Vec<(&str, usize)> = Vec::new();

    let mut ids: Vec<&str> = self.dependencies.keys().map(|id| id.as_str()).collect();
    ids.sort_unstable();

    for id in ids {
      if done.contains(id) {
        continue;
      }
      stack.push((id, 0));
      on_path.insert(id);

      while let Some((node, next)) = stack.last_mut() {
        let node = *node;
        let Some(dep) = self.dependencies(node).get(*next) else {
          stack.pop();
          on_path.remove(node);
          done.insert(node);
          continue;
        };
        *next += 1;
        let dep = dep.as_str();

        if on_path.contains(dep) {
          let start = stack.iter().position(|(id, _)| *id == dep).unwrap_or(0);
          let mut cycle: Vec<String> = stack[start..]
            .iter()
            .map(|(id, _)| id.to_string())
            .collect();
          cycle.push(dep.to_string());
          return Some(cycle);
        }
        if !done.contains(dep) {
          stack.push((dep, 0));
          on_path.insert(dep);
        }
      }
    }

    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn nodes(list: Vec<Node>) -> HashMap<String, Node> {
    list.into_iter().map(|n| (n.id.clone(), n)).collect()
  }

  #[test]
  fn test_roots_are_unconsumed_nodes_sorted() {
    let graph = DependencyGraph::new(&nodes(vec![
      Node::new("c", "noop"),
      Node::new("b", "upper").with_anchor("text", "a", "default"),
      Node::new("a", "source"),
    ]));

    assert_eq!(graph.roots(), &["b".to_string(), "c".to_string()]);
    assert_eq!(graph.dependencies("b"), &["a".to_string()]);
    assert_eq!(graph.consumers("a"), &["b".to_string()]);
    assert!(graph.consumers("c").is_empty());
  }

  #[test]
  fn test_iteration_target_is_not_a_root() {
    let graph = DependencyGraph::new(&nodes(vec![
      Node::new("loop", "_for").with_iteration("body", "item", None),
      Node::new("body", "double"),
    ]));

    assert_eq!(graph.roots(), &["loop".to_string()]);
  }

  #[test]
  fn test_find_cycle() {
    let acyclic = DependencyGraph::new(&nodes(vec![
      Node::new("a", "f"),
      Node::new("b", "f").with_anchor("v", "a", "default"),
    ]));
    assert!(acyclic.find_cycle().is_none());

    let cyclic = DependencyGraph::new(&nodes(vec![
      Node::new("a", "f").with_anchor("v", "c", "default"),
      Node::new("b", "f").with_anchor("v", "a", "default"),
      Node::new("c", "f").with_anchor("v", "b", "default"),
    ]));
    let cycle = cyclic.find_cycle().expect("cycle expected");
    assert_eq!(cycle.first(), cycle.last());
    assert_eq!(cycle.len(), 4);
  }

  #[test]
  fn test_self_reference_is_a_cycle() {
    let graph = DependencyGraph::new(&nodes(vec![
      Node::new("a", "f").with_anchor("v", "a", "default"),
    ]));
    assert_eq!(
      graph.find_cycle(),
      Some(vec!["a".to_string(), "a".to_string()])
    );
  }

  /// `n0 -> n1 -> ... -> n{len-1}`, optionally closed back onto `n0`.
  fn chain(len: usize, closed: bool) -> HashMap<String, Node> {
    let mut list: Vec<Node> = (0..len - 1)
      .map(|i| {
        Node::new(format!("n{i}"), "f").with_anchor("v", format!("n{}", i + 1), "default")
      })
      .collect();
    let last = Node::new(format!("n{}", len - 1), "f");
    list.push(if closed { last.with_anchor("v", "n0", "default") } else { last });
    nodes(list)
  }

  #[test]
  fn test_long_chain_has_no_cycle() {
    let graph = DependencyGraph::new(&chain(200_000, false));
    assert!(graph.find_cycle().is_none());
  }

  #[test]
  fn test_long_cycle_is_found() {
    let graph = DependencyGraph::new(&chain(200_000, true));
    let cycle = graph.find_cycle().expect("cycle expected");
    assert_eq!(cycle.len(), 200_001);
    assert_eq!(cycle.first().map(String::as_str), Some("n0"));
    assert_eq!(cycle.last().map(String::as_str), Some("n0"));
  }
}
