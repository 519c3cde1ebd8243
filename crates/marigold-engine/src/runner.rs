//! Recursive lazy-pull executor for one run.
//!
//! A node runs when something needs its outputs: its inputs are resolved in
//! declared order, pulling each anchored dependency first. Outside any
//! iteration scope those pulls go through the [`ExecutionCache`], so a node
//! shared by several consumers runs once. `_switch` and `_for` live in
//! [`control`] and decide themselves which inputs to pull.

mod control;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use marigold_command::{CommandContext, CommandRegistry, Outputs};
use marigold_graph::{
  FOR_COMMAND, Flow, INPUT_COMMAND, InputSource, Node, NodeInput, PASS_THROUGH_COMMAND,
  SWITCH_COMMAND,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cache::{ExecutionCache, NodeOutcome};
use crate::error::ExecError;
use crate::events::{NodeStatus, StatusReporter};
use crate::expression::ConditionEvaluator;
use crate::inject::Inject;
use crate::iteration::IterationAdapter;

/// Collaborators and per-run state shared by every node execution.
pub(crate) struct Runner<'a> {
  flow: &'a Flow,
  registry: &'a dyn CommandRegistry,
  conditions: &'a dyn ConditionEvaluator,
  iteration: &'a dyn IterationAdapter,
  reporter: StatusReporter<'a>,
  cache: ExecutionCache,
  params: Outputs,
  execution_id: String,
  cancel: CancellationToken,
  max_depth: usize,
}

impl<'a> Runner<'a> {
  #[allow(clippy::too_many_arguments)]
  pub(crate) fn new(
    flow: &'a Flow,
    registry: &'a dyn CommandRegistry,
    conditions: &'a dyn ConditionEvaluator,
    iteration: &'a dyn IterationAdapter,
    reporter: StatusReporter<'a>,
    params: Outputs,
    execution_id: String,
    cancel: CancellationToken,
    max_depth: usize,
  ) -> Self {
    Self {
      flow,
      registry,
      conditions,
      iteration,
      reporter,
      cache: ExecutionCache::new(),
      params,
      execution_id,
      cancel,
      max_depth,
    }
  }

  /// Execute a node from the top of a run, through the cache.
  pub(crate) async fn run(&self, node_id: &str) -> Result<NodeOutcome, ExecError> {
    let inject = Inject::new();
    self
      .cache
      .get_or_exec(node_id, || self.exec_node(node_id, &inject, 0))
      .await
  }

  /// Execute one node under `inject`, reporting its terminal status.
  pub(crate) fn exec_node<'s>(
    &'s self,
    node_id: &'s str,
    inject: &'s Inject,
    depth: usize,
  ) -> BoxFuture<'s, Result<NodeOutcome, ExecError>> {
    Box::pin(async move {
      if self.cancel.is_cancelled() {
        return Err(ExecError::Cancelled);
      }
      if depth > self.max_depth {
        return Err(ExecError::DepthExceeded {
          node_id: node_id.to_string(),
          limit: self.max_depth,
        });
      }
      let node = self
        .flow
        .get_node(node_id)
        .ok_or_else(|| ExecError::NodeNotFound {
          node_id: node_id.to_string(),
        })?;

      let started_at = Utc::now();
      let result = match node.command.as_str() {
        SWITCH_COMMAND => self.exec_switch(node, inject, depth).await,
        FOR_COMMAND => self.exec_for(node, inject, depth).await,
        _ => self.exec_command(node, inject, depth, started_at).await,
      };

      match &result {
        Ok(NodeOutcome::Value(outputs)) => {
          self
            .reporter
            .report(NodeStatus::success(node_id, (**outputs).clone(), started_at))
            .await;
        }
        Ok(NodeOutcome::Unreachable) => {
          self
            .reporter
            .report(NodeStatus::unreachable(node_id, started_at))
            .await;
        }
        // Nothing failed here; the run was stopped.
        Err(ExecError::Cancelled) => {}
        Err(err) => {
          self
            .reporter
            .report(NodeStatus::failed(node_id, err.frame_message(), started_at))
            .await;
        }
      }

      result
    })
  }

  /// Outcome of a dependency: cached when no overlay is active, fresh otherwise.
  async fn pull(
    &self,
    node_id: &str,
    inject: &Inject,
    depth: usize,
  ) -> Result<NodeOutcome, ExecError> {
    if inject.is_empty() {
      self
        .cache
        .get_or_exec(node_id, || self.exec_node(node_id, inject, depth + 1))
        .await
    } else {
      self.exec_node(node_id, inject, depth + 1).await
    }
  }

  /// Resolve one input of `node`. `None` means the value is unreachable and
  /// the consumer must be too.
  async fn resolve_input(
    &self,
    node: &Node,
    input: &NodeInput,
    inject: &Inject,
    depth: usize,
  ) -> Result<Option<Value>, ExecError> {
    let anchor = match &input.source {
      InputSource::Literal { value } => return Ok(Some(value.clone())),
      InputSource::Anchor(anchor) => anchor,
    };

    if !anchor.is_bound() {
      return if anchor.optional {
        Ok(Some(Value::Null))
      } else {
        Err(ExecError::UnboundInput {
          node_id: node.id.clone(),
          input: input.key.clone(),
        })
      };
    }

    let outcome = self
      .pull(&anchor.node_id, inject, depth)
      .await
      .map_err(|err| ExecError::upstream(&node.id, &input.key, err))?;

    match outcome {
      NodeOutcome::Value(outputs) => Ok(Some(
        outputs
          .get(&anchor.output_key)
          .cloned()
          .unwrap_or(Value::Null),
      )),
      NodeOutcome::Unreachable if anchor.optional => Ok(Some(Value::Null)),
      NodeOutcome::Unreachable => Ok(None),
    }
  }

  /// Run a command node: assemble inputs, look the command up, invoke it.
  async fn exec_command(
    &self,
    node: &Node,
    inject: &Inject,
    depth: usize,
    started_at: DateTime<Utc>,
  ) -> Result<NodeOutcome, ExecError> {
    let mut inputs = Outputs::new();
    let mut input_keys = Vec::with_capacity(node.inputs.len());
    for input in &node.inputs {
      let Some(value) = self.resolve_input(node, input, inject, depth).await? else {
        return Ok(NodeOutcome::Unreachable);
      };
      inputs.insert(input.key.clone(), value);
      input_keys.push(input.key.clone());
    }
    for (key, value) in inject.iter() {
      inputs.insert(key.clone(), value.clone());
    }

    if node.command.is_empty() {
      return Err(ExecError::MissingCommand {
        node_id: node.id.clone(),
      });
    }
    if node.command == INPUT_COMMAND {
      return Ok(NodeOutcome::value(self.params.clone()));
    }
    let Some(command) = self.registry.get(&node.command) else {
      if node.command == PASS_THROUGH_COMMAND {
        return Ok(NodeOutcome::value(inputs));
      }
      return Err(ExecError::CommandNotFound {
        node_id: node.id.clone(),
        command: node.command.clone(),
      });
    };

    self
      .reporter
      .report(NodeStatus::running(&node.id, started_at))
      .await;

    let ctx = CommandContext::new(
      &self.execution_id,
      &node.id,
      input_keys,
      self.cancel.clone(),
    );
    match command.execute(&ctx, inputs).await {
      Ok(outputs) => Ok(NodeOutcome::value(outputs)),
      Err(err) if err.is_unreachable() => Ok(NodeOutcome::Unreachable),
      Err(err) if err.is_cancelled() => Err(ExecError::Cancelled),
      Err(source) => Err(ExecError::Command {
        node_id: node.id.clone(),
        source,
      }),
    }
  }

  /// Number of nodes with a cached outcome.
  #[cfg(test)]
  pub(crate) fn cached(&self) -> usize {
    self.cache.len()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  use marigold_command::{CommandSet, FnCommand};
  use serde_json::json;

  use super::*;
  use crate::events::NoopSink;
  use crate::expression::JinjaConditions;
  use crate::iteration::JsonIteration;

  fn counting(calls: Arc<AtomicUsize>) -> impl marigold_command::Command {
    FnCommand::new(move |_: &CommandContext, inputs: Outputs| {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(inputs)
    })
  }

  async fn run(
    flow: &Flow,
    registry: &CommandSet,
    node_id: &str,
  ) -> (Result<NodeOutcome, ExecError>, usize) {
    let sink = NoopSink;
    let conditions = JinjaConditions::new();
    let runner = Runner::new(
      flow,
      registry,
      &conditions,
      &JsonIteration,
      StatusReporter::new(&sink),
      Outputs::new(),
      "exec-test".to_string(),
      CancellationToken::new(),
      16,
    );
    let result = runner.run(node_id).await;
    (result, runner.cached())
  }

  #[tokio::test]
  async fn test_shared_dependency_runs_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = CommandSet::new()
      .with("source", counting(calls.clone()))
      .with("echo", FnCommand::new(|_: &CommandContext, inputs: Outputs| Ok(inputs)));
    let flow = Flow::new("sum")
      .with_node(Node::new("a", "source").with_literal("default", 1))
      .with_node(Node::new("b", "echo").with_anchor("x", "a", "default"))
      .with_node(Node::new("c", "echo").with_anchor("y", "a", "default"))
      .with_node(
        Node::new("sum", "echo")
          .with_anchor("left", "b", "x")
          .with_anchor("right", "c", "y"),
      );

    let (result, cached) = run(&flow, &registry, "sum").await;
    let outcome = result.unwrap();
    assert_eq!(outcome.outputs().unwrap()["left"], 1);
    assert_eq!(outcome.outputs().unwrap()["right"], 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cached, 4);
  }

  #[tokio::test]
  async fn test_missing_output_key_is_null() {
    let registry = CommandSet::new();
    let flow = Flow::new("b")
      .with_node(Node::new("a", "_nothing").with_literal("x", 1))
      .with_node(Node::new("b", "_nothing").with_anchor("y", "a", "absent"));

    let (result, _) = run(&flow, &registry, "b").await;
    assert_eq!(result.unwrap().outputs().unwrap()["y"], json!(null));
  }

  #[tokio::test]
  async fn test_depth_limit() {
    let registry = CommandSet::new();
    let mut flow = Flow::new("n0").with_node(Node::new("n20", "_nothing"));
    for i in 0..20 {
      flow = flow.with_node(
        Node::new(format!("n{i}"), "_nothing").with_anchor("x", format!("n{}", i + 1), "x"),
      );
    }

    let (result, _) = run(&flow, &registry, "n0").await;
    let err = result.unwrap_err();
    assert!(matches!(
      err.root_cause(),
      ExecError::DepthExceeded { limit: 16, .. }
    ));
  }
}
