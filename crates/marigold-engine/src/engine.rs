//! Flow orchestration.

use std::sync::Arc;

use marigold_command::{CommandRegistry, Outputs};
use marigold_graph::{Flow, is_builtin_command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::cache::NodeOutcome;
use crate::config::EngineConfig;
use crate::error::ExecError;
use crate::events::{ChannelSink, NodeState, NoopSink, StatusReporter, StatusSink};
use crate::expression::{ConditionEvaluator, JinjaConditions};
use crate::iteration::{IterationAdapter, JsonIteration};
use crate::runner::Runner;

/// Executes flows against a command registry.
///
/// The engine itself is stateless between runs: every call builds a fresh
/// runner with its own cache, so one engine can serve concurrent runs.
pub struct FlowEngine {
  registry: Arc<dyn CommandRegistry>,
  conditions: Arc<dyn ConditionEvaluator>,
  iteration: Arc<dyn IterationAdapter>,
  config: EngineConfig,
}

impl FlowEngine {
  /// Create an engine with minijinja conditions and JSON iteration.
  pub fn new(registry: impl CommandRegistry + 'static) -> Self {
    Self {
      registry: Arc::new(registry),
      conditions: Arc::new(JinjaConditions::new()),
      iteration: Arc::new(JsonIteration),
      config: EngineConfig::default(),
    }
  }

  pub fn with_config(mut self, config: EngineConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_condition_evaluator(mut self, conditions: impl ConditionEvaluator + 'static) -> Self {
    self.conditions = Arc::new(conditions);
    self
  }

  pub fn with_iteration_adapter(mut self, iteration: impl IterationAdapter + 'static) -> Self {
    self.iteration = Arc::new(iteration);
    self
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Run the flow, returning the output node's outputs.
  ///
  /// Status events are consumed internally. As soon as the output node
  /// succeeds the run is cancelled, so nodes unrelated to the output stop at
  /// their next cancellation check. Returns `Ok(None)` when the output node
  /// was unreachable or never ran.
  pub async fn exec_flow(
    &self,
    cancel: CancellationToken,
    flow: &Flow,
    params: Outputs,
  ) -> Result<Option<Outputs>, ExecError> {
    let scope = cancel.child_token();
    let _guard = scope.clone().drop_guard();
    let (tx, mut rx) = mpsc::channel(self.config.event_buffer(flow.len()));

    let producer = self.exec_flow_async(scope.clone(), flow, params, ChannelSink::new(tx));
    let consumer = async {
      let mut output = None;
      while let Some(status) = rx.recv().await {
        if output.is_none()
          && status.state == NodeState::Success
          && status.node_id == flow.output_node_id
        {
          output = status.outputs;
          scope.cancel();
        }
      }
      output
    };

    let (result, output) = tokio::join!(producer, consumer);
    match (output, result) {
      (Some(outputs), _) => Ok(Some(outputs)),
      (None, Err(err)) => Err(err),
      (None, Ok(())) => Ok(None),
    }
  }

  /// Run the flow, streaming every node status to `sink`.
  ///
  /// Roots are driven one after another; each pulls its dependencies
  /// recursively. The sink is dropped when this returns, which closes a
  /// channel-backed stream.
  pub async fn exec_flow_async(
    &self,
    cancel: CancellationToken,
    flow: &Flow,
    params: Outputs,
    sink: impl StatusSink,
  ) -> Result<(), ExecError> {
    let execution_id = Uuid::new_v4().to_string();
    self.run(&execution_id, cancel, flow, params, &sink).await
  }

  /// Execute a single node and whatever it depends on, without an observer.
  pub async fn exec_node(
    &self,
    cancel: CancellationToken,
    flow: &Flow,
    node_id: &str,
    params: Outputs,
  ) -> Result<Option<Outputs>, ExecError> {
    flow.validate()?;

    let sink = NoopSink;
    let runner = self.runner(Uuid::new_v4().to_string(), cancel, flow, params, &sink);
    match runner.run(node_id).await? {
      NodeOutcome::Value(outputs) => Ok(Some(Arc::unwrap_or_clone(outputs))),
      NodeOutcome::Unreachable => Ok(None),
    }
  }

  /// Command names used by the flow that are neither built in nor registered.
  pub fn missing_commands(&self, flow: &Flow) -> Vec<String> {
    flow
      .used_commands()
      .into_iter()
      .filter(|name| {
        !name.is_empty() && !is_builtin_command(name) && !self.registry.contains(name)
      })
      .collect()
  }

  #[instrument(
    name = "flow_execute",
    skip(self, cancel, flow, params, sink),
    fields(
      execution_id = %execution_id,
      output_node = %flow.output_node_id,
    )
  )]
  async fn run(
    &self,
    execution_id: &str,
    cancel: CancellationToken,
    flow: &Flow,
    params: Outputs,
    sink: &dyn StatusSink,
  ) -> Result<(), ExecError> {
    info!(
      execution_id = %execution_id,
      nodes = flow.len(),
      "flow_started"
    );

    let result = self
      .run_roots(execution_id, cancel, flow, params, sink)
      .await;

    match &result {
      Ok(()) => {
        info!(execution_id = %execution_id, "flow_completed");
      }
      Err(ExecError::Cancelled) => {
        warn!(execution_id = %execution_id, "flow cancelled");
      }
      Err(e) => {
        error!(
          execution_id = %execution_id,
          node_id = e.node_id().unwrap_or_default(),
          error = %e,
          "flow_failed"
        );
      }
    }

    result
  }

  async fn run_roots(
    &self,
    execution_id: &str,
    cancel: CancellationToken,
    flow: &Flow,
    params: Outputs,
    sink: &dyn StatusSink,
  ) -> Result<(), ExecError> {
    flow.validate()?;

    let runner = self.runner(execution_id.to_string(), cancel.clone(), flow, params, sink);
    for root in flow.root_nodes() {
      // Let a concurrent status consumer catch up before the next root.
      tokio::task::yield_now().await;
      if cancel.is_cancelled() {
        return Err(ExecError::Cancelled);
      }
      runner.run(&root.id).await?;
    }
    Ok(())
  }

  fn runner<'a>(
    &'a self,
    execution_id: String,
    cancel: CancellationToken,
    flow: &'a Flow,
    params: Outputs,
    sink: &'a dyn StatusSink,
  ) -> Runner<'a> {
    Runner::new(
      flow,
      self.registry.as_ref(),
      self.conditions.as_ref(),
      self.iteration.as_ref(),
      StatusReporter::new(sink),
      params,
      execution_id,
      cancel,
      self.config.max_depth,
    )
  }
}

#[cfg(test)]
mod tests {
  use marigold_command::{CommandContext, CommandSet, FnCommand};
  use marigold_graph::Node;

  use super::*;

  #[test]
  fn test_missing_commands() {
    let registry = CommandSet::new().with(
      "known",
      FnCommand::new(|_: &CommandContext, inputs: Outputs| Ok(inputs)),
    );
    let engine = FlowEngine::new(registry);
    let flow = Flow::new("d")
      .with_node(Node::new("a", "known"))
      .with_node(Node::new("b", "unknown"))
      .with_node(Node::new("c", "_nothing"))
      .with_node(Node::new("d", "_switch"))
      .with_node(Node::new("e", "INPUT"))
      .with_node(Node::new("f", "also_unknown"));

    assert_eq!(engine.missing_commands(&flow), vec!["also_unknown", "unknown"]);
  }
}
