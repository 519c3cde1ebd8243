//! The `_switch` and `_for` primitives.
//!
//! Both resolve their `data` input eagerly and everything else on their own
//! terms: `_switch` pulls only the selected branch, `_for` re-executes its
//! target once per element under a fresh [`Inject`] scope.

use marigold_command::Outputs;
use marigold_graph::{BRANCH_OUTPUT, DATA_INPUT, DEFAULT_OUTPUT, Node};
use serde_json::Value;

use super::Runner;
use crate::cache::NodeOutcome;
use crate::error::ExecError;
use crate::expression::truthy;
use crate::inject::Inject;

impl Runner<'_> {
  /// Resolve the `data` input. A node without one sees `null`.
  async fn resolve_data(
    &self,
    node: &Node,
    inject: &Inject,
    depth: usize,
  ) -> Result<Option<Value>, ExecError> {
    match node.input(DATA_INPUT) {
      Some(input) => self.resolve_input(node, input, inject, depth).await,
      None => Ok(Some(Value::Null)),
    }
  }

  /// Pick the first input whose key, as a condition on `data`, holds.
  pub(super) async fn exec_switch(
    &self,
    node: &Node,
    inject: &Inject,
    depth: usize,
  ) -> Result<NodeOutcome, ExecError> {
    let Some(data) = self.resolve_data(node, inject, depth).await? else {
      return Ok(NodeOutcome::Unreachable);
    };

    for input in node.inputs.iter().filter(|input| input.key != DATA_INPUT) {
      let result = self
        .conditions
        .evaluate(&data, &input.key)
        .map_err(|source| ExecError::Condition {
          node_id: node.id.clone(),
          condition: input.key.clone(),
          source,
        })?;
      if !truthy(&result) {
        continue;
      }

      let Some(value) = self.resolve_input(node, input, inject, depth).await? else {
        return Ok(NodeOutcome::Unreachable);
      };
      return Ok(NodeOutcome::value(branch_outputs(value, &input.key)));
    }

    Ok(NodeOutcome::value(branch_outputs(Value::Null, "")))
  }

  /// Run the iteration target once per element of `data`, collecting the
  /// output key of each run in source order.
  pub(super) async fn exec_for(
    &self,
    node: &Node,
    inject: &Inject,
    depth: usize,
  ) -> Result<NodeOutcome, ExecError> {
    let iteration = node
      .iteration
      .as_ref()
      .filter(|iteration| !iteration.node_id.is_empty())
      .ok_or_else(|| ExecError::MissingIterationTarget {
        node_id: node.id.clone(),
      })?;

    let Some(data) = self.resolve_data(node, inject, depth).await? else {
      return Ok(NodeOutcome::Unreachable);
    };
    let elements = self
      .iteration
      .elements(&data)
      .map_err(|source| ExecError::Iteration {
        node_id: node.id.clone(),
        source,
      })?;

    let output_key = iteration.output_key();
    let mut collected = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
      let scope = inject.with(iteration.input_key.as_str(), element);
      let outcome = self
        .exec_node(&iteration.node_id, &scope, depth + 1)
        .await
        .map_err(|err| ExecError::in_loop(&node.id, index, err))?;

      collected.push(
        outcome
          .outputs()
          .and_then(|outputs| outputs.get(output_key))
          .cloned()
          .unwrap_or(Value::Null),
      );
    }

    let mut outputs = Outputs::new();
    outputs.insert(DEFAULT_OUTPUT.to_string(), Value::Array(collected));
    Ok(NodeOutcome::value(outputs))
  }
}

fn branch_outputs(value: Value, branch: &str) -> Outputs {
  let mut outputs = Outputs::new();
  outputs.insert(DEFAULT_OUTPUT.to_string(), value);
  outputs.insert(BRANCH_OUTPUT.to_string(), Value::String(branch.to_string()));
  outputs
}
