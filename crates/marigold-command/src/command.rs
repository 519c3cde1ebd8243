use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::CommandError;

/// Named values flowing into and out of a command.
pub type Outputs = serde_json::Map<String, serde_json::Value>;

/// Context provided to a command during execution.
#[derive(Debug, Clone)]
pub struct CommandContext {
  /// Flow execution ID.
  pub execution_id: String,

  /// Node ID within the flow.
  pub node_id: String,

  /// Keys of the node's wired inputs, in declaration order. Variadic
  /// commands use this to recover argument order.
  pub input_keys: Vec<String>,

  /// Cancellation signal for the whole run. Long-running commands should
  /// check it and return [`CommandError::Cancelled`].
  pub cancel: CancellationToken,
}

impl CommandContext {
  pub fn new(
    execution_id: impl Into<String>,
    node_id: impl Into<String>,
    input_keys: Vec<String>,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      execution_id: execution_id.into(),
      node_id: node_id.into(),
      input_keys,
      cancel,
    }
  }

  /// Fail fast when the run was cancelled.
  pub fn check_cancelled(&self) -> Result<(), CommandError> {
    if self.cancel.is_cancelled() {
      Err(CommandError::Cancelled)
    } else {
      Ok(())
    }
  }
}

/// An executable capability invoked by name from flow nodes.
#[async_trait]
pub trait Command: Send + Sync {
  /// Run the command against fully resolved inputs.
  async fn execute(&self, ctx: &CommandContext, inputs: Outputs) -> Result<Outputs, CommandError>;
}

/// A command backed by a plain closure.
///
/// ```ignore
/// let upper = FnCommand::new(|_ctx, inputs| {
///   let text = inputs.get("text").and_then(|v| v.as_str()).unwrap_or_default();
///   Ok(Outputs::from_iter([("default".to_string(), text.to_uppercase().into())]))
/// });
/// ```
pub struct FnCommand<F> {
  func: F,
}

impl<F> FnCommand<F>
where
  F: Fn(&CommandContext, Outputs) -> Result<Outputs, CommandError> + Send + Sync,
{
  pub fn new(func: F) -> Self {
    Self { func }
  }
}

#[async_trait]
impl<F> Command for FnCommand<F>
where
  F: Fn(&CommandContext, Outputs) -> Result<Outputs, CommandError> + Send + Sync,
{
  async fn execute(&self, ctx: &CommandContext, inputs: Outputs) -> Result<Outputs, CommandError> {
    ctx.check_cancelled()?;
    (self.func)(ctx, inputs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn ctx(cancel: CancellationToken) -> CommandContext {
    CommandContext::new("exec-1", "node-1", vec!["text".to_string()], cancel)
  }

  #[tokio::test]
  async fn test_fn_command_executes_closure() {
    let upper = FnCommand::new(|ctx: &CommandContext, inputs: Outputs| {
      let text = inputs
        .get("text")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CommandError::missing_input("text"))?;
      let mut out = Outputs::new();
      out.insert("default".to_string(), json!(text.to_uppercase()));
      out.insert("node".to_string(), json!(ctx.node_id));
      Ok(out)
    });

    let mut inputs = Outputs::new();
    inputs.insert("text".to_string(), json!("hello"));

    let out = upper
      .execute(&ctx(CancellationToken::new()), inputs)
      .await
      .unwrap();
    assert_eq!(out["default"], "HELLO");
    assert_eq!(out["node"], "node-1");
  }

  #[tokio::test]
  async fn test_fn_command_observes_cancellation() {
    let noop = FnCommand::new(|_: &CommandContext, inputs: Outputs| Ok(inputs));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = noop.execute(&ctx(cancel), Outputs::new()).await;
    assert!(matches!(result, Err(CommandError::Cancelled)));
  }
}
