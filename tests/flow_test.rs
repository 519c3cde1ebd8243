//! End-to-end run through the facade crate.

use marigold::{
  Command, CommandContext, CommandError, CommandSet, Flow, FlowEngine, FnCommand, Node, Outputs,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn upper() -> impl Command {
  FnCommand::new(|_: &CommandContext, inputs: Outputs| {
    let text = inputs
      .get("text")
      .and_then(Value::as_str)
      .ok_or_else(|| CommandError::missing_input("text"))?;
    let mut out = Outputs::new();
    out.insert("default".to_string(), json!(text.to_uppercase()));
    Ok(out)
  })
}

#[tokio::test]
async fn test_greeting_per_name() {
  let engine = FlowEngine::new(CommandSet::new().with("upper", upper()));
  let flow = Flow::new("greetings")
    .with_node(Node::new("params", "INPUT"))
    .with_node(Node::new("shout", "upper"))
    .with_node(
      Node::new("greetings", "_for")
        .with_anchor("data", "params", "names")
        .with_iteration("shout", "text", Some("default")),
    );

  let mut params = Outputs::new();
  params.insert("names".to_string(), json!(["ada", "grace"]));

  let result = engine
    .exec_flow(CancellationToken::new(), &flow, params)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(result["default"], json!(["ADA", "GRACE"]));
}
