use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Built-in conditional branch command.
pub const SWITCH_COMMAND: &str = "_switch";

/// Built-in iteration command.
pub const FOR_COMMAND: &str = "_for";

/// Command name that returns the assembled inputs unchanged when no
/// registered command claims it.
pub const PASS_THROUGH_COMMAND: &str = "_nothing";

/// Command name that yields the initial parameters of a run.
pub const INPUT_COMMAND: &str = "INPUT";

/// Reserved input of `_switch` and `_for` carrying the discriminant or collection.
pub const DATA_INPUT: &str = "data";

/// Output key holding the primary result of a node.
pub const DEFAULT_OUTPUT: &str = "default";

/// Output key holding the condition selected by `_switch`.
pub const BRANCH_OUTPUT: &str = "branch";

/// Whether the engine handles `command` itself instead of looking it up.
pub fn is_builtin_command(command: &str) -> bool {
  matches!(
    command,
    SWITCH_COMMAND | FOR_COMMAND | INPUT_COMMAND | PASS_THROUGH_COMMAND
  )
}

/// A reference to a named output of another node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
  /// Producing node. Empty when the input was left unconnected.
  pub node_id: String,
  pub output_key: String,
  #[serde(default)]
  pub optional: bool,
}

impl Anchor {
  /// Whether the anchor points at a node at all.
  pub fn is_bound(&self) -> bool {
    !self.node_id.is_empty()
  }
}

/// Where an input value comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputSource {
  /// A definition-time value.
  Literal { value: Value },
  /// The output of another node, computed on demand.
  Anchor(Anchor),
}

/// A named input slot of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
  pub key: String,
  #[serde(flatten)]
  pub source: InputSource,
}

impl NodeInput {
  pub fn literal(key: impl Into<String>, value: impl Into<Value>) -> Self {
    Self {
      key: key.into(),
      source: InputSource::Literal {
        value: value.into(),
      },
    }
  }

  pub fn anchor(
    key: impl Into<String>,
    node_id: impl Into<String>,
    output_key: impl Into<String>,
    optional: bool,
  ) -> Self {
    Self {
      key: key.into(),
      source: InputSource::Anchor(Anchor {
        node_id: node_id.into(),
        output_key: output_key.into(),
        optional,
      }),
    }
  }

  /// The anchor target, if this input is wired to another node.
  pub fn anchor_target(&self) -> Option<&str> {
    match &self.source {
      InputSource::Anchor(anchor) if anchor.is_bound() => Some(anchor.node_id.as_str()),
      _ => None,
    }
  }
}

/// Binds an `_for` node to the node it runs once per element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
  /// Node executed for every element.
  pub node_id: String,
  /// Key under which the current element is injected.
  pub input_key: String,
  /// Output collected from each run. Defaults to `input_key`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_key: Option<String>,
}

impl Iteration {
  pub fn output_key(&self) -> &str {
    match self.output_key.as_deref() {
      Some(key) if !key.is_empty() => key,
      _ => &self.input_key,
    }
  }
}

/// A unit of work bound to a command and a set of inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id: String,
  pub command: String,
  #[serde(default)]
  pub inputs: Vec<NodeInput>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub iteration: Option<Iteration>,
}

impl Node {
  pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      command: command.into(),
      inputs: Vec::new(),
      iteration: None,
    }
  }

  pub fn with_input(mut self, input: NodeInput) -> Self {
    self.inputs.push(input);
    self
  }

  pub fn with_literal(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.with_input(NodeInput::literal(key, value))
  }

  pub fn with_anchor(
    self,
    key: impl Into<String>,
    node_id: impl Into<String>,
    output_key: impl Into<String>,
  ) -> Self {
    self.with_input(NodeInput::anchor(key, node_id, output_key, false))
  }

  pub fn with_optional_anchor(
    self,
    key: impl Into<String>,
    node_id: impl Into<String>,
    output_key: impl Into<String>,
  ) -> Self {
    self.with_input(NodeInput::anchor(key, node_id, output_key, true))
  }

  /// Declare an anchor input that was never connected.
  pub fn with_unbound_input(self, key: impl Into<String>, optional: bool) -> Self {
    self.with_input(NodeInput::anchor(key, "", "", optional))
  }

  pub fn with_iteration(
    mut self,
    node_id: impl Into<String>,
    input_key: impl Into<String>,
    output_key: Option<&str>,
  ) -> Self {
    self.iteration = Some(Iteration {
      node_id: node_id.into(),
      input_key: input_key.into(),
      output_key: output_key.map(str::to_string),
    });
    self
  }

  /// Look up an input by key.
  pub fn input(&self, key: &str) -> Option<&NodeInput> {
    self.inputs.iter().find(|input| input.key == key)
  }

  /// Nodes this node pulls from: anchor targets first, then the iteration target.
  pub fn dependencies(&self) -> impl Iterator<Item = &str> {
    self
      .inputs
      .iter()
      .filter_map(NodeInput::anchor_target)
      .chain(
        self
          .iteration
          .as_ref()
          .map(|it| it.node_id.as_str())
          .filter(|id| !id.is_empty()),
      )
  }
}
