//! Marigold Graph
//!
//! This crate provides the flow representation consumed by the marigold engine.
//! A flow is a map of nodes, each invoking a named command with inputs that
//! are either literals or anchors onto another node's output.
//!
//! The graph is read-only during a run. Compilers build it from whatever
//! persisted format they own; nothing here parses external formats.
//!
//! Key pieces:
//! - [`Node`] / [`NodeInput`] / [`Iteration`] describe one unit of work
//! - [`Flow`] holds the nodes plus the designated output node
//! - [`DependencyGraph`] answers root, consumer and cycle questions

mod error;
mod flow;
mod graph;
mod node;

pub use error::GraphError;
pub use flow::Flow;
pub use graph::DependencyGraph;
pub use node::{
  Anchor, BRANCH_OUTPUT, DATA_INPUT, DEFAULT_OUTPUT, FOR_COMMAND, INPUT_COMMAND, InputSource,
  Iteration, Node, NodeInput, PASS_THROUGH_COMMAND, SWITCH_COMMAND, is_builtin_command,
};
