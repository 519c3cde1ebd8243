//! Marigold
//!
//! A workflow execution engine. Flows are graphs of nodes that invoke named
//! commands; the engine pulls each node's dependencies on demand, runs every
//! node at most once per run, and streams per-node status while it goes.
//!
//! The pieces live in separate crates and are re-exported here:
//! - [`graph`]: nodes, inputs, flows, validation
//! - [`command`]: the `Command` trait and registries
//! - [`engine`]: `FlowEngine`, status events, the `_switch` / `_for` primitives

pub use marigold_command as command;
pub use marigold_engine as engine;
pub use marigold_graph as graph;

pub use marigold_command::{Command, CommandContext, CommandError, CommandSet, FnCommand, Outputs};
pub use marigold_engine::{EngineConfig, ExecError, FlowEngine, NodeState, NodeStatus};
pub use marigold_graph::{Flow, Node};
