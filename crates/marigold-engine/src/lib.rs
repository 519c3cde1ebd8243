//! Marigold Engine
//!
//! Executes a [`Flow`](marigold_graph::Flow) by recursive lazy pull: each
//! root node is asked for its outputs, which makes it pull its anchored
//! dependencies first, and so on down the graph. Nothing is scheduled ahead
//! of time.
//!
//! ## Architecture
//!
//! - [`FlowEngine`] validates the flow, assigns an execution id, and drives
//!   the root nodes in id order from the calling task
//! - A per-run runner resolves inputs and invokes commands from the
//!   [`CommandRegistry`](marigold_command::CommandRegistry)
//! - [`ExecutionCache`] makes every node run at most once per run, unless it
//!   executes inside an [`Inject`] scope
//! - `_switch` evaluates its conditions with a [`ConditionEvaluator`] and pulls
//!   only the selected branch; `_for` re-runs its target per element yielded
//!   by an [`IterationAdapter`]
//! - Each node reports [`NodeStatus`] events to a [`StatusSink`]
//!
//! A node that is never meant to run (a command returned
//! [`CommandError::Unreachable`](marigold_command::CommandError::Unreachable))
//! is reported as unreachable, not failed. Required consumers become
//! unreachable too; optional consumers read `null`.
//!
//! ```ignore
//! let engine = FlowEngine::new(commands);
//! let output = engine.exec_flow(CancellationToken::new(), &flow, params).await?;
//! ```

mod cache;
mod config;
mod engine;
mod error;
mod events;
mod expression;
mod inject;
mod iteration;
mod runner;

pub use cache::{ExecutionCache, NodeOutcome};
pub use config::EngineConfig;
pub use engine::FlowEngine;
pub use error::ExecError;
pub use events::{ChannelSink, NodeState, NodeStatus, NoopSink, StatusSink};
pub use expression::{ConditionError, ConditionEvaluator, JinjaConditions, truthy};
pub use inject::Inject;
pub use iteration::{IterationAdapter, IterationError, JsonIteration};
