//! Node status events and sinks for observability.
//!
//! The runner reports every node's lifecycle to a [`StatusSink`]. Consumers
//! use the stream to render a live trace, persist progress, or (as
//! `exec_flow` does) wait for the output node.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marigold_command::Outputs;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
  Running,
  Success,
  Failed,
  Unreachable,
}

/// One status report for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
  pub node_id: String,
  pub state: NodeState,
  /// Outputs, set on success.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub outputs: Option<Outputs>,
  /// Error message, set on failure.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub started_at: DateTime<Utc>,
  /// Unset while running.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ended_at: Option<DateTime<Utc>>,
}

impl NodeStatus {
  pub fn running(node_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
    Self {
      node_id: node_id.into(),
      state: NodeState::Running,
      outputs: None,
      error: None,
      started_at,
      ended_at: None,
    }
  }

  pub fn success(node_id: impl Into<String>, outputs: Outputs, started_at: DateTime<Utc>) -> Self {
    Self {
      node_id: node_id.into(),
      state: NodeState::Success,
      outputs: Some(outputs),
      error: None,
      started_at,
      ended_at: Some(Utc::now()),
    }
  }

  pub fn failed(node_id: impl Into<String>, error: String, started_at: DateTime<Utc>) -> Self {
    Self {
      node_id: node_id.into(),
      state: NodeState::Failed,
      outputs: None,
      error: Some(error),
      started_at,
      ended_at: Some(Utc::now()),
    }
  }

  pub fn unreachable(node_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
    Self {
      node_id: node_id.into(),
      state: NodeState::Unreachable,
      outputs: None,
      error: None,
      started_at,
      ended_at: Some(Utc::now()),
    }
  }
}

/// Receiver of node status events.
///
/// `report` may wait (e.g. on a full channel); the runner awaits it inline.
#[async_trait]
pub trait StatusSink: Send + Sync {
  async fn report(&self, status: NodeStatus);
}

/// A sink that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl StatusSink for NoopSink {
  async fn report(&self, _status: NodeStatus) {}
}

/// A sink that forwards events to a bounded channel.
///
/// Sending waits while the channel is full, so the consumer must keep
/// draining. The stream closes when the sink is dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
  sender: mpsc::Sender<NodeStatus>,
}

impl ChannelSink {
  pub fn new(sender: mpsc::Sender<NodeStatus>) -> Self {
    Self { sender }
  }
}

#[async_trait]
impl StatusSink for ChannelSink {
  async fn report(&self, status: NodeStatus) {
    // Receiver may have been dropped
    let _ = self.sender.send(status).await;
  }
}

/// Logs every event before handing it to the wrapped sink.
pub(crate) struct StatusReporter<'a> {
  sink: &'a dyn StatusSink,
}

impl<'a> StatusReporter<'a> {
  pub(crate) fn new(sink: &'a dyn StatusSink) -> Self {
    Self { sink }
  }

  pub(crate) async fn report(&self, status: NodeStatus) {
    debug!(
      node_id = %status.node_id,
      state = ?status.state,
      error = status.error.as_deref().unwrap_or(""),
      "node_status"
    );
    self.sink.report(status).await;
  }
}
