use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error type for trigger operations.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
  /// Invalid trigger configuration.
  #[error("invalid trigger configuration: {0}")]
  InvalidConfig(String),

  /// The query invocation failed this tick. The trigger performs no
  /// retry; it becomes eligible again at the next scheduled tick.
  #[error("trigger evaluation failed: {0}")]
  Evaluation(#[from] hibiscus_query::QueryError),

  /// The query output could not be encoded as an event payload.
  #[error("event payload encoding failed: {0}")]
  Payload(#[from] serde_json::Error),

  /// The event sink refused the workflow-start event.
  #[error("event dispatch failed: {0}")]
  Dispatch(String),
}

/// Event emitted by a trigger to start workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
  /// Unique identifier for this trigger event.
  pub event_id: String,

  /// The flow this event starts.
  pub flow_id: String,

  /// The trigger that emitted this event.
  pub trigger_id: String,

  /// Query output payload: `rows`/`row`/`uri`/`size` per the same
  /// fetch-mode contract as the query task.
  pub payload: serde_json::Value,

  /// When the event was emitted.
  pub timestamp: DateTime<Utc>,
}

/// External dispatcher for workflow-start events.
///
/// The dispatcher owns execution-id allocation, persistence and
/// delivery; the trigger only hands over completed events.
#[async_trait]
pub trait EventSink: Send + Sync {
  /// Deliver a workflow-start event.
  async fn dispatch(&self, event: TriggerEvent) -> Result<(), TriggerError>;
}
