//! The polling trigger.
//!
//! The trigger wraps the query task and runs it once per scheduler tick.
//! A tick is a single-shot `evaluate`: the external scheduler owns the
//! timer, retry and backoff; the trigger holds no durable state beyond
//! its static configuration.

use std::time::Duration;

use hibiscus_datastore::Store;
use hibiscus_query::{Query, QueryConfig, Renderer};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::types::{EventSink, TriggerError, TriggerEvent};

/// Configuration for a polling trigger: the query surface plus the poll
/// interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
  /// The query to run each tick.
  #[serde(flatten)]
  pub query: QueryConfig,

  /// Poll interval in seconds. Must be positive; defaults to 60.
  #[serde(default = "default_interval_secs")]
  pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
  60
}

/// A trigger that polls a document store and fires a workflow-start
/// event when the query returns rows.
///
/// Between ticks the trigger is idle; each tick builds a fresh query
/// from the configuration (so templated values may change between
/// ticks), evaluates it, and either emits exactly one event or nothing.
pub struct PollingTrigger {
  flow_id: String,
  trigger_id: String,
  config: TriggerConfig,
}

impl PollingTrigger {
  /// Create a polling trigger for the given flow and trigger ids.
  pub fn new(
    flow_id: impl Into<String>,
    trigger_id: impl Into<String>,
    config: TriggerConfig,
  ) -> Result<Self, TriggerError> {
    if config.interval_secs == 0 {
      return Err(TriggerError::InvalidConfig(
        "poll interval must be positive".to_string(),
      ));
    }
    Ok(Self {
      flow_id: flow_id.into(),
      trigger_id: trigger_id.into(),
      config,
    })
  }

  /// The configured poll interval, for the external scheduler.
  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.config.interval_secs)
  }

  /// Evaluate the trigger once.
  ///
  /// Returns `Ok(None)` when the query yields no rows (an empty result
  /// is "nothing new", not an error) and exactly one event otherwise.
  #[instrument(
    name = "trigger_evaluate",
    skip_all,
    fields(flow_id = %self.flow_id, trigger_id = %self.trigger_id)
  )]
  pub async fn evaluate(
    &self,
    renderer: &Renderer,
    store: &dyn Store,
    artifacts: &dyn hibiscus_artifact::Store,
  ) -> Result<Option<TriggerEvent>, TriggerError> {
    let query = Query::new(self.config.query.clone());
    let output = query.run(renderer, store, artifacts).await?;

    debug!(row_count = output.size, "found rows");

    if output.size == 0 {
      return Ok(None);
    }

    Ok(Some(TriggerEvent {
      event_id: uuid::Uuid::new_v4().to_string(),
      flow_id: self.flow_id.clone(),
      trigger_id: self.trigger_id.clone(),
      payload: serde_json::to_value(&output)?,
      timestamp: chrono::Utc::now(),
    }))
  }

  /// One scheduler-driven tick: evaluate, then dispatch any event.
  ///
  /// Returns whether an event was emitted. Errors are logged and
  /// propagated; the trigger stays eligible for its next scheduled
  /// tick.
  #[instrument(
    name = "trigger_tick",
    skip_all,
    fields(flow_id = %self.flow_id, trigger_id = %self.trigger_id)
  )]
  pub async fn tick(
    &self,
    renderer: &Renderer,
    store: &dyn Store,
    artifacts: &dyn hibiscus_artifact::Store,
    events: &dyn EventSink,
  ) -> Result<bool, TriggerError> {
    match self.evaluate(renderer, store, artifacts).await {
      Ok(Some(event)) => {
        info!(event_id = %event.event_id, "workflow start event emitted");
        events.dispatch(event).await?;
        Ok(true)
      }
      Ok(None) => {
        debug!("no rows, no event");
        Ok(false)
      }
      Err(e) => {
        error!(error = %e, "trigger tick failed");
        Err(e)
      }
    }
  }
}
