//! Hibiscus Trigger
//!
//! The interval-polling query trigger for Hibiscus workflows. On each
//! scheduler tick the trigger runs its configured query once and
//! converts a non-empty result into a single workflow-start event whose
//! payload is the query output; an empty result produces nothing.
//!
//! Scheduling, retry and backoff live in the external scheduler; the
//! trigger exposes a single-shot [`PollingTrigger::evaluate`] and its
//! configured interval.

mod poll;
mod types;

pub use poll::{PollingTrigger, TriggerConfig};
pub use types::{EventSink, TriggerError, TriggerEvent};
