//! Fire-and-forget usage analytics.
//!
//! The engine reports named events to an [`AnalyticsSink`]. Sinks never
//! return errors and must not block; nothing in the engine depends on an
//! event being delivered.

use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Event parameters.
pub type EventParams = Map<String, Value>;

/// Receives analytics events.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &str, params: EventParams);
}

/// Build event parameters from a `json!` object. Non-objects yield no params.
pub fn params(value: Value) -> EventParams {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn track(&self, _event: &str, _params: EventParams) {}
}

/// Writes events to the debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn track(&self, event: &str, params: EventParams) {
        let params = Value::Object(params).to_string();
        debug!(target: "analytics", event, %params);
    }
}

/// A recorded event.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEvent {
    pub name: String,
    pub params: EventParams,
}

/// Keeps every event in memory, for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TrackedEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in the order they were tracked.
    pub fn events(&self) -> Vec<TrackedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of all events in order.
    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }

    /// How many times `name` was tracked.
    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name == name).count()
    }

    /// The most recent event called `name`.
    pub fn last(&self, name: &str) -> Option<TrackedEvent> {
        self.events().into_iter().rev().find(|e| e.name == name)
    }
}

impl AnalyticsSink for RecordingSink {
    fn track(&self, event: &str, params: EventParams) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TrackedEvent {
                name: event.to_string(),
                params,
            });
    }
}
