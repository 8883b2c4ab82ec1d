use crate::domain::ports::TelemetrySink;
use crate::domain::telemetry::{EventName, TelemetryEvent};
use std::sync::{Mutex, PoisonError};

/// Forwards telemetry to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        tracing::debug!(
            target: "intent_handler::telemetry",
            event = ?event.event,
            intent_kind = %event.intent_kind,
            intent_id = event.intent_id.as_deref().unwrap_or(""),
            payment_method_type = ?event.payment_method_type,
            detail = event.detail.as_deref().unwrap_or(""),
            status = ?event.status,
            error_kind = event.error_kind.as_deref().unwrap_or(""),
            duration_ms = event.duration_ms,
            "telemetry"
        );
    }
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn names(&self) -> Vec<EventName> {
        self.events().into_iter().map(|event| event.event).collect()
    }

    pub fn count(&self, name: EventName) -> usize {
        self.names().into_iter().filter(|n| *n == name).count()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
