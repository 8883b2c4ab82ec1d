use super::intent::IntentKind;
use super::outcome::TerminalStatus;
use super::payment_method::PaymentMethodType;
use crate::error::ConfirmError;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    AttemptStarted,
    AttemptFinished,
    NextActionPresented,
    PollScheduled,
    ChallengeCompletionMarked,
    ChallengeCanceled,
}

/// One analytics record. Flat so it can be exported row by row.
///
/// Only logging-safe text is allowed in here; customer-facing error messages
/// never are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryEvent {
    pub event: EventName,
    pub intent_kind: IntentKind,
    pub intent_id: Option<String>,
    pub payment_method_type: Option<PaymentMethodType>,
    pub detail: Option<String>,
    pub status: Option<TerminalStatus>,
    pub error_kind: Option<String>,
    pub log_message: Option<String>,
    pub duration_ms: Option<u64>,
}

impl TelemetryEvent {
    pub fn new(event: EventName, intent_kind: IntentKind) -> Self {
        Self {
            event,
            intent_kind,
            intent_id: None,
            payment_method_type: None,
            detail: None,
            status: None,
            error_kind: None,
            log_message: None,
            duration_ms: None,
        }
    }

    pub fn intent_id(mut self, id: impl Into<String>) -> Self {
        self.intent_id = Some(id.into());
        self
    }

    pub fn payment_method_type(mut self, method: Option<PaymentMethodType>) -> Self {
        self.payment_method_type = method;
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn finished(mut self, status: TerminalStatus, duration: Duration) -> Self {
        self.status = Some(status);
        self.duration_ms = Some(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn error(mut self, error: &ConfirmError) -> Self {
        self.error_kind = Some(error.kind.to_string());
        self.log_message = Some(error.log_message.clone());
        self
    }
}
