use crate::error::ConfirmError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Succeeded,
    Canceled,
    Failed,
}

impl TerminalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a confirmation or next-action run finished with: the terminal status,
/// the last snapshot the run saw, and the error for failed runs.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome<I> {
    pub status: TerminalStatus,
    pub intent: Option<I>,
    pub error: Option<ConfirmError>,
}

impl<I> HandlerOutcome<I> {
    pub fn succeeded(intent: I) -> Self {
        Self {
            status: TerminalStatus::Succeeded,
            intent: Some(intent),
            error: None,
        }
    }

    pub fn canceled(intent: Option<I>) -> Self {
        Self {
            status: TerminalStatus::Canceled,
            intent,
            error: None,
        }
    }

    pub fn failed(intent: Option<I>, error: ConfirmError) -> Self {
        Self {
            status: TerminalStatus::Failed,
            intent,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TerminalStatus::Succeeded
    }
}
