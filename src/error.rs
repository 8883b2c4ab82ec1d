use std::fmt;
use thiserror::Error;

/// Crate-level errors for configuration, scenario loading and export.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T, E = HandlerError> = std::result::Result<T, E>;

/// Failures reported by the processor transport.
///
/// Messages carried here are logging safe: they describe the request, never the
/// customer or their payment details.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("processor returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("malformed response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// True for 400-class responses.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Http { status, .. } if (400..500).contains(status))
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Failures opening authentication UI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresentationError {
    #[error("no view is available to present from")]
    NoPresenter,
    #[error("presentation failed: {0}")]
    Failed(String),
}

/// Terminal error taxonomy. The kind drives retry policy; messages are attached
/// separately by [`ConfirmError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    NotAuthenticated,
    TimedOut,
    UnexpectedIntentStatus,
    UnsupportedAuthentication,
    RequiredAppUnavailable,
    RequiresPaymentMethodBeforeUse,
    ConcurrentActionRejected,
    RequiresPresentableContext,
    MissingReturnUrl,
    ExternalChallengeComponentError,
    PaymentDeclined { code: Option<String> },
    InvalidClientSecretFormat,
    Unexpected,
}

impl ErrorKind {
    /// Short stable identifier used in logs and telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::TimedOut => "timed_out",
            Self::UnexpectedIntentStatus => "unexpected_intent_status",
            Self::UnsupportedAuthentication => "unsupported_authentication",
            Self::RequiredAppUnavailable => "required_app_unavailable",
            Self::RequiresPaymentMethodBeforeUse => "requires_payment_method_before_use",
            Self::ConcurrentActionRejected => "concurrent_action_rejected",
            Self::RequiresPresentableContext => "requires_presentable_context",
            Self::MissingReturnUrl => "missing_return_url",
            Self::ExternalChallengeComponentError => "external_challenge_component_error",
            Self::PaymentDeclined { .. } => "payment_declined",
            Self::InvalidClientSecretFormat => "invalid_client_secret_format",
            Self::Unexpected => "unexpected",
        }
    }

    /// Caller misuse; these fail before any network traffic and are never retried.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentActionRejected
                | Self::RequiresPresentableContext
                | Self::InvalidClientSecretFormat
                | Self::MissingReturnUrl
                | Self::RequiresPaymentMethodBeforeUse
        )
    }

    /// Default customer-facing message for the kind.
    pub fn default_user_message(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => {
                "We are unable to authenticate your payment method. Please choose a different payment method and try again."
            }
            Self::TimedOut => "Timed out authenticating your payment method -- try again.",
            Self::PaymentDeclined { .. } => "Your payment method was declined.",
            Self::RequiredAppUnavailable => {
                "The app required to complete this payment is not installed."
            }
            _ => "There was an unexpected error -- try again in a few seconds.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PaymentDeclined { code: Some(code) } => write!(f, "payment_declined({code})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A terminal error delivered with a failed or rejected outcome.
///
/// `user_message` may be shown to the customer. `log_message` is the only text
/// that reaches logs and telemetry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {log_message}")]
pub struct ConfirmError {
    pub kind: ErrorKind,
    pub user_message: String,
    pub log_message: String,
}

impl ConfirmError {
    pub fn new(kind: ErrorKind, log_message: impl Into<String>) -> Self {
        let user_message = kind.default_user_message().to_string();
        Self {
            kind,
            user_message,
            log_message: log_message.into(),
        }
    }

    pub fn with_user_message(mut self, user_message: impl Into<String>) -> Self {
        self.user_message = user_message.into();
        self
    }

    pub fn unexpected(log_message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, log_message)
    }

    pub fn from_transport(err: &TransportError) -> Self {
        let kind = match err {
            TransportError::Timeout => ErrorKind::TimedOut,
            _ => ErrorKind::Unexpected,
        };
        Self::new(kind, err.to_string())
    }
}
