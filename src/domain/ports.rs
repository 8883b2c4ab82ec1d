use super::intent::{PaymentIntent, SetupIntent};
use super::params::{ConfirmPaymentParams, ConfirmSetupParams};
use super::telemetry::TelemetryEvent;
use crate::error::{PresentationError, TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// The processor API. Implementations own request signing and HTTP.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn confirm_payment_intent(
        &self,
        intent_id: &str,
        params: &ConfirmPaymentParams,
        expand: &[&str],
    ) -> Result<PaymentIntent, TransportError>;

    async fn confirm_setup_intent(
        &self,
        intent_id: &str,
        params: &ConfirmSetupParams,
        expand: &[&str],
    ) -> Result<SetupIntent, TransportError>;

    async fn retrieve_payment_intent(
        &self,
        client_secret: &str,
        expand: &[&str],
        timeout: Option<Duration>,
    ) -> Result<PaymentIntent, TransportError>;

    async fn retrieve_setup_intent(
        &self,
        client_secret: &str,
        expand: &[&str],
        timeout: Option<Duration>,
    ) -> Result<SetupIntent, TransportError>;

    async fn refresh_payment_intent(
        &self,
        client_secret: &str,
        timeout: Option<Duration>,
    ) -> Result<PaymentIntent, TransportError>;

    async fn refresh_setup_intent(
        &self,
        client_secret: &str,
        timeout: Option<Duration>,
    ) -> Result<SetupIntent, TransportError>;

    async fn cancel_challenge(
        &self,
        source_id: &str,
        publishable_key: Option<&str>,
    ) -> Result<bool, TransportError>;

    /// Tells the processor the challenge UI is finished. Idempotent.
    async fn complete_challenge(
        &self,
        source_id: &str,
        publishable_key: Option<&str>,
    ) -> Result<bool, TransportError>;
}

/// Platform surface for showing authentication UI. Every method reports whether
/// the *presentation* worked, never whether the customer authenticated.
#[async_trait]
pub trait PresentationHost: Send + Sync {
    /// Whether there is currently something to present from.
    fn can_present(&self) -> bool;

    /// Opens a deep link / universal link in its native app.
    async fn open_native_url(&self, url: &str) -> bool;

    async fn present_browser(&self, url: &str) -> Result<(), PresentationError>;

    async fn start_authentication_session(
        &self,
        url: &str,
        callback_scheme: &str,
    ) -> Result<(), PresentationError>;

    /// Dismisses whatever this host presented for the current run.
    async fn dismiss(&self);
}

/// Input for the external 3DS2 challenge component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRequest {
    pub intent_id: String,
    pub source_id: String,
    pub directory_server_name: String,
    pub server_transaction_id: String,
    pub publishable_key: Option<String>,
    pub livemode: bool,
}

/// The single event a challenge invocation finishes with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChallengeEvent {
    Completed { transaction_status: String },
    UserCanceled,
    TimedOut,
    ProtocolError { code: String, description: String },
    RuntimeError { message: String },
}

impl ChallengeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::UserCanceled => "user_canceled",
            Self::TimedOut => "timed_out",
            Self::ProtocolError { .. } => "protocol_error",
            Self::RuntimeError { .. } => "runtime_error",
        }
    }
}

#[async_trait]
pub trait ChallengeComponent: Send + Sync {
    async fn run_challenge(&self, request: ChallengeRequest) -> ChallengeEvent;
}

/// Fire-and-forget analytics. Implementations must not block.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Time source and timer used for polling back-off and retries.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

pub type TransportRef = Arc<dyn Transport>;
pub type PresentationHostRef = Arc<dyn PresentationHost>;
pub type ChallengeComponentRef = Arc<dyn ChallengeComponent>;
pub type TelemetrySinkRef = Arc<dyn TelemetrySink>;
pub type ClockRef = Arc<dyn Clock>;
