use super::next_action::NextAction;
use super::payment_method::{ExpandablePaymentMethod, PaymentMethodType};
use super::ports::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Fields the engine asks the processor to expand on every retrieval.
pub const EXPAND_PAYMENT_METHOD: &[&str] = &["payment_method"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Payment,
    Setup,
}

impl IntentKind {
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Payment => "pi_",
            Self::Setup => "seti_",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Setup => "setup",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status shared by both intent kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Unknown,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    RequiresCapture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Succeeded,
    Canceled,
    #[serde(other)]
    Unknown,
}

/// Setup intents never hold funds, so there is no capture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl From<PaymentIntentStatus> for IntentStatus {
    fn from(status: PaymentIntentStatus) -> Self {
        match status {
            PaymentIntentStatus::RequiresPaymentMethod => Self::RequiresPaymentMethod,
            PaymentIntentStatus::RequiresConfirmation => Self::RequiresConfirmation,
            PaymentIntentStatus::RequiresAction => Self::RequiresAction,
            PaymentIntentStatus::Processing => Self::Processing,
            PaymentIntentStatus::RequiresCapture => Self::RequiresCapture,
            PaymentIntentStatus::Succeeded => Self::Succeeded,
            PaymentIntentStatus::Canceled => Self::Canceled,
            PaymentIntentStatus::Unknown => Self::Unknown,
        }
    }
}

impl From<SetupIntentStatus> for IntentStatus {
    fn from(status: SetupIntentStatus) -> Self {
        match status {
            SetupIntentStatus::RequiresPaymentMethod => Self::RequiresPaymentMethod,
            SetupIntentStatus::RequiresConfirmation => Self::RequiresConfirmation,
            SetupIntentStatus::RequiresAction => Self::RequiresAction,
            SetupIntentStatus::Processing => Self::Processing,
            SetupIntentStatus::Succeeded => Self::Succeeded,
            SetupIntentStatus::Canceled => Self::Canceled,
            SetupIntentStatus::Unknown => Self::Unknown,
        }
    }
}

/// The processor's description of the most recent failure on an intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub decline_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub r#type: Option<String>,
}

impl LastError {
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self.code.as_deref(),
            Some("payment_intent_authentication_failure" | "setup_intent_authentication_failure")
        )
    }

    pub fn is_card_error(&self) -> bool {
        self.r#type.as_deref() == Some("card_error")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub livemode: bool,
    pub status: PaymentIntentStatus,
    #[serde(default)]
    pub next_action: Option<NextAction>,
    #[serde(default)]
    pub payment_method: Option<ExpandablePaymentMethod>,
    #[serde(default)]
    pub last_payment_error: Option<LastError>,
    #[serde(default)]
    pub is_redacted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupIntent {
    pub id: String,
    pub client_secret: String,
    #[serde(default)]
    pub livemode: bool,
    pub status: SetupIntentStatus,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub next_action: Option<NextAction>,
    #[serde(default)]
    pub payment_method: Option<ExpandablePaymentMethod>,
    #[serde(default)]
    pub last_setup_error: Option<LastError>,
    #[serde(default)]
    pub is_redacted: bool,
}

/// The shape the orchestration engine drives: anything with a status, a next
/// action and a payment method that can be re-fetched from the processor.
#[async_trait]
pub trait ConfirmableIntent: fmt::Debug + Clone + Send + Sync + 'static {
    const KIND: IntentKind;

    fn id(&self) -> &str;
    fn client_secret(&self) -> &str;
    fn livemode(&self) -> bool;
    fn status(&self) -> IntentStatus;
    fn next_action(&self) -> Option<&NextAction>;
    fn payment_method(&self) -> Option<&ExpandablePaymentMethod>;
    fn last_error(&self) -> Option<&LastError>;
    fn is_redacted(&self) -> bool;

    /// Full retrieval with the payment method expanded.
    async fn retrieve(
        transport: &dyn Transport,
        client_secret: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError>;

    /// Cheaper status refresh for methods that support it.
    async fn refresh(
        transport: &dyn Transport,
        client_secret: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError>;

    fn payment_method_type(&self) -> Option<PaymentMethodType> {
        self.payment_method()
            .and_then(ExpandablePaymentMethod::object)
            .map(|pm| pm.r#type)
    }

    /// Whether `processing` already counts as done for this intent.
    fn processing_is_success(&self) -> bool {
        self.payment_method_type()
            .is_some_and(PaymentMethodType::is_async_success)
    }

    /// A referenced payment method must come back as the expanded object.
    fn has_expanded_payment_method(&self) -> bool {
        !matches!(self.payment_method(), Some(ExpandablePaymentMethod::Id(_)))
    }
}

#[async_trait]
impl ConfirmableIntent for PaymentIntent {
    const KIND: IntentKind = IntentKind::Payment;

    fn id(&self) -> &str {
        &self.id
    }

    fn client_secret(&self) -> &str {
        &self.client_secret
    }

    fn livemode(&self) -> bool {
        self.livemode
    }

    fn status(&self) -> IntentStatus {
        self.status.into()
    }

    fn next_action(&self) -> Option<&NextAction> {
        self.next_action.as_ref()
    }

    fn payment_method(&self) -> Option<&ExpandablePaymentMethod> {
        self.payment_method.as_ref()
    }

    fn last_error(&self) -> Option<&LastError> {
        self.last_payment_error.as_ref()
    }

    fn is_redacted(&self) -> bool {
        self.is_redacted
    }

    async fn retrieve(
        transport: &dyn Transport,
        client_secret: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        transport
            .retrieve_payment_intent(client_secret, EXPAND_PAYMENT_METHOD, timeout)
            .await
    }

    async fn refresh(
        transport: &dyn Transport,
        client_secret: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        transport.refresh_payment_intent(client_secret, timeout).await
    }
}

#[async_trait]
impl ConfirmableIntent for SetupIntent {
    const KIND: IntentKind = IntentKind::Setup;

    fn id(&self) -> &str {
        &self.id
    }

    fn client_secret(&self) -> &str {
        &self.client_secret
    }

    fn livemode(&self) -> bool {
        self.livemode
    }

    fn status(&self) -> IntentStatus {
        self.status.into()
    }

    fn next_action(&self) -> Option<&NextAction> {
        self.next_action.as_ref()
    }

    fn payment_method(&self) -> Option<&ExpandablePaymentMethod> {
        self.payment_method.as_ref()
    }

    fn last_error(&self) -> Option<&LastError> {
        self.last_setup_error.as_ref()
    }

    fn is_redacted(&self) -> bool {
        self.is_redacted
    }

    async fn retrieve(
        transport: &dyn Transport,
        client_secret: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        transport
            .retrieve_setup_intent(client_secret, EXPAND_PAYMENT_METHOD, timeout)
            .await
    }

    async fn refresh(
        transport: &dyn Transport,
        client_secret: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        transport.refresh_setup_intent(client_secret, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_intent_json(status: &str) -> String {
        format!(
            r#"{{
                "id": "pi_1",
                "client_secret": "pi_1_secret_a",
                "amount": 1099,
                "currency": "eur",
                "status": "{status}",
                "payment_method": {{"id": "pm_1", "type": "sepa_debit"}}
            }}"#
        )
    }

    #[test]
    fn test_payment_intent_status_mapping() {
        let intent: PaymentIntent =
            serde_json::from_str(&payment_intent_json("requires_capture")).unwrap();
        assert_eq!(intent.status(), IntentStatus::RequiresCapture);
        assert_eq!(
            intent.payment_method_type(),
            Some(PaymentMethodType::SepaDebit)
        );
        assert!(intent.processing_is_success());
    }

    #[test]
    fn test_setup_intent_has_no_capture_state() {
        let json = r#"{
            "id": "seti_1",
            "client_secret": "seti_1_secret_a",
            "status": "requires_capture"
        }"#;
        let intent: SetupIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.status(), IntentStatus::Unknown);
        assert!(intent.payment_method_type().is_none());
        assert!(!intent.processing_is_success());
    }

    #[test]
    fn test_unexpanded_payment_method_is_detected() {
        let json = r#"{
            "id": "pi_1",
            "client_secret": "pi_1_secret_a",
            "status": "processing",
            "payment_method": "pm_123"
        }"#;
        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert!(!intent.has_expanded_payment_method());
        assert!(intent.payment_method_type().is_none());
    }

    #[test]
    fn test_last_error_flags() {
        let auth = LastError {
            code: Some("payment_intent_authentication_failure".to_string()),
            ..Default::default()
        };
        assert!(auth.is_authentication_failure());
        assert!(!auth.is_card_error());

        let card = LastError {
            code: Some("card_declined".to_string()),
            r#type: Some("card_error".to_string()),
            ..Default::default()
        };
        assert!(card.is_card_error());
        assert!(!card.is_authentication_failure());
    }
}
