use super::payment_method::PaymentMethodType;
use serde::{Deserialize, Serialize};

/// Inline payment method details sent with a confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodData {
    pub r#type: PaymentMethodType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_email: Option<String>,
}

/// Parameters for confirming a payment intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPaymentParams {
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_data: Option<PaymentMethodData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_future_usage: Option<String>,
    /// Lets the processor hand back `use_stripe_sdk` actions the native SDK can drive.
    #[serde(default)]
    pub use_stripe_sdk: bool,
}

impl ConfirmPaymentParams {
    pub fn new(client_secret: impl Into<String>) -> Self {
        Self {
            client_secret: client_secret.into(),
            use_stripe_sdk: true,
            ..Default::default()
        }
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }

    pub fn with_payment_method_data(mut self, data: PaymentMethodData) -> Self {
        self.payment_method_data = Some(data);
        self
    }

    pub fn with_return_url(mut self, return_url: impl Into<String>) -> Self {
        self.return_url = Some(return_url.into());
        self
    }
}

/// Parameters for confirming a setup intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmSetupParams {
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_data: Option<PaymentMethodData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(default)]
    pub use_stripe_sdk: bool,
}

impl ConfirmSetupParams {
    pub fn new(client_secret: impl Into<String>) -> Self {
        Self {
            client_secret: client_secret.into(),
            use_stripe_sdk: true,
            ..Default::default()
        }
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }

    pub fn with_return_url(mut self, return_url: impl Into<String>) -> Self {
        self.return_url = Some(return_url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_params_skip_empty_fields() {
        let params = ConfirmPaymentParams::new("pi_1_secret_a").with_payment_method("pm_card");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["client_secret"], "pi_1_secret_a");
        assert_eq!(json["payment_method"], "pm_card");
        assert_eq!(json["use_stripe_sdk"], true);
        assert!(json.get("return_url").is_none());
        assert!(json.get("payment_method_data").is_none());
    }

    #[test]
    fn test_payment_method_data_serialization() {
        let params = ConfirmSetupParams {
            payment_method_data: Some(PaymentMethodData {
                r#type: PaymentMethodType::SepaDebit,
                billing_email: Some("jenny@example.com".to_string()),
            }),
            ..ConfirmSetupParams::new("seti_1_secret_a")
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["payment_method_data"]["type"], "sepa_debit");
    }
}
