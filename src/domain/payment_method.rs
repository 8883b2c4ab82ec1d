use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The payment method families the processor can attach to an intent.
///
/// Unrecognized types decode to `Unknown` so a new processor-side method never
/// breaks deserialization of an otherwise valid intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    Card,
    SepaDebit,
    AuBecsDebit,
    BacsDebit,
    UsBankAccount,
    Ideal,
    Bancontact,
    Eps,
    Giropay,
    P24,
    Sofort,
    Alipay,
    WechatPay,
    Cashapp,
    AmazonPay,
    RevolutPay,
    Swish,
    Twint,
    Paynow,
    Promptpay,
    Grabpay,
    Fpx,
    AfterpayClearpay,
    Affirm,
    Klarna,
    Paypal,
    Oxxo,
    Boleto,
    Konbini,
    Multibanco,
    Blik,
    Upi,
    Link,
    Mobilepay,
    #[serde(other)]
    Unknown,
}

/// How a redirect-style next action should be presented for a method type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectStrategy {
    /// Open the URL in the in-app browser.
    InAppBrowser,
    /// Try the native app first, fall back to the in-app browser.
    NativeAppPreferred,
    /// The native app is the only way to authenticate.
    NativeAppRequired,
    /// Use a system authentication session bound to the return URL scheme.
    AuthenticationSession,
}

impl PaymentMethodType {
    /// Methods whose funds move over days; `processing` is terminal for them.
    pub fn is_async_success(self) -> bool {
        matches!(
            self,
            Self::SepaDebit | Self::AuBecsDebit | Self::UsBankAccount | Self::BacsDebit
        )
    }

    /// Methods the processor can answer with the cheaper refresh endpoint.
    pub fn supports_refresh(self) -> bool {
        matches!(self, Self::Cashapp | Self::Twint)
    }

    /// Methods whose abandoned challenge must not be canceled server-side.
    pub fn skips_challenge_cancel(self) -> bool {
        matches!(self, Self::Paynow | Self::Promptpay)
    }

    pub fn redirect_strategy(self) -> RedirectStrategy {
        match self {
            Self::WechatPay => RedirectStrategy::NativeAppRequired,
            Self::Alipay | Self::Cashapp | Self::Swish | Self::Mobilepay => {
                RedirectStrategy::NativeAppPreferred
            }
            Self::Paypal
            | Self::Klarna
            | Self::Affirm
            | Self::AfterpayClearpay
            | Self::AmazonPay
            | Self::RevolutPay => RedirectStrategy::AuthenticationSession,
            _ => RedirectStrategy::InAppBrowser,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::SepaDebit => "sepa_debit",
            Self::AuBecsDebit => "au_becs_debit",
            Self::BacsDebit => "bacs_debit",
            Self::UsBankAccount => "us_bank_account",
            Self::Ideal => "ideal",
            Self::Bancontact => "bancontact",
            Self::Eps => "eps",
            Self::Giropay => "giropay",
            Self::P24 => "p24",
            Self::Sofort => "sofort",
            Self::Alipay => "alipay",
            Self::WechatPay => "wechat_pay",
            Self::Cashapp => "cashapp",
            Self::AmazonPay => "amazon_pay",
            Self::RevolutPay => "revolut_pay",
            Self::Swish => "swish",
            Self::Twint => "twint",
            Self::Paynow => "paynow",
            Self::Promptpay => "promptpay",
            Self::Grabpay => "grabpay",
            Self::Fpx => "fpx",
            Self::AfterpayClearpay => "afterpay_clearpay",
            Self::Affirm => "affirm",
            Self::Klarna => "klarna",
            Self::Paypal => "paypal",
            Self::Oxxo => "oxxo",
            Self::Boleto => "boleto",
            Self::Konbini => "konbini",
            Self::Multibanco => "multibanco",
            Self::Blik => "blik",
            Self::Upi => "upi",
            Self::Link => "link",
            Self::Mobilepay => "mobilepay",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PaymentMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-method polling budgets. Methods absent from the table get no budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodBudgetTable {
    #[serde(with = "crate::config::duration_secs")]
    pub card: Duration,
    #[serde(with = "crate::config::duration_secs")]
    pub redirect_wallets: Duration,
}

impl Default for MethodBudgetTable {
    fn default() -> Self {
        Self {
            card: Duration::from_secs(15),
            redirect_wallets: Duration::from_secs(5),
        }
    }
}

impl MethodBudgetTable {
    pub fn budget_for(&self, method: PaymentMethodType) -> Option<Duration> {
        match method {
            PaymentMethodType::AmazonPay
            | PaymentMethodType::RevolutPay
            | PaymentMethodType::Swish
            | PaymentMethodType::Twint
            | PaymentMethodType::P24 => Some(self.redirect_wallets),
            PaymentMethodType::Card => Some(self.card),
            _ => None,
        }
    }
}

/// An expanded payment method object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub r#type: PaymentMethodType,
    #[serde(default)]
    pub livemode: bool,
}

/// The `payment_method` field of an intent: either a bare id or the expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpandablePaymentMethod {
    Object(PaymentMethod),
    Id(String),
}

impl ExpandablePaymentMethod {
    pub fn id(&self) -> &str {
        match self {
            Self::Object(pm) => &pm.id,
            Self::Id(id) => id,
        }
    }

    pub fn object(&self) -> Option<&PaymentMethod> {
        match self {
            Self::Object(pm) => Some(pm),
            Self::Id(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_success_set() {
        let async_methods = [
            PaymentMethodType::SepaDebit,
            PaymentMethodType::AuBecsDebit,
            PaymentMethodType::UsBankAccount,
            PaymentMethodType::BacsDebit,
        ];
        for method in async_methods {
            assert!(method.is_async_success(), "{method} should be async");
        }
        assert!(!PaymentMethodType::Card.is_async_success());
        assert!(!PaymentMethodType::Swish.is_async_success());
        assert!(!PaymentMethodType::Unknown.is_async_success());
    }

    #[test]
    fn test_budget_table() {
        let table = MethodBudgetTable::default();
        assert_eq!(
            table.budget_for(PaymentMethodType::Card),
            Some(Duration::from_secs(15))
        );
        for method in [
            PaymentMethodType::AmazonPay,
            PaymentMethodType::RevolutPay,
            PaymentMethodType::Swish,
            PaymentMethodType::Twint,
            PaymentMethodType::P24,
        ] {
            assert_eq!(table.budget_for(method), Some(Duration::from_secs(5)));
        }
        assert_eq!(table.budget_for(PaymentMethodType::Ideal), None);
        assert_eq!(table.budget_for(PaymentMethodType::Unknown), None);
    }

    #[test]
    fn test_unknown_type_deserializes() {
        let pm: PaymentMethod =
            serde_json::from_str(r#"{"id":"pm_1","type":"some_future_method"}"#).unwrap();
        assert_eq!(pm.r#type, PaymentMethodType::Unknown);
    }

    #[test]
    fn test_expandable_payment_method() {
        let id: ExpandablePaymentMethod = serde_json::from_str(r#""pm_123""#).unwrap();
        assert_eq!(id.id(), "pm_123");
        assert!(id.object().is_none());

        let obj: ExpandablePaymentMethod =
            serde_json::from_str(r#"{"id":"pm_456","type":"card"}"#).unwrap();
        assert_eq!(obj.id(), "pm_456");
        assert_eq!(obj.object().unwrap().r#type, PaymentMethodType::Card);
    }

    #[test]
    fn test_display_matches_wire_name() {
        let json = serde_json::to_string(&PaymentMethodType::UsBankAccount).unwrap();
        assert_eq!(json, format!("\"{}\"", PaymentMethodType::UsBankAccount));
    }
}
