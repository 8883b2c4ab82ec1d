use serde::{Deserialize, Serialize};

/// Processor instruction describing what must happen before the intent can
/// settle. The wire format is `{"type": "<kind>", "<kind>": { ... }}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextAction {
    RedirectToUrl {
        redirect_to_url: RedirectToUrl,
    },
    UseStripeSdk {
        use_stripe_sdk: SdkAction,
    },
    AlipayHandleRedirect {
        alipay_handle_redirect: AppRedirect,
    },
    CashappHandleRedirectOrDisplayQrCode {
        cashapp_handle_redirect_or_display_qr_code: MobileAuthRedirect,
    },
    SwishHandleRedirectOrDisplayQrCode {
        swish_handle_redirect_or_display_qr_code: MobileAuthRedirect,
    },
    WechatPayRedirectToIosApp {
        wechat_pay_redirect_to_ios_app: NativeAppRedirect,
    },
    PaynowDisplayQrCode {
        paynow_display_qr_code: HostedInstructions,
    },
    PromptpayDisplayQrCode {
        promptpay_display_qr_code: HostedInstructions,
    },
    OxxoDisplayDetails,
    BoletoDisplayDetails,
    KonbiniDisplayDetails,
    MultibancoDisplayDetails,
    DisplayBankTransferInstructions,
    VerifyWithMicrodeposits,
    UpiAwaitNotification,
    BlikAuthorize,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectToUrl {
    pub url: String,
    #[serde(default)]
    pub return_url: Option<String>,
}

impl RedirectToUrl {
    /// The 3DS source id the processor embeds as the `source` query parameter of
    /// card authentication redirects.
    pub fn three_ds_source(&self) -> Option<&str> {
        let (_, query) = self.url.split_once('?')?;
        let query = query.split('#').next().unwrap_or(query);
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, value)| *key == "source" && value.starts_with("src_"))
            .map(|(_, value)| value)
    }
}

/// Work delegated to the native SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SdkAction {
    #[serde(rename = "stripe_3ds2_fingerprint")]
    ThreeDs2Fingerprint(ThreeDs2Fingerprint),
    ThreeDSecureRedirect {
        stripe_js: String,
        #[serde(default)]
        source: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDs2Fingerprint {
    pub three_d_secure_2_source: String,
    #[serde(default)]
    pub directory_server_name: String,
    #[serde(default)]
    pub server_transaction_id: String,
    #[serde(default)]
    pub publishable_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRedirect {
    #[serde(default)]
    pub native_url: Option<String>,
    pub url: String,
    #[serde(default)]
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileAuthRedirect {
    pub mobile_auth_url: String,
    #[serde(default)]
    pub hosted_instructions_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeAppRedirect {
    pub native_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedInstructions {
    pub hosted_instructions_url: String,
}

/// A presentable target resolved from a next action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget<'a> {
    /// A web URL, with an optional native deep link to try first.
    Web {
        url: &'a str,
        native_url: Option<&'a str>,
    },
    /// A deep link with no web fallback.
    NativeOnly { native_url: &'a str },
}

impl NextAction {
    /// Out-of-band kinds: the customer completes them elsewhere, so there is
    /// nothing left for the client to drive.
    pub fn is_voucher(&self) -> bool {
        matches!(
            self,
            Self::OxxoDisplayDetails
                | Self::BoletoDisplayDetails
                | Self::KonbiniDisplayDetails
                | Self::MultibancoDisplayDetails
                | Self::DisplayBankTransferInstructions
                | Self::VerifyWithMicrodeposits
                | Self::UpiAwaitNotification
                | Self::BlikAuthorize
        )
    }

    /// Native SDK delegation that is not a redirect in disguise.
    pub fn is_native_sdk_delegation(&self) -> bool {
        matches!(
            self,
            Self::UseStripeSdk {
                use_stripe_sdk: SdkAction::ThreeDs2Fingerprint(_) | SdkAction::Unknown
            }
        )
    }

    /// Identifier used to cancel or complete an authentication challenge.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::UseStripeSdk { use_stripe_sdk } => match use_stripe_sdk {
                SdkAction::ThreeDs2Fingerprint(fp) => Some(fp.three_d_secure_2_source.as_str()),
                SdkAction::ThreeDSecureRedirect { source, .. } => source.as_deref(),
                SdkAction::Unknown => None,
            },
            Self::RedirectToUrl { redirect_to_url } => redirect_to_url.three_ds_source(),
            _ => None,
        }
    }

    pub fn publishable_key_override(&self) -> Option<&str> {
        match self {
            Self::UseStripeSdk {
                use_stripe_sdk: SdkAction::ThreeDs2Fingerprint(fp),
            } => fp.publishable_key.as_deref(),
            _ => None,
        }
    }

    pub fn return_url(&self) -> Option<&str> {
        match self {
            Self::RedirectToUrl { redirect_to_url } => redirect_to_url.return_url.as_deref(),
            Self::AlipayHandleRedirect {
                alipay_handle_redirect,
            } => alipay_handle_redirect.return_url.as_deref(),
            _ => None,
        }
    }

    /// Where a redirect-style action sends the customer, if it is one.
    pub fn redirect_target(&self) -> Option<RedirectTarget<'_>> {
        let target = match self {
            Self::RedirectToUrl { redirect_to_url } => RedirectTarget::Web {
                url: &redirect_to_url.url,
                native_url: None,
            },
            Self::UseStripeSdk {
                use_stripe_sdk: SdkAction::ThreeDSecureRedirect { stripe_js, .. },
            } => RedirectTarget::Web {
                url: stripe_js,
                native_url: None,
            },
            Self::AlipayHandleRedirect {
                alipay_handle_redirect,
            } => RedirectTarget::Web {
                url: &alipay_handle_redirect.url,
                native_url: alipay_handle_redirect.native_url.as_deref(),
            },
            Self::CashappHandleRedirectOrDisplayQrCode {
                cashapp_handle_redirect_or_display_qr_code: redirect,
            }
            | Self::SwishHandleRedirectOrDisplayQrCode {
                swish_handle_redirect_or_display_qr_code: redirect,
            } => RedirectTarget::Web {
                url: redirect
                    .hosted_instructions_url
                    .as_deref()
                    .unwrap_or(redirect.mobile_auth_url.as_str()),
                native_url: Some(redirect.mobile_auth_url.as_str()),
            },
            Self::WechatPayRedirectToIosApp {
                wechat_pay_redirect_to_ios_app,
            } => RedirectTarget::NativeOnly {
                native_url: &wechat_pay_redirect_to_ios_app.native_url,
            },
            Self::PaynowDisplayQrCode {
                paynow_display_qr_code: hosted,
            }
            | Self::PromptpayDisplayQrCode {
                promptpay_display_qr_code: hosted,
            } => RedirectTarget::Web {
                url: &hosted.hosted_instructions_url,
                native_url: None,
            },
            _ => return None,
        };
        Some(target)
    }

    /// Wire name of the action, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RedirectToUrl { .. } => "redirect_to_url",
            Self::UseStripeSdk { .. } => "use_stripe_sdk",
            Self::AlipayHandleRedirect { .. } => "alipay_handle_redirect",
            Self::CashappHandleRedirectOrDisplayQrCode { .. } => {
                "cashapp_handle_redirect_or_display_qr_code"
            }
            Self::SwishHandleRedirectOrDisplayQrCode { .. } => {
                "swish_handle_redirect_or_display_qr_code"
            }
            Self::WechatPayRedirectToIosApp { .. } => "wechat_pay_redirect_to_ios_app",
            Self::PaynowDisplayQrCode { .. } => "paynow_display_qr_code",
            Self::PromptpayDisplayQrCode { .. } => "promptpay_display_qr_code",
            Self::OxxoDisplayDetails => "oxxo_display_details",
            Self::BoletoDisplayDetails => "boleto_display_details",
            Self::KonbiniDisplayDetails => "konbini_display_details",
            Self::MultibancoDisplayDetails => "multibanco_display_details",
            Self::DisplayBankTransferInstructions => "display_bank_transfer_instructions",
            Self::VerifyWithMicrodeposits => "verify_with_microdeposits",
            Self::UpiAwaitNotification => "upi_await_notification",
            Self::BlikAuthorize => "blik_authorize",
            Self::Unknown => "unknown",
        }
    }
}
