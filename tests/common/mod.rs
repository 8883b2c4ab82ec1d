#![allow(dead_code)]

use intent_handler::application::{PaymentHandler, PresentationContext, ResumeTrigger};
use intent_handler::config::HandlerConfig;
use intent_handler::domain::intent::{PaymentIntent, SetupIntent};
use intent_handler::infrastructure::in_memory::{
    HeadlessHost, ScriptedChallengeComponent, ScriptedTransport,
};
use intent_handler::infrastructure::telemetry::RecordingTelemetry;
use serde_json::{Value, json};
use std::sync::Arc;

pub const PAYMENT_SECRET: &str = "pi_1_secret_abc";
pub const SETUP_SECRET: &str = "seti_1_secret_abc";
pub const RETURN_URL: &str = "myapp://stripe-redirect";

/// A payment intent body as the processor would send it.
pub fn payment_json(status: &str, method: Option<&str>, next_action: Option<Value>) -> Value {
    let mut body = json!({
        "id": "pi_1",
        "client_secret": PAYMENT_SECRET,
        "amount": 2000,
        "currency": "eur",
        "livemode": false,
        "status": status,
    });
    if let Some(method) = method {
        body["payment_method"] = json!({"id": "pm_1", "type": method, "livemode": false});
    }
    if let Some(next_action) = next_action {
        body["next_action"] = next_action;
    }
    body
}

pub fn payment_intent(status: &str, method: Option<&str>, next_action: Option<Value>) -> PaymentIntent {
    serde_json::from_value(payment_json(status, method, next_action)).unwrap()
}

pub fn setup_intent(status: &str, method: Option<&str>, next_action: Option<Value>) -> SetupIntent {
    let mut body = json!({
        "id": "seti_1",
        "client_secret": SETUP_SECRET,
        "livemode": false,
        "status": status,
        "usage": "off_session",
    });
    if let Some(method) = method {
        body["payment_method"] = json!({"id": "pm_1", "type": method});
    }
    if let Some(next_action) = next_action {
        body["next_action"] = next_action;
    }
    serde_json::from_value(body).unwrap()
}

pub fn card_redirect_action() -> Value {
    json!({
        "type": "redirect_to_url",
        "redirect_to_url": {
            "url": "https://hooks.example.com/3d_secure_2/authenticate?source=src_3ds&client_secret=x",
            "return_url": RETURN_URL
        }
    })
}

pub fn three_ds2_action(publishable_key: Option<&str>) -> Value {
    json!({
        "type": "use_stripe_sdk",
        "use_stripe_sdk": {
            "type": "stripe_3ds2_fingerprint",
            "three_d_secure_2_source": "src_3ds2",
            "directory_server_name": "visa",
            "server_transaction_id": "srv_tx_1",
            "publishable_key": publishable_key
        }
    })
}

pub fn swish_action() -> Value {
    json!({
        "type": "swish_handle_redirect_or_display_qr_code",
        "swish_handle_redirect_or_display_qr_code": {
            "mobile_auth_url": "swish://paymentrequest?token=abc",
            "hosted_instructions_url": "https://pay.example.com/swish/instructions"
        }
    })
}

pub fn cashapp_action() -> Value {
    json!({
        "type": "cashapp_handle_redirect_or_display_qr_code",
        "cashapp_handle_redirect_or_display_qr_code": {
            "mobile_auth_url": "cashme://cash.app/authorize",
            "hosted_instructions_url": "https://pay.example.com/cashapp"
        }
    })
}

pub fn paynow_action() -> Value {
    json!({
        "type": "paynow_display_qr_code",
        "paynow_display_qr_code": {
            "hosted_instructions_url": "https://pay.example.com/paynow"
        }
    })
}

pub fn paypal_action() -> Value {
    json!({
        "type": "redirect_to_url",
        "redirect_to_url": {"url": "https://pay.example.com/paypal"}
    })
}

pub fn wechat_action() -> Value {
    json!({
        "type": "wechat_pay_redirect_to_ios_app",
        "wechat_pay_redirect_to_ios_app": {"native_url": "weixin://app/pay"}
    })
}

/// A handler wired to scripted collaborators, plus handles to inspect them.
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub challenge: Arc<ScriptedChallengeComponent>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub host: Arc<HeadlessHost>,
    pub handler: Arc<PaymentHandler>,
    pub context: PresentationContext,
}

pub struct HarnessBuilder {
    transport: ScriptedTransport,
    challenge: ScriptedChallengeComponent,
    config: HandlerConfig,
    trigger: Option<ResumeTrigger>,
    can_present: bool,
    native_apps_installed: bool,
    return_url: Option<String>,
}

impl HarnessBuilder {
    pub fn new(transport: ScriptedTransport) -> Self {
        Self {
            transport,
            challenge: ScriptedChallengeComponent::default(),
            config: HandlerConfig::default(),
            trigger: None,
            can_present: true,
            native_apps_installed: true,
            return_url: Some(RETURN_URL.to_string()),
        }
    }

    pub fn challenge(mut self, challenge: ScriptedChallengeComponent) -> Self {
        self.challenge = challenge;
        self
    }

    pub fn config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn trigger(mut self, trigger: ResumeTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn can_present(mut self, can_present: bool) -> Self {
        self.can_present = can_present;
        self
    }

    pub fn native_apps_installed(mut self, installed: bool) -> Self {
        self.native_apps_installed = installed;
        self
    }

    pub fn return_url(mut self, return_url: Option<&str>) -> Self {
        self.return_url = return_url.map(str::to_string);
        self
    }

    pub fn build(self) -> Harness {
        let transport = Arc::new(self.transport);
        let challenge = Arc::new(self.challenge);
        let telemetry = Arc::new(RecordingTelemetry::new());

        let handler = PaymentHandler::new(transport.clone(), challenge.clone())
            .with_config(self.config)
            .with_telemetry(telemetry.clone());

        let mut host = HeadlessHost::new(handler.resume_handle())
            .with_can_present(self.can_present)
            .with_native_apps_installed(self.native_apps_installed);
        if let Some(trigger) = self.trigger {
            host = host.with_trigger(trigger);
        }
        let host = Arc::new(host);

        let mut context = PresentationContext::new(host.clone());
        if let Some(return_url) = self.return_url {
            context = context.with_return_url(return_url);
        }

        Harness {
            transport,
            challenge,
            telemetry,
            host,
            handler: Arc::new(handler),
            context,
        }
    }
}
