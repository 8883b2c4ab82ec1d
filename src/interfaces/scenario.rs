//! Scripted end-to-end runs driven from a JSON file.
//!
//! A scenario names the intent kind, the client secret and every processor
//! answer the run will see. [`run_scenario`] wires the scripted collaborators
//! into a [`PaymentHandler`] and reports how the run ended.

use crate::application::{
    IntentOrSecret, PaymentHandler, PresentationContext, ResumeTrigger,
};
use crate::config::HandlerConfig;
use crate::domain::intent::{ConfirmableIntent, IntentKind, IntentStatus, PaymentIntent, SetupIntent};
use crate::domain::outcome::{HandlerOutcome, TerminalStatus};
use crate::domain::params::{ConfirmPaymentParams, ConfirmSetupParams};
use crate::domain::ports::{ChallengeEvent, TelemetrySinkRef};
use crate::error::{HandlerError, Result, TransportError};
use crate::infrastructure::in_memory::{HeadlessHost, ScriptedChallengeComponent, ScriptedTransport};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entry {
    /// Confirm the intent, then drive whatever it needs.
    #[default]
    Confirm,
    /// Retrieve the intent by client secret and drive its next action.
    HandleNextAction,
}

/// A transport failure as written in a scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptedFailure {
    Http { status: u16, message: String },
    Network { message: String },
    Timeout,
}

impl From<ScriptedFailure> for TransportError {
    fn from(failure: ScriptedFailure) -> Self {
        match failure {
            ScriptedFailure::Http { status, message } => TransportError::http(status, message),
            ScriptedFailure::Network { message } => TransportError::Network(message),
            ScriptedFailure::Timeout => TransportError::Timeout,
        }
    }
}

/// One scripted processor answer: either `{"error": {...}}` or a resource body.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptedResponse {
    Failure { error: ScriptedFailure },
    Body(serde_json::Value),
}

impl ScriptedResponse {
    fn into_response<T: DeserializeOwned>(self) -> Result<std::result::Result<T, TransportError>> {
        match self {
            Self::Failure { error } => Ok(Err(error.into())),
            Self::Body(body) => Ok(Ok(serde_json::from_value(body)?)),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub client_secret: String,
    #[serde(default)]
    pub entry: Entry,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default = "default_true")]
    pub can_present: bool,
    #[serde(default = "default_true")]
    pub native_apps_installed: bool,
    #[serde(default)]
    pub confirm: Option<ScriptedResponse>,
    #[serde(default)]
    pub retrieve: Vec<ScriptedResponse>,
    #[serde(default)]
    pub challenge_completion: Vec<ScriptedResponse>,
    #[serde(default)]
    pub challenge_event: Option<ChallengeEvent>,
    #[serde(default)]
    pub resume_trigger: Option<ResumeTrigger>,
}

impl Scenario {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The intent kind, taken from the client secret prefix.
    pub fn intent_kind(&self) -> Result<IntentKind> {
        if self.client_secret.starts_with(IntentKind::Setup.id_prefix()) {
            Ok(IntentKind::Setup)
        } else if self.client_secret.starts_with(IntentKind::Payment.id_prefix()) {
            Ok(IntentKind::Payment)
        } else {
            Err(HandlerError::ConfigError(
                "scenario client_secret must start with pi_ or seti_".to_string(),
            ))
        }
    }
}

/// How a scenario run ended. Carries no customer-facing text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub intent_kind: IntentKind,
    pub status: TerminalStatus,
    pub intent_id: Option<String>,
    pub intent_status: Option<IntentStatus>,
    pub error_kind: Option<String>,
    pub log_message: Option<String>,
}

impl ScenarioReport {
    fn from_outcome<I: ConfirmableIntent>(outcome: &HandlerOutcome<I>) -> Self {
        Self {
            intent_kind: I::KIND,
            status: outcome.status,
            intent_id: outcome.intent.as_ref().map(|intent| intent.id().to_string()),
            intent_status: outcome.intent.as_ref().map(ConfirmableIntent::status),
            error_kind: outcome.error.as_ref().map(|error| error.kind.to_string()),
            log_message: outcome.error.as_ref().map(|error| error.log_message.clone()),
        }
    }
}

/// Runs `scenario` against scripted collaborators.
pub async fn run_scenario(
    scenario: Scenario,
    config: HandlerConfig,
    telemetry: TelemetrySinkRef,
) -> Result<ScenarioReport> {
    config.validate()?;
    match scenario.intent_kind()? {
        IntentKind::Payment => run_payment(scenario, config, telemetry).await,
        IntentKind::Setup => run_setup(scenario, config, telemetry).await,
    }
}

struct Harness {
    handler: PaymentHandler,
    context: PresentationContext,
}

fn harness(
    scenario: &Scenario,
    transport: ScriptedTransport,
    config: HandlerConfig,
    telemetry: TelemetrySinkRef,
) -> Result<Harness> {
    let mut transport = transport;
    for response in scenario.challenge_completion.iter().cloned() {
        transport = transport.with_complete_challenge(response.into_response()?);
    }
    let component = match &scenario.challenge_event {
        Some(event) => ScriptedChallengeComponent::new(event.clone()),
        None => ScriptedChallengeComponent::default(),
    };

    let handler = PaymentHandler::new(Arc::new(transport), Arc::new(component))
        .with_config(config)
        .with_telemetry(telemetry);

    let mut host = HeadlessHost::new(handler.resume_handle())
        .with_can_present(scenario.can_present)
        .with_native_apps_installed(scenario.native_apps_installed);
    if let Some(trigger) = &scenario.resume_trigger {
        host = host.with_trigger(trigger.clone());
    }
    let mut context = PresentationContext::new(Arc::new(host));
    if let Some(return_url) = &scenario.return_url {
        context = context.with_return_url(return_url.clone());
    }

    Ok(Harness { handler, context })
}

fn missing_confirm() -> HandlerError {
    HandlerError::ConfigError("scenario entry `confirm` needs a `confirm` response".to_string())
}

async fn run_payment(
    scenario: Scenario,
    config: HandlerConfig,
    telemetry: TelemetrySinkRef,
) -> Result<ScenarioReport> {
    let mut transport = ScriptedTransport::new();
    if let Some(confirm) = scenario.confirm.clone() {
        transport = transport.with_confirm_payment(confirm.into_response()?);
    }
    for response in scenario.retrieve.iter().cloned() {
        transport = transport.with_retrieve_payment(response.into_response()?);
    }
    let Harness { handler, context } = harness(&scenario, transport, config, telemetry)?;

    let outcome: HandlerOutcome<PaymentIntent> = match scenario.entry {
        Entry::Confirm => {
            if scenario.confirm.is_none() {
                return Err(missing_confirm());
            }
            let mut params = ConfirmPaymentParams::new(&scenario.client_secret);
            if let Some(payment_method) = &scenario.payment_method {
                params = params.with_payment_method(payment_method);
            }
            handler.confirm_payment(params, &context).await
        }
        Entry::HandleNextAction => {
            handler
                .handle_next_action(
                    IntentOrSecret::ClientSecret(scenario.client_secret.clone()),
                    &context,
                    None,
                )
                .await
        }
    };
    Ok(ScenarioReport::from_outcome(&outcome))
}

async fn run_setup(
    scenario: Scenario,
    config: HandlerConfig,
    telemetry: TelemetrySinkRef,
) -> Result<ScenarioReport> {
    let mut transport = ScriptedTransport::new();
    if let Some(confirm) = scenario.confirm.clone() {
        transport = transport.with_confirm_setup(confirm.into_response()?);
    }
    for response in scenario.retrieve.iter().cloned() {
        transport = transport.with_retrieve_setup(response.into_response()?);
    }
    let Harness { handler, context } = harness(&scenario, transport, config, telemetry)?;

    let outcome: HandlerOutcome<SetupIntent> = match scenario.entry {
        Entry::Confirm => {
            if scenario.confirm.is_none() {
                return Err(missing_confirm());
            }
            let mut params = ConfirmSetupParams::new(&scenario.client_secret);
            if let Some(payment_method) = &scenario.payment_method {
                params = params.with_payment_method(payment_method);
            }
            handler.confirm_setup(params, &context).await
        }
        Entry::HandleNextAction => {
            handler
                .handle_next_action(
                    IntentOrSecret::ClientSecret(scenario.client_secret.clone()),
                    &context,
                    None,
                )
                .await
        }
    };
    Ok(ScenarioReport::from_outcome(&outcome))
}
