use crate::application::resume::{ResumeHandle, ResumeTrigger};
use crate::domain::intent::{PaymentIntent, SetupIntent};
use crate::domain::params::{ConfirmPaymentParams, ConfirmSetupParams};
use crate::domain::ports::{ChallengeComponent, ChallengeEvent, ChallengeRequest, PresentationHost, Transport};
use crate::error::{PresentationError, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

type Response<T> = Result<T, TransportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    ConfirmPayment,
    ConfirmSetup,
    RetrievePayment,
    RetrieveSetup,
    RefreshPayment,
    RefreshSetup,
    CancelChallenge,
    CompleteChallenge,
}

impl CallKind {
    pub fn is_retrieval(self) -> bool {
        matches!(
            self,
            Self::RetrievePayment | Self::RetrieveSetup | Self::RefreshPayment | Self::RefreshSetup
        )
    }
}

/// One request seen by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    /// Intent id, client secret or challenge source, depending on the call.
    pub target: String,
    pub expand: Vec<String>,
    pub timeout: Option<Duration>,
    pub publishable_key: Option<String>,
    pub at: Instant,
}

#[derive(Default)]
struct Script {
    confirm_payment: VecDeque<Response<PaymentIntent>>,
    confirm_setup: VecDeque<Response<SetupIntent>>,
    retrieve_payment: VecDeque<Response<PaymentIntent>>,
    retrieve_setup: VecDeque<Response<SetupIntent>>,
    cancel_challenge: VecDeque<Response<bool>>,
    complete_challenge: VecDeque<Response<bool>>,
    confirm_params: Vec<serde_json::Value>,
    calls: Vec<RecordedCall>,
}

/// Takes the next scripted response; the last one repeats once the rest are used.
fn next_scripted<T: Clone>(
    queue: &mut VecDeque<Response<T>>,
    unscripted: impl FnOnce() -> Response<T>,
) -> Response<T> {
    if queue.len() > 1
        && let Some(response) = queue.pop_front()
    {
        return response;
    }
    queue.front().cloned().unwrap_or_else(unscripted)
}

fn unscripted<T>(call: &str) -> impl FnOnce() -> Response<T> + '_ {
    move || Err(TransportError::Network(format!("no scripted response for {call}")))
}

/// A processor stand-in that answers from per-call queues and records every request.
///
/// Retrieval and refresh share one queue per intent kind. Challenge calls answer
/// `Ok(true)` unless scripted otherwise.
#[derive(Default)]
pub struct ScriptedTransport {
    script: RwLock<Script>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_confirm_payment(mut self, response: Response<PaymentIntent>) -> Self {
        self.script.get_mut().confirm_payment.push_back(response);
        self
    }

    pub fn with_confirm_setup(mut self, response: Response<SetupIntent>) -> Self {
        self.script.get_mut().confirm_setup.push_back(response);
        self
    }

    pub fn with_retrieve_payment(mut self, response: Response<PaymentIntent>) -> Self {
        self.script.get_mut().retrieve_payment.push_back(response);
        self
    }

    pub fn with_retrieve_setup(mut self, response: Response<SetupIntent>) -> Self {
        self.script.get_mut().retrieve_setup.push_back(response);
        self
    }

    pub fn with_cancel_challenge(mut self, response: Response<bool>) -> Self {
        self.script.get_mut().cancel_challenge.push_back(response);
        self
    }

    pub fn with_complete_challenge(mut self, response: Response<bool>) -> Self {
        self.script.get_mut().complete_challenge.push_back(response);
        self
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.script.read().await.calls.clone()
    }

    pub async fn calls_of(&self, kind: CallKind) -> Vec<RecordedCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|call| call.kind == kind)
            .collect()
    }

    pub async fn retrievals(&self) -> Vec<RecordedCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|call| call.kind.is_retrieval())
            .collect()
    }

    /// Confirmation parameters as sent, serialized.
    pub async fn confirm_params(&self) -> Vec<serde_json::Value> {
        self.script.read().await.confirm_params.clone()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn call(kind: CallKind, target: &str) -> RecordedCall {
    RecordedCall {
        kind,
        target: target.to_string(),
        expand: Vec::new(),
        timeout: None,
        publishable_key: None,
        at: Instant::now(),
    }
}

fn expanded(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|field| field.to_string()).collect()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn confirm_payment_intent(
        &self,
        intent_id: &str,
        params: &ConfirmPaymentParams,
        expand: &[&str],
    ) -> Result<PaymentIntent, TransportError> {
        self.pause().await;
        let mut script = self.script.write().await;
        let recorded = RecordedCall {
            expand: expanded(expand),
            ..call(CallKind::ConfirmPayment, intent_id)
        };
        script.calls.push(recorded);
        script.confirm_params.push(serde_json::to_value(params)?);
        next_scripted(&mut script.confirm_payment, unscripted("confirm_payment_intent"))
    }

    async fn confirm_setup_intent(
        &self,
        intent_id: &str,
        params: &ConfirmSetupParams,
        expand: &[&str],
    ) -> Result<SetupIntent, TransportError> {
        self.pause().await;
        let mut script = self.script.write().await;
        let recorded = RecordedCall {
            expand: expanded(expand),
            ..call(CallKind::ConfirmSetup, intent_id)
        };
        script.calls.push(recorded);
        script.confirm_params.push(serde_json::to_value(params)?);
        next_scripted(&mut script.confirm_setup, unscripted("confirm_setup_intent"))
    }

    async fn retrieve_payment_intent(
        &self,
        client_secret: &str,
        expand: &[&str],
        timeout: Option<Duration>,
    ) -> Result<PaymentIntent, TransportError> {
        self.pause().await;
        let mut script = self.script.write().await;
        let recorded = RecordedCall {
            expand: expanded(expand),
            timeout,
            ..call(CallKind::RetrievePayment, client_secret)
        };
        script.calls.push(recorded);
        next_scripted(&mut script.retrieve_payment, unscripted("retrieve_payment_intent"))
    }

    async fn retrieve_setup_intent(
        &self,
        client_secret: &str,
        expand: &[&str],
        timeout: Option<Duration>,
    ) -> Result<SetupIntent, TransportError> {
        self.pause().await;
        let mut script = self.script.write().await;
        let recorded = RecordedCall {
            expand: expanded(expand),
            timeout,
            ..call(CallKind::RetrieveSetup, client_secret)
        };
        script.calls.push(recorded);
        next_scripted(&mut script.retrieve_setup, unscripted("retrieve_setup_intent"))
    }

    async fn refresh_payment_intent(
        &self,
        client_secret: &str,
        timeout: Option<Duration>,
    ) -> Result<PaymentIntent, TransportError> {
        self.pause().await;
        let mut script = self.script.write().await;
        let recorded = RecordedCall {
            timeout,
            ..call(CallKind::RefreshPayment, client_secret)
        };
        script.calls.push(recorded);
        next_scripted(&mut script.retrieve_payment, unscripted("refresh_payment_intent"))
    }

    async fn refresh_setup_intent(
        &self,
        client_secret: &str,
        timeout: Option<Duration>,
    ) -> Result<SetupIntent, TransportError> {
        self.pause().await;
        let mut script = self.script.write().await;
        let recorded = RecordedCall {
            timeout,
            ..call(CallKind::RefreshSetup, client_secret)
        };
        script.calls.push(recorded);
        next_scripted(&mut script.retrieve_setup, unscripted("refresh_setup_intent"))
    }

    async fn cancel_challenge(
        &self,
        source_id: &str,
        publishable_key: Option<&str>,
    ) -> Result<bool, TransportError> {
        self.pause().await;
        let mut script = self.script.write().await;
        let recorded = RecordedCall {
            publishable_key: publishable_key.map(str::to_string),
            ..call(CallKind::CancelChallenge, source_id)
        };
        script.calls.push(recorded);
        next_scripted(&mut script.cancel_challenge, || Ok(true))
    }

    async fn complete_challenge(
        &self,
        source_id: &str,
        publishable_key: Option<&str>,
    ) -> Result<bool, TransportError> {
        self.pause().await;
        let mut script = self.script.write().await;
        let recorded = RecordedCall {
            publishable_key: publishable_key.map(str::to_string),
            ..call(CallKind::CompleteChallenge, source_id)
        };
        script.calls.push(recorded);
        next_scripted(&mut script.complete_challenge, || Ok(true))
    }
}

/// A 3DS2 component that finishes every challenge with the same event.
pub struct ScriptedChallengeComponent {
    event: ChallengeEvent,
    latency: Option<Duration>,
    requests: Mutex<Vec<ChallengeRequest>>,
}

impl ScriptedChallengeComponent {
    pub fn new(event: ChallengeEvent) -> Self {
        Self {
            event,
            latency: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// How long the customer takes before the event fires.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> Vec<ChallengeRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ScriptedChallengeComponent {
    fn default() -> Self {
        Self::new(ChallengeEvent::Completed {
            transaction_status: "Y".to_string(),
        })
    }
}

#[async_trait]
impl ChallengeComponent for ScriptedChallengeComponent {
    async fn run_challenge(&self, request: ChallengeRequest) -> ChallengeEvent {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.event.clone()
    }
}

/// A UI action taken by [`HeadlessHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    NativeUrl(String),
    Browser(String),
    AuthenticationSession { url: String, callback_scheme: String },
    Dismissed,
}

/// A presentation host with no UI: it records what it was asked to open and,
/// when something opens, immediately reports the configured trigger.
pub struct HeadlessHost {
    resume: ResumeHandle,
    trigger: Option<ResumeTrigger>,
    can_present: bool,
    native_apps_installed: bool,
    presentations: Mutex<Vec<Presentation>>,
}

impl HeadlessHost {
    pub fn new(resume: ResumeHandle) -> Self {
        Self {
            resume,
            trigger: None,
            can_present: true,
            native_apps_installed: true,
            presentations: Mutex::new(Vec::new()),
        }
    }

    /// Trigger fired once anything opens. Without one the run waits for an
    /// outside call to the resume handle.
    pub fn with_trigger(mut self, trigger: ResumeTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_can_present(mut self, can_present: bool) -> Self {
        self.can_present = can_present;
        self
    }

    pub fn with_native_apps_installed(mut self, installed: bool) -> Self {
        self.native_apps_installed = installed;
        self
    }

    pub fn presentations(&self) -> Vec<Presentation> {
        self.lock().clone()
    }

    fn opened(&self, presentation: Presentation) {
        self.lock().push(presentation);
        if let Some(trigger) = &self.trigger {
            self.resume.resume(trigger.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Presentation>> {
        self.presentations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PresentationHost for HeadlessHost {
    fn can_present(&self) -> bool {
        self.can_present
    }

    async fn open_native_url(&self, url: &str) -> bool {
        if !self.native_apps_installed {
            return false;
        }
        self.opened(Presentation::NativeUrl(url.to_string()));
        true
    }

    async fn present_browser(&self, url: &str) -> Result<(), PresentationError> {
        if !self.can_present {
            return Err(PresentationError::NoPresenter);
        }
        self.opened(Presentation::Browser(url.to_string()));
        Ok(())
    }

    async fn start_authentication_session(
        &self,
        url: &str,
        callback_scheme: &str,
    ) -> Result<(), PresentationError> {
        if !self.can_present {
            return Err(PresentationError::NoPresenter);
        }
        self.opened(Presentation::AuthenticationSession {
            url: url.to_string(),
            callback_scheme: callback_scheme.to_string(),
        });
        Ok(())
    }

    async fn dismiss(&self) {
        self.lock().push(Presentation::Dismissed);
    }
}
