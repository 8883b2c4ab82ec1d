use super::context::PresentationContext;
use super::engine::Run;
use super::resume::ResumeHandle;
use crate::config::HandlerConfig;
use crate::domain::client_secret::ClientSecret;
use crate::domain::intent::{
    ConfirmableIntent, EXPAND_PAYMENT_METHOD, IntentKind, IntentStatus, PaymentIntent, SetupIntent,
};
use crate::domain::outcome::HandlerOutcome;
use crate::domain::params::{ConfirmPaymentParams, ConfirmSetupParams};
use crate::domain::ports::{ChallengeComponentRef, ClockRef, TelemetrySinkRef, TransportRef};
use crate::domain::telemetry::{EventName, TelemetryEvent};
use crate::error::{ConfirmError, ErrorKind};
use crate::infrastructure::clock::TokioClock;
use crate::infrastructure::telemetry::TracingTelemetry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// What `handle_next_action` works from.
#[derive(Debug, Clone)]
pub enum IntentOrSecret<I> {
    Intent(I),
    /// Retrieved first, then handled like an intent.
    ClientSecret(String),
}

/// Clears the in-flight flag when a run ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Entry point for confirming intents and driving their next actions.
///
/// A handler runs at most one confirmation at a time. Share it behind an `Arc`;
/// a call made while another is in flight fails with
/// [`ErrorKind::ConcurrentActionRejected`] and leaves the running one alone.
pub struct PaymentHandler {
    transport: TransportRef,
    challenge_component: ChallengeComponentRef,
    telemetry: TelemetrySinkRef,
    clock: ClockRef,
    config: HandlerConfig,
    resume: ResumeHandle,
    in_flight: AtomicBool,
}

impl PaymentHandler {
    pub fn new(transport: TransportRef, challenge_component: ChallengeComponentRef) -> Self {
        Self {
            transport,
            challenge_component,
            telemetry: Arc::new(TracingTelemetry),
            clock: Arc::new(TokioClock),
            config: HandlerConfig::default(),
            resume: ResumeHandle::new(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_telemetry(mut self, telemetry: TelemetrySinkRef) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_clock(mut self, clock: ClockRef) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    /// Handle the platform uses to report redirect returns.
    pub fn resume_handle(&self) -> ResumeHandle {
        self.resume.clone()
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn confirm_payment(
        &self,
        mut params: ConfirmPaymentParams,
        context: &PresentationContext,
    ) -> HandlerOutcome<PaymentIntent> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return rejected(IntentKind::Payment);
        };
        let started = self.clock.now();
        self.record(TelemetryEvent::new(EventName::AttemptStarted, IntentKind::Payment));

        let secret = match ClientSecret::parse_for(&params.client_secret, IntentKind::Payment) {
            Ok(secret) => secret,
            Err(error) => return self.finish(IntentKind::Payment, started, HandlerOutcome::failed(None, error)),
        };
        if params.return_url.is_none() {
            params.return_url = context.return_url.clone();
        }

        info!(intent_id = %secret.intent_id(), "confirming payment intent");
        let confirmed = self
            .transport
            .confirm_payment_intent(secret.intent_id(), &params, EXPAND_PAYMENT_METHOD)
            .await;
        let outcome = match confirmed {
            Ok(intent) => self.run(intent, context, None).await,
            Err(err) => {
                warn!(intent_id = %secret.intent_id(), error = %err, "confirmation request failed");
                HandlerOutcome::failed(None, ConfirmError::from_transport(&err))
            }
        };
        self.finish(IntentKind::Payment, started, outcome)
    }

    pub async fn confirm_setup(
        &self,
        mut params: ConfirmSetupParams,
        context: &PresentationContext,
    ) -> HandlerOutcome<SetupIntent> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return rejected(IntentKind::Setup);
        };
        let started = self.clock.now();
        self.record(TelemetryEvent::new(EventName::AttemptStarted, IntentKind::Setup));

        let secret = match ClientSecret::parse_for(&params.client_secret, IntentKind::Setup) {
            Ok(secret) => secret,
            Err(error) => return self.finish(IntentKind::Setup, started, HandlerOutcome::failed(None, error)),
        };
        if params.return_url.is_none() {
            params.return_url = context.return_url.clone();
        }

        info!(intent_id = %secret.intent_id(), "confirming setup intent");
        let confirmed = self
            .transport
            .confirm_setup_intent(secret.intent_id(), &params, EXPAND_PAYMENT_METHOD)
            .await;
        let outcome = match confirmed {
            Ok(intent) => self.run(intent, context, None).await,
            Err(err) => {
                warn!(intent_id = %secret.intent_id(), error = %err, "confirmation request failed");
                HandlerOutcome::failed(None, ConfirmError::from_transport(&err))
            }
        };
        self.finish(IntentKind::Setup, started, outcome)
    }

    /// Drives the next action of an intent confirmed elsewhere.
    ///
    /// `return_url` takes precedence over the context's one.
    pub async fn handle_next_action<I: ConfirmableIntent>(
        &self,
        target: IntentOrSecret<I>,
        context: &PresentationContext,
        return_url: Option<String>,
    ) -> HandlerOutcome<I> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return rejected(I::KIND);
        };
        let started = self.clock.now();
        self.record(TelemetryEvent::new(EventName::AttemptStarted, I::KIND));

        let intent = match target {
            IntentOrSecret::Intent(intent) => intent,
            IntentOrSecret::ClientSecret(raw) => {
                let secret = match ClientSecret::parse_for(&raw, I::KIND) {
                    Ok(secret) => secret,
                    Err(error) => {
                        return self.finish(I::KIND, started, HandlerOutcome::failed(None, error));
                    }
                };
                match I::retrieve(self.transport.as_ref(), secret.as_str(), None).await {
                    Ok(intent) => intent,
                    Err(err) => {
                        warn!(intent_id = %secret.intent_id(), error = %err, "intent retrieval failed");
                        let outcome = HandlerOutcome::failed(None, ConfirmError::from_transport(&err));
                        return self.finish(I::KIND, started, outcome);
                    }
                }
            }
        };

        let misuse = match intent.status() {
            IntentStatus::RequiresPaymentMethod if intent.payment_method().is_none() => Some(
                ConfirmError::new(
                    ErrorKind::RequiresPaymentMethodBeforeUse,
                    "intent has no payment method attached",
                ),
            ),
            IntentStatus::RequiresConfirmation => Some(ConfirmError::new(
                ErrorKind::UnexpectedIntentStatus,
                "intent must be confirmed before handling its next action",
            )),
            _ => None,
        };
        if let Some(error) = misuse {
            return self.finish(I::KIND, started, HandlerOutcome::failed(Some(intent), error));
        }

        info!(intent_id = %intent.id(), status = ?intent.status(), "handling next action");
        let outcome = self.run(intent, context, return_url).await;
        self.finish(I::KIND, started, outcome)
    }

    async fn run<I: ConfirmableIntent>(
        &self,
        intent: I,
        context: &PresentationContext,
        return_url: Option<String>,
    ) -> HandlerOutcome<I> {
        let context = match return_url {
            Some(return_url) => context.clone().with_return_url(return_url),
            None => context.clone(),
        };
        let mut run = Run::new(
            self.transport.as_ref(),
            self.challenge_component.as_ref(),
            self.telemetry.as_ref(),
            self.clock.clone(),
            &self.config,
            &context,
            &self.resume,
            intent.client_secret(),
        );
        run.drive(intent).await
    }

    fn finish<I: ConfirmableIntent>(
        &self,
        kind: IntentKind,
        started: tokio::time::Instant,
        outcome: HandlerOutcome<I>,
    ) -> HandlerOutcome<I> {
        let elapsed = self.clock.now().saturating_duration_since(started);
        let mut event = TelemetryEvent::new(EventName::AttemptFinished, kind)
            .finished(outcome.status, elapsed);
        if let Some(intent) = &outcome.intent {
            event = event
                .intent_id(intent.id())
                .payment_method_type(intent.payment_method_type());
        }
        match &outcome.error {
            Some(error) if error.kind.is_contract_violation() => {
                event = event.error(error).detail("contract_violation");
                warn!(status = %outcome.status, error = %error, "run refused: caller misuse");
            }
            Some(error) => {
                event = event.error(error);
                warn!(status = %outcome.status, error = %error, "run finished");
            }
            None => info!(status = %outcome.status, "run finished"),
        }
        self.record(event);
        outcome
    }

    fn record(&self, event: TelemetryEvent) {
        self.telemetry.record(event);
    }
}

fn rejected<I>(kind: IntentKind) -> HandlerOutcome<I> {
    warn!(intent_kind = %kind, "rejected: another run is in flight");
    HandlerOutcome::failed(
        None,
        ConfirmError::new(
            ErrorKind::ConcurrentActionRejected,
            "another confirmation is already in flight on this handler",
        ),
    )
}
