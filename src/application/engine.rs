use super::classify::{Classification, classify};
use super::context::PresentationContext;
use super::resume::ResumeHandle;
use crate::config::HandlerConfig;
use crate::domain::intent::{ConfirmableIntent, IntentStatus};
use crate::domain::outcome::HandlerOutcome;
use crate::domain::payment_method::PaymentMethodType;
use crate::domain::ports::{ChallengeComponent, ClockRef, TelemetrySink, Transport};
use crate::domain::telemetry::{EventName, TelemetryEvent};
use crate::error::ConfirmError;
use crate::polling::PollingCoordinator;
use tracing::{debug, warn};

/// One state of a run. The run loop turns each step into the next one until it
/// reaches [`Step::Done`].
pub(crate) enum Step<I> {
    /// Classify a snapshot. `after_action` is set once a next action has been
    /// presented in this run.
    Classify { intent: I, after_action: bool },
    /// Fetch a fresh snapshot; `last` is what the run saw before.
    Retrieve { last: I, after_action: bool },
    /// Present the snapshot's next action.
    Present(I),
    /// A presented action is still pending: poll or give up.
    Pending(I),
    Done(HandlerOutcome<I>),
}

impl<I> Step<I> {
    pub(crate) fn failed(intent: I, error: ConfirmError) -> Self {
        Self::Done(HandlerOutcome::failed(Some(intent), error))
    }
}

/// A single orchestration run over one intent.
///
/// A run owns its polling state and borrows everything else from the handler
/// that started it. It is never shared between tasks.
pub(crate) struct Run<'a> {
    pub(crate) transport: &'a dyn Transport,
    pub(crate) challenge_component: &'a dyn ChallengeComponent,
    pub(crate) telemetry: &'a dyn TelemetrySink,
    pub(crate) clock: ClockRef,
    pub(crate) config: &'a HandlerConfig,
    pub(crate) context: &'a PresentationContext,
    pub(crate) resume: &'a ResumeHandle,
    pub(crate) coordinator: PollingCoordinator,
    pub(crate) client_secret: String,
}

impl<'a> Run<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        transport: &'a dyn Transport,
        challenge_component: &'a dyn ChallengeComponent,
        telemetry: &'a dyn TelemetrySink,
        clock: ClockRef,
        config: &'a HandlerConfig,
        context: &'a PresentationContext,
        resume: &'a ResumeHandle,
        client_secret: impl Into<String>,
    ) -> Self {
        let coordinator = PollingCoordinator::new(clock.clone(), config.clone());
        Self {
            transport,
            challenge_component,
            telemetry,
            clock,
            config,
            context,
            resume,
            coordinator,
            client_secret: client_secret.into(),
        }
    }

    /// Drives `intent` to a terminal outcome.
    pub(crate) async fn drive<I: ConfirmableIntent>(&mut self, intent: I) -> HandlerOutcome<I> {
        let mut step = Step::Classify {
            intent,
            after_action: false,
        };
        loop {
            step = match step {
                Step::Classify {
                    intent,
                    after_action,
                } => self.classify_step(intent, after_action).await,
                Step::Retrieve { last, after_action } => self.retrieve(last, after_action).await,
                Step::Present(intent) => self.present(intent).await,
                Step::Pending(intent) => self.pending(intent).await,
                Step::Done(outcome) => return outcome,
            };
        }
    }

    async fn classify_step<I: ConfirmableIntent>(
        &mut self,
        intent: I,
        after_action: bool,
    ) -> Step<I> {
        if intent.status() == IntentStatus::Processing
            && !intent.processing_is_success()
            && self.coordinator.can_poll()
        {
            if !self.coordinator.has_budget() {
                self.coordinator.create_processing_budget();
            }
            self.record(self.event(EventName::PollScheduled, &intent).detail("processing"));
            self.coordinator.poll_after().await;
            return Step::Retrieve {
                last: intent,
                after_action,
            };
        }

        match classify(&intent) {
            Classification::Succeeded => Step::Done(HandlerOutcome::succeeded(intent)),
            Classification::Canceled => Step::Done(HandlerOutcome::canceled(Some(intent))),
            Classification::Failed(error) => Step::failed(intent, error),
            Classification::NeedsAction if after_action => Step::Pending(intent),
            Classification::NeedsAction => Step::Present(intent),
        }
    }

    async fn retrieve<I: ConfirmableIntent>(&mut self, last: I, after_action: bool) -> Step<I> {
        let timeout = self.coordinator.network_timeout();
        let refresh = last
            .payment_method_type()
            .is_some_and(PaymentMethodType::supports_refresh);

        let result = if refresh {
            I::refresh(self.transport, &self.client_secret, timeout).await
        } else {
            I::retrieve(self.transport, &self.client_secret, timeout).await
        };

        match result {
            Ok(intent) if !intent.has_expanded_payment_method() => Step::failed(
                intent,
                ConfirmError::unexpected("retrieved intent has an unexpanded payment method"),
            ),
            Ok(intent) => {
                debug!(intent_id = %intent.id(), status = ?intent.status(), "retrieved intent");
                Step::Classify {
                    intent,
                    after_action,
                }
            }
            Err(err) => {
                warn!(intent_id = %last.id(), error = %err, "intent retrieval failed");
                if !self.coordinator.has_budget() {
                    self.coordinator.create_minimal_budget();
                }
                if self.coordinator.can_poll() {
                    self.record(self.event(EventName::PollScheduled, &last).detail("retry"));
                    self.coordinator.poll_after().await;
                    Step::Retrieve { last, after_action }
                } else {
                    Step::failed(last, ConfirmError::from_transport(&err))
                }
            }
        }
    }

    pub(crate) fn event<I: ConfirmableIntent>(&self, name: EventName, intent: &I) -> TelemetryEvent {
        TelemetryEvent::new(name, I::KIND)
            .intent_id(intent.id())
            .payment_method_type(intent.payment_method_type())
    }

    pub(crate) fn record(&self, event: TelemetryEvent) {
        self.telemetry.record(event);
    }
}
