use super::engine::{Run, Step};
use crate::domain::intent::ConfirmableIntent;
use crate::domain::next_action::{NextAction, SdkAction};
use crate::domain::outcome::HandlerOutcome;
use crate::domain::payment_method::PaymentMethodType;
use crate::domain::telemetry::EventName;
use crate::error::{ConfirmError, ErrorKind};
use crate::polling::PollingBudget;
use tracing::{debug, info};

/// The method type a next action is handled for.
///
/// Redacted intents may hide their payment method; a native SDK challenge is
/// only ever issued for cards, so that case alone falls back to card.
pub(crate) fn resolve_method_type<I: ConfirmableIntent>(intent: &I) -> Option<PaymentMethodType> {
    intent.payment_method_type().or_else(|| {
        let delegated = intent
            .next_action()
            .is_some_and(NextAction::is_native_sdk_delegation);
        (intent.is_redacted() && delegated).then_some(PaymentMethodType::Card)
    })
}

impl Run<'_> {
    /// Presents the next action of a `requires_action` snapshot.
    pub(crate) async fn present<I: ConfirmableIntent>(&mut self, intent: I) -> Step<I> {
        let Some(method) = resolve_method_type(&intent) else {
            return Step::failed(
                intent,
                ConfirmError::unexpected("requires_action intent has no payment method type"),
            );
        };
        let Some(action) = intent.next_action().cloned() else {
            return Step::failed(
                intent,
                ConfirmError::unexpected("requires_action intent has no next action"),
            );
        };

        if action.is_voucher() {
            debug!(intent_id = %intent.id(), next_action = action.kind(), "voucher action, nothing to drive");
            return Step::Done(HandlerOutcome::succeeded(intent));
        }

        let native_challenge = matches!(
            action,
            NextAction::UseStripeSdk {
                use_stripe_sdk: SdkAction::ThreeDs2Fingerprint(_)
            }
        );
        if !native_challenge && action.redirect_target().is_none() {
            return Step::failed(
                intent,
                ConfirmError::new(
                    ErrorKind::UnsupportedAuthentication,
                    format!("unsupported next action {}", action.kind()),
                ),
            );
        }

        if !self.context.host.can_present() {
            return Step::failed(
                intent,
                ConfirmError::new(
                    ErrorKind::RequiresPresentableContext,
                    "presentation host cannot present",
                ),
            );
        }

        // Every presented action polls against its own budget.
        self.coordinator.reset();
        info!(
            intent_id = %intent.id(),
            payment_method_type = %method,
            next_action = action.kind(),
            "presenting next action"
        );
        self.record(
            self.event(EventName::NextActionPresented, &intent)
                .payment_method_type(Some(method))
                .detail(action.kind()),
        );

        match &action {
            NextAction::UseStripeSdk {
                use_stripe_sdk: SdkAction::ThreeDs2Fingerprint(fingerprint),
            } => self.run_native_challenge(intent, fingerprint).await,
            _ => self.present_redirect(intent, method, &action).await,
        }
    }

    /// Handles a snapshot that still requires action after the action was presented.
    pub(crate) async fn pending<I: ConfirmableIntent>(&mut self, intent: I) -> Step<I> {
        let Some(method) = resolve_method_type(&intent) else {
            return Step::failed(
                intent,
                ConfirmError::unexpected("requires_action intent has no payment method type"),
            );
        };
        let action = intent.next_action();

        if action.is_some_and(NextAction::is_voucher) {
            return Step::Done(HandlerOutcome::succeeded(intent));
        }

        // Card redirects report their own completion; only native challenges poll.
        let should_poll = method != PaymentMethodType::Card
            || action.is_some_and(NextAction::is_native_sdk_delegation);
        if should_poll
            && self
                .coordinator
                .get_or_create_budget(method)
                .is_some_and(PollingBudget::can_poll)
        {
            self.record(
                self.event(EventName::PollScheduled, &intent)
                    .payment_method_type(Some(method))
                    .detail("requires_action"),
            );
            self.coordinator.poll_after().await;
            return Step::Retrieve {
                last: intent,
                after_action: true,
            };
        }

        if method.skips_challenge_cancel() {
            debug!(intent_id = %intent.id(), payment_method_type = %method, "leaving challenge open");
        } else {
            self.cancel_challenge(&intent).await;
        }
        info!(intent_id = %intent.id(), payment_method_type = %method, "next action abandoned");
        Step::Done(HandlerOutcome::canceled(Some(intent)))
    }
}
