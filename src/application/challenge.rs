use super::engine::{Run, Step};
use crate::domain::intent::ConfirmableIntent;
use crate::domain::next_action::ThreeDs2Fingerprint;
use crate::domain::outcome::HandlerOutcome;
use crate::domain::ports::{ChallengeEvent, ChallengeRequest};
use crate::domain::telemetry::EventName;
use crate::error::{ConfirmError, ErrorKind};
use tracing::{debug, info, warn};

impl Run<'_> {
    /// Runs the external 3DS2 challenge and maps its single event onto the run.
    pub(crate) async fn run_native_challenge<I: ConfirmableIntent>(
        &mut self,
        intent: I,
        fingerprint: &ThreeDs2Fingerprint,
    ) -> Step<I> {
        let request = ChallengeRequest {
            intent_id: intent.id().to_string(),
            source_id: fingerprint.three_d_secure_2_source.clone(),
            directory_server_name: fingerprint.directory_server_name.clone(),
            server_transaction_id: fingerprint.server_transaction_id.clone(),
            publishable_key: fingerprint.publishable_key.clone(),
            livemode: intent.livemode(),
        };

        let event = self.challenge_component.run_challenge(request).await;
        info!(intent_id = %intent.id(), event = event.as_str(), "3ds2 challenge finished");

        self.mark_challenge_completed(
            &intent,
            &fingerprint.three_d_secure_2_source,
            fingerprint.publishable_key.as_deref(),
        )
        .await;

        match event {
            ChallengeEvent::Completed { .. } => Step::Retrieve {
                last: intent,
                after_action: true,
            },
            ChallengeEvent::UserCanceled => Step::Done(HandlerOutcome::canceled(Some(intent))),
            ChallengeEvent::TimedOut => Step::failed(
                intent,
                ConfirmError::new(ErrorKind::TimedOut, "3ds2 challenge timed out"),
            ),
            ChallengeEvent::ProtocolError { code, .. } => Step::failed(
                intent,
                ConfirmError::new(
                    ErrorKind::ExternalChallengeComponentError,
                    format!("3ds2 protocol error {code}"),
                ),
            ),
            ChallengeEvent::RuntimeError { message } => Step::failed(
                intent,
                ConfirmError::new(
                    ErrorKind::ExternalChallengeComponentError,
                    format!("3ds2 runtime error: {message}"),
                ),
            ),
        }
    }

    /// Tells the processor the challenge UI is done, whatever its outcome.
    ///
    /// 400-class answers are retried a bounded number of times with a fixed delay;
    /// anything else is logged and the run carries on.
    async fn mark_challenge_completed<I: ConfirmableIntent>(
        &self,
        intent: &I,
        source_id: &str,
        publishable_key: Option<&str>,
    ) {
        let mut retries = 0;
        loop {
            match self
                .transport
                .complete_challenge(source_id, publishable_key)
                .await
            {
                Ok(_) => {
                    self.record(
                        self.event(EventName::ChallengeCompletionMarked, intent)
                            .detail(format!("retries={retries}")),
                    );
                    return;
                }
                Err(err)
                    if err.is_client_error()
                        && retries < self.config.challenge_completion_retries =>
                {
                    retries += 1;
                    debug!(intent_id = %intent.id(), retries, error = %err, "retrying challenge completion");
                    self.clock
                        .sleep(self.config.challenge_completion_retry_delay)
                        .await;
                }
                Err(err) => {
                    warn!(intent_id = %intent.id(), retries, error = %err, "could not mark challenge completed");
                    return;
                }
            }
        }
    }

    /// Best-effort server-side cancel of an abandoned challenge.
    pub(crate) async fn cancel_challenge<I: ConfirmableIntent>(&self, intent: &I) {
        let Some(action) = intent.next_action() else {
            return;
        };
        let Some(source_id) = action.correlation_id() else {
            debug!(intent_id = %intent.id(), next_action = action.kind(), "no challenge to cancel");
            return;
        };

        self.record(self.event(EventName::ChallengeCanceled, intent).detail(action.kind()));
        if let Err(err) = self
            .transport
            .cancel_challenge(source_id, action.publishable_key_override())
            .await
        {
            warn!(intent_id = %intent.id(), error = %err, "challenge cancel failed");
        }
    }
}
