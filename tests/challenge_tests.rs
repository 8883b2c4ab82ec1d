mod common;

use common::*;
use intent_handler::domain::intent::PaymentIntent;
use intent_handler::domain::outcome::TerminalStatus;
use intent_handler::domain::params::ConfirmPaymentParams;
use intent_handler::domain::ports::ChallengeEvent;
use intent_handler::domain::telemetry::EventName;
use intent_handler::error::{ErrorKind, TransportError};
use intent_handler::infrastructure::in_memory::{
    CallKind, ScriptedChallengeComponent, ScriptedTransport,
};
use serde_json::json;
use std::time::Duration;

fn challenged_card() -> PaymentIntent {
    payment_intent("requires_action", Some("card"), Some(three_ds2_action(None)))
}

async fn confirm(harness: &Harness) -> intent_handler::domain::outcome::HandlerOutcome<PaymentIntent> {
    harness
        .handler
        .confirm_payment(
            ConfirmPaymentParams::new(PAYMENT_SECRET).with_payment_method("pm_1"),
            &harness.context,
        )
        .await
}

#[tokio::test(start_paused = true)]
async fn test_completed_challenge_retrieves() {
    let transport = ScriptedTransport::new()
        .with_confirm_payment(Ok(challenged_card()))
        .with_retrieve_payment(Ok(payment_intent("succeeded", Some("card"), None)));
    let harness = HarnessBuilder::new(transport).build();

    let outcome = confirm(&harness).await;

    assert_eq!(outcome.status, TerminalStatus::Succeeded);
    let requests = harness.challenge.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].intent_id, "pi_1");
    assert_eq!(requests[0].source_id, "src_3ds2");
    assert_eq!(requests[0].directory_server_name, "visa");
    assert_eq!(requests[0].server_transaction_id, "srv_tx_1");

    let completions = harness
        .transport
        .calls_of(CallKind::CompleteChallenge)
        .await;
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].target, "src_3ds2");
    assert_eq!(harness.transport.retrievals().await.len(), 1);
    assert_eq!(
        harness.telemetry.count(EventName::ChallengeCompletionMarked),
        1
    );
    assert!(harness.host.presentations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_completion_retries_client_errors_then_proceeds() {
    let transport = ScriptedTransport::new()
        .with_confirm_payment(Ok(challenged_card()))
        .with_complete_challenge(Err(TransportError::http(400, "challenge not ready")))
        .with_retrieve_payment(Ok(payment_intent("succeeded", Some("card"), None)));
    let harness = HarnessBuilder::new(transport).build();

    let outcome = confirm(&harness).await;

    assert_eq!(outcome.status, TerminalStatus::Succeeded);
    let completions = harness
        .transport
        .calls_of(CallKind::CompleteChallenge)
        .await;
    // The first attempt plus five retries.
    assert_eq!(completions.len(), 6);
    for pair in completions.windows(2) {
        assert_eq!(pair[1].at - pair[0].at, Duration::from_secs(2));
    }
    let retrievals = harness.transport.retrievals().await;
    assert_eq!(retrievals.len(), 1);
    assert!(retrievals[0].at >= completions[5].at);
    assert_eq!(
        harness.telemetry.count(EventName::ChallengeCompletionMarked),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_completion_succeeds_after_two_client_errors() {
    let transport = ScriptedTransport::new()
        .with_confirm_payment(Ok(challenged_card()))
        .with_complete_challenge(Err(TransportError::http(400, "not ready")))
        .with_complete_challenge(Err(TransportError::http(409, "conflict")))
        .with_complete_challenge(Ok(true))
        .with_retrieve_payment(Ok(payment_intent("succeeded", Some("card"), None)));
    let harness = HarnessBuilder::new(transport).build();

    let outcome = confirm(&harness).await;

    assert_eq!(outcome.status, TerminalStatus::Succeeded);
    assert_eq!(
        harness
            .transport
            .calls_of(CallKind::CompleteChallenge)
            .await
            .len(),
        3
    );
    let marked = harness
        .telemetry
        .events()
        .into_iter()
        .find(|event| event.event == EventName::ChallengeCompletionMarked)
        .unwrap();
    assert_eq!(marked.detail.as_deref(), Some("retries=2"));
}

#[tokio::test(start_paused = true)]
async fn test_completion_server_error_is_not_retried() {
    let transport = ScriptedTransport::new()
        .with_confirm_payment(Ok(challenged_card()))
        .with_complete_challenge(Err(TransportError::http(503, "unavailable")))
        .with_retrieve_payment(Ok(payment_intent("succeeded", Some("card"), None)));
    let harness = HarnessBuilder::new(transport).build();

    let outcome = confirm(&harness).await;

    assert_eq!(outcome.status, TerminalStatus::Succeeded);
    assert_eq!(
        harness
            .transport
            .calls_of(CallKind::CompleteChallenge)
            .await
            .len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_user_cancel_still_marks_completion() {
    let transport = ScriptedTransport::new().with_confirm_payment(Ok(challenged_card()));
    let harness = HarnessBuilder::new(transport)
        .challenge(ScriptedChallengeComponent::new(ChallengeEvent::UserCanceled))
        .build();

    let outcome = confirm(&harness).await;

    assert_eq!(outcome.status, TerminalStatus::Canceled);
    assert!(outcome.error.is_none());
    assert_eq!(
        harness
            .transport
            .calls_of(CallKind::CompleteChallenge)
            .await
            .len(),
        1
    );
    assert!(harness.transport.retrievals().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_challenge_timeout() {
    let transport = ScriptedTransport::new().with_confirm_payment(Ok(challenged_card()));
    let harness = HarnessBuilder::new(transport)
        .challenge(
            ScriptedChallengeComponent::new(ChallengeEvent::TimedOut)
                .with_latency(Duration::from_secs(300)),
        )
        .build();

    let outcome = confirm(&harness).await;

    assert_eq!(outcome.status, TerminalStatus::Failed);
    assert_eq!(outcome.error.unwrap().kind, ErrorKind::TimedOut);
    assert_eq!(
        harness
            .transport
            .calls_of(CallKind::CompleteChallenge)
            .await
            .len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_challenge_component_errors() {
    for event in [
        ChallengeEvent::ProtocolError {
            code: "203".to_string(),
            description: "data element missing".to_string(),
        },
        ChallengeEvent::RuntimeError {
            message: "renderer crashed".to_string(),
        },
    ] {
        let transport = ScriptedTransport::new().with_confirm_payment(Ok(challenged_card()));
        let harness = HarnessBuilder::new(transport)
            .challenge(ScriptedChallengeComponent::new(event))
            .build();

        let outcome = confirm(&harness).await;

        assert_eq!(outcome.status, TerminalStatus::Failed);
        assert_eq!(
            outcome.error.unwrap().kind,
            ErrorKind::ExternalChallengeComponentError
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_pending_challenge_polls_card_budget_then_cancels() {
    let challenged = payment_intent(
        "requires_action",
        Some("card"),
        Some(three_ds2_action(Some("pk_test_connected"))),
    );
    let transport = ScriptedTransport::new()
        .with_confirm_payment(Ok(challenged.clone()))
        .with_retrieve_payment(Ok(challenged));
    let harness = HarnessBuilder::new(transport).build();

    let outcome = confirm(&harness).await;

    assert_eq!(outcome.status, TerminalStatus::Canceled);
    // One fetch after the challenge, then polls at 1s..=16s against the 15s card budget.
    assert_eq!(harness.transport.retrievals().await.len(), 17);

    let cancels = harness.transport.calls_of(CallKind::CancelChallenge).await;
    assert_eq!(cancels.len(), 1);
    assert_eq!(cancels[0].target, "src_3ds2");
    assert_eq!(cancels[0].publishable_key.as_deref(), Some("pk_test_connected"));

    let completions = harness
        .transport
        .calls_of(CallKind::CompleteChallenge)
        .await;
    assert_eq!(completions[0].publishable_key.as_deref(), Some("pk_test_connected"));
}

#[tokio::test(start_paused = true)]
async fn test_redacted_intent_assumes_card_for_native_challenge() {
    let mut body = payment_json("requires_action", None, Some(three_ds2_action(None)));
    body["is_redacted"] = json!(true);
    let redacted: PaymentIntent = serde_json::from_value(body).unwrap();
    let transport = ScriptedTransport::new()
        .with_confirm_payment(Ok(redacted))
        .with_retrieve_payment(Ok(payment_intent("succeeded", Some("card"), None)));
    let harness = HarnessBuilder::new(transport).build();

    let outcome = confirm(&harness).await;

    assert_eq!(outcome.status, TerminalStatus::Succeeded);
    assert_eq!(harness.challenge.requests().len(), 1);
    let presented = harness
        .telemetry
        .events()
        .into_iter()
        .find(|event| event.event == EventName::NextActionPresented)
        .unwrap();
    assert_eq!(
        presented.payment_method_type,
        Some(intent_handler::domain::payment_method::PaymentMethodType::Card)
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_sdk_action_is_unsupported() {
    let transport = ScriptedTransport::new().with_confirm_payment(Ok(payment_intent(
        "requires_action",
        Some("card"),
        Some(json!({
            "type": "use_stripe_sdk",
            "use_stripe_sdk": {"type": "intent_confirmation_challenge"}
        })),
    )));
    let harness = HarnessBuilder::new(transport).build();

    let outcome = confirm(&harness).await;

    assert_eq!(
        outcome.error.unwrap().kind,
        ErrorKind::UnsupportedAuthentication
    );
    assert!(harness.challenge.requests().is_empty());
}
