use crate::domain::intent::{ConfirmableIntent, IntentStatus};
use crate::error::{ConfirmError, ErrorKind};

/// Where a freshly retrieved snapshot leaves the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Succeeded,
    Canceled,
    Failed(ConfirmError),
    NeedsAction,
}

/// Maps a snapshot's status to a terminal outcome, or to the dispatcher.
///
/// `Processing` lands here only once polling is no longer permitted, so it is
/// terminal: a success for async-settling methods, an error for the rest.
pub fn classify<I: ConfirmableIntent>(intent: &I) -> Classification {
    match intent.status() {
        IntentStatus::Unknown => {
            Classification::Failed(ConfirmError::unexpected("intent status is unknown"))
        }
        IntentStatus::RequiresPaymentMethod => Classification::Failed(payment_method_error(intent)),
        IntentStatus::RequiresConfirmation
        | IntentStatus::Succeeded
        | IntentStatus::RequiresCapture => Classification::Succeeded,
        IntentStatus::Canceled => Classification::Canceled,
        IntentStatus::Processing if intent.processing_is_success() => Classification::Succeeded,
        IntentStatus::Processing => {
            Classification::Failed(ConfirmError::unexpected("intent is still processing"))
        }
        IntentStatus::RequiresAction => Classification::NeedsAction,
    }
}

/// Why a `RequiresPaymentMethod` snapshot failed. Anything that is neither an
/// authentication failure nor a card decline is reported as `Unexpected`, with
/// the processor's message kept for the customer.
fn payment_method_error<I: ConfirmableIntent>(intent: &I) -> ConfirmError {
    let Some(last_error) = intent.last_error() else {
        return ConfirmError::unexpected("requires_payment_method without a last error");
    };

    if last_error.is_authentication_failure() {
        return ConfirmError::new(
            ErrorKind::NotAuthenticated,
            "authentication failed; payment method must be replaced",
        );
    }

    if last_error.is_card_error() {
        let code = last_error.code.clone();
        let log_message = format!(
            "card error code={}",
            code.as_deref().unwrap_or("none")
        );
        let error = ConfirmError::new(ErrorKind::PaymentDeclined { code }, log_message);
        return match &last_error.message {
            Some(message) => error.with_user_message(message.clone()),
            None => error,
        };
    }

    let error = ConfirmError::unexpected(format!(
        "payment error type={}",
        last_error.r#type.as_deref().unwrap_or("none")
    ));
    match &last_error.message {
        Some(message) => error.with_user_message(message.clone()),
        None => error,
    }
}
