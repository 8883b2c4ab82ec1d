use super::engine::{Run, Step};
use crate::domain::intent::ConfirmableIntent;
use crate::domain::next_action::{NextAction, RedirectTarget};
use crate::domain::payment_method::{PaymentMethodType, RedirectStrategy};
use crate::error::{ConfirmError, ErrorKind, PresentationError};
use tracing::{debug, info};

/// What to open for a redirect, after strategy selection.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Opening<'a> {
    NativeApp { url: &'a str, fallback: Option<&'a str> },
    Browser { url: &'a str },
    AuthenticationSession { url: &'a str, callback_scheme: &'a str },
}

/// Picks exactly one way of presenting `target` for `method`.
fn select_opening<'a>(
    method: PaymentMethodType,
    target: &RedirectTarget<'a>,
    return_url: Option<&'a str>,
) -> Result<Opening<'a>, ConfirmError> {
    let (url, native_url) = match *target {
        RedirectTarget::NativeOnly { native_url } => {
            return Ok(Opening::NativeApp {
                url: native_url,
                fallback: None,
            });
        }
        RedirectTarget::Web { url, native_url } => (url, native_url),
    };

    let opening = match method.redirect_strategy() {
        RedirectStrategy::NativeAppRequired => Opening::NativeApp {
            url: native_url.unwrap_or(url),
            fallback: None,
        },
        RedirectStrategy::NativeAppPreferred => match native_url {
            Some(native_url) => Opening::NativeApp {
                url: native_url,
                fallback: Some(url),
            },
            None => Opening::Browser { url },
        },
        RedirectStrategy::AuthenticationSession => {
            let callback_scheme = return_url
                .and_then(|return_url| return_url.split_once("://"))
                .map(|(scheme, _)| scheme)
                .filter(|scheme| !scheme.is_empty())
                .ok_or_else(|| {
                    ConfirmError::new(
                        ErrorKind::MissingReturnUrl,
                        format!("{method} authentication session needs a return url"),
                    )
                })?;
            Opening::AuthenticationSession {
                url,
                callback_scheme,
            }
        }
        RedirectStrategy::InAppBrowser => Opening::Browser { url },
    };
    Ok(opening)
}

fn presentation_failure(err: PresentationError) -> ConfirmError {
    match err {
        PresentationError::NoPresenter => {
            ConfirmError::new(ErrorKind::RequiresPresentableContext, err.to_string())
        }
        PresentationError::Failed(_) => ConfirmError::unexpected(err.to_string()),
    }
}

impl Run<'_> {
    /// Sends the customer off to authenticate and waits for the first sign of
    /// their return.
    pub(crate) async fn present_redirect<I: ConfirmableIntent>(
        &mut self,
        intent: I,
        method: PaymentMethodType,
        action: &NextAction,
    ) -> Step<I> {
        let Some(target) = action.redirect_target() else {
            return Step::failed(
                intent,
                ConfirmError::new(
                    ErrorKind::UnsupportedAuthentication,
                    format!("next action {} is not a redirect", action.kind()),
                ),
            );
        };
        let return_url = self
            .context
            .return_url
            .as_deref()
            .or_else(|| action.return_url());

        let opening = match select_opening(method, &target, return_url) {
            Ok(opening) => opening,
            Err(error) => return Step::failed(intent, error),
        };

        // Armed before opening so a host that calls back synchronously is not missed.
        let resumed = self.resume.arm(return_url.map(str::to_string));
        let host = &self.context.host;
        let opened = match opening {
            Opening::NativeApp { url, fallback } => {
                if host.open_native_url(url).await {
                    Ok(())
                } else if let Some(fallback) = fallback {
                    debug!(intent_id = %intent.id(), "native app unavailable, using browser");
                    host.present_browser(fallback).await.map_err(presentation_failure)
                } else {
                    Err(ConfirmError::new(
                        ErrorKind::RequiredAppUnavailable,
                        format!("native app for {method} could not be opened"),
                    ))
                }
            }
            Opening::Browser { url } => host.present_browser(url).await.map_err(presentation_failure),
            Opening::AuthenticationSession {
                url,
                callback_scheme,
            } => host
                .start_authentication_session(url, callback_scheme)
                .await
                .map_err(presentation_failure),
        };
        if let Err(error) = opened {
            self.resume.disarm();
            return Step::failed(intent, error);
        }

        let trigger = match resumed.await {
            Ok(trigger) => trigger,
            Err(_) => {
                return Step::failed(
                    intent,
                    ConfirmError::unexpected("redirect was abandoned unresumed"),
                );
            }
        };
        info!(intent_id = %intent.id(), trigger = trigger.as_str(), "resumed after redirect");
        host.dismiss().await;

        Step::Retrieve {
            last: intent,
            after_action: true,
        }
    }
}
