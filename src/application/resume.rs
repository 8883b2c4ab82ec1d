use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Everything that can bring a run back from a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum ResumeTrigger {
    /// The in-app browser was closed.
    BrowserDismissed,
    /// The authentication session finished, successfully or not.
    AuthSessionCompleted,
    /// The app came back to the foreground after a native app hand-off.
    AppForegrounded,
    /// The platform delivered a URL to the app.
    ReturnUrl { url: String },
}

impl ResumeTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrowserDismissed => "browser_dismissed",
            Self::AuthSessionCompleted => "auth_session_completed",
            Self::AppForegrounded => "app_foregrounded",
            Self::ReturnUrl { .. } => "return_url",
        }
    }
}

struct Armed {
    tx: oneshot::Sender<ResumeTrigger>,
    return_url: Option<String>,
}

/// A consume-once gate between platform callbacks and a waiting run.
///
/// Cloning is cheap; every clone talks to the same gate. Only the first trigger
/// after [`arm`](Self::arm) reaches the run, everything after it is dropped.
#[derive(Clone, Default)]
pub struct ResumeHandle {
    slot: Arc<Mutex<Option<Armed>>>,
}

impl ResumeHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the gate for one trigger. A gate armed earlier is replaced.
    pub(crate) fn arm(&self, return_url: Option<String>) -> oneshot::Receiver<ResumeTrigger> {
        let (tx, rx) = oneshot::channel();
        *self.lock() = Some(Armed { tx, return_url });
        rx
    }

    pub(crate) fn disarm(&self) {
        self.lock().take();
    }

    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    /// Delivers `trigger` to the waiting run. Returns whether it was taken.
    ///
    /// A return URL only counts when it matches the registered one, query and
    /// fragment aside; a foreign URL leaves the gate armed.
    pub fn resume(&self, trigger: ResumeTrigger) -> bool {
        let mut slot = self.lock();
        let Some(armed) = slot.as_ref() else {
            return false;
        };
        if let ResumeTrigger::ReturnUrl { url } = &trigger {
            let matches = armed
                .return_url
                .as_deref()
                .is_some_and(|expected| strip_query(expected) == strip_query(url));
            if !matches {
                return false;
            }
        }
        match slot.take() {
            Some(armed) => armed.tx.send(trigger).is_ok(),
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Armed>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_trigger_wins() {
        let handle = ResumeHandle::new();
        let rx = handle.arm(None);

        assert!(handle.resume(ResumeTrigger::AppForegrounded));
        assert!(!handle.resume(ResumeTrigger::BrowserDismissed));
        assert!(!handle.is_armed());
        assert_eq!(rx.await.unwrap(), ResumeTrigger::AppForegrounded);
    }

    #[tokio::test]
    async fn test_return_url_must_match() {
        let handle = ResumeHandle::new();
        let rx = handle.arm(Some("myapp://payments/return".to_string()));

        assert!(!handle.resume(ResumeTrigger::ReturnUrl {
            url: "otherapp://payments/return".to_string(),
        }));
        assert!(handle.is_armed());

        let url = "myapp://payments/return?payment_intent=pi_1&redirect_status=succeeded";
        assert!(handle.resume(ResumeTrigger::ReturnUrl {
            url: url.to_string(),
        }));
        assert_eq!(
            rx.await.unwrap(),
            ResumeTrigger::ReturnUrl {
                url: url.to_string()
            }
        );
    }

    #[test]
    fn test_unarmed_gate_ignores_triggers() {
        let handle = ResumeHandle::new();
        assert!(!handle.resume(ResumeTrigger::BrowserDismissed));

        let _rx = handle.arm(None);
        handle.disarm();
        assert!(!handle.resume(ResumeTrigger::BrowserDismissed));
    }

    #[test]
    fn test_trigger_wire_format() {
        let trigger: ResumeTrigger =
            serde_json::from_str(r#"{"trigger": "return_url", "url": "myapp://done"}"#).unwrap();
        assert_eq!(trigger.as_str(), "return_url");
    }
}
