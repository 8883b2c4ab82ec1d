use super::intent::IntentKind;
use crate::error::{ConfirmError, ErrorKind};
use std::fmt;

/// A validated intent client secret, `<prefix>_<id>_secret_<secret>`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret {
    raw: String,
    kind: IntentKind,
    id_len: usize,
}

impl ClientSecret {
    pub fn parse(raw: &str) -> Result<Self, ConfirmError> {
        let kind = if raw.starts_with("pi_") {
            IntentKind::Payment
        } else if raw.starts_with("seti_") {
            IntentKind::Setup
        } else {
            return Err(invalid("unrecognized client secret prefix"));
        };

        let (id, secret) = raw
            .split_once("_secret_")
            .ok_or_else(|| invalid("client secret is missing its secret part"))?;
        let body = &id[kind.id_prefix().len()..];
        if body.is_empty() || body.contains('_') {
            return Err(invalid("malformed intent id in client secret"));
        }
        if secret.is_empty() || secret.contains('_') {
            return Err(invalid("malformed secret part in client secret"));
        }

        Ok(Self {
            raw: raw.to_string(),
            kind,
            id_len: id.len(),
        })
    }

    /// Parses and additionally checks the secret belongs to an intent of `kind`.
    pub fn parse_for(raw: &str, kind: IntentKind) -> Result<Self, ConfirmError> {
        let secret = Self::parse(raw)?;
        if secret.kind != kind {
            return Err(invalid(format!(
                "expected a {} client secret, got a {} one",
                kind, secret.kind
            )));
        }
        Ok(secret)
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    /// The intent id the secret belongs to.
    pub fn intent_id(&self) -> &str {
        &self.raw[..self.id_len]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

// Never print the secret itself.
impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecret")
            .field("intent_id", &self.intent_id())
            .finish_non_exhaustive()
    }
}

fn invalid(log_message: impl Into<String>) -> ConfirmError {
    ConfirmError::new(ErrorKind::InvalidClientSecretFormat, log_message)
}
