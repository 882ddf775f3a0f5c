//! API credentials.

use std::fmt;

use crate::error::{TencentError, TencentResult};

pub const SECRET_ID_ENV: &str = "TENCENT_CLOUD_SECRET_ID";
pub const SECRET_KEY_ENV: &str = "TENCENT_CLOUD_SECRET_KEY";
pub const SESSION_TOKEN_ENV: &str = "TENCENT_CLOUD_SESSION_TOKEN";

/// A secret id/key pair, with an optional session token for temporary keys.
#[derive(Clone)]
pub struct Credential {
    pub secret_id: String,
    pub secret_key: String,
    pub token: Option<String>,
}

impl Credential {
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read credentials from the process environment.
    pub fn from_env() -> TencentResult<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(lookup: F) -> TencentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &'static str| lookup(key).filter(|v| !v.is_empty());
        let secret_id = non_empty(SECRET_ID_ENV).ok_or(TencentError::MissingCredential(SECRET_ID_ENV))?;
        let secret_key =
            non_empty(SECRET_KEY_ENV).ok_or(TencentError::MissingCredential(SECRET_KEY_ENV))?;
        Ok(Self {
            secret_id,
            secret_key,
            token: non_empty(SESSION_TOKEN_ENV),
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reads_credentials_and_optional_token() {
        let vars = env(&[
            (SECRET_ID_ENV, "AKIDexample"),
            (SECRET_KEY_ENV, "secret"),
            (SESSION_TOKEN_ENV, "tok"),
        ]);
        let cred = Credential::from_env_with(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(cred.secret_id, "AKIDexample");
        assert_eq!(cred.token.as_deref(), Some("tok"));
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let vars = env(&[(SECRET_ID_ENV, "AKIDexample"), (SECRET_KEY_ENV, "")]);
        let err = Credential::from_env_with(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, TencentError::MissingCredential(SECRET_KEY_ENV)));
    }

    #[test]
    fn debug_hides_secrets() {
        let cred = Credential::new("AKIDexample", "super-secret").with_token("tok");
        let shown = format!("{cred:?}");
        assert!(shown.contains("AKIDexample"));
        assert!(!shown.contains("super-secret"));
        assert!(!shown.contains("tok\""));
    }
}
