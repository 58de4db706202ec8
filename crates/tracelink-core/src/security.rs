use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::Settings;

/// Length of a password generated when none is configured.
pub const GENERATED_PASSWORD_LEN: usize = 24;

/// The single operator credential pair.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// Build from settings. The flag is `true` when the password was generated.
    pub fn from_settings(settings: &Settings) -> (Self, bool) {
        match &settings.operator_password {
            Some(password) => (
                Self::new(settings.operator_username.clone(), password.clone()),
                false,
            ),
            None => (
                Self::new(settings.operator_username.clone(), generate_password()),
                true,
            ),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Check a presented pair. Both fields are always compared, and each
    /// comparison runs over fixed-size digests so its duration depends on
    /// neither the length nor the content of the inputs.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let user_ok = digest_eq(self.username.as_bytes(), username.as_bytes());
        let pass_ok = digest_eq(self.password.expose_secret().as_bytes(), password.as_bytes());
        bool::from(user_ok & pass_ok)
    }
}

fn digest_eq(expected: &[u8], presented: &[u8]) -> subtle::Choice {
    let expected = Sha256::digest(expected);
    let presented = Sha256::digest(presented);
    expected.as_slice().ct_eq(presented.as_slice())
}

/// Random alphanumeric password.
pub fn generate_password() -> SecretString {
    let raw: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect();
    SecretString::from(raw)
}
