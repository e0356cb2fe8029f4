//! Proof-of-humanity verification.
//!
//! [`Verifier`] uses enum dispatch instead of trait objects because async
//! methods are not dyn-compatible. Production runs use Cloudflare
//! Turnstile over `reqwest`; local runs and tests use a fixed outcome.

use marquee_core::backend::{BackendError, HumanVerifier};
use serde::Deserialize;

use crate::config::TurnstileConfig;

/// The configured verifier.
pub enum Verifier {
    /// Cloudflare Turnstile `siteverify`.
    Turnstile(TurnstileVerifier),
    /// Always returns the given outcome without any I/O.
    Fixed(bool),
}

impl Verifier {
    /// Build the verifier described by `config`.
    pub fn from_config(config: &TurnstileConfig) -> Self {
        if config.enabled {
            Self::Turnstile(TurnstileVerifier::new(config))
        } else {
            Self::Fixed(true)
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Turnstile(_) => "turnstile",
            Self::Fixed(true) => "accept-all",
            Self::Fixed(false) => "reject-all",
        }
    }
}

impl HumanVerifier for Verifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, BackendError> {
        match self {
            Self::Turnstile(turnstile) => turnstile.verify(token, remote_ip).await,
            Self::Fixed(outcome) => Ok(*outcome),
        }
    }
}

/// Client for the Turnstile `siteverify` endpoint.
pub struct TurnstileVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret_key: String,
}

/// The part of the `siteverify` response we read.
#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl TurnstileVerifier {
    /// Create a verifier from configuration.
    pub fn new(config: &TurnstileConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            verify_url: config.verify_url.clone(),
            secret_key: config.secret_key.clone(),
        }
    }

    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, BackendError> {
        let mut form = vec![("secret", self.secret_key.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let response = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| BackendError::Query(format!("Turnstile request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Query(format!(
                "Turnstile returned {status}"
            )));
        }

        let body: SiteverifyResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Query(format!("Turnstile response parse failed: {e}")))?;

        if !body.success {
            tracing::debug!(errors = ?body.error_codes, "Turnstile rejected token");
        }
        Ok(body.success)
    }
}
