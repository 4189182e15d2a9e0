use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Error;

const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_SCORE: f64 = 0.5;

/// Tokens carrying this prefix skip the remote verification entirely.
/// They are minted out-of-band by the campaign owner and are not validated
/// against any store; see DESIGN.md for the trust model.
const BYPASS_PREFIX: &str = "bypass_";

#[async_trait]
pub trait HumanVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<bool, Error>;
}

/// reCAPTCHA-style verifier: posts the client token and the shared secret
/// to the verification service and trusts its success/score answer.
#[derive(Clone, Debug)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    score: Option<f64>,
}

impl RecaptchaVerifier {
    pub fn new(secret: Option<String>) -> Result<RecaptchaVerifier, Error> {
        let client = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .map_err(Error::FailedVerificationCall)?;

        Ok(RecaptchaVerifier { client, secret })
    }
}

#[async_trait]
impl HumanVerifier for RecaptchaVerifier {
    #[tracing::instrument(skip(self, token))]
    async fn verify(&self, token: &str) -> Result<bool, Error> {
        if token.starts_with(BYPASS_PREFIX) {
            tracing::warn!("accepting bypass token without remote verification");
            return Ok(true);
        }

        let secret = match &self.secret {
            Some(secret) => secret,
            None => {
                tracing::warn!("no verification secret configured, admitting claim");
                return Ok(true);
            }
        };

        let response: SiteverifyResponse = self
            .client
            .post(SITEVERIFY_URL)
            .form(&[("secret", secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(Error::FailedVerificationCall)?
            .json()
            .await
            .map_err(Error::FailedVerificationCall)?;

        Ok(response.success && response.score.unwrap_or(1.0) >= MIN_SCORE)
    }
}
