//! HTTP client adapter for an external facilitator service.
//!
//! Speaks `POST {base}/verify` and `POST {base}/settle` with a JSON body of
//! `{credential, requirement}`. When a shared secret is configured, request
//! bodies are HMAC-signed in the `X-Facilitator-Auth` header so the
//! facilitator can reject unauthenticated callers.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;

use crate::constants::FACILITATOR_AUTH_HEADER;
use crate::error::TollgateError;
use crate::facilitator::Facilitator;
use crate::hmac::sign_body;
use crate::outcome::{SettlementOutcome, VerifyOutcome};
use crate::payment::{PaymentCredential, PaymentRequirement};

/// Default bound on a single facilitator HTTP round trip.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FacilitatorRequest<'a> {
    credential: &'a str,
    requirement: &'a PaymentRequirement,
}

/// Remote Verifier + Settler reached over HTTP.
pub struct RemoteFacilitator {
    client: reqwest::Client,
    base_url: String,
    hmac_secret: Option<Vec<u8>>,
    request_timeout: Duration,
}

impl RemoteFacilitator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            hmac_secret: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sign request bodies with this shared secret.
    pub fn with_hmac_secret(mut self, secret: Vec<u8>) -> Self {
        self.hmac_secret = Some(secret);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post(
        &self,
        path: &str,
        credential: &PaymentCredential,
        requirement: &PaymentRequirement,
    ) -> Result<reqwest::Response, TollgateError> {
        let body = FacilitatorRequest {
            credential: credential.as_str(),
            requirement,
        };
        let body_bytes = serde_json::to_vec(&body)?;

        let mut request = self
            .client
            .post(self.endpoint(path))
            .header("Content-Type", "application/json")
            .timeout(self.request_timeout);

        if let Some(secret) = &self.hmac_secret {
            request = request.header(FACILITATOR_AUTH_HEADER, sign_body(secret, &body_bytes));
        }

        let resp = request
            .body(body_bytes)
            .send()
            .await
            .map_err(|e| TollgateError::Http(format!("facilitator request failed: {e}")))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TollgateError::Http(
                "facilitator authentication failed".to_string(),
            ));
        }
        Ok(resp)
    }
}

impl Facilitator for RemoteFacilitator {
    fn verify<'a>(
        &'a self,
        credential: &'a PaymentCredential,
        requirement: &'a PaymentRequirement,
    ) -> BoxFuture<'a, Result<VerifyOutcome, TollgateError>> {
        async move {
            let resp = self
                .post("verify", credential, requirement)
                .await
                .map_err(|e| TollgateError::Verification(e.to_string()))?;
            resp.json::<VerifyOutcome>()
                .await
                .map_err(|e| TollgateError::Verification(format!("response parse failed: {e}")))
        }
        .boxed()
    }

    fn settle<'a>(
        &'a self,
        credential: &'a PaymentCredential,
        requirement: &'a PaymentRequirement,
    ) -> BoxFuture<'a, Result<SettlementOutcome, TollgateError>> {
        async move {
            let resp = self
                .post("settle", credential, requirement)
                .await
                .map_err(|e| TollgateError::Settlement(e.to_string()))?;
            resp.json::<SettlementOutcome>()
                .await
                .map_err(|e| TollgateError::Settlement(format!("response parse failed: {e}")))
        }
        .boxed()
    }
}
