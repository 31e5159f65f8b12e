//! In-process facilitator for development and tests.
//!
//! This adapter owns a deliberately simple credential format: base64-encoded
//! JSON [`CredentialClaims`]. It does no cryptography — it exists so the
//! gateway, demos, and tests can run without an external facilitator or a
//! chain connection. Production deployments point the gateway at a
//! [`RemoteFacilitator`](crate::RemoteFacilitator) instead.

use base64::Engine;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TollgateError;
use crate::facilitator::Facilitator;
use crate::outcome::{SettlementOutcome, VerifyOutcome};
use crate::payment::{PaymentCredential, PaymentRequirement};

/// The claims a local credential carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialClaims {
    pub payer: String,
    /// Amount offered, in base units of the route's asset.
    pub amount: u64,
    pub pay_to: String,
    /// Unix seconds after which the authorization is dead.
    pub valid_before: u64,
}

impl CredentialClaims {
    /// Encode these claims as a wire credential (base64 JSON).
    pub fn to_credential(&self) -> Result<PaymentCredential, TollgateError> {
        let json = serde_json::to_vec(self)?;
        Ok(PaymentCredential::new(
            base64::engine::general_purpose::STANDARD.encode(json),
        ))
    }
}

/// Dev/demo Verifier + Settler that accepts structurally sound credentials.
pub struct LocalFacilitator;

impl LocalFacilitator {
    pub fn new() -> Self {
        Self
    }

    fn check(
        &self,
        credential: &PaymentCredential,
        requirement: &PaymentRequirement,
    ) -> VerifyOutcome {
        let bytes = match base64::engine::general_purpose::STANDARD.decode(credential.as_str()) {
            Ok(b) => b,
            Err(_) => return VerifyOutcome::invalid("malformed credential: not base64"),
        };
        let claims: CredentialClaims = match serde_json::from_slice(&bytes) {
            Ok(c) => c,
            Err(_) => return VerifyOutcome::invalid("malformed credential: bad claims"),
        };

        if claims.pay_to != requirement.pay_to {
            return VerifyOutcome::invalid("payee mismatch");
        }
        if claims.amount < requirement.amount {
            return VerifyOutcome::invalid(format!(
                "insufficient amount: offered {}, required {}",
                claims.amount, requirement.amount
            ));
        }
        let now = Utc::now().timestamp().max(0) as u64;
        if claims.valid_before <= now {
            return VerifyOutcome::invalid("authorization expired");
        }

        VerifyOutcome::valid(claims.payer)
    }
}

impl Default for LocalFacilitator {
    fn default() -> Self {
        Self::new()
    }
}

impl Facilitator for LocalFacilitator {
    fn verify<'a>(
        &'a self,
        credential: &'a PaymentCredential,
        requirement: &'a PaymentRequirement,
    ) -> BoxFuture<'a, Result<VerifyOutcome, TollgateError>> {
        async move { Ok(self.check(credential, requirement)) }.boxed()
    }

    fn settle<'a>(
        &'a self,
        credential: &'a PaymentCredential,
        requirement: &'a PaymentRequirement,
    ) -> BoxFuture<'a, Result<SettlementOutcome, TollgateError>> {
        async move {
            // Re-check before settling; a credential can expire between
            // verification and the response finishing.
            let outcome = self.check(credential, requirement);
            if !outcome.valid {
                let reason = outcome
                    .failure_reason
                    .unwrap_or_else(|| "verification failed".to_string());
                tracing::warn!(reason = %reason, "local settlement refused");
                return Ok(SettlementOutcome::failed(reason));
            }
            Ok(SettlementOutcome::settled(format!("local-{}", Uuid::new_v4())))
        }
        .boxed()
    }
}
