use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TollgateError;
use crate::outcome::VerifyOutcome;

/// What a protected route demands before it is served.
///
/// Attached to route configuration at startup and read-only afterwards.
/// `amount` is an integer in base units of `asset` (`decimals` precision).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirement {
    pub scheme: String,
    pub network: String,
    pub amount: u64,
    pub asset: String,
    pub decimals: u8,
    pub pay_to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Opaque caller-supplied proof of payment.
///
/// The gateway only ever checks presence; the credential's structure is
/// owned by whichever [`Facilitator`](crate::Facilitator) verifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentCredential(String);

impl PaymentCredential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PaymentCredential {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Per-request state, created when the gate first sees a request and
/// discarded when the request finishes. Never shared across requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: Uuid,
    /// Route key in `"METHOD /path"` form.
    pub route: String,
    pub credential: Option<PaymentCredential>,
    /// Populated only after a successful verification.
    pub verified: Option<VerifyOutcome>,
}

impl RequestContext {
    pub fn new(route: impl Into<String>, credential: Option<PaymentCredential>) -> Self {
        Self {
            id: Uuid::new_v4(),
            route: route.into(),
            credential,
            verified: None,
        }
    }
}

/// The 402 response body returned to callers that have not paid yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredBody {
    pub x402_version: u32,
    pub accepts: Vec<PaymentRequirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Encode a requirement for the `X-Payment-Required` response header.
pub fn encode_requirement_header(requirement: &PaymentRequirement) -> Result<String, TollgateError> {
    let json = serde_json::to_vec(requirement)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

/// Decode the `X-Payment-Required` header back into a requirement.
/// Used by clients and tests; the gateway itself only encodes.
pub fn decode_requirement_header(value: &str) -> Result<PaymentRequirement, TollgateError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| TollgateError::InvalidCredential(format!("invalid base64: {e}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_ASSET, DEFAULT_NETWORK, SCHEME_EXACT};

    fn requirement() -> PaymentRequirement {
        PaymentRequirement {
            scheme: SCHEME_EXACT.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            amount: 100,
            asset: DEFAULT_ASSET.to_string(),
            decimals: 6,
            pay_to: "0xpayee".to_string(),
            description: Some("weather data".to_string()),
        }
    }

    #[test]
    fn requirement_header_roundtrip() {
        let req = requirement();
        let header = encode_requirement_header(&req).unwrap();
        let decoded = decode_requirement_header(&header).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn requirement_header_rejects_garbage() {
        assert!(decode_requirement_header("not base64 at all!!!").is_err());
    }

    #[test]
    fn requirement_serializes_camel_case() {
        let json = serde_json::to_value(requirement()).unwrap();
        assert_eq!(json["payTo"], "0xpayee");
        assert_eq!(json["amount"], 100);
        assert_eq!(json["scheme"], "exact");
    }

    #[test]
    fn request_context_starts_unverified() {
        let ctx = RequestContext::new("GET /weather", Some(PaymentCredential::new("blob")));
        assert!(ctx.verified.is_none());
        assert_eq!(ctx.route, "GET /weather");
    }
}
