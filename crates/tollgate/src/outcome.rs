use serde::{Deserialize, Serialize};

/// Result of a synchronous verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl VerifyOutcome {
    pub fn valid(payer: impl Into<String>) -> Self {
        Self {
            valid: true,
            failure_reason: None,
            payer: Some(payer.into()),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            failure_reason: Some(reason.into()),
            payer: None,
        }
    }
}

/// Result of an asynchronous settlement attempt.
///
/// Produced at most once per verified request, consumed once by event
/// emission, never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOutcome {
    pub success: bool,
    /// Opaque settlement reference (e.g. a transaction hash) on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SettlementOutcome {
    pub fn settled(reference: impl Into<String>) -> Self {
        Self {
            success: true,
            reference: Some(reference.into()),
            failure_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reference: None,
            failure_reason: Some(reason.into()),
        }
    }
}
