use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// The fixed set of lifecycle transitions the gateway publishes.
///
/// Per request, `verify_started` precedes `verify_completed`/`verify_failed`
/// and `settle_started` precedes `settle_completed`/`settle_failed`.
/// `payment_required` is only published for bare probes when the gate is
/// configured to announce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PaymentRequired,
    VerifyStarted,
    VerifyCompleted,
    VerifyFailed,
    SettleStarted,
    SettleCompleted,
    SettleFailed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PaymentRequired => "payment_required",
            EventKind::VerifyStarted => "verify_started",
            EventKind::VerifyCompleted => "verify_completed",
            EventKind::VerifyFailed => "verify_failed",
            EventKind::SettleStarted => "settle_started",
            EventKind::SettleCompleted => "settle_completed",
            EventKind::SettleFailed => "settle_failed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry in the lifecycle stream.
///
/// `details` is observability-only: control flow never reads it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
    /// Role tag for whoever acted (typically the payer address).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Role tag for whoever is acted upon (typically the payee).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, request_id: Uuid) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            request_id,
            details: Map::new(),
            actor: None,
            target: None,
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_type_tag() {
        let ev = LifecycleEvent::new(EventKind::VerifyFailed, Uuid::new_v4())
            .with_detail("reason", "authorization expired");
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "verify_failed");
        assert_eq!(json["details"]["reason"], "authorization expired");
        assert!(json.get("actor").is_none());
    }

    #[test]
    fn empty_details_are_omitted() {
        let ev = LifecycleEvent::new(EventKind::SettleStarted, Uuid::new_v4());
        let json = serde_json::to_value(&ev).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn role_tags_roundtrip() {
        let ev = LifecycleEvent::new(EventKind::SettleCompleted, Uuid::new_v4())
            .with_actor("0xpayer")
            .with_target("0xpayee")
            .with_detail("reference", "0xabc123");
        let json = serde_json::to_string(&ev).unwrap();
        let back: LifecycleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }
}
