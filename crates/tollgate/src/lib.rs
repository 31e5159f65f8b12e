//! Verify-first pay-per-request gateway core.
//!
//! Implements the protocol-neutral half of an HTTP 402 paywall: a protected
//! route is served only after a caller attaches a payment credential that a
//! [`Facilitator`] verifies synchronously. Settlement runs detached, after
//! the response has been released, and every transition is published on an
//! in-process [`EventBus`] for dashboards and log sinks.
//!
//! # Request lifecycle
//!
//! ```text
//! classified -> payment_pending -> verifying -> verified -> response sent
//!                                           \-> rejected
//! response sent -> settling -> settled | settlement_failed
//! ```
//!
//! The ordering invariants the gateway protects:
//!
//! - the response is never held up waiting for settlement
//! - settlement runs at most once per verified request
//! - lifecycle events for one request are observed in emission order
//!
//! # Quick example
//!
//! ```
//! use tollgate::{EventBus, EventKind, LifecycleEvent};
//! use uuid::Uuid;
//!
//! let bus = EventBus::new();
//! let (handle, mut rx) = bus.subscribe();
//!
//! let request_id = Uuid::new_v4();
//! bus.publish(LifecycleEvent::new(EventKind::VerifyStarted, request_id));
//!
//! let event = rx.try_recv().unwrap();
//! assert_eq!(event.kind, EventKind::VerifyStarted);
//! bus.unsubscribe(handle);
//! ```
//!
//! The HTTP middleware that drives this lifecycle lives in the
//! `tollgate-server` crate; this crate has no dependency on any web
//! framework.

pub mod bus;
pub mod constants;
pub mod error;
pub mod events;
pub mod facilitator;
pub mod facilitator_local;
pub mod facilitator_remote;
pub mod hmac;
pub mod outcome;
pub mod payment;
pub mod security;

pub use bus::{EventBus, SubscriberHandle};
pub use constants::*;
pub use error::TollgateError;
pub use events::{EventKind, LifecycleEvent};
pub use facilitator::Facilitator;
pub use facilitator_local::{CredentialClaims, LocalFacilitator};
pub use facilitator_remote::RemoteFacilitator;
pub use outcome::{SettlementOutcome, VerifyOutcome};
pub use payment::{
    decode_requirement_header, encode_requirement_header, PaymentCredential, PaymentRequiredBody,
    PaymentRequirement, RequestContext,
};
