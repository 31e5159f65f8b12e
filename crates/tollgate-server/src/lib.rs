//! Verify-first payment gateway server.
//!
//! Wraps an actix-web application in a payment gate: requests to priced
//! routes must carry a credential that the configured
//! [`Facilitator`](tollgate::Facilitator) verifies before the resource
//! handler runs. Settlement happens after the response has been flushed,
//! off the request path, and every lifecycle transition is published on the
//! shared [`EventBus`](tollgate::EventBus) — observable live on the
//! `GET /events` SSE feed.
//!
//! # Modules
//!
//! - [`config`] — route table builder and environment-driven gate config
//! - [`classify`] — pure route/credential classification
//! - [`middleware`] — the payment gate ([`middleware::payment_gate`])
//! - [`body`] — response body wrapper that triggers settlement on flush
//! - [`routes`] — `/events`, `/health`, `/metrics`
//! - [`metrics`] — Prometheus counters

pub mod body;
pub mod classify;
pub mod config;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use classify::{classify, extract_credential, Classification};
pub use config::{GateConfig, RouteTable, RouteTableBuilder};
pub use middleware::{payment_gate, payment_required_response, VerifiedPayment};
pub use state::GatewayState;
