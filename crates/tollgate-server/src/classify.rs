//! Route/credential classification: the first step of the gate.
//!
//! Pure function of the request line, the headers, and the static route
//! table — no side effects, no I/O, never touches the facilitator.

use actix_web::http::header::HeaderMap;

use tollgate::{PaymentCredential, PaymentRequirement, CREDENTIAL_HEADER, CREDENTIAL_HEADER_LEGACY};

use crate::config::RouteTable;

/// Outcome of classifying one inbound request.
#[derive(Debug)]
pub enum Classification<'a> {
    /// Route is not in the table; the gate steps aside entirely.
    NoPaymentRequired,
    /// Route is priced. `credential` is `None` for a bare probe.
    PaymentRequired {
        requirement: &'a PaymentRequirement,
        credential: Option<PaymentCredential>,
    },
}

/// Classify a request against the route table.
///
/// Lookup is an exact method+path match; anything else is free regardless
/// of what headers the caller attached.
pub fn classify<'a>(
    method: &str,
    path: &str,
    headers: &HeaderMap,
    table: &'a RouteTable,
) -> Classification<'a> {
    match table.get(method, path) {
        None => Classification::NoPaymentRequired,
        Some(requirement) => Classification::PaymentRequired {
            requirement,
            credential: extract_credential(headers),
        },
    }
}

/// Pull the payment credential out of the request headers.
///
/// Checks the primary header first, then the legacy one; the first
/// non-empty value wins. The value is carried as an opaque blob.
pub fn extract_credential(headers: &HeaderMap) -> Option<PaymentCredential> {
    for name in [CREDENTIAL_HEADER, CREDENTIAL_HEADER_LEGACY] {
        if let Some(value) = headers.get(name) {
            if let Ok(raw) = value.to_str() {
                let raw = raw.trim();
                if !raw.is_empty() {
                    return Some(PaymentCredential::new(raw));
                }
            }
        }
    }
    None
}
