//! The Verifier/Settler contract the gateway depends on.
//!
//! A facilitator is whoever can answer "is this credential good for this
//! requirement" (synchronously, inside the request path) and later finalize
//! the payment (asynchronously, after the response is gone). The gateway
//! owns the contract; implementations own the credential format.
//!
//! Two adapters ship with this crate:
//!
//! - [`LocalFacilitator`](crate::LocalFacilitator) — in-process, for
//!   development and tests
//! - [`RemoteFacilitator`](crate::RemoteFacilitator) — HTTP client for an
//!   external facilitator service

use futures::future::BoxFuture;

use crate::error::TollgateError;
use crate::outcome::{SettlementOutcome, VerifyOutcome};
use crate::payment::{PaymentCredential, PaymentRequirement};

/// Verifies and settles payments. Object-safe so the gateway can hold
/// `Arc<dyn Facilitator>` and swap adapters at startup.
pub trait Facilitator: Send + Sync {
    /// Check a credential against a route's requirement.
    ///
    /// Called inside the request path; the gateway wraps it in a timeout
    /// and treats both `Err` and elapsed time as a rejection, never a
    /// crash. Implementations may do network I/O.
    fn verify<'a>(
        &'a self,
        credential: &'a PaymentCredential,
        requirement: &'a PaymentRequirement,
    ) -> BoxFuture<'a, Result<VerifyOutcome, TollgateError>>;

    /// Finalize a previously verified payment.
    ///
    /// The gateway guarantees at most one call per verified request and
    /// only ever invokes it after the response has been released, so this
    /// may take on-chain-confirmation time without hurting latency.
    fn settle<'a>(
        &'a self,
        credential: &'a PaymentCredential,
        requirement: &'a PaymentRequirement,
    ) -> BoxFuture<'a, Result<SettlementOutcome, TollgateError>>;
}
