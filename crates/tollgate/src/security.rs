//! Timing-safe comparison helpers.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Constant-time equality that leaks neither content nor length.
///
/// Both sides are hashed to fixed-width digests first, then compared with
/// `subtle::ConstantTimeEq`. Used for bearer-token checks on the metrics
/// endpoint.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let da = Sha256::digest(a);
    let db = Sha256::digest(b);
    da.ct_eq(&db).into()
}
