//! HMAC-SHA256 request signing for remote facilitator calls.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign `body` with the shared secret; returns the hex-encoded MAC.
pub fn sign_body(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    let digest = mac.finalize().into_bytes();

    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Check a hex-encoded signature against `body`.
///
/// Comparison happens inside the hmac crate's `verify_slice`, which is
/// constant-time. A signature that is not valid hex compares against an
/// all-zero MAC rather than short-circuiting.
pub fn verify_body(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);

    let claimed = decode_hex(signature).unwrap_or_else(|| vec![0u8; 32]);
    mac.verify_slice(&claimed).is_ok()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_verifies() {
        let sig = sign_body(b"shared-secret", b"payload bytes");
        assert!(verify_body(b"shared-secret", b"payload bytes", &sig));
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = sign_body(b"secret-a", b"payload");
        assert!(!verify_body(b"secret-b", b"payload", &sig));
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign_body(b"secret", b"original");
        assert!(!verify_body(b"secret", b"tampered", &sig));
    }

    #[test]
    fn non_hex_signature_fails_without_panicking() {
        assert!(!verify_body(b"secret", b"body", "zz-not-hex"));
        assert!(!verify_body(b"secret", b"body", "abc"));
    }
}
