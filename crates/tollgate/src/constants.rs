/// Protocol version carried in 402 response bodies.
pub const X402_VERSION: u32 = 1;

/// The only scheme this gateway ships with: pay the exact configured amount.
pub const SCHEME_EXACT: &str = "exact";

/// Primary request header carrying the payment credential.
pub const CREDENTIAL_HEADER: &str = "Payment-Signature";

/// Legacy request header, still accepted for older clients.
pub const CREDENTIAL_HEADER_LEGACY: &str = "X-Payment";

/// Response header on 402 replies, carrying the base64(JSON) requirement.
pub const REQUIREMENT_HEADER: &str = "X-Payment-Required";

/// Header carrying the HMAC signature on remote facilitator requests.
pub const FACILITATOR_AUTH_HEADER: &str = "X-Facilitator-Auth";

/// Default bound on a single verification call, in milliseconds.
/// A verifier that has not answered by then is treated as having rejected.
pub const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 2_000;

/// Default network identifier used when none is configured.
pub const DEFAULT_NETWORK: &str = "eip155:84532";

/// Default asset identifier (testnet USDC) used when none is configured.
pub const DEFAULT_ASSET: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";

/// Decimal precision of the default asset.
pub const DEFAULT_ASSET_DECIMALS: u8 = 6;
