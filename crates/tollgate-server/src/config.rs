use std::collections::HashMap;
use std::time::Duration;

use tollgate::{
    PaymentRequirement, TollgateError, DEFAULT_ASSET, DEFAULT_ASSET_DECIMALS, DEFAULT_NETWORK,
    DEFAULT_VERIFY_TIMEOUT_MS, SCHEME_EXACT,
};

/// Runtime knobs for the payment gate, read once at startup.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Bound on a single verification call; elapsing counts as rejection.
    pub verify_timeout: Duration,
    /// Publish a `payment_required` event for credential-less probes.
    /// Off by default — the first bare probe should not spam observers.
    pub emit_bare_probe: bool,
    pub rate_limit_rpm: u64,
    pub allowed_origins: Vec<String>,
    /// Bearer token guarding `/metrics`.
    pub metrics_token: Option<Vec<u8>>,
    /// Explicit opt-in to unauthenticated `/metrics`.
    pub public_metrics: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            verify_timeout: Duration::from_millis(DEFAULT_VERIFY_TIMEOUT_MS),
            emit_bare_probe: false,
            rate_limit_rpm: 60,
            allowed_origins: vec![],
            metrics_token: None,
            public_metrics: false,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

impl GateConfig {
    pub fn from_env() -> Self {
        let verify_timeout_ms: u64 = std::env::var("VERIFY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_VERIFY_TIMEOUT_MS);

        let rate_limit_rpm: u64 = std::env::var("RATE_LIMIT_RPM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let allowed_origins: Vec<String> = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let metrics_token = std::env::var("METRICS_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.into_bytes());

        Self {
            verify_timeout: Duration::from_millis(verify_timeout_ms),
            emit_bare_probe: env_flag("EMIT_BARE_PROBE"),
            rate_limit_rpm,
            allowed_origins,
            metrics_token,
            public_metrics: env_flag("TOLLGATE_PUBLIC_METRICS"),
        }
    }
}

/// Static method+path to requirement map, read-only after startup.
#[derive(Debug)]
pub struct RouteTable {
    routes: HashMap<String, PaymentRequirement>,
}

impl RouteTable {
    pub fn builder(pay_to: impl Into<String>) -> RouteTableBuilder {
        RouteTableBuilder {
            pay_to: pay_to.into(),
            network: DEFAULT_NETWORK.to_string(),
            asset: DEFAULT_ASSET.to_string(),
            decimals: DEFAULT_ASSET_DECIMALS,
            entries: vec![],
        }
    }

    /// Look up the requirement for an exact `method + path` match.
    pub fn get(&self, method: &str, path: &str) -> Option<&PaymentRequirement> {
        self.routes.get(&route_key(method, path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

pub(crate) fn route_key(method: &str, path: &str) -> String {
    format!("{method} {path}")
}

struct RouteEntry {
    method: String,
    path: String,
    amount: u64,
    description: Option<String>,
}

/// Builder for a [`RouteTable`] with multiple priced routes.
///
/// Validation is deferred to [`build`](Self::build); a malformed entry is a
/// startup error, never a per-request one.
pub struct RouteTableBuilder {
    pay_to: String,
    network: String,
    asset: String,
    decimals: u8,
    entries: Vec<RouteEntry>,
}

impl RouteTableBuilder {
    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    pub fn asset(mut self, asset: impl Into<String>, decimals: u8) -> Self {
        self.asset = asset.into();
        self.decimals = decimals;
        self
    }

    /// Register a priced route. `amount` is in base units of the asset.
    pub fn route(
        mut self,
        method: &str,
        path: &str,
        amount: u64,
        description: Option<&str>,
    ) -> Self {
        self.entries.push(RouteEntry {
            method: method.to_string(),
            path: path.to_string(),
            amount,
            description: description.map(String::from),
        });
        self
    }

    pub fn build(self) -> Result<RouteTable, TollgateError> {
        let mut routes = HashMap::new();
        for entry in self.entries {
            if entry.method.is_empty() || !entry.method.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(TollgateError::Config(format!(
                    "invalid method {:?} for route {:?}",
                    entry.method, entry.path
                )));
            }
            if !entry.path.starts_with('/') {
                return Err(TollgateError::Config(format!(
                    "route path must start with '/': {:?}",
                    entry.path
                )));
            }
            if entry.amount == 0 {
                return Err(TollgateError::Config(format!(
                    "route {} {} has zero amount",
                    entry.method, entry.path
                )));
            }
            let key = route_key(&entry.method, &entry.path);
            let requirement = PaymentRequirement {
                scheme: SCHEME_EXACT.to_string(),
                network: self.network.clone(),
                amount: entry.amount,
                asset: self.asset.clone(),
                decimals: self.decimals,
                pay_to: self.pay_to.clone(),
                description: entry.description,
            };
            if routes.insert(key.clone(), requirement).is_some() {
                return Err(TollgateError::Config(format!("duplicate route {key}")));
            }
        }
        Ok(RouteTable { routes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_registers_routes() {
        let table = RouteTable::builder("0xpayee")
            .route("GET", "/weather", 100, Some("weather data"))
            .route("POST", "/forecast", 250, None)
            .build()
            .unwrap();

        assert_eq!(table.len(), 2);
        let req = table.get("GET", "/weather").unwrap();
        assert_eq!(req.amount, 100);
        assert_eq!(req.scheme, "exact");
        assert_eq!(req.pay_to, "0xpayee");
        assert_eq!(req.description.as_deref(), Some("weather data"));

        assert!(table.get("GET", "/forecast").is_none());
        assert!(table.get("POST", "/forecast").is_some());
    }

    #[test]
    fn unknown_route_is_free() {
        let table = RouteTable::builder("0xpayee")
            .route("GET", "/weather", 100, None)
            .build()
            .unwrap();
        assert!(table.get("GET", "/other").is_none());
        assert!(table.get("POST", "/weather").is_none());
    }

    #[test]
    fn build_rejects_zero_amount() {
        let err = RouteTable::builder("0xpayee")
            .route("GET", "/free", 0, None)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("zero amount"));
    }

    #[test]
    fn build_rejects_bad_method_and_path() {
        assert!(RouteTable::builder("0xpayee")
            .route("get", "/weather", 100, None)
            .build()
            .is_err());
        assert!(RouteTable::builder("0xpayee")
            .route("GET", "weather", 100, None)
            .build()
            .is_err());
    }

    #[test]
    fn build_rejects_duplicate_route() {
        let err = RouteTable::builder("0xpayee")
            .route("GET", "/weather", 100, None)
            .route("GET", "/weather", 200, None)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn default_config_has_sane_timeout() {
        let config = GateConfig::default();
        assert_eq!(config.verify_timeout, Duration::from_millis(2_000));
        assert!(!config.emit_bare_probe);
    }
}
