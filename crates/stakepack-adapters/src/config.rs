use std::time::Duration;

use stakepack_core::WaitPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeProfile {
    Development,
    Production,
}

impl RuntimeProfile {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(Self::Development),
            "prod" | "production" => Some(Self::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub runtime_profile: RuntimeProfile,
    /// JSON-RPC endpoint standing in for an injected EVM wallet on native
    /// targets.
    pub evm_rpc_proxy_url: Option<String>,
    pub request_timeout_ms: u64,
    pub tron_ready_poll_interval_ms: u64,
    pub tron_ready_budget_ms: u64,
    pub confirmation_poll_interval_ms: u64,
    pub confirmation_timeout_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Development,
            evm_rpc_proxy_url: None,
            request_timeout_ms: 15_000,
            tron_ready_poll_interval_ms: 100,
            tron_ready_budget_ms: 8_000,
            confirmation_poll_interval_ms: 1_000,
            confirmation_timeout_ms: 180_000,
        }
    }
}

impl AdapterConfig {
    /// Defaults overridden by `STAKEPACK_*` variables. Unparsable values keep
    /// the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(profile) = lookup("STAKEPACK_RUNTIME_PROFILE")
            .as_deref()
            .and_then(RuntimeProfile::parse)
        {
            cfg.runtime_profile = profile;
        }
        cfg.evm_rpc_proxy_url = lookup("STAKEPACK_EVM_RPC_PROXY_URL")
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty());

        let millis = |key: &str, fallback: u64| {
            lookup(key)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .unwrap_or(fallback)
        };
        cfg.request_timeout_ms = millis("STAKEPACK_REQUEST_TIMEOUT_MS", cfg.request_timeout_ms);
        cfg.tron_ready_poll_interval_ms =
            millis("STAKEPACK_TRON_READY_POLL_MS", cfg.tron_ready_poll_interval_ms);
        cfg.tron_ready_budget_ms =
            millis("STAKEPACK_TRON_READY_BUDGET_MS", cfg.tron_ready_budget_ms);
        cfg.confirmation_poll_interval_ms = millis(
            "STAKEPACK_CONFIRMATION_POLL_MS",
            cfg.confirmation_poll_interval_ms,
        );
        cfg.confirmation_timeout_ms = millis(
            "STAKEPACK_CONFIRMATION_TIMEOUT_MS",
            cfg.confirmation_timeout_ms,
        );
        cfg
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            ready_poll_interval: Duration::from_millis(self.tron_ready_poll_interval_ms),
            ready_budget: Duration::from_millis(self.tron_ready_budget_ms),
            confirmation_poll_interval: Duration::from_millis(self.confirmation_poll_interval_ms),
            confirmation_timeout: Duration::from_millis(self.confirmation_timeout_ms),
        }
    }
}
