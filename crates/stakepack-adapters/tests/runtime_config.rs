use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use stakepack_adapters::{AdapterConfig, RuntimeProfile, SystemClockAdapter, TronLinkAdapter};
use stakepack_core::{
    ClockPort, ProviderPort, TronConnector, WalletConnector, WalletError, WalletSession,
    TRON_SHASTA,
};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn empty_environment_keeps_defaults() {
    let cfg = AdapterConfig::from_lookup(lookup(&[]));
    assert_eq!(cfg.runtime_profile, RuntimeProfile::Development);
    assert_eq!(cfg.evm_rpc_proxy_url, None);
    assert_eq!(cfg.request_timeout_ms, 15_000);
    assert_eq!(cfg.tron_ready_poll_interval_ms, 100);
    assert_eq!(cfg.tron_ready_budget_ms, 8_000);
    assert_eq!(cfg.confirmation_poll_interval_ms, 1_000);
    assert_eq!(cfg.confirmation_timeout_ms, 180_000);
    assert!(!cfg.strict_runtime_required());
}

#[test]
fn variables_override_defaults() {
    let cfg = AdapterConfig::from_lookup(lookup(&[
        ("STAKEPACK_RUNTIME_PROFILE", " Prod "),
        ("STAKEPACK_EVM_RPC_PROXY_URL", "http://127.0.0.1:8545"),
        ("STAKEPACK_REQUEST_TIMEOUT_MS", "2500"),
        ("STAKEPACK_TRON_READY_POLL_MS", "50"),
        ("STAKEPACK_TRON_READY_BUDGET_MS", "1000"),
        ("STAKEPACK_CONFIRMATION_POLL_MS", "250"),
        ("STAKEPACK_CONFIRMATION_TIMEOUT_MS", "60000"),
    ]));
    assert_eq!(cfg.runtime_profile, RuntimeProfile::Production);
    assert!(cfg.strict_runtime_required());
    assert_eq!(cfg.evm_rpc_proxy_url.as_deref(), Some("http://127.0.0.1:8545"));
    assert_eq!(cfg.request_timeout_ms, 2_500);

    let policy = cfg.wait_policy();
    assert_eq!(policy.ready_poll_interval, Duration::from_millis(50));
    assert_eq!(policy.ready_budget, Duration::from_millis(1_000));
    assert_eq!(policy.confirmation_poll_interval, Duration::from_millis(250));
    assert_eq!(policy.confirmation_timeout, Duration::from_secs(60));
}

#[test]
fn unparsable_values_fall_back() {
    let cfg = AdapterConfig::from_lookup(lookup(&[
        ("STAKEPACK_RUNTIME_PROFILE", "staging"),
        ("STAKEPACK_EVM_RPC_PROXY_URL", "   "),
        ("STAKEPACK_REQUEST_TIMEOUT_MS", "soon"),
        ("STAKEPACK_CONFIRMATION_TIMEOUT_MS", "-1"),
    ]));
    assert_eq!(cfg.runtime_profile, RuntimeProfile::Development);
    assert_eq!(cfg.evm_rpc_proxy_url, None);
    assert_eq!(cfg.request_timeout_ms, 15_000);
    assert_eq!(cfg.confirmation_timeout_ms, 180_000);
}

#[test]
fn development_aliases_parse() {
    for raw in ["dev", "DEVELOPMENT"] {
        let cfg = AdapterConfig::from_lookup(lookup(&[("STAKEPACK_RUNTIME_PROFILE", raw)]));
        assert_eq!(cfg.runtime_profile, RuntimeProfile::Development, "{raw}");
    }
}

#[tokio::test]
async fn native_production_tron_is_disabled() {
    let cfg = AdapterConfig {
        runtime_profile: RuntimeProfile::Production,
        ..AdapterConfig::default()
    };
    let adapter = Arc::new(TronLinkAdapter::with_config(cfg.clone()));
    assert!(!adapter.is_injected());
    assert!(adapter.simulation().is_none());

    let err = TronConnector::new(adapter, Arc::new(SystemClockAdapter), cfg.wait_policy())
        .connect(&WalletSession::new(TRON_SHASTA))
        .await
        .expect_err("no tronlink outside a browser");
    assert!(matches!(err, WalletError::ProviderNotFound(_)));
}

#[tokio::test]
async fn system_clock_advances_across_sleep() {
    let clock = SystemClockAdapter;
    let before = clock.now_ms().expect("now");
    assert!(before > 1_600_000_000_000);
    clock.sleep(Duration::from_millis(20)).await;
    let after = clock.now_ms().expect("now");
    assert!(after >= before + 15, "before={before} after={after}");
}
