#![allow(dead_code)]

use std::sync::Arc;

use alloy::primitives::U256;

use stakepack_adapters::{
    AdapterConfig, Eip1193Adapter, SimulatedStakeContract, SystemClockAdapter, TronLinkAdapter,
};
use stakepack_core::{StakeContract, EVM_SEPOLIA, TRON_SHASTA};

pub const CONTRACT: &str = "0x000000000000000000000000000000000000BEEF";
pub const TRON_CONTRACT: &str = "TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf";
pub const SIMULATED_EVM_ACCOUNT: &str = "0x1000000000000000000000000000000000000001";
pub const SIMULATED_TRON_ACCOUNT: &str = "TJRabPrwbZy45sbavfcjinPJC18kjpRTv8";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_test_writer()
        .try_init();
}

/// Development config with millisecond waits so real sleeps stay short.
pub fn fast_config() -> AdapterConfig {
    AdapterConfig {
        tron_ready_poll_interval_ms: 1,
        tron_ready_budget_ms: 200,
        confirmation_poll_interval_ms: 1,
        confirmation_timeout_ms: 5_000,
        ..AdapterConfig::default()
    }
}

pub fn whole(units: u64, exponent: u8) -> U256 {
    U256::from(units) * U256::from(10u64).pow(U256::from(exponent))
}

pub struct EvmStack {
    pub adapter: Arc<Eip1193Adapter>,
    pub sim: SimulatedStakeContract,
    pub contract: StakeContract<Eip1193Adapter, SystemClockAdapter>,
}

pub fn evm_stack(config: &AdapterConfig) -> EvmStack {
    let sim = SimulatedStakeContract::new(&EVM_SEPOLIA);
    let adapter = Arc::new(Eip1193Adapter::simulated(sim.clone(), config));
    let contract = StakeContract::new(
        Arc::clone(&adapter),
        Arc::new(SystemClockAdapter),
        EVM_SEPOLIA,
        CONTRACT,
        config.wait_policy(),
    )
    .expect("bundled abi parses");
    EvmStack {
        adapter,
        sim,
        contract,
    }
}

pub struct TronStack {
    pub adapter: Arc<TronLinkAdapter>,
    pub sim: SimulatedStakeContract,
    pub contract: StakeContract<TronLinkAdapter, SystemClockAdapter>,
}

pub fn tron_stack(config: &AdapterConfig) -> TronStack {
    let sim = SimulatedStakeContract::new(&TRON_SHASTA);
    let adapter = Arc::new(TronLinkAdapter::simulated(sim.clone(), config));
    let contract = StakeContract::new(
        Arc::clone(&adapter),
        Arc::new(SystemClockAdapter),
        TRON_SHASTA,
        TRON_CONTRACT,
        config.wait_policy(),
    )
    .expect("bundled abi parses");
    TronStack {
        adapter,
        sim,
        contract,
    }
}
