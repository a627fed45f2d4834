#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::Value;

use stakepack_core::{
    ChainProfile, ChainTag, ClockPort, ContractHandle, EvmWalletPort, NetworkId, NetworkMatch,
    ProviderPort, Readiness, StakeContract, TronWalletPort, ValueAttachment, WaitPolicy,
    WalletError, EVM_SEPOLIA, TRON_SHASTA,
};

pub const CONTRACT: &str = "0x000000000000000000000000000000000000BEEF";
pub const EVM_USER: &str = "0x52908400098527886e0f7030069857d2e4169ee7";
pub const EVM_USER_CHECKSUM: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
pub const TRON_USER: &str = "TJRabPrwbZy45sbavfcjinPJC18kjpRTv8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub method: String,
    pub args: Vec<Value>,
    pub value: Option<ValueAttachment>,
}

#[derive(Debug)]
pub struct MockState {
    pub accounts: Vec<String>,
    pub account_requests: u32,
    pub reject_accounts: Option<String>,
    pub has_request_api: bool,
    /// `None` keeps the provider pending forever.
    pub ready_after_checks: Option<u32>,
    pub readiness_checks: u32,
    pub default_address: Option<String>,
    pub network: NetworkId,
    pub network_reads: u32,
    pub can_switch: bool,
    pub reject_switch: bool,
    pub switch_requests: u32,
    pub calls: Vec<String>,
    pub call_responses: HashMap<String, Result<Value, WalletError>>,
    pub sends: Vec<SentTx>,
    pub send_error: Option<WalletError>,
    pub empty_polls: u32,
    pub polls: u32,
    pub tx_info: Value,
    pub cancel_on_poll: Option<(u32, stakepack_core::CancelToken)>,
    pub poll_error: Option<WalletError>,
    /// `None` leaves the receipt future pending.
    pub event_receipt: Option<Result<Value, WalletError>>,
}

pub struct MockProvider {
    pub chain: ChainTag,
    pub injected: bool,
    state: Mutex<MockState>,
}

impl MockProvider {
    pub fn evm() -> Self {
        Self::new(ChainTag::Evm, NetworkId::ChainId(11_155_111))
    }

    pub fn tron() -> Self {
        Self::new(
            ChainTag::Tron,
            NetworkId::Host("https://api.shasta.trongrid.io".to_owned()),
        )
    }

    fn new(chain: ChainTag, network: NetworkId) -> Self {
        Self {
            chain,
            injected: true,
            state: Mutex::new(MockState {
                accounts: vec![EVM_USER.to_owned()],
                account_requests: 0,
                reject_accounts: None,
                has_request_api: true,
                ready_after_checks: Some(0),
                readiness_checks: 0,
                default_address: Some(TRON_USER.to_owned()),
                network,
                network_reads: 0,
                can_switch: true,
                reject_switch: false,
                switch_requests: 0,
                calls: Vec::new(),
                call_responses: HashMap::new(),
                sends: Vec::new(),
                send_error: None,
                empty_polls: 0,
                polls: 0,
                tx_info: serde_json::json!({
                    "id": "tron-tx-1",
                    "blockNumber": 4242,
                    "receipt": { "result": "SUCCESS" }
                }),
                cancel_on_poll: None,
                poll_error: None,
                event_receipt: Some(Ok(serde_json::json!({
                    "transactionHash": "0xabc",
                    "status": "0x1",
                    "blockNumber": "0x10"
                }))),
            }),
        }
    }

    pub fn not_injected(mut self) -> Self {
        self.injected = false;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock")
    }

    pub fn respond(&self, key: &str, value: Value) {
        self.state().call_responses.insert(key.to_owned(), Ok(value));
    }

    pub fn fail(&self, key: &str, message: &str) {
        self.state().call_responses.insert(
            key.to_owned(),
            Err(WalletError::Transport(message.to_owned())),
        );
    }

    /// Standard dashboard reads plus three packs.
    pub fn with_contract_state(self) -> Self {
        self.respond("creditsOf", serde_json::json!("5000"));
        self.respond("totalStakedWei", serde_json::json!({ "_hex": "0x0f4240" }));
        self.respond("stakedBalanceWei", serde_json::json!(250_000));
        self.respond("totalSupply", serde_json::json!("0x07"));
        self.respond("getPack(0)", serde_json::json!([100, 5, true]));
        self.respond(
            "getPack(1)",
            serde_json::json!({ "priceWei": "200", "creditCost": "10", "active": true }),
        );
        self.respond("getPack(2)", serde_json::json!([300, 15, true]));
        self.respond("userPackBalance", serde_json::json!("2"));
        self
    }
}

fn arg_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn call_key(method: &str, args: &[Value]) -> String {
    let args: Vec<String> = args.iter().map(arg_text).collect();
    format!("{method}({})", args.join(","))
}

#[async_trait(?Send)]
impl ProviderPort for MockProvider {
    fn chain(&self) -> ChainTag {
        self.chain
    }

    fn is_injected(&self) -> bool {
        self.injected
    }

    async fn network_id(&self) -> Result<NetworkId, WalletError> {
        let mut g = self.state();
        g.network_reads += 1;
        Ok(g.network.clone())
    }

    fn supports_switch(&self) -> bool {
        self.state().can_switch
    }

    async fn switch_network(&self, target: &NetworkMatch) -> Result<(), WalletError> {
        let mut g = self.state();
        g.switch_requests += 1;
        if g.reject_switch {
            return Err(WalletError::ProviderRejected("user rejected switch".to_owned()));
        }
        if let NetworkMatch::ChainId(id) = target {
            g.network = NetworkId::ChainId(*id);
        }
        Ok(())
    }

    async fn call(
        &self,
        _handle: &ContractHandle,
        method: &str,
        args: &[Value],
    ) -> Result<Value, WalletError> {
        let key = call_key(method, args);
        let mut g = self.state();
        g.calls.push(key.clone());
        g.call_responses
            .get(&key)
            .or_else(|| g.call_responses.get(method))
            .cloned()
            .unwrap_or_else(|| Err(WalletError::Transport(format!("no scripted response for {key}"))))
    }

    async fn send(
        &self,
        _handle: &ContractHandle,
        method: &str,
        args: &[Value],
        value: Option<&ValueAttachment>,
    ) -> Result<String, WalletError> {
        let mut g = self.state();
        if let Some(err) = g.send_error.clone() {
            return Err(err);
        }
        g.sends.push(SentTx {
            method: method.to_owned(),
            args: args.to_vec(),
            value: value.cloned(),
        });
        Ok(format!("tx-{}", g.sends.len()))
    }

    async fn await_receipt(&self, _tx_id: &str) -> Result<Value, WalletError> {
        let scripted = self.state().event_receipt.clone();
        match scripted {
            Some(result) => result,
            None => futures::future::pending().await,
        }
    }

    async fn transaction_info(&self, _tx_id: &str) -> Result<Option<Value>, WalletError> {
        let mut g = self.state();
        g.polls += 1;
        if let Some((at, token)) = &g.cancel_on_poll {
            if g.polls >= *at {
                token.cancel();
            }
        }
        if let Some(err) = g.poll_error.clone() {
            return Err(err);
        }
        if g.empty_polls > 0 {
            g.empty_polls -= 1;
            return Ok(Some(serde_json::json!({})));
        }
        Ok(Some(g.tx_info.clone()))
    }
}

#[async_trait(?Send)]
impl EvmWalletPort for MockProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        {
            let mut g = self.state();
            g.account_requests += 1;
            if let Some(reason) = g.reject_accounts.clone() {
                return Err(WalletError::ProviderRejected(reason));
            }
        }
        // Let a concurrent caller observe the in-flight connect.
        tokio::task::yield_now().await;
        Ok(self.state().accounts.clone())
    }
}

#[async_trait(?Send)]
impl TronWalletPort for MockProvider {
    fn has_request_api(&self) -> bool {
        self.state().has_request_api
    }

    async fn request_accounts(&self) -> Result<(), WalletError> {
        let mut g = self.state();
        g.account_requests += 1;
        match g.reject_accounts.clone() {
            Some(reason) => Err(WalletError::Transport(reason)),
            None => Ok(()),
        }
    }

    fn readiness(&self) -> Readiness {
        let mut g = self.state();
        let check = g.readiness_checks;
        g.readiness_checks += 1;
        match g.ready_after_checks {
            Some(after) if check >= after => Readiness::Ready {
                default_address: g.default_address.clone(),
            },
            _ => Readiness::Pending,
        }
    }
}

/// Clock whose sleeps complete instantly and advance virtual time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
    sleeps: AtomicU32,
}

impl ManualClock {
    pub fn sleeps(&self) -> u32 {
        self.sleeps.load(Ordering::SeqCst)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl ClockPort for ManualClock {
    fn now_ms(&self) -> Result<u64, WalletError> {
        Ok(self.now.load(Ordering::SeqCst))
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.now
            .fetch_add(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }
}

/// Clock whose sleeps never finish, so only cancellation can end a wait.
#[derive(Debug, Default)]
pub struct StalledClock {
    sleeps: AtomicU32,
}

impl StalledClock {
    pub fn sleeps(&self) -> u32 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl ClockPort for StalledClock {
    fn now_ms(&self) -> Result<u64, WalletError> {
        Ok(0)
    }

    async fn sleep(&self, _duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        futures::future::pending::<()>().await;
    }
}

pub fn contract(
    provider: &Arc<MockProvider>,
    clock: &Arc<ManualClock>,
    profile: ChainProfile,
) -> StakeContract<MockProvider, ManualClock> {
    StakeContract::new(
        Arc::clone(provider),
        Arc::clone(clock),
        profile,
        CONTRACT,
        WaitPolicy::default(),
    )
    .expect("bundled abi parses")
}

pub fn evm_contract(
    provider: &Arc<MockProvider>,
    clock: &Arc<ManualClock>,
) -> StakeContract<MockProvider, ManualClock> {
    contract(provider, clock, EVM_SEPOLIA)
}

pub fn tron_contract(
    provider: &Arc<MockProvider>,
    clock: &Arc<ManualClock>,
) -> StakeContract<MockProvider, ManualClock> {
    contract(provider, clock, TRON_SHASTA)
}

pub fn units(n: u64) -> U256 {
    U256::from(n)
}
