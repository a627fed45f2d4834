use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use stakepack_core::{
    ChainTag, ClockPort, ContractHandle, EvmWalletPort, NetworkId, NetworkMatch, ProviderPort,
    ValueAttachment, WalletError, EVM_SEPOLIA,
};

use crate::abi;
use crate::clock::SystemClockAdapter;
use crate::simulation::SimulatedStakeContract;
use crate::AdapterConfig;

const SIMULATED_ACCOUNT: &str = "0x1000000000000000000000000000000000000001";
const USER_REJECTED_REQUEST: i64 = 4001;

/// EIP-1193 wallet (MetaMask and friends) behind the core provider ports.
#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
    clock: SystemClockAdapter,
    receipt_poll_interval: Duration,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Simulated(SimulatedStakeContract),
    #[cfg(not(target_arch = "wasm32"))]
    Proxy(ProxyRuntime),
    #[cfg(target_arch = "wasm32")]
    Browser,
}

#[derive(Debug, Clone)]
#[cfg(not(target_arch = "wasm32"))]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone)]
struct ProviderState {
    accounts: Vec<String>,
    chain_id: u64,
    request_seq: u64,
}

impl Default for ProviderState {
    fn default() -> Self {
        let chain_id = match EVM_SEPOLIA.expected_network {
            NetworkMatch::ChainId(id) => id,
            NetworkMatch::HostContains(_) => 1,
        };
        Self {
            accounts: vec![SIMULATED_ACCOUNT.to_owned()],
            chain_id,
            request_seq: 0,
        }
    }
}

impl Default for Eip1193Adapter {
    fn default() -> Self {
        Self::with_config(AdapterConfig::from_env())
    }
}

impl Eip1193Adapter {
    pub fn with_config(config: AdapterConfig) -> Self {
        #[cfg(target_arch = "wasm32")]
        let mode = if crate::browser::window_prop("ethereum").is_ok() {
            ProviderMode::Browser
        } else if config.strict_runtime_required() {
            ProviderMode::Disabled(
                "EIP-1193 browser provider not found in production runtime profile".to_owned(),
            )
        } else {
            ProviderMode::Simulated(SimulatedStakeContract::new(&EVM_SEPOLIA))
        };

        #[cfg(not(target_arch = "wasm32"))]
        let mode = if let Some(ref base_url) = config.evm_rpc_proxy_url {
            let timeout = Duration::from_millis(config.request_timeout_ms);
            match reqwest::Client::builder().timeout(timeout).build() {
                Ok(client) => ProviderMode::Proxy(ProxyRuntime {
                    base_url: base_url.clone(),
                    client,
                }),
                Err(e) if config.strict_runtime_required() => ProviderMode::Disabled(format!(
                    "failed to initialize EIP-1193 proxy client in production profile: {e}"
                )),
                Err(_) => ProviderMode::Simulated(SimulatedStakeContract::new(&EVM_SEPOLIA)),
            }
        } else if config.strict_runtime_required() {
            ProviderMode::Disabled(
                "EIP-1193 proxy URL not configured in production runtime profile".to_owned(),
            )
        } else {
            ProviderMode::Simulated(SimulatedStakeContract::new(&EVM_SEPOLIA))
        };

        Self::from_mode(mode, &config)
    }

    /// Development adapter backed by the given in-memory contract.
    pub fn simulated(contract: SimulatedStakeContract, config: &AdapterConfig) -> Self {
        Self::from_mode(ProviderMode::Simulated(contract), config)
    }

    fn from_mode(mode: ProviderMode, config: &AdapterConfig) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(ProviderState::default())),
            clock: SystemClockAdapter,
            receipt_poll_interval: Duration::from_millis(config.confirmation_poll_interval_ms),
        }
    }

    pub fn simulation(&self) -> Option<&SimulatedStakeContract> {
        match &self.mode {
            ProviderMode::Simulated(sim) => Some(sim),
            _ => None,
        }
    }

    pub fn debug_set_accounts(&self, accounts: Vec<String>) -> Result<(), WalletError> {
        self.state()?.accounts = accounts;
        Ok(())
    }

    pub fn debug_set_chain_id(&self, chain_id: u64) -> Result<(), WalletError> {
        self.state()?.chain_id = chain_id;
        Ok(())
    }

    fn state(&self) -> Result<MutexGuard<'_, ProviderState>, WalletError> {
        self.state
            .lock()
            .map_err(|e| WalletError::Transport(format!("provider lock poisoned: {e}")))
    }

    fn check_mode(&self) -> Result<(), WalletError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(WalletError::ProviderNotFound(reason.clone()));
        }
        Ok(())
    }

    /// One EIP-1193 `request`, through the proxy or the injected provider.
    async fn rpc(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        self.check_mode()?;
        let id = {
            let mut g = self.state()?;
            g.request_seq = g.request_seq.saturating_add(1);
            g.request_seq
        };
        debug!(id, method, "eip1193 request");
        match &self.mode {
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(proxy) => proxy_call(proxy, id, method, params).await,
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => wasm_request(method, params).await,
            _ => Err(WalletError::NotImplemented(
                "eip1193 request runtime not enabled",
            )),
        }
    }

    fn signer(handle: &ContractHandle) -> Result<&str, WalletError> {
        handle
            .signer
            .as_ref()
            .map(|a| a.address.as_str())
            .ok_or(WalletError::NoSigner)
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn proxy_call(
    proxy: &ProxyRuntime,
    id: u64,
    method: &str,
    params: Value,
) -> Result<Value, WalletError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    });
    let response = proxy
        .client
        .post(&proxy.base_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| WalletError::Transport(format!("eip1193 proxy request failed: {e}")))?;
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| WalletError::Transport(format!("eip1193 proxy json decode failed: {e}")))?;
    if !status.is_success() {
        return Err(WalletError::Transport(format!(
            "eip1193 proxy status {status}: {body}"
        )));
    }
    if let Some(err) = body.get("error") {
        return Err(rpc_error(err));
    }
    body.get("result")
        .cloned()
        .ok_or_else(|| WalletError::Transport("eip1193 proxy missing result".to_owned()))
}

#[cfg(target_arch = "wasm32")]
async fn wasm_request(method: &str, params: Value) -> Result<Value, WalletError> {
    use crate::browser;

    let provider = browser::window_prop("ethereum")?;
    let request = browser::to_js(&json!({ "method": method, "params": params }))?;
    let pending = browser::invoke(&provider, "request", &[request])?;
    match browser::settle_raw(pending).await {
        Ok(result) => browser::from_js(result),
        Err(e) => {
            let code = browser::get_prop(&e, "code").ok().and_then(|c| c.as_f64());
            let message = browser::js_error_message(&e);
            if code == Some(USER_REJECTED_REQUEST as f64) {
                Err(WalletError::ProviderRejected(message))
            } else {
                Err(WalletError::Transport(message))
            }
        }
    }
}

fn rpc_error(err: &Value) -> WalletError {
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| err.to_string());
    if err.get("code").and_then(Value::as_i64) == Some(USER_REJECTED_REQUEST) {
        WalletError::ProviderRejected(message)
    } else {
        WalletError::Transport(message)
    }
}

#[async_trait(?Send)]
impl ProviderPort for Eip1193Adapter {
    fn chain(&self) -> ChainTag {
        ChainTag::Evm
    }

    fn is_injected(&self) -> bool {
        !matches!(self.mode, ProviderMode::Disabled(_))
    }

    async fn network_id(&self) -> Result<NetworkId, WalletError> {
        self.check_mode()?;
        if let ProviderMode::Simulated(_) = self.mode {
            return Ok(NetworkId::ChainId(self.state()?.chain_id));
        }
        let chain_id = json_chain_id_to_u64(&self.rpc("eth_chainId", json!([])).await?)?;
        self.state()?.chain_id = chain_id;
        Ok(NetworkId::ChainId(chain_id))
    }

    fn supports_switch(&self) -> bool {
        self.is_injected()
    }

    async fn switch_network(&self, target: &NetworkMatch) -> Result<(), WalletError> {
        let NetworkMatch::ChainId(chain_id) = *target else {
            return Err(WalletError::Validation(format!(
                "EIP-1193 wallets switch by chain id, not {target}"
            )));
        };
        self.check_mode()?;
        if let ProviderMode::Simulated(_) = self.mode {
            self.state()?.chain_id = chain_id;
            return Ok(());
        }
        self.rpc(
            "wallet_switchEthereumChain",
            json!([{ "chainId": format!("0x{chain_id:x}") }]),
        )
        .await
        .map_err(|e| match e {
            WalletError::Transport(message) => WalletError::ProviderRejected(message),
            other => other,
        })?;
        self.state()?.chain_id = chain_id;
        Ok(())
    }

    async fn call(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[Value],
    ) -> Result<Value, WalletError> {
        self.check_mode()?;
        let data = abi::encode_call(&handle.abi, method, args)?;
        if let ProviderMode::Simulated(sim) = &self.mode {
            return sim.call(method, args);
        }
        let raw = self
            .rpc(
                "eth_call",
                json!([{ "to": handle.address, "data": data.to_string() }, "latest"]),
            )
            .await?;
        abi::decode_output(&handle.abi, method, &abi::parse_hex_data(&raw)?)
    }

    async fn send(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[Value],
        value: Option<&ValueAttachment>,
    ) -> Result<String, WalletError> {
        self.check_mode()?;
        let from = Self::signer(handle)?;
        let data = abi::encode_call(&handle.abi, method, args)?;
        let amount = value.map(|v| v.amount).unwrap_or(U256::ZERO);
        if let ProviderMode::Simulated(sim) = &self.mode {
            return sim.send(from, method, args, amount);
        }

        let mut tx = json!({
            "from": from,
            "to": handle.address,
            "data": data.to_string(),
        });
        if let Some(attached) = value {
            tx[attached.param] = json!(abi::quantity_hex(attached.amount));
        }
        let result = self.rpc("eth_sendTransaction", json!([tx])).await?;
        result.as_str().map(str::to_owned).ok_or_else(|| {
            WalletError::Transport("eth_sendTransaction must return a tx hash".to_owned())
        })
    }

    async fn await_receipt(&self, tx_id: &str) -> Result<Value, WalletError> {
        loop {
            if let Some(receipt) = self.transaction_info(tx_id).await? {
                return Ok(receipt);
            }
            self.clock.sleep(self.receipt_poll_interval).await;
        }
    }

    async fn transaction_info(&self, tx_id: &str) -> Result<Option<Value>, WalletError> {
        self.check_mode()?;
        if let ProviderMode::Simulated(sim) = &self.mode {
            return sim.transaction_info(tx_id);
        }
        let receipt = self
            .rpc("eth_getTransactionReceipt", json!([tx_id]))
            .await?;
        Ok(Some(receipt).filter(|r| !r.is_null()))
    }
}

#[async_trait(?Send)]
impl EvmWalletPort for Eip1193Adapter {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.check_mode()?;
        if let ProviderMode::Simulated(_) = self.mode {
            return Ok(self.state()?.accounts.clone());
        }
        let result = self.rpc("eth_requestAccounts", json!([])).await?;
        let accounts = result
            .as_array()
            .ok_or_else(|| WalletError::Transport("eth_requestAccounts: array expected".to_owned()))?
            .iter()
            .map(|item| {
                item.as_str().map(str::to_owned).ok_or_else(|| {
                    WalletError::Transport("eth_requestAccounts: string expected".to_owned())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.state()?.accounts = accounts.clone();
        Ok(accounts)
    }
}

fn json_chain_id_to_u64(value: &Value) -> Result<u64, WalletError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let s = value
        .as_str()
        .ok_or_else(|| WalletError::Validation("chain id must be string or number".to_owned()))?;
    parse_chain_id_str(s)
}

fn parse_chain_id_str(raw: &str) -> Result<u64, WalletError> {
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| WalletError::Validation(format!("invalid hex chain id: {e}")))
    } else {
        raw.parse()
            .map_err(|e| WalletError::Validation(format!("invalid chain id: {e}")))
    }
}
