use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use stakepack_core::{
    ChainTag, ClockPort, ContractHandle, NetworkId, NetworkMatch, ProviderPort, Readiness,
    TronWalletPort, ValueAttachment, WalletError, TRON_SHASTA,
};

use crate::clock::SystemClockAdapter;
use crate::simulation::SimulatedStakeContract;
use crate::AdapterConfig;

/// Largest `callValue` TronWeb accepts without losing precision
/// (`Number.MAX_SAFE_INTEGER`).
pub const MAX_SAFE_CALL_VALUE: u64 = (1 << 53) - 1;

const SIMULATED_ADDRESS: &str = "TJRabPrwbZy45sbavfcjinPJC18kjpRTv8";
const SIMULATED_HOST: &str = "https://api.shasta.trongrid.io";

/// TronLink wallet and its injected TronWeb behind the core provider ports.
#[derive(Debug, Clone)]
pub struct TronLinkAdapter {
    mode: TronMode,
    state: Arc<Mutex<SimulatedWallet>>,
    clock: SystemClockAdapter,
    info_poll_interval: Duration,
}

#[derive(Debug, Clone)]
enum TronMode {
    Disabled(String),
    Simulated(SimulatedStakeContract),
    #[cfg(target_arch = "wasm32")]
    Browser,
}

/// Wallet-side knobs of the simulated mode.
#[derive(Debug, Clone)]
struct SimulatedWallet {
    has_request_api: bool,
    reject_requests: Option<String>,
    account_requests: u32,
    ready_after_checks: Option<u32>,
    readiness_checks: u32,
    default_address: Option<String>,
    host: String,
}

impl Default for SimulatedWallet {
    fn default() -> Self {
        Self {
            has_request_api: true,
            reject_requests: None,
            account_requests: 0,
            ready_after_checks: Some(2),
            readiness_checks: 0,
            default_address: Some(SIMULATED_ADDRESS.to_owned()),
            host: SIMULATED_HOST.to_owned(),
        }
    }
}

impl Default for TronLinkAdapter {
    fn default() -> Self {
        Self::with_config(AdapterConfig::from_env())
    }
}

impl TronLinkAdapter {
    pub fn with_config(config: AdapterConfig) -> Self {
        #[cfg(target_arch = "wasm32")]
        let mode = if browser_tron_available() {
            TronMode::Browser
        } else if config.strict_runtime_required() {
            TronMode::Disabled("TronLink not found in production runtime profile".to_owned())
        } else {
            TronMode::Simulated(SimulatedStakeContract::new(&TRON_SHASTA))
        };

        #[cfg(not(target_arch = "wasm32"))]
        let mode = if config.strict_runtime_required() {
            TronMode::Disabled(
                "TronLink is only reachable from a browser runtime".to_owned(),
            )
        } else {
            TronMode::Simulated(SimulatedStakeContract::new(&TRON_SHASTA))
        };

        Self::from_mode(mode, &config)
    }

    pub fn simulated(contract: SimulatedStakeContract, config: &AdapterConfig) -> Self {
        Self::from_mode(TronMode::Simulated(contract), config)
    }

    fn from_mode(mode: TronMode, config: &AdapterConfig) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(SimulatedWallet::default())),
            clock: SystemClockAdapter,
            info_poll_interval: Duration::from_millis(config.confirmation_poll_interval_ms),
        }
    }

    pub fn simulation(&self) -> Option<&SimulatedStakeContract> {
        match &self.mode {
            TronMode::Simulated(sim) => Some(sim),
            _ => None,
        }
    }

    /// `None` keeps the simulated TronWeb pending forever.
    pub fn debug_set_ready_after(&self, checks: Option<u32>) -> Result<(), WalletError> {
        let mut g = self.wallet()?;
        g.ready_after_checks = checks;
        g.readiness_checks = 0;
        Ok(())
    }

    pub fn debug_set_default_address(&self, address: Option<String>) -> Result<(), WalletError> {
        self.wallet()?.default_address = address;
        Ok(())
    }

    pub fn debug_set_host(&self, host: &str) -> Result<(), WalletError> {
        self.wallet()?.host = host.to_owned();
        Ok(())
    }

    pub fn debug_set_request_api(&self, available: bool) -> Result<(), WalletError> {
        self.wallet()?.has_request_api = available;
        Ok(())
    }

    pub fn debug_reject_requests(&self, reason: Option<String>) -> Result<(), WalletError> {
        self.wallet()?.reject_requests = reason;
        Ok(())
    }

    pub fn debug_account_requests(&self) -> Result<u32, WalletError> {
        Ok(self.wallet()?.account_requests)
    }

    fn wallet(&self) -> Result<MutexGuard<'_, SimulatedWallet>, WalletError> {
        self.state
            .lock()
            .map_err(|e| WalletError::Transport(format!("tron wallet lock poisoned: {e}")))
    }

    fn check_mode(&self) -> Result<(), WalletError> {
        if let TronMode::Disabled(reason) = &self.mode {
            return Err(WalletError::ProviderNotFound(reason.clone()));
        }
        Ok(())
    }
}

/// TronWeb takes `callValue` as a JS number.
pub fn safe_call_value(amount: U256) -> Result<u64, WalletError> {
    u64::try_from(amount)
        .ok()
        .filter(|v| *v <= MAX_SAFE_CALL_VALUE)
        .ok_or_else(|| {
            WalletError::UnrepresentableValue(format!(
                "callValue {amount} exceeds the safe integer limit {MAX_SAFE_CALL_VALUE}"
            ))
        })
}

fn ensure_method(handle: &ContractHandle, method: &str) -> Result<(), WalletError> {
    if handle.abi.function(method).is_none() {
        return Err(WalletError::Validation(format!("method not found: {method}")));
    }
    Ok(())
}

#[async_trait(?Send)]
impl ProviderPort for TronLinkAdapter {
    fn chain(&self) -> ChainTag {
        ChainTag::Tron
    }

    fn is_injected(&self) -> bool {
        match &self.mode {
            TronMode::Disabled(_) => false,
            TronMode::Simulated(_) => true,
            #[cfg(target_arch = "wasm32")]
            TronMode::Browser => browser_tron_available(),
        }
    }

    async fn network_id(&self) -> Result<NetworkId, WalletError> {
        self.check_mode()?;
        match &self.mode {
            #[cfg(target_arch = "wasm32")]
            TronMode::Browser => browser_ops::full_node_host().map(NetworkId::Host),
            _ => Ok(NetworkId::Host(self.wallet()?.host.clone())),
        }
    }

    fn supports_switch(&self) -> bool {
        false
    }

    async fn switch_network(&self, _target: &NetworkMatch) -> Result<(), WalletError> {
        Err(WalletError::NotImplemented(
            "TronLink networks are switched from the wallet UI",
        ))
    }

    async fn call(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[Value],
    ) -> Result<Value, WalletError> {
        self.check_mode()?;
        ensure_method(handle, method)?;
        match &self.mode {
            TronMode::Simulated(sim) => sim.call(method, args),
            #[cfg(target_arch = "wasm32")]
            TronMode::Browser => browser_ops::call(handle, method, args).await,
            TronMode::Disabled(reason) => Err(WalletError::ProviderNotFound(reason.clone())),
        }
    }

    async fn send(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[Value],
        value: Option<&ValueAttachment>,
    ) -> Result<String, WalletError> {
        self.check_mode()?;
        ensure_method(handle, method)?;
        let from = handle
            .signer
            .as_ref()
            .map(|a| a.address.as_str())
            .ok_or(WalletError::NoSigner)?;
        let call_value = value.map(|v| safe_call_value(v.amount)).transpose()?;
        debug!(method, call_value, "tron send");
        match &self.mode {
            TronMode::Simulated(sim) => sim.send(
                from,
                method,
                args,
                U256::from(call_value.unwrap_or_default()),
            ),
            #[cfg(target_arch = "wasm32")]
            TronMode::Browser => browser_ops::send(handle, method, args, value, call_value).await,
            TronMode::Disabled(reason) => Err(WalletError::ProviderNotFound(reason.clone())),
        }
    }

    async fn await_receipt(&self, tx_id: &str) -> Result<Value, WalletError> {
        loop {
            let info = self.transaction_info(tx_id).await?;
            if let Some(info) = info.filter(|i| i.as_object().is_some_and(|m| !m.is_empty())) {
                return Ok(info);
            }
            self.clock.sleep(self.info_poll_interval).await;
        }
    }

    async fn transaction_info(&self, tx_id: &str) -> Result<Option<Value>, WalletError> {
        self.check_mode()?;
        match &self.mode {
            TronMode::Simulated(sim) => sim.transaction_info(tx_id),
            #[cfg(target_arch = "wasm32")]
            TronMode::Browser => browser_ops::transaction_info(tx_id).await,
            TronMode::Disabled(reason) => Err(WalletError::ProviderNotFound(reason.clone())),
        }
    }
}

#[async_trait(?Send)]
impl TronWalletPort for TronLinkAdapter {
    fn has_request_api(&self) -> bool {
        match &self.mode {
            TronMode::Disabled(_) => false,
            #[cfg(target_arch = "wasm32")]
            TronMode::Browser => browser_ops::has_request_api(),
            TronMode::Simulated(_) => self.wallet().map(|g| g.has_request_api).unwrap_or(false),
        }
    }

    async fn request_accounts(&self) -> Result<(), WalletError> {
        self.check_mode()?;
        match &self.mode {
            #[cfg(target_arch = "wasm32")]
            TronMode::Browser => browser_ops::request_accounts().await,
            _ => {
                let mut g = self.wallet()?;
                g.account_requests += 1;
                match g.reject_requests.clone() {
                    Some(reason) => Err(WalletError::ProviderRejected(reason)),
                    None => Ok(()),
                }
            }
        }
    }

    fn readiness(&self) -> Readiness {
        match &self.mode {
            TronMode::Disabled(_) => Readiness::Pending,
            #[cfg(target_arch = "wasm32")]
            TronMode::Browser => browser_ops::readiness(),
            TronMode::Simulated(_) => {
                let Ok(mut g) = self.wallet() else {
                    return Readiness::Pending;
                };
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
    }
}

#[cfg(target_arch = "wasm32")]
fn browser_tron_available() -> bool {
    crate::browser::window_prop("tronLink").is_ok() || crate::browser::window_prop("tronWeb").is_ok()
}

#[cfg(target_arch = "wasm32")]
mod browser_ops {
    use serde_json::{json, Value};
    use wasm_bindgen::JsValue;

    use stakepack_core::{ContractHandle, Readiness, ValueAttachment, WalletError};

    use crate::browser::{self, get_path, get_prop, invoke, settle};

    fn tron_web() -> Result<JsValue, WalletError> {
        browser::window_prop("tronWeb")
    }

    pub(super) fn has_request_api() -> bool {
        browser::window_prop("tronLink")
            .ok()
            .and_then(|link| browser::function(&link, "request"))
            .is_some()
    }

    pub(super) async fn request_accounts() -> Result<(), WalletError> {
        let link = browser::window_prop("tronLink")?;
        let request = browser::to_js(&json!({ "method": "tron_requestAccounts" }))?;
        settle(invoke(&link, "request", &[request])?).await?;
        Ok(())
    }

    pub(super) fn readiness() -> Readiness {
        let Ok(tw) = tron_web() else {
            return Readiness::Pending;
        };
        let ready = get_prop(&tw, "ready").map(|r| r.is_truthy()).unwrap_or(false);
        if !ready {
            return Readiness::Pending;
        }
        let default_address = get_path(&tw, &["defaultAddress", "base58"])
            .ok()
            .and_then(|a| a.as_string());
        Readiness::Ready { default_address }
    }

    pub(super) fn full_node_host() -> Result<String, WalletError> {
        Ok(get_path(&tron_web()?, &["fullNode", "host"])?
            .as_string()
            .unwrap_or_default())
    }

    /// `tronWeb.contract(abi).at(address)`
    async fn contract(handle: &ContractHandle) -> Result<JsValue, WalletError> {
        let tw = tron_web()?;
        let abi = browser::to_js(&*handle.abi)?;
        let factory = invoke(&tw, "contract", &[abi])?;
        settle(invoke(&factory, "at", &[JsValue::from_str(&handle.address)])?).await
    }

    fn method_call(contract: &JsValue, method: &str, args: &[Value]) -> Result<JsValue, WalletError> {
        let js_args = args
            .iter()
            .map(browser::to_js)
            .collect::<Result<Vec<_>, _>>()?;
        invoke(contract, method, &js_args)
    }

    pub(super) async fn call(
        handle: &ContractHandle,
        method: &str,
        args: &[Value],
    ) -> Result<Value, WalletError> {
        let contract = contract(handle).await?;
        let pending = method_call(&contract, method, args)?;
        browser::from_js(settle(invoke(&pending, "call", &[])?).await?)
    }

    pub(super) async fn send(
        handle: &ContractHandle,
        method: &str,
        args: &[Value],
        value: Option<&ValueAttachment>,
        call_value: Option<u64>,
    ) -> Result<String, WalletError> {
        let contract = contract(handle).await?;
        let pending = method_call(&contract, method, args)?;
        let options = js_sys::Object::new();
        if let (Some(attached), Some(amount)) = (value, call_value) {
            js_sys::Reflect::set(
                &options,
                &JsValue::from_str(attached.param),
                &JsValue::from_f64(amount as f64),
            )
            .map_err(|e| WalletError::Transport(format!("set send option failed: {e:?}")))?;
        }
        let tx = settle(invoke(&pending, "send", &[options.into()])?).await?;
        tx.as_string()
            .ok_or_else(|| WalletError::Transport("send did not return a transaction id".to_owned()))
    }

    pub(super) async fn transaction_info(tx_id: &str) -> Result<Option<Value>, WalletError> {
        let trx = get_prop(&tron_web()?, "trx")?;
        let info = settle(invoke(&trx, "getTransactionInfo", &[JsValue::from_str(tx_id)])?).await?;
        Ok(Some(browser::from_js(info)?).filter(|v| !v.is_null()))
    }
}
