use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{ChainTag, ContractHandle, NetworkId, NetworkMatch, ValueAttachment};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet provider not found: {0}")]
    ProviderNotFound(String),
    #[error("wallet provider not ready after {waited_ms}ms")]
    ProviderNotReady { waited_ms: u64 },
    #[error("wallet provider rejected the request: {0}")]
    ProviderRejected(String),
    #[error("wallet returned no account")]
    NoAccount,
    #[error("invalid account address: {0}")]
    InvalidAddress(String),
    #[error("wrong network: expected {expected}, wallet is on {actual}. {hint}")]
    WrongNetwork {
        expected: String,
        actual: String,
        hint: String,
    },
    #[error("no signer: connect a wallet before sending transactions")]
    NoSigner,
    #[error("unrepresentable value: {0}")]
    UnrepresentableValue(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("contract call failed: {0}")]
    ContractCallFailed(String),
    #[error("transaction {tx_id} not confirmed after {waited_ms}ms")]
    ConfirmationTimeout { tx_id: String, waited_ms: u64 },
    #[error("confirmation wait for {tx_id} cancelled")]
    Cancelled { tx_id: String },
    #[error("pack {pack_id} unavailable: {reason}")]
    PackUnavailable { pack_id: u64, reason: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
}

#[async_trait(?Send)]
pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, WalletError>;
    async fn sleep(&self, duration: Duration);
}

/// Chain-agnostic surface every injected provider exposes once connected.
#[async_trait(?Send)]
pub trait ProviderPort {
    fn chain(&self) -> ChainTag;
    /// Whether the wallet object is present at all.
    fn is_injected(&self) -> bool;
    async fn network_id(&self) -> Result<NetworkId, WalletError>;
    fn supports_switch(&self) -> bool;
    async fn switch_network(&self, target: &NetworkMatch) -> Result<(), WalletError>;
    async fn call(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[Value],
    ) -> Result<Value, WalletError>;
    async fn send(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[Value],
        value: Option<&ValueAttachment>,
    ) -> Result<String, WalletError>;
    /// Resolves once the provider itself observes the receipt.
    async fn await_receipt(&self, tx_id: &str) -> Result<Value, WalletError>;
    /// Single status query; `None` while the transaction is unknown.
    async fn transaction_info(&self, tx_id: &str) -> Result<Option<Value>, WalletError>;
}

#[async_trait(?Send)]
pub trait EvmWalletPort: ProviderPort {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready { default_address: Option<String> },
}

#[async_trait(?Send)]
pub trait TronWalletPort: ProviderPort {
    fn has_request_api(&self) -> bool;
    async fn request_accounts(&self) -> Result<(), WalletError>;
    fn readiness(&self) -> Readiness;
}
