use std::sync::Arc;
use std::time::Duration;

use alloy::json_abi::JsonAbi;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainTag {
    Evm,
    Tron,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationStrategy {
    /// Submission yields an awaitable receipt.
    Event,
    /// Receipt is discovered by querying transaction status by id.
    Poll,
}

/// What the active network must look like for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMatch {
    ChainId(u64),
    HostContains(&'static str),
}

/// The network a provider reports as active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkId {
    ChainId(u64),
    Host(String),
}

impl NetworkMatch {
    pub fn matches(&self, active: &NetworkId) -> bool {
        match (self, active) {
            (NetworkMatch::ChainId(expected), NetworkId::ChainId(actual)) => expected == actual,
            (NetworkMatch::HostContains(needle), NetworkId::Host(host)) => host.contains(needle),
            _ => false,
        }
    }
}

impl std::fmt::Display for NetworkMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkMatch::ChainId(id) => write!(f, "chain id {id} (0x{id:x})"),
            NetworkMatch::HostContains(needle) => write!(f, "a node host containing '{needle}'"),
        }
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkId::ChainId(id) => write!(f, "chain id {id}"),
            NetworkId::Host(host) => write!(f, "host {host}"),
        }
    }
}

/// Static description of a supported chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainProfile {
    pub tag: ChainTag,
    pub name: &'static str,
    pub native_symbol: &'static str,
    /// Decimal exponent between one display unit and one base unit.
    pub base_unit_exponent: u8,
    pub expected_network: NetworkMatch,
    pub supports_network_switch: bool,
    pub confirmation: ConfirmationStrategy,
    /// Send-option key carrying the attached amount.
    pub value_param: &'static str,
    pub total_staked_method: &'static str,
    pub pack_method: &'static str,
}

pub const EVM_SEPOLIA: ChainProfile = ChainProfile {
    tag: ChainTag::Evm,
    name: "sepolia",
    native_symbol: "ETH",
    base_unit_exponent: 18,
    expected_network: NetworkMatch::ChainId(11_155_111),
    supports_network_switch: true,
    confirmation: ConfirmationStrategy::Event,
    value_param: "value",
    total_staked_method: "totalStakedWei",
    pack_method: "getPack",
};

pub const TRON_SHASTA: ChainProfile = ChainProfile {
    tag: ChainTag::Tron,
    name: "shasta",
    native_symbol: "TRX",
    base_unit_exponent: 6,
    expected_network: NetworkMatch::HostContains("shasta"),
    supports_network_switch: false,
    confirmation: ConfirmationStrategy::Poll,
    value_param: "callValue",
    total_staked_method: "totalStakedWei",
    pack_method: "getPack",
};

impl ChainProfile {
    pub fn for_chain(tag: ChainTag) -> &'static ChainProfile {
        match tag {
            ChainTag::Evm => &EVM_SEPOLIA,
            ChainTag::Tron => &TRON_SHASTA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    pub chain: ChainTag,
}

impl Account {
    /// `0x1234...abcd` style rendering for status badges.
    pub fn short(&self) -> String {
        let chars: Vec<char> = self.address.chars().collect();
        if chars.len() <= 10 {
            return self.address.clone();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleMode {
    Read,
    Write,
}

#[derive(Debug, Clone)]
pub struct ContractHandle {
    pub address: String,
    pub abi: Arc<JsonAbi>,
    pub profile: ChainProfile,
    pub mode: HandleMode,
    /// Present only on write handles.
    pub signer: Option<Account>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackInfo {
    pub pack_id: u64,
    pub price_base_units: U256,
    pub credit_cost: U256,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub credits: U256,
    pub total_staked_base_units: U256,
    pub user_staked_base_units: U256,
    pub total_supply: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    pub tx_id: String,
    pub chain: ChainTag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueAttachment {
    pub param: &'static str,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_id: String,
    pub success: bool,
    pub block_number: Option<u64>,
    pub raw: Value,
}

/// Timing bounds for readiness and confirmation waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub ready_poll_interval: Duration,
    pub ready_budget: Duration,
    pub confirmation_poll_interval: Duration,
    pub confirmation_timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            ready_poll_interval: Duration::from_millis(100),
            ready_budget: Duration::from_millis(8_000),
            confirmation_poll_interval: Duration::from_millis(1_000),
            confirmation_timeout: Duration::from_millis(180_000),
        }
    }
}
