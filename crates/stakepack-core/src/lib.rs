pub mod codec;
pub mod connector;
pub mod dashboard;
pub mod domain;
pub mod gateway;
pub mod network;
pub mod ports;
pub mod session;
pub mod stake;
pub mod tracker;

pub use connector::{EvmConnector, TronConnector, WalletConnector};
pub use dashboard::{DashboardAggregator, DEFAULT_PACK_CANDIDATES};
pub use domain::{
    Account, ChainProfile, ChainTag, ConfirmationStrategy, ContractHandle, DashboardSnapshot,
    HandleMode, NetworkId, NetworkMatch, PackInfo, PendingTx, TransactionReceipt,
    ValueAttachment, WaitPolicy, EVM_SEPOLIA, TRON_SHASTA,
};
pub use gateway::ContractGateway;
pub use network::NetworkGuard;
pub use ports::{ClockPort, EvmWalletPort, ProviderPort, Readiness, TronWalletPort, WalletError};
pub use session::WalletSession;
pub use stake::{bundled_abi, StakeContract, STAKE_ABI_JSON};
pub use tracker::{normalize_receipt, CancelToken, TransactionTracker};
