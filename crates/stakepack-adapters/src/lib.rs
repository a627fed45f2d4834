pub mod abi;
#[cfg(target_arch = "wasm32")]
mod browser;
pub mod clock;
pub mod config;
pub mod evm;
pub mod simulation;
pub mod tron;

pub use clock::SystemClockAdapter;
pub use config::{AdapterConfig, RuntimeProfile};
pub use evm::Eip1193Adapter;
pub use simulation::{SimulatedStakeContract, CREDITS_PER_NATIVE_UNIT};
pub use tron::{safe_call_value, TronLinkAdapter, MAX_SAFE_CALL_VALUE};
