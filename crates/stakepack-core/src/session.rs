use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::domain::{Account, ChainProfile};

/// The connected-wallet state of one browser session.
///
/// Created before the first connect and handed to every component call.
/// Only connectors write the account slot.
#[derive(Debug)]
pub struct WalletSession {
    profile: ChainProfile,
    account: Mutex<Option<Account>>,
}

impl WalletSession {
    pub fn new(profile: ChainProfile) -> Self {
        Self {
            profile,
            account: Mutex::new(None),
        }
    }

    pub fn profile(&self) -> &ChainProfile {
        &self.profile
    }

    /// Waits for an in-flight connect to settle before answering.
    pub async fn account(&self) -> Option<Account> {
        self.account.lock().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.account.lock().await.is_some()
    }

    pub async fn disconnect(&self) {
        let mut slot = self.account.lock().await;
        if let Some(previous) = slot.take() {
            info!(account = %previous.address, chain = ?previous.chain, "wallet session cleared");
        }
    }

    pub(crate) async fn lock_slot(&self) -> MutexGuard<'_, Option<Account>> {
        self.account.lock().await
    }
}
