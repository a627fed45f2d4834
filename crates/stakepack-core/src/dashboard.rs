use std::collections::BTreeMap;

use alloy::primitives::U256;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::{Account, DashboardSnapshot};
use crate::ports::{ClockPort, ProviderPort, WalletError};
use crate::stake::StakeContract;

pub const DEFAULT_PACK_CANDIDATES: [u64; 3] = [0, 1, 2];

/// Read-heavy composite view for the dashboard page.
pub struct DashboardAggregator<P, C> {
    contract: StakeContract<P, C>,
    candidates: Vec<u64>,
}

impl<P: ProviderPort, C: ClockPort> DashboardAggregator<P, C> {
    pub fn new(contract: StakeContract<P, C>) -> Self {
        Self {
            contract,
            candidates: DEFAULT_PACK_CANDIDATES.to_vec(),
        }
    }

    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = u64>) -> Self {
        self.candidates = candidates.into_iter().collect();
        self
    }

    /// The four aggregate reads must all succeed; pack probes may fail
    /// individually, in which case that pack is left out.
    pub async fn load(
        &self,
        account: &Account,
    ) -> Result<(DashboardSnapshot, BTreeMap<u64, U256>), WalletError> {
        let address = account.address.as_str();
        let (credits, total_staked, user_staked, total_supply) = futures::try_join!(
            self.contract.credits_of(address),
            self.contract.total_staked(),
            self.contract.staked_balance(address),
            self.contract.total_supply(),
        )?;
        let snapshot = DashboardSnapshot {
            credits,
            total_staked_base_units: total_staked,
            user_staked_base_units: user_staked,
            total_supply,
        };

        let probes = self
            .candidates
            .iter()
            .map(|&pack_id| async move { (pack_id, self.probe_pack(address, pack_id).await) });
        let mut owned = BTreeMap::new();
        for (pack_id, outcome) in join_all(probes).await {
            match outcome {
                Ok(Some(quantity)) => {
                    owned.insert(pack_id, quantity);
                }
                Ok(None) => debug!(pack_id, "pack inactive, skipped"),
                Err(e) => warn!(pack_id, error = %e, "pack probe failed, omitted"),
            }
        }
        Ok((snapshot, owned))
    }

    async fn probe_pack(&self, address: &str, pack_id: u64) -> Result<Option<U256>, WalletError> {
        let pack = self.contract.get_pack(pack_id).await?;
        if !pack.active {
            return Ok(None);
        }
        self.contract
            .user_pack_balance(address, pack_id)
            .await
            .map(Some)
    }
}
