use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::U256;
use serde_json::{json, Value};
use tracing::info;

use crate::codec;
use crate::domain::{ChainProfile, PackInfo, TransactionReceipt, WaitPolicy};
use crate::gateway::ContractGateway;
use crate::ports::{ClockPort, ProviderPort, WalletError};
use crate::session::WalletSession;
use crate::tracker::{CancelToken, TransactionTracker};

/// Logical ABI shared by both deployments of the staking contract.
pub const STAKE_ABI_JSON: &str = include_str!("../abi/stake.json");

pub fn bundled_abi() -> Result<Arc<JsonAbi>, WalletError> {
    serde_json::from_str(STAKE_ABI_JSON)
        .map(Arc::new)
        .map_err(|e| WalletError::Validation(format!("bundled stake abi is invalid: {e}")))
}

/// Typed operations of the stake/pack/mint contract on one chain.
pub struct StakeContract<P, C> {
    gateway: ContractGateway<P>,
    tracker: TransactionTracker<P, C>,
    profile: ChainProfile,
    address: String,
    abi: Arc<JsonAbi>,
}

impl<P, C> Clone for StakeContract<P, C> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            tracker: self.tracker.clone(),
            profile: self.profile,
            address: self.address.clone(),
            abi: Arc::clone(&self.abi),
        }
    }
}

impl<P: ProviderPort, C: ClockPort> StakeContract<P, C> {
    pub fn new(
        provider: Arc<P>,
        clock: Arc<C>,
        profile: ChainProfile,
        address: impl Into<String>,
        policy: WaitPolicy,
    ) -> Result<Self, WalletError> {
        Ok(Self::with_abi(
            provider,
            clock,
            profile,
            address,
            policy,
            bundled_abi()?,
        ))
    }

    pub fn with_abi(
        provider: Arc<P>,
        clock: Arc<C>,
        profile: ChainProfile,
        address: impl Into<String>,
        policy: WaitPolicy,
        abi: Arc<JsonAbi>,
    ) -> Self {
        Self {
            gateway: ContractGateway::new(Arc::clone(&provider)),
            tracker: TransactionTracker::new(provider, clock, policy),
            profile,
            address: address.into(),
            abi,
        }
    }

    pub fn profile(&self) -> &ChainProfile {
        &self.profile
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn gateway(&self) -> &ContractGateway<P> {
        &self.gateway
    }

    async fn read(&self, method: &str, args: &[Value]) -> Result<Value, WalletError> {
        let handle =
            self.gateway
                .build_read_handle(&self.profile, &self.address, Arc::clone(&self.abi))?;
        self.gateway.invoke_read(&handle, method, args).await
    }

    async fn read_uint(&self, method: &str, args: &[Value]) -> Result<U256, WalletError> {
        codec::to_canonical(&self.read(method, args).await?)
    }

    pub async fn credits_of(&self, account: &str) -> Result<U256, WalletError> {
        self.read_uint("creditsOf", &[json!(account)]).await
    }

    pub async fn total_staked(&self) -> Result<U256, WalletError> {
        self.read_uint(self.profile.total_staked_method, &[]).await
    }

    pub async fn staked_balance(&self, account: &str) -> Result<U256, WalletError> {
        self.read_uint("stakedBalanceWei", &[json!(account)]).await
    }

    pub async fn total_supply(&self) -> Result<U256, WalletError> {
        self.read_uint("totalSupply", &[]).await
    }

    pub async fn get_pack(&self, pack_id: u64) -> Result<PackInfo, WalletError> {
        let raw = self.read(self.profile.pack_method, &[json!(pack_id)]).await?;
        PackInfo::decode(pack_id, &raw)
    }

    pub async fn user_pack_balance(&self, account: &str, pack_id: u64) -> Result<U256, WalletError> {
        self.read_uint("userPackBalance", &[json!(account), json!(pack_id)])
            .await
    }

    async fn write(
        &self,
        session: &WalletSession,
        method: &str,
        args: &[Value],
        value: Option<U256>,
        cancel: &CancelToken,
    ) -> Result<TransactionReceipt, WalletError> {
        if session.profile().tag != self.profile.tag {
            return Err(WalletError::Validation(format!(
                "{} contract cannot be written through a {} session",
                self.profile.name,
                session.profile().name
            )));
        }
        let handle = self
            .gateway
            .build_write_handle(session, &self.address, Arc::clone(&self.abi))
            .await?;
        let pending = self
            .gateway
            .invoke_write(&handle, method, args, value)
            .await?;
        info!(tx = %pending.tx_id, method, "transaction submitted");
        self.tracker
            .submit_and_wait(&self.profile, &pending, cancel)
            .await
    }

    pub async fn stake(
        &self,
        session: &WalletSession,
        amount: U256,
        cancel: &CancelToken,
    ) -> Result<TransactionReceipt, WalletError> {
        if amount.is_zero() {
            return Err(WalletError::InvalidAmount("stake amount must be positive".to_owned()));
        }
        self.write(session, "stake", &[], Some(amount), cancel).await
    }

    pub async fn withdraw_stake(
        &self,
        session: &WalletSession,
        amount: U256,
        cancel: &CancelToken,
    ) -> Result<TransactionReceipt, WalletError> {
        if amount.is_zero() {
            return Err(WalletError::InvalidAmount(
                "withdraw amount must be positive".to_owned(),
            ));
        }
        self.write(session, "withdrawStake", &[json!(amount.to_string())], None, cancel)
            .await
    }

    /// Buys `quantity` packs, attaching `price * quantity` base units. The pack
    /// is re-read first so a stale `PackInfo` cannot buy a retired pack.
    pub async fn buy_pack(
        &self,
        session: &WalletSession,
        pack: &PackInfo,
        quantity: u64,
        cancel: &CancelToken,
    ) -> Result<TransactionReceipt, WalletError> {
        if quantity == 0 {
            return Err(WalletError::InvalidAmount("quantity must be at least 1".to_owned()));
        }
        ensure_purchasable(pack)?;
        let current = self.get_pack(pack.pack_id).await?;
        ensure_purchasable(&current)?;
        let total = current
            .price_base_units
            .checked_mul(U256::from(quantity))
            .ok_or_else(|| {
                WalletError::UnrepresentableValue(format!(
                    "{} x {quantity} overflows uint256",
                    current.price_base_units
                ))
            })?;
        self.write(
            session,
            "buyPack",
            &[json!(current.pack_id), json!(quantity)],
            Some(total),
            cancel,
        )
        .await
    }

    pub async fn mint_from_pack(
        &self,
        session: &WalletSession,
        pack: &PackInfo,
        cancel: &CancelToken,
    ) -> Result<TransactionReceipt, WalletError> {
        if !pack.active {
            return Err(unavailable(pack.pack_id, "pack is not active"));
        }
        let owner = session.account().await.ok_or(WalletError::NoSigner)?;
        if !self.get_pack(pack.pack_id).await?.active {
            return Err(unavailable(pack.pack_id, "pack is not active"));
        }
        let owned = self.user_pack_balance(&owner.address, pack.pack_id).await?;
        if owned.is_zero() {
            return Err(unavailable(pack.pack_id, "no packs owned"));
        }
        self.write(session, "mintFromPack", &[json!(pack.pack_id)], None, cancel)
            .await
    }
}

fn ensure_purchasable(pack: &PackInfo) -> Result<(), WalletError> {
    if !pack.active {
        return Err(unavailable(pack.pack_id, "pack is not active"));
    }
    if pack.price_base_units.is_zero() {
        return Err(unavailable(pack.pack_id, "pack has no price"));
    }
    Ok(())
}

fn unavailable(pack_id: u64, reason: &str) -> WalletError {
    WalletError::PackUnavailable {
        pack_id,
        reason: reason.to_owned(),
    }
}
