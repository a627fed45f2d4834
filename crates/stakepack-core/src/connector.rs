use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::{Account, ChainTag, WaitPolicy};
use crate::ports::{ClockPort, EvmWalletPort, Readiness, TronWalletPort, WalletError};
use crate::session::WalletSession;
use crate::tracker::duration_ms;

#[async_trait(?Send)]
pub trait WalletConnector {
    fn chain(&self) -> ChainTag;

    /// Talks to the wallet and resolves the canonical account.
    async fn establish(&self) -> Result<Account, WalletError>;

    /// Connects once per session. A second call while connected returns the
    /// live account; a call issued during an in-flight connect waits for it.
    async fn connect(&self, session: &WalletSession) -> Result<Account, WalletError> {
        if session.profile().tag != self.chain() {
            return Err(WalletError::Validation(format!(
                "{:?} connector cannot serve a {:?} session",
                self.chain(),
                session.profile().tag
            )));
        }

        let mut slot = session.lock_slot().await;
        if let Some(existing) = slot.as_ref() {
            debug!(account = %existing.address, "wallet already connected");
            return Ok(existing.clone());
        }

        let account = self.establish().await?;
        info!(account = %account.address, chain = ?account.chain, "wallet connected");
        *slot = Some(account.clone());
        Ok(account)
    }
}

pub struct EvmConnector<P> {
    provider: Arc<P>,
}

impl<P: EvmWalletPort> EvmConnector<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

#[async_trait(?Send)]
impl<P: EvmWalletPort> WalletConnector for EvmConnector<P> {
    fn chain(&self) -> ChainTag {
        ChainTag::Evm
    }

    async fn establish(&self) -> Result<Account, WalletError> {
        if !self.provider.is_injected() {
            return Err(WalletError::ProviderNotFound(
                "no EIP-1193 wallet injected (install MetaMask)".to_owned(),
            ));
        }
        let accounts = self.provider.request_accounts().await?;
        let first = accounts.into_iter().next().ok_or(WalletError::NoAccount)?;
        let address: Address = first
            .trim()
            .parse()
            .map_err(|e| WalletError::InvalidAddress(format!("{first}: {e}")))?;
        Ok(Account {
            address: address.to_checksum(None),
            chain: ChainTag::Evm,
        })
    }
}

pub struct TronConnector<P, C> {
    provider: Arc<P>,
    clock: Arc<C>,
    policy: WaitPolicy,
}

impl<P: TronWalletPort, C: ClockPort> TronConnector<P, C> {
    pub fn new(provider: Arc<P>, clock: Arc<C>, policy: WaitPolicy) -> Self {
        Self {
            provider,
            clock,
            policy,
        }
    }

    async fn wait_until_ready(&self) -> Result<Option<String>, WalletError> {
        let budget_ms = duration_ms(self.policy.ready_budget);
        let started = self.clock.now_ms()?;
        loop {
            if let Readiness::Ready { default_address } = self.provider.readiness() {
                return Ok(default_address);
            }
            let waited_ms = self.clock.now_ms()?.saturating_sub(started);
            if waited_ms >= budget_ms {
                return Err(WalletError::ProviderNotReady { waited_ms });
            }
            self.clock.sleep(self.policy.ready_poll_interval).await;
        }
    }
}

#[async_trait(?Send)]
impl<P: TronWalletPort, C: ClockPort> WalletConnector for TronConnector<P, C> {
    fn chain(&self) -> ChainTag {
        ChainTag::Tron
    }

    async fn establish(&self) -> Result<Account, WalletError> {
        if !self.provider.is_injected() {
            return Err(WalletError::ProviderNotFound(
                "TronLink not found (install TronLink)".to_owned(),
            ));
        }
        if self.provider.has_request_api() {
            self.provider
                .request_accounts()
                .await
                .map_err(|e| match e {
                    WalletError::ProviderRejected(_) => e,
                    other => WalletError::ProviderRejected(other.to_string()),
                })?;
        }

        let address = self
            .wait_until_ready()
            .await?
            .map(|a| a.trim().to_owned())
            .filter(|a| !a.is_empty())
            .ok_or(WalletError::NoAccount)?;
        Ok(Account {
            address,
            chain: ChainTag::Tron,
        })
    }
}
