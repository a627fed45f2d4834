use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::U256;
use serde_json::Value;
use tracing::debug;

use crate::domain::{ChainProfile, ContractHandle, HandleMode, PendingTx, ValueAttachment};
use crate::network::NetworkGuard;
use crate::ports::{ProviderPort, WalletError};
use crate::session::WalletSession;

/// Builds contract handles and dispatches calls with the chain's call/send
/// convention.
pub struct ContractGateway<P> {
    provider: Arc<P>,
    guard: NetworkGuard<P>,
}

impl<P> Clone for ContractGateway<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            guard: self.guard.clone(),
        }
    }
}

impl<P: ProviderPort> ContractGateway<P> {
    pub fn new(provider: Arc<P>) -> Self {
        let guard = NetworkGuard::new(Arc::clone(&provider));
        Self { provider, guard }
    }

    pub fn guard(&self) -> &NetworkGuard<P> {
        &self.guard
    }

    pub fn build_read_handle(
        &self,
        profile: &ChainProfile,
        address: &str,
        abi: Arc<JsonAbi>,
    ) -> Result<ContractHandle, WalletError> {
        if !self.provider.is_injected() {
            return Err(WalletError::ProviderNotFound(format!(
                "no {} provider reachable for reads",
                profile.name
            )));
        }
        Ok(ContractHandle {
            address: address.to_owned(),
            abi,
            profile: *profile,
            mode: HandleMode::Read,
            signer: None,
        })
    }

    pub async fn build_write_handle(
        &self,
        session: &WalletSession,
        address: &str,
        abi: Arc<JsonAbi>,
    ) -> Result<ContractHandle, WalletError> {
        let signer = session.account().await.ok_or(WalletError::NoSigner)?;
        let profile = *session.profile();
        if !self.provider.is_injected() {
            return Err(WalletError::ProviderNotFound(format!(
                "{} provider disappeared",
                profile.name
            )));
        }
        self.guard.ensure_network(&profile).await?;
        Ok(ContractHandle {
            address: address.to_owned(),
            abi,
            profile,
            mode: HandleMode::Write,
            signer: Some(signer),
        })
    }

    pub async fn invoke_read(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[Value],
    ) -> Result<Value, WalletError> {
        debug!(contract = %handle.address, method, "contract read");
        self.provider
            .call(handle, method, args)
            .await
            .map_err(into_call_failure)
    }

    /// Submits a state-mutating call and returns without waiting for
    /// confirmation.
    pub async fn invoke_write(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[Value],
        value_base_units: Option<U256>,
    ) -> Result<PendingTx, WalletError> {
        if handle.mode != HandleMode::Write || handle.signer.is_none() {
            return Err(WalletError::NoSigner);
        }
        let attachment = value_base_units.map(|amount| ValueAttachment {
            param: handle.profile.value_param,
            amount,
        });
        debug!(
            contract = %handle.address,
            method,
            value = ?attachment.as_ref().map(|a| a.amount),
            "contract write"
        );
        let tx_id = self
            .provider
            .send(handle, method, args, attachment.as_ref())
            .await
            .map_err(into_call_failure)?;
        Ok(PendingTx {
            tx_id,
            chain: handle.profile.tag,
        })
    }
}

fn into_call_failure(e: WalletError) -> WalletError {
    match e {
        WalletError::Transport(msg) => WalletError::ContractCallFailed(msg),
        other => other,
    }
}
