use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::ChainProfile;
use crate::ports::{ProviderPort, WalletError};

pub struct NetworkGuard<P> {
    provider: Arc<P>,
}

impl<P> Clone for NetworkGuard<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: ProviderPort> NetworkGuard<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Read-only check; never asks the wallet to switch.
    pub async fn is_expected_network(&self, profile: &ChainProfile) -> Result<bool, WalletError> {
        let active = self.provider.network_id().await?;
        Ok(profile.expected_network.matches(&active))
    }

    /// Runs before every write-capable handle is built. A no-op for profiles
    /// that do not declare network switching.
    pub async fn ensure_network(&self, profile: &ChainProfile) -> Result<(), WalletError> {
        if !profile.supports_network_switch {
            debug!(chain = profile.name, "network guard skipped");
            return Ok(());
        }

        let active = self.provider.network_id().await?;
        if profile.expected_network.matches(&active) {
            return Ok(());
        }

        let wrong_network = |actual: String| WalletError::WrongNetwork {
            expected: profile.expected_network.to_string(),
            actual,
            hint: format!(
                "Switch your wallet to the {} network and retry.",
                profile.name
            ),
        };

        if !self.provider.supports_switch() {
            warn!(%active, "wallet cannot switch networks");
            return Err(wrong_network(active.to_string()));
        }

        info!(from = %active, to = %profile.expected_network, "requesting network switch");
        if let Err(e) = self.provider.switch_network(&profile.expected_network).await {
            warn!(error = %e, "network switch rejected");
            return Err(wrong_network(active.to_string()));
        }

        let switched = self.provider.network_id().await?;
        if !profile.expected_network.matches(&switched) {
            return Err(wrong_network(switched.to_string()));
        }
        Ok(())
    }
}
