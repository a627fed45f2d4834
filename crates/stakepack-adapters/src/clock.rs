use std::time::Duration;

use async_trait::async_trait;
use stakepack_core::{ClockPort, WalletError};

#[derive(Debug, Clone, Default)]
pub struct SystemClockAdapter;

#[async_trait(?Send)]
impl ClockPort for SystemClockAdapter {
    fn now_ms(&self) -> Result<u64, WalletError> {
        #[cfg(target_arch = "wasm32")]
        {
            let now = web_time::SystemTime::now()
                .duration_since(web_time::UNIX_EPOCH)
                .map_err(|e| WalletError::Transport(format!("time error: {e}")))?;
            return Ok(now.as_millis() as u64);
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map_err(|e| WalletError::Transport(format!("time error: {e}")))?;
            Ok(now.as_millis() as u64)
        }
    }

    async fn sleep(&self, duration: Duration) {
        #[cfg(target_arch = "wasm32")]
        {
            gloo_timers::future::sleep(duration).await;
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            tokio::time::sleep(duration).await;
        }
    }
}
