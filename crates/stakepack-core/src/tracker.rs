use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use futures::future::{self, Either};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::codec;
use crate::domain::{
    ChainProfile, ChainTag, ConfirmationStrategy, PendingTx, TransactionReceipt, WaitPolicy,
};
use crate::ports::{ClockPort, ProviderPort, WalletError};

/// Cooperative cancellation shared between a waiter and whoever may abort it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

pub struct TransactionTracker<P, C> {
    provider: Arc<P>,
    clock: Arc<C>,
    policy: WaitPolicy,
}

impl<P, C> Clone for TransactionTracker<P, C> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            clock: Arc::clone(&self.clock),
            policy: self.policy,
        }
    }
}

impl<P: ProviderPort, C: ClockPort> TransactionTracker<P, C> {
    pub fn new(provider: Arc<P>, clock: Arc<C>, policy: WaitPolicy) -> Self {
        Self {
            provider,
            clock,
            policy,
        }
    }

    /// Waits for a submitted write to reach a terminal receipt, bounded by the
    /// confirmation timeout and interruptible through `cancel`.
    pub async fn submit_and_wait(
        &self,
        profile: &ChainProfile,
        pending: &PendingTx,
        cancel: &CancelToken,
    ) -> Result<TransactionReceipt, WalletError> {
        let raw = match profile.confirmation {
            ConfirmationStrategy::Event => self.await_event(pending, cancel).await?,
            ConfirmationStrategy::Poll => self.await_poll(pending, cancel).await?,
        };
        let receipt = normalize_receipt(profile.tag, &pending.tx_id, raw);
        info!(
            tx = %receipt.tx_id,
            success = receipt.success,
            block = ?receipt.block_number,
            "transaction confirmed"
        );
        Ok(receipt)
    }

    async fn await_event(
        &self,
        pending: &PendingTx,
        cancel: &CancelToken,
    ) -> Result<Value, WalletError> {
        let receipt = self.provider.await_receipt(&pending.tx_id);
        let deadline = self.clock.sleep(self.policy.confirmation_timeout);
        let cancelled = cancel.cancelled();
        futures::pin_mut!(receipt, deadline, cancelled);

        match future::select(receipt, future::select(deadline, cancelled)).await {
            Either::Left((result, _)) => result.map_err(call_failed),
            Either::Right((Either::Left(_), _)) => {
                warn!(tx = %pending.tx_id, "confirmation timed out");
                Err(WalletError::ConfirmationTimeout {
                    tx_id: pending.tx_id.clone(),
                    waited_ms: duration_ms(self.policy.confirmation_timeout),
                })
            }
            Either::Right((Either::Right(_), _)) => Err(self.cancelled_error(pending)),
        }
    }

    async fn await_poll(
        &self,
        pending: &PendingTx,
        cancel: &CancelToken,
    ) -> Result<Value, WalletError> {
        let timeout_ms = duration_ms(self.policy.confirmation_timeout);
        let started = self.clock.now_ms()?;
        let mut polls: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled_error(pending));
            }
            polls += 1;
            let info = self
                .provider
                .transaction_info(&pending.tx_id)
                .await
                .map_err(call_failed)?;
            debug!(tx = %pending.tx_id, polls, found = info.is_some(), "confirmation poll");
            if let Some(info) = info.filter(is_populated) {
                return Ok(info);
            }

            let waited_ms = self.clock.now_ms()?.saturating_sub(started);
            if waited_ms >= timeout_ms {
                warn!(tx = %pending.tx_id, polls, "confirmation timed out");
                return Err(WalletError::ConfirmationTimeout {
                    tx_id: pending.tx_id.clone(),
                    waited_ms,
                });
            }

            let pause = self.clock.sleep(self.policy.confirmation_poll_interval);
            let cancelled = cancel.cancelled();
            futures::pin_mut!(pause, cancelled);
            if let Either::Right(_) = future::select(pause, cancelled).await {
                return Err(self.cancelled_error(pending));
            }
        }
    }

    fn cancelled_error(&self, pending: &PendingTx) -> WalletError {
        warn!(tx = %pending.tx_id, "confirmation wait cancelled");
        WalletError::Cancelled {
            tx_id: pending.tx_id.clone(),
        }
    }
}

/// A dropped receipt query means the transaction outcome is unknown to the
/// caller, which reads as a failed contract call.
fn call_failed(err: WalletError) -> WalletError {
    match err {
        WalletError::Transport(msg) => WalletError::ContractCallFailed(msg),
        other => other,
    }
}

pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn is_populated(info: &Value) -> bool {
    match info {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Folds EVM receipts and Tron transaction infos into one receipt shape.
pub fn normalize_receipt(chain: ChainTag, tx_id: &str, raw: Value) -> TransactionReceipt {
    let block_number = raw
        .get("blockNumber")
        .and_then(|v| codec::to_canonical(v).ok())
        .filter(|n| *n <= U256::from(u64::MAX))
        .map(|n| n.to::<u64>());

    let success = match chain {
        ChainTag::Evm => match raw.get("status") {
            Some(status) => codec::to_canonical(status).map(|s| !s.is_zero()).unwrap_or(false),
            None => true,
        },
        ChainTag::Tron => {
            let top_failed = raw.get("result").and_then(Value::as_str) == Some("FAILED");
            let receipt_result = raw
                .get("receipt")
                .and_then(|r| r.get("result"))
                .and_then(Value::as_str);
            !top_failed && receipt_result.map_or(true, |r| r == "SUCCESS")
        }
    };

    let tx_id = raw
        .get("transactionHash")
        .or_else(|| raw.get("id"))
        .and_then(Value::as_str)
        .unwrap_or(tx_id)
        .to_owned();

    TransactionReceipt {
        tx_id,
        success,
        block_number,
        raw,
    }
}
