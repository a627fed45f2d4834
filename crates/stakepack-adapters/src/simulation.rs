use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::U256;
use serde_json::{json, Value};
use tracing::debug;

use stakepack_core::codec::to_canonical;
use stakepack_core::{ChainProfile, ChainTag, PackInfo, WalletError};

/// Credits granted per whole native unit staked.
pub const CREDITS_PER_NATIVE_UNIT: u64 = 1_000;

/// In-memory stand-in for the deployed stake/pack/mint contract.
///
/// Outputs are shaped the way the chain's injected library returns them:
/// ethers-style `_hex` numbers and named tuples on EVM, decimal strings and
/// positional tuples on Tron.
#[derive(Debug, Clone)]
pub struct SimulatedStakeContract {
    inner: Arc<Mutex<SimState>>,
}

#[derive(Debug)]
struct SimState {
    chain: ChainTag,
    unit: U256,
    credits: HashMap<String, U256>,
    staked: HashMap<String, U256>,
    total_staked: U256,
    total_supply: U256,
    packs: BTreeMap<u64, PackInfo>,
    pack_balances: HashMap<(String, u64), U256>,
    txs: HashMap<String, SimTx>,
    tx_seq: u64,
    block: u64,
    pending_polls: u32,
    failures: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct SimTx {
    success: bool,
    block: u64,
    remaining_polls: u32,
}

impl SimulatedStakeContract {
    pub fn new(profile: &ChainProfile) -> Self {
        let unit = U256::from(10u64).pow(U256::from(profile.base_unit_exponent));
        let mut packs = BTreeMap::new();
        for (pack_id, divisor, cost, active) in
            [(0u64, 100u64, 10u64, true), (1, 20, 50, true), (2, 10, 100, false)]
        {
            packs.insert(
                pack_id,
                PackInfo {
                    pack_id,
                    price_base_units: unit / U256::from(divisor),
                    credit_cost: U256::from(cost),
                    active,
                },
            );
        }
        Self {
            inner: Arc::new(Mutex::new(SimState {
                chain: profile.tag,
                unit,
                credits: HashMap::new(),
                staked: HashMap::new(),
                total_staked: U256::ZERO,
                total_supply: U256::ZERO,
                packs,
                pack_balances: HashMap::new(),
                txs: HashMap::new(),
                tx_seq: 0,
                block: 1_000,
                pending_polls: 0,
                failures: HashMap::new(),
            })),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, SimState>, WalletError> {
        self.inner
            .lock()
            .map_err(|e| WalletError::Transport(format!("simulation lock poisoned: {e}")))
    }

    /// Number of status lookups each new transaction stays unknown for.
    pub fn set_pending_polls(&self, polls: u32) -> Result<(), WalletError> {
        self.state()?.pending_polls = polls;
        Ok(())
    }

    /// Makes every call and send of `method` fail at the transport level.
    pub fn fail_method(&self, method: &str, message: &str) -> Result<(), WalletError> {
        self.state()?
            .failures
            .insert(method.to_owned(), message.to_owned());
        Ok(())
    }

    pub fn clear_failures(&self) -> Result<(), WalletError> {
        self.state()?.failures.clear();
        Ok(())
    }

    pub fn set_pack(&self, pack: PackInfo) -> Result<(), WalletError> {
        self.state()?.packs.insert(pack.pack_id, pack);
        Ok(())
    }

    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, WalletError> {
        let g = self.state()?;
        g.check_failure(method)?;
        let uint = |n: U256| g.uint_out(n);
        match method {
            "creditsOf" => Ok(uint(g.credits_of(&account_arg(args, 0)?))),
            "totalStakedWei" | "totalStakedSun" => Ok(uint(g.total_staked)),
            "stakedBalanceWei" => Ok(uint(
                g.staked
                    .get(&account_arg(args, 0)?)
                    .copied()
                    .unwrap_or_default(),
            )),
            "totalSupply" => Ok(uint(g.total_supply)),
            "getPack" | "packs" => {
                let pack_id = pack_arg(args, 0)?;
                Ok(g.pack_out(pack_id))
            }
            "userPackBalance" => {
                let key = (account_arg(args, 0)?, pack_arg(args, 1)?);
                Ok(uint(g.pack_balances.get(&key).copied().unwrap_or_default()))
            }
            other => Err(WalletError::ContractCallFailed(format!(
                "simulated contract has no view '{other}'"
            ))),
        }
    }

    /// Applies a state-mutating call. Reverts still mine a transaction whose
    /// receipt reports failure.
    pub fn send(
        &self,
        from: &str,
        method: &str,
        args: &[Value],
        value: U256,
    ) -> Result<String, WalletError> {
        let mut g = self.state()?;
        g.check_failure(method)?;
        let sender = account_key(from);
        let success = match method {
            "stake" => g.stake(&sender, value),
            "withdrawStake" => g.withdraw(&sender, uint_arg(args, 0)?),
            "buyPack" => g.buy(&sender, pack_arg(args, 0)?, uint_arg(args, 1)?, value),
            "mintFromPack" => g.mint(&sender, pack_arg(args, 0)?),
            other => {
                return Err(WalletError::ContractCallFailed(format!(
                    "simulated contract has no write '{other}'"
                )))
            }
        };

        g.tx_seq += 1;
        g.block += 1;
        let tx_id = match g.chain {
            ChainTag::Evm => format!("0x{:064x}", g.tx_seq),
            ChainTag::Tron => format!("{:064x}", g.tx_seq),
        };
        let tx = SimTx {
            success,
            block: g.block,
            remaining_polls: g.pending_polls,
        };
        debug!(tx = %tx_id, method, success, "simulated transaction mined");
        g.txs.insert(tx_id.clone(), tx);
        Ok(tx_id)
    }

    /// EVM receipt or Tron transaction info for `tx_id`. `None` (EVM) or an
    /// empty object (Tron) while the transaction is still pending.
    pub fn transaction_info(&self, tx_id: &str) -> Result<Option<Value>, WalletError> {
        let mut g = self.state()?;
        let chain = g.chain;
        let Some(tx) = g.txs.get_mut(tx_id) else {
            return Ok(None);
        };
        if tx.remaining_polls > 0 {
            tx.remaining_polls -= 1;
            return Ok(match chain {
                ChainTag::Evm => None,
                ChainTag::Tron => Some(json!({})),
            });
        }
        let info = match chain {
            ChainTag::Evm => json!({
                "transactionHash": tx_id,
                "status": if tx.success { "0x1" } else { "0x0" },
                "blockNumber": format!("0x{:x}", tx.block),
            }),
            ChainTag::Tron if tx.success => json!({
                "id": tx_id,
                "blockNumber": tx.block,
                "receipt": { "result": "SUCCESS" },
            }),
            ChainTag::Tron => json!({
                "id": tx_id,
                "blockNumber": tx.block,
                "result": "FAILED",
                "receipt": { "result": "REVERT" },
            }),
        };
        Ok(Some(info))
    }
}

impl SimState {
    fn check_failure(&self, method: &str) -> Result<(), WalletError> {
        match self.failures.get(method) {
            Some(message) => Err(WalletError::Transport(message.clone())),
            None => Ok(()),
        }
    }

    fn uint_out(&self, n: U256) -> Value {
        match self.chain {
            ChainTag::Evm => json!({ "_hex": format!("0x{n:x}"), "_isBigNumber": true }),
            ChainTag::Tron => json!(n.to_string()),
        }
    }

    fn pack_out(&self, pack_id: u64) -> Value {
        let pack = self.packs.get(&pack_id).cloned().unwrap_or(PackInfo {
            pack_id,
            price_base_units: U256::ZERO,
            credit_cost: U256::ZERO,
            active: false,
        });
        match self.chain {
            ChainTag::Evm => json!({
                "priceWei": pack.price_base_units.to_string(),
                "creditCost": pack.credit_cost.to_string(),
                "active": pack.active,
            }),
            ChainTag::Tron => json!([
                pack.price_base_units.to_string(),
                pack.credit_cost.to_string(),
                pack.active,
            ]),
        }
    }

    fn credits_of(&self, account: &str) -> U256 {
        self.credits.get(account).copied().unwrap_or_default()
    }

    fn stake(&mut self, sender: &str, value: U256) -> bool {
        if value.is_zero() {
            return false;
        }
        let granted = value * U256::from(CREDITS_PER_NATIVE_UNIT) / self.unit;
        *self.staked.entry(sender.to_owned()).or_default() += value;
        *self.credits.entry(sender.to_owned()).or_default() += granted;
        self.total_staked += value;
        true
    }

    fn withdraw(&mut self, sender: &str, amount: U256) -> bool {
        let staked = self.staked.entry(sender.to_owned()).or_default();
        if amount.is_zero() || *staked < amount {
            return false;
        }
        *staked -= amount;
        self.total_staked -= amount;
        true
    }

    fn buy(&mut self, sender: &str, pack_id: u64, quantity: U256, value: U256) -> bool {
        let Some(pack) = self.packs.get(&pack_id) else {
            return false;
        };
        let expected = pack.price_base_units.checked_mul(quantity);
        if !pack.active || quantity.is_zero() || expected != Some(value) {
            return false;
        }
        *self
            .pack_balances
            .entry((sender.to_owned(), pack_id))
            .or_default() += quantity;
        true
    }

    fn mint(&mut self, sender: &str, pack_id: u64) -> bool {
        let Some(cost) = self.packs.get(&pack_id).map(|p| p.credit_cost) else {
            return false;
        };
        let key = (sender.to_owned(), pack_id);
        let owned = self.pack_balances.get(&key).copied().unwrap_or_default();
        let credits = self.credits_of(sender);
        if owned.is_zero() || credits < cost {
            return false;
        }
        self.pack_balances.insert(key, owned - U256::from(1u64));
        self.credits.insert(sender.to_owned(), credits - cost);
        self.total_supply += U256::from(1u64);
        true
    }
}

/// EVM addresses compare case-insensitively; Tron base58 does not.
fn account_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        trimmed.to_ascii_lowercase()
    } else {
        trimmed.to_owned()
    }
}

fn arg(args: &[Value], index: usize) -> Result<&Value, WalletError> {
    args.get(index)
        .ok_or_else(|| WalletError::Validation(format!("missing argument {index}")))
}

fn account_arg(args: &[Value], index: usize) -> Result<String, WalletError> {
    arg(args, index)?
        .as_str()
        .map(account_key)
        .ok_or_else(|| WalletError::Validation(format!("argument {index} must be an address")))
}

fn uint_arg(args: &[Value], index: usize) -> Result<U256, WalletError> {
    to_canonical(arg(args, index)?)
}

fn pack_arg(args: &[Value], index: usize) -> Result<u64, WalletError> {
    let id = uint_arg(args, index)?;
    u64::try_from(id).map_err(|_| WalletError::Validation(format!("pack id {id} out of range")))
}
