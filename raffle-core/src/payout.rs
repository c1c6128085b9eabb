use crate::error::{RaffleError, Result};
use crate::types::{AccountId, Amount};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Moves a settled prize to its winner.
#[async_trait]
pub trait PrizeTransfer: Send + Sync {
    async fn transfer(&self, to: &AccountId, amount: Amount) -> Result<()>;
}

/// In-memory balances credited by prize transfers
#[derive(Debug, Default)]
pub struct Ledger {
    balances: RwLock<HashMap<AccountId, Amount>>,
    reject_transfers: bool,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances(balances: HashMap<AccountId, Amount>) -> Self {
        Self {
            balances: RwLock::new(balances),
            reject_transfers: false,
        }
    }

    /// A ledger whose every transfer fails, e.g. a winner that cannot receive funds.
    pub fn failing() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            reject_transfers: true,
        }
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances
            .read()
            .get(account)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn balances(&self) -> HashMap<AccountId, Amount> {
        self.balances.read().clone()
    }
}

#[async_trait]
impl PrizeTransfer for Ledger {
    async fn transfer(&self, to: &AccountId, amount: Amount) -> Result<()> {
        if self.reject_transfers {
            return Err(RaffleError::transfer_failed(format!(
                "{} cannot receive {}",
                to, amount
            )));
        }

        let mut balances = self.balances.write();
        let balance = balances.entry(to.clone()).or_insert(Amount::ZERO);
        *balance = balance.checked_add(amount)?;

        tracing::debug!("Credited {} with {}", to, amount);
        Ok(())
    }
}
