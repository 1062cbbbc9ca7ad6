//! Insurance fund module.
//!
//! Segregated treasury receiving the profit skim at every settlement.
//! Withdrawals are owner-only, timelocked, bounded by the fund balance,
//! and cancellable while pending.

use ethers::types::Address;
use tracing::info;

use crate::error::ContractError;
use crate::payments::PaymentSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingWithdrawal {
    pub amount: u128,
    pub execute_after: u64,
}

#[derive(Debug)]
pub struct InsuranceFund {
    owner: Address,
    channel_manager: Option<Address>,
    timelock_secs: u64,
    balance: u128,
    pending: Option<PendingWithdrawal>,
}

impl InsuranceFund {
    pub fn new(owner: Address, timelock_secs: u64) -> Self {
        Self {
            owner,
            channel_manager: None,
            timelock_secs,
            balance: 0,
            pending: None,
        }
    }

    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn pending(&self) -> Option<PendingWithdrawal> {
        self.pending
    }

    pub fn set_channel_manager(
        &mut self,
        caller: Address,
        manager: Address,
    ) -> Result<(), ContractError> {
        if caller != self.owner {
            return Err(ContractError::NotAuthorized(caller));
        }
        self.channel_manager = Some(manager);
        Ok(())
    }

    /// Skim deposit from the channel manager at settlement.
    pub fn deposit(&mut self, caller: Address, amount: u128) -> Result<(), ContractError> {
        match self.channel_manager {
            Some(manager) if manager == caller => {
                self.balance += amount;
                Ok(())
            }
            _ => Err(ContractError::NotAuthorized(caller)),
        }
    }

    pub fn request_withdrawal(
        &mut self,
        caller: Address,
        amount: u128,
        now: u64,
    ) -> Result<(), ContractError> {
        if caller != self.owner {
            return Err(ContractError::NotAuthorized(caller));
        }
        if amount == 0 || amount > self.balance {
            return Err(ContractError::InsuranceInsufficient {
                requested: amount,
                available: self.balance,
            });
        }
        self.pending = Some(PendingWithdrawal {
            amount,
            execute_after: now + self.timelock_secs,
        });
        Ok(())
    }

    pub fn execute_withdrawal(
        &mut self,
        caller: Address,
        now: u64,
        payments: &mut dyn PaymentSink,
    ) -> Result<u128, ContractError> {
        if caller != self.owner {
            return Err(ContractError::NotAuthorized(caller));
        }
        let pending = self.pending.ok_or(ContractError::NothingPending)?;
        if now < pending.execute_after {
            return Err(ContractError::TimelockActive);
        }
        // The balance may have shrunk since the request; never overdraw.
        let amount = pending.amount.min(self.balance);
        if !payments.pay(self.owner, amount) {
            return Err(ContractError::TransferFailed);
        }
        self.balance -= amount;
        self.pending = None;
        info!(amount, remaining = self.balance, "insurance withdrawal executed");
        Ok(amount)
    }

    pub fn cancel_withdrawal(&mut self, caller: Address) -> Result<(), ContractError> {
        if caller != self.owner {
            return Err(ContractError::NotAuthorized(caller));
        }
        if self.pending.take().is_none() {
            return Err(ContractError::NothingPending);
        }
        Ok(())
    }
}
