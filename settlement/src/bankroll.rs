//! Bankroll manager module.
//!
//! Wraps the shared exposure guard behind channel-manager-only access.
//! Constructed unwired; the channel manager address is injected afterward
//! (modules reference each other by address, never at construction).

use ethers::types::Address;

use agentcasino_types::BankrollGuard;

use crate::error::ContractError;

#[derive(Debug)]
pub struct BankrollManager {
    owner: Address,
    channel_manager: Option<Address>,
    guard: BankrollGuard,
}

impl BankrollManager {
    pub fn new(owner: Address, max_exposure: u128) -> Self {
        Self {
            owner,
            channel_manager: None,
            guard: BankrollGuard::new(max_exposure),
        }
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

    fn require_channel_manager(&self, caller: Address) -> Result<(), ContractError> {
        match self.channel_manager {
            Some(manager) if manager == caller => Ok(()),
            _ => Err(ContractError::NotAuthorized(caller)),
        }
    }

    pub fn lock(&mut self, caller: Address, amount: u128) -> Result<(), ContractError> {
        self.require_channel_manager(caller)?;
        self.guard.lock(amount)?;
        Ok(())
    }

    pub fn unlock(&mut self, caller: Address, amount: u128) -> Result<(), ContractError> {
        self.require_channel_manager(caller)?;
        self.guard.unlock(amount)?;
        Ok(())
    }

    pub fn total_locked(&self) -> u128 {
        self.guard.total_locked()
    }

    pub fn can_lock(&self, amount: u128) -> bool {
        self.guard.can_lock(amount)
    }
}
