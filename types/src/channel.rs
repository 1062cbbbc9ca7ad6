//! Payment channel state shared by the off-chain engine and on-chain
//! settlement model.
//!
//! ## Invariants
//! - conservation: `agent_balance + house_balance == agent_deposit + house_deposit`,
//!   integer-exact, after every operation;
//! - balances never go negative (structural: balances are unsigned);
//! - the nonce increases by exactly 1 per settleable mutation;
//! - at most one live channel per agent (enforced by the owning table).

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::records::RoundRecord;
use crate::signing::ChannelState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Open,
    Disputed,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelInvariantError {
    #[error(
        "conservation violated: balances {agent_balance}+{house_balance} != deposits {agent_deposit}+{house_deposit}"
    )]
    ConservationViolated {
        agent_balance: u128,
        house_balance: u128,
        agent_deposit: u128,
        house_deposit: u128,
    },
    #[error("balance update out of range (bet={bet}, payout={payout})")]
    BalanceOutOfRange { bet: u128, payout: u128 },
}

/// A two-party escrow with off-chain mutable state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    pub agent: Address,
    pub agent_deposit: u128,
    pub house_deposit: u128,
    pub agent_balance: u128,
    pub house_balance: u128,
    pub nonce: u64,
    pub status: ChannelStatus,
    pub opened_at: u64,
    pub dispute_deadline: u64,
    /// Resolved-round log. Metadata only; the signed state is authoritative.
    pub games: Vec<RoundRecord>,
}

impl Channel {
    /// Open a channel with balances equal to the deposits and nonce 0.
    pub fn open(agent: Address, agent_deposit: u128, house_deposit: u128, opened_at: u64) -> Self {
        Self {
            agent,
            agent_deposit,
            house_deposit,
            agent_balance: agent_deposit,
            house_balance: house_deposit,
            nonce: 0,
            status: ChannelStatus::Open,
            opened_at,
            dispute_deadline: 0,
            games: Vec::new(),
        }
    }

    pub fn total_deposits(&self) -> u128 {
        self.agent_deposit.saturating_add(self.house_deposit)
    }

    /// Integer-exact conservation check.
    pub fn conserved(&self) -> bool {
        self.agent_balance
            .checked_add(self.house_balance)
            .map(|total| {
                self.agent_deposit
                    .checked_add(self.house_deposit)
                    .is_some_and(|deposits| total == deposits)
            })
            .unwrap_or(false)
    }

    pub fn validate_invariants(&self) -> Result<(), ChannelInvariantError> {
        if !self.conserved() {
            return Err(ChannelInvariantError::ConservationViolated {
                agent_balance: self.agent_balance,
                house_balance: self.house_balance,
                agent_deposit: self.agent_deposit,
                house_deposit: self.house_deposit,
            });
        }
        Ok(())
    }

    /// Apply a resolved round: the agent stakes `bet`, receives `payout`, and
    /// the nonce advances by exactly 1. The symmetric update preserves
    /// conservation by construction; a `bet` exceeding the agent balance or a
    /// `payout` exceeding `house_balance + bet` is rejected untouched.
    pub fn apply_round(&mut self, bet: u128, payout: u128) -> Result<(), ChannelInvariantError> {
        let agent = self
            .agent_balance
            .checked_sub(bet)
            .and_then(|v| v.checked_add(payout));
        let house = self
            .house_balance
            .checked_add(bet)
            .and_then(|v| v.checked_sub(payout));
        match (agent, house) {
            (Some(agent), Some(house)) => {
                self.agent_balance = agent;
                self.house_balance = house;
                self.nonce += 1;
                Ok(())
            }
            _ => Err(ChannelInvariantError::BalanceOutOfRange { bet, payout }),
        }
    }

    /// Snapshot for signing.
    pub fn state(&self) -> ChannelState {
        ChannelState::new(self.agent, self.agent_balance, self.house_balance, self.nonce)
    }
}
