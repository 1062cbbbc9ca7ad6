//! Typed revert reasons for the settlement model.
//!
//! Every variant maps to a [`FailureClass`], mirroring the engine's error
//! taxonomy on the other side of the channel.

use ethers::types::Address;
use thiserror::Error;

use agentcasino_types::{BankrollError, ChannelStatus, FailureClass};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("deposit {amount} outside [{min}, {max}]")]
    DepositOutOfRange { amount: u128, min: u128, max: u128 },
    #[error("channel already exists for {0}")]
    ChannelExists(Address),
    #[error("no channel for {0}")]
    ChannelNotFound(Address),
    #[error("channel for {agent} is {status:?}")]
    BadChannelState {
        agent: Address,
        status: ChannelStatus,
    },
    #[error("house side already funded")]
    AlreadyFunded,
    #[error("stale nonce: submitted {submitted}, stored {stored}")]
    StaleNonce { submitted: u64, stored: u64 },
    #[error("balances {agent_balance} + {house_balance} do not equal deposits {deposits}")]
    ConservationViolated {
        agent_balance: u128,
        house_balance: u128,
        deposits: u128,
    },
    #[error("signature does not recover to the house")]
    BadSignature,
    #[error("dispute deadline not reached")]
    DeadlineNotReached,
    #[error("dispute deadline passed")]
    DeadlinePassed,
    #[error("emergency exit requires nonce 0, channel is at {0}")]
    NonZeroNonce(u64),
    #[error("channel younger than the minimum duration")]
    ChannelTooYoung,
    #[error("caller {0} is not authorized")]
    NotAuthorized(Address),
    #[error("timelock has not elapsed")]
    TimelockActive,
    #[error("nothing pending")]
    NothingPending,
    #[error("transfer failed")]
    TransferFailed,
    #[error("collateral still locked: {0}")]
    CollateralLocked(u128),
    #[error("module not wired: {0}")]
    ModuleNotWired(&'static str),
    #[error("insurance withdrawal of {requested} exceeds fund balance {available}")]
    InsuranceInsufficient { requested: u128, available: u128 },
    #[error(transparent)]
    Bankroll(#[from] BankrollError),
}

impl ContractError {
    pub fn class(&self) -> FailureClass {
        match self {
            ContractError::DepositOutOfRange { .. }
            | ContractError::ChannelExists(_)
            | ContractError::ChannelNotFound(_)
            | ContractError::BadChannelState { .. }
            | ContractError::AlreadyFunded
            | ContractError::StaleNonce { .. }
            | ContractError::NothingPending => FailureClass::Validation,

            ContractError::NonZeroNonce(_)
            | ContractError::NotAuthorized(_)
            | ContractError::CollateralLocked(_)
            | ContractError::InsuranceInsufficient { .. }
            | ContractError::Bankroll(_) => FailureClass::Policy,

            ContractError::DeadlineNotReached
            | ContractError::DeadlinePassed
            | ContractError::ChannelTooYoung
            | ContractError::TimelockActive => FailureClass::Liveness,

            ContractError::ConservationViolated { .. } | ContractError::ModuleNotWired(_) => {
                FailureClass::Integrity
            }

            ContractError::BadSignature => FailureClass::Crypto,

            ContractError::TransferFailed => FailureClass::Transfer,
        }
    }
}
