//! Engine error taxonomy.
//!
//! Every failure is classified so callers can distinguish caller mistakes
//! (validation), house policy refusals, timeouts, internal integrity
//! failures and cryptographic rejections. The engine never partially
//! mutates a channel on any error path.

use ethers::types::Address;
use thiserror::Error;

use agentcasino_types::{BankrollError, ChannelInvariantError, GameKind};

use crate::signer::SignerError;

pub use agentcasino_types::FailureClass;

#[derive(Debug, Error)]
pub enum EngineError {
    // -- validation -------------------------------------------------------
    #[error("bad amount: {0}")]
    BadAmount(String),
    #[error("missing or invalid parameter: {0}")]
    BadParameter(String),
    #[error("bad choice: {0:?} (expected heads or tails)")]
    BadChoice(String),
    #[error("bad pick: {0} (expected 1..=100)")]
    BadPick(u64),
    #[error("bet must be positive")]
    BetNotPositive,
    #[error("channel already open for {0}")]
    ChannelExists(Address),
    #[error("no open channel for {0}")]
    ChannelNotFound(Address),
    #[error("unknown action route: {0:?}")]
    UnknownRoute(String),

    // -- policy -----------------------------------------------------------
    #[error("insufficient agent balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },
    #[error("house cannot cover worst-case payout: {exposure} exceeds house balance {house_balance}")]
    HouseCannotCover { exposure: u128, house_balance: u128 },
    #[error("channel limit reached ({0})")]
    ChannelLimitReached(usize),
    #[error(transparent)]
    Bankroll(#[from] BankrollError),
    #[error("a pending {game} commit already exists")]
    PendingCommitExists { game: GameKind },
    #[error("no pending {game} commit")]
    NoPendingCommit { game: GameKind },
    #[error("ticket limit exceeded: {held} held + {requested} requested > {max}")]
    TicketLimitExceeded {
        held: usize,
        requested: usize,
        max: usize,
    },
    #[error("nothing to claim")]
    NothingToClaim,

    // -- liveness ---------------------------------------------------------
    #[error("commit expired after {timeout_secs}s; pending slot cleared")]
    CommitExpired { timeout_secs: u64 },

    // -- integrity --------------------------------------------------------
    #[error("invariant violation: {0}")]
    Invariant(#[from] ChannelInvariantError),

    // -- crypto / provider ------------------------------------------------
    #[error("commitment mismatch")]
    BadCommitment,
    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl EngineError {
    pub fn class(&self) -> FailureClass {
        match self {
            EngineError::BadAmount(_)
            | EngineError::BadParameter(_)
            | EngineError::BadChoice(_)
            | EngineError::BadPick(_)
            | EngineError::BetNotPositive
            | EngineError::ChannelExists(_)
            | EngineError::ChannelNotFound(_)
            | EngineError::UnknownRoute(_) => FailureClass::Validation,

            EngineError::InsufficientBalance { .. }
            | EngineError::HouseCannotCover { .. }
            | EngineError::ChannelLimitReached(_)
            | EngineError::Bankroll(_)
            | EngineError::PendingCommitExists { .. }
            | EngineError::NoPendingCommit { .. }
            | EngineError::TicketLimitExceeded { .. }
            | EngineError::NothingToClaim => FailureClass::Policy,

            EngineError::CommitExpired { .. } => FailureClass::Liveness,

            EngineError::Invariant(_) => FailureClass::Integrity,

            EngineError::BadCommitment => FailureClass::Crypto,
            EngineError::Signer(_) => FailureClass::Provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_partition_the_taxonomy() {
        assert_eq!(EngineError::BetNotPositive.class(), FailureClass::Validation);
        assert_eq!(
            EngineError::NothingToClaim.class(),
            FailureClass::Policy
        );
        assert_eq!(
            EngineError::CommitExpired { timeout_secs: 300 }.class(),
            FailureClass::Liveness
        );
        assert_eq!(EngineError::BadCommitment.class(), FailureClass::Crypto);
    }
}
