//! Round table for the external entropy path.

use ethers::types::{Address, U256};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use agentcasino_types::constants::DEFAULT_ENTROPY_TTL_SECS;
use agentcasino_types::CoinSide;

pub const DEFAULT_ROUND_TTL_SECS: u64 = DEFAULT_ENTROPY_TTL_SECS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntropyError {
    #[error("round {0} already exists")]
    RoundExists(u64),
    #[error("round {0} not found")]
    RoundNotFound(u64),
    #[error("round {request_id} is {phase:?}, expected {expected:?}")]
    WrongPhase {
        request_id: u64,
        phase: RoundPhase,
        expected: RoundPhase,
    },
    #[error("fulfillment from {got}, provider is {expected}")]
    WrongProvider { got: Address, expected: Address },
    #[error("round {0} already fulfilled")]
    AlreadyFulfilled(u64),
    #[error("round {0} has not reached its TTL")]
    NotExpired(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    Requested,
    Fulfilled,
    Settled,
    Expired,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntropyRound {
    pub request_id: u64,
    pub agent: Address,
    pub bet: u128,
    pub choice: CoinSide,
    pub fee_paid: u128,
    pub requested_at: u64,
    pub random: Option<U256>,
    pub phase: RoundPhase,
}

/// Deterministic result applied at settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettledOutcome {
    pub request_id: u64,
    pub flip: CoinSide,
    pub won: bool,
}

/// All rounds, keyed by provider request id.
#[derive(Debug)]
pub struct EntropyRounds {
    provider: Address,
    ttl_secs: u64,
    rounds: HashMap<u64, EntropyRound>,
}

impl EntropyRounds {
    pub fn new(provider: Address, ttl_secs: u64) -> Self {
        Self {
            provider,
            ttl_secs,
            rounds: HashMap::new(),
        }
    }

    pub fn provider(&self) -> Address {
        self.provider
    }

    pub fn get(&self, request_id: u64) -> Option<&EntropyRound> {
        self.rounds.get(&request_id)
    }

    /// Open a round. A request id is single-use: re-requesting under an id
    /// that ever existed is rejected regardless of that round's state.
    pub fn request(
        &mut self,
        request_id: u64,
        agent: Address,
        bet: u128,
        choice: CoinSide,
        fee_paid: u128,
        now: u64,
    ) -> Result<(), EntropyError> {
        if self.rounds.contains_key(&request_id) {
            return Err(EntropyError::RoundExists(request_id));
        }
        self.rounds.insert(
            request_id,
            EntropyRound {
                request_id,
                agent,
                bet,
                choice,
                fee_paid,
                requested_at: now,
                random: None,
                phase: RoundPhase::Requested,
            },
        );
        debug!(request_id, agent = ?agent, bet, "entropy round requested");
        Ok(())
    }

    /// Provider callback. Only the configured provider may fulfill, and only
    /// the first fulfillment counts.
    pub fn fulfill(
        &mut self,
        request_id: u64,
        origin: Address,
        random: U256,
    ) -> Result<(), EntropyError> {
        if origin != self.provider {
            return Err(EntropyError::WrongProvider {
                got: origin,
                expected: self.provider,
            });
        }
        let round = self
            .rounds
            .get_mut(&request_id)
            .ok_or(EntropyError::RoundNotFound(request_id))?;
        match round.phase {
            RoundPhase::Requested => {
                round.random = Some(random);
                round.phase = RoundPhase::Fulfilled;
                debug!(request_id, "entropy round fulfilled");
                Ok(())
            }
            RoundPhase::Fulfilled | RoundPhase::Settled => {
                Err(EntropyError::AlreadyFulfilled(request_id))
            }
            phase => Err(EntropyError::WrongPhase {
                request_id,
                phase,
                expected: RoundPhase::Requested,
            }),
        }
    }

    /// Operator marks a fulfilled round processed. The outcome is
    /// `random mod 2`: even is heads.
    pub fn settle(&mut self, request_id: u64) -> Result<SettledOutcome, EntropyError> {
        let round = self
            .rounds
            .get_mut(&request_id)
            .ok_or(EntropyError::RoundNotFound(request_id))?;
        if round.phase != RoundPhase::Fulfilled {
            return Err(EntropyError::WrongPhase {
                request_id,
                phase: round.phase,
                expected: RoundPhase::Fulfilled,
            });
        }
        let random = round.random.expect("fulfilled round has randomness");
        let flip = if random % U256::from(2u64) == U256::zero() {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        };
        round.phase = RoundPhase::Settled;
        let outcome = SettledOutcome {
            request_id,
            flip,
            won: flip == round.choice,
        };
        info!(request_id, flip = %flip, won = outcome.won, "entropy round settled");
        Ok(outcome)
    }

    /// Any observer may expire a requested round once the TTL elapsed,
    /// unblocking the funds held against it.
    pub fn expire(&mut self, request_id: u64, now: u64) -> Result<(), EntropyError> {
        let ttl = self.ttl_secs;
        let round = self
            .rounds
            .get_mut(&request_id)
            .ok_or(EntropyError::RoundNotFound(request_id))?;
        if round.phase != RoundPhase::Requested {
            return Err(EntropyError::WrongPhase {
                request_id,
                phase: round.phase,
                expected: RoundPhase::Requested,
            });
        }
        if now.saturating_sub(round.requested_at) < ttl {
            return Err(EntropyError::NotExpired(request_id));
        }
        round.phase = RoundPhase::Expired;
        warn!(request_id, "entropy round expired");
        Ok(())
    }

    /// Expire every requested round whose TTL has elapsed; returns how
    /// many. Scheduler-friendly form of [`EntropyRounds::expire`].
    pub fn sweep_expired(&mut self, now: u64) -> usize {
        let ttl = self.ttl_secs;
        let mut expired = 0;
        for round in self.rounds.values_mut() {
            if round.phase == RoundPhase::Requested
                && now.saturating_sub(round.requested_at) >= ttl
            {
                round.phase = RoundPhase::Expired;
                expired += 1;
            }
        }
        if expired > 0 {
            warn!(expired, "entropy rounds expired by sweep");
        }
        expired
    }

    /// Terminal sink for unrecoverable rounds.
    pub fn fail(&mut self, request_id: u64) -> Result<(), EntropyError> {
        let round = self
            .rounds
            .get_mut(&request_id)
            .ok_or(EntropyError::RoundNotFound(request_id))?;
        match round.phase {
            RoundPhase::Settled | RoundPhase::Failed => Err(EntropyError::WrongPhase {
                request_id,
                phase: round.phase,
                expected: RoundPhase::Requested,
            }),
            _ => {
                round.phase = RoundPhase::Failed;
                warn!(request_id, "entropy round failed");
                Ok(())
            }
        }
    }
}
