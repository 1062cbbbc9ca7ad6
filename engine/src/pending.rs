//! Pending commit store.
//!
//! One live commit per `(agent, game)`: a second commit before reveal is
//! refused, while commits to different games run in parallel. Commits not
//! revealed within the configured timeout expire; an expired slot is
//! reclaimed either lazily on the next touch or by the scheduler sweep.
//!
//! The stored record is the suspension point of a commit-reveal round:
//! durable data with a wall-clock deadline rather than a paused task, so an
//! adversarial peer that never reveals costs the house nothing but memory
//! until the sweep.

use ethers::types::Address;
use std::collections::HashMap;

use agentcasino_types::{CoinSide, GameKind};

use crate::error::EngineError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingCommit {
    /// Secret pre-image; revealed only inside result derivation.
    pub casino_seed: String,
    /// Published commitment.
    pub commitment: String,
    pub bet: u128,
    /// Coinflip stores the side picked at commit time.
    pub choice: Option<CoinSide>,
    pub created_at: u64,
}

#[derive(Debug)]
pub struct PendingCommits {
    timeout_secs: u64,
    entries: HashMap<(Address, GameKind), PendingCommit>,
}

impl PendingCommits {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            entries: HashMap::new(),
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn is_expired(&self, commit: &PendingCommit, now: u64) -> bool {
        now.saturating_sub(commit.created_at) > self.timeout_secs
    }

    /// Store a commit; refuses while a non-expired commit for the same
    /// `(agent, game)` exists. An expired leftover is silently replaced.
    pub fn insert(
        &mut self,
        agent: Address,
        game: GameKind,
        commit: PendingCommit,
        now: u64,
    ) -> Result<(), EngineError> {
        if let Some(existing) = self.entries.get(&(agent, game)) {
            if !self.is_expired(existing, now) {
                return Err(EngineError::PendingCommitExists { game });
            }
        }
        self.entries.insert((agent, game), commit);
        Ok(())
    }

    pub fn get(&self, agent: Address, game: GameKind) -> Option<&PendingCommit> {
        self.entries.get(&(agent, game))
    }

    pub fn remove(&mut self, agent: Address, game: GameKind) -> Option<PendingCommit> {
        self.entries.remove(&(agent, game))
    }

    /// Reinstate a commit consumed by a mutation that was rolled back.
    pub fn restore(&mut self, agent: Address, game: GameKind, commit: PendingCommit) {
        self.entries.insert((agent, game), commit);
    }

    /// Drop every expired commit; returns how many were reclaimed.
    pub fn sweep_expired(&mut self, now: u64) -> usize {
        let timeout = self.timeout_secs;
        let before = self.entries.len();
        self.entries
            .retain(|_, commit| now.saturating_sub(commit.created_at) <= timeout);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
