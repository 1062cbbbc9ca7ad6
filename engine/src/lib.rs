//! AgentCasino off-chain execution engine.
//!
//! The engine mirrors on-chain channels in memory, routes wagering actions
//! to game plug-ins, and returns a house-signed EIP-712 state after every
//! mutation. The settlement side accepts exactly the states produced here.
//!
//! ## Determinism requirements
//! - No wall-clock reads inside mutation paths; `now` is always an explicit
//!   caller-supplied timestamp.
//! - Round outcomes derive only from commit-reveal inputs; the only ambient
//!   randomness is casino seed generation at commit time.
//! - Errors never leave a partial mutation behind: the engine restores the
//!   channel, the pending slot and the lotto state before surfacing one.

pub mod engine;
pub mod error;
pub mod events;
pub mod games;
pub mod messages;
pub mod pending;
pub mod relay;
pub mod signer;

#[cfg(test)]
mod engine_tests;

pub use agentcasino_entropy::EntropyRounds;
pub use engine::{ChannelEngine, ScheduledReport};
pub use error::{EngineError, FailureClass};
pub use events::EventBus;
pub use games::{Game, GameContext, GameReply, LottoState};
pub use messages::{ChannelStatusReply, CloseChannelReply, OpenChannelReply, SignedState};
pub use pending::{PendingCommit, PendingCommits};
pub use relay::{RelayError, RelaySink, StealthRelay};
pub use signer::{SignerError, StateSigner, WalletSigner};
