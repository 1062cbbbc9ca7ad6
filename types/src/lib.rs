//! AgentCasino domain types.
//!
//! Leaf crate of the workspace: wei math, the commit-reveal primitive,
//! EIP-712 channel-state signing, channel/bankroll state and the structured
//! records the engine emits. Everything here is deterministic and
//! I/O-free; the engine, settlement and entropy crates build on it.

pub mod bankroll;
pub mod channel;
pub mod commit_reveal;
pub mod config;
pub mod constants;
pub mod failure;
pub mod game;
pub mod records;
pub mod signing;
pub mod wei;

pub use bankroll::{BankrollError, BankrollGuard};
pub use channel::{Channel, ChannelInvariantError, ChannelStatus};
pub use config::{EngineConfig, SettlementConfig};
pub use failure::FailureClass;
pub use game::{CoinSide, GameAction, GameKind, GameStats};
pub use records::{ChannelSnapshot, EventRecord, RoundRecord};
pub use signing::{recover_signer, ChannelDomain, ChannelState, SigningError};
pub use wei::{to_decimal, to_wei, WeiError, WEI_PER_ETHER};
