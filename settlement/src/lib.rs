//! AgentCasino settlement model.
//!
//! The on-chain counterpart of the engine, expressed as a deterministic
//! state machine: escrowed deposits, EIP-712 signature verification, nonce
//! monotonicity, challenge/counter-challenge/resolve, emergency exit,
//! insurance skim, pull-payment fallback and timelocked admin operations.
//! Block timestamps arrive as arguments; value leaves through the
//! [`PaymentSink`] port.

pub mod bankroll;
pub mod contract;
pub mod error;
pub mod insurance;
pub mod payments;


pub use agentcasino_types::FailureClass;
pub use bankroll::BankrollManager;
pub use contract::SettlementContract;
pub use error::ContractError;
pub use insurance::{InsuranceFund, PendingWithdrawal};
pub use payments::{PaymentSink, Payments};
