//! Stealth-address relay sink.
//!
//! Forwards value from the house to a freshly generated one-time address.
//! Fire-and-forget: the relay keeps no reference to any channel or agent, so
//! nothing here links a funding source to casino state.

use ethers::types::Address;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("relay amount must be positive")]
    ZeroAmount,
}

/// Sink that moves value toward a stealth address.
pub trait RelaySink {
    fn forward(&mut self, to: Address, amount: u128) -> Result<(), RelayError>;
}

/// Records outbound transfers for an external payment executor to drain.
#[derive(Debug, Default)]
pub struct StealthRelay {
    outbound: Vec<(Address, u128)>,
}

impl StealthRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything queued so far.
    pub fn drain(&mut self) -> Vec<(Address, u128)> {
        std::mem::take(&mut self.outbound)
    }

    pub fn queued(&self) -> usize {
        self.outbound.len()
    }
}

impl RelaySink for StealthRelay {
    fn forward(&mut self, to: Address, amount: u128) -> Result<(), RelayError> {
        if amount == 0 {
            return Err(RelayError::ZeroAmount);
        }
        debug!(to = ?to, amount, "relay forward queued");
        self.outbound.push((to, amount));
        Ok(())
    }
}
