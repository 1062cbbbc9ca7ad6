//! Outbound value transfer port.
//!
//! Settlement pays out through a [`PaymentSink`]; a transfer the recipient
//! rejects is not fatal, the amount reroutes to the pull-payment map.

use ethers::types::Address;
use std::collections::HashSet;

/// Attempts a value transfer. Returns `false` when the recipient refuses
/// the payment (the on-chain `call` failure case).
pub trait PaymentSink {
    fn pay(&mut self, to: Address, amount: u128) -> bool;
}

/// Ledger of executed transfers, with failure injection for tests.
#[derive(Debug, Default)]
pub struct Payments {
    pub sent: Vec<(Address, u128)>,
    rejecting: HashSet<Address>,
}

impl Payments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every payment to `addr` fail until `accept` is called.
    pub fn reject(&mut self, addr: Address) {
        self.rejecting.insert(addr);
    }

    pub fn accept(&mut self, addr: Address) {
        self.rejecting.remove(&addr);
    }

    pub fn total_to(&self, addr: Address) -> u128 {
        self.sent
            .iter()
            .filter(|(to, _)| *to == addr)
            .map(|(_, amount)| amount)
            .sum()
    }
}

impl PaymentSink for Payments {
    fn pay(&mut self, to: Address, amount: u128) -> bool {
        if self.rejecting.contains(&to) {
            return false;
        }
        self.sent.push((to, amount));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_is_per_recipient_and_reversible() {
        let mut payments = Payments::new();
        let a = Address::from_low_u64_be(1);
        let b = Address::from_low_u64_be(2);
        payments.reject(a);

        assert!(!payments.pay(a, 10));
        assert!(payments.pay(b, 20));
        payments.accept(a);
        assert!(payments.pay(a, 30));
        assert_eq!(payments.total_to(a), 30);
        assert_eq!(payments.total_to(b), 20);
    }
}
