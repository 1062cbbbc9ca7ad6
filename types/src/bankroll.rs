//! Process-wide house collateral exposure guard.
//!
//! A single locked-wei counter bounded by a configured maximum. The off-chain
//! engine locks collateral when it funds the house side of a channel; the
//! settlement model runs a logically identical guard so the two agree at
//! equilibrium.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BankrollError {
    #[error("exposure cap exceeded: locked {locked} + requested {requested} > max {max}")]
    ExposureExceeded {
        locked: u128,
        requested: u128,
        max: u128,
    },
    #[error("unlock of {amount} exceeds locked total {locked}")]
    UnlockExceedsLocked { amount: u128, locked: u128 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BankrollGuard {
    total_locked: u128,
    max_exposure: u128,
}

impl BankrollGuard {
    pub fn new(max_exposure: u128) -> Self {
        Self {
            total_locked: 0,
            max_exposure,
        }
    }

    pub fn total_locked(&self) -> u128 {
        self.total_locked
    }

    pub fn max_exposure(&self) -> u128 {
        self.max_exposure
    }

    pub fn can_lock(&self, amount: u128) -> bool {
        self.total_locked
            .checked_add(amount)
            .is_some_and(|next| next <= self.max_exposure)
    }

    pub fn lock(&mut self, amount: u128) -> Result<(), BankrollError> {
        if !self.can_lock(amount) {
            return Err(BankrollError::ExposureExceeded {
                locked: self.total_locked,
                requested: amount,
                max: self.max_exposure,
            });
        }
        self.total_locked += amount;
        Ok(())
    }

    pub fn unlock(&mut self, amount: u128) -> Result<(), BankrollError> {
        if amount > self.total_locked {
            return Err(BankrollError::UnlockExceedsLocked {
                amount,
                locked: self.total_locked,
            });
        }
        self.total_locked -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_up_to_cap_then_reject() {
        let mut guard = BankrollGuard::new(100);
        guard.lock(60).unwrap();
        guard.lock(40).unwrap();
        assert_eq!(guard.total_locked(), 100);
        assert!(matches!(
            guard.lock(1),
            Err(BankrollError::ExposureExceeded { .. })
        ));
        assert_eq!(guard.total_locked(), 100);
    }

    #[test]
    fn unlock_releases_capacity() {
        let mut guard = BankrollGuard::new(100);
        guard.lock(100).unwrap();
        guard.unlock(30).unwrap();
        assert!(guard.can_lock(30));
        assert!(!guard.can_lock(31));
    }

    #[test]
    fn unlock_more_than_locked_is_rejected() {
        let mut guard = BankrollGuard::new(100);
        guard.lock(10).unwrap();
        assert!(matches!(
            guard.unlock(11),
            Err(BankrollError::UnlockExceedsLocked { .. })
        ));
    }
}
