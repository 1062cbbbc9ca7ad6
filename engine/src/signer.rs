//! Signer port: the engine's only dependency on key material.
//!
//! The engine asks a [`StateSigner`] for an EIP-712 signature over every
//! mutated channel state. The default implementation wraps an in-process
//! wallet; a KMS-backed signer implements the same trait behind whatever
//! transport it needs. Signing is the one step of a mutation that can fail
//! for external reasons, so the engine rolls back when it does.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Signature};
use thiserror::Error;

use agentcasino_types::{ChannelDomain, ChannelState};

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signer rejected the request: {0}")]
    Rejected(String),
    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

/// Produces house signatures over channel states.
pub trait StateSigner: Send + Sync {
    /// The house account signatures recover to.
    fn address(&self) -> Address;

    fn sign_state(
        &self,
        state: &ChannelState,
        domain: &ChannelDomain,
    ) -> Result<Signature, SignerError>;
}

/// In-process wallet signer.
pub struct WalletSigner {
    wallet: LocalWallet,
}

impl WalletSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self { wallet }
    }
}

impl StateSigner for WalletSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    fn sign_state(
        &self,
        state: &ChannelState,
        domain: &ChannelDomain,
    ) -> Result<Signature, SignerError> {
        self.wallet
            .sign_hash(state.signing_digest(domain))
            .map_err(|err| SignerError::Rejected(err.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use agentcasino_types::recover_signer;

    #[test]
    fn wallet_signer_signs_states_the_settler_accepts() {
        let wallet = "380eb0f3d505f087e438eca80bc4df9a7faa24f868e69fc0440261a0fc0567dc"
            .parse::<LocalWallet>()
            .unwrap();
        let signer = WalletSigner::new(wallet);
        let domain = ChannelDomain::new(1, Address::from_low_u64_be(0xbeef));
        let state = ChannelState::new(Address::from_low_u64_be(3), 10, 20, 1);

        let signature = signer.sign_state(&state, &domain).unwrap();
        assert_eq!(
            recover_signer(&state, &domain, &signature).unwrap(),
            signer.address()
        );
    }
}
