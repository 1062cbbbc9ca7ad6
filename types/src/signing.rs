//! EIP-712 channel state signing.
//!
//! The off-chain engine and the on-chain settlement logic must agree on a
//! single digest for every channel state, so the typed-data encoding lives
//! here and nowhere else. Domain: `name="AgentCasino"`, `version="1"`, plus
//! the configured chain id and settlement contract address. Typed struct:
//!
//! ```text
//! ChannelState(address agent,uint256 agentBalance,uint256 casinoBalance,uint256 nonce)
//! ```
//!
//! Field order is load-bearing; reordering changes the digest and strands
//! every previously signed state.

use ethers::abi::{encode, Token};
use ethers::types::{Address, RecoveryMessage, Signature, H256, U256};
use ethers::utils::keccak256;
use thiserror::Error;

pub const EIP712_DOMAIN_NAME: &str = "AgentCasino";
pub const EIP712_DOMAIN_VERSION: &str = "1";

const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const CHANNEL_STATE_TYPE: &str =
    "ChannelState(address agent,uint256 agentBalance,uint256 casinoBalance,uint256 nonce)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("signature recovery failed")]
    RecoveryFailed,
}

/// The EIP-712 domain parameters a deployment is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelDomain {
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl ChannelDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
        }
    }

    /// `keccak256(abi.encode(typehash, keccak(name), keccak(version), chainId, contract))`
    pub fn separator(&self) -> H256 {
        let encoded = encode(&[
            Token::FixedBytes(keccak256(EIP712_DOMAIN_TYPE).to_vec()),
            Token::FixedBytes(keccak256(EIP712_DOMAIN_NAME).to_vec()),
            Token::FixedBytes(keccak256(EIP712_DOMAIN_VERSION).to_vec()),
            Token::Uint(U256::from(self.chain_id)),
            Token::Address(self.verifying_contract),
        ]);
        H256(keccak256(encoded))
    }
}

/// The typed struct both sides sign and verify.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelState {
    pub agent: Address,
    pub agent_balance: U256,
    pub casino_balance: U256,
    pub nonce: U256,
}

impl ChannelState {
    pub fn new(agent: Address, agent_balance: u128, casino_balance: u128, nonce: u64) -> Self {
        Self {
            agent,
            agent_balance: U256::from(agent_balance),
            casino_balance: U256::from(casino_balance),
            nonce: U256::from(nonce),
        }
    }

    pub fn struct_hash(&self) -> H256 {
        let encoded = encode(&[
            Token::FixedBytes(keccak256(CHANNEL_STATE_TYPE).to_vec()),
            Token::Address(self.agent),
            Token::Uint(self.agent_balance),
            Token::Uint(self.casino_balance),
            Token::Uint(self.nonce),
        ]);
        H256(keccak256(encoded))
    }

    /// Final digest: `keccak256(0x1901 || domainSeparator || structHash)`.
    pub fn signing_digest(&self, domain: &ChannelDomain) -> H256 {
        let mut message = Vec::with_capacity(2 + 32 + 32);
        message.extend_from_slice(&[0x19, 0x01]);
        message.extend_from_slice(domain.separator().as_bytes());
        message.extend_from_slice(self.struct_hash().as_bytes());
        H256(keccak256(message))
    }
}

/// Recover the account that signed a channel state.
pub fn recover_signer(
    state: &ChannelState,
    domain: &ChannelDomain,
    signature: &Signature,
) -> Result<Address, SigningError> {
    let digest = state.signing_digest(domain);
    signature
        .recover(RecoveryMessage::Hash(digest))
        .map_err(|_| SigningError::RecoveryFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::{LocalWallet, Signer};

    fn domain() -> ChannelDomain {
        ChannelDomain::new(31337, Address::from_low_u64_be(0xca51)) // test chain
    }

    #[test]
    fn domain_typehash_matches_canonical_constant() {
        // Pinned so an accidental edit to the type string cannot slip through.
        assert_eq!(
            hex::encode(keccak256(EIP712_DOMAIN_TYPE)),
            "8b73c3c69bb8fe3d512ecc4cf759cc79239f7b179b0ffacaa9a75d522b39400f"
        );
    }

    #[test]
    fn digest_depends_on_every_field() {
        let base = ChannelState::new(Address::from_low_u64_be(1), 100, 200, 3);
        let d = domain();
        let digest = base.signing_digest(&d);

        let mut other = base;
        other.agent_balance = U256::from(101u64);
        assert_ne!(digest, other.signing_digest(&d));

        let mut other = base;
        other.nonce = U256::from(4u64);
        assert_ne!(digest, other.signing_digest(&d));

        let other_domain = ChannelDomain::new(1, d.verifying_contract);
        assert_ne!(digest, base.signing_digest(&other_domain));
    }

    #[test]
    fn wallet_signature_recovers() {
        let wallet = "4c0883a69102937d6231471b5dbb6204fe51296170827936ea5cce4b76994b0f"
            .parse::<LocalWallet>()
            .unwrap();
        let state = ChannelState::new(Address::from_low_u64_be(7), 1_000, 2_000, 5);
        let d = domain();
        let signature = wallet.sign_hash(state.signing_digest(&d)).unwrap();
        assert_eq!(recover_signer(&state, &d, &signature).unwrap(), wallet.address());

        // A tampered state no longer recovers to the signer.
        let tampered = ChannelState::new(Address::from_low_u64_be(7), 1_001, 1_999, 5);
        assert_ne!(
            recover_signer(&tampered, &d, &signature).unwrap(),
            wallet.address()
        );
    }
}
