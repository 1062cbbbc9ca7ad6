//! SHA-256 commit-reveal primitive for provably fair outcomes.
//!
//! ## Flow
//!
//! 1. **Commit** - the house draws a random 32-byte seed and publishes
//!    `SHA256(seed)` before the agent contributes anything.
//! 2. **Reveal** - the agent supplies its own seed; the house discloses the
//!    pre-image.
//! 3. **Derive** - the round outcome is a pure function of both seeds and the
//!    round nonce: `SHA256(casino_seed ":" agent_seed ":" nonce)`.
//! 4. **Verify** - anyone can check `SHA256(casino_seed) == commitment`.
//!
//! Once the commitment is transmitted the casino seed is binding; the agent
//! chooses its seed freely, so neither party can bias the result given the
//! other's contribution. Including the nonce makes replays at different
//! round numbers yield different hashes.
//!
//! Seeds and hashes travel as lowercase hex strings; hashing always runs
//! over the hex-encoded bytes, never the raw seed bytes.

use ethers::types::U256;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw seed length in bytes (64 hex characters on the wire).
pub const SEED_BYTES: usize = 32;

/// A casino seed together with its binding commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    /// Secret pre-image, lowercase hex. Must not leave the house until reveal.
    pub seed: String,
    /// `SHA256(seed)`, lowercase hex. Safe to publish.
    pub commitment: String,
}

/// Draw a fresh random seed and compute its commitment.
pub fn generate() -> Commitment {
    let mut raw = [0u8; SEED_BYTES];
    OsRng.fill_bytes(&mut raw);
    let seed = hex::encode(raw);
    let commitment = commitment_for(&seed);
    Commitment { seed, commitment }
}

/// Commitment for a given seed: `SHA256` over the hex string bytes.
pub fn commitment_for(seed: &str) -> String {
    hex::encode(Sha256::digest(seed.as_bytes()))
}

/// Check that a revealed casino seed matches its published commitment.
pub fn verify(commitment: &str, casino_seed: &str) -> bool {
    commitment_for(casino_seed) == commitment
}

/// Everything needed to re-derive a round outcome from scratch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundProof {
    pub casino_seed: String,
    pub agent_seed: String,
    pub nonce: u64,
    pub hash: String,
}

/// Derived round randomness: the digest bytes plus the reproducing proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundHash {
    pub bytes: [u8; 32],
    pub proof: RoundProof,
}

impl RoundHash {
    /// Big-endian unsigned integer view of the full digest.
    pub fn rng(&self) -> U256 {
        U256::from_big_endian(&self.bytes)
    }

    /// Big-endian u32 at a byte offset into the digest.
    ///
    /// # Panics
    /// Panics if `offset + 4` exceeds the digest length; callers use the
    /// fixed offsets 0, 4 and 8.
    pub fn u32_at(&self, offset: usize) -> u32 {
        u32_at(&self.bytes, offset)
    }
}

/// Big-endian u32 at a byte offset into a digest.
pub fn u32_at(bytes: &[u8; 32], offset: usize) -> u32 {
    let slice: [u8; 4] = bytes[offset..offset + 4]
        .try_into()
        .expect("offset within digest");
    u32::from_be_bytes(slice)
}

/// Derive the round hash: `SHA256("{casino_seed}:{agent_seed}:{nonce}")`.
pub fn compute_result(casino_seed: &str, agent_seed: &str, nonce: u64) -> RoundHash {
    let input = format!("{casino_seed}:{agent_seed}:{nonce}");
    let digest = Sha256::digest(input.as_bytes());
    let bytes: [u8; 32] = digest.into();
    RoundHash {
        bytes,
        proof: RoundProof {
            casino_seed: casino_seed.to_string(),
            agent_seed: agent_seed.to_string(),
            nonce,
            hash: hex::encode(bytes),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_commitment_verifies() {
        let pair = generate();
        assert_eq!(pair.seed.len(), SEED_BYTES * 2);
        assert!(verify(&pair.commitment, &pair.seed));
        assert!(!verify(&pair.commitment, "deadbeef"));
    }

    #[test]
    fn commitment_golden_vector() {
        let seed = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";
        assert_eq!(
            commitment_for(seed),
            "2a8abfa8cb9906290437854193ca6bca41d4d4e26d1d454bd66a35158095e737"
        );
    }

    #[test]
    fn result_golden_vector() {
        let result = compute_result("casino", "agent", 7);
        assert_eq!(
            result.proof.hash,
            "f673ce32add0a3c09eb2afe9ac8b60d364a610fe5f1d19e310edbde043404b82"
        );
        assert_eq!(result.u32_at(0), 4_134_784_562);
        assert_eq!(result.u32_at(4), 2_916_131_776);
        assert_eq!(result.u32_at(8), 2_662_510_569);
        assert_eq!(result.rng(), U256::from_big_endian(&result.bytes));
    }

    #[test]
    fn nonce_changes_the_hash() {
        let a = compute_result("casino", "agent", 1);
        let b = compute_result("casino", "agent", 2);
        assert_ne!(a.bytes, b.bytes);
    }

    #[test]
    fn distinct_generations_do_not_collide() {
        let a = generate();
        let b = generate();
        assert_ne!(a.seed, b.seed);
        assert_ne!(a.commitment, b.commitment);
    }
}
