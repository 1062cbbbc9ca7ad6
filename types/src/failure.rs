//! Failure classification shared by the engine and settlement error enums.

/// Coarse class of a rejected operation. Every engine and settlement error
/// variant maps to exactly one of these, so callers can react to the shape
/// of a failure without matching on individual variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// Malformed request; nothing changed.
    Validation,
    /// Request well-formed but refused by house policy; nothing changed.
    Policy,
    /// A deadline or timelock gate; pending resources were cleaned where
    /// the contract says so.
    Liveness,
    /// An internal invariant failed; the operation is refused.
    Integrity,
    /// Signature or commitment did not verify.
    Crypto,
    /// A value transfer was refused; the amount reroutes to pull payment.
    Transfer,
    /// An external collaborator (signer, entropy provider) failed.
    Provider,
}
