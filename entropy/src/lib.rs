//! Verifiable-RNG round state machine.
//!
//! Alternate randomness path: instead of commit-reveal against the house,
//! a round requests randomness from an external verifiable provider and
//! settles once the provider's callback lands. The state machine is the
//! same shape whichever provider fulfills it.
//!
//! ```text
//! (none) -> Requested -> Fulfilled -> Settled
//!              |
//!              +-> Expired        (TTL elapsed, any observer)
//!              +-> Failed         (terminal sink)
//! ```
//!
//! Replay safety: a request id maps to exactly one round, forever; a second
//! request under the same id is rejected whatever state the round is in.

pub mod rounds;

pub use rounds::{
    EntropyError, EntropyRound, EntropyRounds, RoundPhase, SettledOutcome, DEFAULT_ROUND_TTL_SECS,
};
