//! Game capability and shared game plumbing.
//!
//! Each game is one [`Game`] implementation registered with the engine.
//! Adding a game means registering one instance; the engine derives its
//! routing table (`"<game>_<action>"`) from [`Game::actions`]. The action
//! set is closed per game.

mod coinflip;
mod lotto;
mod slots;

pub use coinflip::Coinflip;
pub use lotto::{Draw, DrawOutcome, DrawWinner, Lotto, LottoState};
pub use slots::Slots;

#[cfg(test)]
pub(crate) use lotto::winning_number_from_hash;

use ethers::types::Address;
use serde_json::Value;

use agentcasino_types::constants::BET_SAFETY_FACTOR;
use agentcasino_types::{
    wei, Channel, ChannelDomain, EngineConfig, GameAction, GameKind, RoundRecord,
};

use crate::error::EngineError;
use crate::messages::SignedState;
use crate::pending::PendingCommits;
use crate::signer::StateSigner;

/// Mutable engine state a game may touch, plus the signer port.
pub struct GameContext<'a> {
    pub agent: Address,
    pub now: u64,
    pub pending: &'a mut PendingCommits,
    pub lotto: &'a mut LottoState,
    pub config: &'a EngineConfig,
    pub signer: &'a dyn StateSigner,
    pub domain: &'a ChannelDomain,
}

impl GameContext<'_> {
    /// Sign the channel's current state. Called after all balance and nonce
    /// updates; a failure here makes the engine roll the mutation back.
    pub fn sign(&self, channel: &Channel) -> Result<SignedState, EngineError> {
        let signature = self.signer.sign_state(&channel.state(), self.domain)?;
        Ok(SignedState::new(channel, &signature))
    }
}

/// What a handled action returns to the engine.
pub struct GameReply {
    /// Game-specific response fields.
    pub payload: Value,
    /// Present iff the action mutated the channel.
    pub signed: Option<SignedState>,
    /// Resolved-round record for the channel log and stats.
    pub round: Option<RoundRecord>,
}

impl GameReply {
    pub fn info(payload: Value) -> Self {
        Self {
            payload,
            signed: None,
            round: None,
        }
    }
}

/// A pluggable game.
pub trait Game: Send + Sync {
    fn kind(&self) -> GameKind;

    /// Theoretical return-to-player in [0, 1]. Informational only; no money
    /// math runs through this number.
    fn rtp(&self) -> f64;

    /// Worst-case payout multiplier, used for bankroll guarding.
    fn max_multiplier(&self) -> u128;

    fn actions(&self) -> &'static [GameAction];

    fn handle(
        &self,
        action: GameAction,
        channel: Option<&mut Channel>,
        params: &Value,
        ctx: &mut GameContext<'_>,
    ) -> Result<GameReply, EngineError>;
}

/// Reject a bet the agent cannot stake or the house cannot survive.
///
/// A bet is acceptable when it is positive, within the agent balance, and
/// `bet * max_multiplier * safety_factor` fits inside the house balance.
/// Runs at commit time and again at reveal time, since parallel games may
/// have moved the balances in between.
pub fn validate_bet(
    channel: &Channel,
    bet: u128,
    max_multiplier: u128,
) -> Result<(), EngineError> {
    if bet == 0 {
        return Err(EngineError::BetNotPositive);
    }
    if channel.agent_balance < bet {
        return Err(EngineError::InsufficientBalance {
            have: channel.agent_balance,
            need: bet,
        });
    }
    let exposure = bet
        .checked_mul(max_multiplier)
        .and_then(|v| v.checked_mul(BET_SAFETY_FACTOR))
        .ok_or_else(|| EngineError::BadAmount(format!("bet {bet} overflows exposure math")))?;
    if exposure > channel.house_balance {
        return Err(EngineError::HouseCannotCover {
            exposure,
            house_balance: channel.house_balance,
        });
    }
    Ok(())
}

pub(crate) fn require_channel<'a>(
    channel: Option<&'a mut Channel>,
    agent: Address,
) -> Result<&'a mut Channel, EngineError> {
    channel.ok_or(EngineError::ChannelNotFound(agent))
}

pub(crate) fn param_str<'v>(params: &'v Value, key: &str) -> Result<&'v str, EngineError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::BadParameter(key.to_string()))
}

/// Monetary parameter: decimal-ether string, or bare integer (whole ether).
pub(crate) fn param_amount(params: &Value, key: &str) -> Result<u128, EngineError> {
    let value = params
        .get(key)
        .ok_or_else(|| EngineError::BadParameter(key.to_string()))?;
    match value {
        Value::String(s) => wei::to_wei(s).map_err(|err| EngineError::BadAmount(err.to_string())),
        Value::Number(n) => n
            .as_u64()
            .and_then(|units| (units as u128).checked_mul(wei::WEI_PER_ETHER))
            .ok_or_else(|| EngineError::BadAmount(value.to_string())),
        _ => Err(EngineError::BadAmount(value.to_string())),
    }
}

pub(crate) fn param_u64(params: &Value, key: &str) -> Result<u64, EngineError> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| EngineError::BadParameter(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(agent_balance: u128, house_balance: u128) -> Channel {
        let mut c = Channel::open(Address::from_low_u64_be(1), agent_balance, house_balance, 0);
        c.agent_balance = agent_balance;
        c.house_balance = house_balance;
        c
    }

    #[test]
    fn bet_boundary_is_exact() {
        // house / (multiplier * safety) is the largest acceptable bet.
        let c = channel(10_000, 1_160);
        // multiplier 290: 1160 / 580 = 2.
        assert!(validate_bet(&c, 2, 290).is_ok());
        assert!(matches!(
            validate_bet(&c, 3, 290),
            Err(EngineError::HouseCannotCover { .. })
        ));
    }

    #[test]
    fn zero_and_oversized_bets_are_rejected() {
        let c = channel(100, 1_000_000);
        assert!(matches!(
            validate_bet(&c, 0, 2),
            Err(EngineError::BetNotPositive)
        ));
        assert!(matches!(
            validate_bet(&c, 101, 2),
            Err(EngineError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn amount_params_accept_strings_and_integers() {
        let params = serde_json::json!({ "bet": "0.001", "stake": 2 });
        assert_eq!(param_amount(&params, "bet").unwrap(), 10u128.pow(15));
        assert_eq!(param_amount(&params, "stake").unwrap(), 2 * 10u128.pow(18));
        assert!(param_amount(&params, "missing").is_err());
    }
}
