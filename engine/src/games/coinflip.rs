//! Coinflip.
//!
//! The agent picks a side at commit time; the flip is the parity of the
//! big-endian u32 at offset 0 of the round hash (even = heads). A win pays
//! `bet * 19 / 10` with integer truncation, capped to the house balance plus
//! the freshly lost bet. The truncation means a 1-wei winning bet pays back
//! exactly 1 wei.

use serde_json::json;

use agentcasino_types::constants::{COINFLIP_PAYOUT_DENOMINATOR, COINFLIP_PAYOUT_NUMERATOR};
use agentcasino_types::{commit_reveal, Channel, CoinSide, GameAction, GameKind, RoundRecord};

use super::{
    param_amount, param_str, require_channel, validate_bet, Game, GameContext, GameReply,
};
use crate::error::EngineError;
use crate::pending::PendingCommit;

const MAX_MULTIPLIER: u128 = 2;

/// Flip outcome from the round hash.
pub(crate) fn flip_from_hash(hash: &[u8; 32]) -> CoinSide {
    if commit_reveal::u32_at(hash, 0) % 2 == 0 {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

/// Winning payout before the house-balance cap.
pub(crate) fn win_payout(bet: u128) -> u128 {
    bet.saturating_mul(COINFLIP_PAYOUT_NUMERATOR) / COINFLIP_PAYOUT_DENOMINATOR
}

pub struct Coinflip;

impl Coinflip {
    fn commit(
        &self,
        channel: Option<&mut Channel>,
        params: &serde_json::Value,
        ctx: &mut GameContext<'_>,
    ) -> Result<GameReply, EngineError> {
        let channel = require_channel(channel, ctx.agent)?;
        let bet = param_amount(params, "bet")?;
        let choice = param_str(params, "choice")?;
        let choice: CoinSide = choice
            .parse()
            .map_err(|_| EngineError::BadChoice(choice.to_string()))?;
        validate_bet(channel, bet, MAX_MULTIPLIER)?;

        let pair = commit_reveal::generate();
        let commitment = pair.commitment.clone();
        ctx.pending.insert(
            ctx.agent,
            GameKind::Coinflip,
            PendingCommit {
                casino_seed: pair.seed,
                commitment: pair.commitment,
                bet,
                choice: Some(choice),
                created_at: ctx.now,
            },
            ctx.now,
        )?;

        Ok(GameReply::info(json!({
            "game": "coinflip",
            "commitment": commitment,
            "bet": agentcasino_types::to_decimal(bet),
            "choice": choice,
            "timeoutSecs": ctx.pending.timeout_secs(),
        })))
    }

    fn reveal(
        &self,
        channel: Option<&mut Channel>,
        params: &serde_json::Value,
        ctx: &mut GameContext<'_>,
    ) -> Result<GameReply, EngineError> {
        let channel = require_channel(channel, ctx.agent)?;
        let agent_seed = param_str(params, "agentSeed")?.to_string();

        let commit = ctx
            .pending
            .get(ctx.agent, GameKind::Coinflip)
            .ok_or(EngineError::NoPendingCommit {
                game: GameKind::Coinflip,
            })?
            .clone();
        if ctx.pending.is_expired(&commit, ctx.now) {
            ctx.pending.remove(ctx.agent, GameKind::Coinflip);
            return Err(EngineError::CommitExpired {
                timeout_secs: ctx.pending.timeout_secs(),
            });
        }
        validate_bet(channel, commit.bet, MAX_MULTIPLIER)?;
        ctx.pending.remove(ctx.agent, GameKind::Coinflip);

        let choice = commit.choice.expect("coinflip commit stores a choice");
        let round_nonce = channel.nonce + 1;
        let result = commit_reveal::compute_result(&commit.casino_seed, &agent_seed, round_nonce);
        let flip = flip_from_hash(&result.bytes);

        let payout = if flip == choice {
            // The house can pay out its whole balance plus the lost bet.
            win_payout(commit.bet).min(channel.house_balance.saturating_add(commit.bet))
        } else {
            0
        };

        channel.apply_round(commit.bet, payout)?;
        let signed = ctx.sign(channel)?;

        let mut record = RoundRecord::new(
            ctx.agent,
            GameKind::Coinflip,
            commit.bet,
            payout,
            channel.nonce,
            ctx.now,
        );
        record.choice = Some(choice);
        record.result = Some(flip.to_string());

        let payload = json!({
            "game": "coinflip",
            "choice": choice,
            "result": flip,
            "payout": agentcasino_types::to_decimal(payout),
            "won": payout > 0,
            "commitment": commit.commitment,
            "proof": result.proof,
        });
        Ok(GameReply {
            payload,
            signed: Some(signed),
            round: Some(record),
        })
    }
}

impl Game for Coinflip {
    fn kind(&self) -> GameKind {
        GameKind::Coinflip
    }

    fn rtp(&self) -> f64 {
        0.95
    }

    fn max_multiplier(&self) -> u128 {
        MAX_MULTIPLIER
    }

    fn actions(&self) -> &'static [GameAction] {
        &[GameAction::Commit, GameAction::Reveal, GameAction::Status]
    }

    fn handle(
        &self,
        action: GameAction,
        channel: Option<&mut Channel>,
        params: &serde_json::Value,
        ctx: &mut GameContext<'_>,
    ) -> Result<GameReply, EngineError> {
        match action {
            GameAction::Commit => self.commit(channel, params, ctx),
            GameAction::Reveal => self.reveal(channel, params, ctx),
            GameAction::Status => Ok(GameReply::info(json!({
                "game": "coinflip",
                "displayName": self.kind().display_name(),
                "rtp": self.rtp(),
                "payout": "1.9x",
                "choices": ["heads", "tails"],
            }))),
            _ => Err(EngineError::UnknownRoute(format!(
                "coinflip_{}",
                action.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_decides_the_flip() {
        let mut hash = [0u8; 32];
        hash[..4].copy_from_slice(&2u32.to_be_bytes());
        assert_eq!(flip_from_hash(&hash), CoinSide::Heads);
        hash[..4].copy_from_slice(&3u32.to_be_bytes());
        assert_eq!(flip_from_hash(&hash), CoinSide::Tails);
    }

    #[test]
    fn payout_truncates() {
        assert_eq!(win_payout(10), 19);
        assert_eq!(win_payout(100), 190);
        // The documented micro-bet edge: a 1-wei win returns exactly 1 wei.
        assert_eq!(win_payout(1), 1);
        assert_eq!(win_payout(9), 17); // 171/10 truncated
    }
}
