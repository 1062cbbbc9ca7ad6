//! Slot machine.
//!
//! Five symbols with weights `{30,25,20,15,10}` (per 100) and triple-match
//! payouts `{5,10,25,50,290}`. Three reels come from the big-endian u32 at
//! byte offsets 0, 4 and 8 of the round hash, each reduced mod 100 and
//! mapped through the cumulative weights. Only a triple pays.

use serde_json::json;

use agentcasino_types::{commit_reveal, Channel, GameAction, GameKind, RoundRecord};

use super::{
    param_amount, param_str, require_channel, validate_bet, Game, GameContext, GameReply,
};
use crate::error::EngineError;
use crate::pending::PendingCommit;

pub(crate) const WEIGHTS: [u32; 5] = [30, 25, 20, 15, 10];
pub(crate) const PAYOUTS: [u64; 5] = [5, 10, 25, 50, 290];
pub(crate) const SYMBOLS: [&str; 5] = ["cherry", "lemon", "orange", "bell", "seven"];

const MAX_MULTIPLIER: u128 = 290;

/// Weighted symbol index for a roll in 0..100.
pub(crate) fn symbol_for(roll: u32) -> usize {
    debug_assert!(roll < 100);
    let mut cumulative = 0;
    for (index, weight) in WEIGHTS.iter().enumerate() {
        cumulative += weight;
        if roll < cumulative {
            return index;
        }
    }
    WEIGHTS.len() - 1
}

/// Reels from the round hash: u32s at offsets 0/4/8, mod 100, weighted.
pub(crate) fn reels_from_hash(hash: &[u8; 32]) -> [u8; 3] {
    let mut reels = [0u8; 3];
    for (slot, offset) in [0usize, 4, 8].into_iter().enumerate() {
        let roll = commit_reveal::u32_at(hash, offset) % 100;
        reels[slot] = symbol_for(roll) as u8;
    }
    reels
}

/// Triple-match payout; zero otherwise.
pub(crate) fn payout_for(reels: &[u8; 3], bet: u128) -> u128 {
    if reels[0] == reels[1] && reels[1] == reels[2] {
        bet.saturating_mul(PAYOUTS[reels[0] as usize] as u128)
    } else {
        0
    }
}

pub struct Slots;

impl Slots {
    fn commit(
        &self,
        channel: Option<&mut Channel>,
        params: &serde_json::Value,
        ctx: &mut GameContext<'_>,
    ) -> Result<GameReply, EngineError> {
        let channel = require_channel(channel, ctx.agent)?;
        let bet = param_amount(params, "bet")?;
        validate_bet(channel, bet, MAX_MULTIPLIER)?;

        let pair = commit_reveal::generate();
        let commitment = pair.commitment.clone();
        ctx.pending.insert(
            ctx.agent,
            GameKind::Slots,
            PendingCommit {
                casino_seed: pair.seed,
                commitment: pair.commitment,
                bet,
                choice: None,
                created_at: ctx.now,
            },
            ctx.now,
        )?;

        Ok(GameReply::info(json!({
            "game": "slots",
            "commitment": commitment,
            "bet": agentcasino_types::to_decimal(bet),
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
            .get(ctx.agent, GameKind::Slots)
            .ok_or(EngineError::NoPendingCommit {
                game: GameKind::Slots,
            })?
            .clone();
        if ctx.pending.is_expired(&commit, ctx.now) {
            ctx.pending.remove(ctx.agent, GameKind::Slots);
            return Err(EngineError::CommitExpired {
                timeout_secs: ctx.pending.timeout_secs(),
            });
        }
        // Balances may have moved since commit; re-validate before resolving.
        validate_bet(channel, commit.bet, MAX_MULTIPLIER)?;
        ctx.pending.remove(ctx.agent, GameKind::Slots);

        let round_nonce = channel.nonce + 1;
        let result = commit_reveal::compute_result(&commit.casino_seed, &agent_seed, round_nonce);
        let reels = reels_from_hash(&result.bytes);
        let payout = payout_for(&reels, commit.bet).min(channel.house_balance);

        channel.apply_round(commit.bet, payout)?;
        let signed = ctx.sign(channel)?;

        let mut record = RoundRecord::new(
            ctx.agent,
            GameKind::Slots,
            commit.bet,
            payout,
            channel.nonce,
            ctx.now,
        );
        record.reels = Some(reels);
        record.multiplier = (payout > 0).then(|| PAYOUTS[reels[0] as usize]);

        let payload = json!({
            "game": "slots",
            "reels": reels,
            "symbols": reels.map(|r| SYMBOLS[r as usize]),
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

impl Game for Slots {
    fn kind(&self) -> GameKind {
        GameKind::Slots
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
                "game": "slots",
                "displayName": self.kind().display_name(),
                "rtp": self.rtp(),
                "maxMultiplier": PAYOUTS[4],
                "symbols": SYMBOLS,
                "weights": WEIGHTS,
                "payouts": PAYOUTS,
            }))),
            _ => Err(EngineError::UnknownRoute(format!(
                "slots_{}",
                action.as_str()
            ))),
        }
    }
}
