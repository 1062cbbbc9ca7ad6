//! Lotto.
//!
//! One draw every six hours over numbers 1..=100. Tickets cost a fixed
//! price and a matching ticket pays 85x. The casino seed for each draw is
//! committed when the draw is scheduled; execution mixes in a public
//! entropy string (agent count and pool size, unknowable at commit time)
//! and the draw id.
//!
//! Winnings are accrued to an unclaimed-winnings ledger rather than applied
//! to the channel, because the winning agent's channel may be gone by draw
//! time. `claim` (or the scheduler) folds `min(unclaimed, house balance)`
//! into whatever channel the agent currently has open.

use ethers::types::Address;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

use agentcasino_types::commit_reveal::{self, RoundProof};
use agentcasino_types::constants::{LOTTO_NUMBER_RANGE, LOTTO_PAYOUT_MULTIPLIER};
use agentcasino_types::{Channel, GameAction, GameKind, RoundRecord};

use super::{param_u64, require_channel, Game, GameContext, GameReply};
use crate::error::EngineError;

/// Completed draws kept for status queries.
const DRAW_HISTORY: usize = 32;

#[derive(Clone, Debug)]
pub struct Draw {
    pub draw_id: u64,
    casino_seed: String,
    pub commitment: String,
    pub draw_time: u64,
    /// Picked numbers per agent, at most the configured cap.
    pub tickets: BTreeMap<Address, Vec<u8>>,
    pub total_pool: u128,
    pub drawn: bool,
    pub winning_number: Option<u8>,
    pub drawn_at: Option<u64>,
}

impl Draw {
    fn schedule(draw_id: u64, draw_time: u64) -> Self {
        let pair = commit_reveal::generate();
        Self {
            draw_id,
            casino_seed: pair.seed,
            commitment: pair.commitment,
            draw_time,
            tickets: BTreeMap::new(),
            total_pool: 0,
            drawn: false,
            winning_number: None,
            drawn_at: None,
        }
    }

    pub(crate) fn casino_seed(&self) -> &str {
        &self.casino_seed
    }

    pub fn tickets_for(&self, agent: Address) -> usize {
        self.tickets.get(&agent).map_or(0, Vec::len)
    }
}

/// Deterministic winning number for a drawn seed and entropy.
pub(crate) fn winning_number_from_hash(hash: &[u8; 32]) -> u8 {
    ((commit_reveal::u32_at(hash, 0) % LOTTO_NUMBER_RANGE) + 1) as u8
}

#[derive(Clone, Debug)]
pub struct DrawWinner {
    pub agent: Address,
    pub matches: u32,
    pub payout: u128,
}

#[derive(Clone, Debug)]
pub struct DrawOutcome {
    pub draw_id: u64,
    pub winning_number: u8,
    pub total_pool: u128,
    pub winners: Vec<DrawWinner>,
    pub proof: RoundProof,
}

/// All lotto state: the scheduled draw, recent completed draws and the
/// unclaimed-winnings ledger (which outlives channels).
#[derive(Debug)]
pub struct LottoState {
    pub current: Draw,
    completed: Vec<Draw>,
    unclaimed: HashMap<Address, u128>,
}

impl LottoState {
    pub fn new(now: u64, draw_interval_secs: u64) -> Self {
        Self {
            current: Draw::schedule(1, now + draw_interval_secs),
            completed: Vec::new(),
            unclaimed: HashMap::new(),
        }
    }

    pub fn due(&self, now: u64) -> bool {
        !self.current.drawn && now >= self.current.draw_time
    }

    pub fn unclaimed_for(&self, agent: Address) -> u128 {
        self.unclaimed.get(&agent).copied().unwrap_or(0)
    }

    /// Rollback hook: reset an agent's unclaimed balance outright.
    pub(crate) fn set_unclaimed(&mut self, agent: Address, amount: u128) {
        if amount == 0 {
            self.unclaimed.remove(&agent);
        } else {
            self.unclaimed.insert(agent, amount);
        }
    }

    /// Decrease an agent's unclaimed balance after a successful transfer.
    pub fn reduce_unclaimed(&mut self, agent: Address, amount: u128) {
        if let Some(entry) = self.unclaimed.get_mut(&agent) {
            *entry = entry.saturating_sub(amount);
            if *entry == 0 {
                self.unclaimed.remove(&agent);
            }
        }
    }

    pub fn last_completed(&self) -> Option<&Draw> {
        self.completed.last()
    }

    /// Execute the scheduled draw if its time has come, accrue winnings to
    /// the unclaimed ledger, and schedule the next draw.
    pub fn execute_due(
        &mut self,
        now: u64,
        ticket_price: u128,
        draw_interval_secs: u64,
    ) -> Option<DrawOutcome> {
        if !self.due(now) {
            return None;
        }

        let draw = &mut self.current;
        // Public entropy: agent count and pool size, fixed only at draw time.
        let entropy = format!("{}:{}", draw.tickets.len(), draw.total_pool);
        let result = commit_reveal::compute_result(&draw.casino_seed, &entropy, draw.draw_id);
        let winning_number = winning_number_from_hash(&result.bytes);

        let mut winners = Vec::new();
        for (&agent, picks) in &draw.tickets {
            let matches = picks.iter().filter(|&&pick| pick == winning_number).count() as u32;
            if matches == 0 {
                continue;
            }
            let payout = ticket_price
                .saturating_mul(LOTTO_PAYOUT_MULTIPLIER)
                .saturating_mul(matches as u128);
            *self.unclaimed.entry(agent).or_insert(0) += payout;
            winners.push(DrawWinner {
                agent,
                matches,
                payout,
            });
        }

        draw.drawn = true;
        draw.winning_number = Some(winning_number);
        draw.drawn_at = Some(now);

        let outcome = DrawOutcome {
            draw_id: draw.draw_id,
            winning_number,
            total_pool: draw.total_pool,
            winners,
            proof: result.proof,
        };

        let next_id = draw.draw_id + 1;
        let finished = std::mem::replace(
            &mut self.current,
            Draw::schedule(next_id, now + draw_interval_secs),
        );
        self.completed.push(finished);
        if self.completed.len() > DRAW_HISTORY {
            self.completed.remove(0);
        }

        Some(outcome)
    }
}

pub struct Lotto;

impl Lotto {
    fn buy(
        &self,
        channel: Option<&mut Channel>,
        params: &serde_json::Value,
        ctx: &mut GameContext<'_>,
    ) -> Result<GameReply, EngineError> {
        let channel = require_channel(channel, ctx.agent)?;

        let picked = param_u64(params, "pickedNumber")?;
        if picked == 0 || picked > LOTTO_NUMBER_RANGE as u64 {
            return Err(EngineError::BadPick(picked));
        }
        let picked = picked as u8;

        let count = param_u64(params, "ticketCount")? as usize;
        if count == 0 {
            return Err(EngineError::BadParameter("ticketCount".into()));
        }
        let held = ctx.lotto.current.tickets_for(ctx.agent);
        let max = ctx.config.max_tickets_per_draw;
        if held + count > max {
            return Err(EngineError::TicketLimitExceeded {
                held,
                requested: count,
                max,
            });
        }

        let price = ctx.config.ticket_price;
        let cost = price.saturating_mul(count as u128);
        if channel.agent_balance < cost {
            return Err(EngineError::InsufficientBalance {
                have: channel.agent_balance,
                need: cost,
            });
        }
        // An unpayable jackpot must be refused up front.
        let jackpot = price
            .saturating_mul(LOTTO_PAYOUT_MULTIPLIER)
            .saturating_mul(count as u128);
        if jackpot > channel.house_balance {
            return Err(EngineError::HouseCannotCover {
                exposure: jackpot,
                house_balance: channel.house_balance,
            });
        }

        // Ticket money is a wager: agent -> house.
        channel.apply_round(cost, 0)?;
        let draw = &mut ctx.lotto.current;
        draw.tickets
            .entry(ctx.agent)
            .or_default()
            .extend(std::iter::repeat(picked).take(count));
        draw.total_pool += cost;
        let draw_id = draw.draw_id;
        let draw_time = draw.draw_time;
        let commitment = draw.commitment.clone();

        let signed = ctx.sign(channel)?;

        let mut record = RoundRecord::new(
            ctx.agent,
            GameKind::Lotto,
            cost,
            0,
            channel.nonce,
            ctx.now,
        );
        record.picked_number = Some(picked);
        record.draw_id = Some(draw_id);
        record.ticket_count = Some(count as u8);

        let payload = json!({
            "game": "lotto",
            "drawId": draw_id,
            "drawTime": draw_time,
            "commitment": commitment,
            "pickedNumber": picked,
            "ticketCount": count,
            "cost": agentcasino_types::to_decimal(cost),
        });
        Ok(GameReply {
            payload,
            signed: Some(signed),
            round: Some(record),
        })
    }

    fn claim(
        &self,
        channel: Option<&mut Channel>,
        ctx: &mut GameContext<'_>,
    ) -> Result<GameReply, EngineError> {
        let channel = require_channel(channel, ctx.agent)?;

        let unclaimed = ctx.lotto.unclaimed_for(ctx.agent);
        if unclaimed == 0 {
            return Err(EngineError::NothingToClaim);
        }
        let amount = unclaimed.min(channel.house_balance);
        if amount == 0 {
            return Err(EngineError::HouseCannotCover {
                exposure: unclaimed,
                house_balance: channel.house_balance,
            });
        }

        channel.apply_round(0, amount)?;
        ctx.lotto.reduce_unclaimed(ctx.agent, amount);
        let signed = ctx.sign(channel)?;

        let mut record = RoundRecord::new(
            ctx.agent,
            GameKind::Lotto,
            0,
            amount,
            channel.nonce,
            ctx.now,
        );
        record.result = Some("claim".into());

        let remaining = ctx.lotto.unclaimed_for(ctx.agent);
        let payload = json!({
            "game": "lotto",
            "claimed": agentcasino_types::to_decimal(amount),
            "remainingUnclaimed": agentcasino_types::to_decimal(remaining),
        });
        Ok(GameReply {
            payload,
            signed: Some(signed),
            round: Some(record),
        })
    }

    fn status(&self, ctx: &GameContext<'_>) -> GameReply {
        let draw = &ctx.lotto.current;
        let last = ctx.lotto.last_completed().map(|d| {
            json!({
                "drawId": d.draw_id,
                "winningNumber": d.winning_number,
                "totalPool": agentcasino_types::to_decimal(d.total_pool),
                "drawnAt": d.drawn_at,
            })
        });
        GameReply::info(json!({
            "game": "lotto",
            "displayName": "Lotto",
            "ticketPrice": agentcasino_types::to_decimal(ctx.config.ticket_price),
            "payoutMultiplier": LOTTO_PAYOUT_MULTIPLIER,
            "drawId": draw.draw_id,
            "drawTime": draw.draw_time,
            "commitment": draw.commitment,
            "totalPool": agentcasino_types::to_decimal(draw.total_pool),
            "yourTickets": draw.tickets_for(ctx.agent),
            "unclaimed": agentcasino_types::to_decimal(ctx.lotto.unclaimed_for(ctx.agent)),
            "lastDraw": last,
        }))
    }
}

impl Game for Lotto {
    fn kind(&self) -> GameKind {
        GameKind::Lotto
    }

    fn rtp(&self) -> f64 {
        0.85
    }

    fn max_multiplier(&self) -> u128 {
        LOTTO_PAYOUT_MULTIPLIER
    }

    fn actions(&self) -> &'static [GameAction] {
        &[GameAction::Buy, GameAction::Claim, GameAction::Status]
    }

    fn handle(
        &self,
        action: GameAction,
        channel: Option<&mut Channel>,
        params: &serde_json::Value,
        ctx: &mut GameContext<'_>,
    ) -> Result<GameReply, EngineError> {
        match action {
            GameAction::Buy => self.buy(channel, params, ctx),
            GameAction::Claim => self.claim(channel, ctx),
            GameAction::Status => Ok(self.status(ctx)),
            _ => Err(EngineError::UnknownRoute(format!(
                "lotto_{}",
                action.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winning_number_is_in_range() {
        let mut hash = [0u8; 32];
        hash[..4].copy_from_slice(&0u32.to_be_bytes());
        assert_eq!(winning_number_from_hash(&hash), 1);
        hash[..4].copy_from_slice(&99u32.to_be_bytes());
        assert_eq!(winning_number_from_hash(&hash), 100);
        hash[..4].copy_from_slice(&100u32.to_be_bytes());
        assert_eq!(winning_number_from_hash(&hash), 1);
    }

    #[test]
    fn draw_executes_once_and_reschedules() {
        let mut lotto = LottoState::new(0, 100);
        assert!(!lotto.due(99));
        assert!(lotto.due(100));

        let agent = Address::from_low_u64_be(5);
        // Predict the winner from the committed seed and the final entropy.
        let seed = lotto.current.casino_seed().to_string();
        let price = 10u128;
        let entropy = format!("1:{}", 3 * price);
        let expected =
            winning_number_from_hash(&commit_reveal::compute_result(&seed, &entropy, 1).bytes);

        let miss = if expected == 1 { 2 } else { expected - 1 };
        lotto
            .current
            .tickets
            .insert(agent, vec![expected, expected, miss]);
        lotto.current.total_pool = 3 * price;

        let outcome = lotto.execute_due(100, price, 100).unwrap();
        assert_eq!(outcome.draw_id, 1);
        assert_eq!(outcome.winning_number, expected);
        assert_eq!(outcome.winners.len(), 1);
        assert_eq!(outcome.winners[0].matches, 2);
        assert_eq!(outcome.winners[0].payout, price * 85 * 2);
        assert_eq!(lotto.unclaimed_for(agent), price * 85 * 2);

        // Next draw is scheduled; the finished one is retained.
        assert_eq!(lotto.current.draw_id, 2);
        assert_eq!(lotto.current.draw_time, 200);
        assert!(!lotto.due(150));
        assert_eq!(lotto.last_completed().unwrap().draw_id, 1);
        assert!(lotto.execute_due(150, price, 100).is_none());
    }

    #[test]
    fn reduce_unclaimed_clears_empty_entries() {
        let mut lotto = LottoState::new(0, 100);
        let agent = Address::from_low_u64_be(1);
        lotto.unclaimed.insert(agent, 50);
        lotto.reduce_unclaimed(agent, 20);
        assert_eq!(lotto.unclaimed_for(agent), 30);
        lotto.reduce_unclaimed(agent, 30);
        assert_eq!(lotto.unclaimed_for(agent), 0);
        assert!(lotto.unclaimed.is_empty());
    }
}
