//! The off-chain channel engine.
//!
//! Owns the in-memory channel table, the pending-commit store, the bankroll
//! guard and the lotto schedule. Every successful mutation advances the
//! channel nonce by exactly 1 and returns a fresh house-signed state; every
//! error leaves the engine exactly as it was (signing failures roll the
//! in-memory mutation back before the error surfaces).
//!
//! One logical mutator runs per channel: callers serialize operations on
//! the same agent, and nothing here suspends except the signer port.

use ethers::types::Address;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use agentcasino_entropy::EntropyRounds;
use agentcasino_types::{
    BankrollGuard, Channel, ChannelDomain, ChannelStatus, EngineConfig, EventRecord, GameAction,
    GameKind, GameStats, RoundRecord,
};

use crate::error::{EngineError, FailureClass};
use crate::events::EventBus;
use crate::games::{Coinflip, DrawOutcome, Game, GameContext, Lotto, LottoState, Slots};
use crate::messages::{ChannelStatusReply, CloseChannelReply, OpenChannelReply, SignedState};
use crate::pending::PendingCommits;
use crate::signer::StateSigner;

/// What one scheduler tick did.
#[derive(Debug, Default)]
pub struct ScheduledReport {
    pub commits_expired: usize,
    /// External entropy rounds expired by the sweep (0 when the entropy
    /// path is not enabled).
    pub entropy_expired: usize,
    pub draws: Vec<DrawOutcome>,
    /// Winnings folded directly into open channels: `(agent, amount)`.
    pub winnings_applied: Vec<(Address, u128)>,
}

pub struct ChannelEngine<S: StateSigner> {
    signer: S,
    domain: ChannelDomain,
    config: EngineConfig,
    channels: HashMap<Address, Channel>,
    pending: PendingCommits,
    bankroll: BankrollGuard,
    lotto: LottoState,
    games: Vec<Box<dyn Game>>,
    routes: HashMap<String, (usize, GameAction)>,
    stats: HashMap<GameKind, GameStats>,
    events: EventBus,
    /// External entropy path; populated by [`ChannelEngine::enable_entropy`].
    entropy: Option<EntropyRounds>,
}

impl<S: StateSigner> ChannelEngine<S> {
    pub fn new(signer: S, domain: ChannelDomain, config: EngineConfig, now: u64) -> Self {
        let games: Vec<Box<dyn Game>> = vec![Box::new(Slots), Box::new(Coinflip), Box::new(Lotto)];
        let mut routes = HashMap::new();
        for (index, game) in games.iter().enumerate() {
            for &action in game.actions() {
                let route = format!("{}_{}", game.kind().as_str(), action.as_str());
                routes.insert(route, (index, action));
            }
        }
        Self {
            pending: PendingCommits::new(config.commit_timeout_secs),
            bankroll: BankrollGuard::new(config.max_exposure),
            lotto: LottoState::new(now, config.draw_interval_secs),
            signer,
            domain,
            config,
            channels: HashMap::new(),
            games,
            routes,
            stats: HashMap::new(),
            events: EventBus::default(),
            entropy: None,
        }
    }

    /// Wire the external entropy path: rounds request randomness from
    /// `provider` and expire after the configured TTL.
    pub fn enable_entropy(&mut self, provider: Address) {
        self.entropy = Some(EntropyRounds::new(provider, self.config.entropy_ttl_secs));
    }

    pub fn entropy(&self) -> Option<&EntropyRounds> {
        self.entropy.as_ref()
    }

    pub fn entropy_mut(&mut self) -> Option<&mut EntropyRounds> {
        self.entropy.as_mut()
    }

    pub fn house_address(&self) -> Address {
        self.signer.address()
    }

    pub fn domain(&self) -> &ChannelDomain {
        &self.domain
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn channel(&self, agent: Address) -> Option<&Channel> {
        self.channels.get(&agent)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn bankroll(&self) -> &BankrollGuard {
        &self.bankroll
    }

    pub fn stats(&self, game: GameKind) -> GameStats {
        self.stats.get(&game).copied().unwrap_or_default()
    }

    /// Events with sequence number >= `from` (bounded ring; oldest may be gone).
    pub fn events_since(&self, from: u64) -> Vec<(u64, EventRecord)> {
        self.events.since(from)
    }

    /// Mirror an on-chain open plus house funding into the engine.
    pub fn open_channel(
        &mut self,
        agent: Address,
        agent_deposit: u128,
        house_deposit: u128,
        now: u64,
    ) -> Result<OpenChannelReply, EngineError> {
        if agent_deposit == 0 {
            return Err(EngineError::BadAmount("agent deposit must be positive".into()));
        }
        if self.channels.contains_key(&agent) {
            return Err(EngineError::ChannelExists(agent));
        }
        if self.channels.len() >= self.config.max_channels {
            return Err(EngineError::ChannelLimitReached(self.config.max_channels));
        }
        self.bankroll.lock(house_deposit)?;

        let channel = Channel::open(agent, agent_deposit, house_deposit, now);
        info!(
            agent = ?agent,
            agent_deposit,
            house_deposit,
            locked = self.bankroll.total_locked(),
            "channel opened"
        );
        let reply = OpenChannelReply {
            status: channel.status,
            agent_balance: channel.agent_balance,
            house_balance: channel.house_balance,
        };
        self.channels.insert(agent, channel);
        self.publish(now, "channel", "open", Some(agent), json!({ "status": "open" }));
        Ok(reply)
    }

    pub fn channel_status(&self, agent: Address) -> ChannelStatusReply {
        match self.channels.get(&agent) {
            None => ChannelStatusReply {
                status: "none",
                agent_balance: 0,
                house_balance: 0,
                nonce: 0,
                games_played: 0,
                invariant_ok: true,
            },
            Some(channel) => ChannelStatusReply {
                status: match channel.status {
                    ChannelStatus::Open => "open",
                    ChannelStatus::Disputed => "disputed",
                    ChannelStatus::Closed => "closed",
                },
                agent_balance: channel.agent_balance,
                house_balance: channel.house_balance,
                nonce: channel.nonce,
                games_played: channel.games.len(),
                invariant_ok: channel.conserved(),
            },
        }
    }

    /// Produce the final signed state and destroy the channel.
    ///
    /// Conservation is recomputed first; a violation means a bug or tamper,
    /// and the engine refuses to sign anything for that channel.
    pub fn close_channel(
        &mut self,
        agent: Address,
        now: u64,
    ) -> Result<CloseChannelReply, EngineError> {
        let channel = self
            .channels
            .get(&agent)
            .ok_or(EngineError::ChannelNotFound(agent))?;
        if let Err(violation) = channel.validate_invariants() {
            warn!(agent = ?agent, %violation, "refusing to close channel");
            return Err(EngineError::Invariant(violation));
        }

        let signature = self.signer.sign_state(&channel.state(), &self.domain)?;
        let house_deposit = channel.house_deposit;
        self.bankroll.unlock(house_deposit)?;
        let channel = self
            .channels
            .remove(&agent)
            .expect("channel presence checked above");

        info!(
            agent = ?agent,
            nonce = channel.nonce,
            games = channel.games.len(),
            "channel closed"
        );
        let reply = CloseChannelReply {
            agent_balance: channel.agent_balance,
            house_balance: channel.house_balance,
            nonce: channel.nonce,
            signature: SignedState::new(&channel, &signature).signature,
            total_games: channel.games.len(),
        };
        self.publish(
            now,
            "channel",
            "close",
            Some(agent),
            json!({ "nonce": channel.nonce, "games": channel.games.len() }),
        );
        Ok(reply)
    }

    /// Route a `"<game>_<action>"` message to its game.
    ///
    /// Info actions run without a channel; everything else requires one.
    /// On any error the channel, the pending slot (unless a liveness expiry
    /// cleaned it) and the lotto state are restored untouched.
    pub fn handle_action(
        &mut self,
        route: &str,
        agent: Address,
        params: &Value,
        now: u64,
    ) -> Result<Value, EngineError> {
        let (index, action) = match self.routes.get(route) {
            Some(&entry) => entry,
            None => return Err(EngineError::UnknownRoute(route.to_string())),
        };
        let kind = self.games[index].kind();

        if !action.is_info() && !self.channels.contains_key(&agent) {
            return Err(EngineError::ChannelNotFound(agent));
        }

        // Whole-mutation rollback state.
        let channel_before = self.channels.get(&agent).cloned();
        let pending_before = self.pending.get(agent, kind).cloned();
        let draw_before = self.lotto.current.clone();
        let unclaimed_before = self.lotto.unclaimed_for(agent);

        let result = {
            let Self {
                channels,
                pending,
                lotto,
                games,
                config,
                signer,
                domain,
                ..
            } = self;
            let mut ctx = GameContext {
                agent,
                now,
                pending,
                lotto,
                config,
                signer: &*signer,
                domain,
            };
            games[index].handle(action, channels.get_mut(&agent), params, &mut ctx)
        };

        match result {
            Ok(reply) => {
                if let Some(round) = &reply.round {
                    self.stats
                        .entry(kind)
                        .or_default()
                        .record(round.bet, round.payout);
                    if let Some(channel) = self.channels.get_mut(&agent) {
                        channel.games.push(round.clone());
                        debug_assert!(channel.conserved());
                    }
                    debug!(
                        agent = ?agent,
                        game = %kind,
                        bet = round.bet,
                        payout = round.payout,
                        nonce = round.nonce,
                        "round resolved"
                    );
                }
                let payload = merge_signed(reply.payload, reply.signed);
                if reply.round.is_some() {
                    self.publish(now, "game", route, Some(agent), payload.clone());
                }
                Ok(payload)
            }
            Err(err) => {
                match channel_before {
                    Some(channel) => {
                        self.channels.insert(agent, channel);
                    }
                    None => {
                        self.channels.remove(&agent);
                    }
                }
                if err.class() == FailureClass::Liveness {
                    // Expiries clean their pending slot by contract.
                    self.pending.remove(agent, kind);
                } else {
                    match pending_before {
                        Some(commit) => self.pending.restore(agent, kind, commit),
                        None => {
                            self.pending.remove(agent, kind);
                        }
                    }
                }
                self.lotto.current = draw_before;
                self.lotto.set_unclaimed(agent, unclaimed_before);
                debug!(agent = ?agent, route, error = %err, "action rejected");
                Err(err)
            }
        }
    }

    /// Scheduler tick: reclaim expired commits, execute due lotto draws and
    /// fold winnings into channels that are still open. Observable channel
    /// effects are indistinguishable from normal mutations.
    pub fn run_scheduled(&mut self, now: u64) -> ScheduledReport {
        let mut report = ScheduledReport {
            commits_expired: self.pending.sweep_expired(now),
            entropy_expired: self
                .entropy
                .as_mut()
                .map_or(0, |rounds| rounds.sweep_expired(now)),
            ..ScheduledReport::default()
        };

        while let Some(outcome) = self.lotto.execute_due(
            now,
            self.config.ticket_price,
            self.config.draw_interval_secs,
        ) {
            info!(
                draw_id = outcome.draw_id,
                winning_number = outcome.winning_number,
                winners = outcome.winners.len(),
                "lotto draw executed"
            );
            self.publish(
                now,
                "lotto",
                "draw",
                None,
                json!({
                    "drawId": outcome.draw_id,
                    "winningNumber": outcome.winning_number,
                    "winners": outcome.winners.len(),
                    "proof": outcome.proof,
                }),
            );
            for winner in &outcome.winners {
                if let Some(amount) = self.apply_winnings(winner.agent, now) {
                    report.winnings_applied.push((winner.agent, amount));
                }
            }
            report.draws.push(outcome);
        }
        report
    }

    /// Fold an agent's unclaimed winnings into its open channel, if any.
    /// Bumps the nonce by exactly 1 and signs, like any other mutation.
    fn apply_winnings(&mut self, agent: Address, now: u64) -> Option<u128> {
        let unclaimed = self.lotto.unclaimed_for(agent);
        if unclaimed == 0 {
            return None;
        }
        let channel = self.channels.get_mut(&agent)?;
        if channel.status != ChannelStatus::Open {
            return None;
        }
        let amount = unclaimed.min(channel.house_balance);
        if amount == 0 {
            return None;
        }

        let rollback = (channel.agent_balance, channel.house_balance, channel.nonce);
        channel.apply_round(0, amount).ok()?;
        match self.signer.sign_state(&channel.state(), &self.domain) {
            Ok(signature) => {
                let mut record =
                    RoundRecord::new(agent, GameKind::Lotto, 0, amount, channel.nonce, now);
                record.result = Some("draw_winnings".into());
                let signed = SignedState::new(channel, &signature);
                channel.games.push(record);
                self.lotto.reduce_unclaimed(agent, amount);
                self.stats.entry(GameKind::Lotto).or_default().record(0, amount);
                self.events.publish(EventRecord {
                    ts: now,
                    kind: "lotto".to_string(),
                    action: "apply_winnings".to_string(),
                    agent: Some(agent),
                    result: merge_signed(
                        json!({ "amount": agentcasino_types::to_decimal(amount) }),
                        Some(signed),
                    ),
                });
                Some(amount)
            }
            Err(err) => {
                // Winnings stay unclaimed; the agent can claim later.
                (channel.agent_balance, channel.house_balance, channel.nonce) = rollback;
                warn!(agent = ?agent, error = %err, "winnings application rolled back");
                None
            }
        }
    }

    fn publish(&mut self, now: u64, kind: &str, action: &str, agent: Option<Address>, result: Value) {
        self.events.publish(EventRecord {
            ts: now,
            kind: kind.to_string(),
            action: action.to_string(),
            agent,
            result,
        });
    }

    #[cfg(test)]
    pub(crate) fn channel_mut(&mut self, agent: Address) -> Option<&mut Channel> {
        self.channels.get_mut(&agent)
    }

    #[cfg(test)]
    pub(crate) fn lotto_mut(&mut self) -> &mut LottoState {
        &mut self.lotto
    }

    #[cfg(test)]
    pub(crate) fn lotto_state(&self) -> &LottoState {
        &self.lotto
    }

    #[cfg(test)]
    pub(crate) fn pending_commits(&self) -> &PendingCommits {
        &self.pending
    }

    #[cfg(test)]
    pub(crate) fn pending_commits_mut(&mut self) -> &mut PendingCommits {
        &mut self.pending
    }
}

fn merge_signed(payload: Value, signed: Option<SignedState>) -> Value {
    let Some(signed) = signed else {
        return payload;
    };
    let mut payload = payload;
    if let (Value::Object(map), Ok(Value::Object(extra))) =
        (&mut payload, serde_json::to_value(&signed))
    {
        map.extend(extra);
    }
    payload
}
