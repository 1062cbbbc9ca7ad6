//! End-to-end engine scenarios.
//!
//! Wallet keys and seeds here are fixed so every outcome is reproducible;
//! the slots/coinflip seeds were chosen offline to hit specific reels and
//! flips.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Signature};
use serde_json::{json, Value};

use agentcasino_types::{
    commit_reveal, recover_signer, to_wei, ChannelDomain, ChannelState, CoinSide, EngineConfig,
    GameKind,
};

use crate::engine::ChannelEngine;
use crate::error::EngineError;
use crate::signer::testing::FailingSigner;
use crate::signer::WalletSigner;

const HOUSE_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe51296170827936ea5cce4b76994b0f";

/// Casino seed the deterministic-outcome tests install into pending commits.
const FIXED_SEED: &str = "aabbccddeeff00112233445566778899aabbccddeeff00112233445566778899";

// Agent seeds chosen offline against FIXED_SEED at round nonce 1:
// - "agentseed487" -> slots rolls [99,94,96]: three sevens
// - "as5"          -> slots rolls [10,28,3]: triple of symbol 0
// - "mix4"         -> slots rolls [34,74,92]: mixed, no payout
// - "flip3"        -> coinflip u32 even: heads
// - "flop0"        -> coinflip u32 odd: tails
const SEED_THREE_SEVENS: &str = "agentseed487";
const SEED_TRIPLE_CHERRY: &str = "as5";
const SEED_MIXED: &str = "mix4";
const SEED_HEADS: &str = "flip3";
const SEED_TAILS: &str = "flop0";

fn house_wallet() -> LocalWallet {
    HOUSE_KEY.parse().unwrap()
}

fn domain() -> ChannelDomain {
    ChannelDomain::new(31_337, Address::from_low_u64_be(0x5e771e))
}

fn engine() -> ChannelEngine<WalletSigner> {
    engine_with(EngineConfig::default())
}

fn engine_with(config: EngineConfig) -> ChannelEngine<WalletSigner> {
    ChannelEngine::new(WalletSigner::new(house_wallet()), domain(), config, 1_000)
}

fn agent() -> Address {
    Address::from_low_u64_be(0xA6E17)
}

fn eth(s: &str) -> u128 {
    to_wei(s).unwrap()
}

fn parse_signature(raw: &str) -> Signature {
    raw.trim_start_matches("0x").parse().unwrap()
}

/// Swap the randomly generated casino seed of a pending commit for a fixed
/// one, so the reveal outcome is the precomputed one.
fn force_pending_seed(engine: &mut ChannelEngine<WalletSigner>, game: GameKind) {
    let mut commit = engine
        .pending_commits_mut()
        .remove(agent(), game)
        .expect("pending commit to pin");
    commit.casino_seed = FIXED_SEED.to_string();
    commit.commitment = commit_reveal::commitment_for(FIXED_SEED);
    engine.pending_commits_mut().restore(agent(), game, commit);
}

fn reveal(engine: &mut ChannelEngine<WalletSigner>, route: &str, seed: &str, now: u64) -> Value {
    engine
        .handle_action(route, agent(), &json!({ "agentSeed": seed }), now)
        .unwrap()
}

#[test]
fn open_close_with_no_games_settles_deposits_unchanged() {
    let mut engine = engine();
    let open = engine
        .open_channel(agent(), eth("0.01"), eth("0.01"), 1_000)
        .unwrap();
    assert_eq!(open.agent_balance, eth("0.01"));
    assert_eq!(open.house_balance, eth("0.01"));
    assert_eq!(engine.bankroll().total_locked(), eth("0.01"));

    let close = engine.close_channel(agent(), 2_000).unwrap();
    assert_eq!(close.nonce, 0);
    assert_eq!(close.agent_balance, eth("0.01"));
    assert_eq!(close.house_balance, eth("0.01"));
    assert_eq!(close.total_games, 0);
    assert_eq!(engine.channel_count(), 0);
    assert_eq!(engine.bankroll().total_locked(), 0);

    // The final signature recovers to the house over the exact struct.
    let state = ChannelState::new(agent(), close.agent_balance, close.house_balance, close.nonce);
    let signature = parse_signature(&close.signature);
    assert_eq!(
        recover_signer(&state, &domain(), &signature).unwrap(),
        house_wallet().address()
    );
}

#[test]
fn slots_three_sevens_pays_290x() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("1"), eth("5"), 1_000).unwrap();

    let commit = engine
        .handle_action("slots_commit", agent(), &json!({ "bet": "0.001" }), 1_000)
        .unwrap();
    assert!(commit["commitment"].is_string());
    force_pending_seed(&mut engine, GameKind::Slots);

    let result = reveal(&mut engine, "slots_reveal", SEED_THREE_SEVENS, 1_010);
    assert_eq!(result["won"], true);
    assert_eq!(result["payout"], "0.29");
    assert_eq!(result["symbols"], json!(["seven", "seven", "seven"]));
    assert_eq!(result["agentBalance"], "1.289");
    assert_eq!(result["houseBalance"], "4.711");
    assert_eq!(result["nonce"], 1);

    let channel = engine.channel(agent()).unwrap();
    assert!(channel.conserved());
    assert_eq!(channel.games.len(), 1);

    // The revealed seed matches the commitment in the proof.
    let proof = &result["proof"];
    assert!(commit_reveal::verify(
        result["commitment"].as_str().unwrap(),
        proof["casino_seed"].as_str().unwrap()
    ));

    // The returned signature recovers to the house.
    let state = ChannelState::new(agent(), eth("1.289"), eth("4.711"), 1);
    let signature = parse_signature(result["signature"].as_str().unwrap());
    assert_eq!(
        recover_signer(&state, &domain(), &signature).unwrap(),
        house_wallet().address()
    );
}

#[test]
fn slots_low_triple_and_mixed_reels() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("1"), eth("5"), 1_000).unwrap();

    engine
        .handle_action("slots_commit", agent(), &json!({ "bet": "0.001" }), 1_000)
        .unwrap();
    force_pending_seed(&mut engine, GameKind::Slots);
    let result = reveal(&mut engine, "slots_reveal", SEED_TRIPLE_CHERRY, 1_001);
    assert_eq!(result["payout"], "0.005", "triple of symbol 0 pays 5x");

    engine
        .handle_action("slots_commit", agent(), &json!({ "bet": "0.001" }), 1_002)
        .unwrap();
    // Round nonce is now 2; the mixed seed was picked for nonce 1, but any
    // non-triple outcome pays zero regardless, so just assert the math.
    let before = engine.channel(agent()).unwrap().agent_balance;
    let result = reveal(&mut engine, "slots_reveal", SEED_MIXED, 1_003);
    let after = engine.channel(agent()).unwrap();
    assert!(after.conserved());
    assert_eq!(after.nonce, 2);
    if result["won"] == false {
        assert_eq!(after.agent_balance, before - eth("0.001"));
    }
}

#[test]
fn coinflip_loss_moves_bet_to_house() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("0.1"), eth("0.1"), 1_000).unwrap();

    engine
        .handle_action(
            "coinflip_commit",
            agent(),
            &json!({ "bet": "0.01", "choice": "heads" }),
            1_000,
        )
        .unwrap();
    force_pending_seed(&mut engine, GameKind::Coinflip);

    let result = reveal(&mut engine, "coinflip_reveal", SEED_TAILS, 1_005);
    assert_eq!(result["result"], "tails");
    assert_eq!(result["won"], false);
    assert_eq!(result["agentBalance"], "0.09");
    assert_eq!(result["houseBalance"], "0.11");
    assert_eq!(result["nonce"], 1);
    assert!(engine.channel(agent()).unwrap().conserved());
}

#[test]
fn coinflip_win_pays_19_over_10() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("0.1"), eth("0.1"), 1_000).unwrap();

    engine
        .handle_action(
            "coinflip_commit",
            agent(),
            &json!({ "bet": "0.01", "choice": "heads" }),
            1_000,
        )
        .unwrap();
    force_pending_seed(&mut engine, GameKind::Coinflip);

    let result = reveal(&mut engine, "coinflip_reveal", SEED_HEADS, 1_005);
    assert_eq!(result["result"], "heads");
    assert_eq!(result["won"], true);
    // Net +0.009: stake 0.01 returned as 0.019.
    assert_eq!(result["agentBalance"], "0.109");
    assert_eq!(result["houseBalance"], "0.091");
}

#[test]
fn one_wei_coinflip_win_pays_one_wei() {
    let mut engine = engine();
    engine.open_channel(agent(), 1_000, 1_000, 1_000).unwrap();

    engine
        .handle_action(
            "coinflip_commit",
            agent(),
            &json!({ "bet": "0.000000000000000001", "choice": "heads" }),
            1_000,
        )
        .unwrap();
    force_pending_seed(&mut engine, GameKind::Coinflip);

    let before = engine.channel(agent()).unwrap().clone();
    reveal(&mut engine, "coinflip_reveal", SEED_HEADS, 1_005);
    let after = engine.channel(agent()).unwrap();

    // 1 * 19 / 10 truncates to 1: the win returns exactly the stake.
    assert_eq!(after.agent_balance, before.agent_balance);
    assert_eq!(after.house_balance, before.house_balance);
    assert_eq!(after.nonce, 1);
    assert!(after.conserved());
}

#[test]
fn bet_at_exposure_boundary_is_accepted_one_wei_more_rejected() {
    let mut engine = engine();
    // house = 5.8 ether; slots boundary bet = house / (290 * 2) = 0.01 ether.
    engine.open_channel(agent(), eth("1"), eth("5.8"), 1_000).unwrap();

    let boundary = eth("5.8") / (290 * 2);
    assert_eq!(boundary, eth("0.01"));

    engine
        .handle_action(
            "slots_commit",
            agent(),
            &json!({ "bet": agentcasino_types::to_decimal(boundary) }),
            1_000,
        )
        .unwrap();

    // A second commit must use another game; coinflip boundary is higher, so
    // try one wei past the slots boundary after clearing the first commit.
    engine.pending_commits_mut().remove(agent(), GameKind::Slots);
    let over = agentcasino_types::to_decimal(boundary + 1);
    let err = engine
        .handle_action("slots_commit", agent(), &json!({ "bet": over }), 1_001)
        .unwrap_err();
    assert!(matches!(err, EngineError::HouseCannotCover { .. }));
}

#[test]
fn second_commit_same_game_rejected_other_game_allowed() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("1"), eth("5"), 1_000).unwrap();

    engine
        .handle_action("slots_commit", agent(), &json!({ "bet": "0.001" }), 1_000)
        .unwrap();
    let err = engine
        .handle_action("slots_commit", agent(), &json!({ "bet": "0.001" }), 1_001)
        .unwrap_err();
    assert!(matches!(err, EngineError::PendingCommitExists { .. }));

    // A different game commits in parallel.
    engine
        .handle_action(
            "coinflip_commit",
            agent(),
            &json!({ "bet": "0.001", "choice": "tails" }),
            1_001,
        )
        .unwrap();
    assert_eq!(engine.pending_commits().len(), 2);
}

#[test]
fn reveal_after_timeout_fails_and_clears_the_slot() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("1"), eth("5"), 1_000).unwrap();

    engine
        .handle_action("slots_commit", agent(), &json!({ "bet": "0.001" }), 1_000)
        .unwrap();

    // 301 seconds later the commit is expired.
    let err = engine
        .handle_action(
            "slots_reveal",
            agent(),
            &json!({ "agentSeed": "anything" }),
            1_301,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::CommitExpired { .. }));
    assert!(engine
        .pending_commits()
        .get(agent(), GameKind::Slots)
        .is_none());

    // The channel is untouched and a new commit goes through.
    let channel = engine.channel(agent()).unwrap();
    assert_eq!(channel.nonce, 0);
    assert_eq!(channel.agent_balance, eth("1"));
    engine
        .handle_action("slots_commit", agent(), &json!({ "bet": "0.001" }), 1_302)
        .unwrap();
}

#[test]
fn lotto_win_spans_channel_close_and_reopen() {
    let config = EngineConfig {
        draw_interval_secs: 100,
        ..EngineConfig::default()
    };
    let mut engine = engine_with(config);
    engine.open_channel(agent(), eth("0.1"), eth("0.1"), 1_000).unwrap();

    // Predict the winning number from the committed draw seed and the
    // entropy this single purchase will produce.
    let price = engine.config().ticket_price;
    let seed = engine.lotto_state().current.casino_seed().to_string();
    let entropy = format!("1:{price}");
    let winning = crate::games::winning_number_from_hash(
        &commit_reveal::compute_result(&seed, &entropy, 1).bytes,
    );

    engine
        .handle_action(
            "lotto_buy",
            agent(),
            &json!({ "pickedNumber": winning, "ticketCount": 1 }),
            1_000,
        )
        .unwrap();

    // Close before the draw; ticket money stays with the house.
    let close = engine.close_channel(agent(), 1_050).unwrap();
    assert_eq!(close.nonce, 1);
    assert_eq!(close.agent_balance, eth("0.1") - price);

    // Draw fires with no channel open for the winner.
    let report = engine.run_scheduled(1_100);
    assert_eq!(report.draws.len(), 1);
    assert_eq!(report.draws[0].winning_number, winning);
    assert!(report.winnings_applied.is_empty());
    let expected = price * 85;
    assert_eq!(engine.lotto_state().unclaimed_for(agent()), expected);

    // Reopen and claim: min(unclaimed, house balance) folds in.
    engine.open_channel(agent(), eth("0.01"), eth("0.1"), 1_200).unwrap();
    let claim = engine
        .handle_action("lotto_claim", agent(), &json!({}), 1_210)
        .unwrap();
    assert_eq!(claim["claimed"], agentcasino_types::to_decimal(expected));
    assert_eq!(claim["nonce"], 1);
    assert_eq!(engine.lotto_state().unclaimed_for(agent()), 0);

    let channel = engine.channel(agent()).unwrap();
    assert_eq!(channel.agent_balance, eth("0.01") + expected);
    assert!(channel.conserved());
}

#[test]
fn claim_is_capped_by_house_balance() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("0.01"), eth("0.05"), 1_000).unwrap();
    engine.lotto_mut().set_unclaimed(agent(), eth("0.085"));

    let claim = engine
        .handle_action("lotto_claim", agent(), &json!({}), 1_010)
        .unwrap();
    assert_eq!(claim["claimed"], "0.05");
    assert_eq!(claim["remainingUnclaimed"], "0.035");
    assert_eq!(engine.lotto_state().unclaimed_for(agent()), eth("0.035"));
    let channel = engine.channel(agent()).unwrap();
    assert_eq!(channel.house_balance, 0);
    assert!(channel.conserved());
}

#[test]
fn scheduler_applies_winnings_into_open_channel() {
    let config = EngineConfig {
        draw_interval_secs: 100,
        ..EngineConfig::default()
    };
    let mut engine = engine_with(config);
    engine.open_channel(agent(), eth("0.1"), eth("0.5"), 1_000).unwrap();

    let price = engine.config().ticket_price;
    let seed = engine.lotto_state().current.casino_seed().to_string();
    let entropy = format!("1:{price}");
    let winning = crate::games::winning_number_from_hash(
        &commit_reveal::compute_result(&seed, &entropy, 1).bytes,
    );

    engine
        .handle_action(
            "lotto_buy",
            agent(),
            &json!({ "pickedNumber": winning, "ticketCount": 1 }),
            1_000,
        )
        .unwrap();

    let report = engine.run_scheduled(1_100);
    assert_eq!(report.winnings_applied, vec![(agent(), price * 85)]);
    assert_eq!(engine.lotto_state().unclaimed_for(agent()), 0);

    let channel = engine.channel(agent()).unwrap();
    // Nonce 1 for the buy, 2 for the applied winnings.
    assert_eq!(channel.nonce, 2);
    assert!(channel.conserved());
    assert_eq!(channel.agent_balance, eth("0.1") - price + price * 85);
}

#[test]
fn ticket_limit_is_enforced_per_draw() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("1"), eth("5"), 1_000).unwrap();

    engine
        .handle_action(
            "lotto_buy",
            agent(),
            &json!({ "pickedNumber": 42, "ticketCount": 7 }),
            1_000,
        )
        .unwrap();
    let err = engine
        .handle_action(
            "lotto_buy",
            agent(),
            &json!({ "pickedNumber": 42, "ticketCount": 4 }),
            1_001,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::TicketLimitExceeded {
            held: 7,
            requested: 4,
            max: 10
        }
    ));
    // Nothing was charged for the rejected purchase.
    let channel = engine.channel(agent()).unwrap();
    assert_eq!(channel.nonce, 1);
    assert!(channel.conserved());
}

#[test]
fn tampered_channel_is_reported_and_refuses_to_close() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("0.1"), eth("0.1"), 1_000).unwrap();

    engine.channel_mut(agent()).unwrap().agent_balance += eth("1");

    let status = engine.channel_status(agent());
    assert!(!status.invariant_ok);

    let err = engine.close_channel(agent(), 1_010).unwrap_err();
    assert!(matches!(err, EngineError::Invariant(_)));
    // The channel is not destroyed and no signed state was produced.
    assert!(engine.channel(agent()).is_some());
}

#[test]
fn signing_failure_rolls_the_mutation_back() {
    let house = Address::from_low_u64_be(0xF0);
    let mut engine = ChannelEngine::new(
        FailingSigner { address: house },
        domain(),
        EngineConfig::default(),
        1_000,
    );
    engine.open_channel(agent(), eth("1"), eth("5"), 1_000).unwrap();

    engine
        .handle_action("slots_commit", agent(), &json!({ "bet": "0.001" }), 1_000)
        .unwrap();
    let err = engine
        .handle_action(
            "slots_reveal",
            agent(),
            &json!({ "agentSeed": "seed" }),
            1_010,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Signer(_)));

    // Balances and nonce untouched, and the pending commit survives so the
    // reveal can be retried once the signer is back.
    let channel = engine.channel(agent()).unwrap();
    assert_eq!(channel.nonce, 0);
    assert_eq!(channel.agent_balance, eth("1"));
    assert!(engine
        .pending_commits()
        .get(agent(), GameKind::Slots)
        .is_some());
}

#[test]
fn duplicate_open_and_channel_cap_are_rejected() {
    let config = EngineConfig {
        max_channels: 1,
        ..EngineConfig::default()
    };
    let mut engine = engine_with(config);
    engine.open_channel(agent(), eth("0.01"), eth("0.01"), 1_000).unwrap();

    assert!(matches!(
        engine.open_channel(agent(), eth("0.01"), eth("0.01"), 1_001),
        Err(EngineError::ChannelExists(_))
    ));
    let other = Address::from_low_u64_be(2);
    assert!(matches!(
        engine.open_channel(other, eth("0.01"), eth("0.01"), 1_001),
        Err(EngineError::ChannelLimitReached(1))
    ));
}

#[test]
fn bankroll_cap_bounds_total_house_funding() {
    let config = EngineConfig {
        max_exposure: eth("0.015"),
        ..EngineConfig::default()
    };
    let mut engine = engine_with(config);
    engine.open_channel(agent(), eth("0.01"), eth("0.01"), 1_000).unwrap();

    let other = Address::from_low_u64_be(2);
    assert!(matches!(
        engine.open_channel(other, eth("0.01"), eth("0.01"), 1_001),
        Err(EngineError::Bankroll(_))
    ));

    // Closing the first channel releases the exposure.
    engine.close_channel(agent(), 1_002).unwrap();
    engine.open_channel(other, eth("0.01"), eth("0.01"), 1_003).unwrap();
}

#[test]
fn unknown_routes_and_missing_channels_are_validation_errors() {
    let mut engine = engine();
    assert!(matches!(
        engine.handle_action("poker_deal", agent(), &json!({}), 1_000),
        Err(EngineError::UnknownRoute(_))
    ));
    assert!(matches!(
        engine.handle_action("slots_commit", agent(), &json!({ "bet": "1" }), 1_000),
        Err(EngineError::ChannelNotFound(_))
    ));
    // Info actions work without a channel.
    let status = engine
        .handle_action("slots_status", agent(), &json!({}), 1_000)
        .unwrap();
    assert_eq!(status["game"], "slots");
    assert_eq!(status["rtp"], 0.95);
}

#[test]
fn events_flow_through_the_ring_buffer() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("0.1"), eth("0.1"), 1_000).unwrap();
    engine
        .handle_action(
            "coinflip_commit",
            agent(),
            &json!({ "bet": "0.001", "choice": "heads" }),
            1_001,
        )
        .unwrap();
    reveal(&mut engine, "coinflip_reveal", "any-seed", 1_002);
    engine.close_channel(agent(), 1_003).unwrap();

    let events = engine.events_since(0);
    let kinds: Vec<_> = events
        .iter()
        .map(|(_, e)| (e.kind.as_str(), e.action.as_str()))
        .collect();
    assert!(kinds.contains(&("channel", "open")));
    assert!(kinds.contains(&("game", "coinflip_reveal")));
    assert!(kinds.contains(&("channel", "close")));
}

#[test]
fn entropy_rounds_expire_via_the_scheduler() {
    let mut engine = engine();
    let provider = Address::from_low_u64_be(0xE27);
    let ttl = engine.config().entropy_ttl_secs;
    engine.enable_entropy(provider);
    engine
        .entropy_mut()
        .unwrap()
        .request(1, agent(), eth("0.01"), CoinSide::Heads, 0, 1_000)
        .unwrap();

    // Inside the TTL the round stays requested.
    assert_eq!(engine.run_scheduled(1_000 + ttl - 1).entropy_expired, 0);

    let report = engine.run_scheduled(1_000 + ttl);
    assert_eq!(report.entropy_expired, 1);
    assert_eq!(
        engine.entropy().unwrap().get(1).unwrap().phase,
        agentcasino_entropy::RoundPhase::Expired
    );
}

#[test]
fn stats_accumulate_per_game() {
    let mut engine = engine();
    engine.open_channel(agent(), eth("1"), eth("5"), 1_000).unwrap();
    engine
        .handle_action("slots_commit", agent(), &json!({ "bet": "0.002" }), 1_000)
        .unwrap();
    reveal(&mut engine, "slots_reveal", "whatever", 1_001);

    let stats = engine.stats(GameKind::Slots);
    assert_eq!(stats.rounds, 1);
    assert_eq!(stats.wagered, eth("0.002"));
    assert_eq!(engine.stats(GameKind::Coinflip).rounds, 0);
}
