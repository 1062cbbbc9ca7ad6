//! Drive a full channel session against an in-process engine: open, play
//! slots/coinflip/lotto, let the scheduler fire a draw, then close. Prints
//! realized RTP per game so the payout tables can be eyeballed against
//! their theoretical returns.
//!
//! ```text
//! cargo run -p agentcasino-engine --example session
//! ```

use anyhow::Result;
use ethers::signers::LocalWallet;
use ethers::types::Address;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use agentcasino_engine::{ChannelEngine, WalletSigner};
use agentcasino_types::{to_decimal, to_wei, ChannelDomain, EngineConfig, GameKind};

const ROUNDS: usize = 2_000;
const HOUSE_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe51296170827936ea5cce4b76994b0f";

fn realized_rtp(wagered: u128, paid_out: u128) -> f64 {
    if wagered == 0 {
        return 0.0;
    }
    paid_out as f64 / wagered as f64
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let wallet: LocalWallet = HOUSE_KEY.parse()?;
    let domain = ChannelDomain::new(31_337, Address::from_low_u64_be(0xC011_7AC7));
    let config = EngineConfig {
        draw_interval_secs: 600,
        ..EngineConfig::default()
    };
    let draw_interval = config.draw_interval_secs;

    let mut now = 1_000u64;
    let mut engine = ChannelEngine::new(WalletSigner::new(wallet), domain, config, now);
    let agent = Address::from_low_u64_be(0xA6E17);

    engine.open_channel(agent, to_wei("5")?, to_wei("50")?, now)?;
    let mut seeds = StdRng::seed_from_u64(42);

    for round in 0..ROUNDS {
        now += 1;
        let (commit_route, reveal_route, params) = if round % 2 == 0 {
            ("slots_commit", "slots_reveal", json!({ "bet": "0.0005" }))
        } else {
            let choice = if seeds.gen_bool(0.5) { "heads" } else { "tails" };
            (
                "coinflip_commit",
                "coinflip_reveal",
                json!({ "bet": "0.0005", "choice": choice }),
            )
        };
        engine.handle_action(commit_route, agent, &params, now)?;
        let agent_seed = format!("agent-entropy-{}", seeds.gen::<u64>());
        engine.handle_action(reveal_route, agent, &json!({ "agentSeed": agent_seed }), now)?;
    }

    // A few lotto tickets, then jump past the draw so the scheduler fires.
    engine.handle_action(
        "lotto_buy",
        agent,
        &json!({ "pickedNumber": 42, "ticketCount": 5 }),
        now,
    )?;
    now += draw_interval;
    let report = engine.run_scheduled(now);
    for draw in &report.draws {
        println!(
            "draw #{} -> {} ({} winners)",
            draw.draw_id,
            draw.winning_number,
            draw.winners.len()
        );
    }

    println!("{:<10} {:>8} {:>14} {:>14} {:>8}", "game", "rounds", "wagered", "paid", "rtp");
    for kind in GameKind::ALL {
        let stats = engine.stats(kind);
        println!(
            "{:<10} {:>8} {:>14} {:>14} {:>8.4}",
            kind.as_str(),
            stats.rounds,
            to_decimal(stats.wagered),
            to_decimal(stats.paid_out),
            realized_rtp(stats.wagered, stats.paid_out),
        );
    }

    let status = engine.channel_status(agent);
    println!(
        "closing at nonce {} (invariant ok: {})",
        status.nonce, status.invariant_ok
    );
    let close = engine.close_channel(agent, now)?;
    println!(
        "settled: agent {} / house {} over {} games",
        to_decimal(close.agent_balance),
        to_decimal(close.house_balance),
        close.total_games
    );
    Ok(())
}
