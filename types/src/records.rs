//! Structured records the core emits for consumers (dashboards, storage).
//!
//! Monetary fields serialize as decimal-ether strings; everything internal
//! stays integer wei. Persistence itself is a consumer concern.

use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::game::{CoinSide, GameKind};

/// Serde adapter: u128 wei <-> decimal ether string.
pub mod wei_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::wei;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&wei::to_decimal(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        wei::to_wei(&raw).map_err(de::Error::custom)
    }
}

/// One resolved wagering round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub agent: Address,
    pub game: GameKind,
    #[serde(with = "wei_string")]
    pub bet: u128,
    #[serde(with = "wei_string")]
    pub payout: u128,
    pub won: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reels: Option<[u8; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<CoinSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picked_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_count: Option<u8>,
    pub nonce: u64,
    pub timestamp: u64,
}

impl RoundRecord {
    /// Minimal record; game-specific fields are filled by the game.
    pub fn new(agent: Address, game: GameKind, bet: u128, payout: u128, nonce: u64, timestamp: u64) -> Self {
        Self {
            agent,
            game,
            bet,
            payout,
            won: payout > 0,
            multiplier: None,
            reels: None,
            choice: None,
            result: None,
            picked_number: None,
            draw_id: None,
            ticket_count: None,
            nonce,
            timestamp,
        }
    }
}

/// Point-in-time channel snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnapshot {
    pub agent: Address,
    pub status: crate::channel::ChannelStatus,
    #[serde(with = "wei_string")]
    pub agent_deposit: u128,
    #[serde(with = "wei_string")]
    pub casino_deposit: u128,
    #[serde(with = "wei_string")]
    pub agent_balance: u128,
    #[serde(with = "wei_string")]
    pub casino_balance: u128,
    pub nonce: u64,
    pub games_played: usize,
    pub opened_at: u64,
}

impl From<&crate::channel::Channel> for ChannelSnapshot {
    fn from(channel: &crate::channel::Channel) -> Self {
        Self {
            agent: channel.agent,
            status: channel.status,
            agent_deposit: channel.agent_deposit,
            casino_deposit: channel.house_deposit,
            agent_balance: channel.agent_balance,
            casino_balance: channel.house_balance,
            nonce: channel.nonce,
            games_played: channel.games.len(),
            opened_at: channel.opened_at,
        }
    }
}

/// A bus event for late-reading subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub ts: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<Address>,
    pub result: serde_json::Value,
}
