//! Configuration for the engine and the settlement model.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::records::wei_string;

/// Off-chain engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Process-wide cap on house collateral across open channels, in wei.
    #[serde(with = "wei_string")]
    pub max_exposure: u128,
    pub max_channels: usize,
    pub commit_timeout_secs: u64,
    pub max_tickets_per_draw: usize,
    pub draw_interval_secs: u64,
    #[serde(with = "wei_string")]
    pub ticket_price: u128,
    pub entropy_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_exposure: DEFAULT_MAX_EXPOSURE_WEI,
            max_channels: DEFAULT_MAX_CHANNELS,
            commit_timeout_secs: COMMIT_TIMEOUT_SECS,
            max_tickets_per_draw: MAX_TICKETS_PER_DRAW,
            draw_interval_secs: DRAW_INTERVAL_SECS,
            ticket_price: DEFAULT_TICKET_PRICE_WEI,
            entropy_ttl_secs: DEFAULT_ENTROPY_TTL_SECS,
        }
    }
}

/// Settlement-side constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettlementConfig {
    pub challenge_period_secs: u64,
    pub min_channel_duration_secs: u64,
    #[serde(with = "wei_string")]
    pub min_deposit: u128,
    #[serde(with = "wei_string")]
    pub max_deposit: u128,
    pub insurance_bps: u64,
    #[serde(with = "wei_string")]
    pub max_exposure: u128,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            challenge_period_secs: CHALLENGE_PERIOD_SECS,
            min_channel_duration_secs: MIN_CHANNEL_DURATION_SECS,
            min_deposit: MIN_DEPOSIT_WEI,
            max_deposit: MAX_DEPOSIT_WEI,
            insurance_bps: INSURANCE_BPS,
            max_exposure: DEFAULT_MAX_EXPOSURE_WEI,
        }
    }
}
