use crate::wei::WEI_PER_ETHER;

/// Dispute window after a challenge is opened or countered.
pub const CHALLENGE_PERIOD_SECS: u64 = 24 * 60 * 60;

/// Minimum channel age before an emergency exit is allowed.
pub const MIN_CHANNEL_DURATION_SECS: u64 = 60 * 60;

/// Deposit bounds for opening a channel.
pub const MIN_DEPOSIT_WEI: u128 = WEI_PER_ETHER / 1_000; // 0.001 ether
pub const MAX_DEPOSIT_WEI: u128 = 10 * WEI_PER_ETHER;

/// Share of house profit skimmed into the insurance fund at settlement.
pub const INSURANCE_BPS: u64 = 1_000; // 10%
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Owner rotation is a 2-step handover behind this timelock.
pub const OWNER_ROTATION_TIMELOCK_SECS: u64 = 2 * 24 * 60 * 60;

/// Insurance withdrawals execute only after this timelock.
pub const INSURANCE_WITHDRAWAL_TIMELOCK_SECS: u64 = 3 * 24 * 60 * 60;

/// A pending commit not revealed within this window expires.
pub const COMMIT_TIMEOUT_SECS: u64 = 5 * 60;

/// Worst-case-payout headroom required of the house bankroll per bet.
pub const BET_SAFETY_FACTOR: u128 = 2;

/// Lotto: pickable numbers are 1..=LOTTO_NUMBER_RANGE.
pub const LOTTO_NUMBER_RANGE: u32 = 100;

/// Lotto: payout per matching ticket, in ticket prices.
pub const LOTTO_PAYOUT_MULTIPLIER: u128 = 85;

/// Lotto: per-agent ticket cap per draw.
pub const MAX_TICKETS_PER_DRAW: usize = 10;

/// Lotto: one draw every 6 hours.
pub const DRAW_INTERVAL_SECS: u64 = 6 * 60 * 60;

/// Lotto: default ticket price (0.001 ether).
pub const DEFAULT_TICKET_PRICE_WEI: u128 = WEI_PER_ETHER / 1_000;

/// Coinflip pays 19/10 of the bet on a win, truncated.
pub const COINFLIP_PAYOUT_NUMERATOR: u128 = 19;
pub const COINFLIP_PAYOUT_DENOMINATOR: u128 = 10;

/// External entropy rounds expire after this TTL by default.
pub const DEFAULT_ENTROPY_TTL_SECS: u64 = 5 * 60;

/// Engine-wide cap on concurrently open channels.
pub const DEFAULT_MAX_CHANNELS: usize = 1_000;

/// Default process-wide house collateral exposure cap (100 ether).
pub const DEFAULT_MAX_EXPOSURE_WEI: u128 = 100 * WEI_PER_ETHER;
