//! Game identity and shared game-facing enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of supported games.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Slots,
    Coinflip,
    Lotto,
}

impl GameKind {
    pub const ALL: [GameKind; 3] = [GameKind::Slots, GameKind::Coinflip, GameKind::Lotto];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Slots => "slots",
            GameKind::Coinflip => "coinflip",
            GameKind::Lotto => "lotto",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GameKind::Slots => "Slots",
            GameKind::Coinflip => "Coinflip",
            GameKind::Lotto => "Lotto",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slots" => Ok(GameKind::Slots),
            "coinflip" => Ok(GameKind::Coinflip),
            "lotto" => Ok(GameKind::Lotto),
            _ => Err(()),
        }
    }
}

/// Per-game action labels. Each game exposes a subset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameAction {
    Commit,
    Reveal,
    Buy,
    Claim,
    Status,
}

impl GameAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::Commit => "commit",
            GameAction::Reveal => "reveal",
            GameAction::Buy => "buy",
            GameAction::Claim => "claim",
            GameAction::Status => "status",
        }
    }

    /// Info actions read state without requiring an open channel.
    pub fn is_info(&self) -> bool {
        matches!(self, GameAction::Status)
    }
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coinflip sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl CoinSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoinSide::Heads => "heads",
            CoinSide::Tails => "tails",
        }
    }
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoinSide {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heads" => Ok(CoinSide::Heads),
            "tails" => Ok(CoinSide::Tails),
            _ => Err(()),
        }
    }
}

/// Lifetime wager counters a game accumulates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GameStats {
    pub rounds: u64,
    pub wagered: u128,
    pub paid_out: u128,
}

impl GameStats {
    pub fn record(&mut self, bet: u128, payout: u128) {
        self.rounds += 1;
        self.wagered = self.wagered.saturating_add(bet);
        self.paid_out = self.paid_out.saturating_add(payout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in GameKind::ALL {
            assert_eq!(kind.as_str().parse::<GameKind>().unwrap(), kind);
        }
        assert!("poker".parse::<GameKind>().is_err());
    }

    #[test]
    fn only_status_is_info() {
        assert!(GameAction::Status.is_info());
        for action in [
            GameAction::Commit,
            GameAction::Reveal,
            GameAction::Buy,
            GameAction::Claim,
        ] {
            assert!(!action.is_info());
        }
    }

    #[test]
    fn coin_side_parsing() {
        assert_eq!("heads".parse::<CoinSide>().unwrap(), CoinSide::Heads);
        assert_eq!("tails".parse::<CoinSide>().unwrap(), CoinSide::Tails);
        assert!("edge".parse::<CoinSide>().is_err());
    }
}
