//! Wire-facing reply shapes.
//!
//! Monetary fields serialize as decimal-ether strings; the transport
//! envelope around these payloads is a consumer concern.

use ethers::types::Signature;
use serde::Serialize;

use agentcasino_types::records::wei_string;
use agentcasino_types::{Channel, ChannelStatus};

/// The house-signed state returned from every successful mutation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedState {
    #[serde(with = "wei_string")]
    pub agent_balance: u128,
    #[serde(with = "wei_string")]
    pub house_balance: u128,
    pub nonce: u64,
    pub signature: String,
}

impl SignedState {
    pub fn new(channel: &Channel, signature: &Signature) -> Self {
        Self {
            agent_balance: channel.agent_balance,
            house_balance: channel.house_balance,
            nonce: channel.nonce,
            signature: format!("0x{}", hex::encode(signature.to_vec())),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenChannelReply {
    pub status: ChannelStatus,
    #[serde(with = "wei_string")]
    pub agent_balance: u128,
    #[serde(with = "wei_string")]
    pub house_balance: u128,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseChannelReply {
    #[serde(with = "wei_string")]
    pub agent_balance: u128,
    #[serde(with = "wei_string")]
    pub house_balance: u128,
    pub nonce: u64,
    pub signature: String,
    pub total_games: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatusReply {
    pub status: &'static str,
    #[serde(with = "wei_string")]
    pub agent_balance: u128,
    #[serde(with = "wei_string")]
    pub house_balance: u128,
    pub nonce: u64,
    pub games_played: usize,
    pub invariant_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;

    #[test]
    fn signed_state_serializes_camel_case_decimals() {
        let channel = Channel::open(
            Address::from_low_u64_be(9),
            1_000_000_000_000_000_000,
            5_000_000_000_000_000_000,
            0,
        );
        let signature = Signature {
            r: 1u64.into(),
            s: 2u64.into(),
            v: 27,
        };
        let signed = SignedState::new(&channel, &signature);
        let json = serde_json::to_value(&signed).unwrap();
        assert_eq!(json["agentBalance"], "1");
        assert_eq!(json["houseBalance"], "5");
        assert_eq!(json["nonce"], 0);
        assert!(json["signature"].as_str().unwrap().starts_with("0x"));
        assert_eq!(json["signature"].as_str().unwrap().len(), 2 + 65 * 2);
    }
}
