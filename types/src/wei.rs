//! Conversion between display decimal strings and integer base units (wei).
//!
//! Every balance, bet, payout, ticket price and exposure in this workspace is
//! an integer number of wei. Decimal strings exist only at message
//! boundaries; nothing downstream of these two functions touches a float.

use thiserror::Error;

/// Base units per whole ether.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Maximum fractional digits accepted by [`to_wei`].
const MAX_FRACTIONAL_DIGITS: usize = 18;

/// Bare integer strings with more digits than this are interpreted as
/// already-wei rather than whole ether.
const WEI_LITERAL_DIGITS: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WeiError {
    #[error("bad amount: {0}")]
    BadAmount(String),
}

fn parse_digits(s: &str, original: &str) -> Result<u128, WeiError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WeiError::BadAmount(original.to_string()));
    }
    s.parse::<u128>()
        .map_err(|_| WeiError::BadAmount(original.to_string()))
}

/// Parse a display amount into wei.
///
/// Accepted forms:
/// - decimal ether strings with up to 18 fractional digits (`"0.001"`);
/// - bare integers of up to ten digits, treated as whole ether (`"5"`);
/// - longer bare integers, treated as already-wei (`"1000000000000000000"`).
pub fn to_wei(input: &str) -> Result<u128, WeiError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(WeiError::BadAmount(input.to_string()));
    }

    if let Some((whole, frac)) = s.split_once('.') {
        if frac.is_empty() || frac.len() > MAX_FRACTIONAL_DIGITS {
            return Err(WeiError::BadAmount(input.to_string()));
        }
        let whole_units = if whole.is_empty() {
            0
        } else {
            parse_digits(whole, input)?
        };
        let frac_units = parse_digits(frac, input)?;
        let scale = 10u128.pow((MAX_FRACTIONAL_DIGITS - frac.len()) as u32);
        whole_units
            .checked_mul(WEI_PER_ETHER)
            .and_then(|w| frac_units.checked_mul(scale).map(|f| (w, f)))
            .and_then(|(w, f)| w.checked_add(f))
            .ok_or_else(|| WeiError::BadAmount(input.to_string()))
    } else {
        let units = parse_digits(s, input)?;
        if s.len() > WEI_LITERAL_DIGITS {
            Ok(units)
        } else {
            units
                .checked_mul(WEI_PER_ETHER)
                .ok_or_else(|| WeiError::BadAmount(input.to_string()))
        }
    }
}

/// Format a wei amount as a decimal ether string.
///
/// Trailing fractional zeros are trimmed; whole-ether amounts render without
/// a decimal point. `to_wei(&to_decimal(x)) == x` for every amount this
/// system handles.
pub fn to_decimal(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    let frac = frac.trim_end_matches('0');
    format!("{whole}.{frac}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_ether() {
        assert_eq!(to_wei("0.001").unwrap(), 1_000_000_000_000_000);
        assert_eq!(to_wei("1.5").unwrap(), 1_500_000_000_000_000_000);
        assert_eq!(to_wei(".5").unwrap(), 500_000_000_000_000_000);
        assert_eq!(
            to_wei("0.000000000000000003").unwrap(),
            3,
            "18 fractional digits reach single wei"
        );
    }

    #[test]
    fn parses_short_integers_as_ether() {
        assert_eq!(to_wei("1").unwrap(), WEI_PER_ETHER);
        assert_eq!(to_wei("10").unwrap(), 10 * WEI_PER_ETHER);
        // Ten digits is still ether.
        assert_eq!(to_wei("1000000000").unwrap(), 1_000_000_000 * WEI_PER_ETHER);
    }

    #[test]
    fn parses_long_integers_as_wei() {
        assert_eq!(to_wei("100000000000").unwrap(), 100_000_000_000);
        assert_eq!(
            to_wei("1000000000000000000").unwrap(),
            WEI_PER_ETHER,
            "a full ether written out in wei"
        );
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", " ", "abc", "1.2.3", "0x10", "-1", "1,5", "1.", "1.1234567890123456789"] {
            assert!(matches!(to_wei(bad), Err(WeiError::BadAmount(_))), "{bad:?}");
        }
    }

    #[test]
    fn decimal_round_trip_is_identity() {
        for wei in [
            0u128,
            1,
            999,
            1_000_000_000_000_000,
            WEI_PER_ETHER,
            WEI_PER_ETHER + 1,
            10 * WEI_PER_ETHER,
            1_289_000_000_000_000_000, // 1.289
            u64::MAX as u128,
        ] {
            assert_eq!(to_wei(&to_decimal(wei)).unwrap(), wei, "wei={wei}");
        }
    }

    #[test]
    fn formats_whole_and_fractional() {
        assert_eq!(to_decimal(0), "0");
        assert_eq!(to_decimal(WEI_PER_ETHER), "1");
        assert_eq!(to_decimal(1_500_000_000_000_000_000), "1.5");
        assert_eq!(to_decimal(1), "0.000000000000000001");
    }
}
