//! XRP amounts.
//!
//! Amounts travel as decimal XRP strings ("50", "12.5") and are held as
//! integer drops. 1 XRP = 1,000,000 drops.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const DROPS_PER_XRP: u64 = 1_000_000;

const MAX_DECIMALS: usize = 6;

/// An amount in drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Drops(u64);

/// Reason an XRP string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount is not a decimal number: {0:?}")]
    NotDecimal(String),
    #[error("amount has more than 6 decimal places: {0:?}")]
    TooPrecise(String),
    #[error("amount is too large: {0:?}")]
    Overflow(String),
}

impl Drops {
    pub const ZERO: Drops = Drops(0);

    pub const fn new(drops: u64) -> Self {
        Self(drops)
    }

    pub const fn from_xrp(xrp: u64) -> Self {
        Self(xrp * DROPS_PER_XRP)
    }

    pub fn as_drops(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Drops) -> Option<Drops> {
        self.0.checked_add(other.0).map(Drops)
    }

    pub fn checked_sub(self, other: Drops) -> Option<Drops> {
        self.0.checked_sub(other.0).map(Drops)
    }

    /// Parse a decimal XRP string.
    pub fn parse_xrp(input: &str) -> Result<Self, AmountError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, fraction) = match input.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (input, ""),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(AmountError::NotDecimal(input.to_string()));
        }
        if fraction.len() > MAX_DECIMALS {
            return Err(AmountError::TooPrecise(input.to_string()));
        }

        let overflow = || AmountError::Overflow(input.to_string());
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let fraction_drops: u64 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", fraction, width = MAX_DECIMALS);
            padded.parse().map_err(|_| overflow())?
        };

        whole
            .checked_mul(DROPS_PER_XRP)
            .and_then(|drops| drops.checked_add(fraction_drops))
            .map(Drops)
            .ok_or_else(overflow)
    }
}

impl FromStr for Drops {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_xrp(s)
    }
}

/// Formats as decimal XRP without trailing zeros.
impl fmt::Display for Drops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / DROPS_PER_XRP;
        let fraction = self.0 % DROPS_PER_XRP;
        if fraction == 0 {
            return write!(f, "{}", whole);
        }
        let fraction = format!("{:06}", fraction);
        write!(f, "{}.{}", whole, fraction.trim_end_matches('0'))
    }
}

impl Serialize for Drops {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Drops {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Drops::parse_xrp(&s).map_err(serde::de::Error::custom)
    }
}
