//! Exact integer amounts in base units (satoshis, wei).
//!
//! Amounts never pass through floating point. Decimal strings are parsed
//! digit by digit against a [`Unit`] so `"0.97"` BTC is exactly
//! `97_000_000` satoshis.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AmountError;

/// Denomination used to convert between whole coins and base units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Unit {
    /// Display ticker of the whole coin.
    pub ticker: &'static str,
    /// Number of base-unit digits after the decimal point.
    pub decimals: u32,
}

impl Unit {
    /// Bitcoin: 1 BTC = 10^8 satoshis.
    pub const BTC: Self = Self { ticker: "BTC", decimals: 8 };
    /// Bitcoin testnet coins.
    pub const TEST_BTC: Self = Self { ticker: "TESTBTC", decimals: 8 };
    /// Ether: 1 ETH = 10^18 wei.
    pub const ETH: Self = Self { ticker: "ETH", decimals: 18 };
    /// Ethereum Classic.
    pub const ETC: Self = Self { ticker: "ETC", decimals: 18 };

    /// Base units in one whole coin.
    pub fn multiplier(&self) -> u128 {
        10u128.pow(self.decimals)
    }
}

/// A non-negative amount of base units.
///
/// Arithmetic is checked: callers decide whether an overflow or a negative
/// result is an invariant violation.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Create an amount from base units.
    pub const fn from_base(value: u128) -> Self {
        Self(value)
    }

    /// Raw base units.
    pub fn base(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// `None` when the result would be negative.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiply by a dimensionless scalar.
    pub fn checked_mul(self, scalar: u128) -> Option<Self> {
        self.0.checked_mul(scalar).map(Self)
    }

    /// Sum of an iterator of amounts, `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, a| acc.checked_add(a))
    }

    /// Parse a decimal string of whole coins into base units.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice_core::amount::{Amount, Unit};
    /// assert_eq!(Amount::parse_decimal("0.97", Unit::BTC).unwrap(), Amount(97_000_000));
    /// assert_eq!(Amount::parse_decimal("2", Unit::BTC).unwrap(), Amount(200_000_000));
    /// ```
    pub fn parse_decimal(s: &str, unit: Unit) -> Result<Self, AmountError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::Empty);
        }
        if frac.len() > unit.decimals as usize {
            return Err(AmountError::TooPrecise {
                decimals: unit.decimals,
            });
        }

        let whole_units = parse_digits(whole)?;
        let mut frac_units = parse_digits(frac)?;
        for _ in frac.len()..unit.decimals as usize {
            frac_units = frac_units.checked_mul(10).ok_or(AmountError::Overflow)?;
        }

        whole_units
            .checked_mul(unit.multiplier())
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    /// Format as whole coins, trimming trailing fractional zeros.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice_core::amount::{Amount, Unit};
    /// assert_eq!(Amount(97_000_000).to_decimal_string(Unit::BTC), "0.97");
    /// assert_eq!(Amount(200_000_000).to_decimal_string(Unit::BTC), "2");
    /// ```
    pub fn to_decimal_string(&self, unit: Unit) -> String {
        let m = unit.multiplier();
        let whole = self.0 / m;
        let frac = self.0 % m;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{frac:0width$}", width = unit.decimals as usize);
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }
}

fn parse_digits(s: &str) -> Result<u128, AmountError> {
    let mut value: u128 = 0;
    for c in s.chars() {
        let d = c.to_digit(10).ok_or(AmountError::InvalidDigit(c))?;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as u128))
            .ok_or(AmountError::Overflow)?;
    }
    Ok(value)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}
