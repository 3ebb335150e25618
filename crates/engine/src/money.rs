use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Money amount represented as **integer kobo** (minor units of NGN).
///
/// Use this type wherever an amount is shown to a human; the engine itself
/// stores and computes raw `i64` minor units so that
/// `total == deposit + withdrawable` holds exactly.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(1_234_567);
/// assert_eq!(amount.minor(), 1_234_567);
/// assert_eq!(amount.to_string(), "₦12,345.67");
/// ```
///
/// Parsing from user input (rejects more than 2 decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
/// assert_eq!("1,500.5".parse::<Money>().unwrap().minor(), 150_050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer kobo.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in kobo.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Formats the amount with an explicit `+`/`-` sign, as shown in
    /// transaction lists.
    #[must_use]
    pub fn signed(self, negative: bool) -> String {
        let sign = if negative { "-" } else { "+" };
        format!("{sign}{}", Money(self.0.abs()))
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let naira = group_thousands(abs / 100);
        let kobo = abs % 100;
        write!(f, "{sign}₦{naira}.{kobo:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal naira string into kobo.
    ///
    /// Accepts an optional leading `₦`, `,` thousands separators and an
    /// optional leading `+`/`-`. At most 2 fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim().trim_start_matches('₦').replace(',', "");
        if rest.is_empty() {
            return Err(empty());
        }

        let mut parts = rest.split('.');
        let naira_str = parts.next().ok_or_else(invalid)?;
        let kobo_str = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        if naira_str.is_empty() || !naira_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let naira: i64 = naira_str.parse().map_err(|_| overflow())?;

        let kobo: i64 = match kobo_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => return Err(EngineError::InvalidAmount("too many decimals".to_string())),
                }
            }
        };

        let total = naira
            .checked_mul(100)
            .and_then(|v| v.checked_add(kobo))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_ngn() {
        assert_eq!(Money::new(0).to_string(), "₦0.00");
        assert_eq!(Money::new(5).to_string(), "₦0.05");
        assert_eq!(Money::new(100_000).to_string(), "₦1,000.00");
        assert_eq!(Money::new(123_456_789).to_string(), "₦1,234,567.89");
        assert_eq!(Money::new(-1050).to_string(), "-₦10.50");
    }

    #[test]
    fn signed_display() {
        assert_eq!(Money::new(100_000).signed(false), "+₦1,000.00");
        assert_eq!(Money::new(2550).signed(true), "-₦25.50");
    }

    #[test]
    fn parse_accepts_symbol_and_separators() {
        assert_eq!("₦1,000".parse::<Money>().unwrap().minor(), 100_000);
        assert_eq!("10.5".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().minor(), 230);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }
}
