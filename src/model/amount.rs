//! Amount type for expense values.
//!
//! Amounts are written to the sheet as plain decimal strings, but a sheet that has been edited by
//! hand may hold values such as `₹1,200.50` or `$12`, so parsing tolerates a leading currency
//! symbol and thousands separators.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Currency symbols that are stripped when parsing.
const CURRENCY_SYMBOLS: &[&str] = &["₹", "$", "Rs.", "Rs"];

/// A monetary amount.
///
/// Equality is numeric, so `12.5` and `12.50` are equal, but the scale that was parsed is kept for
/// display.
///
/// ```
/// # use tracpro_sync::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("₹1,200.50").unwrap();
/// let b = Amount::from_str("1200.5").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "1200.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        !self.0.is_zero() && self.0.is_sign_positive()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError {
    input: String,
    source: Option<rust_decimal::Error>,
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(e) => write!(f, "'{}' is not a valid amount: {e}", self.input),
            None => write!(f, "'{}' is not a valid amount", self.input),
        }
    }
}

impl Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn Error + 'static))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let without_symbol = CURRENCY_SYMBOLS
            .iter()
            .find_map(|sym| unsigned.strip_prefix(sym))
            .unwrap_or(unsigned)
            .trim_start();
        let digits = without_symbol.replace(',', "");
        if digits.is_empty() {
            return Err(AmountError {
                input: s.to_string(),
                source: None,
            });
        }
        let value = Decimal::from_str(&digits).map_err(|e| AmountError {
            input: s.to_string(),
            source: Some(e),
        })?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_plain() {
        let amount = Amount::from_str("50.00").unwrap();
        assert_eq!(amount.value(), dec("50.00"));
        assert_eq!(amount.to_string(), "50.00");
    }

    #[test]
    fn test_parse_currency_symbols() {
        assert_eq!(Amount::from_str("₹250").unwrap().value(), dec("250"));
        assert_eq!(Amount::from_str("$12.75").unwrap().value(), dec("12.75"));
        assert_eq!(Amount::from_str("Rs. 99").unwrap().value(), dec("99"));
    }

    #[test]
    fn test_parse_commas_and_whitespace() {
        let amount = Amount::from_str("  ₹1,23,456.50 ").unwrap();
        assert_eq!(amount.value(), dec("123456.50"));
    }

    #[test]
    fn test_parse_negative() {
        let amount = Amount::from_str("-$5.00").unwrap();
        assert_eq!(amount.value(), dec("-5.00"));
        assert!(!amount.is_positive());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Amount::from_str("").is_err());
        assert!(Amount::from_str("   ").is_err());
        assert!(Amount::from_str("₹").is_err());
        let err = Amount::from_str("twelve").unwrap_err();
        assert!(err.to_string().contains("'twelve' is not a valid amount"));
    }

    #[test]
    fn test_numeric_equality() {
        assert_eq!(
            Amount::from_str("12.5").unwrap(),
            Amount::from_str("12.50").unwrap()
        );
    }

    #[test]
    fn test_is_positive() {
        assert!(Amount::from_str("0.01").unwrap().is_positive());
        assert!(!Amount::from_str("0").unwrap().is_positive());
        assert!(!Amount::from_str("0.00").unwrap().is_positive());
    }

    #[test]
    fn test_serde() {
        let amount = Amount::from_str("42.10").unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"42.10\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }
}
