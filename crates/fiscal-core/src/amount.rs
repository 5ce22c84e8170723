//! # Amount Module
//!
//! Provides the `Amount` type for prices, quantities and payments.
//!
//! ## Why Fixed-Point?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE DEVICE WIRE FORMAT                                                 │
//! │                                                                         │
//! │  The fiscal device reads every numeric field as a decimal with six     │
//! │  fractional digits:                                                     │
//! │    price 1500, qty 2       → "1500.000000*2.000000"                     │
//! │                                                                         │
//! │  Holding these in f64 risks "0.30000000000000004"-style drift before    │
//! │  the value is even rendered.                                            │
//! │                                                                         │
//! │  OUR SOLUTION: integer millionths                                       │
//! │    1500      → Amount(1_500_000_000)                                    │
//! │    0.5 kg    → Amount(500_000)                                          │
//! │    rendering is exact integer formatting, never float printing          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fiscal_core::amount::Amount;
//!
//! let price = Amount::from_units(1500);
//! let qty: Amount = "0.25".parse().unwrap();
//!
//! assert_eq!(price.to_string(), "1500.000000");
//! assert_eq!(qty.to_string(), "0.250000");
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

use crate::error::ValidationError;

/// Number of fractional digits carried (and rendered on the wire).
pub const SCALE_DIGITS: usize = 6;

/// 10^SCALE_DIGITS.
const SCALE: i64 = 1_000_000;

// =============================================================================
// Amount Type
// =============================================================================

/// A signed decimal with six fractional digits, stored as millionths.
///
/// ## Design Decisions
/// - **i64 millionths**: covers ±9.2 trillion units, far beyond any bill
/// - **Display = wire format**: `Amount::to_string()` is exactly what the
///   device expects in a numeric field
/// - **Serde**: reads JSON numbers or decimal strings, writes JSON numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    /// Creates an amount from raw millionths.
    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Amount(micros)
    }

    /// Creates an amount from whole units.
    ///
    /// ## Example
    /// ```rust
    /// use fiscal_core::amount::Amount;
    ///
    /// assert_eq!(Amount::from_units(3).micros(), 3_000_000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Amount(units * SCALE)
    }

    /// Converts a float, rounding to the nearest millionth.
    ///
    /// Returns `None` for NaN, infinities and values out of range.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * SCALE as f64).round();
        if scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
            return None;
        }
        Some(Amount(scaled as i64))
    }

    /// Returns the raw value in millionths.
    #[inline]
    pub const fn micros(&self) -> i64 {
        self.0
    }

    /// Lossy conversion for serialization and display outside the wire.
    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Zero amount.
    #[inline]
    pub const fn zero() -> Self {
        Amount(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is strictly less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Addition that returns `None` instead of overflowing.
    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Amount(v)),
            None => None,
        }
    }

    /// Subtraction that returns `None` instead of overflowing.
    #[inline]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Amount(v)),
            None => None,
        }
    }

    /// Sums `amounts`, or `None` if the total leaves the representable range.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Amount::zero(), Amount::checked_add)
    }
}

// =============================================================================
// Text Conversions
// =============================================================================

/// Renders `<int>.<6 digits>`, the device's numeric field layout.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE as u64;
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            abs / scale,
            abs % scale,
            width = SCALE_DIGITS
        )
    }
}

/// Parses decimal text such as `"1500"`, `"0.00"` or `"-12.5"`.
///
/// Digits past the sixth fractional place are rounded half away from zero.
impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("{reason}: '{s}'"),
        };

        let text = s.trim();
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("no digits"));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid("not a decimal number"));
        }

        let mut micros: i64 = 0;
        for b in int_part.bytes() {
            micros = micros
                .checked_mul(10)
                .and_then(|m| m.checked_add(i64::from(b - b'0')))
                .ok_or_else(|| invalid("out of range"))?;
        }
        micros = micros
            .checked_mul(SCALE)
            .ok_or_else(|| invalid("out of range"))?;

        let frac = frac_part.as_bytes();
        let mut frac_micros: i64 = 0;
        for i in 0..SCALE_DIGITS {
            let digit = frac.get(i).map_or(0, |b| i64::from(b - b'0'));
            frac_micros = frac_micros * 10 + digit;
        }
        if frac.get(SCALE_DIGITS).is_some_and(|b| *b >= b'5') {
            frac_micros += 1;
        }

        let magnitude = micros
            .checked_add(frac_micros)
            .ok_or_else(|| invalid("out of range"))?;
        Ok(Amount(if negative { -magnitude } else { magnitude }))
    }
}

// =============================================================================
// Serde
// =============================================================================

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or decimal string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        v.checked_mul(SCALE)
            .map(Amount)
            .ok_or_else(|| E::custom(format!("amount {v} out of range")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(SCALE))
            .map(Amount)
            .ok_or_else(|| E::custom(format!("amount {v} out of range")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Amount::from_f64(v).ok_or_else(|| E::custom(format!("amount {v} out of range")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

impl Add for Amount {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Amount(self.0 + other.0)
    }
}

impl AddAssign for Amount {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Amount {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Amount(self.0 - other.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_wire_layout() {
        assert_eq!(Amount::from_units(1500).to_string(), "1500.000000");
        assert_eq!(Amount::from_micros(250_000).to_string(), "0.250000");
        assert_eq!(Amount::from_micros(-500_000).to_string(), "-0.500000");
        assert_eq!(Amount::zero().to_string(), "0.000000");
    }

    #[test]
    fn test_parse_device_text() {
        assert_eq!("0.00".parse::<Amount>().unwrap(), Amount::zero());
        assert_eq!("1500".parse::<Amount>().unwrap(), Amount::from_units(1500));
        assert_eq!(" 12.5 ".parse::<Amount>().unwrap().micros(), 12_500_000);
        assert_eq!("-3.25".parse::<Amount>().unwrap().micros(), -3_250_000);
        assert_eq!(".5".parse::<Amount>().unwrap().micros(), 500_000);
    }

    #[test]
    fn test_parse_rounds_seventh_digit() {
        assert_eq!("0.0000005".parse::<Amount>().unwrap().micros(), 1);
        assert_eq!("0.0000004".parse::<Amount>().unwrap().micros(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Amount>().is_err());
        assert!("-".parse::<Amount>().is_err());
        assert!("12a".parse::<Amount>().is_err());
        assert!("1.2.3".parse::<Amount>().is_err());
        assert!("99999999999999999999".parse::<Amount>().is_err());
    }

    #[test]
    fn test_from_f64_rounds() {
        assert_eq!(Amount::from_f64(0.1).unwrap().micros(), 100_000);
        assert_eq!(Amount::from_f64(1999.99).unwrap().to_string(), "1999.990000");
        assert!(Amount::from_f64(f64::NAN).is_none());
        assert!(Amount::from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn test_deserialize_numbers_and_strings() {
        let a: Amount = serde_json::from_str("1500").unwrap();
        assert_eq!(a, Amount::from_units(1500));

        let b: Amount = serde_json::from_str("2.5").unwrap();
        assert_eq!(b.micros(), 2_500_000);

        let c: Amount = serde_json::from_str("\"0.75\"").unwrap();
        assert_eq!(c.micros(), 750_000);

        assert!(serde_json::from_str::<Amount>("\"abc\"").is_err());
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Amount::from_units(10);
        let b = Amount::from_micros(500_000);
        assert_eq!((a + b).micros(), 10_500_000);
        assert_eq!((a - b).micros(), 9_500_000);

        assert_eq!(Amount::checked_sum([a, b, b]), Some(Amount::from_units(11)));
        assert_eq!(Amount::checked_sum(Vec::new()), Some(Amount::zero()));
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let big = Amount::from_micros(i64::MAX - 1);
        assert_eq!(big.checked_add(Amount::from_micros(1)), Some(Amount::from_micros(i64::MAX)));
        assert_eq!(big.checked_add(Amount::from_units(1)), None);
        assert_eq!(Amount::from_micros(i64::MIN).checked_sub(Amount::from_micros(1)), None);

        let huge = Amount::from_units(5_000_000_000_000);
        assert_eq!(Amount::checked_sum([huge, huge]), None);
    }

    #[test]
    fn test_sign_checks() {
        assert!(Amount::zero().is_zero());
        assert!(Amount::from_micros(1).is_positive());
        assert!(Amount::from_micros(-1).is_negative());
        assert!(!Amount::zero().is_positive());
    }
}
