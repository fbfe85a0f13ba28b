//! Conversion of user-entered amounts into integer minor currency units.
//!
//! The payment SDK takes amounts as integer cents.  Users type decimal
//! strings such as `"3.14"`.  The conversion multiplies by 100 and
//! **truncates**: `"3.145"` becomes `314`, not `315`.  This lossy policy is
//! intentional and must not be "fixed" into rounding.
//!
//! Only plain non-negative decimals are accepted: ASCII digits with at most
//! one `.` and at least one digit.  Signs, exponents, separators and
//! `inf`/`nan` are rejected.
//!
//! Fractional digits beyond the second are cut off *before* the numeric
//! conversion, and the conversion itself uses [`rust_decimal::Decimal`], so no
//! binary floating-point error can turn `"0.29"` into `28`.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Number of fractional digits carried by minor units.
const MINOR_UNIT_DIGITS: usize = 2;

/// Error returned for input that is not a non-negative decimal number.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount: {input:?}")]
    InvalidAmount { input: String },
}

/// An amount in minor currency units (e.g. cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MinorUnits(pub u64);

impl MinorUnits {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Converts `text` to minor units, truncating beyond two decimal places.
///
/// # Errors
///
/// Returns [`AmountError::InvalidAmount`] when `text` is not a plain
/// non-negative decimal, or when the value does not fit in a `u64`.
///
/// # Example
///
/// ```rust
/// use mpos_core::{to_minor_units, MinorUnits};
///
/// assert_eq!(to_minor_units("3.14").unwrap(), MinorUnits(314));
/// assert_eq!(to_minor_units("3.145").unwrap(), MinorUnits(314));
/// assert!(to_minor_units("abc").is_err());
/// ```
pub fn to_minor_units(text: &str) -> Result<MinorUnits, AmountError> {
    let invalid = || AmountError::InvalidAmount {
        input: text.to_string(),
    };

    let trimmed = text.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(invalid());
    }

    let kept_fraction = &fraction[..fraction.len().min(MINOR_UNIT_DIGITS)];
    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if kept_fraction.is_empty() { "0" } else { kept_fraction }
    );

    let value = Decimal::from_str(&normalized).map_err(|_| invalid())?;
    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| cents.trunc())
        .and_then(|cents| cents.to_u64())
        .map(MinorUnits)
        .ok_or_else(invalid)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(text: &str) -> u64 {
        to_minor_units(text).expect("valid amount").value()
    }

    #[test]
    fn test_two_decimal_places_convert_exactly() {
        assert_eq!(cents("3.14"), 314);
        assert_eq!(cents("0.29"), 29);
        assert_eq!(cents("19.99"), 1999);
    }

    #[test]
    fn test_extra_decimal_places_are_truncated_not_rounded() {
        assert_eq!(cents("3.145"), 314);
        assert_eq!(cents("3.149"), 314);
        assert_eq!(cents("0.999999999999999999999999999999999"), 99);
    }

    #[test]
    fn test_whole_numbers_and_short_fractions() {
        assert_eq!(cents("5"), 500);
        assert_eq!(cents("5."), 500);
        assert_eq!(cents(".5"), 50);
        assert_eq!(cents("0"), 0);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(cents("  12.30 "), 1230);
    }

    #[test]
    fn test_non_numeric_input_is_rejected() {
        for input in ["", " ", ".", "abc", "1.2.3", "1,50", "1e5", "inf", "NaN", "$1.00"] {
            assert_eq!(
                to_minor_units(input),
                Err(AmountError::InvalidAmount {
                    input: input.to_string()
                }),
                "input {input:?} must be rejected"
            );
        }
    }

    #[test]
    fn test_negative_and_signed_input_is_rejected() {
        assert!(to_minor_units("-1.00").is_err());
        assert!(to_minor_units("+1.00").is_err());
    }

    #[test]
    fn test_overflowing_input_is_rejected() {
        assert!(to_minor_units("99999999999999999999999999999999").is_err());
        assert!(to_minor_units("999999999999999999999").is_err());
    }

    #[test]
    fn test_minor_units_display_as_decimal() {
        assert_eq!(MinorUnits(314).to_string(), "3.14");
        assert_eq!(MinorUnits(5).to_string(), "0.05");
    }
}
