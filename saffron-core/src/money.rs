//! Money calculation utilities using rust_decimal for precision
//!
//! All arithmetic is done using `Decimal` internally, then converted
//! back to `f64` for storage/serialization. Inputs are validated at
//! the operation boundary so NaN/Infinity/absurd magnitudes never
//! reach the store.

use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;

use crate::orders::OrderError;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed unit price per line
const MAX_RATE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
const MAX_QUANTITY: i32 = 9999;
/// Maximum allowed single tender amount
const MAX_TENDER: f64 = 1_000_000.0;

pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// `quantity * rate`, rounded to 2 dp.
pub fn line_total(quantity: i32, rate: f64) -> f64 {
    to_f64(Decimal::from(quantity) * to_decimal(rate))
}

/// Sum a sequence of monetary values, rounded to 2 dp.
pub fn sum(values: impl IntoIterator<Item = f64>) -> f64 {
    to_f64(values.into_iter().map(to_decimal).sum::<Decimal>())
}

/// Whether two monetary values agree within [`MONEY_TOLERANCE`].
pub fn approx_eq(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() <= MONEY_TOLERANCE
}

#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), OrderError> {
    if !value.is_finite() {
        return Err(OrderError::Validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a unit price before it reaches the ledger.
pub fn validate_rate(rate: f64) -> Result<(), OrderError> {
    require_finite(rate, "rate")?;
    if rate < 0.0 {
        return Err(OrderError::Validation(format!(
            "rate must be non-negative, got {}",
            rate
        )));
    }
    if rate > MAX_RATE {
        return Err(OrderError::Validation(format!(
            "rate exceeds maximum allowed ({}), got {}",
            MAX_RATE, rate
        )));
    }
    Ok(())
}

/// Validate a line quantity.
pub fn validate_quantity(quantity: i32) -> Result<(), OrderError> {
    if quantity <= 0 {
        return Err(OrderError::Validation(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(OrderError::Validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, quantity
        )));
    }
    Ok(())
}

/// Validate a single tender amount (cash or online).
pub fn validate_tender(amount: f64, field_name: &str) -> Result<(), OrderError> {
    require_finite(amount, field_name)?;
    if amount < 0.0 {
        return Err(OrderError::Validation(format!(
            "{} must be non-negative, got {}",
            field_name, amount
        )));
    }
    if amount > MAX_TENDER {
        return Err(OrderError::Validation(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, MAX_TENDER, amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_rounds_half_up() {
        assert_eq!(line_total(3, 0.115), 0.35);
        assert_eq!(line_total(2, 80.0), 160.0);
        assert_eq!(line_total(1, 0.1) + 0.0, 0.1);
    }

    #[test]
    fn sum_avoids_binary_float_drift() {
        // 0.1 + 0.2 != 0.3 in f64, but must be 0.3 here
        assert_eq!(sum([0.1, 0.2]), 0.3);
        assert_eq!(sum([100.0, 50.0]), 150.0);
        assert_eq!(sum(std::iter::empty()), 0.0);
    }

    #[test]
    fn approx_eq_uses_cent_tolerance() {
        assert!(approx_eq(10.0, 10.01));
        assert!(!approx_eq(10.0, 10.02));
    }

    #[test]
    fn validation_rejects_pathological_inputs() {
        assert!(validate_rate(f64::NAN).is_err());
        assert!(validate_rate(-1.0).is_err());
        assert!(validate_rate(2_000_000.0).is_err());
        assert!(validate_rate(80.0).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(10_000).is_err());
        assert!(validate_quantity(2).is_ok());

        assert!(validate_tender(f64::INFINITY, "cash").is_err());
        assert!(validate_tender(-0.01, "online").is_err());
        assert!(validate_tender(60.0, "online").is_ok());
    }
}
