//! Probability prices and the fixed precision used for derived values.

use rust_decimal::Decimal;

/// A contract price, read as a probability in `[0, 1]`.
pub type Price = Decimal;

/// Decimal places kept on every derived metric value.
pub const METRIC_PRECISION: u32 = 4;

/// Round a derived value to [`METRIC_PRECISION`] using banker's rounding.
#[must_use]
pub fn round_metric(value: Decimal) -> Decimal {
    value.round_dp(METRIC_PRECISION)
}

/// Whether `price` is a valid probability.
#[must_use]
pub fn is_probability(price: Price) -> bool {
    price >= Decimal::ZERO && price <= Decimal::ONE
}
