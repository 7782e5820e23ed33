//! Order pricing using decimal arithmetic.
//!
//! Line totals, tax and shipping are computed with `rust_decimal` so cents
//! never drift the way they do with binary floats.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

/// Subtotal, tax, shipping and grand total for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Sales tax rate applied to the subtotal (7.5%).
    pub const TAX_RATE: Decimal = Decimal::from_parts(75, 0, 0, false, 3);

    /// Orders strictly above this subtotal ship free.
    pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

    /// Flat shipping fee below the free-shipping threshold.
    pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(6, 0, 0, false, 0);

    /// Compute totals for a subtotal.
    ///
    /// Tax is rounded to cents, midpoint away from zero. `None` if the grand
    /// total does not fit a `Decimal`.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Option<Self> {
        let tax = subtotal
            .checked_mul(Self::TAX_RATE)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let shipping = if subtotal > Self::FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            Self::FLAT_SHIPPING
        };

        Some(Self {
            subtotal,
            tax,
            shipping,
            total: subtotal.checked_add(tax)?.checked_add(shipping)?,
        })
    }

    /// Compute totals from `(unit price, quantity)` lines.
    ///
    /// `None` if a line total, the subtotal or the grand total overflows.
    #[must_use]
    pub fn from_lines<I>(lines: I) -> Option<Self>
    where
        I: IntoIterator<Item = (Decimal, u32)>,
    {
        let subtotal = lines
            .into_iter()
            .try_fold(Decimal::ZERO, |sum, (price, quantity)| {
                sum.checked_add(price.checked_mul(Decimal::from(quantity))?)
            })?;
        Self::from_subtotal(subtotal)
    }
}
