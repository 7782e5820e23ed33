//! Orders, payments and return requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AddressRecord;
use super::id::{OrderId, ProductId, ReturnId, UserId};
use super::price::{CurrencyCode, OrderTotals};
use super::status::{OrderStatus, PaymentProvider, PaymentStatus, ReturnStatus};

/// A line item, snapshotted at order time.
///
/// Title and price are copied so later catalog edits or archival do not
/// change historical orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRecord {
    pub product_id: ProductId,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
}

impl OrderItemRecord {
    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Synthetic payment attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub provider: PaymentProvider,
    pub status: PaymentStatus,
    pub transaction_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub card_last4: String,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItemRecord>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub status: OrderStatus,
    /// Full copy of the address at order time.
    pub shipping_address: AddressRecord,
    pub payment: PaymentRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Totals as stored on the order.
    #[must_use]
    pub const fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: self.subtotal,
            tax: self.tax,
            shipping: self.shipping,
            total: self.total,
        }
    }

    /// Set a new status, refreshing `updated_at`. Any stage may be set.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Per-stage completion for tracking views.
    ///
    /// A stage is complete when it is at or before the current status.
    #[must_use]
    pub fn timeline(&self) -> Vec<StageProgress> {
        let current = self.status.stage_index();
        OrderStatus::STAGES
            .iter()
            .map(|stage| StageProgress {
                stage: *stage,
                completed: stage.stage_index() <= current,
            })
            .collect()
    }
}

/// One entry of an order tracking timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: OrderStatus,
    pub completed: bool,
}

/// A return request against an order.
///
/// The status is independent of the order's status and is never validated
/// against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRecord {
    pub id: ReturnId,
    pub user_id: UserId,
    pub order_id: OrderId,
    pub reason: String,
    pub status: ReturnStatus,
    pub created_at: DateTime<Utc>,
}
