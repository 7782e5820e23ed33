//! Self-service account operations for the signed-in user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use kranes_core::{
    AddressId, AddressRecord, CardId, CardRecord, NewAddress, NewCard, OrderId, OrderRecord,
    OrderStatus, ReturnId, ReturnRecord, ReturnStatus, StageProgress, UserId, UserRecord,
};

use crate::db::{RepositoryError, Store};

/// Errors that can occur in account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User not found")]
    UserNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Tracking view of one order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTracking {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub timeline: Vec<StageProgress>,
    pub last_updated: DateTime<Utc>,
}

impl From<&OrderRecord> for OrderTracking {
    fn from(order: &OrderRecord) -> Self {
        Self {
            order_id: order.id.clone(),
            status: order.status,
            timeline: order.timeline(),
            last_updated: order.updated_at,
        }
    }
}

/// Account service scoped to a single store.
pub struct AccountService<'a> {
    store: &'a Store,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Save a new address on the account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UserNotFound` if the account is gone.
    #[instrument(skip(self, address))]
    pub async fn add_address(
        &self,
        user_id: &UserId,
        address: NewAddress,
    ) -> Result<AddressRecord, AccountError> {
        self.update_user(user_id, |user| user.add_address(address))
            .await
    }

    /// Remove a saved address. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UserNotFound` if the account is gone.
    #[instrument(skip(self))]
    pub async fn remove_address(
        &self,
        user_id: &UserId,
        address_id: &AddressId,
    ) -> Result<(), AccountError> {
        self.update_user(user_id, |user| user.remove_address(address_id))
            .await
    }

    /// Save a new card on the account. Only the last four digits are kept.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UserNotFound` if the account is gone.
    #[instrument(skip(self, card))]
    pub async fn add_card(&self, user_id: &UserId, card: NewCard) -> Result<CardRecord, AccountError> {
        self.update_user(user_id, |user| user.add_card(card)).await
    }

    /// Remove a saved card. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UserNotFound` if the account is gone.
    #[instrument(skip(self))]
    pub async fn remove_card(&self, user_id: &UserId, card_id: &CardId) -> Result<(), AccountError> {
        self.update_user(user_id, |user| user.remove_card(card_id))
            .await
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if orders cannot be read.
    pub async fn orders(&self, user_id: &UserId) -> Result<Vec<OrderRecord>, AccountError> {
        let mut orders: Vec<OrderRecord> = self
            .store
            .records()
            .orders()
            .await?
            .into_iter()
            .filter(|order| &order.user_id == user_id)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Tracking timeline for one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::OrderNotFound` if the order does not exist or
    /// belongs to someone else.
    pub async fn tracking(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<OrderTracking, AccountError> {
        self.store
            .records()
            .orders()
            .await?
            .iter()
            .find(|order| &order.id == order_id && &order.user_id == user_id)
            .map(OrderTracking::from)
            .ok_or(AccountError::OrderNotFound)
    }

    /// The user's return requests, in storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if returns cannot be read.
    pub async fn returns(&self, user_id: &UserId) -> Result<Vec<ReturnRecord>, AccountError> {
        Ok(self
            .store
            .records()
            .returns()
            .await?
            .into_iter()
            .filter(|entry| &entry.user_id == user_id)
            .collect())
    }

    /// Open a return request against one of the user's orders.
    ///
    /// The order's fulfillment status is not checked.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::OrderNotFound` if the order does not exist or
    /// belongs to someone else.
    #[instrument(skip(self, reason))]
    pub async fn request_return(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
        reason: &str,
    ) -> Result<ReturnRecord, AccountError> {
        let _guard = self.store.lock().await;
        let records = self.store.records();

        let orders = records.orders().await?;
        let order = orders
            .iter()
            .find(|order| &order.id == order_id && &order.user_id == user_id)
            .ok_or(AccountError::OrderNotFound)?;

        let request = ReturnRecord {
            id: ReturnId::generate(),
            user_id: user_id.clone(),
            order_id: order.id.clone(),
            reason: reason.to_string(),
            status: ReturnStatus::Requested,
            created_at: Utc::now(),
        };

        let mut returns = records.returns().await?;
        returns.push(request.clone());
        records.save_returns(&returns).await?;

        Ok(request)
    }

    /// Load users, apply `f` to one of them and save.
    async fn update_user<T>(
        &self,
        user_id: &UserId,
        f: impl FnOnce(&mut UserRecord) -> T + Send,
    ) -> Result<T, AccountError> {
        let _guard = self.store.lock().await;
        let records = self.store.records();

        let mut users = records.users().await?;
        let user = users
            .iter_mut()
            .find(|user| &user.id == user_id)
            .ok_or(AccountError::UserNotFound)?;
        let output = f(user);

        records.save_users(&users).await?;
        Ok(output)
    }
}
