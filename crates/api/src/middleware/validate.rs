//! Validated JSON request bodies.
//!
//! Handlers take [`ValidJson<T>`] instead of `Json<T>`. A body that fails to
//! parse, or parses but breaks one of the payload's field rules, is rejected
//! with 400 and the payload's own message, e.g. `"Invalid order payload"`.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use url::Url;

use kranes_core::{NewAddress, NewCard};

use crate::error::AppError;
use crate::services::admin::{NewProduct, ProductPatch};
use crate::services::analytics::TrackEvent;
use crate::services::orders::PlaceOrder;

/// A request payload with field-level rules.
pub trait Validate {
    /// Message returned with the 400 response.
    const REJECTION: &'static str;

    /// Whether every field rule holds.
    fn is_valid(&self) -> bool;
}

/// JSON body extractor that also runs [`Validate`].
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(error = %rejection, "Rejected request body");
            AppError::BadRequest(T::REJECTION.to_string())
        })?;

        if !value.is_valid() {
            return Err(AppError::BadRequest(T::REJECTION.to_string()));
        }

        Ok(Self(value))
    }
}

/// At least `min` characters.
pub fn min_chars(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

/// An absolute URL.
pub fn is_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

fn is_positive(value: Decimal) -> bool {
    value > Decimal::ZERO
}

impl Validate for NewAddress {
    const REJECTION: &'static str = "Invalid address payload";

    fn is_valid(&self) -> bool {
        min_chars(&self.label, 2)
            && min_chars(&self.full_name, 2)
            && min_chars(&self.phone, 5)
            && min_chars(&self.address_line1, 5)
            && min_chars(&self.city, 2)
            && min_chars(&self.country, 2)
            && min_chars(&self.postal_code, 2)
    }
}

impl Validate for NewCard {
    const REJECTION: &'static str = "Invalid card payload";

    fn is_valid(&self) -> bool {
        min_chars(&self.holder_name, 2)
            && min_chars(&self.card_number, 12)
            && min_chars(&self.exp_month, 1)
            && min_chars(&self.exp_year, 2)
    }
}

impl Validate for PlaceOrder {
    const REJECTION: &'static str = "Invalid order payload";

    fn is_valid(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|line| line.quantity >= 1)
    }
}

impl Validate for NewProduct {
    const REJECTION: &'static str = "Invalid product payload";

    fn is_valid(&self) -> bool {
        min_chars(&self.title, 3)
            && is_positive(self.price)
            && min_chars(&self.description, 8)
            && min_chars(&self.category, 2)
            && is_url(&self.image)
    }
}

impl Validate for ProductPatch {
    const REJECTION: &'static str = "Invalid product update payload";

    fn is_valid(&self) -> bool {
        self.title.as_deref().is_none_or(|title| min_chars(title, 3))
            && self.price.is_none_or(is_positive)
            && self
                .description
                .as_deref()
                .is_none_or(|description| min_chars(description, 8))
            && self
                .category
                .as_deref()
                .is_none_or(|category| min_chars(category, 2))
            && self.image.as_deref().is_none_or(is_url)
    }
}

impl Validate for TrackEvent {
    const REJECTION: &'static str = "Invalid analytics payload";

    fn is_valid(&self) -> bool {
        min_chars(&self.event_type, 2)
    }
}
