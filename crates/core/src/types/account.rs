//! User accounts and their embedded addresses and cards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{AddressId, CardId, UserId};
use super::status::Role;

/// A persisted user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: Role,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub addresses: Vec<AddressRecord>,
    #[serde(default)]
    pub cards: Vec<CardRecord>,
}

impl UserRecord {
    /// Whether the user may access admin routes.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The fields safe to return to clients.
    #[must_use]
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }

    /// Append an address. Only the first address ever added becomes default.
    pub fn add_address(&mut self, address: NewAddress) -> AddressRecord {
        let record = AddressRecord {
            id: AddressId::generate(),
            label: address.label,
            full_name: address.full_name,
            phone: address.phone,
            address_line1: address.address_line1,
            city: address.city,
            country: address.country,
            postal_code: address.postal_code,
            is_default: self.addresses.is_empty(),
        };
        self.addresses.push(record.clone());
        record
    }

    /// Remove an address. The default flag is not reassigned.
    pub fn remove_address(&mut self, id: &AddressId) {
        self.addresses.retain(|address| &address.id != id);
    }

    /// Append a card. Only the first card ever added becomes default.
    pub fn add_card(&mut self, card: NewCard) -> CardRecord {
        let digits: String = card
            .card_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let last4: String = digits
            .chars()
            .skip(digits.chars().count().saturating_sub(4))
            .collect();

        let record = CardRecord {
            id: CardId::generate(),
            brand: CardBrand::detect(&digits),
            last4,
            exp_month: card.exp_month,
            exp_year: card.exp_year,
            holder_name: card.holder_name,
            is_default: self.cards.is_empty(),
        };
        self.cards.push(record.clone());
        record
    }

    /// Remove a card. The default flag is not reassigned.
    pub fn remove_card(&mut self, id: &CardId) {
        self.cards.retain(|card| &card.id != id);
    }

    /// Look up a saved address.
    #[must_use]
    pub fn address(&self, id: &AddressId) -> Option<&AddressRecord> {
        self.addresses.iter().find(|address| &address.id == id)
    }

    /// Look up a saved card.
    #[must_use]
    pub fn card(&self, id: &CardId) -> Option<&CardRecord> {
        self.cards.iter().find(|card| &card.id == id)
    }
}

/// User fields returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: Role,
}

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    pub id: AddressId,
    pub label: String,
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    pub city: String,
    pub country: String,
    pub postal_code: String,
    pub is_default: bool,
}

/// Validated input for a new address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub label: String,
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    pub city: String,
    pub country: String,
    pub postal_code: String,
}

/// Card network, detected from the leading digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardBrand {
    Visa,
    Mastercard,
    Card,
}

impl CardBrand {
    /// `4…` is Visa, `5…` is Mastercard, anything else is a generic card.
    #[must_use]
    pub fn detect(digits: &str) -> Self {
        match digits.chars().next() {
            Some('4') => Self::Visa,
            Some('5') => Self::Mastercard,
            _ => Self::Card,
        }
    }
}

/// A saved payment card. The full number is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub id: CardId,
    pub brand: CardBrand,
    pub last4: String,
    pub exp_month: String,
    pub exp_year: String,
    pub holder_name: String,
    pub is_default: bool,
}

/// Validated input for a new card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub holder_name: String,
    pub card_number: String,
    pub exp_month: String,
    pub exp_year: String,
}
