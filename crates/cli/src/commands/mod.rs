//! CLI command implementations.

pub mod admin;
pub mod data;
pub mod inventory;
