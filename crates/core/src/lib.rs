//! Kranes Core - Shared types library.
//!
//! This crate provides the domain types used across all Kranes Market components:
//! - `api` - The HTTP/JSON marketplace backend
//! - `cli` - Command-line tools for data directory and admin management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no file
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, statuses, pricing, and the persisted records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
