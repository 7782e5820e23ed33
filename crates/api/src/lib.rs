//! Kranes Market API library.
//!
//! This crate provides the marketplace backend as a library, allowing it to
//! be started from the binary and driven from integration tests.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`db`] - Record store (JSON files) behind the `RecordStore` trait
//! - [`catalog`] - Remote catalog client, merge pipeline and query engine
//! - [`services`] - Auth, orders, account, admin and analytics logic
//! - [`middleware`] - Request ID, bearer auth and validated JSON extractors
//! - [`routes`] - HTTP handlers under `/api`
//! - [`app`] - Router assembly and startup

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use app::{build_router, initialize};
pub use config::ApiConfig;
pub use state::AppState;
