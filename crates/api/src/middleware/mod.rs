//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded in the span, echoed in the response)
//! 4. CORS
//! 5. Body limit (1 MiB)
//!
//! # Extractors
//!
//! - [`RequireAuth`] / [`RequireAdmin`] / [`OptionalAuth`] for bearer tokens
//! - [`ValidJson`] for validated JSON bodies

pub mod auth;
pub mod request_id;
pub mod validate;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use validate::{ValidJson, Validate};
