//! # Integration Hub Common
//!
//! Shared infrastructure used by every Integration Hub crate:
//! - A single stable error enum covering every error kind named in the
//!   component design
//! - Structured logging setup (`tracing`)
//! - HMAC-SHA256 signing for webhook payloads
//! - Small helpers for environment-variable configuration

pub mod env;
pub mod error;
pub mod logging;
pub mod signing;

pub use error::{Error, Result};
pub use logging::{init_tracing, init_tracing_json};
pub use signing::{sign_hmac, verify_hmac};
