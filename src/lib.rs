//! Mall token refresher — library crate.
//!
//! Renews a mall's OAuth access/refresh token pair against the storefront
//! platform's token endpoint and persists the result, one row per mall.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod normalize;
pub mod rotation;
pub mod store;
pub mod upstream;
pub mod vault;

pub use errors::{Error, Result, UpstreamError};
pub use rotation::{RefreshOutcome, TokenRotator};
