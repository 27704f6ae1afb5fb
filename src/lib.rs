//! VPN license server and device-side license cache
//!
//! Architecture:
//! - SeaORM for database access (SQLite)
//! - Axum for HTTP API with rate limiting
//! - Stripe webhooks for paid license issuance
//! - Reqwest client with an on-disk cache for devices

pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod model;
pub mod payment;
pub mod plugins;
pub mod prelude;
pub mod state;
pub mod store;
pub mod sv;
pub mod utils;
