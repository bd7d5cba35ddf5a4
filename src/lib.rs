//! CrossList service: photo intake, SKU batches, AI listing drafts and
//! sold-price comparables behind a small HTTP API, plus the typed client and
//! session container that drive it.

pub mod api;
pub mod client;
pub mod config;
pub mod ebay;
pub mod error;
pub mod http;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod session;
pub mod sku;
pub mod storage;
pub mod store;

pub use api::{AppState, router};
pub use client::{ClientError, CrossListClient};
pub use config::AppConfig;
pub use session::Session;
