//! GitHub REST API backend for the HubSync engine.

mod client;
mod convert;
pub mod retry;
pub mod types;

pub use client::GitHubSource;
pub use retry::RetryConfig;
