//! levelup-store — Progress persistence.
//!
//! Implements the `ProgressGateway` trait over a remote progress API and a
//! local file cache, so quiz progress survives both network outages and
//! restarts.

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod local;
pub mod mock;

pub use config::{create_gateway, load_config, load_config_from, ApiConfig, LevelupConfig};
pub use error::StoreError;
pub use gateway::DualPathGateway;
