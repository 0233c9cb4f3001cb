//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, CheckerConfig, StorageConfig, ...)
//! - [`providers`]: Reputation provider credentials and quotas
//! - [`validation`]: Startup validation collecting every problem at once

mod defaults;
mod providers;
mod types;
mod validation;

pub use providers::ProvidersConfig;
pub use types::{BanConfig, Config, ReconnectConfig, ServerEntry};
pub use validation::validate;
