//! regime-config
//!
//! Layered YAML configuration loading, deep-merge, canonical-JSON hashing,
//! and `InvalidConfig` validation — all resolved once at process start,
//! mirroring `mqk-config::load_layered_yaml`. Nothing here runs mid-backtest.

mod loader;
mod types;
mod validate;

pub use loader::{load_layered_yaml, LoadedConfig};
pub use types::{RawConfig, ResolvedConfig, SymbolMetadata, UniverseConfig};
pub use validate::{validate, ConfigError};
