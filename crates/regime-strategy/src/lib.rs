//! regime-strategy
//!
//! The strategy capability-set (`Strategy` trait), a host enforcing
//! single-registration/timeframe-match/shadow-mode gating, the concrete
//! `RegimeStrategy` that wires the classifier and allocator together, the
//! fixed trading universe, and the schema-versioned persisted state
//! checkpointed between bars.

mod host;
mod persisted;
mod regime_strategy;
mod types;
mod universe;

pub use host::StrategyHost;
pub use persisted::{apply_to_engine_state, from_engine_state, PersistedPosition, PersistedStrategyState, PersistedWeights, SCHEMA_VERSION};
pub use regime_strategy::RegimeStrategy;
pub use types::{
    BarView, IntentMode, ShadowMode, Strategy, StrategyContext, StrategyHostError, StrategyIntents,
    StrategyOutput, StrategySpec, StrategyState,
};
pub use universe::Universe;
