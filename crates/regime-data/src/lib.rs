//! regime-data
//!
//! Data Handler: an ordered, deduplicated stream of bars and a bounded,
//! no-lookahead history query. No indicator logic lives here — this crate's
//! only job is "hand out bars in order, never past a cutoff".

mod handler;
mod loader;
mod types;

pub use handler::{DataError, InMemoryDataHandler};
pub use loader::{load_csv_file, parse_csv_bars, LoadError};
pub use types::{Bar, BarInvariantError, Timeframe};
