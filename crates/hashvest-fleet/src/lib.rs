//! # Hashvest Fleet
//!
//! Persistence for the miner fleet and user settings.
//!
//! Three JSON records live under one data directory:
//! - `fleet.json` — miner groups plus default economic assumptions
//! - `calculator.json` — last-used calculator inputs (versioned)
//! - `settings.json` — app settings (pool linkage, use-fleet-data flag)
//!
//! The projection engine never touches this storage; callers load records
//! here and hand the engine already-parsed values. Missing or corrupt
//! files degrade to the default record with a warning, never an error.

pub mod records;
pub mod store;

pub use records::{
    AppSettings, CalculatorSettings, EconomicDefaults, FleetRecord, FleetSummary, MinerGroup,
    MinerStatus, PoolSettings,
};
pub use store::FleetStore;

use thiserror::Error;

/// Result type alias for fleet storage operations
pub type Result<T> = std::result::Result<T, FleetError>;

/// Errors from fleet storage operations
#[derive(Error, Debug)]
pub enum FleetError {
    /// Underlying filesystem failure
    #[error("fleet storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded
    #[error("fleet record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Referenced miner group does not exist
    #[error("miner group not found: {0}")]
    GroupNotFound(String),
}
