//! # Hashvest Engine
//!
//! Deterministic BTC mining profitability projection engine.
//!
//! Given a flat parameter set (market assumptions, hardware economics,
//! operational policies) the engine advances a fleet-and-cash-flow state
//! machine one period at a time and emits a chronological series of period
//! records plus headline metrics.
//!
//! ## Projection Pipeline
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │  RawParams    │ ──► │  simulate()        │ ──► │  summarize()      │
//! │  (sanitized   │     │  period-by-period  │     │  headline metrics │
//! │   defaults)   │     │  PeriodRecord[]    │     │  breakeven / ROI  │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//! ```
//!
//! ## Block Subsidy Schedule
//!
//! | Effective date | Subsidy (BTC) |
//! |----------------|---------------|
//! | (pre-schedule) | 3.125         |
//! | 2028-04-17     | 1.5625        |
//! | 2032-04-17     | 0.78125       |
//! | ...            | halves every 4 years through 2100 |
//!
//! The engine is pure: no I/O, no clock reads, no randomness. The caller
//! snapshots the start instant once and passes it in, so identical inputs
//! always produce bit-identical output.

pub mod halving;
pub mod params;
pub mod simulate;
pub mod summary;

pub use halving::HalvingSchedule;
pub use params::{per_period_rate, PeriodLength, RawParams, SimulationParams};
pub use simulate::{simulate, MinerCohort, PeriodRecord, Projection, SimulationState};
pub use summary::{summarize, ProjectionSummary};

/// Mining constants and documented input defaults
pub mod constants {
    /// Seconds in a day
    pub const SECONDS_PER_DAY: f64 = 86_400.0;

    /// 2^32 — expected hashes per unit of difficulty
    pub const TWO_POW_32: f64 = 4_294_967_296.0;

    /// Block subsidy before the first scheduled halving
    pub const CURRENT_BLOCK_REWARD: f64 = 3.125;

    /// One terahash in H/s (also one T of difficulty in raw units)
    pub const TERA: f64 = 1e12;

    /// Mean days per calendar month, used for rate conversion
    pub const DAYS_PER_MONTH: f64 = 30.44;

    /// Default BTC price in USD
    pub const DEFAULT_BTC_PRICE: f64 = 96_000.0;

    /// Default network difficulty in T
    pub const DEFAULT_DIFFICULTY_T: f64 = 125.86;

    /// Default projection horizon in periods
    pub const DEFAULT_NUM_PERIODS: u32 = 24;

    /// Default per-unit hashrate in TH/s (Antminer S21 XP Hyd. class)
    pub const DEFAULT_UNIT_HASHRATE_THS: f64 = 335.0;

    /// Default per-unit power draw in kW
    pub const DEFAULT_UNIT_POWER_KW: f64 = 5.36;

    /// Default miner lifespan in months
    pub const DEFAULT_LIFESPAN_MONTHS: u32 = 36;

    /// Default uptime percentage
    pub const DEFAULT_UPTIME_PCT: f64 = 100.0;
}

pub use constants::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_relation_constants() {
        assert_eq!(TWO_POW_32, (1u64 << 32) as f64);
        assert_eq!(SECONDS_PER_DAY, 86_400.0);
    }

    #[test]
    fn test_pre_schedule_reward() {
        assert_eq!(CURRENT_BLOCK_REWARD, 3.125);
    }
}
