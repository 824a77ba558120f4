//! # Simulation Parameters
//!
//! Typed, sanitized input for one projection run.
//!
//! The UI/persistence side hands the engine a [`RawParams`] record of
//! free-form field values; [`SimulationParams::from_raw`] substitutes the
//! documented default for anything missing, non-numeric, or outside its
//! domain. The engine itself never raises on bad input.

use crate::constants::*;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of one simulation period
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodLength {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodLength {
    /// Calendar days covered by one period
    pub fn days(&self) -> f64 {
        match self {
            Self::Daily => 1.0,
            Self::Weekly => 7.0,
            Self::Monthly => DAYS_PER_MONTH,
        }
    }

    /// Periods per calendar month
    pub fn per_month(&self) -> f64 {
        match self {
            Self::Daily => 30.44,
            Self::Weekly => 4.348,
            Self::Monthly => 1.0,
        }
    }

    /// Plural unit label for rendering
    pub fn label(&self) -> &'static str {
        match self {
            Self::Daily => "days",
            Self::Weekly => "weeks",
            Self::Monthly => "months",
        }
    }

    /// Singular unit label for rendering
    pub fn label_singular(&self) -> &'static str {
        match self {
            Self::Daily => "day",
            Self::Weekly => "week",
            Self::Monthly => "month",
        }
    }
}

impl Default for PeriodLength {
    fn default() -> Self {
        Self::Monthly
    }
}

/// Convert a monthly-quoted rate into a per-period rate.
///
/// Compounds `(1 + monthly)^(days / 30.44) - 1` so drift quoted per month
/// applies exactly once regardless of the period granularity.
pub fn per_period_rate(monthly_rate: f64, days_per_period: f64) -> f64 {
    (1.0 + monthly_rate).powf(days_per_period / DAYS_PER_MONTH) - 1.0
}

/// Unparsed input fields as captured from the UI or settings record.
///
/// Every field is optional; absent or unparseable values fall back to the
/// documented default during sanitization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawParams {
    pub btc_price: Option<String>,
    /// Price drift, % per month
    pub price_change_pct: Option<String>,
    /// Network difficulty in T
    pub difficulty_t: Option<String>,
    /// Difficulty drift, % per month
    pub diff_change_pct: Option<String>,
    pub num_periods: Option<String>,
    pub period: Option<PeriodLength>,
    pub unit_hashrate_ths: Option<String>,
    pub unit_power_kw: Option<String>,
    pub unit_capex: Option<String>,
    pub unit_count: Option<String>,
    /// Electricity cost, $/kWh
    pub elec_cost: Option<String>,
    pub pool_fee_pct: Option<String>,
    pub uptime_pct: Option<String>,
    /// Fraction of mined BTC held rather than sold, %
    pub hold_ratio_pct: Option<String>,
    pub btc_treasury: Option<String>,
    pub lifespan_months: Option<String>,
    pub salvage_pct: Option<String>,
    pub monthly_additions: Option<String>,
    pub deduct_addition_capex: Option<bool>,
    pub reinvest: Option<bool>,
    pub elec_pre_deducted: Option<bool>,
    pub auto_replace: Option<bool>,
}

/// Immutable, sanitized input for one projection run.
///
/// Percentages are stored as fractions and drift rates stay monthly-quoted;
/// [`simulate`](crate::simulate::simulate) converts them to per-period
/// rates once, up front.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationParams {
    pub btc_price: f64,
    pub monthly_price_change: f64,
    pub difficulty_t: f64,
    pub monthly_diff_change: f64,
    pub num_periods: u32,
    pub period: PeriodLength,
    pub unit_hashrate_ths: f64,
    pub unit_power_kw: f64,
    pub unit_capex: f64,
    pub unit_count: u32,
    pub elec_cost_kwh: f64,
    pub pool_fee: f64,
    pub uptime: f64,
    pub hold_ratio: f64,
    pub btc_treasury: f64,
    pub lifespan_months: u32,
    pub salvage_fraction: f64,
    pub monthly_additions: u32,
    pub deduct_addition_capex: bool,
    pub reinvest: bool,
    /// Electricity treated as already netted out of the held/sold split;
    /// the cost still accrues for reporting but not against cash flow.
    pub elec_pre_deducted: bool,
    pub auto_replace: bool,
    /// Snapshot of the run's start instant, taken once by the caller
    pub start: NaiveDateTime,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self::from_raw(&RawParams::default(), Utc::now().naive_utc())
    }
}

impl SimulationParams {
    /// Sanitize raw field values, substituting the documented default for
    /// anything missing, non-numeric, or outside its domain.
    pub fn from_raw(raw: &RawParams, start: NaiveDateTime) -> Self {
        Self {
            btc_price: num(&raw.btc_price, DEFAULT_BTC_PRICE),
            monthly_price_change: signed_num(&raw.price_change_pct, 0.0) / 100.0,
            difficulty_t: num(&raw.difficulty_t, DEFAULT_DIFFICULTY_T),
            monthly_diff_change: signed_num(&raw.diff_change_pct, 0.0) / 100.0,
            num_periods: count(&raw.num_periods, DEFAULT_NUM_PERIODS, 1),
            period: raw.period.unwrap_or_default(),
            unit_hashrate_ths: num(&raw.unit_hashrate_ths, DEFAULT_UNIT_HASHRATE_THS),
            unit_power_kw: num(&raw.unit_power_kw, DEFAULT_UNIT_POWER_KW),
            unit_capex: num(&raw.unit_capex, 0.0),
            unit_count: count(&raw.unit_count, 1, 1),
            elec_cost_kwh: num(&raw.elec_cost, 0.0),
            pool_fee: num(&raw.pool_fee_pct, 0.0) / 100.0,
            uptime: num(&raw.uptime_pct, DEFAULT_UPTIME_PCT) / 100.0,
            hold_ratio: num(&raw.hold_ratio_pct, 0.0) / 100.0,
            btc_treasury: num(&raw.btc_treasury, 0.0),
            lifespan_months: count(&raw.lifespan_months, DEFAULT_LIFESPAN_MONTHS, 1),
            salvage_fraction: num(&raw.salvage_pct, 0.0) / 100.0,
            monthly_additions: count(&raw.monthly_additions, 0, 0),
            deduct_addition_capex: raw.deduct_addition_capex.unwrap_or(true),
            reinvest: raw.reinvest.unwrap_or(false),
            elec_pre_deducted: raw.elec_pre_deducted.unwrap_or(false),
            auto_replace: raw.auto_replace.unwrap_or(true),
            start,
        }
    }

    /// Total initial capital outlay
    pub fn total_capex(&self) -> f64 {
        self.unit_capex * self.unit_count as f64
    }

    /// Miner lifespan expressed in periods, floored at one
    pub fn lifespan_periods(&self) -> u32 {
        let periods = self.lifespan_months as f64 * (DAYS_PER_MONTH / self.period.days());
        (periods.round() as u32).max(1)
    }
}

/// Parse a non-negative numeric field, falling back to `default` when the
/// value is missing, non-numeric, non-finite, or negative.
fn num(field: &Option<String>, default: f64) -> f64 {
    field
        .as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

/// Parse a signed numeric field (drift rates may be negative)
fn signed_num(field: &Option<String>, default: f64) -> f64 {
    field
        .as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Parse an integer count field, clamped to at least `min`
fn count(field: &Option<String>, default: u32, min: u32) -> u32 {
    field
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .map(|v| v.min(u32::MAX as i64) as u32)
        .unwrap_or(default)
        .max(min)
}
