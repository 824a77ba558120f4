//! # Projection Summarizer
//!
//! Reduces an emitted projection into the headline figures the dashboard
//! cards show: totals, ROI, breakeven, and the day-1 snapshot computed
//! from the initial fleet at initial market conditions (deliberately not
//! compounded — it answers "what does this fleet earn today").

use crate::constants::*;
use crate::halving::HalvingSchedule;
use crate::params::{per_period_rate, SimulationParams};
use crate::simulate::Projection;
use serde::{Deserialize, Serialize};

/// Headline metrics for one projection run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectionSummary {
    /// BTC price compounded to the end of the horizon
    pub final_btc_price: f64,
    /// Still-held BTC valued at the final price
    pub held_btc_value: f64,
    /// Cumulative cash flow + held value
    pub total_pl: f64,
    /// Total P/L over total capex, percent; 0 when capex is 0
    pub roi_pct: f64,
    pub total_capex: f64,
    /// Day-1 net BTC production per day
    pub daily_btc: f64,
    pub daily_revenue: f64,
    pub daily_elec_cost: f64,
    pub daily_profit: f64,
    /// Electricity cost per BTC mined on day 1; infinite with no production
    pub cost_per_btc: f64,
    /// Power efficiency in W/TH
    pub efficiency_w_per_th: f64,
    pub btc_mined: f64,
    pub btc_held: f64,
    pub total_elec_cost: f64,
    pub breakeven_period: Option<u32>,
    pub active_units: u32,
    pub units_reinvested: u32,
    pub units_scheduled: u32,
    pub units_retired: u32,
}

impl ProjectionSummary {
    /// Any fleet growth or shrinkage happened over the horizon
    pub fn fleet_changed(&self) -> bool {
        self.units_reinvested > 0 || self.units_scheduled > 0 || self.units_retired > 0
    }
}

/// Reduce a finished projection to its headline metrics.
pub fn summarize(projection: &Projection, params: &SimulationParams) -> ProjectionSummary {
    let state = &projection.final_state;
    let days = params.period.days();
    let price_rate = per_period_rate(params.monthly_price_change, days);

    let final_btc_price =
        params.btc_price * (1.0 + price_rate).powi(params.num_periods as i32);
    let held_btc_value = state.btc_held * final_btc_price;
    let total_pl = state.cash_flow + held_btc_value;
    let total_capex = params.total_capex();
    let roi_pct = if total_capex > 0.0 {
        total_pl / total_capex * 100.0
    } else {
        0.0
    };

    // Day-1 snapshot: the initial fleet at initial price and difficulty.
    let init_hashrate_hs = params.unit_hashrate_ths * params.unit_count as f64 * TERA;
    let init_power_kw = params.unit_power_kw * params.unit_count as f64;
    let reward = HalvingSchedule::mainnet().reward_at(params.start);
    let daily_btc_gross = (init_hashrate_hs * SECONDS_PER_DAY * reward)
        / (params.difficulty_t * TERA * TWO_POW_32);
    let daily_btc = daily_btc_gross * (1.0 - params.pool_fee) * params.uptime;
    let daily_revenue = daily_btc * params.btc_price;
    let daily_elec_cost = init_power_kw * 24.0 * params.elec_cost_kwh * params.uptime;
    let daily_profit = daily_revenue - daily_elec_cost;
    let cost_per_btc = if daily_btc > 0.0 {
        daily_elec_cost / daily_btc
    } else {
        f64::INFINITY
    };
    let efficiency_w_per_th = if params.unit_hashrate_ths > 0.0 {
        params.unit_power_kw * 1000.0 / params.unit_hashrate_ths
    } else {
        0.0
    };

    ProjectionSummary {
        final_btc_price,
        held_btc_value,
        total_pl,
        roi_pct,
        total_capex,
        daily_btc,
        daily_revenue,
        daily_elec_cost,
        daily_profit,
        cost_per_btc,
        efficiency_w_per_th,
        btc_mined: state.btc_mined,
        btc_held: state.btc_held,
        total_elec_cost: state.elec_cost,
        breakeven_period: state.breakeven_period,
        active_units: state.active_units,
        units_reinvested: state.units_reinvested,
        units_scheduled: state.units_scheduled,
        units_retired: state.units_retired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{PeriodLength, RawParams};
    use crate::simulate::simulate;
    use chrono::NaiveDate;

    fn params() -> SimulationParams {
        let start = NaiveDate::from_ymd_opt(2026, 8, 6)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut p = SimulationParams::from_raw(&RawParams::default(), start);
        p.period = PeriodLength::Monthly;
        p.auto_replace = false;
        p
    }

    #[test]
    fn test_day1_snapshot_uses_initial_fleet() {
        let mut p = params();
        p.unit_count = 2;
        p.elec_cost_kwh = 0.07;
        p.pool_fee = 0.02;
        p.uptime = 0.95;
        let projection = simulate(&p);
        let summary = summarize(&projection, &p);

        let gross = (2.0 * 335.0e12 * 86_400.0 * 3.125) / (125.86e12 * 4_294_967_296.0);
        let net = gross * 0.98 * 0.95;
        assert!((summary.daily_btc - net).abs() < 1e-10);
        assert!((summary.daily_revenue - net * 96_000.0).abs() < 1e-4);
        let elec = 2.0 * 5.36 * 24.0 * 0.07 * 0.95;
        assert!((summary.daily_elec_cost - elec).abs() < 1e-9);
        assert!((summary.daily_profit - (summary.daily_revenue - elec)).abs() < 1e-9);
        assert!((summary.cost_per_btc - elec / net).abs() < 1e-4);
    }

    #[test]
    fn test_cost_per_btc_infinite_without_production() {
        let mut p = params();
        p.uptime = 0.0;
        p.elec_cost_kwh = 0.07;
        let projection = simulate(&p);
        let summary = summarize(&projection, &p);
        assert!(summary.cost_per_btc.is_infinite());
    }

    #[test]
    fn test_roi_zero_when_capex_zero() {
        let p = params();
        assert_eq!(p.unit_capex, 0.0);
        let projection = simulate(&p);
        let summary = summarize(&projection, &p);
        assert_eq!(summary.roi_pct, 0.0);
    }

    #[test]
    fn test_total_pl_combines_cash_and_held_value() {
        let mut p = params();
        p.unit_capex = 10_000.0;
        p.hold_ratio = 0.5;
        p.monthly_price_change = 0.05;
        let projection = simulate(&p);
        let summary = summarize(&projection, &p);

        let expected_final = 96_000.0 * 1.05_f64.powi(24);
        assert!((summary.final_btc_price - expected_final).abs() < 1e-3);
        let held_value = projection.final_state.btc_held * summary.final_btc_price;
        assert!((summary.held_btc_value - held_value).abs() < 1e-6);
        assert!(
            (summary.total_pl - (projection.final_state.cash_flow + held_value)).abs() < 1e-6
        );
        let roi = summary.total_pl / 10_000.0 * 100.0;
        assert!((summary.roi_pct - roi).abs() < 1e-9);
    }

    #[test]
    fn test_efficiency_is_watts_per_terahash() {
        let p = params();
        let projection = simulate(&p);
        let summary = summarize(&projection, &p);
        assert!((summary.efficiency_w_per_th - 5_360.0 / 335.0).abs() < 1e-9);
    }
}
