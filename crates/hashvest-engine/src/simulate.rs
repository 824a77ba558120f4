//! # Period Simulator
//!
//! The main projection loop. Advances a fleet-and-cash-flow state machine
//! one period at a time: cohort retirement and salvage, optional
//! auto-replacement, scheduled fleet additions via a fractional
//! accumulator, difficulty-based production, the hold/sell split, and
//! whole-unit reinvestment of positive cash flow.
//!
//! The loop is synchronous and owns all of its state; a run is a pure
//! function of its [`SimulationParams`].

use crate::constants::*;
use crate::halving::HalvingSchedule;
use crate::params::{per_period_rate, SimulationParams};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A batch of identical units sharing an acquisition period.
///
/// Cohorts are only ever appended; a retired cohort keeps its slot with a
/// zeroed count so indices into the list stay valid.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MinerCohort {
    /// Period index (0-based) the units were acquired
    pub acquired_period: u32,
    /// Live unit count; zeroed on retirement, never negative
    pub count: u32,
}

/// Mutable running state, threaded through the loop one period at a time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationState {
    /// Units currently hashing
    pub active_units: u32,
    /// Append-only cohort arena, initial fleet first
    pub cohorts: Vec<MinerCohort>,
    /// Cumulative BTC retained (seeded with the starting treasury)
    pub btc_held: f64,
    /// Cumulative BTC produced
    pub btc_mined: f64,
    /// Cumulative net cash flow, signed; starts at −total initial capex
    pub cash_flow: f64,
    /// Cumulative electricity cost (reported even when pre-deducted)
    pub elec_cost: f64,
    /// Uncommitted sale proceeds awaiting a full unit price
    pub reinvest_pool: f64,
    /// Units bought from reinvested proceeds
    pub units_reinvested: u32,
    /// Units added on the monthly schedule
    pub units_scheduled: u32,
    /// Units retired at end of lifespan
    pub units_retired: u32,
    /// Salvage value realized across all retirements
    pub salvage_recovered: f64,
    /// Fractional remainder of scheduled additions
    pub addition_accum: f64,
    /// First 1-based period with non-negative total economic value
    pub breakeven_period: Option<u32>,
}

impl SimulationState {
    fn new(params: &SimulationParams) -> Self {
        Self {
            active_units: params.unit_count,
            cohorts: vec![MinerCohort {
                acquired_period: 0,
                count: params.unit_count,
            }],
            btc_held: params.btc_treasury,
            btc_mined: 0.0,
            cash_flow: -params.total_capex(),
            elec_cost: 0.0,
            reinvest_pool: 0.0,
            units_reinvested: 0,
            units_scheduled: 0,
            units_retired: 0,
            salvage_recovered: 0.0,
            addition_accum: 0.0,
            breakeven_period: None,
        }
    }
}

/// One emitted row of the projection, in chronological order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// 1-based period index
    pub period: u32,
    pub date: NaiveDate,
    pub btc_price: f64,
    /// Network difficulty in T
    pub difficulty_t: f64,
    pub block_reward: f64,
    pub active_units: u32,
    /// Units bought from the reinvestment pool this period
    pub units_reinvested: u32,
    /// Units added on the monthly schedule this period
    pub units_scheduled: u32,
    pub units_retired: u32,
    pub units_replaced: u32,
    /// BTC mined this period, net of pool fee and uptime
    pub btc_mined: f64,
    /// Cumulative BTC held after this period
    pub btc_held: f64,
    /// Held BTC valued at this period's price
    pub held_value_usd: f64,
    /// Electricity cost this period
    pub elec_cost: f64,
    /// Cash flow this period before reinvestment commits it
    pub net_cash_flow: f64,
    /// Total economic value: cumulative cash flow + pool + held BTC value
    pub total_value: f64,
    /// A halving took effect this period
    pub halving: bool,
}

/// Full result of one projection run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Projection {
    pub records: Vec<PeriodRecord>,
    pub final_state: SimulationState,
}

/// Run the projection for `params.num_periods` discrete periods.
///
/// Deterministic: identical parameters always yield an identical record
/// sequence. Each period executes, in order: subsidy resolution and
/// halving detection, retirement, replacement or salvage credit,
/// scheduled additions, production, the hold/sell split, reinvestment,
/// cumulative tracking, and breakeven detection.
pub fn simulate(params: &SimulationParams) -> Projection {
    let days = params.period.days();
    let price_rate = per_period_rate(params.monthly_price_change, days);
    let diff_rate = per_period_rate(params.monthly_diff_change, days);
    let lifespan_periods = params.lifespan_periods();
    let additions_per_period = params.monthly_additions as f64 * (days / DAYS_PER_MONTH);
    let difficulty0 = params.difficulty_t * TERA;
    let schedule = HalvingSchedule::mainnet();

    let mut state = SimulationState::new(params);
    let mut records = Vec::with_capacity(params.num_periods as usize);
    let mut prev_reward = CURRENT_BLOCK_REWARD;

    for i in 0..params.num_periods {
        let elapsed_ms = (i as f64 * days * 86_400_000.0) as i64;
        let date = params.start + Duration::milliseconds(elapsed_ms);
        let btc_price = params.btc_price * (1.0 + price_rate).powi(i as i32);
        let difficulty = difficulty0 * (1.0 + diff_rate).powi(i as i32);
        let block_reward = schedule.reward_at(date);
        let halving = block_reward < prev_reward;
        if halving {
            tracing::debug!(period = i + 1, reward = block_reward, "halving boundary");
        }
        prev_reward = block_reward;

        // Retire cohorts whose lifespan elapsed; the slot stays, zeroed.
        let mut retired = 0u32;
        let mut salvage = 0.0;
        for cohort in state.cohorts.iter_mut() {
            if cohort.count > 0 && i - cohort.acquired_period >= lifespan_periods {
                retired += cohort.count;
                salvage += cohort.count as f64 * params.unit_capex * params.salvage_fraction;
                state.active_units -= cohort.count;
                cohort.count = 0;
            }
        }
        state.units_retired += retired;
        state.salvage_recovered += salvage;

        // Replacements buy in at capex net of salvage.
        let mut replaced = 0u32;
        if params.auto_replace && retired > 0 {
            replaced = retired;
            state.active_units += replaced;
            state.cohorts.push(MinerCohort {
                acquired_period: i,
                count: replaced,
            });
            state.cash_flow -=
                replaced as f64 * params.unit_capex * (1.0 - params.salvage_fraction);
        }
        if !params.auto_replace && salvage > 0.0 {
            if params.reinvest {
                state.reinvest_pool += salvage;
            } else {
                state.cash_flow += salvage;
            }
        }

        // Scheduled additions: accumulate the fractional per-period rate
        // and release whole units, keeping the remainder.
        let mut scheduled = 0u32;
        if params.monthly_additions > 0 && i > 0 {
            state.addition_accum += additions_per_period;
            scheduled = state.addition_accum.floor() as u32;
            state.addition_accum -= scheduled as f64;
            if scheduled > 0 {
                state.active_units += scheduled;
                state.units_scheduled += scheduled;
                state.cohorts.push(MinerCohort {
                    acquired_period: i,
                    count: scheduled,
                });
                if params.deduct_addition_capex {
                    state.cash_flow -= scheduled as f64 * params.unit_capex;
                }
            }
        }

        // Production from the post-adjustment fleet.
        let hashrate_hs = params.unit_hashrate_ths * state.active_units as f64 * TERA;
        let power_kw = params.unit_power_kw * state.active_units as f64;
        let daily_btc_gross = (hashrate_hs * SECONDS_PER_DAY * block_reward)
            / (difficulty * TWO_POW_32);
        let daily_btc_net = daily_btc_gross * (1.0 - params.pool_fee) * params.uptime;
        let btc_mined = daily_btc_net * days;
        let elec_cost = power_kw * 24.0 * days * params.elec_cost_kwh * params.uptime;

        // Hold/sell split. When electricity is pre-deducted upstream the
        // cost never hits cash flow, though it still accrues for reporting.
        let btc_held = btc_mined * params.hold_ratio;
        let btc_sold = btc_mined * (1.0 - params.hold_ratio);
        let cash_from_sales = btc_sold * btc_price;
        let net_cash_flow = if params.elec_pre_deducted {
            cash_from_sales
        } else {
            cash_from_sales - elec_cost
        };

        // Reinvest positive cash flow: buy every whole unit the pool
        // affords, leaving the fractional remainder for later periods.
        let mut bought = 0u32;
        let mut reinvest_spent = 0.0;
        let reinvest_fired =
            params.reinvest && params.unit_capex > 0.0 && net_cash_flow > 0.0;
        if reinvest_fired {
            state.reinvest_pool += net_cash_flow;
            while state.reinvest_pool >= params.unit_capex {
                state.reinvest_pool -= params.unit_capex;
                state.active_units += 1;
                state.units_reinvested += 1;
                bought += 1;
                reinvest_spent += params.unit_capex;
            }
            if bought > 0 {
                state.cohorts.push(MinerCohort {
                    acquired_period: i,
                    count: bought,
                });
            }
        }

        state.btc_mined += btc_mined;
        state.btc_held += btc_held;
        state.elec_cost += elec_cost;
        if reinvest_fired {
            // spend committed to hardware is no longer cash
            state.cash_flow += net_cash_flow - reinvest_spent;
        } else {
            state.cash_flow += net_cash_flow;
        }

        let total_value = state.cash_flow + state.reinvest_pool + state.btc_held * btc_price;
        if state.breakeven_period.is_none() && total_value >= 0.0 {
            state.breakeven_period = Some(i + 1);
            tracing::debug!(period = i + 1, "projection reaches breakeven");
        }

        records.push(PeriodRecord {
            period: i + 1,
            date: date.date(),
            btc_price,
            difficulty_t: difficulty / TERA,
            block_reward,
            active_units: state.active_units,
            units_reinvested: bought,
            units_scheduled: scheduled,
            units_retired: retired,
            units_replaced: replaced,
            btc_mined,
            btc_held: state.btc_held,
            held_value_usd: state.btc_held * btc_price,
            elec_cost,
            net_cash_flow,
            total_value,
            halving,
        });
    }

    Projection {
        records,
        final_state: state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{PeriodLength, RawParams};
    use chrono::{NaiveDate, NaiveDateTime};

    fn start(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// Flat-market single-unit baseline: no drift, no growth policies.
    fn baseline() -> SimulationParams {
        let mut p = SimulationParams::from_raw(&RawParams::default(), start(2026, 8, 6));
        p.btc_price = 96_000.0;
        p.difficulty_t = 125.86;
        p.unit_hashrate_ths = 335.0;
        p.unit_power_kw = 5.36;
        p.unit_count = 1;
        p.num_periods = 24;
        p.period = PeriodLength::Monthly;
        p.auto_replace = false;
        p
    }

    #[test]
    fn test_emits_one_record_per_period_with_1_based_indices() {
        let params = baseline();
        let projection = simulate(&params);
        assert_eq!(projection.records.len(), 24);
        for (idx, record) in projection.records.iter().enumerate() {
            assert_eq!(record.period, idx as u32 + 1);
        }
    }

    #[test]
    fn test_fleet_constant_without_growth_policies() {
        let mut params = baseline();
        params.unit_count = 3;
        params.lifespan_months = 1200; // never retires inside the horizon
        params.reinvest = false;
        params.monthly_additions = 0;
        let projection = simulate(&params);
        for record in &projection.records {
            assert_eq!(record.active_units, 3);
            assert_eq!(record.units_retired, 0);
            assert_eq!(record.units_reinvested, 0);
            assert_eq!(record.units_scheduled, 0);
        }
    }

    #[test]
    fn test_cumulative_mined_matches_per_period_sum() {
        let mut params = baseline();
        params.reinvest = true;
        params.unit_capex = 5_000.0;
        params.monthly_additions = 2;
        params.lifespan_months = 6;
        params.auto_replace = true;
        let projection = simulate(&params);
        let sum: f64 = projection.records.iter().map(|r| r.btc_mined).sum();
        assert!((sum - projection.final_state.btc_mined).abs() < 1e-12);
    }

    #[test]
    fn test_single_monthly_period_production() {
        // 335 TH/s, 125.86 T, 3.125 BTC subsidy, one monthly period,
        // 100% hold: mined BTC follows the difficulty relation exactly.
        let mut params = baseline();
        params.num_periods = 1;
        params.hold_ratio = 1.0;
        let projection = simulate(&params);
        let record = &projection.records[0];

        let daily = (335.0e12 * 86_400.0 * 3.125) / (125.86e12 * 4_294_967_296.0);
        let expected = daily * 30.44;
        assert!((record.btc_mined - expected).abs() < 1e-8);
        // 100% hold: everything mined is held, nothing sold
        assert!((record.btc_held - expected).abs() < 1e-8);
        assert_eq!(record.net_cash_flow, 0.0);
    }

    #[test]
    fn test_capex_and_sales_drive_cash_flow() {
        // capex 10k, one unit, everything sold, flat market
        let mut params = baseline();
        params.num_periods = 1;
        params.unit_capex = 10_000.0;
        params.elec_cost_kwh = 0.07;
        params.hold_ratio = 0.0;
        let projection = simulate(&params);
        let record = &projection.records[0];

        let sales = record.btc_mined * record.btc_price;
        let elec = 5.36 * 24.0 * 30.44 * 0.07;
        assert!((record.net_cash_flow - (sales - elec)).abs() < 1e-6);
        assert!(
            (projection.final_state.cash_flow - (-10_000.0 + sales - elec)).abs() < 1e-6
        );
        assert!(
            (record.total_value
                - (projection.final_state.cash_flow + record.btc_held * record.btc_price))
                .abs()
                < 1e-6
        );
    }

    #[test]
    fn test_elec_pre_deducted_skips_cash_flow_but_still_reports() {
        let mut params = baseline();
        params.num_periods = 2;
        params.elec_cost_kwh = 0.10;
        params.elec_pre_deducted = true;
        let projection = simulate(&params);
        for record in &projection.records {
            let sales = record.btc_mined * record.btc_price;
            assert!((record.net_cash_flow - sales).abs() < 1e-9);
            assert!(record.elec_cost > 0.0);
        }
        assert!(projection.final_state.elec_cost > 0.0);
    }

    #[test]
    fn test_breakeven_is_first_non_negative_value() {
        let mut params = baseline();
        params.unit_capex = 3_000.0;
        params.elec_cost_kwh = 0.05;
        let projection = simulate(&params);
        let breakeven = projection.final_state.breakeven_period;
        if let Some(p) = breakeven {
            for record in &projection.records {
                if record.period < p {
                    assert!(record.total_value < 0.0);
                } else if record.period == p {
                    assert!(record.total_value >= 0.0);
                    break;
                }
            }
        } else {
            assert!(projection.records.iter().all(|r| r.total_value < 0.0));
        }
    }

    #[test]
    fn test_breakeven_never_within_horizon() {
        let mut params = baseline();
        params.unit_capex = 1.0e12; // absurd capex cannot break even
        params.num_periods = 12;
        let projection = simulate(&params);
        assert_eq!(projection.final_state.breakeven_period, None);
    }

    #[test]
    fn test_reinvest_pool_never_retains_a_full_unit_price() {
        let mut params = baseline();
        params.reinvest = true;
        params.unit_capex = 1_000.0;
        params.num_periods = 36;
        let projection = simulate(&params);
        let mut fired = false;
        for record in &projection.records {
            if record.units_reinvested > 0 {
                fired = true;
            }
        }
        assert!(fired, "expected reinvestment to purchase at least one unit");
        assert!(projection.final_state.reinvest_pool < 1_000.0);
        assert!(projection.final_state.units_reinvested > 0);
    }

    #[test]
    fn test_reinvested_units_join_the_fleet() {
        let mut params = baseline();
        params.reinvest = true;
        params.unit_capex = 1_000.0;
        params.num_periods = 12;
        let projection = simulate(&params);
        let last = projection.records.last().unwrap();
        assert_eq!(
            last.active_units,
            1 + projection.final_state.units_reinvested
        );
        // every purchase opened a cohort at its own period
        let cohort_total: u32 = projection
            .final_state
            .cohorts
            .iter()
            .map(|c| c.count)
            .sum();
        assert_eq!(cohort_total, last.active_units);
    }

    #[test]
    fn test_halving_detected_once_with_new_reward_onward() {
        // 12 monthly periods from 2028-01-01 span the 2028-04-17 halving
        let mut params = baseline();
        params.start = start(2028, 1, 1);
        params.num_periods = 12;
        let projection = simulate(&params);
        let halvings: Vec<&PeriodRecord> =
            projection.records.iter().filter(|r| r.halving).collect();
        assert_eq!(halvings.len(), 1);
        let boundary = halvings[0].period;
        for record in &projection.records {
            if record.period < boundary {
                assert_eq!(record.block_reward, 3.125);
            } else {
                assert_eq!(record.block_reward, 1.5625);
            }
        }
        // first period whose date reaches the halving date
        assert!(halvings[0].date >= NaiveDate::from_ymd_opt(2028, 4, 17).unwrap());
        let prev = &projection.records[(boundary - 2) as usize];
        assert!(prev.date < NaiveDate::from_ymd_opt(2028, 4, 17).unwrap());
    }

    #[test]
    fn test_retirement_zeroes_cohort_and_salvage_credits_cash() {
        let mut params = baseline();
        params.unit_count = 4;
        params.unit_capex = 2_000.0;
        params.lifespan_months = 2;
        params.salvage_fraction = 0.25;
        params.auto_replace = false;
        params.num_periods = 4;
        let projection = simulate(&params);

        let retirement: Vec<&PeriodRecord> = projection
            .records
            .iter()
            .filter(|r| r.units_retired > 0)
            .collect();
        assert_eq!(retirement.len(), 1);
        let record = retirement[0];
        assert_eq!(record.period, 3); // lifespan of 2 periods elapses at index 2
        assert_eq!(record.units_retired, 4);
        assert_eq!(record.active_units, 0);
        assert_eq!(projection.final_state.cohorts[0].count, 0);
        // 4 units × 2000 × 25%
        assert!((projection.final_state.salvage_recovered - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_auto_replace_restores_fleet_at_net_cost() {
        let mut params = baseline();
        params.unit_count = 2;
        params.unit_capex = 1_000.0;
        params.lifespan_months = 2;
        params.salvage_fraction = 0.5;
        params.auto_replace = true;
        params.num_periods = 4;
        let projection = simulate(&params);

        let record = projection
            .records
            .iter()
            .find(|r| r.units_retired > 0)
            .expect("a retirement period");
        assert_eq!(record.units_replaced, 2);
        assert_eq!(record.active_units, 2);

        // replacement cohort retires on its own clock, not the original's
        let replacement = projection.final_state.cohorts.last().unwrap();
        assert_eq!(replacement.acquired_period, record.period - 1);
        assert_eq!(replacement.count, 2);
    }

    #[test]
    fn test_scheduled_additions_use_fractional_accumulator() {
        let mut params = baseline();
        params.monthly_additions = 1;
        params.period = PeriodLength::Weekly;
        params.num_periods = 10;
        params.unit_capex = 500.0;
        params.deduct_addition_capex = true;
        let projection = simulate(&params);

        // 1/month at ~4.348 periods/month: no unit before the accumulator
        // reaches 1, and never two in back-to-back periods early on
        assert_eq!(projection.records[0].units_scheduled, 0); // period 0 skipped
        let total: u32 = projection.records.iter().map(|r| r.units_scheduled).sum();
        let expected = (9.0_f64 * (7.0 / 30.44)).floor() as u32;
        assert_eq!(total, expected);
        assert_eq!(projection.final_state.units_scheduled, total);
    }

    #[test]
    fn test_identical_inputs_produce_identical_runs() {
        let mut params = baseline();
        params.reinvest = true;
        params.unit_capex = 4_000.0;
        params.monthly_additions = 1;
        params.monthly_price_change = 0.02;
        params.monthly_diff_change = 0.03;
        let a = simulate(&params);
        let b = simulate(&params);
        assert_eq!(a.records.len(), b.records.len());
        for (ra, rb) in a.records.iter().zip(b.records.iter()) {
            assert_eq!(ra.btc_mined.to_bits(), rb.btc_mined.to_bits());
            assert_eq!(ra.total_value.to_bits(), rb.total_value.to_bits());
            assert_eq!(ra.net_cash_flow.to_bits(), rb.net_cash_flow.to_bits());
        }
    }

    #[test]
    fn test_price_and_difficulty_compound_per_period() {
        let mut params = baseline();
        params.monthly_price_change = 0.10;
        params.monthly_diff_change = 0.05;
        params.num_periods = 3;
        let projection = simulate(&params);
        let r = &projection.records;
        assert_eq!(r[0].btc_price, 96_000.0);
        assert!((r[1].btc_price - 96_000.0 * 1.10).abs() < 1e-6);
        assert!((r[2].btc_price - 96_000.0 * 1.10 * 1.10).abs() < 1e-6);
        assert!((r[1].difficulty_t - 125.86 * 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_treasury_seeds_held_btc() {
        let mut params = baseline();
        params.btc_treasury = 0.5;
        params.num_periods = 1;
        params.hold_ratio = 0.0;
        let projection = simulate(&params);
        assert!((projection.records[0].btc_held - 0.5).abs() < 1e-12);
    }
}
