//! # Block Subsidy Schedule
//!
//! Maps a calendar date to the applicable block subsidy using the fixed
//! table of future halvings. Dates are strictly increasing and subsidies
//! strictly halving, so the applicable subsidy is simply the value of the
//! last entry whose date is on or before the queried date.

use crate::constants::CURRENT_BLOCK_REWARD;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;

/// Scheduled halvings: (effective date, block subsidy in BTC).
///
/// Subsidy halves every four years starting 2028-04-17; before the first
/// entry the pre-schedule subsidy of 3.125 BTC applies.
static MAINNET_HALVINGS: Lazy<HalvingSchedule> = Lazy::new(|| {
    let mut entries = Vec::with_capacity(19);
    let mut reward = CURRENT_BLOCK_REWARD;
    for year in (2028..=2100).step_by(4) {
        reward /= 2.0;
        // the 17th of April every fourth year is a fixed, valid date
        let date = NaiveDate::from_ymd_opt(year, 4, 17).unwrap();
        entries.push((date, reward));
    }
    HalvingSchedule { entries }
});

/// Ordered halving-date → subsidy table
#[derive(Clone, Debug)]
pub struct HalvingSchedule {
    entries: Vec<(NaiveDate, f64)>,
}

impl HalvingSchedule {
    /// The process-wide mainnet schedule
    pub fn mainnet() -> &'static HalvingSchedule {
        &MAINNET_HALVINGS
    }

    /// Block subsidy in effect at `at`.
    ///
    /// Linear scan keeping the last entry whose date is ≤ the query; the
    /// table is small and strictly increasing so ties cannot occur.
    pub fn reward_at(&self, at: NaiveDateTime) -> f64 {
        let date = at.date();
        let mut reward = CURRENT_BLOCK_REWARD;
        for (effective, subsidy) in &self.entries {
            if date >= *effective {
                reward = *subsidy;
            }
        }
        reward
    }

    /// Scheduled entries, oldest first
    pub fn entries(&self) -> &[(NaiveDate, f64)] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_pre_schedule_dates_use_current_reward() {
        let schedule = HalvingSchedule::mainnet();
        assert_eq!(schedule.reward_at(at(2026, 8, 6)), 3.125);
        assert_eq!(schedule.reward_at(at(2028, 4, 16)), 3.125);
    }

    #[test]
    fn test_halving_boundary_is_inclusive() {
        let schedule = HalvingSchedule::mainnet();
        assert_eq!(schedule.reward_at(at(2028, 4, 17)), 1.5625);
        assert_eq!(schedule.reward_at(at(2028, 4, 18)), 1.5625);
    }

    #[test]
    fn test_successive_halvings() {
        let schedule = HalvingSchedule::mainnet();
        assert_eq!(schedule.reward_at(at(2032, 4, 17)), 0.78125);
        assert_eq!(schedule.reward_at(at(2036, 4, 17)), 0.390625);
        assert_eq!(schedule.reward_at(at(2040, 4, 17)), 0.1953125);
    }

    #[test]
    fn test_far_future_uses_last_entry() {
        let schedule = HalvingSchedule::mainnet();
        let last = schedule.entries().last().unwrap().1;
        assert_eq!(schedule.reward_at(at(2150, 1, 1)), last);
        // 19 halvings from 3.125
        assert!((last - 3.125 / 2f64.powi(19)).abs() < 1e-18);
    }

    #[test]
    fn test_table_strictly_ordered() {
        let entries = HalvingSchedule::mainnet().entries();
        assert_eq!(entries.len(), 19);
        for pair in entries.windows(2) {
            assert!(pair[0].0 < pair[1].0);
            assert!(pair[0].1 > pair[1].1);
        }
    }
}
