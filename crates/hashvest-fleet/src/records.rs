//! Persisted record types

use chrono::{DateTime, Utc};
use hashvest_engine::params::RawParams;
use serde::{Deserialize, Serialize};

/// Online/offline status of a miner group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinerStatus {
    Online,
    Offline,
}

impl Default for MinerStatus {
    fn default() -> Self {
        Self::Online
    }
}

/// A group of identical miners tracked as one fleet entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MinerGroup {
    pub id: String,
    pub model: String,
    /// Per-unit hashrate in TH/s
    pub hashrate_ths: f64,
    /// Per-unit power draw in kW
    pub power_kw: f64,
    /// Per-unit purchase cost in USD
    pub cost: f64,
    pub quantity: u32,
    #[serde(default)]
    pub status: MinerStatus,
    pub added: DateTime<Utc>,
}

/// Default economic assumptions attached to the fleet
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EconomicDefaults {
    /// $/kWh
    #[serde(default = "default_elec_cost")]
    pub elec_cost: f64,
    /// Percent
    #[serde(default = "default_pool_fee")]
    pub pool_fee: f64,
    /// Percent
    #[serde(default = "default_uptime")]
    pub uptime: f64,
}

fn default_elec_cost() -> f64 {
    0.07
}

fn default_pool_fee() -> f64 {
    2.0
}

fn default_uptime() -> f64 {
    100.0
}

impl Default for EconomicDefaults {
    fn default() -> Self {
        Self {
            elec_cost: default_elec_cost(),
            pool_fee: default_pool_fee(),
            uptime: default_uptime(),
        }
    }
}

/// The persisted fleet: miner groups plus default assumptions
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FleetRecord {
    #[serde(default = "fleet_version")]
    pub version: u32,
    #[serde(default)]
    pub miners: Vec<MinerGroup>,
    #[serde(default)]
    pub defaults: EconomicDefaults,
}

fn fleet_version() -> u32 {
    1
}

impl Default for FleetRecord {
    fn default() -> Self {
        Self {
            version: fleet_version(),
            miners: Vec::new(),
            defaults: EconomicDefaults::default(),
        }
    }
}

/// Aggregated view of the fleet
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FleetSummary {
    /// Combined hashrate of online units, TH/s
    pub total_hashrate_ths: f64,
    /// Combined power of online units, kW
    pub total_power_kw: f64,
    pub online_units: u32,
    pub offline_units: u32,
    pub total_units: u32,
    /// W/TH over online units; 0 with no hashrate
    pub efficiency_w_per_th: f64,
    /// Purchase cost across all groups
    pub total_cost: f64,
    pub avg_cost: f64,
    pub defaults: EconomicDefaults,
}

impl FleetSummary {
    /// Pre-fill calculator inputs from the fleet, the way the
    /// "use fleet data" toggle does. No-op for an empty fleet.
    pub fn apply_to(&self, raw: &mut RawParams) {
        if self.total_units == 0 {
            return;
        }
        let avg_hashrate = self.total_hashrate_ths / self.total_units as f64;
        let avg_power = self.total_power_kw / self.total_units as f64;
        raw.unit_hashrate_ths = Some(format!("{:.1}", avg_hashrate));
        raw.unit_power_kw = Some(format!("{:.2}", avg_power));
        raw.unit_capex = Some(format!("{}", self.avg_cost.round()));
        raw.unit_count = Some(self.total_units.to_string());
        raw.elec_cost = Some(self.defaults.elec_cost.to_string());
        raw.pool_fee_pct = Some(self.defaults.pool_fee.to_string());
        raw.uptime_pct = Some(self.defaults.uptime.to_string());
    }
}

/// Last-used calculator inputs, persisted verbatim as entered
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalculatorSettings {
    #[serde(default = "calculator_version")]
    pub version: u32,
    #[serde(flatten)]
    pub inputs: RawParams,
}

fn calculator_version() -> u32 {
    2
}

impl Default for CalculatorSettings {
    fn default() -> Self {
        Self {
            version: calculator_version(),
            inputs: RawParams::default(),
        }
    }
}

/// Mining-pool account linkage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Proxy endpoint base URL
    #[serde(default)]
    pub endpoint: String,
    /// Pool account name
    #[serde(default)]
    pub account: String,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            account: String::new(),
        }
    }
}

/// App-level settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "settings_version")]
    pub version: u32,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub use_fleet_data: bool,
}

fn settings_version() -> u32 {
    1
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: settings_version(),
            pool: PoolSettings::default(),
            use_fleet_data: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let d = EconomicDefaults::default();
        assert_eq!(d.elec_cost, 0.07);
        assert_eq!(d.pool_fee, 2.0);
        assert_eq!(d.uptime, 100.0);
        assert_eq!(FleetRecord::default().version, 1);
        assert_eq!(CalculatorSettings::default().version, 2);
    }

    #[test]
    fn test_unknown_fields_ignored_on_load() {
        // older/newer records deserialize without migration logic
        let json = r#"{"version": 1, "miners": [], "legacy_field": true}"#;
        let record: FleetRecord = serde_json::from_str(json).unwrap();
        assert!(record.miners.is_empty());
        assert_eq!(record.defaults.pool_fee, 2.0);
    }

    #[test]
    fn test_apply_to_prefills_inputs() {
        let summary = FleetSummary {
            total_hashrate_ths: 1_004.0,
            total_power_kw: 16.08,
            online_units: 3,
            offline_units: 1,
            total_units: 4,
            efficiency_w_per_th: 16.0,
            total_cost: 52_000.0,
            avg_cost: 13_000.0,
            defaults: EconomicDefaults::default(),
        };
        let mut raw = RawParams::default();
        summary.apply_to(&mut raw);
        assert_eq!(raw.unit_hashrate_ths.as_deref(), Some("251.0"));
        assert_eq!(raw.unit_count.as_deref(), Some("4"));
        assert_eq!(raw.unit_capex.as_deref(), Some("13000"));
        assert_eq!(raw.elec_cost.as_deref(), Some("0.07"));
    }

    #[test]
    fn test_apply_to_empty_fleet_is_noop() {
        let summary = FleetSummary {
            total_hashrate_ths: 0.0,
            total_power_kw: 0.0,
            online_units: 0,
            offline_units: 0,
            total_units: 0,
            efficiency_w_per_th: 0.0,
            total_cost: 0.0,
            avg_cost: 0.0,
            defaults: EconomicDefaults::default(),
        };
        let mut raw = RawParams::default();
        summary.apply_to(&mut raw);
        assert!(raw.unit_count.is_none());
    }
}
