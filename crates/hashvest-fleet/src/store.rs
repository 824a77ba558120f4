//! JSON file store for fleet and settings records
//!
//! The in-memory state sits behind a `parking_lot::RwLock`; every mutation
//! writes straight through to disk. Loads fall back to the default record
//! when the file is missing or unreadable.

use crate::records::{
    AppSettings, CalculatorSettings, FleetRecord, FleetSummary, MinerGroup, MinerStatus,
};
use crate::{FleetError, Result};
use chrono::Utc;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const FLEET_FILE: &str = "fleet.json";
const CALCULATOR_FILE: &str = "calculator.json";
const SETTINGS_FILE: &str = "settings.json";

/// File-backed fleet and settings store
pub struct FleetStore {
    data_dir: PathBuf,
    fleet: RwLock<FleetRecord>,
}

impl FleetStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed
    /// and loading the existing fleet record when present.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        let fleet = load_or_default(&data_dir.join(FLEET_FILE));
        Ok(Self {
            data_dir,
            fleet: RwLock::new(fleet),
        })
    }

    /// Current fleet record
    pub fn fleet(&self) -> FleetRecord {
        self.fleet.read().clone()
    }

    /// Add a miner group, assigning it a fresh id
    pub fn add_miner(&self, mut group: MinerGroup) -> Result<MinerGroup> {
        group.id = Uuid::new_v4().to_string();
        group.added = Utc::now();
        group.quantity = group.quantity.max(1);
        let mut fleet = self.fleet.write();
        fleet.miners.push(group.clone());
        self.persist_fleet(&fleet)?;
        Ok(group)
    }

    /// Update an existing group in place
    pub fn update_miner(&self, id: &str, update: impl FnOnce(&mut MinerGroup)) -> Result<()> {
        let mut fleet = self.fleet.write();
        let group = fleet
            .miners
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| FleetError::GroupNotFound(id.to_string()))?;
        update(group);
        self.persist_fleet(&fleet)
    }

    /// Remove a whole group
    pub fn remove_miner(&self, id: &str) -> Result<()> {
        let mut fleet = self.fleet.write();
        let before = fleet.miners.len();
        fleet.miners.retain(|m| m.id != id);
        if fleet.miners.len() == before {
            return Err(FleetError::GroupNotFound(id.to_string()));
        }
        self.persist_fleet(&fleet)
    }

    /// Drop one unit from a group, removing the group at zero
    pub fn reduce_quantity(&self, id: &str) -> Result<()> {
        let mut fleet = self.fleet.write();
        let Some(idx) = fleet.miners.iter().position(|m| m.id == id) else {
            return Err(FleetError::GroupNotFound(id.to_string()));
        };
        fleet.miners[idx].quantity = fleet.miners[idx].quantity.saturating_sub(1);
        if fleet.miners[idx].quantity == 0 {
            fleet.miners.remove(idx);
        }
        self.persist_fleet(&fleet)
    }

    /// Aggregate the current fleet. Only online units count toward
    /// hashrate and power; all units count toward quantity and cost.
    pub fn summary(&self) -> FleetSummary {
        let fleet = self.fleet.read();
        let mut total_hashrate = 0.0;
        let mut total_power = 0.0;
        let mut online = 0u32;
        let mut offline = 0u32;
        let mut total_units = 0u32;
        let mut total_cost = 0.0;

        for group in &fleet.miners {
            total_units += group.quantity;
            total_cost += group.cost * group.quantity as f64;
            match group.status {
                MinerStatus::Online => {
                    online += group.quantity;
                    total_hashrate += group.hashrate_ths * group.quantity as f64;
                    total_power += group.power_kw * group.quantity as f64;
                }
                MinerStatus::Offline => offline += group.quantity,
            }
        }

        let efficiency = if total_hashrate > 0.0 {
            total_power * 1000.0 / total_hashrate
        } else {
            0.0
        };
        let avg_cost = if total_units > 0 {
            total_cost / total_units as f64
        } else {
            0.0
        };

        FleetSummary {
            total_hashrate_ths: total_hashrate,
            total_power_kw: total_power,
            online_units: online,
            offline_units: offline,
            total_units,
            efficiency_w_per_th: efficiency,
            total_cost,
            avg_cost,
            defaults: fleet.defaults,
        }
    }

    /// A representative fleet shown before any real miners are added
    pub fn sample_fleet() -> Vec<MinerGroup> {
        let now = Utc::now();
        vec![
            MinerGroup {
                id: "sample-1".to_string(),
                model: "Antminer S21 XP Hyd.".to_string(),
                hashrate_ths: 335.0,
                power_kw: 5.36,
                cost: 15_000.0,
                quantity: 3,
                status: MinerStatus::Online,
                added: now,
            },
            MinerGroup {
                id: "sample-2".to_string(),
                model: "Antminer S21".to_string(),
                hashrate_ths: 200.0,
                power_kw: 3.55,
                cost: 8_000.0,
                quantity: 2,
                status: MinerStatus::Online,
                added: now,
            },
            MinerGroup {
                id: "sample-3".to_string(),
                model: "WhatsMiner M60S".to_string(),
                hashrate_ths: 186.0,
                power_kw: 3.44,
                cost: 6_000.0,
                quantity: 1,
                status: MinerStatus::Offline,
                added: now,
            },
        ]
    }

    /// The fleet record holds no real miners yet
    pub fn is_empty(&self) -> bool {
        self.fleet.read().miners.is_empty()
    }

    /// Last-used calculator inputs
    pub fn calculator_settings(&self) -> CalculatorSettings {
        load_or_default(&self.data_dir.join(CALCULATOR_FILE))
    }

    pub fn save_calculator_settings(&self, settings: &CalculatorSettings) -> Result<()> {
        self.write_json(CALCULATOR_FILE, settings)
    }

    /// App settings (pool linkage, use-fleet-data flag)
    pub fn app_settings(&self) -> AppSettings {
        load_or_default(&self.data_dir.join(SETTINGS_FILE))
    }

    pub fn save_app_settings(&self, settings: &AppSettings) -> Result<()> {
        self.write_json(SETTINGS_FILE, settings)
    }

    fn persist_fleet(&self, fleet: &FleetRecord) -> Result<()> {
        self.write_json(FLEET_FILE, fleet)
    }

    fn write_json<T: serde::Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.data_dir.join(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        Ok(())
    }
}

/// Read a record, degrading to the default on any failure
fn load_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> T {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable record, using defaults");
                T::default()
            }
        },
        Err(_) => T::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn group(model: &str, hashrate: f64, power: f64, cost: f64, qty: u32) -> MinerGroup {
        MinerGroup {
            id: String::new(),
            model: model.to_string(),
            hashrate_ths: hashrate,
            power_kw: power,
            cost,
            quantity: qty,
            status: MinerStatus::Online,
            added: Utc::now(),
        }
    }

    #[test]
    fn test_add_and_reload_round_trip() {
        let dir = tempdir().unwrap();
        let store = FleetStore::open(dir.path()).unwrap();
        let added = store
            .add_miner(group("Antminer S21", 200.0, 3.55, 8_000.0, 2))
            .unwrap();
        assert!(!added.id.is_empty());

        // a second store over the same dir sees the persisted record
        let reloaded = FleetStore::open(dir.path()).unwrap();
        let fleet = reloaded.fleet();
        assert_eq!(fleet.miners.len(), 1);
        assert_eq!(fleet.miners[0].model, "Antminer S21");
        assert_eq!(fleet.miners[0].quantity, 2);
    }

    #[test]
    fn test_summary_counts_only_online_hashrate() {
        let dir = tempdir().unwrap();
        let store = FleetStore::open(dir.path()).unwrap();
        store
            .add_miner(group("A", 100.0, 2.0, 5_000.0, 2))
            .unwrap();
        let off = store.add_miner(group("B", 50.0, 1.0, 1_000.0, 1)).unwrap();
        store
            .update_miner(&off.id, |m| m.status = MinerStatus::Offline)
            .unwrap();

        let summary = store.summary();
        assert_eq!(summary.total_units, 3);
        assert_eq!(summary.online_units, 2);
        assert_eq!(summary.offline_units, 1);
        assert_eq!(summary.total_hashrate_ths, 200.0);
        assert_eq!(summary.total_power_kw, 4.0);
        // cost still counts every unit
        assert_eq!(summary.total_cost, 11_000.0);
        assert_eq!(summary.efficiency_w_per_th, 20.0);
    }

    #[test]
    fn test_reduce_quantity_drops_group_at_zero() {
        let dir = tempdir().unwrap();
        let store = FleetStore::open(dir.path()).unwrap();
        let g = store.add_miner(group("A", 100.0, 2.0, 5_000.0, 2)).unwrap();
        store.reduce_quantity(&g.id).unwrap();
        assert_eq!(store.fleet().miners[0].quantity, 1);
        store.reduce_quantity(&g.id).unwrap();
        assert!(store.fleet().miners.is_empty());
    }

    #[test]
    fn test_remove_unknown_group_errors() {
        let dir = tempdir().unwrap();
        let store = FleetStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.remove_miner("nope"),
            Err(FleetError::GroupNotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_file_degrades_to_default() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(FLEET_FILE), "{ not json").unwrap();
        let store = FleetStore::open(dir.path()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.fleet().defaults.pool_fee, 2.0);
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = tempdir().unwrap();
        let store = FleetStore::open(dir.path()).unwrap();

        let mut settings = store.calculator_settings();
        settings.inputs.btc_price = Some("105000".to_string());
        settings.inputs.reinvest = Some(true);
        store.save_calculator_settings(&settings).unwrap();

        let loaded = store.calculator_settings();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.inputs.btc_price.as_deref(), Some("105000"));
        assert_eq!(loaded.inputs.reinvest, Some(true));

        let mut app = store.app_settings();
        app.use_fleet_data = true;
        app.pool.account = "ionmining".to_string();
        store.save_app_settings(&app).unwrap();
        let app = store.app_settings();
        assert!(app.use_fleet_data);
        assert_eq!(app.pool.account, "ionmining");
    }
}
