use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use super::balance::{compute_conditions, station_totals, StationTotals};
use super::entities::{
    default_stations, Conditions, FuelTankPriority, MacConfig, Station, StationIndex,
    UnitSystem, IN_TO_M, LB_TO_KG,
};
use super::envelope::{project, EnvelopeScene, PlotArea, ViewMode};
use super::formula::{self, FormulaError};
use super::fuel::{self, FuelPlan, FuelPlanError, FuelSequence};
use super::limits::{
    check_overall, check_station_weight, validate_limits, ConfigError, LimitReport, WeightWarning,
};
use super::profile::AircraftProfile;
use crate::util::generate_id;

/// Stations the user may rename, with the names they reset to.
pub const CUSTOM_NAME_SLOTS: [(StationIndex, &str); 3] =
    [(8, "Cargo"), (9, "Other"), (10, "Other")];

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StationError {
    #[error("station {0} does not exist")]
    Unknown(StationIndex),
    #[error("station {0} cannot be renamed")]
    NotRenamable(StationIndex),
    #[error("station name cannot be empty")]
    EmptyName,
}

/// A named calculation kept for the session, chart included.
#[derive(Clone, Debug, PartialEq)]
pub struct SavedCalculation {
    pub id: String,
    pub name: String,
    pub timestamp: OffsetDateTime,
    pub unit: UnitSystem,
    pub mac: MacConfig,
    pub stations: Vec<Station>,
    pub conditions: Conditions,
    /// Rendered at save time; never regenerated.
    pub scene: EnvelopeScene,
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub stations: Vec<Station>,
    pub mac: MacConfig,
    pub unit: UnitSystem,
    pub view_mode: ViewMode,
    pub show_flight_path: bool,
    pub fuel_priorities: Vec<FuelTankPriority>,
    pub history: Vec<SavedCalculation>,
    /// Name of the profile or template the stations came from.
    pub loaded_from: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        let stations = default_stations();
        let fuel_priorities = fuel::reset_priorities(&stations);
        Self {
            stations,
            mac: MacConfig::default(),
            unit: UnitSystem::default(),
            view_mode: ViewMode::default(),
            show_flight_path: true,
            fuel_priorities,
            history: Vec::new(),
            loaded_from: None,
        }
    }
}

impl AppState {
    pub fn station(&self, index: StationIndex) -> Result<&Station, StationError> {
        self.stations
            .iter()
            .find(|s| s.index == index)
            .ok_or(StationError::Unknown(index))
    }

    fn station_mut(&mut self, index: StationIndex) -> Result<&mut Station, StationError> {
        self.stations
            .iter_mut()
            .find(|s| s.index == index)
            .ok_or(StationError::Unknown(index))
    }

    /// Stores the weight even when it warrants a warning.
    pub fn set_weight(
        &mut self,
        index: StationIndex,
        weight: f64,
    ) -> Result<Option<WeightWarning>, StationError> {
        self.station_mut(index)?.weight = weight;
        let warning = check_station_weight(index, weight);
        if let Some(warning) = &warning {
            warn!("{warning}");
        }
        Ok(warning)
    }

    pub fn set_arm(&mut self, index: StationIndex, arm: f64) -> Result<(), StationError> {
        self.station_mut(index)?.arm = arm;
        Ok(())
    }

    pub fn clear_weights(&mut self) {
        for station in &mut self.stations {
            station.weight = 0.0;
        }
    }

    pub fn rename_station(&mut self, index: StationIndex, name: &str) -> Result<(), StationError> {
        if !CUSTOM_NAME_SLOTS.iter().any(|(slot, _)| *slot == index) {
            return Err(StationError::NotRenamable(index));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(StationError::EmptyName);
        }
        self.station_mut(index)?.description = name.to_string();
        Ok(())
    }

    pub fn reset_station_names(&mut self) {
        for (slot, default) in CUSTOM_NAME_SLOTS {
            if let Ok(station) = self.station_mut(slot) {
                station.description = default.to_string();
            }
        }
    }

    /// Converts every weight and arm in place. Returns false when already in `unit`.
    pub fn set_unit(&mut self, unit: UnitSystem) -> bool {
        if self.unit == unit {
            return false;
        }
        let (weight_factor, arm_factor) = match unit {
            UnitSystem::Metric => (LB_TO_KG, IN_TO_M),
            UnitSystem::Imperial => (1.0 / LB_TO_KG, 1.0 / IN_TO_M),
        };
        for station in &mut self.stations {
            station.weight *= weight_factor;
            station.arm *= arm_factor;
        }
        self.unit = unit;
        info!("switched to {:?} units", unit);
        true
    }

    /// Adopts `text` when it passes validation and returns its value at the test CG.
    /// On error the active formula is left untouched.
    pub fn apply_formula(&mut self, text: &str) -> Result<f64, FormulaError> {
        let parsed = formula::validate(text)?;
        let test_value = parsed.evaluate(formula::FORMULA_TEST_CG)?;
        self.mac.formula = parsed.source().to_string();
        Ok(test_value)
    }

    pub fn set_mac_limits(&mut self, min: f64, max: f64) -> Result<(), ConfigError> {
        validate_limits(min, max)?;
        self.mac.mac_min = min;
        self.mac.mac_max = max;
        Ok(())
    }

    pub fn reset_mac_defaults(&mut self) {
        self.mac = MacConfig::default();
    }

    pub fn totals(&self) -> StationTotals {
        station_totals(&self.stations)
    }

    pub fn conditions(&self) -> Conditions {
        compute_conditions(&self.stations, &self.mac, self.unit)
    }

    pub fn limit_report(&self) -> LimitReport {
        check_overall(self.totals().total.weight, &self.conditions(), &self.mac)
    }

    pub fn envelope(&self, area: PlotArea) -> EnvelopeScene {
        project(
            &self.conditions(),
            &self.mac,
            self.unit,
            self.view_mode,
            area,
            self.show_flight_path,
        )
    }

    /// Replaces the whole aircraft. Fuel priorities restart from station order.
    pub fn load_aircraft(
        &mut self,
        source: impl Into<String>,
        mac: MacConfig,
        stations: Vec<Station>,
        unit: UnitSystem,
    ) {
        self.mac = mac;
        self.stations = stations;
        self.unit = unit;
        self.fuel_priorities = fuel::reset_priorities(&self.stations);
        self.loaded_from = Some(source.into());
    }

    pub fn snapshot_profile(
        &self,
        name: &str,
        description: &str,
        timestamp: OffsetDateTime,
    ) -> AircraftProfile {
        AircraftProfile {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            mac_config: self.mac.clone(),
            stations: self.stations.clone(),
            unit: self.unit,
            timestamp,
        }
    }

    /// Adopts a stored profile. A stored formula that no longer validates is skipped
    /// and the current one kept; the error is returned for reporting.
    pub fn load_profile(&mut self, profile: &AircraftProfile) -> Option<FormulaError> {
        let mut mac = profile.mac_config.clone();
        let rejected = match formula::validate(&mac.formula) {
            Ok(_) => None,
            Err(err) => {
                warn!(
                    "profile {:?} has an invalid formula, keeping {:?}: {err}",
                    profile.name, self.mac.formula
                );
                mac.formula = self.mac.formula.clone();
                Some(err)
            }
        };
        self.load_aircraft(profile.name.clone(), mac, profile.stations.clone(), profile.unit);
        rejected
    }

    pub fn refresh_fuel_priorities(&mut self) {
        self.fuel_priorities = fuel::init_priorities(&self.stations, &self.fuel_priorities);
    }

    pub fn reset_fuel_priorities(&mut self) {
        self.fuel_priorities = fuel::reset_priorities(&self.stations);
    }

    pub fn move_fuel_priority(&mut self, dragged: StationIndex, target: StationIndex) -> bool {
        self.refresh_fuel_priorities();
        fuel::move_priority(&mut self.fuel_priorities, dragged, target)
    }

    pub fn simulate_fuel(&mut self, plan: &FuelPlan) -> FuelSequence {
        self.refresh_fuel_priorities();
        let tanks = fuel::tanks_by_priority(&self.stations, &self.fuel_priorities);
        fuel::simulate(&tanks, plan)
    }

    pub fn apply_fuel_burn(&mut self, plan: &FuelPlan) -> Result<StationIndex, FuelPlanError> {
        fuel::apply_burn(&mut self.stations, plan.reserve)
    }

    pub fn save_calculation(
        &mut self,
        name: &str,
        area: PlotArea,
        timestamp: OffsetDateTime,
    ) -> &SavedCalculation {
        let name = match name.trim() {
            "" => format!("Calculation {}", self.history.len() + 1),
            name => name.to_string(),
        };
        let calculation = SavedCalculation {
            id: generate_id("calc"),
            name,
            timestamp,
            unit: self.unit,
            mac: self.mac.clone(),
            stations: self.stations.clone(),
            conditions: self.conditions(),
            scene: self.envelope(area),
        };
        self.history.push(calculation);
        &self.history[self.history.len() - 1]
    }

    /// Applies stored weights by station number; unknown numbers are ignored.
    /// Stored weights are pounds and are converted into the active unit.
    pub fn apply_persisted(&mut self, weights: &[WeightEntry], names: Option<&CustomStationNames>) {
        let unit = self.unit;
        for entry in weights {
            if let Ok(station) = self.station_mut(entry.station_number) {
                station.weight = unit.from_pounds(entry.weight);
            }
        }
        if let Some(names) = names {
            for (slot, name) in names.entries() {
                if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
                    if let Ok(station) = self.station_mut(slot) {
                        station.description = name.to_string();
                    }
                }
            }
        }
    }

    /// Weights as stored: always pounds, whatever unit is displayed.
    pub fn to_persisted(&self) -> Vec<WeightEntry> {
        self.stations
            .iter()
            .map(|s| WeightEntry {
                station_number: s.index,
                weight: self.unit.to_pounds(s.weight),
                description: s.description.clone(),
            })
            .collect()
    }

    pub fn custom_station_names(&self) -> CustomStationNames {
        let name = |slot| self.station(slot).ok().map(|s| s.description.clone());
        CustomStationNames {
            station8: name(8),
            station9: name(9),
            station10: name(10),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    pub station_number: StationIndex,
    pub weight: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomStationNames {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station8: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station9: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station10: Option<String>,
}

impl CustomStationNames {
    fn entries(&self) -> [(StationIndex, Option<&str>); 3] {
        [
            (8, self.station8.as_deref()),
            (9, self.station9.as_deref()),
            (10, self.station10.as_deref()),
        ]
    }
}
