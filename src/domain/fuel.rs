use log::{debug, info, warn};
use thiserror::Error;

use super::entities::{
    ConditionPoint, FuelSequenceStep, FuelTankPriority, Station, StationIndex, StationKind,
};

#[derive(Clone, Debug, PartialEq, Error)]
pub enum FuelPlanError {
    #[error("flight time must be a positive number of hours")]
    InvalidFlightTime,
    #[error("fuel burn rate must be a positive number")]
    InvalidBurnRate,
    #[error("reserve fuel cannot be negative")]
    InvalidReserve,
    #[error("no landing fuel station found to apply the fuel burn")]
    NoLandingFuelStation,
}

/// Flight time in hours, burn rate per hour, reserve in the active weight unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FuelPlan {
    pub flight_time: f64,
    pub burn_rate: f64,
    pub reserve: f64,
}

impl FuelPlan {
    pub fn new(flight_time: f64, burn_rate: f64, reserve: f64) -> Result<Self, FuelPlanError> {
        if !(flight_time.is_finite() && flight_time > 0.0) {
            return Err(FuelPlanError::InvalidFlightTime);
        }
        if !(burn_rate.is_finite() && burn_rate > 0.0) {
            return Err(FuelPlanError::InvalidBurnRate);
        }
        if !(reserve.is_finite() && reserve >= 0.0) {
            return Err(FuelPlanError::InvalidReserve);
        }
        Ok(Self {
            flight_time,
            burn_rate,
            reserve,
        })
    }

    /// Fuel consumed in flight; the reserve is a floor and is never burned.
    pub fn to_burn(&self) -> f64 {
        self.flight_time * self.burn_rate
    }

    pub fn total_needed(&self) -> f64 {
        self.to_burn() + self.reserve
    }
}

/// Tank snapshot taken from a fuel station.
#[derive(Clone, Debug, PartialEq)]
pub struct FuelTank {
    pub station_index: StationIndex,
    pub name: String,
    pub weight: f64,
}

impl From<&Station> for FuelTank {
    fn from(station: &Station) -> Self {
        Self {
            station_index: station.index,
            name: station.description.clone(),
            weight: station.weight,
        }
    }
}

/// Rebuilds the priority list for the current fuel stations.
///
/// Tanks that already have a priority keep their relative order; new tanks follow
/// in station order. Priorities are renumbered densely from 0.
pub fn init_priorities(
    stations: &[Station],
    existing: &[FuelTankPriority],
) -> Vec<FuelTankPriority> {
    let mut tanks: Vec<(usize, usize, StationIndex)> = stations
        .iter()
        .enumerate()
        .filter(|(_, s)| s.kind == StationKind::Fuel)
        .map(|(pos, station)| {
            let rank = existing
                .iter()
                .find(|p| p.station_index == station.index)
                .map(|p| p.priority)
                .unwrap_or(existing.len() + pos);
            (rank, pos, station.index)
        })
        .collect();
    tanks.sort_unstable();

    tanks
        .into_iter()
        .enumerate()
        .map(|(priority, (_, _, station_index))| FuelTankPriority {
            station_index,
            priority,
        })
        .collect()
}

/// Default order: fuel stations as they appear in the layout.
pub fn reset_priorities(stations: &[Station]) -> Vec<FuelTankPriority> {
    init_priorities(stations, &[])
}

/// Moves `dragged` into the slot currently held by `target`, then renumbers.
/// Returns false when either tank is unknown or they are the same.
pub fn move_priority(
    priorities: &mut Vec<FuelTankPriority>,
    dragged: StationIndex,
    target: StationIndex,
) -> bool {
    if dragged == target {
        return false;
    }
    let from = priorities.iter().position(|p| p.station_index == dragged);
    let to = priorities.iter().position(|p| p.station_index == target);
    let (Some(from), Some(to)) = (from, to) else {
        return false;
    };

    let item = priorities.remove(from);
    priorities.insert(to, item);
    for (priority, entry) in priorities.iter_mut().enumerate() {
        entry.priority = priority;
    }
    true
}

/// Fuel tanks with weight, in consumption order.
pub fn tanks_by_priority(stations: &[Station], priorities: &[FuelTankPriority]) -> Vec<FuelTank> {
    let mut ordered: Vec<&FuelTankPriority> = priorities.iter().collect();
    ordered.sort_by_key(|p| p.priority);
    ordered
        .into_iter()
        .filter_map(|p| stations.iter().find(|s| s.index == p.station_index))
        .filter(|s| s.kind == StationKind::Fuel && s.weight > 0.0)
        .map(FuelTank::from)
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FuelSequence {
    pub steps: Vec<FuelSequenceStep>,
    pub to_burn: f64,
    /// Burn target left unmet once every tank is empty.
    pub remaining_to_burn: f64,
    pub total_available: f64,
    pub total_needed: f64,
}

impl FuelSequence {
    /// Available fuel does not cover trip plus reserve. Reported, not fatal.
    pub fn is_short(&self) -> bool {
        self.total_available < self.total_needed
    }

    pub fn total_burned(&self) -> f64 {
        self.steps.iter().map(|s| s.fuel_burned).sum()
    }

    pub fn flight_time(&self) -> f64 {
        self.steps.last().map(|s| s.end_time).unwrap_or(0.0)
    }
}

/// Greedy linear burn-down through the tanks in the given order.
pub fn simulate(tanks: &[FuelTank], plan: &FuelPlan) -> FuelSequence {
    let total_available: f64 = tanks.iter().map(|t| t.weight).sum();
    let total_needed = plan.total_needed();
    if total_available < total_needed {
        warn!(
            "not enough fuel: available {total_available:.1}, needed {total_needed:.1}"
        );
    }

    let mut steps = Vec::new();
    let mut remaining = plan.to_burn();
    let mut elapsed = 0.0;

    for tank in tanks {
        if remaining <= 0.0 {
            break;
        }
        let burn = tank.weight.min(remaining);
        let duration = burn / plan.burn_rate;
        debug!(
            "burning {burn:.1} from station {} ({}) over {duration:.2} h",
            tank.station_index, tank.name
        );
        steps.push(FuelSequenceStep {
            tank_name: tank.name.clone(),
            start_time: elapsed,
            end_time: elapsed + duration,
            fuel_burned: burn,
            fuel_remaining: tank.weight - burn,
        });
        elapsed += duration;
        remaining -= burn;
    }

    FuelSequence {
        steps,
        to_burn: plan.to_burn(),
        remaining_to_burn: remaining.max(0.0),
        total_available,
        total_needed,
    }
}

/// Sets the landing-fuel station to the reserve. Tank-by-tank leftovers are not kept.
pub fn apply_burn(stations: &mut [Station], reserve: f64) -> Result<StationIndex, FuelPlanError> {
    let station = stations
        .iter_mut()
        .find(|s| s.kind == StationKind::LandingFuel)
        .ok_or(FuelPlanError::NoLandingFuelStation)?;
    station.weight = reserve.max(0.0);
    info!(
        "fuel burn applied; landing fuel set to {:.1} (reserves only)",
        station.weight
    );
    Ok(station.index)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CgDirection {
    Forward,
    Aft,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CgTravel {
    pub takeoff_cg: f64,
    pub landing_cg: f64,
    pub travel: f64,
    pub direction: CgDirection,
}

/// How far the CG moves between take-off and landing.
pub fn cg_travel(tow: &ConditionPoint, ldw: &ConditionPoint) -> CgTravel {
    CgTravel {
        takeoff_cg: tow.cg,
        landing_cg: ldw.cg,
        travel: (tow.cg - ldw.cg).abs(),
        direction: if tow.cg > ldw.cg {
            CgDirection::Forward
        } else {
            CgDirection::Aft
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::default_stations;
    use approx::assert_relative_eq;

    fn tank(index: StationIndex, name: &str, weight: f64) -> FuelTank {
        FuelTank {
            station_index: index,
            name: name.to_string(),
            weight,
        }
    }

    #[test]
    fn first_tank_covers_the_trip() {
        let tanks = [tank(11, "A", 200.0), tank(12, "B", 200.0)];
        let plan = FuelPlan::new(2.0, 100.0, 20.0).unwrap();
        let sequence = simulate(&tanks, &plan);

        assert_relative_eq!(sequence.to_burn, 200.0);
        assert_eq!(sequence.steps.len(), 1);
        let step = &sequence.steps[0];
        assert_eq!(step.tank_name, "A");
        assert_relative_eq!(step.fuel_burned, 200.0);
        assert_relative_eq!(step.fuel_remaining, 0.0);
        assert_relative_eq!(step.start_time, 0.0);
        assert_relative_eq!(step.end_time, 2.0);
        assert_eq!(sequence.remaining_to_burn, 0.0);
        assert!(!sequence.is_short());
    }

    #[test]
    fn burn_spills_into_next_tank() {
        let tanks = [tank(11, "A", 150.0), tank(12, "B", 200.0)];
        let plan = FuelPlan::new(2.0, 100.0, 0.0).unwrap();
        let sequence = simulate(&tanks, &plan);

        assert_eq!(sequence.steps.len(), 2);
        assert_relative_eq!(sequence.steps[0].end_time, 1.5);
        assert_relative_eq!(sequence.steps[1].start_time, 1.5);
        assert_relative_eq!(sequence.steps[1].end_time, 2.0);
        assert_relative_eq!(sequence.steps[1].fuel_burned, 50.0);
        assert_relative_eq!(sequence.steps[1].fuel_remaining, 150.0);
        assert_relative_eq!(sequence.flight_time(), 2.0);
    }

    #[test]
    fn shortfall_is_reported_not_fatal() {
        let tanks = [tank(11, "A", 100.0), tank(12, "B", 50.0)];
        let plan = FuelPlan::new(3.0, 100.0, 30.0).unwrap();
        let sequence = simulate(&tanks, &plan);

        assert!(sequence.is_short());
        assert_eq!(sequence.steps.len(), 2);
        assert_relative_eq!(sequence.total_burned(), 150.0);
        assert_relative_eq!(sequence.remaining_to_burn, 150.0);
        assert_relative_eq!(sequence.total_needed, 330.0);
    }

    #[test]
    fn burned_fuel_is_bounded_and_excludes_reserve() {
        let tanks = [tank(11, "A", 400.0), tank(12, "B", 300.0)];
        for (time, rate, reserve) in [(1.0, 100.0, 50.0), (5.0, 200.0, 0.0), (0.5, 80.0, 500.0)] {
            let plan = FuelPlan::new(time, rate, reserve).unwrap();
            let sequence = simulate(&tanks, &plan);
            let bound = (700.0_f64).min(time * rate);
            assert!(sequence.total_burned() <= bound + 1e-9);
        }
    }

    #[test]
    fn plan_validation() {
        assert_eq!(FuelPlan::new(0.0, 100.0, 0.0), Err(FuelPlanError::InvalidFlightTime));
        assert_eq!(FuelPlan::new(1.0, -5.0, 0.0), Err(FuelPlanError::InvalidBurnRate));
        assert_eq!(FuelPlan::new(1.0, 5.0, -1.0), Err(FuelPlanError::InvalidReserve));
        assert_eq!(FuelPlan::new(f64::NAN, 5.0, 0.0), Err(FuelPlanError::InvalidFlightTime));
        assert!(FuelPlan::new(1.0, 5.0, 0.0).is_ok());
    }

    #[test]
    fn priorities_follow_layout_then_keep_user_order() {
        let stations = default_stations();
        let mut priorities = reset_priorities(&stations);
        assert_eq!(
            priorities,
            vec![
                FuelTankPriority { station_index: 11, priority: 0 },
                FuelTankPriority { station_index: 12, priority: 1 },
            ]
        );

        assert!(move_priority(&mut priorities, 12, 11));
        assert_eq!(priorities[0].station_index, 12);
        assert_eq!(priorities[0].priority, 0);
        assert_eq!(priorities[1].priority, 1);

        let again = init_priorities(&stations, &priorities);
        assert_eq!(again, priorities);

        assert!(!move_priority(&mut priorities, 12, 12));
        assert!(!move_priority(&mut priorities, 12, 99));
    }

    #[test]
    fn empty_tanks_are_skipped() {
        let mut stations = default_stations();
        stations[11].weight = 300.0;
        let priorities = reset_priorities(&stations);
        let tanks = tanks_by_priority(&stations, &priorities);
        assert_eq!(tanks.len(), 1);
        assert_eq!(tanks[0].station_index, 12);
        assert_eq!(tanks[0].name, "Fuel Tank OutBoard");
    }

    #[test]
    fn apply_burn_sets_landing_fuel_to_reserve() {
        let mut stations = default_stations();
        stations[12].weight = 900.0;
        assert_eq!(apply_burn(&mut stations, 250.0), Ok(13));
        assert_relative_eq!(stations[12].weight, 250.0);

        let mut no_landing: Vec<Station> = default_stations().into_iter().take(12).collect();
        assert_eq!(
            apply_burn(&mut no_landing, 250.0),
            Err(FuelPlanError::NoLandingFuelStation)
        );
    }

    #[test]
    fn cg_travel_direction() {
        let tow = ConditionPoint { cg: 240.0, ..ConditionPoint::default() };
        let ldw = ConditionPoint { cg: 238.5, ..ConditionPoint::default() };
        let travel = cg_travel(&tow, &ldw);
        assert_relative_eq!(travel.travel, 1.5);
        assert_eq!(travel.direction, CgDirection::Forward);
        assert_eq!(cg_travel(&ldw, &tow).direction, CgDirection::Aft);
    }
}
