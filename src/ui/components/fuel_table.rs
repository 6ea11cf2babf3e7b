use std::fmt::Write;

use crate::domain::{FuelSequence, FuelTankPriority, Station, UnitSystem};

pub fn render_priorities(priorities: &[FuelTankPriority], stations: &[Station]) -> String {
    let mut out = String::new();
    let mut ordered: Vec<&FuelTankPriority> = priorities.iter().collect();
    ordered.sort_by_key(|p| p.priority);
    for entry in ordered {
        let Some(station) = stations.iter().find(|s| s.index == entry.station_index) else {
            continue;
        };
        let _ = writeln!(
            out,
            "{}. [{}] {} ({:.1})",
            entry.priority + 1,
            station.index,
            station.description,
            station.weight
        );
    }
    out
}

/// Burn schedule, one row per tank, then the totals.
pub fn render_sequence(sequence: &FuelSequence, unit: UnitSystem) -> String {
    let w = unit.weight_unit();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:>8} {:>8} {:>12} {:>12}",
        "Tank",
        "Start h",
        "End h",
        format!("Burned {w}"),
        format!("Left {w}"),
    );
    for step in &sequence.steps {
        let _ = writeln!(
            out,
            "{:<24} {:>8.2} {:>8.2} {:>12.1} {:>12.1}",
            step.tank_name, step.start_time, step.end_time, step.fuel_burned, step.fuel_remaining
        );
    }
    let _ = writeln!(
        out,
        "Trip fuel {:.1} {w}, available {:.1} {w}, needed with reserve {:.1} {w}",
        sequence.to_burn, sequence.total_available, sequence.total_needed
    );
    let _ = writeln!(
        out,
        "Burned {:.1} {w} over {:.2} h",
        sequence.total_burned(),
        sequence.flight_time()
    );
    if sequence.remaining_to_burn > 0.0 {
        let _ = writeln!(
            out,
            "Tanks run dry with {:.1} {w} of trip fuel unburned",
            sequence.remaining_to_burn
        );
    }
    if sequence.is_short() {
        let _ = writeln!(
            out,
            "Insufficient fuel: short by {:.1} {w}",
            sequence.total_needed - sequence.total_available
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::default_stations,
        fuel::{simulate, FuelTank},
        FuelPlan,
    };

    #[test]
    fn shortfall_is_printed() {
        let tanks = [FuelTank {
            station_index: 11,
            name: "Fuel Tank InBoard".to_string(),
            weight: 100.0,
        }];
        let sequence = simulate(&tanks, &FuelPlan::new(2.0, 100.0, 50.0).unwrap());
        let text = render_sequence(&sequence, UnitSystem::Imperial);
        assert!(text.contains("Fuel Tank InBoard"));
        assert!(text.contains("Burned 100.0 lb over 1.00 h"));
        assert!(text.contains("Tanks run dry with 100.0 lb of trip fuel unburned"));
        assert!(text.contains("Insufficient fuel: short by 150.0 lb"));
    }

    #[test]
    fn priorities_in_order() {
        let stations = default_stations();
        let priorities = vec![
            FuelTankPriority { station_index: 12, priority: 0 },
            FuelTankPriority { station_index: 11, priority: 1 },
        ];
        let text = render_priorities(&priorities, &stations);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["1. [12] Fuel Tank OutBoard (0.0)", "2. [11] Fuel Tank InBoard (0.0)"]);
    }
}
