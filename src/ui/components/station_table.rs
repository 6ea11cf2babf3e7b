use std::fmt::Write;

use crate::domain::{balance::Totals, Station, StationTotals, UnitSystem};

/// The loading schedule: one row per station plus the totals footer.
pub fn render(stations: &[Station], totals: &StationTotals, unit: UnitSystem) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<24} {:<13} {:>10} {:>12} {:>18}",
        "#",
        "Station",
        "Type",
        format!("Arm ({})", unit.length_unit()),
        format!("Weight ({})", unit.weight_unit()),
        format!("Moment/100 ({})", unit.moment_unit()),
    );
    for station in stations {
        let _ = writeln!(
            out,
            "{:>3}  {:<24} {:<13} {:>10.2} {:>12.1} {:>18.2}",
            station.index,
            truncate(&station.description, 24),
            station.kind.label(),
            station.arm,
            station.weight,
            station.displayed_moment(),
        );
    }
    footer_row(&mut out, "Total (excl. landing fuel)", &totals.total);
    footer_row(&mut out, "Fuel", &totals.fuel);
    out
}

fn footer_row(out: &mut String, label: &str, totals: &Totals) {
    let _ = writeln!(
        out,
        "     {:<38} {:>10.2} {:>12.1} {:>18.2}",
        label,
        totals.arm(),
        totals.weight,
        totals.moment / crate::domain::entities::MOMENT_DIVISOR,
    );
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width - 1).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{balance::station_totals, entities::default_stations};

    #[test]
    fn table_lists_every_station_and_totals() {
        let mut stations = default_stations();
        stations[0].weight = 40_000.0;
        let text = render(&stations, &station_totals(&stations), UnitSystem::Imperial);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 13 + 2);
        assert!(lines[0].contains("Arm (in)"));
        assert!(lines[0].ends_with("Moment/100 (lb·in)"));
        assert!(lines[1].contains("Basic Aircraft"));
        assert!(lines[1].contains("94640.00"));
        assert!(lines[14].starts_with("     Total (excl. landing fuel)"));
    }

    #[test]
    fn metric_header_names_metric_units() {
        let stations = default_stations();
        let text = render(&stations, &station_totals(&stations), UnitSystem::Metric);
        let header = text.lines().next().unwrap();
        assert!(header.contains("Weight (kg)"));
        assert!(header.ends_with("Moment/100 (kg·m)"));
    }

    #[test]
    fn long_names_are_cut() {
        assert_eq!(truncate("Emergency Equipment", 24), "Emergency Equipment");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
