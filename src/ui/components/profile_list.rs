use std::fmt::Write;

use time::format_description::well_known::Rfc3339;

use crate::domain::{AircraftProfile, SavedCalculation};
use crate::util::assets::AircraftTemplate;

pub fn render_profiles<'a>(profiles: impl IntoIterator<Item = &'a AircraftProfile>) -> String {
    let mut out = String::new();
    for profile in profiles {
        let saved = profile.timestamp.format(&Rfc3339).unwrap_or_default();
        let _ = write!(
            out,
            "{}  [{} stations, {}, saved {saved}]",
            profile.name,
            profile.stations.len(),
            profile.unit.weight_unit(),
        );
        if !profile.description.is_empty() {
            let _ = write!(out, " - {}", profile.description);
        }
        out.push('\n');
    }
    if out.is_empty() {
        out.push_str("No saved profiles.\n");
    }
    out
}

pub fn render_templates(templates: &[AircraftTemplate]) -> String {
    let mut out = String::new();
    for template in templates {
        let _ = writeln!(out, "{:<10} {} - {}", template.key, template.name, template.description);
    }
    out
}

/// One line per saved calculation, as it stood when it was saved.
pub fn render_history(history: &[SavedCalculation]) -> String {
    let mut out = String::new();
    for calc in history {
        let saved = calc.timestamp.format(&Rfc3339).unwrap_or_default();
        let outside = calc.scene.points.iter().filter(|p| !p.within_limits).count();
        let _ = write!(
            out,
            "{}  {}  [{saved}, {} stations, limits {}-{}%]",
            calc.id,
            calc.name,
            calc.stations.len(),
            calc.mac.mac_min,
            calc.mac.mac_max,
        );
        let _ = writeln!(
            out,
            "  TOW {:.1} {} @ {:.2}% MAC, {outside} outside limits",
            calc.conditions.tow.weight,
            calc.unit.weight_unit(),
            calc.conditions.tow.mac_percent,
        );
    }
    out
}
