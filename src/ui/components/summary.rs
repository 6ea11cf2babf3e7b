use std::fmt::Write;

use crate::domain::{
    limits, CgDirection, CgTravel, Conditions, LimitReport, MacConfig, UnitSystem,
};

pub fn status_label(within_limits: bool) -> &'static str {
    if within_limits {
        "WITHIN LIMITS"
    } else {
        "OUT OF LIMITS"
    }
}

/// ZFW/TOW/LDW block with a pass/fail badge per condition.
pub fn render_conditions(conditions: &Conditions, mac: &MacConfig, unit: UnitSystem) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "%MAC limits {:.2}% – {:.2}%   formula: {}",
        mac.mac_min, mac.mac_max, mac.formula
    );
    for (condition, point) in conditions.iter() {
        let verdict = limits::evaluate(point, mac);
        let _ = writeln!(
            out,
            "{:<3} {:>10.1} {}  CG {:>8.3} {}  {:>7.2}% MAC  {}",
            condition.code(),
            point.weight,
            unit.weight_unit(),
            point.cg,
            unit.length_unit(),
            point.mac_percent,
            status_label(verdict.within_limits),
        );
    }
    out
}

/// The advisory line, or nothing when there is nothing loaded.
pub fn render_report(report: &LimitReport) -> Option<String> {
    report.summary()
}

pub fn render_cg_travel(travel: &CgTravel, unit: UnitSystem) -> String {
    let direction = match travel.direction {
        CgDirection::Forward => "Forward",
        CgDirection::Aft => "Aft",
    };
    format!(
        "CG travel {:.3} {} {direction} (take-off {:.3}, landing {:.3})",
        travel.travel,
        unit.length_unit(),
        travel.takeoff_cg,
        travel.landing_cg,
    )
}
