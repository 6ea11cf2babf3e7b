use log::warn;

use super::entities::{
    to_formula_basis, ConditionPoint, Conditions, MacConfig, Station, StationKind, UnitSystem,
};
use super::formula::Formula;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Totals {
    pub weight: f64,
    pub moment: f64,
}

impl Totals {
    fn add(&mut self, station: &Station) {
        self.weight += station.weight;
        self.moment += station.moment();
    }

    /// Moment / weight, or 0 for an empty group.
    pub fn arm(&self) -> f64 {
        if self.weight > 0.0 {
            self.moment / self.weight
        } else {
            0.0
        }
    }
}

/// Loading-schedule footer: everything except landing fuel, and the fuel group alone.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StationTotals {
    pub total: Totals,
    pub basic: Totals,
    pub fuel: Totals,
    pub landing_fuel: Totals,
}

pub fn station_totals(stations: &[Station]) -> StationTotals {
    let mut totals = StationTotals::default();
    let mut landing_seen = false;

    for station in stations {
        match station.kind {
            StationKind::LandingFuel => {
                // There is one landing-fuel reserve entry; later ones are ignored.
                if !landing_seen {
                    totals.landing_fuel = Totals {
                        weight: station.weight,
                        moment: station.moment(),
                    };
                    landing_seen = true;
                }
            }
            StationKind::Fuel => {
                totals.total.add(station);
                totals.fuel.add(station);
            }
            StationKind::Basic => {
                totals.total.add(station);
                totals.basic.add(station);
            }
        }
    }

    totals
}

/// Derives the ZFW, TOW and LDW points from the current loading.
///
/// A formula that cannot be parsed or evaluated degrades every %MAC to 0 and is
/// logged; it never poisons the summary with NaN.
pub fn compute_conditions(stations: &[Station], mac: &MacConfig, unit: UnitSystem) -> Conditions {
    let formula = match Formula::parse(&mac.formula) {
        Ok(formula) => Some(formula),
        Err(err) => {
            warn!("MAC formula {:?} is unusable: {err}", mac.formula);
            None
        }
    };

    let totals = station_totals(stations);
    let zfw = totals.basic;

    let point = |weight: f64, moment: f64| condition_point(weight, moment, formula.as_ref(), unit);

    Conditions {
        zfw: point(zfw.weight, zfw.moment),
        tow: point(zfw.weight + totals.fuel.weight, zfw.moment + totals.fuel.moment),
        ldw: point(
            zfw.weight + totals.landing_fuel.weight,
            zfw.moment + totals.landing_fuel.moment,
        ),
    }
}

pub fn condition_point(
    weight: f64,
    moment: f64,
    formula: Option<&Formula>,
    unit: UnitSystem,
) -> ConditionPoint {
    let cg = if weight > 0.0 { moment / weight } else { 0.0 };
    ConditionPoint {
        weight,
        moment,
        cg,
        mac_percent: mac_percent(formula, cg, unit),
    }
}

/// %MAC for a CG in the active unit, 0 when the formula fails.
pub fn mac_percent(formula: Option<&Formula>, cg: f64, unit: UnitSystem) -> f64 {
    let Some(formula) = formula else {
        return 0.0;
    };
    match formula.evaluate(to_formula_basis(cg, unit)) {
        Ok(value) => value,
        Err(err) => {
            warn!("error calculating %MAC at CG {cg}: {err}");
            0.0
        }
    }
}
