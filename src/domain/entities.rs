use serde::{Deserialize, Serialize};

/// Moments are displayed divided by this factor ("Moment/100").
pub const MOMENT_DIVISOR: f64 = 100.0;
pub const IN_TO_M: f64 = 0.0254;
pub const LB_TO_KG: f64 = 0.45359237;
/// Hard ceiling for a single station and for the total weight. Not unit-converted.
pub const MAX_WEIGHT: f64 = 60_000.0;

pub const DEFAULT_MAC_FORMULA: &str = "20 + ((CG - 232.28) / 86.22) * 100";
pub const DEFAULT_MAC_MIN: f64 = 16.0;
pub const DEFAULT_MAC_MAX: f64 = 30.0;

/// 1-based station index, stable for the loaded aircraft.
pub type StationIndex = usize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    #[default]
    Basic,
    Fuel,
    LandingFuel,
}

impl StationKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Fuel => "fuel",
            Self::LandingFuel => "landing fuel",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub index: StationIndex,
    pub description: String,
    pub arm: f64,
    pub weight: f64,
    #[serde(rename = "type")]
    pub kind: StationKind,
}

impl Station {
    pub fn new(
        index: StationIndex,
        description: impl Into<String>,
        arm: f64,
        kind: StationKind,
    ) -> Self {
        Self {
            index,
            description: description.into(),
            arm,
            weight: 0.0,
            kind,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn moment(&self) -> f64 {
        self.weight * self.arm
    }

    /// Moment as shown in the loading schedule. Scaling only.
    pub fn displayed_moment(&self) -> f64 {
        self.moment() / MOMENT_DIVISOR
    }
}

/// The A319 layout the calculator starts with.
pub fn default_stations() -> Vec<Station> {
    use StationKind::*;

    let layout: [(&str, f64, StationKind); 13] = [
        ("Basic Aircraft", 236.6, Basic),
        ("Crew (2)", 80.7, Basic),
        ("Crew's Baggage", 140.0, Basic),
        ("Steward's Equipment", 140.0, Basic),
        ("Emergency Equipment", 150.0, Basic),
        ("Extra Equipment", 150.0, Basic),
        ("Potable Water", 240.0, Basic),
        ("Cargo", 460.0, Basic),
        ("Other", 0.0, Basic),
        ("Other", 0.0, Basic),
        ("Fuel Tank InBoard", 246.5, Fuel),
        ("Fuel Tank OutBoard", 246.5, Fuel),
        ("Landing Fuel (Est.)", 246.5, LandingFuel),
    ];

    layout
        .into_iter()
        .enumerate()
        .map(|(pos, (description, arm, kind))| Station::new(pos + 1, description, arm, kind))
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

impl UnitSystem {
    pub fn weight_unit(&self) -> &'static str {
        match self {
            Self::Imperial => "lb",
            Self::Metric => "kg",
        }
    }

    pub fn length_unit(&self) -> &'static str {
        match self {
            Self::Imperial => "in",
            Self::Metric => "m",
        }
    }

    pub fn moment_unit(&self) -> &'static str {
        match self {
            Self::Imperial => "lb·in",
            Self::Metric => "kg·m",
        }
    }

    /// Converts a weight in pounds into this unit.
    pub fn from_pounds(&self, weight: f64) -> f64 {
        match self {
            Self::Imperial => weight,
            Self::Metric => weight * LB_TO_KG,
        }
    }

    /// Converts a weight in this unit into pounds.
    pub fn to_pounds(&self, weight: f64) -> f64 {
        match self {
            Self::Imperial => weight,
            Self::Metric => weight / LB_TO_KG,
        }
    }
}

/// Converts a CG in the active length unit into the inch basis MAC formulas are authored in.
pub fn to_formula_basis(cg: f64, unit: UnitSystem) -> f64 {
    match unit {
        UnitSystem::Imperial => cg,
        UnitSystem::Metric => cg / IN_TO_M,
    }
}

/// Inverse of [`to_formula_basis`].
pub fn from_formula_basis(cg_inches: f64, unit: UnitSystem) -> f64 {
    match unit {
        UnitSystem::Imperial => cg_inches,
        UnitSystem::Metric => cg_inches * IN_TO_M,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacConfig {
    /// Arithmetic expression in the variable `CG`.
    pub formula: String,
    pub mac_min: f64,
    pub mac_max: f64,
}

impl Default for MacConfig {
    fn default() -> Self {
        Self {
            formula: DEFAULT_MAC_FORMULA.to_string(),
            mac_min: DEFAULT_MAC_MIN,
            mac_max: DEFAULT_MAC_MAX,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    ZeroFuel,
    TakeOff,
    Landing,
}

impl Condition {
    /// Flight order, used for the flight path overlay and hit-testing.
    pub const ALL: [Condition; 3] = [Condition::ZeroFuel, Condition::TakeOff, Condition::Landing];

    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroFuel => "ZFW",
            Self::TakeOff => "TOW",
            Self::Landing => "LDW",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ZeroFuel => "Zero Fuel",
            Self::TakeOff => "Take-off",
            Self::Landing => "Landing",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionPoint {
    pub weight: f64,
    pub moment: f64,
    pub cg: f64,
    pub mac_percent: f64,
}

impl ConditionPoint {
    /// A condition only shows up on the chart and in the advisory when it carries weight.
    pub fn is_present(&self) -> bool {
        self.weight > 0.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub zfw: ConditionPoint,
    pub tow: ConditionPoint,
    pub ldw: ConditionPoint,
}

impl Conditions {
    pub fn get(&self, condition: Condition) -> &ConditionPoint {
        match condition {
            Condition::ZeroFuel => &self.zfw,
            Condition::TakeOff => &self.tow,
            Condition::Landing => &self.ldw,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Condition, &ConditionPoint)> {
        Condition::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn present(&self) -> impl Iterator<Item = (Condition, &ConditionPoint)> {
        self.iter().filter(|(_, point)| point.is_present())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelTankPriority {
    pub station_index: StationIndex,
    /// 0 is consumed first.
    pub priority: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelSequenceStep {
    pub tank_name: String,
    pub start_time: f64,
    pub end_time: f64,
    pub fuel_burned: f64,
    pub fuel_remaining: f64,
}
