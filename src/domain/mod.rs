//! Weight and balance domain logic lives here.

pub mod app_state;
pub mod balance;
pub mod entities;
pub mod envelope;
pub mod formula;
pub mod fuel;
pub mod limits;
pub mod profile;

pub use app_state::{AppState, CustomStationNames, SavedCalculation, StationError, WeightEntry};
pub use balance::StationTotals;
pub use entities::{
    Condition, Conditions, FuelTankPriority, MacConfig, Station, StationIndex, StationKind,
    UnitSystem,
};
pub use envelope::{EnvelopeScene, Margin, PlotArea, ScreenPoint, ViewMode};
pub use formula::FormulaError;
pub use fuel::{cg_travel, CgDirection, CgTravel, FuelPlan, FuelPlanError, FuelSequence};
pub use limits::{ConfigError, LimitReport};
pub use profile::{AircraftProfile, ProfileBook, ProfileError, SaveOutcome};
