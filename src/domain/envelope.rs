//! Projection of the three loading conditions onto the CG envelope chart.
//!
//! Everything here is plain geometry in screen units; drawing is left to the caller.

use std::{f64::consts::PI, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{
    from_formula_basis, Condition, ConditionPoint, Conditions, MacConfig, UnitSystem, MAX_WEIGHT,
};
use super::formula::Formula;
use super::limits::within_limits;

/// Pointer hit radius around a plotted point.
pub const HIT_RADIUS: f64 = 12.0;
const RANGE_PADDING: f64 = 0.1;
const MAC_FALLBACK_PADDING: f64 = 5.0;
const ARROW_LENGTH: f64 = 8.0;
const TICK_COUNT: usize = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    CgWeight,
    MacWeight,
}

#[derive(Debug, Error)]
#[error("invalid envelope mode {0:?}; must be 'cg' or 'mac'")]
pub struct ViewModeError(String);

impl FromStr for ViewMode {
    type Err = ViewModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "cg" | "cg-weight" => Self::CgWeight,
            "mac" | "mac-weight" => Self::MacWeight,
            other => return Err(ViewModeError(other.to_string())),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 40.0,
            left: 50.0,
        }
    }
}

/// The inner plotting rectangle of the chart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn from_canvas(width: f64, height: f64, margin: Margin) -> Self {
        Self {
            left: margin.left,
            top: margin.top,
            width: (width - margin.left - margin.right).max(0.0),
            height: (height - margin.top - margin.bottom).max(0.0),
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Strictly inside; points on the axis lines are treated as off the plot.
    pub fn contains(&self, value: f64) -> bool {
        value > self.min && value < self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// `[min - 10% span, max + 10% span]` around the values, if there are any.
    fn padded(values: &[f64]) -> Option<Self> {
        let min = values.iter().copied().reduce(f64::min)?;
        let max = values.iter().copied().reduce(f64::max)?;
        let span = max - min;
        if span > 0.0 {
            Some(Self::new(min - span * RANGE_PADDING, max + span * RANGE_PADDING))
        } else {
            // A single value would collapse the axis.
            let pad = (min.abs() * RANGE_PADDING).max(1.0);
            Some(Self::new(min - pad, max + pad))
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Affine map between data space and screen space. Y grows downwards on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub area: PlotArea,
    pub x: AxisRange,
    pub y: AxisRange,
}

impl Projection {
    pub fn to_screen(&self, x: f64, y: f64) -> ScreenPoint {
        ScreenPoint {
            x: self.area.left + (x - self.x.min) / self.x.span() * self.area.width,
            y: self.area.bottom() - (y - self.y.min) / self.y.span() * self.area.height,
        }
    }

    pub fn to_data(&self, screen: ScreenPoint) -> (f64, f64) {
        (
            self.x.min + (screen.x - self.area.left) / self.area.width * self.x.span(),
            self.y.min + (self.area.bottom() - screen.y) / self.area.height * self.y.span(),
        )
    }
}

fn cg_fallback(unit: UnitSystem) -> AxisRange {
    match unit {
        UnitSystem::Imperial => AxisRange::new(200.0, 300.0),
        UnitSystem::Metric => AxisRange::new(5.0, 8.0),
    }
}

fn horizontal_value(mode: ViewMode, point: &ConditionPoint) -> f64 {
    match mode {
        ViewMode::CgWeight => point.cg,
        ViewMode::MacWeight => point.mac_percent,
    }
}

/// Horizontal and vertical ranges for the present conditions, or fixed fallbacks.
pub fn axis_ranges(
    conditions: &Conditions,
    mac: &MacConfig,
    unit: UnitSystem,
    mode: ViewMode,
) -> (AxisRange, AxisRange) {
    let present: Vec<&ConditionPoint> = conditions.present().map(|(_, p)| p).collect();
    let xs: Vec<f64> = present.iter().map(|p| horizontal_value(mode, p)).collect();
    let weights: Vec<f64> = present.iter().map(|p| p.weight).collect();

    let x = AxisRange::padded(&xs).unwrap_or_else(|| match mode {
        ViewMode::CgWeight => cg_fallback(unit),
        ViewMode::MacWeight => AxisRange::new(
            mac.mac_min - MAC_FALLBACK_PADDING,
            mac.mac_max + MAC_FALLBACK_PADDING,
        ),
    });
    let y = AxisRange::padded(&weights)
        .map(|range| AxisRange::new(range.min.max(0.0), range.max))
        .unwrap_or(AxisRange::new(0.0, MAX_WEIGHT));

    (x, y)
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlottedPoint {
    pub condition: Condition,
    pub data: ConditionPoint,
    pub screen: ScreenPoint,
    pub within_limits: bool,
}

/// A dashed limit line, with endpoints in data space and on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LimitLine {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub start: ScreenPoint,
    pub end: ScreenPoint,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrow {
    pub tip: ScreenPoint,
    pub left: ScreenPoint,
    pub right: ScreenPoint,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathSegment {
    pub from: Condition,
    pub to: Condition,
    pub start: ScreenPoint,
    pub end: ScreenPoint,
    pub arrow: Arrow,
}

impl PathSegment {
    fn new(from: &PlottedPoint, to: &PlottedPoint) -> Self {
        let (start, end) = (from.screen, to.screen);
        let tip = ScreenPoint::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
        let angle = (end.y - start.y).atan2(end.x - start.x);
        let wing = |offset: f64| {
            ScreenPoint::new(
                tip.x - ARROW_LENGTH * (angle + offset).cos(),
                tip.y - ARROW_LENGTH * (angle + offset).sin(),
            )
        };
        Self {
            from: from.condition,
            to: to.condition,
            start,
            end,
            arrow: Arrow {
                tip,
                left: wing(-PI / 6.0),
                right: wing(PI / 6.0),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub position: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnvelopeScene {
    pub mode: ViewMode,
    pub projection: Projection,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<PlottedPoint>,
    pub limit_lines: Vec<LimitLine>,
    pub flight_path: Vec<PathSegment>,
}

impl EnvelopeScene {
    /// First present point, in ZFW/TOW/LDW order, within [`HIT_RADIUS`] of `pos`.
    pub fn hit_test(&self, pos: ScreenPoint) -> Option<&PlottedPoint> {
        self.points
            .iter()
            .find(|point| point.screen.distance(&pos) <= HIT_RADIUS)
    }

    pub fn x_ticks(&self) -> Vec<Tick> {
        let Projection { area, x, .. } = self.projection;
        (0..=TICK_COUNT)
            .map(|i| {
                let t = i as f64 / TICK_COUNT as f64;
                Tick {
                    value: x.min + t * x.span(),
                    position: area.left + t * area.width,
                }
            })
            .collect()
    }

    pub fn y_ticks(&self) -> Vec<Tick> {
        let Projection { area, y, .. } = self.projection;
        (0..=TICK_COUNT)
            .map(|i| {
                let t = i as f64 / TICK_COUNT as f64;
                Tick {
                    value: y.min + t * y.span(),
                    position: area.bottom() - t * area.height,
                }
            })
            .collect()
    }
}

/// Lays out the chart for the given conditions.
pub fn project(
    conditions: &Conditions,
    mac: &MacConfig,
    unit: UnitSystem,
    mode: ViewMode,
    area: PlotArea,
    show_flight_path: bool,
) -> EnvelopeScene {
    let (x, y) = axis_ranges(conditions, mac, unit, mode);
    let projection = Projection { area, x, y };

    let points: Vec<PlottedPoint> = conditions
        .present()
        .map(|(condition, data)| PlottedPoint {
            condition,
            data: *data,
            screen: projection.to_screen(horizontal_value(mode, data), data.weight),
            within_limits: within_limits(data.mac_percent, mac.mac_min, mac.mac_max),
        })
        .collect();

    let limit_lines = match mode {
        ViewMode::CgWeight => cg_limit_lines(&projection, &points, mac, unit),
        ViewMode::MacWeight => mac_limit_lines(&projection, mac),
    };

    let flight_path = if show_flight_path {
        points
            .windows(2)
            .map(|pair| PathSegment::new(&pair[0], &pair[1]))
            .collect()
    } else {
        Vec::new()
    };

    let (x_label, y_label) = match mode {
        ViewMode::CgWeight => (
            format!("Center of Gravity ({})", unit.length_unit()),
            format!("Weight ({})", unit.weight_unit()),
        ),
        ViewMode::MacWeight => ("%MAC".to_string(), format!("Weight ({})", unit.weight_unit())),
    };

    EnvelopeScene {
        mode,
        projection,
        x_label,
        y_label,
        points,
        limit_lines,
        flight_path,
    }
}

/// Horizontal segments between the CGs of min and max %MAC, drawn at the lightest
/// and heaviest plotted weights.
fn cg_limit_lines(
    projection: &Projection,
    points: &[PlottedPoint],
    mac: &MacConfig,
    unit: UnitSystem,
) -> Vec<LimitLine> {
    let weights: Vec<f64> = points.iter().map(|p| p.data.weight).collect();
    let (Some(lightest), Some(heaviest)) = (
        weights.iter().copied().reduce(f64::min),
        weights.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };

    let Ok(formula) = Formula::parse(&mac.formula) else {
        return Vec::new();
    };
    let (Some(cg_min), Some(cg_max)) = (formula.invert(mac.mac_min), formula.invert(mac.mac_max))
    else {
        log::debug!("no inverse for {:?}; skipping limit lines", mac.formula);
        return Vec::new();
    };
    let cg_min = from_formula_basis(cg_min, unit);
    let cg_max = from_formula_basis(cg_max, unit);

    let x = projection.x;
    let off_range = (cg_min < x.min && cg_max < x.min) || (cg_min > x.max && cg_max > x.max);
    if off_range {
        return Vec::new();
    }

    let mut levels = vec![lightest];
    if heaviest != lightest {
        levels.push(heaviest);
    }

    levels
        .into_iter()
        .filter(|weight| projection.y.contains(*weight))
        .map(|weight| {
            let from = (x.clamp(cg_min), weight);
            let to = (x.clamp(cg_max), weight);
            LimitLine {
                from,
                to,
                start: projection.to_screen(from.0, from.1),
                end: projection.to_screen(to.0, to.1),
            }
        })
        .collect()
}

/// Vertical lines at min and max %MAC across the full weight range.
fn mac_limit_lines(projection: &Projection, mac: &MacConfig) -> Vec<LimitLine> {
    let y = projection.y;
    [mac.mac_min, mac.mac_max]
        .into_iter()
        .filter(|value| projection.x.contains(*value))
        .map(|value| {
            let from = (value, y.min);
            let to = (value, y.max);
            LimitLine {
                from,
                to,
                start: projection.to_screen(from.0, from.1),
                end: projection.to_screen(to.0, to.1),
            }
        })
        .collect()
}
