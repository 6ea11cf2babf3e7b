use std::fmt;

use thiserror::Error;

use super::entities::{Condition, ConditionPoint, Conditions, MacConfig, StationIndex, MAX_WEIGHT};

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("minimum %MAC ({min}) is greater than maximum %MAC ({max})")]
    InvertedLimits { min: f64, max: f64 },
    #[error("%MAC limits must be finite numbers")]
    NonFiniteLimit,
}

/// Input gate for the two %MAC limit fields.
pub fn validate_limits(min: f64, max: f64) -> Result<(), ConfigError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(ConfigError::NonFiniteLimit);
    }
    if min > max {
        return Err(ConfigError::InvertedLimits { min, max });
    }
    Ok(())
}

/// Closed interval, inclusive at both ends.
pub fn within_limits(mac_percent: f64, mac_min: f64, mac_max: f64) -> bool {
    mac_percent >= mac_min && mac_percent <= mac_max
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitVerdict {
    pub within_limits: bool,
}

pub fn evaluate(point: &ConditionPoint, mac: &MacConfig) -> LimitVerdict {
    LimitVerdict {
        within_limits: within_limits(point.mac_percent, mac.mac_min, mac.mac_max),
    }
}

pub fn is_overweight(total_weight: f64) -> bool {
    total_weight > MAX_WEIGHT
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WeightWarning {
    Negative { station: StationIndex, weight: f64 },
    OverCeiling { station: StationIndex, weight: f64 },
}

impl fmt::Display for WeightWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative { station, .. } => {
                write!(f, "Station {station}: weight cannot be negative")
            }
            Self::OverCeiling { station, weight } => {
                write!(f, "Station {station}: weight exceeds maximum limit: {weight:.1}")
            }
        }
    }
}

/// Advisory check for a single station entry. The value is still accepted.
pub fn check_station_weight(station: StationIndex, weight: f64) -> Option<WeightWarning> {
    if weight < 0.0 {
        Some(WeightWarning::Negative { station, weight })
    } else if weight > MAX_WEIGHT {
        Some(WeightWarning::OverCeiling { station, weight })
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LimitIssue {
    Overweight { total: f64 },
    CgOutOfLimits { condition: Condition, mac_percent: f64 },
}

impl fmt::Display for LimitIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overweight { total } => write!(
                f,
                "Total weight ({total:.1}) exceeds maximum limit of {MAX_WEIGHT:.0}"
            ),
            Self::CgOutOfLimits {
                condition,
                mac_percent,
            } => write!(
                f,
                "{} CG ({mac_percent:.2}%) is outside limits",
                condition.name()
            ),
        }
    }
}

/// Result of the full limits advisory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LimitReport {
    pub total_weight: f64,
    pub issues: Vec<LimitIssue>,
}

impl LimitReport {
    /// Nothing to flag and something loaded.
    pub fn all_clear(&self) -> bool {
        self.issues.is_empty() && self.total_weight > 0.0
    }

    pub fn summary(&self) -> Option<String> {
        if !self.issues.is_empty() {
            let text = self
                .issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            Some(format!("FLIGHT SAFETY ALERT: {text}"))
        } else if self.all_clear() {
            Some("All weight and balance checks passed".to_string())
        } else {
            None
        }
    }
}

/// `total_weight` excludes landing fuel. Conditions without weight are not checked.
pub fn check_overall(total_weight: f64, conditions: &Conditions, mac: &MacConfig) -> LimitReport {
    let mut issues = Vec::new();

    if is_overweight(total_weight) {
        issues.push(LimitIssue::Overweight {
            total: total_weight,
        });
    }

    for (condition, point) in conditions.present() {
        if !evaluate(point, mac).within_limits {
            issues.push(LimitIssue::CgOutOfLimits {
                condition,
                mac_percent: point.mac_percent,
            });
        }
    }

    LimitReport {
        total_weight,
        issues,
    }
}
