//! Leveling curves and XP → level resolution.
//!
//! A level threshold is the *total* XP a member must hold to be at that
//! level. Thresholds come from one of four curve kinds, unless the guild has
//! pinned a specific level with an explicit override.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default XP per level for the linear curve.
pub const DEFAULT_LINEAR_RATE: f64 = 100.0;

/// Default multiplier for the exponential, polynomial and logarithmic curves.
pub const DEFAULT_FACTOR: f64 = 100.0;

/// Default growth base for the exponential curve.
pub const DEFAULT_EXPONENTIAL_BASE: f64 = 1.5;

/// Default exponent for the polynomial curve.
pub const DEFAULT_POLYNOMIAL_DEGREE: f64 = 2.0;

/// Default multiplier for the logarithmic curve.
pub const DEFAULT_LOGARITHMIC_FACTOR: f64 = 1000.0;

/// Default logarithm base for the logarithmic curve.
pub const DEFAULT_LOGARITHMIC_BASE: f64 = 2.0;

/// Upper bound on the level scan when no `max_level` is configured.
///
/// Guards against degenerate curves (e.g. a zero rate) where every threshold
/// is reachable and the scan would otherwise never terminate.
pub const LEVEL_SCAN_LIMIT: u32 = 10_000;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Shape of the XP curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    /// `rate * level`
    #[default]
    Linear,
    /// `factor * base^(level - 1)`
    Exponential,
    /// `factor * level^degree`
    Polynomial,
    /// `factor * ln(level + 1) / ln(base)`
    Logarithmic,
}

/// Curve parameters. Missing values fall back to per-curve defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurveParams {
    pub rate: Option<f64>,
    pub base: Option<f64>,
    pub factor: Option<f64>,
    pub degree: Option<f64>,
}

/// Per-guild leveling configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LevelingConfig {
    pub curve: CurveKind,
    pub params: CurveParams,
    /// Explicit total-XP thresholds that replace the curve for single levels.
    pub xp_overrides: BTreeMap<u32, i64>,
    pub max_level: Option<u32>,
}

impl LevelingConfig {
    /// Reject parameters that make thresholds flat or non-increasing.
    ///
    /// Only the parameters the selected curve reads are checked.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_level == Some(0) {
            return Err(CoreError::Validation(
                "Max level must be greater than zero".to_string(),
            ));
        }
        let p = &self.params;
        match self.curve {
            CurveKind::Linear => positive("rate", p.rate)?,
            CurveKind::Exponential => {
                positive("factor", p.factor)?;
                above_one("base", p.base)?;
            }
            CurveKind::Polynomial => {
                positive("factor", p.factor)?;
                positive("degree", p.degree)?;
            }
            CurveKind::Logarithmic => {
                positive("factor", p.factor)?;
                above_one("base", p.base)?;
            }
        }
        Ok(())
    }
}

fn positive(name: &str, value: Option<f64>) -> Result<(), CoreError> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(CoreError::Validation(format!(
            "Curve {name} must be a finite number greater than zero"
        ))),
        _ => Ok(()),
    }
}

fn above_one(name: &str, value: Option<f64>) -> Result<(), CoreError> {
    match value {
        Some(v) if !(v.is_finite() && v > 1.0) => Err(CoreError::Validation(format!(
            "Curve {name} must be a finite number greater than one"
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Curve evaluation
// ---------------------------------------------------------------------------

/// Total XP required to reach `level`.
///
/// An override for `level` always wins. Level 0 costs nothing unless
/// overridden. Fractional results are floored; non-finite results clamp to 0.
pub fn total_xp_for_level(level: u32, config: &LevelingConfig) -> i64 {
    if let Some(&pinned) = config.xp_overrides.get(&level) {
        return pinned;
    }
    if level == 0 {
        return 0;
    }

    let p = &config.params;
    let l = f64::from(level);
    let raw = match config.curve {
        CurveKind::Linear => p.rate.unwrap_or(DEFAULT_LINEAR_RATE) * l,
        CurveKind::Exponential => {
            let base = p.base.unwrap_or(DEFAULT_EXPONENTIAL_BASE);
            p.factor.unwrap_or(DEFAULT_FACTOR) * base.powf(l - 1.0)
        }
        CurveKind::Polynomial => {
            let degree = p.degree.unwrap_or(DEFAULT_POLYNOMIAL_DEGREE);
            p.factor.unwrap_or(DEFAULT_FACTOR) * l.powf(degree)
        }
        CurveKind::Logarithmic => {
            let base = p.base.unwrap_or(DEFAULT_LOGARITHMIC_BASE);
            p.factor.unwrap_or(DEFAULT_LOGARITHMIC_FACTOR) * (l + 1.0).ln() / base.ln()
        }
    };

    if raw.is_finite() {
        // `as` saturates at the i64 bounds.
        raw.floor() as i64
    } else {
        0
    }
}

/// Resolve the level a member with `xp` total XP is at.
///
/// This is a linear scan upward from level 0, not a closed-form inverse:
/// overrides can pin arbitrary levels, so no general inverse exists. The scan
/// stops at the first level whose threshold exceeds `xp` and never passes
/// `max_level` (or [`LEVEL_SCAN_LIMIT`] when unset). Level counts are small,
/// so O(level) per call is acceptable.
pub fn level_from_xp(xp: i64, config: &LevelingConfig) -> u32 {
    let cap = config.max_level.unwrap_or(LEVEL_SCAN_LIMIT);
    let mut level = 0;
    while level < cap {
        if total_xp_for_level(level + 1, config) > xp {
            break;
        }
        level += 1;
    }
    level
}

/// XP still needed to reach the next level, or `None` at the level cap.
pub fn xp_to_next_level(xp: i64, config: &LevelingConfig) -> Option<i64> {
    let level = level_from_xp(xp, config);
    if config.max_level.is_some_and(|max| level >= max) {
        return None;
    }
    Some((total_xp_for_level(level + 1, config) - xp).max(0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(kind: CurveKind) -> LevelingConfig {
        LevelingConfig {
            curve: kind,
            ..Default::default()
        }
    }

    fn with_params(kind: CurveKind, params: CurveParams) -> LevelingConfig {
        LevelingConfig {
            curve: kind,
            params,
            ..Default::default()
        }
    }

    #[test]
    fn degenerate_curve_params_are_rejected() {
        let flat_log = with_params(
            CurveKind::Logarithmic,
            CurveParams {
                base: Some(1.0),
                ..Default::default()
            },
        );
        assert!(flat_log.validate().is_err());

        let zero_factor = with_params(
            CurveKind::Exponential,
            CurveParams {
                factor: Some(0.0),
                ..Default::default()
            },
        );
        assert!(zero_factor.validate().is_err());

        let nan_rate = with_params(
            CurveKind::Linear,
            CurveParams {
                rate: Some(f64::NAN),
                ..Default::default()
            },
        );
        assert!(nan_rate.validate().is_err());

        let flat_poly = with_params(
            CurveKind::Polynomial,
            CurveParams {
                degree: Some(0.0),
                ..Default::default()
            },
        );
        assert!(flat_poly.validate().is_err());

        let capped_at_zero = LevelingConfig {
            max_level: Some(0),
            ..Default::default()
        };
        assert!(capped_at_zero.validate().is_err());
    }

    #[test]
    fn unused_params_are_not_checked() {
        // Linear ignores `base`.
        let linear = with_params(
            CurveKind::Linear,
            CurveParams {
                base: Some(0.5),
                ..Default::default()
            },
        );
        assert!(linear.validate().is_ok());
        for kind in [
            CurveKind::Linear,
            CurveKind::Exponential,
            CurveKind::Polynomial,
            CurveKind::Logarithmic,
        ] {
            assert!(curve(kind).validate().is_ok());
        }
    }

    #[test]
    fn linear_uses_default_rate() {
        let cfg = curve(CurveKind::Linear);
        assert_eq!(total_xp_for_level(1, &cfg), 100);
        assert_eq!(total_xp_for_level(5, &cfg), 500);
    }

    #[test]
    fn exponential_starts_at_factor() {
        let cfg = curve(CurveKind::Exponential);
        assert_eq!(total_xp_for_level(1, &cfg), 100);
        assert_eq!(total_xp_for_level(2, &cfg), 150);
        assert_eq!(total_xp_for_level(3, &cfg), 225);
    }

    #[test]
    fn polynomial_squares_by_default() {
        let cfg = curve(CurveKind::Polynomial);
        assert_eq!(total_xp_for_level(3, &cfg), 900);
    }

    #[test]
    fn logarithmic_uses_base_two() {
        let cfg = curve(CurveKind::Logarithmic);
        // 1000 * ln(2) / ln(2)
        assert_eq!(total_xp_for_level(1, &cfg), 1000);
        // 1000 * ln(4) / ln(2), allowing for float rounding before the floor
        let level_three = total_xp_for_level(3, &cfg);
        assert!((1999..=2000).contains(&level_three));
    }

    #[test]
    fn custom_params_override_defaults() {
        let cfg = LevelingConfig {
            curve: CurveKind::Linear,
            params: CurveParams {
                rate: Some(250.0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(total_xp_for_level(2, &cfg), 500);
    }

    #[test]
    fn override_short_circuits_curve() {
        let mut cfg = curve(CurveKind::Linear);
        cfg.xp_overrides.insert(3, 42);
        assert_eq!(total_xp_for_level(3, &cfg), 42);
        assert_eq!(total_xp_for_level(4, &cfg), 400);
    }

    #[test]
    fn level_zero_is_free() {
        let cfg = curve(CurveKind::Exponential);
        assert_eq!(total_xp_for_level(0, &cfg), 0);
        assert_eq!(level_from_xp(0, &cfg), 0);
    }

    #[test]
    fn level_from_xp_stops_at_first_unreached_threshold() {
        let cfg = curve(CurveKind::Linear);
        assert_eq!(level_from_xp(99, &cfg), 0);
        assert_eq!(level_from_xp(100, &cfg), 1);
        assert_eq!(level_from_xp(450, &cfg), 4);
    }

    #[test]
    fn level_from_xp_respects_max_level() {
        let mut cfg = curve(CurveKind::Linear);
        cfg.max_level = Some(3);
        assert_eq!(level_from_xp(1_000_000, &cfg), 3);
        assert_eq!(xp_to_next_level(1_000_000, &cfg), None);
    }

    #[test]
    fn degenerate_curve_terminates() {
        let cfg = LevelingConfig {
            curve: CurveKind::Linear,
            params: CurveParams {
                rate: Some(0.0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(level_from_xp(0, &cfg), LEVEL_SCAN_LIMIT);
    }

    #[test]
    fn level_is_monotonic_in_xp() {
        let mut cfg = curve(CurveKind::Exponential);
        cfg.xp_overrides.insert(4, 10);
        cfg.max_level = Some(40);
        let mut previous = 0;
        for xp in (0..200_000).step_by(97) {
            let level = level_from_xp(xp, &cfg);
            assert!(level >= previous, "level dropped at xp={xp}");
            assert!(level <= 40);
            previous = level;
        }
    }

    #[test]
    fn xp_to_next_level_counts_remaining() {
        let cfg = curve(CurveKind::Linear);
        assert_eq!(xp_to_next_level(130, &cfg), Some(70));
    }
}
