//! Bounded 0–100 strength score over the current streak.
//!
//! The curve is piecewise linear through `(0, 0)` and the configured
//! breakpoints, flat after the last one.

use crate::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub days: u32,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthCurve {
    points: Vec<Breakpoint>,
}

impl Default for StrengthCurve {
    fn default() -> Self {
        Self {
            points: vec![
                Breakpoint { days: 7, score: 50 },
                Breakpoint { days: 21, score: 75 },
                Breakpoint { days: 66, score: 90 },
                Breakpoint { days: 100, score: 100 },
            ],
        }
    }
}

impl StrengthCurve {
    /// Breakpoints need strictly increasing days, non-decreasing scores and
    /// scores no higher than 100.
    pub fn new(points: Vec<Breakpoint>) -> LedgerResult<Self> {
        if points.is_empty() {
            return Err(LedgerError::invalid("strength curve needs at least one breakpoint"));
        }
        let mut prev = Breakpoint { days: 0, score: 0 };
        for point in &points {
            if point.days <= prev.days {
                return Err(LedgerError::invalid(format!(
                    "breakpoint days must increase: {} after {}",
                    point.days, prev.days
                )));
            }
            if point.score < prev.score {
                return Err(LedgerError::invalid(format!(
                    "breakpoint scores must not decrease: {} after {}",
                    point.score, prev.score
                )));
            }
            if point.score > 100 {
                return Err(LedgerError::invalid(format!(
                    "breakpoint score {} exceeds 100",
                    point.score
                )));
            }
            prev = *point;
        }
        Ok(Self { points })
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.points
    }

    pub fn score(&self, streak: u32) -> u8 {
        let mut lower = Breakpoint { days: 0, score: 0 };
        for upper in &self.points {
            if streak <= upper.days {
                let span = f64::from(upper.days - lower.days);
                let rise = f64::from(upper.score - lower.score);
                let progress = f64::from(streak - lower.days) / span;
                let value = f64::from(lower.score) + progress * rise;
                return value.round().clamp(0.0, 100.0) as u8;
            }
            lower = *upper;
        }
        lower.score
    }

    pub fn evaluate(&self, streak: u32) -> StrengthResult {
        let strength = self.score(streak);
        let level = StrengthLevel::from_score(strength);
        StrengthResult {
            streak,
            strength,
            level,
            color: level.color(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrengthLevel {
    Weak,
    Developing,
    Strong,
    Unbreakable,
}

impl StrengthLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..25 => StrengthLevel::Weak,
            25..50 => StrengthLevel::Developing,
            50..75 => StrengthLevel::Strong,
            _ => StrengthLevel::Unbreakable,
        }
    }

    pub fn color(self) -> ColorTag {
        match self {
            StrengthLevel::Weak => ColorTag::Danger,
            StrengthLevel::Developing => ColorTag::Warning,
            StrengthLevel::Strong => ColorTag::Info,
            StrengthLevel::Unbreakable => ColorTag::Success,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrengthLevel::Weak => "Weak",
            StrengthLevel::Developing => "Developing",
            StrengthLevel::Strong => "Strong",
            StrengthLevel::Unbreakable => "Unbreakable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Danger,
    Warning,
    Info,
    Success,
}

impl ColorTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorTag::Danger => "danger",
            ColorTag::Warning => "warning",
            ColorTag::Info => "info",
            ColorTag::Success => "success",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrengthResult {
    pub streak: u32,
    pub strength: u8,
    pub level: StrengthLevel,
    pub color: ColorTag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_streak_is_weak_zero() {
        let result = StrengthCurve::default().evaluate(0);
        assert_eq!(result.strength, 0);
        assert_eq!(result.level, StrengthLevel::Weak);
        assert_eq!(result.color, ColorTag::Danger);
    }

    #[test]
    fn milestones_land_on_breakpoints() {
        let curve = StrengthCurve::default();
        assert_eq!(curve.score(7), 50);
        assert_eq!(curve.score(21), 75);
        assert_eq!(curve.score(66), 90);
        assert_eq!(curve.score(100), 100);
        assert_eq!(curve.score(365), 100);
        assert_eq!(curve.score(u32::MAX), 100);
    }

    #[test]
    fn first_week_ramp_matches_linear_formula() {
        let curve = StrengthCurve::default();
        for streak in 1..=7u32 {
            let expected = (f64::from(streak) / 7.0 * 50.0).round() as u8;
            assert_eq!(curve.score(streak), expected, "streak {streak}");
        }
        assert!(curve.score(1) > 0);
    }

    #[test]
    fn score_is_monotonic_in_streak() {
        let curve = StrengthCurve::default();
        let mut prev = 0;
        for streak in 0..=200 {
            let score = curve.score(streak);
            assert!(score >= prev, "score dropped at streak {streak}");
            assert!(score <= 100);
            prev = score;
        }
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(StrengthLevel::from_score(24), StrengthLevel::Weak);
        assert_eq!(StrengthLevel::from_score(25), StrengthLevel::Developing);
        assert_eq!(StrengthLevel::from_score(49), StrengthLevel::Developing);
        assert_eq!(StrengthLevel::from_score(50), StrengthLevel::Strong);
        assert_eq!(StrengthLevel::from_score(74), StrengthLevel::Strong);
        assert_eq!(StrengthLevel::from_score(75), StrengthLevel::Unbreakable);
        assert_eq!(StrengthCurve::default().evaluate(21).color, ColorTag::Success);
    }

    #[test]
    fn custom_curve_validation() {
        assert!(StrengthCurve::new(vec![]).is_err());
        assert!(
            StrengthCurve::new(vec![
                Breakpoint { days: 10, score: 60 },
                Breakpoint { days: 10, score: 80 },
            ])
            .is_err()
        );
        assert!(
            StrengthCurve::new(vec![
                Breakpoint { days: 10, score: 60 },
                Breakpoint { days: 20, score: 50 },
            ])
            .is_err()
        );
        assert!(StrengthCurve::new(vec![Breakpoint { days: 10, score: 101 }]).is_err());

        let curve = StrengthCurve::new(vec![Breakpoint { days: 10, score: 80 }]).unwrap();
        assert_eq!(curve.score(5), 40);
        assert_eq!(curve.score(50), 80);
    }
}
