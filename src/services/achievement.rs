use serde::{Deserialize, Serialize};

use crate::models::metric::Metric;

/// Actual value recorded for one month other than the one under edit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthActual {
    pub month: u32,
    pub actual_value: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AchievementOutcome {
    pub actual_value: f64,
    pub achievement_rate: f64,
}

/// Scoring curve for reverse-scored tasks (lower actual-vs-target is
/// better, e.g. cost-reduction targets). Kept behind a trait so the curve
/// can be swapped without touching the ledger; the only fixed points are
/// actual == target => 100 and a strictly decreasing rate as actual grows
/// past the target.
pub trait ReverseStrategy: Send + Sync {
    fn rate(&self, target_value: f64, actual_value: f64) -> f64;
}

/// Default reverse curve: the forward rate mirrored around the target.
/// actual == target => 100%, each percent of overshoot costs one point,
/// floored at 0. Undershoot scores above 100 symmetrically.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearMirrorReverse;

impl ReverseStrategy for LinearMirrorReverse {
    fn rate(&self, target_value: f64, actual_value: f64) -> f64 {
        if target_value <= 0.0 || actual_value <= 0.0 {
            return 0.0;
        }
        ((2.0 - actual_value / target_value) * 100.0).max(0.0)
    }
}

pub struct AchievementCalculator {
    reverse: Box<dyn ReverseStrategy>,
}

impl Default for AchievementCalculator {
    fn default() -> Self {
        Self {
            reverse: Box::new(LinearMirrorReverse),
        }
    }
}

impl AchievementCalculator {
    pub fn with_reverse_strategy(reverse: Box<dyn ReverseStrategy>) -> Self {
        Self { reverse }
    }

    /// Cumulative actual value and achievement rate for a task at the point
    /// of editing one month.
    ///
    /// Percent metrics are snapshots: the value being typed *is* the actual,
    /// other months are ignored. Count and amount metrics accumulate: the
    /// current input plus every other month's recorded actual. The caller
    /// must exclude the month under edit from `other_months`, otherwise the
    /// superseded value would be double counted.
    pub fn evaluate(
        &self,
        metric: Metric,
        target_value: f64,
        current_input: Option<f64>,
        other_months: &[MonthActual],
        reverse_yn: bool,
    ) -> AchievementOutcome {
        let current = sanitize(current_input);
        let target = sanitize(Some(target_value));

        let actual_value = if metric.is_cumulative() {
            current
                + other_months
                    .iter()
                    .map(|m| sanitize(Some(m.actual_value)))
                    .sum::<f64>()
        } else {
            current
        };

        let achievement_rate = if reverse_yn {
            self.reverse.rate(target, actual_value)
        } else if target > 0.0 && actual_value > 0.0 {
            actual_value / target * 100.0
        } else {
            // covers target unset (0), zero/negative actual, and the 0/0
            // case that must not read as 100%
            0.0
        };

        AchievementOutcome {
            actual_value,
            achievement_rate,
        }
    }
}

fn sanitize(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

const BAND_BLUE: (f64, f64, f64) = (59.0, 130.0, 246.0);
const BAND_YELLOW: (f64, f64, f64) = (250.0, 204.0, 21.0);
const BAND_ORANGE: (f64, f64, f64) = (249.0, 115.0, 22.0);
const BAND_GREEN: (f64, f64, f64) = (34.0, 197.0, 94.0);

/// Achievement badge/progress-bar color. The raw rate is unbounded upward,
/// so it is clamped to [0,100] first, then interpolated across three bands:
/// [0,70) blue to yellow, [70,90) yellow to orange, [90,100] orange to
/// green. Interpolation is linear per RGB channel and continuous at the
/// band boundaries.
pub fn color_for_achievement(rate: f64) -> Rgb {
    let rate = if rate.is_finite() {
        rate.clamp(0.0, 100.0)
    } else {
        0.0
    };

    let (from, to, t) = if rate < 70.0 {
        (BAND_BLUE, BAND_YELLOW, rate / 70.0)
    } else if rate < 90.0 {
        (BAND_YELLOW, BAND_ORANGE, (rate - 70.0) / 20.0)
    } else {
        (BAND_ORANGE, BAND_GREEN, (rate - 90.0) / 10.0)
    };

    Rgb {
        r: lerp(from.0, to.0, t),
        g: lerp(from.1, to.1, t),
        b: lerp(from.2, to.2, t),
    }
}

fn lerp(from: f64, to: f64, t: f64) -> u8 {
    (from + (to - from) * t).round().clamp(0.0, 255.0) as u8
}
