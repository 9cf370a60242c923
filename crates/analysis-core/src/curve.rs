//! Piecewise-linear scoring curves.
//!
//! An indicator turns a raw metric into a 0-100 partial score by walking a list of
//! `(raw, score)` breakpoints. Inputs left of the first breakpoint take the first
//! score, inputs right of the last take the last score, anything in between is
//! linearly interpolated. Curves must be monotonic so that improving a metric can
//! never lower its partial score.

use serde::{Deserialize, Serialize};

use crate::AnalysisError;

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

/// Which way a curve rewards its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveDirection {
    /// Higher raw values score higher (margins, growth).
    HigherIsBetter,
    /// Lower raw values score higher (leverage, volatility).
    LowerIsBetter,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct Curve {
    points: Vec<(f64, f64)>,
}

impl Curve {
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, AnalysisError> {
        let curve = Self { points };
        curve.validate()?;
        Ok(curve)
    }

    /// Build a curve from compile-time breakpoints. These are checked by
    /// `validate()` whenever the owning configuration is validated.
    pub fn from_constant(points: &'static [(f64, f64)]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.points.len() < 2 {
            return Err(AnalysisError::InvalidConfig(format!(
                "curve needs at least 2 breakpoints, got {}",
                self.points.len()
            )));
        }
        for &(x, y) in &self.points {
            if !x.is_finite() || !y.is_finite() {
                return Err(AnalysisError::InvalidConfig(
                    "curve breakpoints must be finite".to_string(),
                ));
            }
            if !(SCORE_MIN..=SCORE_MAX).contains(&y) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "curve score {} outside 0-100",
                    y
                )));
            }
        }
        if self.points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(AnalysisError::InvalidConfig(
                "curve breakpoints must have strictly increasing inputs".to_string(),
            ));
        }
        let rising = self.points.windows(2).all(|w| w[1].1 >= w[0].1);
        let falling = self.points.windows(2).all(|w| w[1].1 <= w[0].1);
        if !rising && !falling {
            return Err(AnalysisError::InvalidConfig(
                "curve scores must be monotonic".to_string(),
            ));
        }
        Ok(())
    }

    pub fn direction(&self) -> CurveDirection {
        let first = self.points.first().map(|p| p.1).unwrap_or(SCORE_MIN);
        let last = self.points.last().map(|p| p.1).unwrap_or(SCORE_MIN);
        if last > first {
            CurveDirection::HigherIsBetter
        } else if last < first {
            CurveDirection::LowerIsBetter
        } else {
            CurveDirection::Flat
        }
    }

    /// Map a raw value to a partial score in [0, 100].
    pub fn score(&self, value: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return SCORE_MIN,
        };
        if value <= first.0 {
            return first.1.clamp(SCORE_MIN, SCORE_MAX);
        }
        if value >= last.0 {
            return last.1.clamp(SCORE_MIN, SCORE_MAX);
        }
        for w in self.points.windows(2) {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            if value <= x1 {
                let t = (value - x0) / (x1 - x0);
                return (y0 + t * (y1 - y0)).clamp(SCORE_MIN, SCORE_MAX);
            }
        }
        last.1.clamp(SCORE_MIN, SCORE_MAX)
    }
}

impl TryFrom<Vec<(f64, f64)>> for Curve {
    type Error = AnalysisError;

    fn try_from(points: Vec<(f64, f64)>) -> Result<Self, Self::Error> {
        Curve::new(points)
    }
}

impl From<Curve> for Vec<(f64, f64)> {
    fn from(curve: Curve) -> Self {
        curve.points
    }
}

/// Weighted mean over `(weight, value)` pairs.
/// Returns `None` when no pair carries positive weight.
pub fn weighted_average(parts: &[(f64, f64)]) -> Option<f64> {
    let total_weight: f64 = parts.iter().filter(|(w, _)| *w > 0.0).map(|(w, _)| w).sum();
    if total_weight <= 0.0 {
        return None;
    }
    let sum: f64 = parts
        .iter()
        .filter(|(w, _)| *w > 0.0)
        .map(|(w, v)| w * v)
        .sum();
    Some(sum / total_weight)
}
