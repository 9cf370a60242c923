use std::path::Path;
use std::str::FromStr;

use analysis_core::{AnalysisError, Curve, CurveDirection, RiskFlag, SubScoreKind};
use serde::{Deserialize, Serialize};

// Sub-score weights (must sum to 1.0)
pub const W_BALANCE_SHEET: f64 = 0.25;
pub const W_GROWTH: f64 = 0.25;
pub const W_PROFITABILITY: f64 = 0.20;
pub const W_MOMENTUM: f64 = 0.15;
pub const W_RISK: f64 = 0.15;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

// Rationale thresholds
pub const CONCERN_THRESHOLD: f64 = 40.0;
pub const STRENGTH_THRESHOLD: f64 = 75.0;
pub const MAX_RATIONALE_ENTRIES: usize = 5;

// Balance sheet breakpoints: (raw, partial score)
pub const DEBT_TO_EQUITY_CURVE: &[(f64, f64)] = &[(0.5, 100.0), (1.0, 70.0), (2.0, 0.0)];
pub const CURRENT_RATIO_CURVE: &[(f64, f64)] = &[(0.8, 0.0), (1.0, 40.0), (1.5, 75.0), (2.0, 100.0)];
pub const QUICK_RATIO_CURVE: &[(f64, f64)] = &[(0.5, 0.0), (1.0, 70.0), (1.5, 100.0)];
pub const CASH_TO_DEBT_CURVE: &[(f64, f64)] = &[(0.2, 0.0), (0.5, 40.0), (1.0, 75.0), (2.0, 100.0)];
/// Years of cash left at the current burn rate.
pub const CASH_RUNWAY_YEARS_CURVE: &[(f64, f64)] = &[(1.0, 0.0), (2.0, 50.0), (4.0, 100.0)];

// Growth breakpoints (fractions, 0.10 = 10% YoY)
pub const REVENUE_GROWTH_CURVE: &[(f64, f64)] = &[(-0.10, 0.0), (0.0, 40.0), (0.10, 75.0), (0.25, 100.0)];
pub const EARNINGS_GROWTH_CURVE: &[(f64, f64)] = &[(-0.20, 0.0), (0.0, 40.0), (0.15, 75.0), (0.30, 100.0)];
/// Change in revenue growth rate versus the prior period.
pub const REVENUE_ACCELERATION_CURVE: &[(f64, f64)] = &[(-0.10, 0.0), (0.0, 50.0), (0.10, 100.0)];

// Profitability breakpoints (fractions)
pub const NET_MARGIN_CURVE: &[(f64, f64)] = &[(-0.10, 0.0), (0.0, 30.0), (0.10, 70.0), (0.20, 100.0)];
pub const OPERATING_MARGIN_CURVE: &[(f64, f64)] = &[(-0.10, 0.0), (0.0, 30.0), (0.15, 75.0), (0.25, 100.0)];
pub const GROSS_MARGIN_CURVE: &[(f64, f64)] = &[(0.10, 0.0), (0.30, 50.0), (0.60, 100.0)];
pub const RETURN_ON_EQUITY_CURVE: &[(f64, f64)] = &[(-0.05, 0.0), (0.05, 40.0), (0.15, 80.0), (0.25, 100.0)];
pub const FCF_MARGIN_CURVE: &[(f64, f64)] = &[(-0.10, 0.0), (0.0, 40.0), (0.15, 100.0)];

// Momentum breakpoints (percent for price and surprise, [-1, 1] for consensus)
pub const PRICE_CHANGE_PCT_CURVE: &[(f64, f64)] = &[(-20.0, 0.0), (0.0, 50.0), (20.0, 100.0)];
pub const EARNINGS_SURPRISE_PCT_CURVE: &[(f64, f64)] = &[(-10.0, 0.0), (0.0, 50.0), (10.0, 100.0)];
pub const ANALYST_CONSENSUS_CURVE: &[(f64, f64)] = &[(-1.0, 0.0), (0.0, 50.0), (1.0, 100.0)];

// Risk breakpoints
pub const VOLATILITY_CURVE: &[(f64, f64)] = &[(0.15, 100.0), (0.35, 50.0), (0.60, 0.0)];
pub const BETA_CURVE: &[(f64, f64)] = &[(0.8, 100.0), (1.2, 70.0), (2.0, 0.0)];

/// Weight of each sub-score in the overall health score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScoreWeights {
    pub balance_sheet: f64,
    pub growth: f64,
    pub profitability: f64,
    pub momentum: f64,
    pub risk: f64,
}

impl Default for SubScoreWeights {
    fn default() -> Self {
        Self {
            balance_sheet: W_BALANCE_SHEET,
            growth: W_GROWTH,
            profitability: W_PROFITABILITY,
            momentum: W_MOMENTUM,
            risk: W_RISK,
        }
    }
}

impl SubScoreWeights {
    pub fn get(&self, kind: SubScoreKind) -> f64 {
        match kind {
            SubScoreKind::BalanceSheet => self.balance_sheet,
            SubScoreKind::Growth => self.growth,
            SubScoreKind::Profitability => self.profitability,
            SubScoreKind::Momentum => self.momentum,
            SubScoreKind::Risk => self.risk,
        }
    }

    pub fn sum(&self) -> f64 {
        SubScoreKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        for kind in SubScoreKind::ALL {
            let w = self.get(kind);
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{} weight must be between 0 and 1, got {}",
                    kind.label(),
                    w
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AnalysisError::InvalidConfig(format!(
                "sub-score weights must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }
}

/// A raw-metric indicator: its curve and its weight inside the sub-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub weight: f64,
    pub curve: Curve,
}

impl Indicator {
    pub fn new(weight: f64, points: &'static [(f64, f64)]) -> Self {
        Self {
            weight,
            curve: Curve::from_constant(points),
        }
    }

    /// Flat curves are accepted; a curve pointing against `expected` is not.
    fn validate(&self, name: &str, expected: CurveDirection) -> Result<(), AnalysisError> {
        check_indicator_weight(name, self.weight)?;
        self.curve
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(format!("{}: {}", name, e)))?;
        match self.curve.direction() {
            CurveDirection::Flat => Ok(()),
            actual if actual == expected => Ok(()),
            actual => Err(AnalysisError::InvalidConfig(format!(
                "{} curve must be {:?}, got {:?}",
                name, expected, actual
            ))),
        }
    }
}

fn check_indicator_weight(name: &str, weight: f64) -> Result<(), AnalysisError> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(AnalysisError::InvalidConfig(format!(
            "{} indicator weight must be positive, got {}",
            name, weight
        )));
    }
    Ok(())
}

fn check_partial(name: &str, value: f64) -> Result<(), AnalysisError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(AnalysisError::InvalidConfig(format!(
            "{} score must be between 0 and 100, got {}",
            name, value
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceSheetIndicators {
    pub debt_to_equity: Indicator,
    pub current_ratio: Indicator,
    pub quick_ratio: Indicator,
    pub cash_to_debt: Indicator,
    pub cash_runway_years: Indicator,
}

impl Default for BalanceSheetIndicators {
    fn default() -> Self {
        Self {
            debt_to_equity: Indicator::new(0.35, DEBT_TO_EQUITY_CURVE),
            current_ratio: Indicator::new(0.25, CURRENT_RATIO_CURVE),
            quick_ratio: Indicator::new(0.10, QUICK_RATIO_CURVE),
            cash_to_debt: Indicator::new(0.15, CASH_TO_DEBT_CURVE),
            cash_runway_years: Indicator::new(0.15, CASH_RUNWAY_YEARS_CURVE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthIndicators {
    pub revenue_growth: Indicator,
    pub earnings_growth: Indicator,
    pub revenue_acceleration: Indicator,
}

impl Default for GrowthIndicators {
    fn default() -> Self {
        Self {
            revenue_growth: Indicator::new(0.50, REVENUE_GROWTH_CURVE),
            earnings_growth: Indicator::new(0.35, EARNINGS_GROWTH_CURVE),
            revenue_acceleration: Indicator::new(0.15, REVENUE_ACCELERATION_CURVE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfitabilityIndicators {
    pub net_margin: Indicator,
    pub operating_margin: Indicator,
    pub gross_margin: Indicator,
    pub return_on_equity: Indicator,
    pub free_cash_flow_margin: Indicator,
}

impl Default for ProfitabilityIndicators {
    fn default() -> Self {
        Self {
            net_margin: Indicator::new(0.40, NET_MARGIN_CURVE),
            operating_margin: Indicator::new(0.25, OPERATING_MARGIN_CURVE),
            gross_margin: Indicator::new(0.10, GROSS_MARGIN_CURVE),
            return_on_equity: Indicator::new(0.15, RETURN_ON_EQUITY_CURVE),
            free_cash_flow_margin: Indicator::new(0.10, FCF_MARGIN_CURVE),
        }
    }
}

/// Partial scores for each management guidance direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceScores {
    pub weight: f64,
    pub raised: f64,
    pub maintained: f64,
    pub lowered: f64,
}

impl Default for GuidanceScores {
    fn default() -> Self {
        Self {
            weight: 0.20,
            raised: 90.0,
            maintained: 55.0,
            lowered: 15.0,
        }
    }
}

impl GuidanceScores {
    fn validate(&self) -> Result<(), AnalysisError> {
        check_indicator_weight("guidance", self.weight)?;
        check_partial("guidance raised", self.raised)?;
        check_partial("guidance maintained", self.maintained)?;
        check_partial("guidance lowered", self.lowered)?;
        if !(self.lowered <= self.maintained && self.maintained <= self.raised) {
            return Err(AnalysisError::InvalidConfig(
                "guidance scores must satisfy lowered <= maintained <= raised".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumIndicators {
    pub price_change_pct: Indicator,
    pub earnings_surprise_pct: Indicator,
    pub guidance: GuidanceScores,
    pub analyst_consensus: Indicator,
}

impl Default for MomentumIndicators {
    fn default() -> Self {
        Self {
            price_change_pct: Indicator::new(0.40, PRICE_CHANGE_PCT_CURVE),
            earnings_surprise_pct: Indicator::new(0.20, EARNINGS_SURPRISE_PCT_CURVE),
            guidance: GuidanceScores::default(),
            analyst_consensus: Indicator::new(0.20, ANALYST_CONSENSUS_CURVE),
        }
    }
}

/// Points deducted from a clean 100 for each distinct red flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagPenalties {
    pub weight: f64,
    pub going_concern: f64,
    pub short_cash_runway: f64,
    pub covenant_breach: f64,
    pub restatement: f64,
    pub margin_compression: f64,
    pub decelerating_growth: f64,
    pub other: f64,
}

impl Default for FlagPenalties {
    fn default() -> Self {
        Self {
            weight: 0.50,
            going_concern: 60.0,
            short_cash_runway: 35.0,
            covenant_breach: 35.0,
            restatement: 30.0,
            margin_compression: 20.0,
            decelerating_growth: 15.0,
            other: 10.0,
        }
    }
}

impl FlagPenalties {
    pub fn penalty(&self, flag: RiskFlag) -> f64 {
        match flag {
            RiskFlag::GoingConcern => self.going_concern,
            RiskFlag::ShortCashRunway => self.short_cash_runway,
            RiskFlag::CovenantBreach => self.covenant_breach,
            RiskFlag::Restatement => self.restatement,
            RiskFlag::MarginCompression => self.margin_compression,
            RiskFlag::DeceleratingGrowth => self.decelerating_growth,
            RiskFlag::Other => self.other,
        }
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        check_indicator_weight("risk_flags", self.weight)?;
        for flag in [
            RiskFlag::GoingConcern,
            RiskFlag::ShortCashRunway,
            RiskFlag::CovenantBreach,
            RiskFlag::Restatement,
            RiskFlag::MarginCompression,
            RiskFlag::DeceleratingGrowth,
            RiskFlag::Other,
        ] {
            check_partial(flag.label(), self.penalty(flag))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskIndicators {
    pub risk_flags: FlagPenalties,
    pub volatility: Indicator,
    pub beta: Indicator,
}

impl Default for RiskIndicators {
    fn default() -> Self {
        Self {
            risk_flags: FlagPenalties::default(),
            volatility: Indicator::new(0.30, VOLATILITY_CURVE),
            beta: Indicator::new(0.20, BETA_CURVE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RationaleThresholds {
    /// Sub-scores below this get a concern entry
    pub concern: f64,
    /// Sub-scores above this get a strength entry
    pub strength: f64,
    pub max_entries: usize,
}

impl Default for RationaleThresholds {
    fn default() -> Self {
        Self {
            concern: CONCERN_THRESHOLD,
            strength: STRENGTH_THRESHOLD,
            max_entries: MAX_RATIONALE_ENTRIES,
        }
    }
}

impl RationaleThresholds {
    fn validate(&self) -> Result<(), AnalysisError> {
        check_partial("concern threshold", self.concern)?;
        check_partial("strength threshold", self.strength)?;
        if self.concern >= self.strength {
            return Err(AnalysisError::InvalidConfig(format!(
                "concern threshold ({}) must be below strength threshold ({})",
                self.concern, self.strength
            )));
        }
        if self.max_entries == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max rationale entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Immutable scoring configuration bound into a `FundamentalHealthScorer`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: SubScoreWeights,
    pub balance_sheet: BalanceSheetIndicators,
    pub growth: GrowthIndicators,
    pub profitability: ProfitabilityIndicators,
    pub momentum: MomentumIndicators,
    pub risk: RiskIndicators,
    pub rationale: RationaleThresholds,
}

impl ScoringConfig {
    /// Heavier balance-sheet and risk weighting, stricter rationale thresholds
    pub fn conservative() -> Self {
        Self {
            weights: SubScoreWeights {
                balance_sheet: 0.30,
                growth: 0.20,
                profitability: 0.20,
                momentum: 0.10,
                risk: 0.20,
            },
            rationale: RationaleThresholds {
                concern: 45.0,
                strength: 80.0,
                max_entries: MAX_RATIONALE_ENTRIES,
            },
            ..Self::default()
        }
    }

    /// Defaults overridden by `HEALTH_*` environment variables, then validated.
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let w = &mut config.weights;
        w.balance_sheet = override_from(&lookup, "HEALTH_WEIGHT_BALANCE_SHEET", w.balance_sheet)?;
        w.growth = override_from(&lookup, "HEALTH_WEIGHT_GROWTH", w.growth)?;
        w.profitability = override_from(&lookup, "HEALTH_WEIGHT_PROFITABILITY", w.profitability)?;
        w.momentum = override_from(&lookup, "HEALTH_WEIGHT_MOMENTUM", w.momentum)?;
        w.risk = override_from(&lookup, "HEALTH_WEIGHT_RISK", w.risk)?;

        let r = &mut config.rationale;
        r.concern = override_from(&lookup, "HEALTH_CONCERN_THRESHOLD", r.concern)?;
        r.strength = override_from(&lookup, "HEALTH_STRENGTH_THRESHOLD", r.strength)?;
        r.max_entries = override_from(&lookup, "HEALTH_MAX_RATIONALE", r.max_entries)?;

        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config. Omitted sections keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| AnalysisError::InvalidConfig(format!("malformed scoring config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.weights.validate()?;

        let b = &self.balance_sheet;
        b.debt_to_equity.validate("debt_to_equity", CurveDirection::LowerIsBetter)?;
        b.current_ratio.validate("current_ratio", CurveDirection::HigherIsBetter)?;
        b.quick_ratio.validate("quick_ratio", CurveDirection::HigherIsBetter)?;
        b.cash_to_debt.validate("cash_to_debt", CurveDirection::HigherIsBetter)?;
        b.cash_runway_years.validate("cash_runway_years", CurveDirection::HigherIsBetter)?;

        let g = &self.growth;
        g.revenue_growth.validate("revenue_growth", CurveDirection::HigherIsBetter)?;
        g.earnings_growth.validate("earnings_growth", CurveDirection::HigherIsBetter)?;
        g.revenue_acceleration.validate("revenue_acceleration", CurveDirection::HigherIsBetter)?;

        let p = &self.profitability;
        p.net_margin.validate("net_margin", CurveDirection::HigherIsBetter)?;
        p.operating_margin.validate("operating_margin", CurveDirection::HigherIsBetter)?;
        p.gross_margin.validate("gross_margin", CurveDirection::HigherIsBetter)?;
        p.return_on_equity.validate("return_on_equity", CurveDirection::HigherIsBetter)?;
        p.free_cash_flow_margin.validate("free_cash_flow_margin", CurveDirection::HigherIsBetter)?;

        let m = &self.momentum;
        m.price_change_pct.validate("price_change_pct", CurveDirection::HigherIsBetter)?;
        m.earnings_surprise_pct.validate("earnings_surprise_pct", CurveDirection::HigherIsBetter)?;
        m.analyst_consensus.validate("analyst_consensus", CurveDirection::HigherIsBetter)?;
        m.guidance.validate()?;

        let r = &self.risk;
        r.risk_flags.validate()?;
        r.volatility.validate("volatility", CurveDirection::LowerIsBetter)?;
        r.beta.validate("beta", CurveDirection::LowerIsBetter)?;

        self.rationale.validate()
    }
}

fn override_from<F, T>(lookup: &F, name: &str, current: T) -> Result<T, AnalysisError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AnalysisError::InvalidConfig(format!("{}={:?}: {}", name, raw, e))),
        None => Ok(current),
    }
}
