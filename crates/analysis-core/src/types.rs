use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::AnalysisError;

/// Score assigned to a sub-score that has no usable indicators.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Management guidance change reported in the latest earnings cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceDirection {
    Raised,
    Maintained,
    Lowered,
}

/// Red flags surfaced from filings and commentary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    GoingConcern,
    ShortCashRunway,
    CovenantBreach,
    Restatement,
    MarginCompression,
    DeceleratingGrowth,
    #[serde(other)]
    Other,
}

impl RiskFlag {
    pub fn label(&self) -> &'static str {
        match self {
            RiskFlag::GoingConcern => "going-concern warning",
            RiskFlag::ShortCashRunway => "cash runway under two years",
            RiskFlag::CovenantBreach => "debt covenant breach",
            RiskFlag::Restatement => "financial restatement",
            RiskFlag::MarginCompression => "shrinking margins",
            RiskFlag::DeceleratingGrowth => "slowing growth",
            RiskFlag::Other => "other red flag",
        }
    }
}

/// Analyst rating distribution (aggregated counts)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystRatings {
    #[serde(default)]
    pub buy: u32,
    #[serde(default)]
    pub hold: u32,
    #[serde(default)]
    pub sell: u32,
}

impl AnalystRatings {
    pub fn total(&self) -> u64 {
        u64::from(self.buy) + u64::from(self.hold) + u64::from(self.sell)
    }

    /// Net bullishness in [-1, 1]: (buy - sell) / total. `None` with no ratings.
    pub fn net_consensus(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some((self.buy as f64 - self.sell as f64) / total as f64)
    }
}

/// Normalized financial facts for one ticker, built by the upstream provider.
///
/// Ratios and margins are fractions (`0.18` = 18%). Price change and earnings
/// surprise are percentages (`8.0` = +8%). Every metric is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialFactsBundle {
    pub ticker: String,
    #[serde(default = "Utc::now")]
    pub as_of: DateTime<Utc>,

    // Balance sheet
    #[serde(default)]
    pub debt_to_equity: Option<f64>,
    #[serde(default)]
    pub current_ratio: Option<f64>,
    #[serde(default)]
    pub quick_ratio: Option<f64>,
    #[serde(default)]
    pub total_cash: Option<f64>,
    #[serde(default)]
    pub total_debt: Option<f64>,
    /// Positive when the company is burning cash.
    #[serde(default)]
    pub annual_cash_burn: Option<f64>,

    // Growth
    #[serde(default)]
    pub revenue_growth: Option<f64>,
    #[serde(default)]
    pub earnings_growth: Option<f64>,
    #[serde(default)]
    pub prior_revenue_growth: Option<f64>,

    // Profitability
    #[serde(default)]
    pub gross_margin: Option<f64>,
    #[serde(default)]
    pub operating_margin: Option<f64>,
    #[serde(default)]
    pub net_margin: Option<f64>,
    #[serde(default)]
    pub return_on_equity: Option<f64>,
    #[serde(default)]
    pub free_cash_flow_margin: Option<f64>,

    // Momentum
    #[serde(default)]
    pub price_change_pct: Option<f64>,
    #[serde(default)]
    pub earnings_surprise_pct: Option<f64>,
    #[serde(default)]
    pub guidance: Option<GuidanceDirection>,
    #[serde(default)]
    pub analyst_ratings: Option<AnalystRatings>,

    // Risk
    #[serde(default)]
    pub volatility: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    /// `None` means unknown; `Some(vec![])` means checked and clean.
    #[serde(default)]
    pub risk_flags: Option<Vec<RiskFlag>>,

    /// Fields whose values could not be read and were replaced by defaults
    /// during `from_json`/`from_value`.
    #[serde(skip)]
    pub ignored_fields: Vec<String>,
}

impl FinancialFactsBundle {
    /// Ticker-only bundle stamped with the current time.
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            as_of: Utc::now(),
            debt_to_equity: None,
            current_ratio: None,
            quick_ratio: None,
            total_cash: None,
            total_debt: None,
            annual_cash_burn: None,
            revenue_growth: None,
            earnings_growth: None,
            prior_revenue_growth: None,
            gross_margin: None,
            operating_margin: None,
            net_margin: None,
            return_on_equity: None,
            free_cash_flow_margin: None,
            price_change_pct: None,
            earnings_surprise_pct: None,
            guidance: None,
            analyst_ratings: None,
            volatility: None,
            beta: None,
            risk_flags: None,
            ignored_fields: Vec::new(),
        }
    }

    /// Parse a provider document.
    ///
    /// Only a document that is not a JSON object, or one without a usable
    /// ticker, is `InvalidInput`. Indicator values of the wrong type are
    /// dropped and listed in `ignored_fields`; unrecognized red flags become
    /// `RiskFlag::Other`.
    pub fn from_json(raw: &str) -> Result<Self, AnalysisError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AnalysisError::InvalidInput(format!("facts bundle is not JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Same as `from_json` for an already-parsed document.
    pub fn from_value(value: Value) -> Result<Self, AnalysisError> {
        let Value::Object(mut fields) = value else {
            return Err(AnalysisError::InvalidInput(
                "facts bundle must be a JSON object".to_string(),
            ));
        };
        let ignored_fields = drop_unreadable_fields(&mut fields);
        let mut bundle: Self = serde_json::from_value(Value::Object(fields))
            .map_err(|e| AnalysisError::InvalidInput(format!("malformed facts bundle: {}", e)))?;
        bundle.ignored_fields = ignored_fields;
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.ticker.trim().is_empty() {
            return Err(AnalysisError::InvalidInput(
                "ticker symbol must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_balance_sheet(mut self, debt_to_equity: f64, current_ratio: f64) -> Self {
        self.debt_to_equity = Some(debt_to_equity);
        self.current_ratio = Some(current_ratio);
        self
    }

    pub fn with_cash_position(mut self, total_cash: f64, total_debt: f64, annual_cash_burn: Option<f64>) -> Self {
        self.total_cash = Some(total_cash);
        self.total_debt = Some(total_debt);
        self.annual_cash_burn = annual_cash_burn;
        self
    }

    pub fn with_growth(mut self, revenue_growth: f64, earnings_growth: Option<f64>) -> Self {
        self.revenue_growth = Some(revenue_growth);
        self.earnings_growth = earnings_growth;
        self
    }

    pub fn with_net_margin(mut self, net_margin: f64) -> Self {
        self.net_margin = Some(net_margin);
        self
    }

    pub fn with_price_change_pct(mut self, pct: f64) -> Self {
        self.price_change_pct = Some(pct);
        self
    }

    pub fn with_risk_flags(mut self, flags: Vec<RiskFlag>) -> Self {
        self.risk_flags = Some(flags);
        self
    }
}

const NUMERIC_FIELDS: [&str; 18] = [
    "debt_to_equity",
    "current_ratio",
    "quick_ratio",
    "total_cash",
    "total_debt",
    "annual_cash_burn",
    "revenue_growth",
    "earnings_growth",
    "prior_revenue_growth",
    "gross_margin",
    "operating_margin",
    "net_margin",
    "return_on_equity",
    "free_cash_flow_margin",
    "price_change_pct",
    "earnings_surprise_pct",
    "volatility",
    "beta",
];

fn fits<T: DeserializeOwned>(value: &Value) -> bool {
    T::deserialize(value).is_ok()
}

/// Strip every optional field whose value does not have the expected shape and
/// return their names. Nulls count as absent. Red-flag entries that are not
/// known flag names are rewritten to `other`.
fn drop_unreadable_fields(fields: &mut Map<String, Value>) -> Vec<String> {
    let mut ignored = Vec::new();

    fields.retain(|name, value| {
        if value.is_null() {
            return name == "ticker";
        }
        let readable = match name.as_str() {
            "as_of" => fits::<DateTime<Utc>>(value),
            "guidance" => fits::<GuidanceDirection>(value),
            "analyst_ratings" => fits::<AnalystRatings>(value),
            "risk_flags" => value.is_array(),
            n if NUMERIC_FIELDS.contains(&n) => fits::<f64>(value),
            _ => true,
        };
        if !readable {
            ignored.push(name.clone());
        }
        readable
    });

    if let Some(Value::Array(entries)) = fields.get_mut("risk_flags") {
        let mut unrecognized = false;
        for entry in entries.iter_mut() {
            let known = match RiskFlag::deserialize(&*entry) {
                Ok(RiskFlag::Other) => entry.as_str() == Some("other"),
                Ok(_) => true,
                Err(_) => false,
            };
            if !known {
                unrecognized = true;
                *entry = Value::from("other");
            }
        }
        if unrecognized {
            ignored.push("risk_flags".to_string());
        }
    }

    ignored
}

/// The five components of the health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubScoreKind {
    BalanceSheet,
    Growth,
    Profitability,
    Momentum,
    Risk,
}

impl SubScoreKind {
    pub const ALL: [SubScoreKind; 5] = [
        SubScoreKind::BalanceSheet,
        SubScoreKind::Growth,
        SubScoreKind::Profitability,
        SubScoreKind::Momentum,
        SubScoreKind::Risk,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SubScoreKind::BalanceSheet => "balance-sheet",
            SubScoreKind::Growth => "growth",
            SubScoreKind::Profitability => "profitability",
            SubScoreKind::Momentum => "momentum",
            SubScoreKind::Risk => "risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    pub kind: SubScoreKind,
    /// 0 to 100
    pub value: f64,
    /// Bundle fields that contributed to the value.
    pub inputs: Vec<String>,
    pub insufficient_data: bool,
}

impl SubScore {
    pub fn neutral(kind: SubScoreKind) -> Self {
        Self {
            kind,
            value: NEUTRAL_SCORE,
            inputs: Vec::new(),
            insufficient_data: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub balance_sheet: SubScore,
    pub growth: SubScore,
    pub profitability: SubScore,
    pub momentum: SubScore,
    pub risk: SubScore,
}

impl SubScores {
    pub fn get(&self, kind: SubScoreKind) -> &SubScore {
        match kind {
            SubScoreKind::BalanceSheet => &self.balance_sheet,
            SubScoreKind::Growth => &self.growth,
            SubScoreKind::Profitability => &self.profitability,
            SubScoreKind::Momentum => &self.momentum,
            SubScoreKind::Risk => &self.risk,
        }
    }

    /// Sub-scores in fixed order: balance sheet, growth, profitability, momentum, risk.
    pub fn iter(&self) -> impl Iterator<Item = &SubScore> {
        SubScoreKind::ALL.into_iter().map(move |k| self.get(k))
    }
}

/// Color-coded bucket of the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Strong,
    Stable,
    Weak,
    Distressed,
}

impl HealthBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 80 => HealthBand::Strong,
            s if s >= 60 => HealthBand::Stable,
            s if s >= 40 => HealthBand::Weak,
            _ => HealthBand::Distressed,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            HealthBand::Strong => "Strong",
            HealthBand::Stable => "Stable",
            HealthBand::Weak => "Weak",
            HealthBand::Distressed => "Distressed",
        }
    }

    pub fn indicator(&self) -> &'static str {
        match self {
            HealthBand::Strong => "🟢",
            HealthBand::Stable => "🟡",
            HealthBand::Weak => "🟠",
            HealthBand::Distressed => "🔴",
        }
    }
}

/// Fundamental health score for one bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScoreResult {
    pub ticker: String,
    pub as_of: DateTime<Utc>,
    /// 0 to 100
    pub overall: u8,
    pub band: HealthBand,
    pub sub_scores: SubScores,
    pub rationale: Vec<String>,
    /// Fraction of indicators that had usable input (0.0 to 1.0)
    pub data_completeness: f64,
}
