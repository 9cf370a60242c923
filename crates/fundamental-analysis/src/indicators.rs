//! Per-sub-score indicator evaluation.
//!
//! Each function reads its slice of the bundle, turns every usable metric into a
//! partial score and collects them in a `Component`. Unusable values never fail:
//! they are skipped (or substituted) and leave a data-quality note behind.

use std::collections::HashSet;

use analysis_core::{
    weighted_average, FinancialFactsBundle, GuidanceDirection, SubScore, SubScoreKind,
    NEUTRAL_SCORE,
};

use crate::config::{
    BalanceSheetIndicators, GrowthIndicators, Indicator, MomentumIndicators,
    ProfitabilityIndicators, RiskIndicators,
};

pub const BALANCE_SHEET_INDICATORS: usize = 5;
pub const GROWTH_INDICATORS: usize = 3;
pub const PROFITABILITY_INDICATORS: usize = 5;
pub const MOMENTUM_INDICATORS: usize = 4;
pub const RISK_INDICATORS: usize = 3;

pub const TOTAL_INDICATORS: usize = BALANCE_SHEET_INDICATORS
    + GROWTH_INDICATORS
    + PROFITABILITY_INDICATORS
    + MOMENTUM_INDICATORS
    + RISK_INDICATORS;

/// One indicator that contributed to a sub-score
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub indicator: &'static str,
    pub weight: f64,
    pub partial: f64,
    /// Overrides the stock phrase in rationale text.
    pub detail: Option<String>,
}

/// A computed sub-score plus what drove it
#[derive(Debug, Clone)]
pub struct Component {
    pub sub_score: SubScore,
    pub readings: Vec<Reading>,
    pub notes: Vec<String>,
}

#[derive(Default)]
struct Collector {
    readings: Vec<Reading>,
    inputs: Vec<String>,
    notes: Vec<String>,
}

impl Collector {
    fn new(bundle: &FinancialFactsBundle, fields: &[&str]) -> Self {
        let mut c = Self::default();
        for field in bundle.ignored_fields.iter().filter(|f| fields.contains(&f.as_str())) {
            c.notes.push(format!("Ignored unreadable {} value", field));
        }
        c
    }

    /// Drops non-finite values with a note.
    fn finite(&mut self, field: &'static str, value: Option<f64>) -> Option<f64> {
        match value {
            Some(v) if v.is_finite() => Some(v),
            Some(v) => {
                self.notes.push(format!("Ignored non-finite {} value ({})", field, v));
                None
            }
            None => None,
        }
    }

    /// Drops negative values for metrics that cannot be negative.
    fn non_negative(&mut self, field: &'static str, value: Option<f64>) -> Option<f64> {
        match self.finite(field, value) {
            Some(v) if v < 0.0 => {
                self.notes.push(format!("Ignored out-of-range {} value ({})", field, v));
                None
            }
            other => other,
        }
    }

    fn consult(&mut self, field: &'static str) {
        if !self.inputs.iter().any(|f| f == field) {
            self.inputs.push(field.to_string());
        }
    }

    fn push(&mut self, indicator: &'static str, weight: f64, partial: f64) {
        self.push_detailed(indicator, weight, partial, None);
    }

    fn push_detailed(&mut self, indicator: &'static str, weight: f64, partial: f64, detail: Option<String>) {
        self.readings.push(Reading {
            indicator,
            weight,
            partial,
            detail,
        });
    }

    /// Score a single-field indicator through its curve.
    fn curve(&mut self, field: &'static str, indicator: &Indicator, value: Option<f64>) {
        if let Some(v) = value {
            self.consult(field);
            self.push(field, indicator.weight, indicator.curve.score(v));
        }
    }

    fn finish(self, kind: SubScoreKind) -> Component {
        let parts: Vec<(f64, f64)> = self.readings.iter().map(|r| (r.weight, r.partial)).collect();
        let sub_score = match weighted_average(&parts) {
            Some(value) => SubScore {
                kind,
                value: value.clamp(0.0, 100.0),
                inputs: self.inputs,
                insufficient_data: false,
            },
            None => SubScore {
                kind,
                value: NEUTRAL_SCORE,
                inputs: self.inputs,
                insufficient_data: true,
            },
        };
        Component {
            sub_score,
            readings: self.readings,
            notes: self.notes,
        }
    }
}

pub fn balance_sheet(bundle: &FinancialFactsBundle, cfg: &BalanceSheetIndicators) -> Component {
    let mut c = Collector::new(
        bundle,
        &[
            "debt_to_equity",
            "current_ratio",
            "quick_ratio",
            "total_cash",
            "total_debt",
            "annual_cash_burn",
        ],
    );

    if let Some(d2e) = c.finite("debt_to_equity", bundle.debt_to_equity) {
        c.consult("debt_to_equity");
        if d2e < 0.0 {
            // Negative D/E means negative shareholder equity, not low leverage
            c.notes.push(format!(
                "Negative shareholder equity (debt-to-equity {:.2}) scored as 0",
                d2e
            ));
            c.push_detailed(
                "debt_to_equity",
                cfg.debt_to_equity.weight,
                0.0,
                Some("negative shareholder equity".to_string()),
            );
        } else {
            c.push("debt_to_equity", cfg.debt_to_equity.weight, cfg.debt_to_equity.curve.score(d2e));
        }
    }

    let current = c.non_negative("current_ratio", bundle.current_ratio);
    c.curve("current_ratio", &cfg.current_ratio, current);

    let quick = c.non_negative("quick_ratio", bundle.quick_ratio);
    c.curve("quick_ratio", &cfg.quick_ratio, quick);

    let cash = c.non_negative("total_cash", bundle.total_cash);
    let debt = c.non_negative("total_debt", bundle.total_debt);
    if let (Some(cash), Some(debt)) = (cash, debt) {
        let ratio = if debt > 0.0 {
            Some(cash / debt)
        } else if cash > 0.0 {
            // Debt-free with cash on hand: top of the curve
            Some(f64::INFINITY)
        } else {
            None
        };
        if let Some(ratio) = ratio {
            c.consult("total_cash");
            c.consult("total_debt");
            c.push("cash_to_debt", cfg.cash_to_debt.weight, cfg.cash_to_debt.curve.score(ratio));
        }
    }

    if let Some(burn) = c.finite("annual_cash_burn", bundle.annual_cash_burn) {
        if burn <= 0.0 {
            c.consult("annual_cash_burn");
            c.push_detailed(
                "cash_runway_years",
                cfg.cash_runway_years.weight,
                cfg.cash_runway_years.curve.score(f64::INFINITY),
                Some("self-funding operations".to_string()),
            );
        } else if let Some(cash) = cash {
            let years = cash / burn;
            c.consult("annual_cash_burn");
            c.consult("total_cash");
            c.push_detailed(
                "cash_runway_years",
                cfg.cash_runway_years.weight,
                cfg.cash_runway_years.curve.score(years),
                Some(format!("{:.1} years of cash runway", years)),
            );
        }
    }

    c.finish(SubScoreKind::BalanceSheet)
}

pub fn growth(bundle: &FinancialFactsBundle, cfg: &GrowthIndicators) -> Component {
    let mut c = Collector::new(bundle, &["revenue_growth", "earnings_growth", "prior_revenue_growth"]);

    let revenue = c.finite("revenue_growth", bundle.revenue_growth);
    c.curve("revenue_growth", &cfg.revenue_growth, revenue);

    let earnings = c.finite("earnings_growth", bundle.earnings_growth);
    c.curve("earnings_growth", &cfg.earnings_growth, earnings);

    let prior = c.finite("prior_revenue_growth", bundle.prior_revenue_growth);
    if let (Some(current), Some(prior)) = (revenue, prior) {
        c.consult("prior_revenue_growth");
        let delta = current - prior;
        c.push(
            "revenue_acceleration",
            cfg.revenue_acceleration.weight,
            cfg.revenue_acceleration.curve.score(delta),
        );
    }

    c.finish(SubScoreKind::Growth)
}

pub fn profitability(bundle: &FinancialFactsBundle, cfg: &ProfitabilityIndicators) -> Component {
    let mut c = Collector::new(
        bundle,
        &[
            "net_margin",
            "operating_margin",
            "gross_margin",
            "return_on_equity",
            "free_cash_flow_margin",
        ],
    );

    let net = c.finite("net_margin", bundle.net_margin);
    c.curve("net_margin", &cfg.net_margin, net);

    let operating = c.finite("operating_margin", bundle.operating_margin);
    c.curve("operating_margin", &cfg.operating_margin, operating);

    let gross = c.finite("gross_margin", bundle.gross_margin);
    c.curve("gross_margin", &cfg.gross_margin, gross);

    let roe = c.finite("return_on_equity", bundle.return_on_equity);
    c.curve("return_on_equity", &cfg.return_on_equity, roe);

    let fcf = c.finite("free_cash_flow_margin", bundle.free_cash_flow_margin);
    c.curve("free_cash_flow_margin", &cfg.free_cash_flow_margin, fcf);

    c.finish(SubScoreKind::Profitability)
}

pub fn momentum(bundle: &FinancialFactsBundle, cfg: &MomentumIndicators) -> Component {
    let mut c = Collector::new(
        bundle,
        &["price_change_pct", "earnings_surprise_pct", "guidance", "analyst_ratings"],
    );

    let price = c.finite("price_change_pct", bundle.price_change_pct);
    c.curve("price_change_pct", &cfg.price_change_pct, price);

    let surprise = c.finite("earnings_surprise_pct", bundle.earnings_surprise_pct);
    c.curve("earnings_surprise_pct", &cfg.earnings_surprise_pct, surprise);

    if let Some(direction) = bundle.guidance {
        let (partial, detail) = match direction {
            GuidanceDirection::Raised => (cfg.guidance.raised, "raised guidance"),
            GuidanceDirection::Maintained => (cfg.guidance.maintained, "maintained guidance"),
            GuidanceDirection::Lowered => (cfg.guidance.lowered, "lowered guidance"),
        };
        c.consult("guidance");
        c.push_detailed("guidance", cfg.guidance.weight, partial, Some(detail.to_string()));
    }

    if let Some(ratings) = bundle.analyst_ratings {
        match ratings.net_consensus() {
            Some(net) => {
                c.consult("analyst_ratings");
                c.push(
                    "analyst_consensus",
                    cfg.analyst_consensus.weight,
                    cfg.analyst_consensus.curve.score(net),
                );
            }
            None => c.notes.push("Ignored analyst_ratings with no ratings".to_string()),
        }
    }

    c.finish(SubScoreKind::Momentum)
}

pub fn risk(bundle: &FinancialFactsBundle, cfg: &RiskIndicators) -> Component {
    let mut c = Collector::new(bundle, &["volatility", "beta"]);

    if let Some(flags) = &bundle.risk_flags {
        let mut seen = HashSet::new();
        let distinct: Vec<_> = flags.iter().copied().filter(|f| seen.insert(*f)).collect();
        let penalty: f64 = distinct.iter().map(|f| cfg.risk_flags.penalty(*f)).sum();
        let detail = if distinct.is_empty() {
            None
        } else {
            let labels: Vec<&str> = distinct.iter().map(|f| f.label()).collect();
            Some(format!("red flags ({})", labels.join(", ")))
        };
        c.consult("risk_flags");
        c.push_detailed("risk_flags", cfg.risk_flags.weight, (100.0 - penalty).max(0.0), detail);
    }
    if bundle.ignored_fields.iter().any(|f| f == "risk_flags") {
        c.notes.push(if bundle.risk_flags.is_some() {
            "Unrecognized risk_flags entries scored as other red flag".to_string()
        } else {
            "Ignored unreadable risk_flags value".to_string()
        });
    }

    let volatility = c.non_negative("volatility", bundle.volatility);
    c.curve("volatility", &cfg.volatility, volatility);

    let beta = c.finite("beta", bundle.beta);
    c.curve("beta", &cfg.beta, beta);

    c.finish(SubScoreKind::Risk)
}
