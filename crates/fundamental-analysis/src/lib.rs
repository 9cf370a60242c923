pub mod config;
pub mod indicators;
pub mod rationale;

use analysis_core::{
    AnalysisError, FinancialFactsBundle, HealthBand, HealthScoreResult, HealthScorer, SubScores,
};
use tracing::{debug, warn};

pub use config::ScoringConfig;
use indicators::{Component, TOTAL_INDICATORS};

/// Maps a normalized facts bundle to a 0-100 fundamental health score.
///
/// The scorer holds only its immutable configuration, so one instance can be
/// shared freely across threads and requests.
#[derive(Debug, Clone, Default)]
pub struct FundamentalHealthScorer {
    config: ScoringConfig,
}

impl FundamentalHealthScorer {
    pub fn new(config: ScoringConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    fn score_bundle(&self, bundle: &FinancialFactsBundle) -> Result<HealthScoreResult, AnalysisError> {
        bundle.validate()?;
        let cfg = &self.config;
        if bundle.ignored_fields.iter().any(|f| f == "as_of") {
            warn!("{}: unreadable as_of timestamp, using load time", bundle.ticker);
        }

        let balance_sheet = indicators::balance_sheet(bundle, &cfg.balance_sheet);
        let growth = indicators::growth(bundle, &cfg.growth);
        let profitability = indicators::profitability(bundle, &cfg.profitability);
        let momentum = indicators::momentum(bundle, &cfg.momentum);
        let risk = indicators::risk(bundle, &cfg.risk);
        let components = [balance_sheet, growth, profitability, momentum, risk];

        let mut weighted = 0.0;
        let mut indicators_present = 0usize;
        for component in &components {
            let sub = &component.sub_score;
            debug!(
                "{} {} sub-score {:.1} from {} indicator(s)",
                bundle.ticker,
                sub.kind.label(),
                sub.value,
                component.readings.len()
            );
            for note in &component.notes {
                warn!("{}: {}", bundle.ticker, note);
            }
            weighted += cfg.weights.get(sub.kind) * sub.value;
            indicators_present += component.readings.len();
        }

        let overall = weighted.round().clamp(0.0, 100.0) as u8;
        let rationale = rationale::build(&components, &cfg.rationale);
        let data_completeness = (indicators_present as f64 / TOTAL_INDICATORS as f64).min(1.0);

        let [balance_sheet, growth, profitability, momentum, risk] = components.map(|c: Component| c.sub_score);

        debug!("{} overall health score {}", bundle.ticker, overall);

        Ok(HealthScoreResult {
            ticker: bundle.ticker.trim().to_string(),
            as_of: bundle.as_of,
            overall,
            band: HealthBand::from_score(overall),
            sub_scores: SubScores {
                balance_sheet,
                growth,
                profitability,
                momentum,
                risk,
            },
            rationale,
            data_completeness,
        })
    }
}

impl HealthScorer for FundamentalHealthScorer {
    fn score(&self, bundle: &FinancialFactsBundle) -> Result<HealthScoreResult, AnalysisError> {
        self.score_bundle(bundle)
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use analysis_core::{AnalystRatings, GuidanceDirection, RiskFlag, SubScoreKind};
    use proptest::prelude::*;

    const NUMERIC_FIELDS: usize = 18;
    const EPSILON: f64 = 1e-9;

    /// Any metric value, including the ones the scorer has to substitute.
    fn metric() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![
            3 => Just(None),
            6 => (-1e6f64..1e6).prop_map(Some),
            2 => (-5.0f64..5.0).prop_map(Some),
            1 => any::<f64>().prop_map(Some),
            1 => prop_oneof![
                Just(f64::NAN),
                Just(f64::INFINITY),
                Just(f64::NEG_INFINITY),
                Just(f64::MAX),
                Just(f64::MIN),
                Just(0.0),
            ]
            .prop_map(Some),
        ]
    }

    fn guidance() -> impl Strategy<Value = Option<GuidanceDirection>> {
        prop::option::of(prop::sample::select(vec![
            GuidanceDirection::Raised,
            GuidanceDirection::Maintained,
            GuidanceDirection::Lowered,
        ]))
    }

    fn ratings() -> impl Strategy<Value = Option<AnalystRatings>> {
        prop::option::of(
            (any::<u32>(), any::<u32>(), any::<u32>())
                .prop_map(|(buy, hold, sell)| AnalystRatings { buy, hold, sell }),
        )
    }

    fn flags() -> impl Strategy<Value = Option<Vec<RiskFlag>>> {
        prop::option::of(prop::collection::vec(
            prop::sample::select(vec![
                RiskFlag::GoingConcern,
                RiskFlag::ShortCashRunway,
                RiskFlag::CovenantBreach,
                RiskFlag::Restatement,
                RiskFlag::MarginCompression,
                RiskFlag::DeceleratingGrowth,
                RiskFlag::Other,
            ]),
            0..6,
        ))
    }

    fn bundle_strategy() -> impl Strategy<Value = FinancialFactsBundle> {
        (
            prop::collection::vec(metric(), NUMERIC_FIELDS),
            guidance(),
            ratings(),
            flags(),
        )
            .prop_map(|(m, guidance, analyst_ratings, risk_flags)| {
                let mut b = FinancialFactsBundle::new("GEN");
                b.debt_to_equity = m[0];
                b.current_ratio = m[1];
                b.quick_ratio = m[2];
                b.total_cash = m[3];
                b.total_debt = m[4];
                b.annual_cash_burn = m[5];
                b.revenue_growth = m[6];
                b.earnings_growth = m[7];
                b.prior_revenue_growth = m[8];
                b.gross_margin = m[9];
                b.operating_margin = m[10];
                b.net_margin = m[11];
                b.return_on_equity = m[12];
                b.free_cash_flow_margin = m[13];
                b.price_change_pct = m[14];
                b.earnings_surprise_pct = m[15];
                b.volatility = m[16];
                b.beta = m[17];
                b.guidance = guidance;
                b.analyst_ratings = analyst_ratings;
                b.risk_flags = risk_flags;
                b
            })
    }

    /// One metric, the sub-score it feeds and which way it should push it.
    struct Knob {
        field: &'static str,
        kind: SubScoreKind,
        higher_is_better: bool,
        /// Smallest value inside the metric's valid domain.
        floor: f64,
        set: fn(&mut FinancialFactsBundle, f64),
    }

    impl Knob {
        fn higher(
            field: &'static str,
            kind: SubScoreKind,
            floor: f64,
            set: fn(&mut FinancialFactsBundle, f64),
        ) -> Self {
            Self { field, kind, higher_is_better: true, floor, set }
        }

        fn lower(
            field: &'static str,
            kind: SubScoreKind,
            floor: f64,
            set: fn(&mut FinancialFactsBundle, f64),
        ) -> Self {
            Self { field, kind, higher_is_better: false, floor, set }
        }
    }

    const UNBOUNDED: f64 = -1e9;

    fn knobs() -> Vec<Knob> {
        use SubScoreKind::*;
        vec![
            Knob::lower("debt_to_equity", BalanceSheet, 0.0, |b, v| b.debt_to_equity = Some(v)),
            Knob::higher("current_ratio", BalanceSheet, 0.0, |b, v| b.current_ratio = Some(v)),
            Knob::higher("quick_ratio", BalanceSheet, 0.0, |b, v| b.quick_ratio = Some(v)),
            Knob::higher("total_cash", BalanceSheet, 0.0, |b, v| b.total_cash = Some(v)),
            Knob::lower("total_debt", BalanceSheet, 0.0, |b, v| b.total_debt = Some(v)),
            Knob::lower("annual_cash_burn", BalanceSheet, UNBOUNDED, |b, v| {
                b.annual_cash_burn = Some(v)
            }),
            Knob::higher("revenue_growth", Growth, UNBOUNDED, |b, v| b.revenue_growth = Some(v)),
            Knob::higher("earnings_growth", Growth, UNBOUNDED, |b, v| b.earnings_growth = Some(v)),
            Knob::lower("prior_revenue_growth", Growth, UNBOUNDED, |b, v| {
                b.prior_revenue_growth = Some(v)
            }),
            Knob::higher("gross_margin", Profitability, UNBOUNDED, |b, v| b.gross_margin = Some(v)),
            Knob::higher("operating_margin", Profitability, UNBOUNDED, |b, v| {
                b.operating_margin = Some(v)
            }),
            Knob::higher("net_margin", Profitability, UNBOUNDED, |b, v| b.net_margin = Some(v)),
            Knob::higher("return_on_equity", Profitability, UNBOUNDED, |b, v| {
                b.return_on_equity = Some(v)
            }),
            Knob::higher("free_cash_flow_margin", Profitability, UNBOUNDED, |b, v| {
                b.free_cash_flow_margin = Some(v)
            }),
            Knob::higher("price_change_pct", Momentum, UNBOUNDED, |b, v| b.price_change_pct = Some(v)),
            Knob::higher("earnings_surprise_pct", Momentum, UNBOUNDED, |b, v| {
                b.earnings_surprise_pct = Some(v)
            }),
            Knob::lower("volatility", Risk, 0.0, |b, v| b.volatility = Some(v)),
            Knob::lower("beta", Risk, UNBOUNDED, |b, v| b.beta = Some(v)),
        ]
    }

    proptest! {
        /// Every score stays inside its range whatever the bundle holds.
        #[test]
        fn scores_stay_in_range(bundle in bundle_strategy()) {
            let scorer = FundamentalHealthScorer::default();
            let result = scorer.score(&bundle).unwrap();
            prop_assert!(result.overall <= 100);
            prop_assert_eq!(result.band, HealthBand::from_score(result.overall));
            for sub in result.sub_scores.iter() {
                prop_assert!((0.0..=100.0).contains(&sub.value), "{:?} = {}", sub.kind, sub.value);
            }
            prop_assert!((0.0..=1.0).contains(&result.data_completeness));
            prop_assert!(result.rationale.len() <= scorer.config().rationale.max_entries);
        }

        /// Scoring the same bundle twice gives the same result.
        #[test]
        fn scoring_is_idempotent(bundle in bundle_strategy()) {
            let scorer = FundamentalHealthScorer::default();
            prop_assert_eq!(scorer.score(&bundle).unwrap(), scorer.score(&bundle).unwrap());
        }

        /// Improving one metric never lowers the sub-score it feeds.
        #[test]
        fn improving_a_metric_never_lowers_its_sub_score(
            bundle in bundle_strategy(),
            knob in 0..NUMERIC_FIELDS,
            a in -1e9f64..1e9,
            b in -1e9f64..1e9,
        ) {
            let knobs = knobs();
            let knob = &knobs[knob];
            let low_value = a.min(b).max(knob.floor);
            let high_value = a.max(b).max(knob.floor);

            let mut low = bundle.clone();
            (knob.set)(&mut low, low_value);
            let mut high = bundle;
            (knob.set)(&mut high, high_value);

            let scorer = FundamentalHealthScorer::default();
            let low_score = scorer.score(&low).unwrap().sub_scores.get(knob.kind).value;
            let high_score = scorer.score(&high).unwrap().sub_scores.get(knob.kind).value;
            let (better, worse) = if knob.higher_is_better {
                (high_score, low_score)
            } else {
                (low_score, high_score)
            };
            prop_assert!(
                better >= worse - EPSILON,
                "{}: {} -> {}, {} -> {}",
                knob.field, low_value, low_score, high_value, high_score
            );
        }
    }
}
