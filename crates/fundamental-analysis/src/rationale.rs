use std::cmp::Ordering;

use analysis_core::NEUTRAL_SCORE;

use crate::config::RationaleThresholds;
use crate::indicators::{Component, Reading};

const MAX_DRIVERS: usize = 2;

/// Entry ranks: threshold crossings first, then missing sub-scores, then data-quality notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Threshold,
    InsufficientData,
    DataQuality,
}

struct Entry {
    rank: Rank,
    deviation: f64,
    text: String,
}

fn phrase(indicator: &str, favorable: bool) -> &'static str {
    match (indicator, favorable) {
        ("debt_to_equity", true) => "low debt-to-equity ratio",
        ("debt_to_equity", false) => "high debt-to-equity ratio",
        ("current_ratio", true) => "strong current ratio",
        ("current_ratio", false) => "weak current ratio",
        ("quick_ratio", true) => "strong quick ratio",
        ("quick_ratio", false) => "weak quick ratio",
        ("cash_to_debt", true) => "cash covering debt",
        ("cash_to_debt", false) => "thin cash against debt",
        ("cash_runway_years", true) => "long cash runway",
        ("cash_runway_years", false) => "short cash runway",
        ("revenue_growth", true) => "strong revenue growth",
        ("revenue_growth", false) => "weak revenue growth",
        ("earnings_growth", true) => "strong earnings growth",
        ("earnings_growth", false) => "weak earnings growth",
        ("revenue_acceleration", true) => "accelerating revenue",
        ("revenue_acceleration", false) => "decelerating revenue",
        ("net_margin", true) => "high net margin",
        ("net_margin", false) => "low net margin",
        ("operating_margin", true) => "high operating margin",
        ("operating_margin", false) => "low operating margin",
        ("gross_margin", true) => "high gross margin",
        ("gross_margin", false) => "low gross margin",
        ("return_on_equity", true) => "strong return on equity",
        ("return_on_equity", false) => "weak return on equity",
        ("free_cash_flow_margin", true) => "strong free cash flow",
        ("free_cash_flow_margin", false) => "negative or thin free cash flow",
        ("price_change_pct", true) => "positive price momentum",
        ("price_change_pct", false) => "negative price momentum",
        ("earnings_surprise_pct", true) => "earnings beat",
        ("earnings_surprise_pct", false) => "earnings miss",
        ("analyst_consensus", true) => "bullish analyst consensus",
        ("analyst_consensus", false) => "bearish analyst consensus",
        ("risk_flags", true) => "no red flags",
        ("risk_flags", false) => "red flags",
        ("volatility", true) => "low volatility",
        ("volatility", false) => "high volatility",
        ("beta", true) => "low beta",
        ("beta", false) => "high beta",
        (_, true) => "favorable indicators",
        (_, false) => "unfavorable indicators",
    }
}

fn describe(reading: &Reading, favorable: bool) -> String {
    reading
        .detail
        .clone()
        .unwrap_or_else(|| phrase(reading.indicator, favorable).to_string())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Up to two readings pulling the sub-score in the given direction.
fn drivers(readings: &[Reading], favorable: bool) -> Vec<String> {
    let mut picked: Vec<&Reading> = readings
        .iter()
        .filter(|r| (r.partial >= NEUTRAL_SCORE) == favorable)
        .collect();
    picked.sort_by(|a, b| {
        let ord = a.partial.partial_cmp(&b.partial).unwrap_or(Ordering::Equal);
        if favorable { ord.reverse() } else { ord }
    });
    picked
        .into_iter()
        .take(MAX_DRIVERS)
        .map(|r| describe(r, favorable))
        .collect()
}

fn threshold_entry(component: &Component, thresholds: &RationaleThresholds) -> Option<Entry> {
    let score = &component.sub_score;
    let label = score.kind.label();
    let favorable = if score.value > thresholds.strength {
        true
    } else if score.value < thresholds.concern {
        false
    } else {
        return None;
    };

    let names = drivers(&component.readings, favorable);
    let text = if names.is_empty() {
        let quality = if favorable { "Strong" } else { "Weak" };
        format!("{} {} score ({:.0})", quality, label, score.value)
    } else {
        let verb = match (favorable, names.len()) {
            (true, 1) => "lifts",
            (true, _) => "lift",
            (false, 1) => "reduces",
            (false, _) => "reduce",
        };
        format!(
            "{} {} {} score to {:.0}",
            capitalize(&names.join(" and ")),
            verb,
            label,
            score.value
        )
    };

    Some(Entry {
        rank: Rank::Threshold,
        deviation: (score.value - NEUTRAL_SCORE).abs(),
        text,
    })
}

/// Build the bounded rationale list for a set of computed sub-scores.
///
/// Threshold crossings come first, largest deviation from neutral first (ties keep
/// sub-score order), then insufficient-data entries, then data-quality notes.
pub fn build(components: &[Component], thresholds: &RationaleThresholds) -> Vec<String> {
    let mut entries: Vec<Entry> = Vec::new();

    for component in components {
        if component.sub_score.insufficient_data {
            entries.push(Entry {
                rank: Rank::InsufficientData,
                deviation: 0.0,
                text: format!(
                    "Insufficient data for {} score; using neutral {:.0}",
                    component.sub_score.kind.label(),
                    NEUTRAL_SCORE
                ),
            });
        } else if let Some(entry) = threshold_entry(component, thresholds) {
            entries.push(entry);
        }
        for note in &component.notes {
            entries.push(Entry {
                rank: Rank::DataQuality,
                deviation: 0.0,
                text: note.clone(),
            });
        }
    }

    // Stable sort keeps sub-score order among equals
    entries.sort_by(|a, b| {
        a.rank.cmp(&b.rank).then_with(|| {
            b.deviation
                .partial_cmp(&a.deviation)
                .unwrap_or(Ordering::Equal)
        })
    });
    entries
        .into_iter()
        .take(thresholds.max_entries)
        .map(|e| e.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{SubScore, SubScoreKind};

    fn component(kind: SubScoreKind, value: f64, readings: Vec<(&'static str, f64)>) -> Component {
        Component {
            sub_score: SubScore {
                kind,
                value,
                inputs: readings.iter().map(|(f, _)| f.to_string()).collect(),
                insufficient_data: false,
            },
            readings: readings
                .into_iter()
                .map(|(indicator, partial)| Reading {
                    indicator,
                    weight: 1.0,
                    partial,
                    detail: None,
                })
                .collect(),
            notes: Vec::new(),
        }
    }

    fn neutral(kind: SubScoreKind) -> Component {
        Component {
            sub_score: SubScore::neutral(kind),
            readings: Vec::new(),
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_concern_names_driving_indicator() {
        let c = component(SubScoreKind::BalanceSheet, 12.0, vec![("debt_to_equity", 0.0), ("current_ratio", 60.0)]);
        let lines = build(&[c], &RationaleThresholds::default());
        assert_eq!(lines, vec!["High debt-to-equity ratio reduces balance-sheet score to 12".to_string()]);
    }

    #[test]
    fn test_strength_names_top_two() {
        let c = component(
            SubScoreKind::Profitability,
            92.0,
            vec![("gross_margin", 80.0), ("net_margin", 100.0), ("return_on_equity", 95.0)],
        );
        let lines = build(&[c], &RationaleThresholds::default());
        assert_eq!(
            lines,
            vec!["High net margin and strong return on equity lift profitability score to 92".to_string()]
        );
    }

    #[test]
    fn test_middle_scores_are_silent() {
        let c = component(SubScoreKind::Growth, 60.0, vec![("revenue_growth", 60.0)]);
        assert!(build(&[c], &RationaleThresholds::default()).is_empty());
        // Boundaries are exclusive
        let c = component(SubScoreKind::Growth, 75.0, vec![("revenue_growth", 75.0)]);
        assert!(build(&[c], &RationaleThresholds::default()).is_empty());
        let c = component(SubScoreKind::Growth, 40.0, vec![("revenue_growth", 40.0)]);
        assert!(build(&[c], &RationaleThresholds::default()).is_empty());
    }

    #[test]
    fn test_ordering_and_cap() {
        let mut noisy = component(SubScoreKind::Momentum, 30.0, vec![("price_change_pct", 30.0)]);
        noisy.notes.push("Ignored non-finite earnings_surprise_pct value (NaN)".to_string());
        let components = vec![
            component(SubScoreKind::BalanceSheet, 80.0, vec![("debt_to_equity", 80.0)]),
            neutral(SubScoreKind::Growth),
            component(SubScoreKind::Profitability, 5.0, vec![("net_margin", 5.0)]),
            noisy,
            neutral(SubScoreKind::Risk),
        ];
        let thresholds = RationaleThresholds::default();
        let lines = build(&components, &thresholds);
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("profitability")); // deviation 45
        assert!(lines[1].contains("balance-sheet")); // deviation 30
        assert!(lines[2].contains("momentum")); // deviation 20
        assert!(lines[3].starts_with("Insufficient data for growth"));
        assert!(lines[4].starts_with("Insufficient data for risk"));

        let capped = build(&components, &RationaleThresholds { max_entries: 2, ..thresholds });
        assert_eq!(capped.len(), 2);
        assert!(capped[0].contains("profitability"));
    }

    #[test]
    fn test_detail_overrides_phrase() {
        let mut c = component(SubScoreKind::Risk, 20.0, vec![]);
        c.readings.push(Reading {
            indicator: "risk_flags",
            weight: 0.5,
            partial: 20.0,
            detail: Some("red flags (going-concern warning)".to_string()),
        });
        let lines = build(&[c], &RationaleThresholds::default());
        assert_eq!(lines, vec!["Red flags (going-concern warning) reduces risk score to 20".to_string()]);
    }
}
