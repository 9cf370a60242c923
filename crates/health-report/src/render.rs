use analysis_core::HealthScoreResult;

const BAR_WIDTH: usize = 20;

fn bar(value: f64) -> String {
    let filled = ((value / 100.0) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Terminal summary in the research-terminal layout: header, sub-score bars, verdicts.
pub fn text(result: &HealthScoreResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}  FINANCIAL HEALTH SCORE {}/100 {} {}\n",
        result.ticker.to_uppercase(),
        result.overall,
        result.band.indicator(),
        result.band.to_label()
    ));
    out.push_str(&format!(
        "as of {}  |  data completeness {:.0}%\n",
        result.as_of.format("%Y-%m-%d %H:%M UTC"),
        result.data_completeness * 100.0
    ));
    for sub in result.sub_scores.iter() {
        let marker = if sub.insufficient_data { " (no data)" } else { "" };
        out.push_str(&format!(
            "  {:<14} {:>5.1} {}{}\n",
            sub.kind.label(),
            sub.value,
            bar(sub.value),
            marker
        ));
    }
    if !result.rationale.is_empty() {
        out.push_str("THE THINGS YOU NEED TO KNOW:\n");
        for line in &result.rationale {
            out.push_str(&format!("  - {}\n", line));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{FinancialFactsBundle, HealthScorer};
    use fundamental_analysis::FundamentalHealthScorer;

    #[test]
    fn test_bar_bounds() {
        assert_eq!(bar(0.0), "░".repeat(BAR_WIDTH));
        assert_eq!(bar(100.0), "█".repeat(BAR_WIDTH));
        assert_eq!(bar(250.0), "█".repeat(BAR_WIDTH));
    }

    #[test]
    fn test_text_lists_every_sub_score() {
        let bundle = FinancialFactsBundle::new("ko").with_net_margin(0.22);
        let result = FundamentalHealthScorer::default().score(&bundle).unwrap();
        let rendered = text(&result);
        assert!(rendered.starts_with("KO  FINANCIAL HEALTH SCORE"));
        for label in ["balance-sheet", "growth", "profitability", "momentum", "risk"] {
            assert!(rendered.contains(label), "missing {}", label);
        }
        assert!(rendered.contains("(no data)"));
    }
}
