//! health-report: score normalized facts bundles and print the fundamental health report.
//!
//! Usage:
//!   health-report --input facts.json                # every bundle in the file
//!   health-report --input facts.json --ticker AAPL  # one ticker
//!   cat facts.json | health-report --format json
//!   health-report --input facts.json --config scoring.json

use std::path::PathBuf;

use analysis_core::{FactsProvider, HealthScorer};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fundamental_analysis::{FundamentalHealthScorer, ScoringConfig};

mod provider;
mod render;

use provider::{JsonFileProvider, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "health-report", about = "Fundamental health score for normalized facts bundles")]
struct Cli {
    /// Facts document (one bundle or an array); `-` reads stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// JSON scoring config; defaults plus HEALTH_* env overrides when omitted
    #[arg(short, long, env = "HEALTH_SCORING_CONFIG")]
    config: Option<PathBuf>,

    /// Use the conservative weighting preset
    #[arg(long, conflicts_with = "config")]
    conservative: bool,

    /// Score only these tickers (repeatable)
    #[arg(short, long)]
    ticker: Vec<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // Logs go to stderr so stdout stays machine-readable
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<ScoringConfig> {
    if let Some(path) = &cli.config {
        let config = ScoringConfig::from_json_file(path)
            .with_context(|| format!("Failed to load scoring config {}", path.display()))?;
        tracing::info!("Scoring config loaded from {}", path.display());
        return Ok(config);
    }
    if cli.conservative {
        tracing::info!("Using conservative scoring preset");
        return Ok(ScoringConfig::conservative());
    }
    ScoringConfig::from_env().context("Invalid HEALTH_* scoring overrides")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tracing::info!(
        "Weights: balance sheet {:.2}, growth {:.2}, profitability {:.2}, momentum {:.2}, risk {:.2}",
        config.weights.balance_sheet,
        config.weights.growth,
        config.weights.profitability,
        config.weights.momentum,
        config.weights.risk
    );
    let scorer = FundamentalHealthScorer::new(config).context("Scoring config rejected")?;

    let source = Source::parse(&cli.input);
    let provider = JsonFileProvider::load(&source)
        .await
        .with_context(|| format!("Failed to load facts from {:?}", source))?;

    let tickers = if cli.ticker.is_empty() {
        provider.tickers()
    } else {
        cli.ticker.clone()
    };

    let mut results = Vec::with_capacity(tickers.len());
    for ticker in &tickers {
        let bundle = provider
            .fetch_facts(ticker)
            .await
            .with_context(|| format!("No facts for {}", ticker))?;
        let result = scorer
            .score(&bundle)
            .with_context(|| format!("Scoring failed for {}", ticker))?;
        tracing::info!("{}: {}/100 ({})", result.ticker, result.overall, result.band.to_label());
        results.push(result);
    }

    match cli.format {
        OutputFormat::Json => {
            let out = if results.len() == 1 {
                serde_json::to_string_pretty(&results[0])?
            } else {
                serde_json::to_string_pretty(&results)?
            };
            println!("{}", out);
        }
        OutputFormat::Text => {
            for result in &results {
                println!("{}", render::text(result));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_repeated_tickers() {
        let cli = Cli::parse_from([
            "health-report",
            "--input",
            "facts.json",
            "-t",
            "AAPL",
            "-t",
            "MSFT",
            "--format",
            "json",
        ]);
        assert_eq!(cli.ticker, vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(!cli.conservative);
    }

    #[test]
    fn test_conservative_conflicts_with_config() {
        let parsed = Cli::try_parse_from([
            "health-report",
            "--conservative",
            "--config",
            "scoring.json",
        ]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_fixture_scores_rank_as_expected() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/sample_bundles.json");
        let provider = JsonFileProvider::load(&Source::parse(path)).await.unwrap();
        let scorer = FundamentalHealthScorer::default();

        let mut overall = Vec::new();
        for ticker in ["AAPL", "MSFT", "BURN"] {
            let bundle = provider.fetch_facts(ticker).await.unwrap();
            overall.push(scorer.score(&bundle).unwrap().overall);
        }
        assert!(overall[0] > 70);
        assert!(overall[1] > 70);
        assert!(overall[2] < 40);
    }
}
