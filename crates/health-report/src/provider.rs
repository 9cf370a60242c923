use std::path::PathBuf;

use analysis_core::{AnalysisError, FactsProvider, FinancialFactsBundle};
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncReadExt;

/// Where the facts document comes from
#[derive(Debug, Clone)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    pub fn parse(raw: &str) -> Self {
        if raw == "-" {
            Source::Stdin
        } else {
            Source::File(PathBuf::from(raw))
        }
    }

    async fn read(&self) -> Result<String, AnalysisError> {
        match self {
            Source::Stdin => {
                let mut buf = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut buf)
                    .await
                    .map_err(|e| AnalysisError::Provider(format!("cannot read stdin: {}", e)))?;
                Ok(buf)
            }
            Source::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                AnalysisError::Provider(format!("cannot read {}: {}", path.display(), e))
            }),
        }
    }
}

/// Serves bundles from a JSON document holding one bundle or an array of them.
///
/// This is the offline stand-in for the AI search integration: that collaborator
/// writes normalized bundles, this provider hands them to the scorer.
pub struct JsonFileProvider {
    bundles: Vec<FinancialFactsBundle>,
}

impl JsonFileProvider {
    pub async fn load(source: &Source) -> Result<Self, AnalysisError> {
        let raw = source.read().await?;
        Self::from_document(&raw)
    }

    pub fn from_document(raw: &str) -> Result<Self, AnalysisError> {
        let doc: Value = serde_json::from_str(raw)
            .map_err(|e| AnalysisError::InvalidInput(format!("facts document is not JSON: {}", e)))?;
        let bundles = match doc {
            Value::Array(items) => items
                .into_iter()
                .map(FinancialFactsBundle::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            other => vec![FinancialFactsBundle::from_value(other)?],
        };
        tracing::debug!("Loaded {} facts bundle(s)", bundles.len());
        Ok(Self { bundles })
    }

    pub fn tickers(&self) -> Vec<String> {
        self.bundles.iter().map(|b| b.ticker.trim().to_string()).collect()
    }
}

#[async_trait]
impl FactsProvider for JsonFileProvider {
    async fn fetch_facts(&self, ticker: &str) -> Result<FinancialFactsBundle, AnalysisError> {
        let wanted = ticker.trim();
        self.bundles
            .iter()
            .find(|b| b.ticker.trim().eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| AnalysisError::Provider(format!("no facts bundle for {}", wanted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"[
        {"ticker": "AAPL", "as_of": "2026-10-01T00:00:00Z", "net_margin": 0.24},
        {"ticker": "tsla", "debt_to_equity": 0.7}
    ]"#;

    #[tokio::test]
    async fn test_fetch_is_case_insensitive() {
        let provider = JsonFileProvider::from_document(DOC).unwrap();
        assert_eq!(provider.tickers(), vec!["AAPL".to_string(), "tsla".to_string()]);

        let bundle = provider.fetch_facts("TSLA").await.unwrap();
        assert_eq!(bundle.debt_to_equity, Some(0.7));
        assert!(matches!(
            provider.fetch_facts("MSFT").await,
            Err(AnalysisError::Provider(_))
        ));
    }

    #[test]
    fn test_single_object_document() {
        let provider = JsonFileProvider::from_document(r#"{"ticker": "NVDA"}"#).unwrap();
        assert_eq!(provider.tickers(), vec!["NVDA".to_string()]);
    }

    #[test]
    fn test_blank_ticker_rejects_whole_document() {
        let doc = r#"[{"ticker": "AAPL"}, {"ticker": ""}]"#;
        assert!(matches!(
            JsonFileProvider::from_document(doc),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_load_fixture_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/sample_bundles.json");
        let provider = JsonFileProvider::load(&Source::parse(path)).await.unwrap();
        assert_eq!(provider.tickers().len(), 3);
    }
}
