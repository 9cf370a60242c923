use async_trait::async_trait;
use crate::{AnalysisError, FinancialFactsBundle, HealthScoreResult};

/// Source of normalized facts for a ticker (AI search integration, fixtures, caches)
#[async_trait]
pub trait FactsProvider: Send + Sync {
    async fn fetch_facts(&self, ticker: &str) -> Result<FinancialFactsBundle, AnalysisError>;
}

/// Trait for fundamental health scoring engines
pub trait HealthScorer: Send + Sync {
    fn score(&self, bundle: &FinancialFactsBundle) -> Result<HealthScoreResult, AnalysisError>;
}
