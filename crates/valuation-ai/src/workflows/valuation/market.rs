use async_trait::async_trait;

use super::domain::{MarketObservation, MarketScope, Property, TrendWindow};

/// Errors surfaced by a market data collaborator. Fatal only when they block
/// comparable resolution; the trend path degrades instead.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("market data source io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("market data source returned malformed data: {0}")]
    Malformed(String),
    #[error("market data source unavailable: {0}")]
    Unavailable(String),
}

/// Opaque market data collaborator. Implementations may be slow or partial;
/// the core never assumes completeness.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Candidate properties with sale history within the scope.
    async fn fetch_candidates(
        &self,
        scope: &MarketScope,
    ) -> Result<Vec<Property>, DataSourceError>;

    /// Market time series for trend analysis over the window.
    async fn fetch_market_series(
        &self,
        scope: &MarketScope,
        window: &TrendWindow,
    ) -> Result<Vec<MarketObservation>, DataSourceError>;
}
