use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use super::config::ValuationConfig;
use super::domain::{RunId, ValuationRecord, ValuationRequest};
use super::market::MarketDataSource;
use super::orchestrator::{ValuationFailure, ValuationOrchestrator};
use super::repository::{StoreError, ValuationRecordStore};

/// Facade composing the orchestrator and the record store: one call per
/// appraisal request, one persisted record per successful run.
pub struct ValuationService<S> {
    orchestrator: ValuationOrchestrator,
    store: Arc<S>,
}

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_run_id() -> RunId {
    let id = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RunId(format!("run-{id:06}"))
}

impl<S> ValuationService<S>
where
    S: ValuationRecordStore + 'static,
{
    pub fn new(market: Arc<dyn MarketDataSource>, store: Arc<S>, config: ValuationConfig) -> Self {
        Self {
            orchestrator: ValuationOrchestrator::new(market, config),
            store,
        }
    }

    /// Run the pipeline for one request and persist the resulting record.
    pub async fn appraise(
        &self,
        request: ValuationRequest,
    ) -> Result<ValuationRecord, ValuationServiceError> {
        let run_id = next_run_id();
        let record = self.orchestrator.run(run_id, request).await?;
        let stored = self.store.insert(record)?;
        info!(run_id = %stored.run_id.0, "valuation record persisted");
        Ok(stored)
    }

    /// Fetch a previously persisted record.
    pub fn get(&self, run_id: &RunId) -> Result<Option<ValuationRecord>, ValuationServiceError> {
        Ok(self.store.fetch(run_id)?)
    }

    /// Most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<ValuationRecord>, ValuationServiceError> {
        Ok(self.store.recent(limit)?)
    }
}

/// Error raised by the valuation service.
#[derive(Debug, thiserror::Error)]
pub enum ValuationServiceError {
    #[error(transparent)]
    Run(#[from] ValuationFailure),
    #[error(transparent)]
    Store(#[from] StoreError),
}
