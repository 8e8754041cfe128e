pub mod comparables;
pub mod condition;
pub mod config;
pub mod domain;
pub mod market;
pub mod methods;
pub mod orchestrator;
pub mod reconcile;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod trend;

pub use comparables::ComparableSelector;
pub use condition::ConditionAdjuster;
pub use config::ValuationConfig;
pub use market::{DataSourceError, MarketDataSource};
pub use orchestrator::{PartialArtifacts, ValuationFailure, ValuationOrchestrator};
pub use reconcile::ReconciliationEngine;
pub use report::{ValuationFailureView, ValuationSummary};
pub use repository::{InMemoryValuationStore, StoreError, ValuationRecordStore};
pub use router::valuation_router;
pub use service::{ValuationService, ValuationServiceError};
pub use trend::TrendAnalyzer;
