use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::comparables::ComparableSelector;
use super::condition::ConditionAdjuster;
use super::config::ValuationConfig;
use super::domain::{
    ComparableSet, ConditionAdjustment, MethodOutcome, Property, RunId, RunStage, TrendSignal,
    UnavailableReason, ValuationError, ValuationRecord, ValuationRequest,
};
use super::market::MarketDataSource;
use super::methods::{registry, MethodEvaluator};
use super::reconcile::ReconciliationEngine;
use super::trend::TrendAnalyzer;

/// Sequences one pipeline run: comparable resolution, parallel method
/// evaluation with the trend and condition legs, and the reconciliation
/// barrier. Runs are independent and share no mutable state.
pub struct ValuationOrchestrator {
    market: Arc<dyn MarketDataSource>,
    config: Arc<ValuationConfig>,
}

/// Whatever a failed run had already computed, kept for diagnostics. A
/// failed run never exposes a partially-reconciled estimate as final.
#[derive(Debug, Default, Serialize)]
pub struct PartialArtifacts {
    pub comparables: Option<ComparableSet>,
    pub method_outcomes: Option<Vec<MethodOutcome>>,
    pub trend: Option<TrendSignal>,
    pub condition: Option<ConditionAdjustment>,
}

/// Structured failure for a run: the fatal reason, the last stage that
/// completed, and the partial artifacts.
#[derive(Debug, thiserror::Error)]
#[error("valuation run {} failed after {}: {error}", .run_id.0, .completed_stage.label())]
pub struct ValuationFailure {
    pub run_id: RunId,
    pub completed_stage: RunStage,
    pub error: ValuationError,
    pub partial: PartialArtifacts,
}

impl ValuationOrchestrator {
    pub fn new(market: Arc<dyn MarketDataSource>, config: ValuationConfig) -> Self {
        Self {
            market,
            config: Arc::new(config),
        }
    }

    pub async fn run(
        &self,
        run_id: RunId,
        request: ValuationRequest,
    ) -> Result<ValuationRecord, ValuationFailure> {
        let mut stage = RunStage::Initiated;
        info!(run_id = %run_id.0, subject = %request.subject.id.0, "valuation run initiated");

        let candidates = match self.market.fetch_candidates(&request.scope).await {
            Ok(candidates) => candidates,
            Err(source) => {
                return Err(ValuationFailure {
                    run_id,
                    completed_stage: stage,
                    error: ValuationError::DataUnavailable(source.to_string()),
                    partial: PartialArtifacts::default(),
                });
            }
        };

        let selector = ComparableSelector::new(self.config.comparables.clone());
        let comparables = match selector.select(
            &request.subject,
            &candidates,
            &request.scope,
            request.as_of,
        ) {
            Ok(set) => Arc::new(set),
            Err(error) => {
                return Err(ValuationFailure {
                    run_id,
                    completed_stage: stage,
                    error,
                    partial: PartialArtifacts::default(),
                });
            }
        };
        stage = advance(&run_id, stage, RunStage::ComparablesResolved);

        // Fan-out: evaluators and the trend leg run as independent tasks
        // over the frozen comparable set; the condition leg needs no data
        // collaborator and runs inline while they fly.
        let subject = Arc::new(request.subject.clone());
        let method_handles = self.spawn_evaluators(&subject, &comparables);
        let trend_handle = self.spawn_trend(&request);

        let adjuster = ConditionAdjuster::new(self.config.condition.clone());
        let building_age = request.subject.age_years(request.as_of);
        let condition = adjuster.adjust(request.assessment.as_ref(), building_age);

        // Barrier: every evaluator slot reports success, unavailability, or
        // timeout before reconciliation may proceed.
        let method_outcomes = self.collect_outcomes(method_handles).await;
        stage = advance(&run_id, stage, RunStage::MethodsEvaluated);

        let trend = match trend_handle.await {
            Ok(signal) => signal,
            Err(join_error) => {
                warn!(run_id = %run_id.0, error = %join_error, "trend task failed, degrading");
                TrendAnalyzer::new(self.config.trend.clone()).compute(&[], request.window)
            }
        };
        stage = advance(&run_id, stage, RunStage::TrendComputed);
        stage = advance(&run_id, stage, RunStage::ConditionApplied);

        let engine = ReconciliationEngine::new(self.config.reconciliation.clone());
        let estimate = match engine.reconcile(&method_outcomes, &trend, &condition) {
            Ok(estimate) => estimate,
            Err(error) => {
                return Err(ValuationFailure {
                    run_id,
                    completed_stage: stage,
                    error,
                    partial: PartialArtifacts {
                        comparables: Some(comparables.as_ref().clone()),
                        method_outcomes: Some(method_outcomes),
                        trend: Some(trend),
                        condition: Some(condition),
                    },
                });
            }
        };
        stage = advance(&run_id, stage, RunStage::Reconciled);

        let record = ValuationRecord {
            run_id: run_id.clone(),
            subject: request.subject,
            as_of: request.as_of,
            comparables: comparables.as_ref().clone(),
            method_outcomes,
            trend,
            condition,
            estimate,
            created_at: Utc::now(),
        };
        advance(&run_id, stage, RunStage::Finalized);
        info!(
            run_id = %run_id.0,
            point_value = record.estimate.point_value,
            confidence = record.estimate.confidence,
            "valuation run finalized"
        );

        Ok(record)
    }

    fn spawn_evaluators(
        &self,
        subject: &Arc<Property>,
        comparables: &Arc<ComparableSet>,
    ) -> Vec<(super::domain::MethodKind, JoinHandle<MethodOutcome>)> {
        registry()
            .into_iter()
            .map(|evaluator| {
                let kind = evaluator.kind();
                let subject = Arc::clone(subject);
                let comparables = Arc::clone(comparables);
                let config = Arc::clone(&self.config);
                let handle = tokio::spawn(async move {
                    evaluate_outcome(evaluator.as_ref(), &subject, &comparables, &config)
                });
                (kind, handle)
            })
            .collect()
    }

    fn spawn_trend(&self, request: &ValuationRequest) -> JoinHandle<TrendSignal> {
        let market = Arc::clone(&self.market);
        let scope = request.scope.clone();
        let window = request.window;
        let analyzer = TrendAnalyzer::new(self.config.trend.clone());
        tokio::spawn(async move {
            match market.fetch_market_series(&scope, &window).await {
                Ok(series) => analyzer.compute(&series, window),
                Err(source) => {
                    warn!(error = %source, "market series unavailable, trend degrades");
                    analyzer.compute(&[], window)
                }
            }
        })
    }

    /// Drain every evaluator slot. A timed-out evaluator is not cancelled —
    /// its result is simply never used — and a panicked task degrades to an
    /// unavailable slot like any other local failure.
    async fn collect_outcomes(
        &self,
        handles: Vec<(super::domain::MethodKind, JoinHandle<MethodOutcome>)>,
    ) -> Vec<MethodOutcome> {
        let timeout = self.config.evaluator_timeout_ms.map(Duration::from_millis);
        let mut outcomes = Vec::with_capacity(handles.len());

        for (method, handle) in handles {
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, handle).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(_join_error)) => MethodOutcome::Unavailable {
                        method,
                        reason: UnavailableReason::TaskFailed,
                    },
                    Err(_elapsed) => MethodOutcome::Unavailable {
                        method,
                        reason: UnavailableReason::TimedOut,
                    },
                },
                None => match handle.await {
                    Ok(outcome) => outcome,
                    Err(_join_error) => MethodOutcome::Unavailable {
                        method,
                        reason: UnavailableReason::TaskFailed,
                    },
                },
            };
            if let MethodOutcome::Unavailable { method, reason } = &outcome {
                info!(method = method.label(), reason = %reason, "method unavailable");
            }
            outcomes.push(outcome);
        }

        outcomes
    }
}

fn advance(run_id: &RunId, from: RunStage, to: RunStage) -> RunStage {
    info!(run_id = %run_id.0, from = from.label(), to = to.label(), "stage transition");
    to
}

fn evaluate_outcome(
    evaluator: &dyn MethodEvaluator,
    subject: &Property,
    comparables: &ComparableSet,
    config: &ValuationConfig,
) -> MethodOutcome {
    match evaluator.evaluate(subject, comparables, &config.methods) {
        Ok(result) => MethodOutcome::Evaluated(result),
        Err(reason) => MethodOutcome::Unavailable {
            method: evaluator.kind(),
            reason,
        },
    }
}
