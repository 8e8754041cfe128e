mod price_per_area;
mod regression;
mod sales_comparison;

pub use price_per_area::PricePerAreaEvaluator;
pub use regression::RegressionEvaluator;
pub use sales_comparison::SalesComparisonEvaluator;

use std::sync::Arc;

use super::config::MethodConfig;
use super::domain::{ComparableSet, MethodKind, MethodResult, Property, UnavailableReason};

/// One pluggable valuation methodology. Implementations are pure functions
/// of the frozen comparable set and subject; a precondition miss returns an
/// `UnavailableReason` that the reconciliation engine folds into coverage,
/// never an abort.
pub trait MethodEvaluator: Send + Sync {
    fn kind(&self) -> MethodKind;

    fn evaluate(
        &self,
        subject: &Property,
        comparables: &ComparableSet,
        config: &MethodConfig,
    ) -> Result<MethodResult, UnavailableReason>;
}

/// The registered evaluators in fixed order. Adding a methodology here is
/// the only change reconciliation needs.
pub fn registry() -> Vec<Arc<dyn MethodEvaluator>> {
    vec![
        Arc::new(PricePerAreaEvaluator),
        Arc::new(SalesComparisonEvaluator),
        Arc::new(RegressionEvaluator),
    ]
}

pub(crate) fn median(sorted: &[f64]) -> f64 {
    debug_assert!(!sorted.is_empty());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Quantile with linear interpolation over an ascending-sorted slice.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let fraction = position - lower as f64;
        sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
    }
}

/// Weighted mean and standard deviation; weights must already sum to one.
pub(crate) fn weighted_mean_std(values: &[f64], weights: &[f64]) -> (f64, f64) {
    debug_assert_eq!(values.len(), weights.len());
    let mean: f64 = values
        .iter()
        .zip(weights)
        .map(|(value, weight)| value * weight)
        .sum();
    let variance: f64 = values
        .iter()
        .zip(weights)
        .map(|(value, weight)| weight * (value - mean).powi(2))
        .sum();
    (mean, variance.max(0.0).sqrt())
}
