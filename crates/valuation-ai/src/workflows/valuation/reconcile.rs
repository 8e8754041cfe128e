use std::collections::BTreeMap;

use tracing::debug;

use super::config::ReconciliationConfig;
use super::domain::{
    ConditionAdjustment, MethodOutcome, MethodResult, TrendSignal, ValuationError,
    ValuationEstimate,
};

/// Combines method outcomes, the trend signal, and the condition adjustment
/// into one confidence-weighted estimate. The step ordering (weights →
/// disagreement → trend → condition) is load-bearing: trend and condition
/// adjust an already-reconciled market value, keeping the uncertainty model
/// compositional and auditable.
pub struct ReconciliationEngine {
    config: ReconciliationConfig,
}

impl ReconciliationEngine {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self { config }
    }

    pub fn reconcile(
        &self,
        outcomes: &[MethodOutcome],
        trend: &TrendSignal,
        condition: &ConditionAdjustment,
    ) -> Result<ValuationEstimate, ValuationError> {
        let succeeded: Vec<&MethodResult> =
            outcomes.iter().filter_map(MethodOutcome::result).collect();
        if succeeded.is_empty() {
            return Err(ValuationError::NoUsableMethod);
        }

        // 1. Confidence weights normalized across the methods that succeeded;
        // missing methods show up only through the coverage factor.
        let total_confidence: f64 = succeeded.iter().map(|result| result.confidence).sum();
        let weights: Vec<f64> = if total_confidence > 0.0 {
            succeeded
                .iter()
                .map(|result| result.confidence / total_confidence)
                .collect()
        } else {
            vec![1.0 / succeeded.len() as f64; succeeded.len()]
        };

        // 2. Base estimate: confidence-weighted average of the points.
        let base: f64 = succeeded
            .iter()
            .zip(&weights)
            .map(|(result, weight)| result.point_estimate * weight)
            .sum();

        // 3. Disagreement lowers confidence proportionally to spread instead
        // of discarding outlier methods; outliers carry information here.
        let max_estimate = succeeded
            .iter()
            .map(|result| result.point_estimate)
            .fold(f64::MIN, f64::max);
        let min_estimate = succeeded
            .iter()
            .map(|result| result.point_estimate)
            .fold(f64::MAX, f64::min);
        let spread = max_estimate - min_estimate;
        let disagreement = if base > 0.0 { spread / base } else { 0.0 };
        let disagreement_penalty = if disagreement > self.config.disagreement_threshold {
            ((disagreement - self.config.disagreement_threshold)
                * self.config.disagreement_slope)
                .clamp(0.0, self.config.max_disagreement_penalty)
        } else {
            0.0
        };

        // 4. Trend adjustment, with the horizon weight shrinking as the
        // forecast confidence drops.
        let trend_factor = 1.0
            + trend.price_velocity
                * self.config.trend_horizon_weight
                * trend.forecast.confidence;
        let trend_adjusted = base * trend_factor;

        // 5. Condition multiplier reflects market perception; cost-to-cure
        // is a cash outflow reported on its own line, never merged into the
        // multiplier.
        let point_value = trend_adjusted * condition.multiplier;
        let value_net_of_repairs = point_value - condition.cost_to_cure;

        // 6. Final confidence composes the degradation factors and clamps.
        let mean_confidence: f64 = succeeded
            .iter()
            .zip(&weights)
            .map(|(result, weight)| result.confidence * weight)
            .sum();
        let coverage = succeeded.len() as f64 / outcomes.len().max(1) as f64;
        let trend_confidence_factor =
            1.0 - self.config.trend_confidence_penalty * (1.0 - trend.forecast.confidence);
        let condition_factor = if condition.assessed {
            1.0
        } else {
            self.config.unassessed_condition_factor
        };
        let confidence = (mean_confidence
            * coverage
            * (1.0 - disagreement_penalty)
            * trend_confidence_factor
            * condition_factor)
            .clamp(0.0, 1.0);

        // 7. Value range: confidence-inverse-scaled spread, never narrower
        // than any contributing method's own band.
        let scale = trend_factor * condition.multiplier;
        let spread_half = (spread / 2.0) / confidence.max(self.config.range_confidence_floor);
        let max_method_half = succeeded
            .iter()
            .map(|result| (result.band_high - result.band_low) / 2.0)
            .fold(0.0, f64::max);
        let half_width = (spread_half * scale).max(max_method_half);

        let method_weights: BTreeMap<_, _> = succeeded
            .iter()
            .zip(&weights)
            .map(|(result, weight)| (result.method, *weight))
            .collect();

        debug!(
            base,
            point_value,
            confidence,
            coverage,
            disagreement,
            "reconciled method estimates"
        );

        Ok(ValuationEstimate {
            point_value,
            range_low: point_value - half_width,
            range_high: point_value + half_width,
            confidence,
            method_weights,
            coverage,
            disagreement,
            disagreement_penalty,
            trend_factor,
            condition_multiplier: condition.multiplier,
            cost_to_cure: condition.cost_to_cure,
            value_net_of_repairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::valuation::domain::{
        MethodKind, TrendClassification, TrendForecast, UnavailableReason,
    };

    fn result(method: MethodKind, point: f64, half_band: f64, confidence: f64) -> MethodOutcome {
        MethodOutcome::Evaluated(MethodResult {
            method,
            point_estimate: point,
            band_low: point - half_band,
            band_high: point + half_band,
            confidence,
        })
    }

    fn unavailable(method: MethodKind) -> MethodOutcome {
        MethodOutcome::Unavailable {
            method,
            reason: UnavailableReason::TooFewComparables {
                found: 2,
                required: 3,
            },
        }
    }

    fn neutral_trend() -> TrendSignal {
        TrendSignal {
            window_months: 12,
            price_velocity: 0.0,
            inventory_level: 100.0,
            days_on_market_avg: 30.0,
            classification: TrendClassification::Stable,
            seasonal_index: 1.0,
            forecast: TrendForecast {
                horizon_months: 6,
                projected_price: 305_000.0,
                confidence: 1.0,
            },
            degraded: false,
        }
    }

    fn assessed_neutral_condition() -> ConditionAdjustment {
        ConditionAdjustment {
            multiplier: 1.0,
            cost_to_cure: 0.0,
            assessed: true,
        }
    }

    fn engine() -> ReconciliationEngine {
        ReconciliationEngine::new(ReconciliationConfig::default())
    }

    #[test]
    fn agreeing_methods_yield_a_confident_tight_estimate() {
        // Five-comparable market around 305k: all three methods land within
        // a few percent and full coverage keeps confidence high.
        let outcomes = vec![
            result(MethodKind::PricePerArea, 303_000.0, 8_000.0, 0.8),
            result(MethodKind::SalesComparison, 306_000.0, 8_500.0, 0.9),
            result(MethodKind::Regression, 309_000.0, 10_000.0, 0.5),
        ];

        let estimate = engine()
            .reconcile(&outcomes, &neutral_trend(), &assessed_neutral_condition())
            .expect("reconciles");

        assert!((estimate.point_value - 305_000.0).abs() < 305_000.0 * 0.02);
        assert!(estimate.confidence > 0.7);
        assert!(estimate.range_high - estimate.range_low <= 30_000.0);
        assert!(estimate.range_low <= estimate.point_value);
        assert!(estimate.point_value <= estimate.range_high);
        assert_eq!(estimate.coverage, 1.0);
        assert_eq!(estimate.disagreement_penalty, 0.0);
    }

    #[test]
    fn single_surviving_method_still_reconciles_with_reduced_coverage() {
        let all = vec![
            result(MethodKind::PricePerArea, 305_000.0, 9_000.0, 0.6),
            result(MethodKind::SalesComparison, 305_000.0, 9_000.0, 0.6),
            result(MethodKind::Regression, 305_000.0, 9_000.0, 0.6),
        ];
        let only_regression = vec![
            unavailable(MethodKind::PricePerArea),
            unavailable(MethodKind::SalesComparison),
            result(MethodKind::Regression, 305_000.0, 9_000.0, 0.6),
        ];

        let engine = engine();
        let full = engine
            .reconcile(&all, &neutral_trend(), &assessed_neutral_condition())
            .expect("reconciles");
        let partial = engine
            .reconcile(&only_regression, &neutral_trend(), &assessed_neutral_condition())
            .expect("reconciles");

        assert!((partial.coverage - 1.0 / 3.0).abs() < 1e-9);
        assert!(partial.confidence < full.confidence);
        assert_eq!(partial.point_value, 305_000.0);
    }

    #[test]
    fn zero_usable_methods_is_fatal() {
        let outcomes = vec![
            unavailable(MethodKind::PricePerArea),
            unavailable(MethodKind::SalesComparison),
            unavailable(MethodKind::Regression),
        ];

        let error = engine()
            .reconcile(&outcomes, &neutral_trend(), &assessed_neutral_condition())
            .expect_err("nothing to reconcile");
        assert!(matches!(error, ValuationError::NoUsableMethod));
    }

    #[test]
    fn coverage_is_monotone_in_successful_methods() {
        let make = |count: usize| -> Vec<MethodOutcome> {
            MethodKind::ordered()
                .into_iter()
                .enumerate()
                .map(|(index, method)| {
                    if index < count {
                        result(method, 305_000.0, 9_000.0, 0.7)
                    } else {
                        unavailable(method)
                    }
                })
                .collect()
        };

        let engine = engine();
        let mut previous = 0.0;
        for count in 1..=3 {
            let estimate = engine
                .reconcile(&make(count), &neutral_trend(), &assessed_neutral_condition())
                .expect("reconciles");
            assert!(
                estimate.confidence >= previous,
                "confidence fell from {previous} with {count} methods"
            );
            previous = estimate.confidence;
        }
    }

    #[test]
    fn widening_spread_never_raises_confidence() {
        let engine = engine();
        let mut previous = f64::MAX;
        for step in 0..8 {
            let spread = step as f64 * 20_000.0;
            let outcomes = vec![
                result(MethodKind::PricePerArea, 300_000.0 - spread / 2.0, 9_000.0, 0.8),
                result(MethodKind::SalesComparison, 300_000.0, 9_000.0, 0.8),
                result(MethodKind::Regression, 300_000.0 + spread / 2.0, 9_000.0, 0.8),
            ];
            let estimate = engine
                .reconcile(&outcomes, &neutral_trend(), &assessed_neutral_condition())
                .expect("reconciles");
            assert!(
                estimate.confidence <= previous,
                "confidence rose as spread widened to {spread}"
            );
            previous = estimate.confidence;
        }
    }

    #[test]
    fn trend_velocity_scales_the_base_estimate() {
        // +2% per period with a 0.5 horizon weight at full forecast
        // confidence multiplies the base by exactly 1.01.
        let outcomes = vec![result(MethodKind::SalesComparison, 300_000.0, 9_000.0, 0.8)];
        let mut trend = neutral_trend();
        trend.price_velocity = 0.02;
        trend.classification = TrendClassification::Rising;

        let estimate = engine()
            .reconcile(&outcomes, &trend, &assessed_neutral_condition())
            .expect("reconciles");

        assert!((estimate.trend_factor - 1.01).abs() < 1e-12);
        assert!((estimate.point_value - 303_000.0).abs() < 1e-6);
    }

    #[test]
    fn condition_multiplier_applies_after_trend_and_repairs_stay_separate() {
        let outcomes = vec![result(MethodKind::SalesComparison, 300_000.0, 9_000.0, 0.8)];
        let condition = ConditionAdjustment {
            multiplier: 0.9,
            cost_to_cure: 12_000.0,
            assessed: true,
        };

        let estimate = engine()
            .reconcile(&outcomes, &neutral_trend(), &condition)
            .expect("reconciles");

        assert!((estimate.point_value - 270_000.0).abs() < 1e-6);
        assert_eq!(estimate.cost_to_cure, 12_000.0);
        assert!((estimate.value_net_of_repairs - 258_000.0).abs() < 1e-6);
    }

    #[test]
    fn unassessed_condition_lowers_confidence_only() {
        let outcomes = vec![
            result(MethodKind::PricePerArea, 305_000.0, 9_000.0, 0.8),
            result(MethodKind::SalesComparison, 305_000.0, 9_000.0, 0.8),
            result(MethodKind::Regression, 305_000.0, 9_000.0, 0.8),
        ];

        let engine = engine();
        let assessed = engine
            .reconcile(&outcomes, &neutral_trend(), &assessed_neutral_condition())
            .expect("reconciles");
        let unassessed = engine
            .reconcile(&outcomes, &neutral_trend(), &ConditionAdjustment::unassessed())
            .expect("reconciles");

        assert_eq!(assessed.point_value, unassessed.point_value);
        assert!(unassessed.confidence < assessed.confidence);
    }

    #[test]
    fn range_is_never_narrower_than_a_contributing_band() {
        let outcomes = vec![
            result(MethodKind::PricePerArea, 305_000.0, 24_000.0, 0.9),
            result(MethodKind::SalesComparison, 306_000.0, 5_000.0, 0.9),
        ];

        let estimate = engine()
            .reconcile(&outcomes, &neutral_trend(), &assessed_neutral_condition())
            .expect("reconciles");

        assert!(estimate.range_high - estimate.range_low >= 48_000.0);
    }

    #[test]
    fn reconciliation_is_deterministic_on_frozen_inputs() {
        let outcomes = vec![
            result(MethodKind::PricePerArea, 303_333.33, 8_123.45, 0.81),
            result(MethodKind::SalesComparison, 307_777.77, 7_654.32, 0.77),
            unavailable(MethodKind::Regression),
        ];
        let mut trend = neutral_trend();
        trend.price_velocity = 0.0137;
        trend.forecast.confidence = 0.63;
        let condition = ConditionAdjustment {
            multiplier: 0.87,
            cost_to_cure: 9_876.54,
            assessed: true,
        };

        let engine = engine();
        let first = engine
            .reconcile(&outcomes, &trend, &condition)
            .expect("reconciles");
        let second = engine
            .reconcile(&outcomes, &trend, &condition)
            .expect("reconciles");

        // Bit-identical, not merely approximately equal.
        assert_eq!(first, second);
        assert!(first.confidence >= 0.0 && first.confidence <= 1.0);
        assert!(first.range_low <= first.point_value);
        assert!(first.point_value <= first.range_high);
    }
}
