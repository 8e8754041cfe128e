use super::{median, quantile, MethodEvaluator};
use crate::workflows::valuation::config::MethodConfig;
use crate::workflows::valuation::domain::{
    ComparableSet, MethodKind, MethodResult, Property, UnavailableReason,
};

/// Median adjusted dollars-per-area across the comparable set, scaled to the
/// subject's living area. The band is the interquartile spread of the
/// per-comparable rates.
pub struct PricePerAreaEvaluator;

impl MethodEvaluator for PricePerAreaEvaluator {
    fn kind(&self) -> MethodKind {
        MethodKind::PricePerArea
    }

    fn evaluate(
        &self,
        subject: &Property,
        comparables: &ComparableSet,
        config: &MethodConfig,
    ) -> Result<MethodResult, UnavailableReason> {
        let subject_area = subject.features.living_area_sqft;
        if subject_area <= 0.0 {
            return Err(UnavailableReason::ZeroArea);
        }
        if comparables.len() < config.min_comparables {
            return Err(UnavailableReason::TooFewComparables {
                found: comparables.len(),
                required: config.min_comparables,
            });
        }

        let mut rates: Vec<f64> = comparables
            .comparables
            .iter()
            .filter(|comparable| comparable.property.features.living_area_sqft > 0.0)
            .map(|comparable| {
                comparable.adjusted_price / comparable.property.features.living_area_sqft
            })
            .collect();
        if rates.len() < config.min_comparables {
            return Err(UnavailableReason::DegenerateFeatures);
        }
        rates.sort_by(f64::total_cmp);

        let median_rate = median(&rates);
        let q1 = quantile(&rates, 0.25);
        let q3 = quantile(&rates, 0.75);
        let point_estimate = median_rate * subject_area;

        let relative_spread = if median_rate > 0.0 {
            ((q3 - q1) / median_rate).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let sample_factor = rates.len() as f64 / (rates.len() as f64 + 2.0);
        let confidence = (sample_factor * (1.0 - relative_spread)).clamp(0.0, 1.0);

        Ok(MethodResult {
            method: MethodKind::PricePerArea,
            point_estimate,
            band_low: q1 * subject_area,
            band_high: q3 * subject_area,
            confidence,
        })
    }
}
