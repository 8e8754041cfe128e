use super::{weighted_mean_std, MethodEvaluator};
use crate::workflows::valuation::config::MethodConfig;
use crate::workflows::valuation::domain::{
    ComparableSet, MethodKind, MethodResult, Property, UnavailableReason,
};

/// Similarity-weighted average of adjusted comparable sale prices. The band
/// is one weighted standard deviation; confidence comes from three quality
/// checks on the set (count, price dispersion, adjustment magnitude).
pub struct SalesComparisonEvaluator;

impl MethodEvaluator for SalesComparisonEvaluator {
    fn kind(&self) -> MethodKind {
        MethodKind::SalesComparison
    }

    fn evaluate(
        &self,
        _subject: &Property,
        comparables: &ComparableSet,
        config: &MethodConfig,
    ) -> Result<MethodResult, UnavailableReason> {
        if comparables.len() < config.min_comparables {
            return Err(UnavailableReason::TooFewComparables {
                found: comparables.len(),
                required: config.min_comparables,
            });
        }

        let total_similarity: f64 = comparables
            .comparables
            .iter()
            .map(|comparable| comparable.similarity)
            .sum();
        if total_similarity <= 0.0 {
            return Err(UnavailableReason::DegenerateFeatures);
        }

        let weights: Vec<f64> = comparables
            .comparables
            .iter()
            .map(|comparable| comparable.similarity / total_similarity)
            .collect();
        let prices: Vec<f64> = comparables
            .comparables
            .iter()
            .map(|comparable| comparable.adjusted_price)
            .collect();

        let (mean, std) = weighted_mean_std(&prices, &weights);
        if mean <= 0.0 {
            return Err(UnavailableReason::DegenerateFeatures);
        }

        let mut quality_checks = 0usize;
        if comparables.len() >= config.min_comparables {
            quality_checks += 1;
        }
        if std / mean < config.tight_cv_bound {
            quality_checks += 1;
        }
        let adjustments_reasonable = comparables.comparables.iter().all(|comparable| {
            comparable.sale.price > 0.0
                && (comparable.total_adjustment() / comparable.sale.price).abs()
                    <= config.reasonable_adjustment_share
        });
        if adjustments_reasonable {
            quality_checks += 1;
        }

        Ok(MethodResult {
            method: MethodKind::SalesComparison,
            point_estimate: mean,
            band_low: mean - std,
            band_high: mean + std,
            confidence: quality_checks as f64 / 3.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::valuation::domain::{
        AdjustedFeature, Comparable, Location, PropertyId, SaleEvent, StructuralFeatures,
    };
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn subject() -> Property {
        Property {
            id: PropertyId("subject".to_string()),
            location: Location {
                latitude: 41.6,
                longitude: -93.61,
                admin_area: "Polk County".to_string(),
            },
            features: StructuralFeatures {
                living_area_sqft: 2000.0,
                bedrooms: 3,
                bathrooms: 2.0,
                year_built: 2012,
                lot_acres: 0.25,
            },
            sale_history: Vec::new(),
        }
    }

    fn comparable(price: f64, similarity: f64) -> Comparable {
        Comparable {
            property: subject(),
            sale: SaleEvent {
                date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
                price,
            },
            similarity,
            adjustments: BTreeMap::new(),
            adjusted_price: price,
        }
    }

    fn set(comparables: Vec<Comparable>) -> ComparableSet {
        ComparableSet {
            subject_id: PropertyId("subject".to_string()),
            comparables,
        }
    }

    #[test]
    fn equal_weights_reduce_to_plain_average() {
        let set = set(vec![
            comparable(300_000.0, 0.8),
            comparable(310_000.0, 0.8),
            comparable(305_000.0, 0.8),
        ]);

        let result = SalesComparisonEvaluator
            .evaluate(&subject(), &set, &MethodConfig::default())
            .expect("evaluates");

        assert!((result.point_estimate - 305_000.0).abs() < 1e-6);
        assert!(result.band_low < result.point_estimate);
        assert!(result.point_estimate < result.band_high);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn higher_similarity_pulls_the_estimate() {
        let set = set(vec![
            comparable(300_000.0, 0.95),
            comparable(340_000.0, 0.05),
            comparable(300_000.0, 0.95),
        ]);

        let result = SalesComparisonEvaluator
            .evaluate(&subject(), &set, &MethodConfig::default())
            .expect("evaluates");

        assert!(result.point_estimate < 305_000.0);
    }

    #[test]
    fn oversized_adjustments_fail_the_quality_check() {
        let mut heavily_adjusted = comparable(300_000.0, 0.8);
        heavily_adjusted
            .adjustments
            .insert(AdjustedFeature::Area, 90_000.0);
        heavily_adjusted.adjusted_price = 390_000.0;

        let set = set(vec![
            heavily_adjusted,
            comparable(392_000.0, 0.8),
            comparable(388_000.0, 0.8),
        ]);

        let result = SalesComparisonEvaluator
            .evaluate(&subject(), &set, &MethodConfig::default())
            .expect("evaluates");

        // Tight dispersion and enough comparables, but the 30% adjustment
        // drops one of the three quality checks.
        assert!((result.confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_comparables_is_unavailable() {
        let set = set(vec![comparable(300_000.0, 0.9)]);
        let reason = SalesComparisonEvaluator
            .evaluate(&subject(), &set, &MethodConfig::default())
            .expect_err("not enough comparables");
        assert!(matches!(
            reason,
            UnavailableReason::TooFewComparables { found: 1, required: 3 }
        ));
    }
}
