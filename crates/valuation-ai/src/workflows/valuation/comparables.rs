use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use super::config::ComparableConfig;
use super::domain::{
    AdjustedFeature, Comparable, ComparableSet, Location, MarketScope, Property, ValuationError,
};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Normalization caps for feature differences; a delta at or beyond the cap
/// scores as fully dissimilar on that feature.
const AGE_SPAN_YEARS: f64 = 50.0;
const ROOM_SPAN: f64 = 3.0;

/// Stateless selector producing the comparable set for one subject.
pub struct ComparableSelector {
    config: ComparableConfig,
}

impl ComparableSelector {
    pub fn new(config: ComparableConfig) -> Self {
        Self { config }
    }

    /// Filter and rank candidates into a comparable set, or fail when fewer
    /// than the configured minimum pass the similarity floor.
    pub fn select(
        &self,
        subject: &Property,
        candidates: &[Property],
        scope: &MarketScope,
        as_of: NaiveDate,
    ) -> Result<ComparableSet, ValuationError> {
        let mut scored: Vec<Comparable> = candidates
            .iter()
            .filter(|candidate| candidate.id != subject.id)
            .filter_map(|candidate| self.score_candidate(subject, candidate, scope, as_of))
            .filter(|comparable| comparable.similarity >= self.config.similarity_floor)
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        if scored.len() < self.config.min_comparables {
            return Err(ValuationError::InsufficientComparables {
                found: scored.len(),
                required: self.config.min_comparables,
            });
        }

        scored.truncate(self.config.max_comparables);
        debug!(
            subject = %subject.id.0,
            selected = scored.len(),
            floor = self.config.similarity_floor,
            "comparable set resolved"
        );

        Ok(ComparableSet {
            subject_id: subject.id.clone(),
            comparables: scored,
        })
    }

    fn score_candidate(
        &self,
        subject: &Property,
        candidate: &Property,
        scope: &MarketScope,
        as_of: NaiveDate,
    ) -> Option<Comparable> {
        let sale = candidate.latest_sale_within(scope.max_sale_age_days, as_of)?;
        let distance_km = haversine_km(&subject.location, &candidate.location);
        if distance_km > scope.max_radius_km {
            return None;
        }

        let similarity = self.similarity(subject, candidate, sale.date, distance_km, scope, as_of);
        let adjustments = self.adjustments(subject, candidate, sale.price, as_of);
        let adjusted_price = sale.price + adjustments.values().sum::<f64>();

        Some(Comparable {
            property: candidate.clone(),
            sale,
            similarity,
            adjustments,
            adjusted_price,
        })
    }

    fn similarity(
        &self,
        subject: &Property,
        candidate: &Property,
        sale_date: NaiveDate,
        distance_km: f64,
        scope: &MarketScope,
        as_of: NaiveDate,
    ) -> f64 {
        let weights = &self.config.weights;
        let subject_features = &subject.features;
        let candidate_features = &candidate.features;

        let area_delta = if subject_features.living_area_sqft > 0.0 {
            ((subject_features.living_area_sqft - candidate_features.living_area_sqft).abs()
                / subject_features.living_area_sqft)
                .min(1.0)
        } else {
            1.0
        };
        let age_delta = ((subject.age_years(as_of) - candidate.age_years(as_of)).abs() as f64
            / AGE_SPAN_YEARS)
            .min(1.0);
        let bedroom_delta = ((subject_features.bedrooms as f64
            - candidate_features.bedrooms as f64)
            .abs()
            / ROOM_SPAN)
            .min(1.0);
        let bathroom_delta = ((subject_features.bathrooms as f64
            - candidate_features.bathrooms as f64)
            .abs()
            / ROOM_SPAN)
            .min(1.0);
        let location_delta = if scope.max_radius_km > 0.0 {
            (distance_km / scope.max_radius_km).min(1.0)
        } else {
            0.0
        };
        let recency_delta = if scope.max_sale_age_days > 0 {
            ((as_of - sale_date).num_days().max(0) as f64 / scope.max_sale_age_days as f64).min(1.0)
        } else {
            0.0
        };

        let total_weight = weights.area
            + weights.age
            + weights.bedrooms
            + weights.bathrooms
            + weights.location
            + weights.recency;
        if total_weight <= 0.0 {
            return 0.0;
        }

        let weighted_distance = (weights.area * area_delta
            + weights.age * age_delta
            + weights.bedrooms * bedroom_delta
            + weights.bathrooms * bathroom_delta
            + weights.location * location_delta
            + weights.recency * recency_delta)
            / total_weight;

        (1.0 - weighted_distance).clamp(0.0, 1.0)
    }

    /// Signed dollar adjustments normalizing the comparable's price toward
    /// the subject. Exact structural matches bypass adjustment entirely.
    fn adjustments(
        &self,
        subject: &Property,
        candidate: &Property,
        sale_price: f64,
        as_of: NaiveDate,
    ) -> BTreeMap<AdjustedFeature, f64> {
        let mut adjustments = BTreeMap::new();
        if subject.features == candidate.features {
            return adjustments;
        }

        let rates = &self.config.rates;
        let subject_features = &subject.features;
        let candidate_features = &candidate.features;

        let area_delta = subject_features.living_area_sqft - candidate_features.living_area_sqft;
        if area_delta != 0.0 && candidate_features.living_area_sqft > 0.0 {
            let rate_per_sqft = sale_price / candidate_features.living_area_sqft;
            adjustments.insert(AdjustedFeature::Area, area_delta * rate_per_sqft);
        }

        let bedroom_delta =
            subject_features.bedrooms as f64 - candidate_features.bedrooms as f64;
        if bedroom_delta != 0.0 {
            adjustments.insert(AdjustedFeature::Bedrooms, bedroom_delta * rates.per_bedroom);
        }

        let bathroom_delta =
            subject_features.bathrooms as f64 - candidate_features.bathrooms as f64;
        if bathroom_delta != 0.0 {
            adjustments.insert(
                AdjustedFeature::Bathrooms,
                bathroom_delta * rates.per_bathroom,
            );
        }

        let lot_delta = subject_features.lot_acres - candidate_features.lot_acres;
        if lot_delta != 0.0 {
            adjustments.insert(AdjustedFeature::LotSize, lot_delta * rates.per_lot_acre);
        }

        let age_delta = (subject.age_years(as_of) - candidate.age_years(as_of)) as f64;
        if age_delta != 0.0 {
            adjustments.insert(AdjustedFeature::Age, age_delta * rates.per_year_of_age);
        }

        adjustments
    }
}

/// Great-circle distance between two coordinates.
pub(crate) fn haversine_km(a: &Location, b: &Location) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::valuation::domain::{PropertyId, SaleEvent, StructuralFeatures};

    fn property(id: &str, sqft: f64, bedrooms: u8, year_built: i32, price: f64) -> Property {
        Property {
            id: PropertyId(id.to_string()),
            location: Location {
                latitude: 41.60,
                longitude: -93.61,
                admin_area: "Polk County".to_string(),
            },
            features: StructuralFeatures {
                living_area_sqft: sqft,
                bedrooms,
                bathrooms: 2.0,
                year_built,
                lot_acres: 0.25,
            },
            sale_history: vec![SaleEvent {
                date: NaiveDate::from_ymd_opt(2026, 3, 15).expect("valid date"),
                price,
            }],
        }
    }

    fn scope() -> MarketScope {
        MarketScope {
            admin_area: "Polk County".to_string(),
            center: Location {
                latitude: 41.60,
                longitude: -93.61,
                admin_area: "Polk County".to_string(),
            },
            max_radius_km: 5.0,
            max_sale_age_days: 365,
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date")
    }

    #[test]
    fn exact_match_scores_full_similarity_with_zero_adjustments() {
        let subject = property("subject", 2000.0, 3, 2012, 0.0);
        let twin = property("twin", 2000.0, 3, 2012, 305_000.0);
        let selector = ComparableSelector::new(ComparableConfig {
            min_comparables: 1,
            ..ComparableConfig::default()
        });

        let set = selector
            .select(&subject, &[twin], &scope(), as_of())
            .expect("twin qualifies");

        let comparable = &set.comparables[0];
        assert!(comparable.adjustments.is_empty());
        assert_eq!(comparable.adjusted_price, 305_000.0);
        // Only recency drags on the score for an identical co-located twin.
        assert!(comparable.similarity > 0.95);
    }

    #[test]
    fn candidates_are_ranked_by_descending_similarity() {
        let subject = property("subject", 2000.0, 3, 2012, 0.0);
        let close = property("close", 2050.0, 3, 2011, 300_000.0);
        let far = property("far", 3200.0, 5, 1985, 410_000.0);
        let selector = ComparableSelector::new(ComparableConfig {
            min_comparables: 2,
            similarity_floor: 0.0,
            ..ComparableConfig::default()
        });

        let set = selector
            .select(&subject, &[far.clone(), close.clone()], &scope(), as_of())
            .expect("both qualify");

        assert_eq!(set.comparables[0].property.id, close.id);
        assert_eq!(set.comparables[1].property.id, far.id);
        assert!(set.comparables[0].similarity > set.comparables[1].similarity);
    }

    #[test]
    fn too_few_above_floor_fails_with_counts() {
        let subject = property("subject", 2000.0, 3, 2012, 0.0);
        let alien = property("alien", 9000.0, 8, 1900, 2_000_000.0);
        let selector = ComparableSelector::new(ComparableConfig::default());

        let error = selector
            .select(&subject, &[alien], &scope(), as_of())
            .expect_err("floor rejects the only candidate");

        match error {
            ValuationError::InsufficientComparables { found, required } => {
                assert_eq!(found, 0);
                assert_eq!(required, 3);
            }
            other => panic!("expected InsufficientComparables, got {other:?}"),
        }
    }

    #[test]
    fn stale_sales_are_excluded() {
        let subject = property("subject", 2000.0, 3, 2012, 0.0);
        let mut stale = property("stale", 2000.0, 3, 2012, 300_000.0);
        stale.sale_history = vec![SaleEvent {
            date: NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date"),
            price: 300_000.0,
        }];
        let selector = ComparableSelector::new(ComparableConfig {
            min_comparables: 1,
            ..ComparableConfig::default()
        });

        assert!(selector
            .select(&subject, &[stale], &scope(), as_of())
            .is_err());
    }

    #[test]
    fn smaller_comparable_gets_positive_area_adjustment() {
        let subject = property("subject", 2200.0, 4, 2012, 0.0);
        let smaller = property("smaller", 2000.0, 3, 2012, 300_000.0);
        let selector = ComparableSelector::new(ComparableConfig {
            min_comparables: 1,
            similarity_floor: 0.0,
            ..ComparableConfig::default()
        });

        let set = selector
            .select(&subject, &[smaller], &scope(), as_of())
            .expect("qualifies");
        let comparable = &set.comparables[0];

        let area = comparable.adjustments[&AdjustedFeature::Area];
        assert!((area - 200.0 * 150.0).abs() < 1e-9);
        let bedrooms = comparable.adjustments[&AdjustedFeature::Bedrooms];
        assert_eq!(bedrooms, 5_000.0);
        assert!((comparable.adjusted_price - 335_000.0).abs() < 1e-9);
    }

    #[test]
    fn haversine_is_zero_for_identical_points_and_symmetric() {
        let a = Location {
            latitude: 41.6,
            longitude: -93.61,
            admin_area: String::new(),
        };
        let b = Location {
            latitude: 41.65,
            longitude: -93.55,
            admin_area: String::new(),
        };
        assert_eq!(haversine_km(&a, &a), 0.0);
        assert!((haversine_km(&a, &b) - haversine_km(&b, &a)).abs() < 1e-9);
        assert!(haversine_km(&a, &b) > 5.0 && haversine_km(&a, &b) < 10.0);
    }
}
