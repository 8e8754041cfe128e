use serde::Serialize;

use super::domain::{MethodOutcome, RunId, ValuationRecord};
use super::orchestrator::ValuationFailure;

/// Flattened, label-bearing projection of a record for the report-rendering
/// collaborator. The record itself stays the canonical artifact; these views
/// only exist so downstream renderers never reach into domain internals.
#[derive(Debug, Clone, Serialize)]
pub struct ValuationSummary {
    pub run_id: RunId,
    pub subject_id: String,
    pub admin_area: String,
    pub as_of: chrono::NaiveDate,
    pub point_value: f64,
    pub range_low: f64,
    pub range_high: f64,
    pub confidence: f64,
    pub coverage: f64,
    pub comparable_count: usize,
    pub methods: Vec<MethodEntry>,
    pub trend: TrendEntry,
    pub condition: ConditionEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodEntry {
    pub method_label: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_estimate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendEntry {
    pub classification_label: &'static str,
    pub monthly_velocity_pct: f64,
    pub days_on_market_avg: f64,
    pub inventory_level: f64,
    pub seasonal_index: f64,
    pub forecast_months: u32,
    pub forecast_price: f64,
    pub forecast_confidence: f64,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConditionEntry {
    pub assessed: bool,
    pub multiplier: f64,
    pub cost_to_cure: f64,
    pub value_net_of_repairs: f64,
}

impl ValuationSummary {
    pub fn from_record(record: &ValuationRecord) -> Self {
        let methods = record
            .method_outcomes
            .iter()
            .map(|outcome| match outcome {
                MethodOutcome::Evaluated(result) => MethodEntry {
                    method_label: result.method.label(),
                    status: "evaluated",
                    point_estimate: Some(result.point_estimate),
                    band_low: Some(result.band_low),
                    band_high: Some(result.band_high),
                    confidence: Some(result.confidence),
                    unavailable_reason: None,
                },
                MethodOutcome::Unavailable { method, reason } => MethodEntry {
                    method_label: method.label(),
                    status: "unavailable",
                    point_estimate: None,
                    band_low: None,
                    band_high: None,
                    confidence: None,
                    unavailable_reason: Some(reason.to_string()),
                },
            })
            .collect();

        Self {
            run_id: record.run_id.clone(),
            subject_id: record.subject.id.0.clone(),
            admin_area: record.subject.location.admin_area.clone(),
            as_of: record.as_of,
            point_value: record.estimate.point_value,
            range_low: record.estimate.range_low,
            range_high: record.estimate.range_high,
            confidence: record.estimate.confidence,
            coverage: record.estimate.coverage,
            comparable_count: record.comparables.len(),
            methods,
            trend: TrendEntry {
                classification_label: record.trend.classification.label(),
                monthly_velocity_pct: record.trend.price_velocity * 100.0,
                days_on_market_avg: record.trend.days_on_market_avg,
                inventory_level: record.trend.inventory_level,
                seasonal_index: record.trend.seasonal_index,
                forecast_months: record.trend.forecast.horizon_months,
                forecast_price: record.trend.forecast.projected_price,
                forecast_confidence: record.trend.forecast.confidence,
                degraded: record.trend.degraded,
            },
            condition: ConditionEntry {
                assessed: record.condition.assessed,
                multiplier: record.condition.multiplier,
                cost_to_cure: record.condition.cost_to_cure,
                value_net_of_repairs: record.estimate.value_net_of_repairs,
            },
        }
    }
}

/// Structured failure payload: the fatal reason plus whatever intermediate
/// artifacts the run had computed, for diagnostics.
#[derive(Debug, Serialize)]
pub struct ValuationFailureView {
    pub run_id: RunId,
    pub completed_stage: &'static str,
    pub error: String,
    pub comparables_resolved: Option<usize>,
    pub methods_reported: Option<usize>,
    pub trend_degraded: Option<bool>,
}

impl ValuationFailureView {
    pub fn from_failure(failure: &ValuationFailure) -> Self {
        Self {
            run_id: failure.run_id.clone(),
            completed_stage: failure.completed_stage.label(),
            error: failure.error.to_string(),
            comparables_resolved: failure.partial.comparables.as_ref().map(|set| set.len()),
            methods_reported: failure
                .partial
                .method_outcomes
                .as_ref()
                .map(|outcomes| outcomes.len()),
            trend_degraded: failure.partial.trend.as_ref().map(|trend| trend.degraded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::valuation::domain::{
        ComparableSet, ConditionAdjustment, Location, MethodKind, MethodResult, Property,
        PropertyId, StructuralFeatures, TrendClassification, TrendForecast, TrendSignal,
        UnavailableReason, ValuationEstimate,
    };
    use chrono::{NaiveDate, Utc};
    use std::collections::BTreeMap;

    fn record() -> ValuationRecord {
        ValuationRecord {
            run_id: RunId("run-000042".to_string()),
            subject: Property {
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
                    year_built: 2010,
                    lot_acres: 0.25,
                },
                sale_history: Vec::new(),
            },
            as_of: NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date"),
            comparables: ComparableSet {
                subject_id: PropertyId("subject".to_string()),
                comparables: Vec::new(),
            },
            method_outcomes: vec![
                MethodOutcome::Evaluated(MethodResult {
                    method: MethodKind::PricePerArea,
                    point_estimate: 305_000.0,
                    band_low: 297_000.0,
                    band_high: 313_000.0,
                    confidence: 0.8,
                }),
                MethodOutcome::Unavailable {
                    method: MethodKind::Regression,
                    reason: UnavailableReason::TooFewComparables {
                        found: 4,
                        required: 5,
                    },
                },
            ],
            trend: TrendSignal {
                window_months: 12,
                price_velocity: 0.004,
                inventory_level: 100.0,
                days_on_market_avg: 32.0,
                classification: TrendClassification::Rising,
                seasonal_index: 1.05,
                forecast: TrendForecast {
                    horizon_months: 6,
                    projected_price: 310_000.0,
                    confidence: 0.7,
                },
                degraded: false,
            },
            condition: ConditionAdjustment {
                multiplier: 0.9,
                cost_to_cure: 8_000.0,
                assessed: true,
            },
            estimate: ValuationEstimate {
                point_value: 275_000.0,
                range_low: 260_000.0,
                range_high: 290_000.0,
                confidence: 0.62,
                method_weights: BTreeMap::new(),
                coverage: 2.0 / 3.0,
                disagreement: 0.02,
                disagreement_penalty: 0.0,
                trend_factor: 1.0014,
                condition_multiplier: 0.9,
                cost_to_cure: 8_000.0,
                value_net_of_repairs: 267_000.0,
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summary_carries_labels_and_both_outcome_shapes() {
        let summary = ValuationSummary::from_record(&record());

        assert_eq!(summary.run_id.0, "run-000042");
        assert_eq!(summary.methods.len(), 2);
        assert_eq!(summary.methods[0].status, "evaluated");
        assert_eq!(summary.methods[0].method_label, "Price per Area");
        assert_eq!(summary.methods[1].status, "unavailable");
        assert!(summary.methods[1]
            .unavailable_reason
            .as_deref()
            .expect("reason carried")
            .contains("comparables"));
        assert_eq!(summary.trend.classification_label, "Rising");
        assert!((summary.trend.monthly_velocity_pct - 0.4).abs() < 1e-9);
        assert_eq!(summary.condition.value_net_of_repairs, 267_000.0);
    }

    #[test]
    fn summary_serializes_without_null_noise_for_unavailable_methods() {
        let summary = ValuationSummary::from_record(&record());
        let value = serde_json::to_value(&summary).expect("serializes");

        let unavailable = &value["methods"][1];
        assert!(unavailable.get("point_estimate").is_none());
        assert!(unavailable.get("unavailable_reason").is_some());
    }
}
