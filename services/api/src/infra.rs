use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use valuation_ai::config::AppConfig;
use valuation_ai::workflows::mls::CsvMarketData;
use valuation_ai::workflows::valuation::domain::{
    ConditionAssessment, ConditionIssue, ConditionSystem, Location, MarketObservation, Property,
    PropertyId, SaleEvent, StructuralFeatures, SystemRating,
};
use valuation_ai::workflows::valuation::ValuationConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Engine calibration layered with the env-level pipeline knobs.
pub(crate) fn valuation_config(app: &AppConfig) -> ValuationConfig {
    ValuationConfig {
        evaluator_timeout_ms: app.pipeline.evaluator_timeout_ms,
        ..ValuationConfig::default()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn seeded_location(latitude: f64, longitude: f64) -> Location {
    Location {
        latitude,
        longitude,
        admin_area: "Sample County".to_string(),
    }
}

fn seeded_candidate(
    id: &str,
    latitude: f64,
    longitude: f64,
    sqft: f64,
    bedrooms: u8,
    bathrooms: f32,
    lot_acres: f64,
    year_built: i32,
    sale: (i32, u32, u32),
    price: f64,
) -> Property {
    Property {
        id: PropertyId(id.to_string()),
        location: seeded_location(latitude, longitude),
        features: StructuralFeatures {
            living_area_sqft: sqft,
            bedrooms,
            bathrooms,
            year_built,
            lot_acres,
        },
        sale_history: vec![SaleEvent {
            date: NaiveDate::from_ymd_opt(sale.0, sale.1, sale.2).expect("valid seed date"),
            price,
        }],
    }
}

/// Seeded market mirroring a suburban single-family pocket: six closed
/// sales around $204/sqft and two years of monthly medians.
pub(crate) fn seeded_market() -> CsvMarketData {
    let candidates = vec![
        seeded_candidate(
            "sample-123-main", 41.600, -93.610, 2200.0, 3, 2.5, 0.25, 2010, (2026, 1, 15), 450_000.0,
        ),
        seeded_candidate(
            "sample-456-oak", 41.604, -93.606, 2400.0, 4, 3.0, 0.30, 2015, (2026, 2, 20), 485_000.0,
        ),
        seeded_candidate(
            "sample-789-pine", 41.596, -93.614, 2000.0, 3, 2.0, 0.20, 2008, (2025, 12, 10), 420_000.0,
        ),
        seeded_candidate(
            "sample-221-elm", 41.602, -93.618, 2150.0, 3, 2.5, 0.24, 2012, (2026, 3, 5), 446_000.0,
        ),
        seeded_candidate(
            "sample-340-birch", 41.598, -93.602, 2320.0, 4, 2.5, 0.28, 2013, (2026, 4, 12), 472_000.0,
        ),
        seeded_candidate(
            "sample-512-cedar", 41.606, -93.612, 2080.0, 3, 2.0, 0.22, 2009, (2026, 2, 2), 434_000.0,
        ),
    ];

    let series = (0..24)
        .map(|offset| {
            let year = 2024 + (offset + 6) / 12;
            let month = (offset + 6) % 12 + 1;
            // Deterministic 0.35%/month climb with a mild summer bump.
            let seasonal = if (5..=8).contains(&(month - 1)) { 1.015 } else { 0.995 };
            MarketObservation {
                date: NaiveDate::from_ymd_opt(year, month as u32, 1).expect("valid seed date"),
                normalized_price: 430_000.0 * (1.0 + 0.0035 * offset as f64) * seasonal,
                days_on_market: 45.0 - offset as f64 * 0.5,
                inventory_count: 120 - offset as u32 * 2,
            }
        })
        .collect();

    CsvMarketData::new(candidates, series)
}

pub(crate) fn seeded_subject() -> Property {
    Property {
        id: PropertyId("sample-subject".to_string()),
        location: seeded_location(41.601, -93.609),
        features: StructuralFeatures {
            living_area_sqft: 2200.0,
            bedrooms: 3,
            bathrooms: 2.5,
            year_built: 2001,
            lot_acres: 0.25,
        },
        sale_history: Vec::new(),
    }
}

/// A 25-year-old house with HVAC and electrical findings, the demo's
/// condition input.
pub(crate) fn seeded_assessment() -> ConditionAssessment {
    ConditionAssessment {
        ratings: BTreeMap::from([
            (ConditionSystem::Structural, SystemRating::Sound),
            (ConditionSystem::Electrical, SystemRating::Deficient),
            (ConditionSystem::Plumbing, SystemRating::Worn),
            (ConditionSystem::Hvac, SystemRating::Deficient),
            (ConditionSystem::Roof, SystemRating::Worn),
        ]),
        issues: vec![
            ConditionIssue {
                system: ConditionSystem::Hvac,
                severity: 0.08,
                repair_cost_low: 6_000.0,
                repair_cost_high: 10_000.0,
                note: "Furnace and compressor past expected service life".to_string(),
            },
            ConditionIssue {
                system: ConditionSystem::Electrical,
                severity: 0.05,
                repair_cost_low: 2_000.0,
                repair_cost_high: 5_000.0,
                note: "Panel upgrade and GFCI coverage needed".to_string(),
            },
        ],
    }
}
