use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for ingested properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub String);

/// Identifier wrapper for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub admin_area: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralFeatures {
    pub living_area_sqft: f64,
    pub bedrooms: u8,
    pub bathrooms: f32,
    pub year_built: i32,
    pub lot_acres: f64,
}

/// One closed sale from a property's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub date: NaiveDate,
    pub price: f64,
}

/// Subject or candidate property. Immutable once ingested; superseded by
/// re-ingestion, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub location: Location,
    pub features: StructuralFeatures,
    /// Sale history ordered oldest to newest.
    pub sale_history: Vec<SaleEvent>,
}

impl Property {
    pub fn age_years(&self, as_of: NaiveDate) -> i32 {
        (as_of.years_since(
            NaiveDate::from_ymd_opt(self.features.year_built, 1, 1).unwrap_or(as_of),
        )
        .unwrap_or(0)) as i32
    }

    /// Most recent sale no older than `max_age_days` as of the given date.
    pub fn latest_sale_within(&self, max_age_days: i64, as_of: NaiveDate) -> Option<SaleEvent> {
        let cutoff = as_of - Duration::days(max_age_days);
        self.sale_history
            .iter()
            .rev()
            .find(|sale| sale.date >= cutoff && sale.date <= as_of)
            .copied()
    }
}

/// Geographic and temporal bounds for candidate retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketScope {
    pub admin_area: String,
    pub center: Location,
    pub max_radius_km: f64,
    pub max_sale_age_days: i64,
}

/// Lookback window for trend analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendWindow {
    pub months: u32,
}

/// One observation in the market time series consumed by the trend module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketObservation {
    pub date: NaiveDate,
    pub normalized_price: f64,
    pub days_on_market: f64,
    pub inventory_count: u32,
}

/// Features a comparable's price can be adjusted on to normalize it toward
/// the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustedFeature {
    Area,
    Bedrooms,
    Bathrooms,
    LotSize,
    Age,
}

impl AdjustedFeature {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Area => "living area",
            Self::Bedrooms => "bedrooms",
            Self::Bathrooms => "bathrooms",
            Self::LotSize => "lot size",
            Self::Age => "age",
        }
    }
}

/// A ranked comparable with its similarity score and the signed dollar
/// adjustments applied to normalize its sale price toward the subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparable {
    pub property: Property,
    pub sale: SaleEvent,
    /// Similarity to the subject in [0, 1].
    pub similarity: f64,
    pub adjustments: BTreeMap<AdjustedFeature, f64>,
    pub adjusted_price: f64,
}

impl Comparable {
    pub fn total_adjustment(&self) -> f64 {
        self.adjustments.values().sum()
    }
}

/// Comparables selected for one subject, ordered by descending similarity.
/// Read-only once built; shared across concurrent evaluators within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableSet {
    pub subject_id: PropertyId,
    pub comparables: Vec<Comparable>,
}

impl ComparableSet {
    pub fn len(&self) -> usize {
        self.comparables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparables.is_empty()
    }
}

/// The three registered valuation methodologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    PricePerArea,
    SalesComparison,
    Regression,
}

impl MethodKind {
    pub const fn ordered() -> [Self; 3] {
        [Self::PricePerArea, Self::SalesComparison, Self::Regression]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PricePerArea => "Price per Area",
            Self::SalesComparison => "Sales Comparison",
            Self::Regression => "Regression",
        }
    }
}

/// Point estimate plus uncertainty band from a single methodology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    pub method: MethodKind,
    pub point_estimate: f64,
    pub band_low: f64,
    pub band_high: f64,
    /// Data-sufficiency weight in [0, 1], not a probability.
    pub confidence: f64,
}

/// Local, tolerated reasons an evaluator can decline to produce a result.
/// These degrade coverage instead of aborting the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UnavailableReason {
    #[error("method requires at least {required} comparables, found {found}")]
    TooFewComparables { found: usize, required: usize },
    #[error("comparable features are degenerate (no variance to fit against)")]
    DegenerateFeatures,
    #[error("subject living area is zero or negative")]
    ZeroArea,
    #[error("evaluator exceeded the configured timeout")]
    TimedOut,
    #[error("evaluator task failed before reporting")]
    TaskFailed,
}

/// Per-method slot collected at the reconciliation barrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum MethodOutcome {
    Evaluated(MethodResult),
    Unavailable {
        method: MethodKind,
        reason: UnavailableReason,
    },
}

impl MethodOutcome {
    pub fn method(&self) -> MethodKind {
        match self {
            Self::Evaluated(result) => result.method,
            Self::Unavailable { method, .. } => *method,
        }
    }

    pub fn result(&self) -> Option<&MethodResult> {
        match self {
            Self::Evaluated(result) => Some(result),
            Self::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendClassification {
    Rising,
    Stable,
    Declining,
    Volatile,
}

impl TrendClassification {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rising => "Rising",
            Self::Stable => "Stable",
            Self::Declining => "Declining",
            Self::Volatile => "Volatile",
        }
    }
}

/// Forward price estimate derived from the fitted velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendForecast {
    pub horizon_months: u32,
    pub projected_price: f64,
    /// Confidence of the forecast itself in [0, 1].
    pub confidence: f64,
}

/// Market trajectory signal, independent of any single property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSignal {
    pub window_months: u32,
    /// Fractional price change per month (0.01 = +1%/month).
    pub price_velocity: f64,
    pub inventory_level: f64,
    pub days_on_market_avg: f64,
    pub classification: TrendClassification,
    /// Month-of-year price index around 1.0 for the observation midpoint.
    pub seasonal_index: f64,
    pub forecast: TrendForecast,
    /// True when sparse data forced the stable default instead of a fit.
    pub degraded: bool,
}

/// Building systems rated during a condition assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSystem {
    Structural,
    Electrical,
    Plumbing,
    Hvac,
    Roof,
    Other,
}

impl ConditionSystem {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Structural,
            Self::Electrical,
            Self::Plumbing,
            Self::Hvac,
            Self::Roof,
            Self::Other,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Structural => "Structural",
            Self::Electrical => "Electrical",
            Self::Plumbing => "Plumbing",
            Self::Hvac => "HVAC",
            Self::Roof => "Roof",
            Self::Other => "Other",
        }
    }
}

/// Ordinal per-system rating captured by the inspection collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRating {
    Sound,
    Worn,
    Deficient,
    Failing,
}

impl SystemRating {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sound => "Sound",
            Self::Worn => "Worn",
            Self::Deficient => "Deficient",
            Self::Failing => "Failing",
        }
    }

    /// Contribution to the aggregate condition score, 1.0 = sound.
    pub const fn score(self) -> f64 {
        match self {
            Self::Sound => 1.0,
            Self::Worn => 0.75,
            Self::Deficient => 0.45,
            Self::Failing => 0.15,
        }
    }
}

/// One flagged defect with its severity weight and repair cost range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionIssue {
    pub system: ConditionSystem,
    /// Severity weight in [0, 1] feeding the multiplicative penalty.
    pub severity: f64,
    pub repair_cost_low: f64,
    pub repair_cost_high: f64,
    pub note: String,
}

impl ConditionIssue {
    pub fn cost_midpoint(&self) -> f64 {
        (self.repair_cost_low + self.repair_cost_high) / 2.0
    }
}

/// Structured condition input; free-text extraction happens upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionAssessment {
    pub ratings: BTreeMap<ConditionSystem, SystemRating>,
    pub issues: Vec<ConditionIssue>,
}

impl ConditionAssessment {
    /// Aggregate condition score in [0, 1]; unrated systems count as sound.
    pub fn aggregate_score(&self) -> f64 {
        let systems = ConditionSystem::ordered();
        let total: f64 = systems
            .iter()
            .map(|system| {
                self.ratings
                    .get(system)
                    .map(|rating| rating.score())
                    .unwrap_or(1.0)
            })
            .sum();
        total / systems.len() as f64
    }
}

/// Output of the condition adjuster, consumed by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionAdjustment {
    /// Market-perception multiplier, clamped to the configured floor.
    pub multiplier: f64,
    /// Capital needed to remediate flagged issues; reported, never merged
    /// into the multiplier.
    pub cost_to_cure: f64,
    /// False when no assessment was supplied; reconciliation lowers
    /// confidence accordingly.
    pub assessed: bool,
}

impl ConditionAdjustment {
    pub fn unassessed() -> Self {
        Self {
            multiplier: 1.0,
            cost_to_cure: 0.0,
            assessed: false,
        }
    }
}

/// Reconciled output: one value, one range, one confidence, with the full
/// adjustment trail preserved for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationEstimate {
    pub point_value: f64,
    pub range_low: f64,
    pub range_high: f64,
    pub confidence: f64,
    pub method_weights: BTreeMap<MethodKind, f64>,
    /// Fraction of registered methods that produced a usable result.
    pub coverage: f64,
    /// Relative spread (max - min) / base across method estimates.
    pub disagreement: f64,
    pub disagreement_penalty: f64,
    pub trend_factor: f64,
    pub condition_multiplier: f64,
    pub cost_to_cure: f64,
    pub value_net_of_repairs: f64,
}

/// Stages of a valuation run, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Initiated,
    ComparablesResolved,
    MethodsEvaluated,
    TrendComputed,
    ConditionApplied,
    Reconciled,
    Finalized,
    Failed,
}

impl RunStage {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Initiated,
            Self::ComparablesResolved,
            Self::MethodsEvaluated,
            Self::TrendComputed,
            Self::ConditionApplied,
            Self::Reconciled,
            Self::Finalized,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Initiated => "Initiated",
            Self::ComparablesResolved => "Comparables Resolved",
            Self::MethodsEvaluated => "Methods Evaluated",
            Self::TrendComputed => "Trend Computed",
            Self::ConditionApplied => "Condition Applied",
            Self::Reconciled => "Reconciled",
            Self::Finalized => "Finalized",
            Self::Failed => "Failed",
        }
    }
}

/// Inbound request for one valuation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRequest {
    pub subject: Property,
    pub scope: MarketScope,
    pub window: TrendWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<ConditionAssessment>,
    /// Valuation date; sale recency and ages are computed against it.
    pub as_of: NaiveDate,
}

/// The terminal, immutable artifact of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    pub run_id: RunId,
    pub subject: Property,
    pub as_of: NaiveDate,
    pub comparables: ComparableSet,
    pub method_outcomes: Vec<MethodOutcome>,
    pub trend: TrendSignal,
    pub condition: ConditionAdjustment,
    pub estimate: ValuationEstimate,
    pub created_at: DateTime<Utc>,
}

/// Fatal error taxonomy; everything else degrades confidence instead.
#[derive(Debug, thiserror::Error)]
pub enum ValuationError {
    #[error("only {found} comparables passed the similarity floor, {required} required")]
    InsufficientComparables { found: usize, required: usize },
    #[error("no valuation method produced a usable result")]
    NoUsableMethod,
    #[error("market data source unavailable: {0}")]
    DataUnavailable(String),
}
