use serde::{Deserialize, Serialize};

/// Calibration for the whole pipeline. Thresholds and weights live here
/// rather than in code; defaults reproduce the production rubric.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    pub comparables: ComparableConfig,
    pub methods: MethodConfig,
    pub trend: TrendConfig,
    pub condition: ConditionConfig,
    pub reconciliation: ReconciliationConfig,
    /// Per-evaluator timeout; a timed-out evaluator counts as unavailable.
    pub evaluator_timeout_ms: Option<u64>,
}

/// Rubric for comparable selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparableConfig {
    /// Candidates scoring below this similarity are discarded.
    pub similarity_floor: f64,
    pub min_comparables: usize,
    pub max_comparables: usize,
    pub weights: SimilarityWeights,
    pub rates: AdjustmentRates,
}

impl Default for ComparableConfig {
    fn default() -> Self {
        Self {
            similarity_floor: 0.55,
            min_comparables: 3,
            max_comparables: 8,
            weights: SimilarityWeights::default(),
            rates: AdjustmentRates::default(),
        }
    }
}

/// Relative importance of each normalized feature difference when scoring
/// similarity. Weights need not sum to one; they are normalized at use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub area: f64,
    pub age: f64,
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub location: f64,
    pub recency: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            area: 0.30,
            age: 0.15,
            bedrooms: 0.10,
            bathrooms: 0.10,
            location: 0.20,
            recency: 0.15,
        }
    }
}

/// Dollar rates used to build per-comparable adjustment vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentRates {
    pub per_bedroom: f64,
    pub per_bathroom: f64,
    pub per_lot_acre: f64,
    pub per_year_of_age: f64,
}

impl Default for AdjustmentRates {
    fn default() -> Self {
        Self {
            per_bedroom: 5_000.0,
            per_bathroom: 10_000.0,
            per_lot_acre: 20_000.0,
            per_year_of_age: -500.0,
        }
    }
}

/// Data preconditions and band sizing for the method evaluators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodConfig {
    /// Minimum comparables for the averaging methods.
    pub min_comparables: usize,
    /// Minimum sample size before the regression will fit at all.
    pub regression_min_samples: usize,
    /// Multiplier on residual scale for the regression prediction band.
    pub regression_band_z: f64,
    /// Coefficient-of-variation bound treated as "tight" by the
    /// sales-comparison quality checks.
    pub tight_cv_bound: f64,
    /// Per-comparable adjustment share treated as "reasonable".
    pub reasonable_adjustment_share: f64,
}

impl Default for MethodConfig {
    fn default() -> Self {
        Self {
            min_comparables: 3,
            regression_min_samples: 5,
            regression_band_z: 1.645,
            tight_cv_bound: 0.10,
            reasonable_adjustment_share: 0.20,
        }
    }
}

/// Velocity bands and dispersion threshold for trend classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Observations required for a real fit; below this the signal degrades.
    pub min_observations: usize,
    /// Monthly velocity at or above which the market counts as rising.
    pub rising_velocity: f64,
    /// Monthly velocity at or below which the market counts as declining.
    pub declining_velocity: f64,
    /// Residual MAD over median price above which the market is volatile
    /// regardless of slope sign.
    pub volatility_threshold: f64,
    pub forecast_horizon_months: u32,
    /// Month-of-year index applied when the series is too short to derive
    /// its own; January first.
    pub seasonal_fallback: [f64; 12],
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_observations: 6,
            rising_velocity: 0.0025,
            declining_velocity: -0.0025,
            volatility_threshold: 0.04,
            forecast_horizon_months: 6,
            seasonal_fallback: [
                0.95, 0.92, 0.98, 1.05, 1.08, 1.10, 1.12, 1.08, 1.05, 1.02, 0.98, 0.95,
            ],
        }
    }
}

/// Condition penalty floor and cost-to-cure indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionConfig {
    /// The multiplicative penalty never drops the multiplier below this.
    pub multiplier_floor: f64,
    /// Regional construction cost index (1.0 = suburban baseline).
    pub regional_cost_index: f64,
    /// Repair complexity growth per year of building age.
    pub age_complexity_per_year: f64,
}

impl Default for ConditionConfig {
    fn default() -> Self {
        Self {
            multiplier_floor: 0.5,
            regional_cost_index: 1.0,
            age_complexity_per_year: 0.01,
        }
    }
}

/// Reconciliation coefficients; all are monotonic in the directions the
/// confidence invariants require.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Relative spread between method estimates tolerated before the
    /// disagreement penalty starts.
    pub disagreement_threshold: f64,
    /// Penalty growth per unit of spread beyond the threshold.
    pub disagreement_slope: f64,
    pub max_disagreement_penalty: f64,
    /// Share of the trend velocity applied to the base estimate at full
    /// forecast confidence.
    pub trend_horizon_weight: f64,
    /// Confidence loss when the trend signal carries zero confidence.
    pub trend_confidence_penalty: f64,
    /// Confidence factor applied when no condition assessment was supplied.
    pub unassessed_condition_factor: f64,
    /// Confidence floor used when inverse-scaling the value range, so a
    /// near-zero confidence cannot blow the range up without bound.
    pub range_confidence_floor: f64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            disagreement_threshold: 0.15,
            disagreement_slope: 1.0,
            max_disagreement_penalty: 0.6,
            trend_horizon_weight: 0.5,
            trend_confidence_penalty: 0.2,
            unassessed_condition_factor: 0.85,
            range_confidence_floor: 0.25,
        }
    }
}
