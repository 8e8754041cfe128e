use tracing::debug;

use super::config::TrendConfig;
use super::domain::{MarketObservation, TrendClassification, TrendForecast, TrendSignal, TrendWindow};

const DAYS_PER_MONTH: f64 = 30.44;
/// Confidence assigned when sparse data forces the stable default.
const DEGRADED_CONFIDENCE: f64 = 0.2;

/// Computes market trajectory signals over a time window. Never fails hard:
/// sparse data degrades to a stable default with low confidence so trend
/// absence softens an estimate instead of blocking it.
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn compute(&self, series: &[MarketObservation], window: TrendWindow) -> TrendSignal {
        let mut observations: Vec<MarketObservation> = series.to_vec();
        observations.sort_by(|a, b| a.date.cmp(&b.date));

        if observations.len() < self.config.min_observations {
            debug!(
                observations = observations.len(),
                required = self.config.min_observations,
                "trend series too sparse, degrading to stable default"
            );
            return self.degraded_signal(&observations, window);
        }

        let first_date = observations[0].date;
        let points: Vec<(f64, f64)> = observations
            .iter()
            .map(|observation| {
                let months = (observation.date - first_date).num_days() as f64 / DAYS_PER_MONTH;
                (months, observation.normalized_price)
            })
            .collect();

        let mut prices: Vec<f64> = points.iter().map(|(_, price)| *price).collect();
        prices.sort_by(f64::total_cmp);
        let median_price = median_of_sorted(&prices);
        if median_price <= 0.0 {
            return self.degraded_signal(&observations, window);
        }

        let slope = theil_sen_slope(&points);
        let intercept = median_of(
            points
                .iter()
                .map(|(months, price)| price - slope * months)
                .collect(),
        );
        let velocity = slope / median_price;

        let dispersion = median_of(
            points
                .iter()
                .map(|(months, price)| (price - (slope * months + intercept)).abs())
                .collect(),
        ) / median_price;

        let classification = if dispersion > self.config.volatility_threshold {
            TrendClassification::Volatile
        } else if velocity >= self.config.rising_velocity {
            TrendClassification::Rising
        } else if velocity <= self.config.declining_velocity {
            TrendClassification::Declining
        } else {
            TrendClassification::Stable
        };

        let last_months = points.last().map(|(months, _)| *months).unwrap_or(0.0);
        let horizon = self.config.forecast_horizon_months;
        let level = slope * last_months + intercept;
        let projected_price = level + slope * horizon as f64;

        let sample_factor =
            observations.len() as f64 / (observations.len() as f64 + 6.0);
        let dispersion_factor =
            1.0 - (dispersion / (2.0 * self.config.volatility_threshold)).min(1.0);
        let forecast_confidence = (sample_factor * dispersion_factor).clamp(0.0, 1.0);

        TrendSignal {
            window_months: window.months,
            price_velocity: velocity,
            inventory_level: mean(observations.iter().map(|o| o.inventory_count as f64)),
            days_on_market_avg: mean(observations.iter().map(|o| o.days_on_market)),
            classification,
            seasonal_index: self.seasonal_index(&observations),
            forecast: TrendForecast {
                horizon_months: horizon,
                projected_price,
                confidence: forecast_confidence,
            },
            degraded: false,
        }
    }

    fn degraded_signal(
        &self,
        observations: &[MarketObservation],
        window: TrendWindow,
    ) -> TrendSignal {
        let last_price = observations
            .last()
            .map(|observation| observation.normalized_price)
            .unwrap_or(0.0);

        TrendSignal {
            window_months: window.months,
            price_velocity: 0.0,
            inventory_level: mean(observations.iter().map(|o| o.inventory_count as f64)),
            days_on_market_avg: mean(observations.iter().map(|o| o.days_on_market)),
            classification: TrendClassification::Stable,
            seasonal_index: self.seasonal_index(observations),
            forecast: TrendForecast {
                horizon_months: self.config.forecast_horizon_months,
                projected_price: last_price,
                confidence: DEGRADED_CONFIDENCE,
            },
            degraded: true,
        }
    }

    /// Month-of-year index for the latest observation. A full year of data
    /// derives its own table; shorter series fall back to the configured one.
    fn seasonal_index(&self, observations: &[MarketObservation]) -> f64 {
        use chrono::Datelike;

        let Some(latest) = observations.last() else {
            return 1.0;
        };
        let month_index = latest.date.month0() as usize;

        if observations.len() >= 12 {
            let overall = mean(observations.iter().map(|o| o.normalized_price));
            if overall > 0.0 {
                let in_month: Vec<f64> = observations
                    .iter()
                    .filter(|o| o.date.month0() as usize == month_index)
                    .map(|o| o.normalized_price)
                    .collect();
                if !in_month.is_empty() {
                    return mean(in_month.iter().copied()) / overall;
                }
            }
        }

        self.config.seasonal_fallback[month_index]
    }
}

/// Median of pairwise slopes; robust to individual outlier observations.
fn theil_sen_slope(points: &[(f64, f64)]) -> f64 {
    let mut slopes = Vec::with_capacity(points.len() * (points.len() - 1) / 2);
    for (i, (x_i, y_i)) in points.iter().enumerate() {
        for (x_j, y_j) in points.iter().skip(i + 1) {
            let dx = x_j - x_i;
            if dx.abs() > f64::EPSILON {
                slopes.push((y_j - y_i) / dx);
            }
        }
    }
    if slopes.is_empty() {
        return 0.0;
    }
    median_of(slopes)
}

fn median_of(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    median_of_sorted(&values)
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
