use nalgebra::{DMatrix, DVector};

use super::MethodEvaluator;
use crate::workflows::valuation::config::MethodConfig;
use crate::workflows::valuation::domain::{
    ComparableSet, MethodKind, MethodResult, Property, UnavailableReason,
};

/// Least-squares fit of sale price on structural features across the
/// comparable set, predicted at the subject's features. Confidence is tied
/// to fit quality and degrees of freedom so small samples stay capped no
/// matter how clean the fit looks.
pub struct RegressionEvaluator;

/// Intercept, living area, bedrooms, year built. Bathrooms track bedrooms
/// too closely in small sets to earn a column of their own.
const FEATURE_COLUMNS: usize = 4;

impl MethodEvaluator for RegressionEvaluator {
    fn kind(&self) -> MethodKind {
        MethodKind::Regression
    }

    fn evaluate(
        &self,
        subject: &Property,
        comparables: &ComparableSet,
        config: &MethodConfig,
    ) -> Result<MethodResult, UnavailableReason> {
        let samples = comparables.len();
        let required = config.regression_min_samples.max(FEATURE_COLUMNS + 1);
        if samples < required {
            return Err(UnavailableReason::TooFewComparables {
                found: samples,
                required,
            });
        }

        let rows: Vec<[f64; FEATURE_COLUMNS]> = comparables
            .comparables
            .iter()
            .map(|comparable| feature_row(&comparable.property))
            .collect();
        let prices: Vec<f64> = comparables
            .comparables
            .iter()
            .map(|comparable| comparable.sale.price)
            .collect();

        // The fit needs something to regress against: living area is the
        // load-bearing column and must vary across the set.
        let area_mean = rows.iter().map(|row| row[1]).sum::<f64>() / samples as f64;
        let area_variance = rows
            .iter()
            .map(|row| (row[1] - area_mean).powi(2))
            .sum::<f64>();
        if area_variance <= f64::EPSILON {
            return Err(UnavailableReason::DegenerateFeatures);
        }

        let design = DMatrix::from_fn(samples, FEATURE_COLUMNS, |row, col| rows[row][col]);
        let observed = DVector::from_column_slice(&prices);
        let beta =
            solve_least_squares(&design, &observed).ok_or(UnavailableReason::DegenerateFeatures)?;

        let fitted = &design * &beta;
        let residuals = &observed - &fitted;
        let sse: f64 = residuals.iter().map(|residual| residual * residual).sum();
        let price_mean = prices.iter().sum::<f64>() / samples as f64;
        let sst: f64 = prices
            .iter()
            .map(|price| (price - price_mean).powi(2))
            .sum();
        if sst <= f64::EPSILON {
            return Err(UnavailableReason::DegenerateFeatures);
        }

        let subject_row = feature_row(subject);
        let prediction: f64 = subject_row
            .iter()
            .zip(beta.iter())
            .map(|(feature, coefficient)| feature * coefficient)
            .sum();
        if !prediction.is_finite() || prediction <= 0.0 {
            return Err(UnavailableReason::DegenerateFeatures);
        }

        let dof = (samples - FEATURE_COLUMNS) as f64;
        let residual_scale = (sse / dof).sqrt();
        let band_width =
            config.regression_band_z * residual_scale * (1.0 + 1.0 / samples as f64).sqrt();

        let r_squared = (1.0 - sse / sst).clamp(0.0, 1.0);
        let dof_cap = dof / (dof + 3.0);
        let confidence = (r_squared * dof_cap).clamp(0.0, 1.0);

        Ok(MethodResult {
            method: MethodKind::Regression,
            point_estimate: prediction,
            band_low: prediction - band_width,
            band_high: prediction + band_width,
            confidence,
        })
    }
}

fn feature_row(property: &Property) -> [f64; FEATURE_COLUMNS] {
    [
        1.0,
        property.features.living_area_sqft,
        property.features.bedrooms as f64,
        property.features.year_built as f64,
    ]
}

/// SVD least-squares solve with escalating tolerances; near-collinear
/// feature columns are common in small comparable sets.
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    for &tolerance in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tolerance) {
            if beta.iter().all(|value| value.is_finite()) {
                return Some(beta);
            }
        }
    }
    None
}
