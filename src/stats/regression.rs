//! Multiple linear regression
//!
//! Ordinary least squares of `units_per_ha` on biomass, NDVI, cover and
//! area. Coefficients come from the normal equations `(XᵀX)β = Xᵀy` with an
//! intercept column when X is well conditioned. A rank-deficient or
//! ill-conditioned X (judged from its singular values) is solved through
//! the SVD pseudo-inverse instead, giving the minimum-norm least-squares fit.
//!
//! Available biomass is both a predictor here and an input of the
//! dependent metric. That circularity is deliberate and left in place.
//!
//! **Degenerate input** (missing dependent column, fewer than two usable
//! predictors, fewer than two rows) is returned as `RegressionError`, never
//! as a summary with R² = 0.

use super::{mean, std_dev};
use crate::data::columns;
use crate::error::RegressionError;
use nalgebra::{DMatrix, DVector};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const REGRESSION_DEPENDENT: &str = columns::UNITS_PER_HA;

pub const REGRESSION_PREDICTORS: [&str; 4] = [
    columns::AVAILABLE_BIOMASS,
    columns::NDVI,
    columns::COVER,
    columns::AREA_HA,
];

/// Smallest `σ_min / σ_max` of X still solved through the normal equations
const CONDITION_LIMIT: f64 = 1e-6;

/// Singular values below `σ_max × PINV_EPSILON` count as zero
const PINV_EPSILON: f64 = 1e-10;

/// Fitted model and its diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionSummary {
    pub dependent: String,
    /// Predictors actually used, in coefficient order
    pub predictors: Vec<String>,
    /// Requested predictors dropped as absent or constant
    pub excluded_predictors: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// `coef_i * std(x_i) / std(y)`
    pub standardized_coefficients: Vec<f64>,
    pub r_squared: f64,
    pub mse: f64,
    pub n_observations: usize,
    pub used_pseudo_inverse: bool,
    #[serde(skip)]
    pub actual: Vec<f64>,
    #[serde(skip)]
    pub fitted: Vec<f64>,
}

impl RegressionSummary {
    /// Prediction for one row of predictor values (in `predictors` order)
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    pub fn residuals(&self) -> Vec<f64> {
        self.actual
            .iter()
            .zip(&self.fitted)
            .map(|(a, f)| a - f)
            .collect()
    }

    /// Predictor with the largest absolute standardized coefficient
    pub fn most_influential(&self) -> Option<(&str, f64)> {
        self.predictors
            .iter()
            .zip(&self.standardized_coefficients)
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(name, value)| (name.as_str(), *value))
    }
}

/// `1 - SS_res / SS_tot`; a constant response scores 1 when fitted exactly, else 0
pub fn r_squared(actual: &[f64], fitted: &[f64]) -> f64 {
    let m = mean(actual);
    let ss_tot: f64 = actual.iter().map(|y| (y - m).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(fitted)
        .map(|(y, f)| (y - f).powi(2))
        .sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    }
}

fn column_values(df: &DataFrame, name: &str) -> Option<Vec<f64>> {
    let column = df.column(name).ok()?;
    let casted = column.cast(&DataType::Float64).ok()?;
    let values = casted.f64().ok()?;
    Some(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Fit `dependent` on `predictors` from a table
pub fn fit_multiple_regression(
    df: &DataFrame,
    dependent: &str,
    predictors: &[&str],
) -> Result<RegressionSummary, RegressionError> {
    // STEP 1: Dependent column must exist
    let y_all = column_values(df, dependent)
        .ok_or_else(|| RegressionError::MissingDependent(dependent.to_string()))?;

    // STEP 2: Collect present predictors, then keep complete rows
    let mut present: Vec<(&str, Vec<f64>)> = Vec::new();
    let mut excluded: Vec<String> = Vec::new();
    for &name in predictors {
        match column_values(df, name) {
            Some(values) => present.push((name, values)),
            None => excluded.push(name.to_string()),
        }
    }

    let rows: Vec<usize> = (0..y_all.len())
        .filter(|&i| y_all[i].is_finite() && present.iter().all(|(_, v)| v[i].is_finite()))
        .collect();

    // STEP 3: Constant predictors carry no information beside the intercept
    let mut used: Vec<(&str, Vec<f64>)> = Vec::new();
    for (name, values) in present {
        let subset: Vec<f64> = rows.iter().map(|&i| values[i]).collect();
        if std_dev(&subset) > 0.0 {
            used.push((name, subset));
        } else {
            excluded.push(name.to_string());
        }
    }

    if used.len() < 2 {
        return Err(RegressionError::InsufficientPredictors { usable: used.len() });
    }
    let n = rows.len();
    if n < 2 {
        return Err(RegressionError::TooFewObservations(n));
    }

    let y: Vec<f64> = rows.iter().map(|&i| y_all[i]).collect();
    let p = used.len();

    // STEP 4: Design matrix with leading intercept column
    let x = DMatrix::from_fn(n, p + 1, |r, c| if c == 0 { 1.0 } else { used[c - 1].1[r] });
    let y_vec = DVector::from_column_slice(&y);

    let svd = x.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    let sigma_min = svd.singular_values.min();
    let well_conditioned = n > p && sigma_max > 0.0 && sigma_min >= sigma_max * CONDITION_LIMIT;

    let normal = if well_conditioned {
        (x.transpose() * &x)
            .try_inverse()
            .map(|inv| inv * x.transpose() * &y_vec)
            .filter(|beta| beta.iter().all(|b| b.is_finite()))
    } else {
        None
    };

    let (beta, used_pseudo_inverse) = match normal {
        Some(beta) => (beta, false),
        None => {
            tracing::debug!(
                "Design matrix ill conditioned (σ_min/σ_max = {:.3e}); solving with pseudo-inverse",
                if sigma_max > 0.0 { sigma_min / sigma_max } else { 0.0 }
            );
            match svd.solve(&y_vec, sigma_max * PINV_EPSILON) {
                Ok(beta) => (beta, true),
                Err(e) => {
                    tracing::warn!("Pseudo-inverse failed ({}); coefficients set to zero", e);
                    (DVector::zeros(p + 1), true)
                }
            }
        }
    };

    // STEP 5: Fit statistics
    let fitted_vec = &x * &beta;
    let fitted: Vec<f64> = fitted_vec.iter().copied().collect();
    let r2 = r_squared(&y, &fitted);
    let mse = y
        .iter()
        .zip(&fitted)
        .map(|(a, f)| (a - f).powi(2))
        .sum::<f64>()
        / n as f64;

    let coefficients: Vec<f64> = beta.iter().skip(1).copied().collect();
    let sd_y = std_dev(&y);
    let standardized_coefficients = coefficients
        .iter()
        .zip(&used)
        .map(|(coef, (_, values))| {
            if sd_y > 0.0 {
                coef * std_dev(values) / sd_y
            } else {
                0.0
            }
        })
        .collect();

    Ok(RegressionSummary {
        dependent: dependent.to_string(),
        predictors: used.iter().map(|(name, _)| name.to_string()).collect(),
        excluded_predictors: excluded,
        intercept: beta[0],
        coefficients,
        standardized_coefficients,
        r_squared: r2,
        mse,
        n_observations: n,
        used_pseudo_inverse,
        actual: y,
        fitted,
    })
}

/// The dashboard's fixed model: units/ha on biomass, NDVI, cover and area
pub fn fit_units_per_ha(df: &DataFrame) -> Result<RegressionSummary, RegressionError> {
    fit_multiple_regression(df, REGRESSION_DEPENDENT, &REGRESSION_PREDICTORS)
}
