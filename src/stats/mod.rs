//! Statistical diagnostics over the forage table
//!
//! - `correlation`: Pearson matrix and the three fixed scatter fits
//! - `regression`: OLS multiple regression with pseudo-inverse fallback

pub mod correlation;
pub mod regression;

pub use correlation::{
    analyze_correlations, correlation_matrix, linear_fit, CorrelationAnalysis, CorrelationMatrix,
    ScatterFit, SCATTER_PAIRS,
};
pub use regression::{
    fit_multiple_regression, fit_units_per_ha, r_squared, RegressionSummary,
    REGRESSION_DEPENDENT, REGRESSION_PREDICTORS,
};

use crate::data::columns;

/// Columns of the diagnostics table, in display order
pub const DIAGNOSTIC_COLUMNS: [&str; 6] = [
    columns::AVAILABLE_BIOMASS,
    columns::UNITS_PER_HA,
    columns::RESIDENCY_DAYS,
    columns::NDVI,
    columns::COVER,
    columns::AREA_HA,
];

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1); 0 for fewer than two values
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}
