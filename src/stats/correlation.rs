//! Correlation diagnostics
//!
//! Full pairwise Pearson matrix over the diagnostics columns plus simple
//! least-squares lines for three fixed variable pairs used in the scatter
//! panels.

use super::{mean, DIAGNOSTIC_COLUMNS};
use crate::data::{columns, extract_f64_columns};
use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// (x, y) pairs fitted for the scatter panels
pub const SCATTER_PAIRS: [(&str, &str); 3] = [
    (columns::AVAILABLE_BIOMASS, columns::UNITS_PER_HA),
    (columns::AVAILABLE_BIOMASS, columns::RESIDENCY_DAYS),
    (columns::NDVI, columns::AVAILABLE_BIOMASS),
];

/// Symmetric Pearson matrix with unit diagonal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub variables: Vec<String>,
    /// Row-major, `values[i][j] = r(variables[i], variables[j])`
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    fn new(variables: Vec<String>, values: Vec<Vec<f64>>) -> Self {
        Self { variables, values }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.position(a)?;
        let j = self.position(b)?;
        self.values.get(i)?.get(j).copied()
    }

    /// Numeric form: a `variable` column followed by one column per variable
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut cols = Vec::with_capacity(self.variables.len() + 1);
        cols.push(Column::new("variable".into(), self.variables.clone()));
        for (j, name) in self.variables.iter().enumerate() {
            let column_values: Vec<f64> = self.values.iter().map(|row| row[j]).collect();
            cols.push(Column::new(name.as_str().into(), column_values));
        }
        DataFrame::new(cols).context("Failed to build correlation table")
    }
}

/// Pearson r over pairwise-complete observations
///
/// Undefined correlations (fewer than two pairs, or a constant variable)
/// are reported as 0.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let (xs, ys) = complete_pairs(x, y);
    if xs.len() < 2 {
        return 0.0;
    }

    let mx = mean(&xs);
    let my = mean(&ys);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in xs.iter().zip(&ys) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return 0.0;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

fn complete_pairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .unzip()
}

/// Pearson matrix for the given columns of a table
pub fn correlation_matrix(df: &DataFrame, names: &[&str]) -> Result<CorrelationMatrix> {
    let data = extract_f64_columns(df, names, "Correlation matrix")?;
    let k = names.len();

    let mut values = vec![vec![0.0; k]; k];
    for i in 0..k {
        values[i][i] = 1.0;
        for j in (i + 1)..k {
            let r = pearson(&data[i], &data[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix::new(
        names.iter().map(|s| s.to_string()).collect(),
        values,
    ))
}

/// Least-squares line `y = slope * x + intercept`
///
/// A constant x yields slope 0 through the mean of y.
pub fn linear_fit(x: &[f64], y: &[f64]) -> (f64, f64) {
    let (xs, ys) = complete_pairs(x, y);
    if xs.is_empty() {
        return (0.0, 0.0);
    }

    let mx = mean(&xs);
    let my = mean(&ys);
    let sxx: f64 = xs.iter().map(|a| (a - mx).powi(2)).sum();
    if sxx <= 0.0 {
        return (0.0, my);
    }
    let sxy: f64 = xs.iter().zip(&ys).map(|(a, b)| (a - mx) * (b - my)).sum();

    let slope = sxy / sxx;
    (slope, my - slope * mx)
}

/// One scatter panel: data points plus fitted line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterFit {
    pub x_name: String,
    pub y_name: String,
    pub slope: f64,
    pub intercept: f64,
    pub correlation: f64,
    #[serde(skip)]
    pub x: Vec<f64>,
    #[serde(skip)]
    pub y: Vec<f64>,
}

/// Correlation matrix plus the scatter fits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationAnalysis {
    pub matrix: CorrelationMatrix,
    pub fits: Vec<ScatterFit>,
}

/// Run all correlation diagnostics on the forage table
pub fn analyze_correlations(df: &DataFrame) -> Result<CorrelationAnalysis> {
    let matrix = correlation_matrix(df, &DIAGNOSTIC_COLUMNS)?;

    let mut fits = Vec::with_capacity(SCATTER_PAIRS.len());
    for (x_name, y_name) in SCATTER_PAIRS {
        let mut data = extract_f64_columns(df, &[x_name, y_name], "Scatter fit")?;
        let y = data.pop().unwrap_or_default();
        let x = data.pop().unwrap_or_default();
        let (slope, intercept) = linear_fit(&x, &y);

        fits.push(ScatterFit {
            x_name: x_name.to_string(),
            y_name: y_name.to_string(),
            slope,
            intercept,
            correlation: matrix.get(x_name, y_name).unwrap_or(0.0),
            x,
            y,
        });
    }

    Ok(CorrelationAnalysis { matrix, fits })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pearson_perfect_and_inverse() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(pearson(&x, &[2.0, 4.0, 6.0, 8.0]), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pearson(&x, &[8.0, 6.0, 4.0, 2.0]), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_constant_is_zero() {
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_linear_fit() {
        let (slope, intercept) = linear_fit(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]);
        assert_relative_eq!(slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(intercept, 1.0, epsilon = 1e-12);

        let (slope, intercept) = linear_fit(&[2.0, 2.0], &[1.0, 3.0]);
        assert_eq!(slope, 0.0);
        assert_relative_eq!(intercept, 2.0);
    }

    #[test]
    fn test_matrix_symmetric_unit_diagonal() {
        let df = polars::df!(
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "b" => [2.0, 1.0, 4.0, 3.0, 6.0],
            "c" => [9.0, 7.0, 8.0, 3.0, 1.0],
        )
        .unwrap();

        let m = correlation_matrix(&df, &["a", "b", "c"]).unwrap();
        for i in 0..3 {
            assert_eq!(m.values[i][i], 1.0);
            for j in 0..3 {
                assert_relative_eq!(m.values[i][j], m.values[j][i]);
            }
        }
        assert_relative_eq!(m.get("a", "b").unwrap(), m.values[0][1]);
        assert!(m.get("a", "z").is_none());

        let table = m.to_dataframe().unwrap();
        assert_eq!(table.shape(), (3, 4));
    }

    #[test]
    fn test_lookup_survives_json() {
        let df = polars::df!(
            "a" => [1.0, 2.0, 3.0, 4.0],
            "b" => [1.5, 1.0, 3.5, 3.0],
        )
        .unwrap();
        let m = correlation_matrix(&df, &["a", "b"]).unwrap();
        let before = m.get("a", "b").unwrap();

        let json = serde_json::to_string(&m).unwrap();
        let restored: CorrelationMatrix = serde_json::from_str(&json).unwrap();
        assert_relative_eq!(restored.get("a", "b").unwrap(), before);
        assert_relative_eq!(restored.get("b", "a").unwrap(), before);
        assert_eq!(restored.get("b", "b"), Some(1.0));
        assert!(restored.get("a", "z").is_none());
    }
}
