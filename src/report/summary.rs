//! Run-level aggregates feeding the executive summary and parameters document

use crate::config::{AnalysisConfig, HerdParameters, PastureParameters, PastureType};
use crate::metrics::{EnrichedSubLot, ForageStatus, SurfaceType};
use crate::stats::RegressionSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Parameters the run was produced with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametersDocument {
    pub pasture_type: PastureType,
    pub pasture: PastureParameters,
    pub herd: HerdParameters,
    pub n_sublots: usize,
    pub vegetation_threshold: f64,
    pub seed: u64,
    pub generated_at: DateTime<Utc>,
}

impl ParametersDocument {
    pub fn new(config: &AnalysisConfig, generated_at: DateTime<Utc>) -> Self {
        Self {
            pasture_type: config.pasture_type,
            pasture: config.pasture,
            herd: config.herd,
            n_sublots: config.n_sublots,
            vegetation_threshold: config.vegetation_threshold,
            seed: config.seed,
            generated_at,
        }
    }
}

/// Aggregated view of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub pasture_type: PastureType,
    pub n_sublots: usize,
    pub total_area_ha: f64,
    pub surface_counts: Vec<(SurfaceType, usize)>,
    pub status_counts: Vec<(ForageStatus, usize)>,
    pub mean_available_biomass_kg_ha: f64,
    pub total_biomass_kg: f64,
    pub total_supportable_units: f64,
    pub mean_residency_days: f64,
    pub regression_r_squared: Option<f64>,
    /// Predictor with the largest |standardized coefficient|
    pub top_predictor: Option<(String, f64)>,
    pub dominant_status: Option<ForageStatus>,
    pub recommendation: String,
}

impl RunSummary {
    pub fn from_rows(
        pasture_type: PastureType,
        rows: &[EnrichedSubLot],
        regression: Option<&RegressionSummary>,
    ) -> Self {
        let n = rows.len();
        let mean = |total: f64| if n > 0 { total / n as f64 } else { 0.0 };

        let surface_counts: Vec<(SurfaceType, usize)> = SurfaceType::ALL
            .iter()
            .map(|s| (*s, rows.iter().filter(|r| r.vegetation.surface_type == *s).count()))
            .collect();
        let status_counts: Vec<(ForageStatus, usize)> = ForageStatus::ALL
            .iter()
            .map(|s| (*s, rows.iter().filter(|r| r.livestock.forage_status == *s).count()))
            .collect();

        // Ties resolve to the lower status
        let dominant_status = status_counts
            .iter()
            .filter(|(_, count)| *count > 0)
            .max_by_key(|(status, count)| (*count, Reverse(*status)))
            .map(|(status, _)| *status);

        Self {
            pasture_type,
            n_sublots: n,
            total_area_ha: rows.iter().map(|r| r.sublot.area_ha).sum(),
            surface_counts,
            status_counts,
            mean_available_biomass_kg_ha: mean(
                rows.iter().map(|r| r.biomass.available_biomass_kg_ha).sum(),
            ),
            total_biomass_kg: rows.iter().map(|r| r.livestock.total_biomass_kg).sum(),
            total_supportable_units: rows.iter().map(|r| r.livestock.supportable_units).sum(),
            mean_residency_days: mean(rows.iter().map(|r| r.livestock.residency_days).sum()),
            regression_r_squared: regression.map(|r| r.r_squared),
            top_predictor: regression
                .and_then(|r| r.most_influential())
                .map(|(name, value)| (name.to_string(), value)),
            dominant_status,
            recommendation: recommendation(dominant_status).to_string(),
        }
    }

    pub fn surface_count(&self, surface_type: SurfaceType) -> usize {
        self.surface_counts
            .iter()
            .find(|(s, _)| *s == surface_type)
            .map_or(0, |(_, count)| *count)
    }
}

/// Management advice for the most common forage status
pub fn recommendation(dominant: Option<ForageStatus>) -> &'static str {
    match dominant {
        None => "No sub-lots were analysed.",
        Some(ForageStatus::Critical) => {
            "Exclude grazing and let the pasture recover before the next rotation."
        }
        Some(ForageStatus::Low) => {
            "Shorten occupation periods and reduce stocking; supplement if grazing continues."
        }
        Some(ForageStatus::Medium) => {
            "Graze at moderate stocking and monitor residual biomass between rotations."
        }
        Some(ForageStatus::Good) => "Suitable for rotational grazing at the planned stocking rate.",
        Some(ForageStatus::Optimal) => {
            "Forage is abundant; stocking can increase or surplus can be cut for reserves."
        }
    }
}
