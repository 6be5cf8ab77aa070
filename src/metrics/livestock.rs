//! LIVESTOCK METRICS
//!
//! Carrying capacity (animal-equivalents), residency days and forage
//! status for one sub-lot.
//!
//! **Zero guards**: a zero intake, herd or area resolves the dependent
//! metric to 0 instead of dividing.

use crate::config::{HerdParameters, PastureParameters};
use crate::metrics::biomass::BiomassState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// kg → tonne-equivalent factor in the animal-equivalent definition.
///
/// Kept exactly as used by the dashboard; its derivation is undocumented.
pub const ANIMAL_EQUIVALENT_UNITS_FACTOR: f64 = 0.001;

/// Residency is never reported above this many days
pub const MAX_RESIDENCY_DAYS: f64 = 10.0;

/// Five-level ordinal forage status on available biomass (kg DM/ha)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForageStatus {
    Critical,
    Low,
    Medium,
    Good,
    Optimal,
}

impl ForageStatus {
    pub const ALL: [ForageStatus; 5] = [
        ForageStatus::Critical,
        ForageStatus::Low,
        ForageStatus::Medium,
        ForageStatus::Good,
        ForageStatus::Optimal,
    ];

    /// Step function over thresholds {200, 400, 600, 800}
    pub fn from_available(available_kg_ha: f64) -> Self {
        if available_kg_ha >= 800.0 {
            ForageStatus::Optimal
        } else if available_kg_ha >= 600.0 {
            ForageStatus::Good
        } else if available_kg_ha >= 400.0 {
            ForageStatus::Medium
        } else if available_kg_ha >= 200.0 {
            ForageStatus::Low
        } else {
            ForageStatus::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ForageStatus::Critical => "CRITICAL",
            ForageStatus::Low => "LOW",
            ForageStatus::Medium => "MEDIUM",
            ForageStatus::Good => "GOOD",
            ForageStatus::Optimal => "OPTIMAL",
        }
    }
}

impl fmt::Display for ForageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Livestock fields attached to a sub-lot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LivestockMetrics {
    /// Animal-equivalents the sub-lot can support
    pub supportable_units: f64,
    pub residency_days: f64,
    pub total_biomass_kg: f64,
    /// kg DM per animal per day
    pub individual_intake_kg: f64,
    pub forage_status: ForageStatus,
    pub units_per_ha: f64,
}

/// Compute livestock metrics for one sub-lot
pub fn calculate_livestock_metrics(
    biomass: &BiomassState,
    area_ha: f64,
    params: &PastureParameters,
    herd: &HerdParameters,
) -> LivestockMetrics {
    let available = biomass.available_biomass_kg_ha;
    let individual_intake = herd.body_weight_kg * params.intake_fraction;
    let total_biomass = available * area_ha;

    let units_per_day = if individual_intake > 0.0 {
        total_biomass * ANIMAL_EQUIVALENT_UNITS_FACTOR / individual_intake
    } else {
        0.0
    };
    let supportable_units = if params.utilization_rate > 0.0 {
        units_per_day / params.utilization_rate
    } else {
        0.0
    };

    let residency_days = if herd.herd_size > 0 {
        let daily_herd_intake = herd.herd_size as f64 * individual_intake;
        if daily_herd_intake > 0.0 {
            (total_biomass / daily_herd_intake).min(MAX_RESIDENCY_DAYS)
        } else {
            0.0
        }
    } else {
        0.0
    };

    let units_per_ha = if area_ha > 0.0 {
        supportable_units / area_ha
    } else {
        0.0
    };

    LivestockMetrics {
        supportable_units,
        residency_days,
        total_biomass_kg: total_biomass,
        individual_intake_kg: individual_intake,
        forage_status: ForageStatus::from_available(available),
        units_per_ha,
    }
}
