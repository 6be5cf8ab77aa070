//! Per-sub-lot metric modules
//!
//! Each stage is a pure function of its inputs so sub-lots can be
//! evaluated independently (and in parallel) once vegetation is sampled.

pub mod vegetation;
pub mod biomass;
pub mod livestock;

pub use vegetation::{
    apply_threshold, classify_observed, classify_sublots, compare_with_observed,
    sample_vegetation, ModelComparison, ObservedIndices, SpectralIndices, SurfaceType,
    VegetationSample, VegetationState,
};
pub use biomass::{estimate_biomass, estimate_observed_biomass, BiomassState};
pub use livestock::{calculate_livestock_metrics, ForageStatus, LivestockMetrics};

use crate::config::{HerdParameters, PastureParameters};
use crate::geometry::SubLot;
use serde::{Deserialize, Serialize};

/// A sub-lot with every downstream stage attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSubLot {
    pub sublot: SubLot,
    pub vegetation: VegetationState,
    /// Present only for sub-lots classified from observed values
    pub spectral: Option<SpectralIndices>,
    pub biomass: BiomassState,
    pub livestock: LivestockMetrics,
}

/// Biomass and livestock stages for one classified sub-lot
pub fn evaluate_sublot(
    sublot: &SubLot,
    vegetation: VegetationState,
    spectral: Option<SpectralIndices>,
    pasture: &PastureParameters,
    herd: &HerdParameters,
) -> EnrichedSubLot {
    let biomass = match spectral {
        Some(_) => estimate_observed_biomass(&vegetation, pasture),
        None => estimate_biomass(&vegetation, pasture),
    };
    let livestock = calculate_livestock_metrics(&biomass, sublot.area_ha, pasture, herd);

    EnrichedSubLot {
        sublot: sublot.clone(),
        vegetation,
        spectral,
        biomass,
        livestock,
    }
}
