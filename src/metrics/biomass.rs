//! BIOMASS ESTIMATOR
//!
//! Deterministic conversion of a vegetation state and pasture parameters
//! into standing, available (harvestable) and growth figures.
//!
//! available = standing × quality × harvest efficiency × (1 − losses)

use crate::config::PastureParameters;
use crate::metrics::vegetation::{SurfaceType, VegetationState};
use serde::{Deserialize, Serialize};

/// Fraction of standing mass an animal can harvest
pub const HARVEST_EFFICIENCY: f64 = 0.25;

/// Trampling / senescence losses
pub const LOSS_FRACTION: f64 = 0.30;

/// Quality ceiling for NDVI-derived quality
pub const OBSERVED_QUALITY_MAX: f64 = 0.9;

pub const STANDING_RANGE: (f64, f64) = (0.0, 6000.0);
pub const AVAILABLE_RANGE: (f64, f64) = (0.0, 1200.0);
pub const GROWTH_RANGE: (f64, f64) = (1.0, 150.0);

/// Biomass fields attached to a sub-lot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiomassState {
    /// kg DM/ha
    pub standing_biomass_kg_ha: f64,
    /// kg DM/ha
    pub available_biomass_kg_ha: f64,
    /// kg DM/ha/day
    pub daily_growth_kg_ha: f64,
    pub quality_factor: f64,
}

/// Per-class multipliers: (standing, growth, quality).
/// Bare soil standing mass does not scale with cover.
fn class_factors(surface_type: SurfaceType) -> (f64, f64, f64) {
    match surface_type {
        SurfaceType::BareSoil => (0.05, 0.05, 0.10),
        SurfaceType::Sparse => (0.5, 0.5, 0.60),
        SurfaceType::Moderate => (0.7, 0.7, 0.75),
        SurfaceType::Dense => (0.9, 0.9, 0.85),
    }
}

fn standing_mass(surface_type: SurfaceType, cover: f64, params: &PastureParameters) -> f64 {
    let (standing_factor, _, _) = class_factors(surface_type);
    match surface_type {
        SurfaceType::BareSoil => params.optimal_standing_mass * standing_factor,
        _ => params.optimal_standing_mass * standing_factor * cover,
    }
}

fn clamped(standing: f64, available: f64, growth: f64, quality: f64) -> BiomassState {
    BiomassState {
        standing_biomass_kg_ha: standing.clamp(STANDING_RANGE.0, STANDING_RANGE.1),
        available_biomass_kg_ha: available.clamp(AVAILABLE_RANGE.0, AVAILABLE_RANGE.1),
        daily_growth_kg_ha: growth.clamp(GROWTH_RANGE.0, GROWTH_RANGE.1),
        quality_factor: quality,
    }
}

/// Estimate biomass for one sub-lot
pub fn estimate_biomass(vegetation: &VegetationState, params: &PastureParameters) -> BiomassState {
    let surface_type = if vegetation.has_vegetation {
        vegetation.surface_type
    } else {
        SurfaceType::BareSoil
    };
    let (_, growth_factor, quality) = class_factors(surface_type);

    let standing = standing_mass(surface_type, vegetation.cover, params);
    let growth = params.daily_growth_rate * growth_factor;
    let available = standing * quality * HARVEST_EFFICIENCY * (1.0 - LOSS_FRACTION);

    clamped(standing, available, growth, quality)
}

/// Estimate biomass for a sub-lot classified from observed NDVI
///
/// Standing mass uses the class factors; growth and quality follow NDVI
/// directly and bare soil offers no available forage.
pub fn estimate_observed_biomass(vegetation: &VegetationState, params: &PastureParameters) -> BiomassState {
    let surface_type = vegetation.surface_type;
    let standing = standing_mass(surface_type, vegetation.cover, params);
    let quality = (vegetation.ndvi + 0.3).min(OBSERVED_QUALITY_MAX);
    let growth = params.daily_growth_rate * (vegetation.ndvi + 0.2);
    let available = match surface_type {
        SurfaceType::BareSoil => 0.0,
        _ => standing * quality * HARVEST_EFFICIENCY * (1.0 - LOSS_FRACTION),
    };

    clamped(standing, available, growth, quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PastureType;
    use approx::assert_relative_eq;

    fn state(surface_type: SurfaceType, cover: f64) -> VegetationState {
        VegetationState {
            ndvi: 0.5,
            cover,
            vegetation_probability: surface_type.confidence(),
            surface_type,
            has_vegetation: surface_type != SurfaceType::BareSoil,
            threshold_override: false,
        }
    }

    #[test]
    fn test_bare_soil_ignores_cover() {
        let params = PastureType::Alfalfa.parameters();
        let b = estimate_biomass(&state(SurfaceType::BareSoil, 0.9), &params);
        assert_relative_eq!(b.standing_biomass_kg_ha, 200.0);
        assert_relative_eq!(b.daily_growth_kg_ha, 4.0);
        assert_relative_eq!(b.quality_factor, 0.1);
        assert_relative_eq!(b.available_biomass_kg_ha, 200.0 * 0.1 * 0.25 * 0.7, epsilon = 1e-9);
    }

    #[test]
    fn test_dense_alfalfa() {
        let params = PastureType::Alfalfa.parameters();
        let b = estimate_biomass(&state(SurfaceType::Dense, 0.8), &params);
        assert_relative_eq!(b.standing_biomass_kg_ha, 4000.0 * 0.9 * 0.8, epsilon = 1e-9);
        assert_relative_eq!(b.daily_growth_kg_ha, 72.0, epsilon = 1e-9);
        assert_relative_eq!(
            b.available_biomass_kg_ha,
            2880.0 * 0.85 * 0.25 * 0.7,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_override_uses_bare_soil_factors() {
        // Categorical override wins over the kept cover value
        let params = PastureType::Fescue.parameters();
        let mut overridden = state(SurfaceType::BareSoil, 0.6);
        overridden.threshold_override = true;
        let b = estimate_biomass(&overridden, &params);
        assert_relative_eq!(b.standing_biomass_kg_ha, 150.0);
    }

    #[test]
    fn test_ranges_clamped() {
        let params = PastureParameters {
            optimal_standing_mass: 10000.0,
            daily_growth_rate: 200.0,
            ..PastureParameters::default()
        };
        let b = estimate_biomass(&state(SurfaceType::Dense, 0.98), &params);
        assert!(b.standing_biomass_kg_ha <= 6000.0);
        assert!(b.available_biomass_kg_ha <= 1200.0);
        assert!(b.daily_growth_kg_ha <= 150.0);

        let low = PastureParameters {
            optimal_standing_mass: 500.0,
            daily_growth_rate: 5.0,
            ..PastureParameters::default()
        };
        let b = estimate_biomass(&state(SurfaceType::BareSoil, 0.02), &low);
        assert_relative_eq!(b.daily_growth_kg_ha, 1.0);
    }

    fn observed(surface_type: SurfaceType, ndvi: f64, cover: f64) -> VegetationState {
        VegetationState {
            ndvi,
            cover,
            vegetation_probability: surface_type.confidence(),
            surface_type,
            has_vegetation: surface_type != SurfaceType::BareSoil,
            threshold_override: false,
        }
    }

    #[test]
    fn test_observed_bare_soil_has_no_available_forage() {
        let params = PastureType::Alfalfa.parameters();
        let b = estimate_observed_biomass(&observed(SurfaceType::BareSoil, 0.1, 0.1), &params);
        assert_eq!(b.available_biomass_kg_ha, 0.0);
        assert_relative_eq!(b.standing_biomass_kg_ha, 200.0);
        assert_relative_eq!(b.quality_factor, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_observed_growth_and_quality_follow_ndvi() {
        let params = PastureType::Alfalfa.parameters();
        let b = estimate_observed_biomass(&observed(SurfaceType::Moderate, 0.5, 0.7), &params);
        assert_relative_eq!(b.daily_growth_kg_ha, 80.0 * 0.7, epsilon = 1e-9);
        assert_relative_eq!(b.quality_factor, 0.8, epsilon = 1e-12);
        let standing = 4000.0 * 0.7 * 0.7;
        assert_relative_eq!(b.standing_biomass_kg_ha, standing, epsilon = 1e-9);
        assert_relative_eq!(b.available_biomass_kg_ha, standing * 0.8 * 0.25 * 0.7, epsilon = 1e-9);

        // Quality is capped for dense canopies
        let dense = estimate_observed_biomass(&observed(SurfaceType::Dense, 0.85, 0.9), &params);
        assert_relative_eq!(dense.quality_factor, OBSERVED_QUALITY_MAX);
    }
}
