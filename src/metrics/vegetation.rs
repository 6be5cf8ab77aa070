//! VEGETATION CLASSIFIER
//!
//! Assigns each sub-lot a surface type and vegetation indices.
//!
//! **Two explicit stages:**
//!   1. `sample_vegetation` - stochastic draw from a spatial quality model.
//!      Quality falls off linearly (Manhattan distance) from the centre of
//!      an 8-column layout; a Bernoulli draw decides whether vegetation is
//!      present and, if so, the tier is picked from the quality factor.
//!      NDVI and cover are then drawn from tier-specific Gaussians.
//!   2. `apply_threshold` - tiers whose fixed confidence is below the user
//!      threshold are relabelled BARE_SOIL. Only the categorical fields
//!      change; the sampled NDVI and cover are kept as drawn and the
//!      override is recorded in `threshold_override`.
//!
//! Sub-lots with observed spectral values skip both stages and are
//! classified directly from NDVI (`classify_observed`).

use crate::geometry::SubLot;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns of the layout used to derive spatial position
pub const LAYOUT_COLUMNS: u32 = 8;

/// Centre of the 8x8 layout in grid units
const LAYOUT_CENTER: f64 = 3.5;

/// Distance at which quality reaches its floor
const MAX_CENTER_DISTANCE: f64 = 7.0;

const MIN_QUALITY: f64 = 0.1;

/// Base probability that a sub-lot carries vegetation
const BASE_VEGETATION_PROBABILITY: f64 = 0.15;

pub const NDVI_RANGE: (f64, f64) = (0.05, 0.85);
pub const COVER_RANGE: (f64, f64) = (0.02, 0.98);
pub const PROBABILITY_RANGE: (f64, f64) = (0.05, 0.95);

/// Surface categories, ordered by the quality that produces them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurfaceType {
    BareSoil,
    Sparse,
    Moderate,
    Dense,
}

impl SurfaceType {
    pub const ALL: [SurfaceType; 4] = [
        SurfaceType::BareSoil,
        SurfaceType::Sparse,
        SurfaceType::Moderate,
        SurfaceType::Dense,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceType::BareSoil => "BARE_SOIL",
            SurfaceType::Sparse => "SPARSE",
            SurfaceType::Moderate => "MODERATE",
            SurfaceType::Dense => "DENSE",
        }
    }

    /// Fixed tier confidence, reported as the final vegetation probability
    pub fn confidence(&self) -> f64 {
        match self {
            SurfaceType::BareSoil => 0.1,
            SurfaceType::Sparse => 0.5,
            SurfaceType::Moderate => 0.7,
            SurfaceType::Dense => 0.9,
        }
    }

    /// Gaussian parameters (mean, sd) for NDVI and cover
    fn distributions(&self) -> ((f64, f64), (f64, f64)) {
        match self {
            SurfaceType::BareSoil => ((0.1, 0.05), (0.1, 0.05)),
            SurfaceType::Sparse => ((0.3, 0.10), (0.4, 0.15)),
            SurfaceType::Moderate => ((0.45, 0.10), (0.6, 0.12)),
            SurfaceType::Dense => ((0.6, 0.08), (0.8, 0.10)),
        }
    }

    /// Tier for a vegetated sub-lot of the given quality
    fn from_quality(quality: f64) -> Self {
        if quality > 0.7 {
            SurfaceType::Dense
        } else if quality > 0.4 {
            SurfaceType::Moderate
        } else {
            SurfaceType::Sparse
        }
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw output of the stochastic stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VegetationSample {
    pub quality_factor: f64,
    /// Pre-draw probability `0.15 * (1 + quality)`
    pub draw_probability: f64,
    pub tier: SurfaceType,
    pub ndvi: f64,
    pub cover: f64,
}

/// Vegetation fields attached to a sub-lot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VegetationState {
    pub ndvi: f64,
    pub cover: f64,
    pub vegetation_probability: f64,
    pub surface_type: SurfaceType,
    pub has_vegetation: bool,
    /// Set when the threshold relabelled a vegetated tier as bare soil
    pub threshold_override: bool,
}

/// Spectral indices derived from observed reflectances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralIndices {
    pub evi: f64,
    pub savi: f64,
    pub ndwi: f64,
    /// `1 - cover` for the observed class
    pub bare_soil_probability: f64,
}

/// Observed per-sub-lot values (NDVI, EVI and band reflectances)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedIndices {
    pub ndvi: f64,
    pub evi: f64,
    pub red: f64,
    pub nir: f64,
    pub blue: f64,
}

impl Default for ObservedIndices {
    fn default() -> Self {
        Self {
            ndvi: 0.0,
            evi: 0.0,
            red: 0.15,
            nir: 0.25,
            blue: 0.1,
        }
    }
}

/// (row, col) of a sub-lot id in the 8-column layout
pub fn layout_position(id: u32) -> (u32, u32) {
    let index = id.saturating_sub(1);
    (index / LAYOUT_COLUMNS, index % LAYOUT_COLUMNS)
}

/// Triangular falloff favouring central sub-lots, floored at 0.1
pub fn quality_factor(row: u32, col: u32) -> f64 {
    let distance = (row as f64 - LAYOUT_CENTER).abs() + (col as f64 - LAYOUT_CENTER).abs();
    (1.0 - distance / MAX_CENTER_DISTANCE).max(MIN_QUALITY)
}

/// Stage 1: stochastic draw for one sub-lot
///
/// Draw order is fixed (presence, NDVI, cover) so a seeded RNG reproduces
/// the same sequence.
pub fn sample_vegetation<R: Rng + ?Sized>(sublot: &SubLot, rng: &mut R) -> VegetationSample {
    let (row, col) = layout_position(sublot.id);
    let quality = quality_factor(row, col);
    let draw_probability = BASE_VEGETATION_PROBABILITY * (1.0 + quality);

    let tier = if rng.gen_bool(draw_probability) {
        SurfaceType::from_quality(quality)
    } else {
        SurfaceType::BareSoil
    };

    let ((ndvi_mean, ndvi_sd), (cover_mean, cover_sd)) = tier.distributions();
    let ndvi = ndvi_mean + ndvi_sd * rng.sample::<f64, _>(StandardNormal);
    let cover = cover_mean + cover_sd * rng.sample::<f64, _>(StandardNormal);

    VegetationSample {
        quality_factor: quality,
        draw_probability,
        tier,
        ndvi,
        cover,
    }
}

/// Stage 2: threshold override and final clamping
pub fn apply_threshold(sample: &VegetationSample, threshold: f64) -> VegetationState {
    let confidence = sample.tier.confidence();
    let threshold_override = sample.tier != SurfaceType::BareSoil && confidence < threshold;

    let surface_type = if threshold_override {
        SurfaceType::BareSoil
    } else {
        sample.tier
    };

    VegetationState {
        ndvi: sample.ndvi.clamp(NDVI_RANGE.0, NDVI_RANGE.1),
        cover: sample.cover.clamp(COVER_RANGE.0, COVER_RANGE.1),
        vegetation_probability: confidence.clamp(PROBABILITY_RANGE.0, PROBABILITY_RANGE.1),
        surface_type,
        has_vegetation: surface_type != SurfaceType::BareSoil,
        threshold_override,
    }
}

/// Classify every sub-lot in id order from one RNG stream
pub fn classify_sublots<R: Rng + ?Sized>(
    sublots: &[SubLot],
    threshold: f64,
    rng: &mut R,
) -> Vec<VegetationState> {
    sublots
        .iter()
        .map(|sublot| apply_threshold(&sample_vegetation(sublot, rng), threshold))
        .collect()
}

/// Classify from observed NDVI instead of the stochastic model
///
/// Cover is fixed per class; NDVI is clamped to the model's range so the
/// downstream invariants hold for observed data too.
pub fn classify_observed(observed: &ObservedIndices) -> (VegetationState, SpectralIndices) {
    let (surface_type, cover) = if observed.ndvi < 0.2 {
        (SurfaceType::BareSoil, 0.1)
    } else if observed.ndvi < 0.4 {
        (SurfaceType::Sparse, 0.4)
    } else if observed.ndvi < 0.6 {
        (SurfaceType::Moderate, 0.7)
    } else {
        (SurfaceType::Dense, 0.9)
    };

    let (nir, red) = (observed.nir, observed.red);
    let savi = if nir + red + 0.5 > 0.0 {
        1.5 * (nir - red) / (nir + red + 0.5)
    } else {
        0.0
    };
    let ndwi = if nir + red > 0.0 {
        (nir - red) / (nir + red)
    } else {
        0.0
    };

    let state = VegetationState {
        ndvi: observed.ndvi.clamp(NDVI_RANGE.0, NDVI_RANGE.1),
        cover,
        vegetation_probability: surface_type
            .confidence()
            .clamp(PROBABILITY_RANGE.0, PROBABILITY_RANGE.1),
        surface_type,
        has_vegetation: surface_type != SurfaceType::BareSoil,
        threshold_override: false,
    };

    (
        state,
        SpectralIndices {
            evi: observed.evi,
            savi,
            ndwi,
            bare_soil_probability: 1.0 - cover,
        },
    )
}

/// One row of the model-vs-observed comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub id: u32,
    pub ndvi_observed: f64,
    pub ndvi_model: f64,
    pub evi_observed: f64,
    pub ndvi_abs_diff: f64,
}

/// Agreement between the stochastic model and observed NDVI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    pub rows: Vec<ComparisonRow>,
    /// `1 - mean|dNDVI| / mean(observed NDVI)`, 0 when the observed mean is not positive
    pub precision: f64,
}

/// Compare model NDVI against observations; pairs are (id, model, observed)
pub fn compare_with_observed(pairs: &[(u32, &VegetationState, &ObservedIndices)]) -> ModelComparison {
    let rows: Vec<ComparisonRow> = pairs
        .iter()
        .map(|(id, model, observed)| ComparisonRow {
            id: *id,
            ndvi_observed: observed.ndvi,
            ndvi_model: model.ndvi,
            evi_observed: observed.evi,
            ndvi_abs_diff: (observed.ndvi - model.ndvi).abs(),
        })
        .collect();

    if rows.is_empty() {
        return ModelComparison { rows, precision: 0.0 };
    }

    let n = rows.len() as f64;
    let mean_diff = rows.iter().map(|r| r.ndvi_abs_diff).sum::<f64>() / n;
    let mean_observed = rows.iter().map(|r| r.ndvi_observed).sum::<f64>() / n;

    let precision = if mean_observed > 0.0 {
        1.0 - mean_diff / mean_observed
    } else {
        0.0
    };

    ModelComparison { rows, precision }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, SubLot};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sublot(id: u32) -> SubLot {
        SubLot {
            id,
            area_ha: 0.8,
            centroid: Point::new(0.0, 0.0),
            polygon: None,
        }
    }

    #[test]
    fn test_quality_factor_falloff() {
        // Centre cells (3,3) and (4,4) are 1.0 away from 3.5,3.5
        assert_relative_eq!(quality_factor(3, 3), 1.0 - 1.0 / 7.0);
        assert_relative_eq!(quality_factor(4, 4), 1.0 - 1.0 / 7.0);
        // Corners hit the floor
        assert_relative_eq!(quality_factor(0, 0), 0.1);
        assert_relative_eq!(quality_factor(7, 7), 0.1);
    }

    #[test]
    fn test_layout_position() {
        assert_eq!(layout_position(1), (0, 0));
        assert_eq!(layout_position(8), (0, 7));
        assert_eq!(layout_position(9), (1, 0));
        assert_eq!(layout_position(48), (5, 7));
    }

    #[test]
    fn test_tier_selection_thresholds() {
        assert_eq!(SurfaceType::from_quality(0.71), SurfaceType::Dense);
        assert_eq!(SurfaceType::from_quality(0.7), SurfaceType::Moderate);
        assert_eq!(SurfaceType::from_quality(0.41), SurfaceType::Moderate);
        assert_eq!(SurfaceType::from_quality(0.4), SurfaceType::Sparse);
    }

    #[test]
    fn test_threshold_override_keeps_sampled_values() {
        let sample = VegetationSample {
            quality_factor: 0.3,
            draw_probability: 0.195,
            tier: SurfaceType::Sparse,
            ndvi: 0.33,
            cover: 0.41,
        };

        let kept = apply_threshold(&sample, 0.4);
        assert_eq!(kept.surface_type, SurfaceType::Sparse);
        assert!(kept.has_vegetation);
        assert!(!kept.threshold_override);

        let overridden = apply_threshold(&sample, 0.6);
        assert_eq!(overridden.surface_type, SurfaceType::BareSoil);
        assert!(!overridden.has_vegetation);
        assert!(overridden.threshold_override);
        // Numeric fields are not reset by the override
        assert_relative_eq!(overridden.ndvi, 0.33);
        assert_relative_eq!(overridden.cover, 0.41);
        assert_relative_eq!(overridden.vegetation_probability, 0.5);
    }

    #[test]
    fn test_clamping() {
        let sample = VegetationSample {
            quality_factor: 0.9,
            draw_probability: 0.285,
            tier: SurfaceType::Dense,
            ndvi: 1.3,
            cover: -0.2,
        };
        let state = apply_threshold(&sample, 0.1);
        assert_relative_eq!(state.ndvi, 0.85);
        assert_relative_eq!(state.cover, 0.02);
    }

    #[test]
    fn test_classification_invariants_hold() {
        let sublots: Vec<SubLot> = (1..=72).map(sublot).collect();
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for threshold in [0.1, 0.4, 0.6, 0.9] {
                for state in classify_sublots(&sublots, threshold, &mut rng) {
                    assert_eq!(state.has_vegetation, state.surface_type != SurfaceType::BareSoil);
                    assert!(state.ndvi >= 0.05 && state.ndvi <= 0.85);
                    assert!(state.cover >= 0.02 && state.cover <= 0.98);
                    assert!(state.vegetation_probability >= 0.05);
                    assert!(state.vegetation_probability <= 0.95);
                }
            }
        }
    }

    #[test]
    fn test_seeded_classification_is_reproducible() {
        let sublots: Vec<SubLot> = (1..=48).map(sublot).collect();
        let a = classify_sublots(&sublots, 0.4, &mut ChaCha8Rng::seed_from_u64(42));
        let b = classify_sublots(&sublots, 0.4, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_classify_observed() {
        let observed = ObservedIndices {
            ndvi: 0.5,
            evi: 0.4,
            red: 0.1,
            nir: 0.4,
            blue: 0.05,
        };
        let (state, indices) = classify_observed(&observed);
        assert_eq!(state.surface_type, SurfaceType::Moderate);
        assert_relative_eq!(state.cover, 0.7);
        assert_relative_eq!(indices.savi, 1.5 * 0.3 / 1.0);
        assert_relative_eq!(indices.ndwi, 0.3 / 0.5);
        assert_relative_eq!(indices.bare_soil_probability, 0.3, epsilon = 1e-12);

        let bare = ObservedIndices { ndvi: -0.1, ..Default::default() };
        let (state, _) = classify_observed(&bare);
        assert_eq!(state.surface_type, SurfaceType::BareSoil);
        assert!(!state.has_vegetation);
        assert_relative_eq!(state.ndvi, 0.05);
    }

    #[test]
    fn test_compare_with_observed() {
        let model = VegetationState {
            ndvi: 0.4,
            cover: 0.5,
            vegetation_probability: 0.7,
            surface_type: SurfaceType::Moderate,
            has_vegetation: true,
            threshold_override: false,
        };
        let observed = ObservedIndices { ndvi: 0.5, ..Default::default() };
        let comparison = compare_with_observed(&[(1, &model, &observed)]);
        assert_relative_eq!(comparison.rows[0].ndvi_abs_diff, 0.1, epsilon = 1e-12);
        assert_relative_eq!(comparison.precision, 0.8, epsilon = 1e-12);

        assert_eq!(compare_with_observed(&[]).precision, 0.0);
    }
}
