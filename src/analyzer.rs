//! Forage Analyzer - pipeline coordinator
//!
//! Runs geometry, vegetation, biomass, livestock and diagnostics in order
//! for one `AnalysisConfig`, then turns the finished run into artifacts.
//! Includes both sequential and parallel (Rayon) implementations.
//!
//! Input and configuration failures never abort a run: the analyzer logs
//! a warning, records it in `ForageRun::warnings` and falls back to
//! synthesized geometry or the preset parameters.

use crate::config::{AnalysisConfig, SavedConfiguration};
use crate::data::{build_forage_table, load_boundary, load_observed_indices, to_csv_bytes};
use crate::error::{ForageError, RegressionError};
use crate::geometry::{divide_polygon, synthesize_grid, CoordinateSystem, SubLot};
use crate::metrics::{
    apply_threshold, classify_observed, compare_with_observed, evaluate_sublot, sample_vegetation,
    EnrichedSubLot, ModelComparison, ObservedIndices, SpectralIndices, VegetationState,
};
use crate::render::{
    render_correlation_figure, render_productivity_map, render_regression_figure,
    render_residency_map, render_surface_map,
};
use crate::report::{
    ArtifactKind, ArtifactSet, JsonFormatter, MarkdownFormatter, ParametersDocument, RunSummary,
};
use crate::stats::{analyze_correlations, fit_units_per_ha, CorrelationAnalysis, RegressionSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// A classified sub-lot waiting for the biomass and livestock stages
type Classified = (SubLot, VegetationState, Option<SpectralIndices>);

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct ForageRun {
    /// Configuration actually used (after any saved-document override)
    pub config: AnalysisConfig,
    pub sublots: Vec<EnrichedSubLot>,
    pub table: DataFrame,
    pub correlations: Option<CorrelationAnalysis>,
    pub regression: Result<RegressionSummary, RegressionError>,
    pub comparison: Option<ModelComparison>,
    /// User-visible messages for every degraded step
    pub warnings: Vec<String>,
}

/// Main pipeline entry point
pub struct ForageAnalyzer {
    config: AnalysisConfig,
}

impl ForageAnalyzer {
    /// Validate the configuration and build an analyzer
    pub fn new(config: AnalysisConfig) -> Result<Self, ForageError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the whole pipeline sequentially
    pub fn run(&self) -> Result<ForageRun> {
        let start = Instant::now();
        let (config, classified, comparison, mut warnings) = self.prepare();

        let sublots: Vec<EnrichedSubLot> = classified
            .into_iter()
            .map(|(sublot, vegetation, spectral)| {
                evaluate_sublot(&sublot, vegetation, spectral, &config.pasture, &config.herd)
            })
            .collect();

        let run = Self::finish(config, sublots, comparison, &mut warnings)?;
        tracing::info!("Sequential run finished in {:?}", start.elapsed());
        Ok(run)
    }

    /// Run the pipeline evaluating sub-lots IN PARALLEL
    ///
    /// Vegetation is still sampled sequentially from the single seeded RNG,
    /// so the output is identical to `run`.
    pub fn run_parallel(&self) -> Result<ForageRun> {
        let start = Instant::now();
        let (config, classified, comparison, mut warnings) = self.prepare();

        let pasture = config.pasture;
        let herd = config.herd;
        let sublots: Vec<EnrichedSubLot> = classified
            .into_par_iter()
            .map(|(sublot, vegetation, spectral)| {
                evaluate_sublot(&sublot, vegetation, spectral, &pasture, &herd)
            })
            .collect();

        let run = Self::finish(config, sublots, comparison, &mut warnings)?;
        tracing::info!("Parallel run finished in {:?}", start.elapsed());
        Ok(run)
    }

    /// Resolve configuration, geometry and vegetation (sequential - owns the RNG)
    fn prepare(&self) -> (AnalysisConfig, Vec<Classified>, Option<ModelComparison>, Vec<String>) {
        let mut warnings = Vec::new();
        let config = self.resolve_config(&mut warnings);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        // STEP 1: Geometry
        let sublots = match &config.coordinates {
            Some(path) => match load_boundary(path) {
                Ok(paddock) => {
                    let crs = CoordinateSystem::detect(&paddock.ring);
                    let sublots = divide_polygon(&paddock, config.n_sublots, crs);
                    tracing::info!(
                        "Divided paddock from {} into {} sub-lots ({:?})",
                        path.display(),
                        sublots.len(),
                        crs
                    );
                    sublots
                }
                Err(e) => {
                    let error = input_error(path, &e);
                    record(&mut warnings, format!("{}. Using synthesized geometry.", error));
                    synthesize_grid(config.n_sublots, &mut rng)
                }
            },
            None => synthesize_grid(config.n_sublots, &mut rng),
        };
        tracing::debug!("Geometry ready: {} sub-lots", sublots.len());

        // STEP 2: Observed spectral values (optional)
        let observed: FxHashMap<u32, ObservedIndices> = match &config.observed_indices {
            Some(path) => load_observed_indices(path).unwrap_or_else(|e| {
                let error = input_error(path, &e);
                record(&mut warnings, format!("{}. Using the vegetation model only.", error));
                FxHashMap::default()
            }),
            None => FxHashMap::default(),
        };

        // STEP 3: Vegetation. The model is always sampled so the RNG stream
        // does not depend on which sub-lots have observations.
        let mut classified = Vec::with_capacity(sublots.len());
        let mut compared: Vec<(u32, VegetationState, ObservedIndices)> = Vec::new();
        for sublot in sublots {
            let modelled = apply_threshold(&sample_vegetation(&sublot, &mut rng), config.vegetation_threshold);
            match observed.get(&sublot.id) {
                Some(obs) => {
                    let (state, spectral) = classify_observed(obs);
                    compared.push((sublot.id, modelled, *obs));
                    classified.push((sublot, state, Some(spectral)));
                }
                None => classified.push((sublot, modelled, None)),
            }
        }

        let comparison = if compared.is_empty() {
            None
        } else {
            let pairs: Vec<(u32, &VegetationState, &ObservedIndices)> =
                compared.iter().map(|(id, m, o)| (*id, m, o)).collect();
            let comparison = compare_with_observed(&pairs);
            tracing::info!(
                "Observed values for {} sub-lots, model precision {:.3}",
                comparison.rows.len(),
                comparison.precision
            );
            Some(comparison)
        };

        (config, classified, comparison, warnings)
    }

    /// Apply a saved configuration document if one is configured
    fn resolve_config(&self, warnings: &mut Vec<String>) -> AnalysisConfig {
        let mut config = self.config.clone();
        if let Some(path) = &self.config.saved_config {
            match SavedConfiguration::load(path) {
                Ok(saved) => {
                    tracing::info!(
                        "Loaded {} parameters saved at {}",
                        saved.pasture_type,
                        saved.created_at.to_rfc3339()
                    );
                    config.pasture_type = saved.pasture_type;
                    config.pasture = saved.parameters;
                }
                Err(e) => record(
                    warnings,
                    format!("{}. Using {} parameters.", e, config.pasture_type),
                ),
            }
        }
        config
    }

    /// Table and diagnostics for evaluated sub-lots
    fn finish(
        config: AnalysisConfig,
        sublots: Vec<EnrichedSubLot>,
        comparison: Option<ModelComparison>,
        warnings: &mut Vec<String>,
    ) -> Result<ForageRun> {
        // STEP 4: Table
        let table = build_forage_table(&sublots)?;
        tracing::info!("Forage table: {} rows x {} columns", table.height(), table.width());

        // STEP 5: Diagnostics
        let correlations = match analyze_correlations(&table) {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                record(warnings, format!("Correlation analysis unavailable: {:#}", e));
                None
            }
        };

        let regression = fit_units_per_ha(&table);
        match &regression {
            Ok(summary) => tracing::debug!(
                "Regression R² = {:.4} over {} observations",
                summary.r_squared,
                summary.n_observations
            ),
            Err(e) => record(warnings, format!("Regression unavailable: {}", e)),
        }

        Ok(ForageRun {
            config,
            sublots,
            table,
            correlations,
            regression,
            comparison,
            warnings: std::mem::take(warnings),
        })
    }
}

fn input_error(path: &Path, e: &anyhow::Error) -> ForageError {
    ForageError::InputFile {
        path: path.display().to_string(),
        reason: format!("{:#}", e),
    }
}

fn record(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{}", message);
    warnings.push(message);
}

impl ForageRun {
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_rows(
            self.config.pasture_type,
            &self.sublots,
            self.regression.as_ref().ok(),
        )
    }

    /// Render every artifact; failures are recorded as warnings and omitted
    pub fn artifacts(&mut self, generated_at: DateTime<Utc>) -> ArtifactSet {
        let mut set = ArtifactSet::new(self.config.pasture_type, generated_at);
        let mut warnings = std::mem::take(&mut self.warnings);

        add_artifact(&mut set, &mut warnings, ArtifactKind::ForageTable, to_csv_bytes(&self.table));
        add_artifact(
            &mut set,
            &mut warnings,
            ArtifactKind::ProductivityMap,
            render_productivity_map(&self.sublots).map_err(Into::into),
        );
        add_artifact(
            &mut set,
            &mut warnings,
            ArtifactKind::ResidencyMap,
            render_residency_map(&self.sublots).map_err(Into::into),
        );
        add_artifact(
            &mut set,
            &mut warnings,
            ArtifactKind::SurfaceMap,
            render_surface_map(&self.sublots).map_err(Into::into),
        );

        if let Some(analysis) = &self.correlations {
            add_artifact(
                &mut set,
                &mut warnings,
                ArtifactKind::CorrelationFigure,
                render_correlation_figure(analysis).map_err(Into::into),
            );
            add_artifact(
                &mut set,
                &mut warnings,
                ArtifactKind::CorrelationTable,
                analysis.matrix.to_dataframe().and_then(|df| to_csv_bytes(&df)),
            );
        }

        if let Ok(summary) = &self.regression {
            add_artifact(
                &mut set,
                &mut warnings,
                ArtifactKind::RegressionFigure,
                render_regression_figure(summary).map_err(Into::into),
            );
            add_artifact(
                &mut set,
                &mut warnings,
                ArtifactKind::RegressionSummary,
                JsonFormatter::regression(summary)
                    .map(String::into_bytes)
                    .context("Failed to serialize regression summary"),
            );
        }

        if let Some(comparison) = &self.comparison {
            add_artifact(&mut set, &mut warnings, ArtifactKind::ModelComparison, comparison_csv(comparison));
        }

        add_artifact(
            &mut set,
            &mut warnings,
            ArtifactKind::Parameters,
            JsonFormatter::parameters(&ParametersDocument::new(&self.config, generated_at))
                .map(String::into_bytes)
                .context("Failed to serialize parameters"),
        );

        // Last, so it lists every warning above
        self.warnings = warnings;
        let markdown = MarkdownFormatter::format(&self.summary(), self.comparison.as_ref(), &self.warnings);
        set.insert(ArtifactKind::ExecutiveSummary, markdown.into_bytes());

        set
    }

    /// Render artifacts and write them plus the bundle to `dir`
    pub fn write_artifacts(&mut self, dir: &Path, generated_at: DateTime<Utc>) -> Result<Vec<PathBuf>> {
        let set = self.artifacts(generated_at);
        set.write_to_dir(dir)
            .with_context(|| format!("Failed to write artifacts to {}", dir.display()))
    }
}

fn add_artifact(
    set: &mut ArtifactSet,
    warnings: &mut Vec<String>,
    kind: ArtifactKind,
    bytes: Result<Vec<u8>>,
) {
    match bytes {
        Ok(bytes) => set.insert(kind, bytes),
        Err(e) => record(warnings, format!("{} omitted: {:#}", kind.stem(), e)),
    }
}

fn comparison_csv(comparison: &ModelComparison) -> Result<Vec<u8>> {
    let rows = &comparison.rows;
    let df = polars::df!(
        "id" => rows.iter().map(|r| r.id).collect::<Vec<u32>>(),
        "ndvi_observed" => rows.iter().map(|r| r.ndvi_observed).collect::<Vec<f64>>(),
        "ndvi_model" => rows.iter().map(|r| r.ndvi_model).collect::<Vec<f64>>(),
        "evi_observed" => rows.iter().map(|r| r.evi_observed).collect::<Vec<f64>>(),
        "ndvi_abs_diff" => rows.iter().map(|r| r.ndvi_abs_diff).collect::<Vec<f64>>(),
    )
    .context("Failed to build comparison table")?;
    to_csv_bytes(&df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PastureType;
    use chrono::TimeZone;

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalysisConfig::default();
        config.n_sublots = 5;
        assert!(matches!(
            ForageAnalyzer::new(config),
            Err(ForageError::InvalidParameter { name: "n_sublots", .. })
        ));
    }

    #[test]
    fn test_run_produces_n_rows() {
        let mut config = AnalysisConfig::for_preset(PastureType::Ryegrass);
        config.n_sublots = 20;
        let run = ForageAnalyzer::new(config).unwrap().run().unwrap();
        assert_eq!(run.sublots.len(), 20);
        assert_eq!(run.table.height(), 20);
        let ids: Vec<u32> = run.sublots.iter().map(|s| s.sublot.id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<u32>>());
    }

    #[test]
    fn test_missing_saved_config_falls_back() {
        let mut config = AnalysisConfig::default();
        config.saved_config = Some(PathBuf::from("/nonexistent/forage_config.json"));
        let run = ForageAnalyzer::new(config).unwrap().run().unwrap();
        assert_eq!(run.config.pasture, PastureType::Alfalfa.parameters());
        assert!(run.warnings.iter().any(|w| w.contains("configuration document")));
    }

    #[test]
    fn test_failed_artifacts_are_omitted_with_warnings() {
        let mut run = ForageAnalyzer::new(AnalysisConfig::default()).unwrap().run().unwrap();
        assert!(run.warnings.is_empty());
        // Maps need sub-lots to draw; the table and diagnostics are kept
        run.sublots.clear();

        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let set = run.artifacts(at);

        for kind in [
            ArtifactKind::ProductivityMap,
            ArtifactKind::ResidencyMap,
            ArtifactKind::SurfaceMap,
        ] {
            assert!(!set.contains(kind), "{} should be omitted", kind.stem());
            assert!(run
                .warnings
                .iter()
                .any(|w| w.starts_with(&format!("{} omitted", kind.stem()))));
        }
        assert_eq!(run.warnings.len(), 3);

        for kind in [
            ArtifactKind::ForageTable,
            ArtifactKind::CorrelationTable,
            ArtifactKind::RegressionSummary,
            ArtifactKind::Parameters,
            ArtifactKind::ExecutiveSummary,
        ] {
            assert!(set.contains(kind), "{} missing", kind.stem());
        }

        let summary = &set.get(ArtifactKind::ExecutiveSummary).unwrap().bytes;
        let markdown = String::from_utf8(summary.clone()).unwrap();
        assert!(markdown.contains("## Warnings"));
        assert!(markdown.contains("- productivity_map omitted"));
    }
}
