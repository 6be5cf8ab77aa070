// Forage analyzer command-line entry point
//
// Usage: cargo run --release --bin forage_analyzer -- --pasture ALFALFA --sublots 48
// Every option can also be set through its FORAGE_* environment variable.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use forage_analyzer::{
    AnalysisConfig, ForageAnalyzer, HerdParameters, PastureType, SavedConfiguration,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "forage_analyzer", version, about = "Forage and carrying-capacity analysis for a divided paddock")]
struct Cli {
    /// Pasture preset (ALFALFA, RYEGRASS, FESCUE, WHEATGRASS, NATIVE_GRASSLAND, CUSTOM)
    #[arg(long, env = "FORAGE_PASTURE", default_value = "ALFALFA")]
    pasture: PastureType,

    /// Number of sub-lots (12-72)
    #[arg(long, env = "FORAGE_SUBLOTS", default_value_t = 24)]
    sublots: usize,

    /// Vegetation confidence threshold (0.1-0.9)
    #[arg(long, env = "FORAGE_THRESHOLD", default_value_t = 0.4)]
    threshold: f64,

    #[arg(long, env = "FORAGE_SEED", default_value_t = forage_analyzer::config::DEFAULT_SEED)]
    seed: u64,

    /// Mean body weight (kg, 300-600)
    #[arg(long, env = "FORAGE_BODY_WEIGHT", default_value_t = 450.0)]
    body_weight: f64,

    /// Herd size (50-1000)
    #[arg(long, env = "FORAGE_HERD_SIZE", default_value_t = 100)]
    herd_size: u32,

    /// CSV of paddock boundary coordinates
    #[arg(long, env = "FORAGE_COORDINATES")]
    coordinates: Option<PathBuf>,

    /// CSV of observed spectral values keyed by sub-lot id
    #[arg(long, env = "FORAGE_OBSERVED")]
    observed: Option<PathBuf>,

    /// Saved configuration document to load
    #[arg(long, env = "FORAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Write the effective pasture parameters to this document
    #[arg(long, env = "FORAGE_SAVE_CONFIG")]
    save_config: Option<PathBuf>,

    #[arg(long, env = "FORAGE_OUTPUT_DIR", default_value = "forage_output")]
    output_dir: PathBuf,

    /// Evaluate sub-lots with Rayon
    #[arg(long, env = "FORAGE_PARALLEL")]
    parallel: bool,

    // Custom parameter overrides
    #[arg(long, env = "FORAGE_OPTIMAL_MASS")]
    optimal_mass: Option<f64>,
    #[arg(long, env = "FORAGE_GROWTH_RATE")]
    growth_rate: Option<f64>,
    #[arg(long, env = "FORAGE_INTAKE_FRACTION")]
    intake_fraction: Option<f64>,
    #[arg(long, env = "FORAGE_DIGESTIBILITY")]
    digestibility: Option<f64>,
    #[arg(long, env = "FORAGE_CRUDE_PROTEIN")]
    crude_protein: Option<f64>,
    #[arg(long, env = "FORAGE_UTILIZATION")]
    utilization: Option<f64>,
}

impl Cli {
    fn analysis_config(&self) -> AnalysisConfig {
        let mut config = AnalysisConfig::for_preset(self.pasture);
        let p = &mut config.pasture;
        if let Some(v) = self.optimal_mass {
            p.optimal_standing_mass = v;
        }
        if let Some(v) = self.growth_rate {
            p.daily_growth_rate = v;
        }
        if let Some(v) = self.intake_fraction {
            p.intake_fraction = v;
        }
        if let Some(v) = self.digestibility {
            p.digestibility = v;
        }
        if let Some(v) = self.crude_protein {
            p.crude_protein = v;
        }
        if let Some(v) = self.utilization {
            p.utilization_rate = v;
        }

        config.herd = HerdParameters {
            body_weight_kg: self.body_weight,
            herd_size: self.herd_size,
        };
        config.n_sublots = self.sublots;
        config.vegetation_threshold = self.threshold;
        config.seed = self.seed;
        config.coordinates = self.coordinates.clone();
        config.observed_indices = self.observed.clone();
        config.saved_config = self.config.clone();
        config.output_dir = self.output_dir.clone();
        config
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forage_analyzer=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.analysis_config();

    tracing::info!("Configuration:");
    tracing::info!("  pasture: {}", config.pasture_type);
    tracing::info!("  sub-lots: {}", config.n_sublots);
    tracing::info!("  threshold: {}", config.vegetation_threshold);
    tracing::info!("  seed: {}", config.seed);

    let analyzer = ForageAnalyzer::new(config).context("Invalid configuration")?;
    let mut run = if cli.parallel {
        analyzer.run_parallel()?
    } else {
        analyzer.run()?
    };

    if let Some(path) = &cli.save_config {
        SavedConfiguration::new(run.config.pasture_type, run.config.pasture)
            .save(path)
            .with_context(|| format!("Failed to save configuration to {}", path.display()))?;
        tracing::info!("Saved configuration to {}", path.display());
    }

    let output_dir = run.config.output_dir.clone();
    let written = run.write_artifacts(&output_dir, Utc::now())?;
    let summary = run.summary();

    println!("\n=== Forage Analysis: {} ===", summary.pasture_type);
    println!("Sub-lots:               {}", summary.n_sublots);
    println!("Total area:             {:.2} ha", summary.total_area_ha);
    println!("Mean available biomass: {:.1} kg/ha", summary.mean_available_biomass_kg_ha);
    println!("Supportable units:      {:.2}", summary.total_supportable_units);
    println!("Mean residency:         {:.2} days", summary.mean_residency_days);
    match summary.regression_r_squared {
        Some(r2) => println!("Regression R²:          {:.3}", r2),
        None => println!("Regression R²:          n/a"),
    }
    println!("\n{}", summary.recommendation);

    if !run.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &run.warnings {
            println!("  - {}", warning);
        }
    }

    println!("\nWrote {} files:", written.len());
    for path in &written {
        println!("  {}", path.display());
    }

    Ok(())
}
