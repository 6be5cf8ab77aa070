//! Forage Analyzer
//!
//! Forage-management pipeline for a divided paddock: sub-lot geometry,
//! stochastic vegetation classification, biomass and carrying-capacity
//! metrics, correlation/regression diagnostics, rendered maps and a
//! downloadable report bundle.
//!
//! - `config`: pasture presets, herd parameters, saved configuration documents
//! - `geometry`: synthesized grid and polygon division
//! - `metrics/`: vegetation, biomass and livestock stages
//! - `data`: coordinate loading and the per-sub-lot table (Polars)
//! - `stats/`: correlation matrix and OLS regression
//! - `render/`: PNG maps and figures
//! - `report/`: summary documents and the ZIP bundle
//! - `analyzer`: pipeline coordinator (sequential and Rayon variants)

pub mod analyzer;
pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod metrics;
pub mod render;
pub mod report;
pub mod stats;

// Re-export commonly used types
pub use analyzer::{ForageAnalyzer, ForageRun};
pub use config::{AnalysisConfig, HerdParameters, PastureParameters, PastureType, SavedConfiguration};
pub use error::{ForageError, RegressionError};
pub use geometry::{Point, Polygon, SubLot};
pub use metrics::*;
pub use report::{ArtifactKind, ArtifactSet};
pub use stats::{CorrelationAnalysis, RegressionSummary};
