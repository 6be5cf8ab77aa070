//! Analysis configuration
//!
//! Pasture presets, herd parameters and the single `AnalysisConfig` record
//! passed into the pipeline. Custom pasture parameter sets can be saved to
//! and restored from a JSON document stamped with its creation time.

use crate::error::{check_range, ForageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const MIN_SUBLOTS: usize = 12;
pub const MAX_SUBLOTS: usize = 72;
pub const DEFAULT_SEED: u64 = 42;

/// Named pasture presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PastureType {
    Alfalfa,
    Ryegrass,
    Fescue,
    Wheatgrass,
    NativeGrassland,
    Custom,
}

impl PastureType {
    pub const ALL: [PastureType; 6] = [
        PastureType::Alfalfa,
        PastureType::Ryegrass,
        PastureType::Fescue,
        PastureType::Wheatgrass,
        PastureType::NativeGrassland,
        PastureType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PastureType::Alfalfa => "ALFALFA",
            PastureType::Ryegrass => "RYEGRASS",
            PastureType::Fescue => "FESCUE",
            PastureType::Wheatgrass => "WHEATGRASS",
            PastureType::NativeGrassland => "NATIVE_GRASSLAND",
            PastureType::Custom => "CUSTOM",
        }
    }

    /// Preset parameter set (CUSTOM returns the editable defaults)
    pub fn parameters(&self) -> PastureParameters {
        match self {
            PastureType::Alfalfa => PastureParameters {
                optimal_standing_mass: 4000.0,
                daily_growth_rate: 80.0,
                intake_fraction: 0.03,
                digestibility: 0.65,
                crude_protein: 0.18,
                utilization_rate: 0.65,
            },
            PastureType::Ryegrass => PastureParameters {
                optimal_standing_mass: 3500.0,
                daily_growth_rate: 70.0,
                intake_fraction: 0.028,
                digestibility: 0.70,
                crude_protein: 0.15,
                utilization_rate: 0.60,
            },
            PastureType::Fescue => PastureParameters {
                optimal_standing_mass: 3000.0,
                daily_growth_rate: 50.0,
                intake_fraction: 0.025,
                digestibility: 0.60,
                crude_protein: 0.12,
                utilization_rate: 0.55,
            },
            PastureType::Wheatgrass => PastureParameters {
                optimal_standing_mass: 2800.0,
                daily_growth_rate: 45.0,
                intake_fraction: 0.024,
                digestibility: 0.55,
                crude_protein: 0.10,
                utilization_rate: 0.55,
            },
            PastureType::NativeGrassland => PastureParameters {
                optimal_standing_mass: 2500.0,
                daily_growth_rate: 20.0,
                intake_fraction: 0.022,
                digestibility: 0.50,
                crude_protein: 0.08,
                utilization_rate: 0.50,
            },
            PastureType::Custom => PastureParameters::default(),
        }
    }
}

impl fmt::Display for PastureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PastureType {
    type Err = ForageError;

    /// Accepts the English names and the dashboard's original Spanish labels
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "ALFALFA" => Ok(PastureType::Alfalfa),
            "RYEGRASS" | "RAYGRASS" => Ok(PastureType::Ryegrass),
            "FESCUE" | "FESTUCA" => Ok(PastureType::Fescue),
            "WHEATGRASS" | "AGROPIRRO" | "AGROPIRO" => Ok(PastureType::Wheatgrass),
            "NATIVE_GRASSLAND" | "PASTIZAL_NATURAL" => Ok(PastureType::NativeGrassland),
            "CUSTOM" | "PERSONALIZADO" => Ok(PastureType::Custom),
            _ => Err(ForageError::UnknownPastureType(s.to_string())),
        }
    }
}

/// Forage parameters for one pasture type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PastureParameters {
    /// Optimal standing dry matter (kg DM/ha)
    pub optimal_standing_mass: f64,
    /// Daily growth at optimum (kg DM/ha/day)
    pub daily_growth_rate: f64,
    /// Daily intake as a fraction of live weight
    pub intake_fraction: f64,
    pub digestibility: f64,
    pub crude_protein: f64,
    /// Recommended utilization rate
    pub utilization_rate: f64,
}

impl Default for PastureParameters {
    fn default() -> Self {
        Self {
            optimal_standing_mass: 3000.0,
            daily_growth_rate: 50.0,
            intake_fraction: 0.025,
            digestibility: 0.60,
            crude_protein: 0.12,
            utilization_rate: 0.55,
        }
    }
}

impl PastureParameters {
    pub fn validate(&self) -> Result<(), ForageError> {
        check_range("optimal_standing_mass", self.optimal_standing_mass, 500.0, 10000.0)?;
        check_range("daily_growth_rate", self.daily_growth_rate, 5.0, 200.0)?;
        check_range("intake_fraction", self.intake_fraction, 0.01, 0.1)?;
        check_range("digestibility", self.digestibility, 0.1, 0.9)?;
        check_range("crude_protein", self.crude_protein, 0.01, 0.3)?;
        check_range("utilization_rate", self.utilization_rate, 0.1, 0.9)?;
        Ok(())
    }
}

/// Herd description used for carrying-capacity metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HerdParameters {
    pub body_weight_kg: f64,
    pub herd_size: u32,
}

impl Default for HerdParameters {
    fn default() -> Self {
        Self {
            body_weight_kg: 450.0,
            herd_size: 100,
        }
    }
}

impl HerdParameters {
    /// Validate against the configurable ranges.
    ///
    /// The metrics calculator itself accepts any herd (including an empty
    /// one); these bounds apply only to user-supplied configuration.
    pub fn validate(&self) -> Result<(), ForageError> {
        check_range("body_weight_kg", self.body_weight_kg, 300.0, 600.0)?;
        check_range("herd_size", self.herd_size as f64, 50.0, 1000.0)?;
        Ok(())
    }
}

/// Everything one analysis run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub pasture_type: PastureType,
    pub pasture: PastureParameters,
    pub herd: HerdParameters,
    pub n_sublots: usize,
    /// Minimum tier confidence for a sub-lot to count as vegetated
    pub vegetation_threshold: f64,
    pub seed: u64,
    /// Optional CSV of paddock boundary coordinates
    pub coordinates: Option<PathBuf>,
    /// Optional CSV of observed spectral values keyed by sub-lot id
    pub observed_indices: Option<PathBuf>,
    /// Optional saved configuration document overriding `pasture`
    pub saved_config: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::for_preset(PastureType::Alfalfa)
    }
}

impl AnalysisConfig {
    pub fn for_preset(pasture_type: PastureType) -> Self {
        Self {
            pasture_type,
            pasture: pasture_type.parameters(),
            herd: HerdParameters::default(),
            n_sublots: 24,
            vegetation_threshold: 0.4,
            seed: DEFAULT_SEED,
            coordinates: None,
            observed_indices: None,
            saved_config: None,
            output_dir: PathBuf::from("forage_output"),
        }
    }

    pub fn validate(&self) -> Result<(), ForageError> {
        self.pasture.validate()?;
        self.herd.validate()?;
        check_range(
            "n_sublots",
            self.n_sublots as f64,
            MIN_SUBLOTS as f64,
            MAX_SUBLOTS as f64,
        )?;
        check_range("vegetation_threshold", self.vegetation_threshold, 0.1, 0.9)?;
        Ok(())
    }
}

/// Persisted custom parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedConfiguration {
    pub pasture_type: PastureType,
    pub parameters: PastureParameters,
    pub created_at: DateTime<Utc>,
}

impl SavedConfiguration {
    pub fn new(pasture_type: PastureType, parameters: PastureParameters) -> Self {
        Self {
            pasture_type,
            parameters,
            created_at: Utc::now(),
        }
    }

    /// Load and validate a configuration document
    pub fn load(path: &Path) -> Result<Self, ForageError> {
        let document_error = |reason: String| ForageError::ConfigDocument {
            path: path.display().to_string(),
            reason,
        };

        let contents = fs::read_to_string(path).map_err(|e| document_error(e.to_string()))?;
        let saved: SavedConfiguration =
            serde_json::from_str(&contents).map_err(|e| document_error(e.to_string()))?;
        saved
            .parameters
            .validate()
            .map_err(|e| document_error(e.to_string()))?;

        Ok(saved)
    }

    pub fn save(&self, path: &Path) -> Result<(), ForageError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ForageError::ConfigDocument {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        fs::write(path, json).map_err(|e| ForageError::ConfigDocument {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
