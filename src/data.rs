//! Data Loading and Table Assembly
//!
//! Reads paddock coordinates and observed spectral values with Polars,
//! assembles the per-sub-lot forage table and exports it as CSV.
//!
//! The forage table is the single hand-off between the pipeline and every
//! downstream artifact (diagnostics, maps, reports).

use crate::geometry::{Point, Polygon};
use crate::metrics::{EnrichedSubLot, ObservedIndices};
use anyhow::{anyhow, Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Column names of the forage table
pub mod columns {
    pub const ID: &str = "id";
    pub const AREA_HA: &str = "area_ha";
    pub const CENTROID_X: &str = "centroid_x";
    pub const CENTROID_Y: &str = "centroid_y";
    pub const GEOMETRY: &str = "geometry";
    pub const NDVI: &str = "ndvi";
    pub const COVER: &str = "cover";
    pub const VEGETATION_PROBABILITY: &str = "vegetation_probability";
    pub const SURFACE_TYPE: &str = "surface_type";
    pub const HAS_VEGETATION: &str = "has_vegetation";
    pub const THRESHOLD_OVERRIDE: &str = "threshold_override";
    pub const EVI: &str = "evi";
    pub const SAVI: &str = "savi";
    pub const NDWI: &str = "ndwi";
    pub const STANDING_BIOMASS: &str = "standing_biomass_kg_ha";
    pub const AVAILABLE_BIOMASS: &str = "available_biomass_kg_ha";
    pub const DAILY_GROWTH: &str = "daily_growth_kg_ha";
    pub const QUALITY_FACTOR: &str = "quality_factor";
    pub const SUPPORTABLE_UNITS: &str = "supportable_units";
    pub const RESIDENCY_DAYS: &str = "residency_days";
    pub const TOTAL_BIOMASS: &str = "total_biomass_kg";
    pub const INDIVIDUAL_INTAKE: &str = "individual_intake_kg";
    pub const FORAGE_STATUS: &str = "forage_status";
    pub const UNITS_PER_HA: &str = "units_per_ha";
}

const X_CANDIDATES: &[&str] = &["x", "lon", "lng", "longitude", "easting"];
const Y_CANDIDATES: &[&str] = &["y", "lat", "latitude", "northing"];

/// Read a CSV with a header row
fn read_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to parse CSV: {}", path.display()))
}

/// First column whose lower-cased name is one of `candidates`
fn find_column(df: &DataFrame, candidates: &[&str]) -> Option<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .find(|name| candidates.contains(&name.to_ascii_lowercase().as_str()))
}

/// Column cast to f64 with nulls preserved
fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let casted = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Load a paddock boundary ring from a coordinates CSV
///
/// Rows are taken in file order as one ring; rows with a missing
/// coordinate are skipped.
pub fn load_boundary(path: &Path) -> Result<Polygon> {
    let df = read_csv(path)?;

    let x_col = find_column(&df, X_CANDIDATES)
        .ok_or_else(|| anyhow!("No x/longitude column in {}", path.display()))?;
    let y_col = find_column(&df, Y_CANDIDATES)
        .ok_or_else(|| anyhow!("No y/latitude column in {}", path.display()))?;

    let xs = f64_values(&df, &x_col)?;
    let ys = f64_values(&df, &y_col)?;

    let ring: Vec<Point> = xs
        .into_iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(Point::new(x?, y?)))
        .collect();

    let polygon = Polygon::new(ring);
    if polygon.is_empty() {
        anyhow::bail!(
            "Boundary in {} has {} usable point(s) and no area",
            path.display(),
            polygon.ring.len()
        );
    }

    tracing::debug!("Loaded boundary with {} vertices from {}", polygon.ring.len(), path.display());
    Ok(polygon)
}

/// Load observed spectral values keyed by sub-lot id
///
/// `id` and `ndvi` are required; missing band columns fall back to the
/// defaults of `ObservedIndices`. Rows whose id is not a positive integer,
/// and repeats of an id already read, are skipped with a warning.
pub fn load_observed_indices(path: &Path) -> Result<FxHashMap<u32, ObservedIndices>> {
    let df = read_csv(path)?;

    let id_col = find_column(&df, &["id", "sublot", "sub_lot", "id_sublote"])
        .ok_or_else(|| anyhow!("No id column in {}", path.display()))?;
    let ndvi_col = find_column(&df, &["ndvi", "ndvi_real"])
        .ok_or_else(|| anyhow!("No ndvi column in {}", path.display()))?;

    let ids = f64_values(&df, &id_col)?;
    let ndvi = f64_values(&df, &ndvi_col)?;

    let optional = |candidates: &[&str]| -> Result<Option<Vec<Option<f64>>>> {
        match find_column(&df, candidates) {
            Some(name) => Ok(Some(f64_values(&df, &name)?)),
            None => Ok(None),
        }
    };
    let evi = optional(&["evi", "evi_real"])?;
    let red = optional(&["red", "red_real", "b4"])?;
    let nir = optional(&["nir", "nir_real", "b8"])?;
    let blue = optional(&["blue", "blue_real", "b2"])?;

    let defaults = ObservedIndices::default();
    let pick = |column: &Option<Vec<Option<f64>>>, idx: usize, fallback: f64| {
        column
            .as_ref()
            .and_then(|values| values[idx])
            .unwrap_or(fallback)
    };

    let mut map = FxHashMap::default();
    for idx in 0..df.height() {
        let (Some(id), Some(ndvi_value)) = (ids[idx], ndvi[idx]) else {
            continue;
        };
        if id < 1.0 || id.fract() != 0.0 || id > f64::from(u32::MAX) {
            tracing::warn!("Skipping observed row {}: id {} is not a sub-lot id", idx + 1, id);
            continue;
        }
        let id = id as u32;
        if map.contains_key(&id) {
            tracing::warn!("Skipping observed row {}: duplicate id {}", idx + 1, id);
            continue;
        }

        map.insert(
            id,
            ObservedIndices {
                ndvi: ndvi_value,
                evi: pick(&evi, idx, defaults.evi),
                red: pick(&red, idx, defaults.red),
                nir: pick(&nir, idx, defaults.nir),
                blue: pick(&blue, idx, defaults.blue),
            },
        );
    }

    tracing::debug!("Loaded observed indices for {} sub-lots", map.len());
    Ok(map)
}

/// Assemble the per-sub-lot forage table
pub fn build_forage_table(rows: &[EnrichedSubLot]) -> Result<DataFrame> {
    use columns::*;

    let df = polars::df!(
        ID => rows.iter().map(|r| r.sublot.id).collect::<Vec<u32>>(),
        AREA_HA => rows.iter().map(|r| r.sublot.area_ha).collect::<Vec<f64>>(),
        CENTROID_X => rows.iter().map(|r| r.sublot.centroid.x).collect::<Vec<f64>>(),
        CENTROID_Y => rows.iter().map(|r| r.sublot.centroid.y).collect::<Vec<f64>>(),
        GEOMETRY => rows.iter().map(|r| r.sublot.geometry_summary()).collect::<Vec<String>>(),
        NDVI => rows.iter().map(|r| r.vegetation.ndvi).collect::<Vec<f64>>(),
        COVER => rows.iter().map(|r| r.vegetation.cover).collect::<Vec<f64>>(),
        VEGETATION_PROBABILITY => rows.iter().map(|r| r.vegetation.vegetation_probability).collect::<Vec<f64>>(),
        SURFACE_TYPE => rows.iter().map(|r| r.vegetation.surface_type.as_str()).collect::<Vec<&str>>(),
        HAS_VEGETATION => rows.iter().map(|r| r.vegetation.has_vegetation).collect::<Vec<bool>>(),
        THRESHOLD_OVERRIDE => rows.iter().map(|r| r.vegetation.threshold_override).collect::<Vec<bool>>(),
        EVI => rows.iter().map(|r| r.spectral.map(|s| s.evi)).collect::<Vec<Option<f64>>>(),
        SAVI => rows.iter().map(|r| r.spectral.map(|s| s.savi)).collect::<Vec<Option<f64>>>(),
        NDWI => rows.iter().map(|r| r.spectral.map(|s| s.ndwi)).collect::<Vec<Option<f64>>>(),
        STANDING_BIOMASS => rows.iter().map(|r| r.biomass.standing_biomass_kg_ha).collect::<Vec<f64>>(),
        AVAILABLE_BIOMASS => rows.iter().map(|r| r.biomass.available_biomass_kg_ha).collect::<Vec<f64>>(),
        DAILY_GROWTH => rows.iter().map(|r| r.biomass.daily_growth_kg_ha).collect::<Vec<f64>>(),
        QUALITY_FACTOR => rows.iter().map(|r| r.biomass.quality_factor).collect::<Vec<f64>>(),
        SUPPORTABLE_UNITS => rows.iter().map(|r| r.livestock.supportable_units).collect::<Vec<f64>>(),
        RESIDENCY_DAYS => rows.iter().map(|r| r.livestock.residency_days).collect::<Vec<f64>>(),
        TOTAL_BIOMASS => rows.iter().map(|r| r.livestock.total_biomass_kg).collect::<Vec<f64>>(),
        INDIVIDUAL_INTAKE => rows.iter().map(|r| r.livestock.individual_intake_kg).collect::<Vec<f64>>(),
        FORAGE_STATUS => rows.iter().map(|r| r.livestock.forage_status.as_str()).collect::<Vec<&str>>(),
        UNITS_PER_HA => rows.iter().map(|r| r.livestock.units_per_ha).collect::<Vec<f64>>(),
    )
    .context("Failed to assemble forage table")?;

    Ok(df)
}

/// Extract numeric columns with validation
///
/// Returns one vector per requested column (nulls become NaN). Mirrors the
/// materialize-then-validate pattern: a missing column is an error naming
/// the caller context and the available columns.
pub fn extract_f64_columns(df: &DataFrame, names: &[&str], context: &str) -> Result<Vec<Vec<f64>>> {
    let available: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    names
        .iter()
        .map(|&name| {
            if !available.iter().any(|c| c == name) {
                return Err(anyhow!(
                    "{}: Missing expected column '{}'. Available columns: {:?}",
                    context,
                    name,
                    available
                ));
            }
            Ok(f64_values(df, name)?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect())
        })
        .collect()
}

/// String column values (nulls become empty strings)
pub fn extract_str_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?;
    let values = column
        .str()
        .with_context(|| format!("Column '{}' is not string type", name))?;
    Ok(values
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

/// Serialize a table as CSV bytes
pub fn to_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df)
        .context("Failed to write CSV")?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HerdParameters, PastureType};
    use crate::geometry::SubLot;
    use crate::metrics::{evaluate_sublot, SurfaceType, VegetationState};
    use std::io::Write;

    fn enriched(id: u32, surface_type: SurfaceType, cover: f64) -> EnrichedSubLot {
        let sublot = SubLot {
            id,
            area_ha: 0.8,
            centroid: Point::new(id as f64, 0.0),
            polygon: None,
        };
        let vegetation = VegetationState {
            ndvi: 0.4,
            cover,
            vegetation_probability: surface_type.confidence(),
            surface_type,
            has_vegetation: surface_type != SurfaceType::BareSoil,
            threshold_override: false,
        };
        evaluate_sublot(
            &sublot,
            vegetation,
            None,
            &PastureType::Alfalfa.parameters(),
            &HerdParameters::default(),
        )
    }

    #[test]
    fn test_build_table_shape() {
        let rows = vec![
            enriched(1, SurfaceType::BareSoil, 0.1),
            enriched(2, SurfaceType::Dense, 0.8),
        ];
        let df = build_forage_table(&rows).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 24);

        let status = extract_str_column(&df, columns::SURFACE_TYPE).unwrap();
        assert_eq!(status, vec!["BARE_SOIL", "DENSE"]);

        let evi = extract_f64_columns(&df, &[columns::EVI], "test").unwrap();
        assert!(evi[0].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_extract_missing_column_names_context() {
        let rows = vec![enriched(1, SurfaceType::Sparse, 0.4)];
        let df = build_forage_table(&rows).unwrap();
        let err = extract_f64_columns(&df, &["nope"], "Diagnostics").unwrap_err();
        assert!(err.to_string().contains("Diagnostics"));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_csv_export_has_header() {
        let rows = vec![enriched(1, SurfaceType::Moderate, 0.6)];
        let df = build_forage_table(&rows).unwrap();
        let csv = String::from_utf8(to_csv_bytes(&df).unwrap()).unwrap();
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with("id,area_ha,"));
        assert!(header.ends_with("units_per_ha"));
    }

    #[test]
    fn test_load_boundary_with_lat_lon_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paddock.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Longitude,Latitude").unwrap();
        writeln!(file, "-64.10,-34.10").unwrap();
        writeln!(file, "-64.09,-34.10").unwrap();
        writeln!(file, "-64.09,-34.09").unwrap();
        writeln!(file, "-64.10,-34.09").unwrap();
        writeln!(file, "-64.10,-34.10").unwrap();
        drop(file);

        let polygon = load_boundary(&path).unwrap();
        assert_eq!(polygon.ring.len(), 4);
    }

    #[test]
    fn test_load_boundary_rejects_degenerate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("line.csv");
        std::fs::write(&path, "x,y\n0,0\n10,0\n").unwrap();
        assert!(load_boundary(&path).is_err());
    }

    #[test]
    fn test_load_observed_indices_defaults_missing_bands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observed.csv");
        std::fs::write(&path, "id,ndvi,nir\n1,0.55,0.4\n2,0.15,0.3\n").unwrap();

        let observed = load_observed_indices(&path).unwrap();
        assert_eq!(observed.len(), 2);
        assert_eq!(observed[&1].ndvi, 0.55);
        assert_eq!(observed[&1].nir, 0.4);
        assert_eq!(observed[&1].red, 0.15);
    }

    #[test]
    fn test_observed_indices_skip_invalid_and_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observed.csv");
        std::fs::write(
            &path,
            "id,ndvi\n1,0.5\n2.7,0.3\n1,0.8\n0,0.4\n3,0.2\n",
        )
        .unwrap();

        let observed = load_observed_indices(&path).unwrap();
        assert_eq!(observed.len(), 2);
        assert_eq!(observed[&1].ndvi, 0.5);
        assert_eq!(observed[&3].ndvi, 0.2);
        assert!(!observed.contains_key(&2));
    }
}
