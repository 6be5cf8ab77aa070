//! Artifact set and ZIP bundle
//!
//! Every artifact is named `{stem}_{PASTURE}_{YYYYMMDD_HHMM}.{ext}`. Artifacts
//! that failed to render are simply absent from the set.

use crate::config::PastureType;
use crate::error::ForageError;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    ForageTable,
    ProductivityMap,
    ResidencyMap,
    SurfaceMap,
    CorrelationFigure,
    CorrelationTable,
    RegressionFigure,
    RegressionSummary,
    ModelComparison,
    Parameters,
    ExecutiveSummary,
}

impl ArtifactKind {
    pub fn stem(&self) -> &'static str {
        match self {
            ArtifactKind::ForageTable => "forage_table",
            ArtifactKind::ProductivityMap => "productivity_map",
            ArtifactKind::ResidencyMap => "residency_map",
            ArtifactKind::SurfaceMap => "surface_type_map",
            ArtifactKind::CorrelationFigure => "correlation_matrix",
            ArtifactKind::CorrelationTable => "correlation_table",
            ArtifactKind::RegressionFigure => "regression_diagnostics",
            ArtifactKind::RegressionSummary => "regression_summary",
            ArtifactKind::ModelComparison => "model_vs_observed",
            ArtifactKind::Parameters => "parameters",
            ArtifactKind::ExecutiveSummary => "executive_summary",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::ForageTable
            | ArtifactKind::CorrelationTable
            | ArtifactKind::ModelComparison => "csv",
            ArtifactKind::ProductivityMap
            | ArtifactKind::ResidencyMap
            | ArtifactKind::SurfaceMap
            | ArtifactKind::CorrelationFigure
            | ArtifactKind::RegressionFigure => "png",
            ArtifactKind::RegressionSummary | ArtifactKind::Parameters => "json",
            ArtifactKind::ExecutiveSummary => "md",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
}

/// Artifacts of one run sharing a pasture label and timestamp
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub pasture_type: PastureType,
    pub generated_at: DateTime<Utc>,
    pub artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn new(pasture_type: PastureType, generated_at: DateTime<Utc>) -> Self {
        Self {
            pasture_type,
            generated_at,
            artifacts: Vec::new(),
        }
    }

    /// Add or replace an artifact
    pub fn insert(&mut self, kind: ArtifactKind, bytes: Vec<u8>) {
        self.artifacts.retain(|a| a.kind != kind);
        self.artifacts.push(Artifact { kind, bytes });
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    fn timestamp(&self) -> String {
        self.generated_at.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn file_name(&self, kind: ArtifactKind) -> String {
        format!(
            "{}_{}_{}.{}",
            kind.stem(),
            self.pasture_type,
            self.timestamp(),
            kind.extension()
        )
    }

    pub fn bundle_name(&self) -> String {
        format!("forage_bundle_{}_{}.zip", self.pasture_type, self.timestamp())
    }

    /// Deflate-compressed ZIP of every artifact
    pub fn to_zip(&self) -> Result<Vec<u8>, ForageError> {
        let archive_error = |e: &dyn std::fmt::Display| ForageError::Archive(e.to_string());

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for artifact in &self.artifacts {
            writer
                .start_file(self.file_name(artifact.kind), options)
                .map_err(|e| archive_error(&e))?;
            writer
                .write_all(&artifact.bytes)
                .map_err(|e| archive_error(&e))?;
        }

        let cursor = writer.finish().map_err(|e| archive_error(&e))?;
        Ok(cursor.into_inner())
    }

    /// Write each artifact plus the bundle into `dir`; returns written paths
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, ForageError> {
        let io_error = |path: &Path, e: std::io::Error| ForageError::Archive(format!("{}: {}", path.display(), e));

        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

        let mut written = Vec::with_capacity(self.artifacts.len() + 1);
        for artifact in &self.artifacts {
            let path = dir.join(self.file_name(artifact.kind));
            fs::write(&path, &artifact.bytes).map_err(|e| io_error(&path, e))?;
            written.push(path);
        }

        let bundle_path = dir.join(self.bundle_name());
        fs::write(&bundle_path, self.to_zip()?).map_err(|e| io_error(&bundle_path, e))?;
        written.push(bundle_path);

        tracing::info!("Wrote {} files to {}", written.len(), dir.display());
        Ok(written)
    }
}
