//! Report documents and the downloadable bundle
//!
//! - `summary`: run aggregates and the parameters document
//! - `formatters`: Markdown executive summary, JSON documents
//! - `bundle`: timestamped artifact names and the ZIP archive

pub mod bundle;
pub mod formatters;
pub mod summary;

pub use bundle::{Artifact, ArtifactKind, ArtifactSet};
pub use formatters::{JsonFormatter, MarkdownFormatter};
pub use summary::{recommendation, ParametersDocument, RunSummary};
