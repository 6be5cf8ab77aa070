use super::summary::{ParametersDocument, RunSummary};
use crate::metrics::ModelComparison;
use crate::stats::RegressionSummary;

/// Markdown executive summary
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    pub fn format(
        summary: &RunSummary,
        comparison: Option<&ModelComparison>,
        warnings: &[String],
    ) -> String {
        let mut md = String::with_capacity(2048);

        md.push_str(&format!(
            "# Forage Analysis: {}\n\n",
            summary.pasture_type
        ));
        md.push_str(&format!(
            "**Sub-lots:** {}  \n**Total area:** {:.2} ha\n\n",
            summary.n_sublots, summary.total_area_ha
        ));

        md.push_str("## Surface Types\n\n");
        md.push_str("| Surface type | Sub-lots |\n|---|---|\n");
        for (surface_type, count) in &summary.surface_counts {
            md.push_str(&format!("| {} | {} |\n", surface_type, count));
        }
        md.push('\n');

        md.push_str("## Forage Status\n\n");
        md.push_str("| Status | Sub-lots |\n|---|---|\n");
        for (status, count) in &summary.status_counts {
            md.push_str(&format!("| {} | {} |\n", status, count));
        }
        md.push('\n');

        md.push_str("## Productivity\n\n");
        md.push_str(&format!(
            "- Mean available biomass: {:.1} kg/ha\n",
            summary.mean_available_biomass_kg_ha
        ));
        md.push_str(&format!(
            "- Total available biomass: {:.0} kg\n",
            summary.total_biomass_kg
        ));
        md.push_str(&format!(
            "- Supportable animal equivalents: {:.2}\n",
            summary.total_supportable_units
        ));
        md.push_str(&format!(
            "- Mean residency: {:.2} days\n\n",
            summary.mean_residency_days
        ));

        md.push_str("## Diagnostics\n\n");
        match summary.regression_r_squared {
            Some(r2) => md.push_str(&format!("- Regression R²: {:.3}\n", r2)),
            None => md.push_str("- Regression: not available for this run\n"),
        }
        if let Some((name, value)) = &summary.top_predictor {
            md.push_str(&format!(
                "- Most influential predictor: {} (standardized {:+.3})\n",
                name, value
            ));
        }
        if let Some(comparison) = comparison {
            md.push_str(&format!(
                "- Model vs observed NDVI precision: {:.1}% over {} sub-lots\n",
                comparison.precision * 100.0,
                comparison.rows.len()
            ));
        }
        md.push('\n');

        if !warnings.is_empty() {
            md.push_str("## Warnings\n\n");
            for warning in warnings {
                md.push_str(&format!("- {}\n", warning));
            }
            md.push('\n');
        }

        md.push_str("## Recommendation\n\n");
        md.push_str(&summary.recommendation);
        md.push('\n');

        md
    }
}

/// JSON documents
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn parameters(document: &ParametersDocument) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(document)
    }

    pub fn regression(summary: &RegressionSummary) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, PastureType};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_markdown_sections() {
        let summary = RunSummary::from_rows(PastureType::Ryegrass, &[], None);
        let md = MarkdownFormatter::format(&summary, None, &["coordinates ignored".to_string()]);
        assert!(md.starts_with("# Forage Analysis: RYEGRASS"));
        assert!(md.contains("## Surface Types"));
        assert!(md.contains("| BARE_SOIL | 0 |"));
        assert!(md.contains("## Recommendation"));
        assert!(md.contains("not available"));
        assert!(md.contains("## Warnings\n\n- coordinates ignored"));
    }

    #[test]
    fn test_parameters_json() {
        let config = AnalysisConfig::default();
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let json = JsonFormatter::parameters(&ParametersDocument::new(&config, at)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pasture_type"], "ALFALFA");
        assert_eq!(value["n_sublots"], 24);
        assert_eq!(value["seed"], 42);
        assert_eq!(value["generated_at"], "2026-10-16T09:30:00Z");
    }
}
