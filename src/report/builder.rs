//! Report builder.
//!
//! The builder only structures results computed elsewhere; nothing is
//! recomputed here.

use crate::config::ComparisonConfig;
use crate::data::UnitId;
use crate::error::{CompareError, Result};
use crate::matching::{ConfusionMatrix, CorrespondenceTable};
use crate::multi::{AgreementGraph, AgreementSet};
use crate::performance::PerformanceReport;
use serde::Serialize;
use std::fmt;

/// A correspondence table labelled with the names of its two sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrespondenceSection {
    /// Name of side A.
    pub name_a: String,
    /// Name of side B.
    pub name_b: String,
    /// The table.
    pub table: CorrespondenceTable,
}

/// Immutable bundle of comparison results.
///
/// Every section is optional but a report holds at least one.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<ComparisonConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correspondence: Option<CorrespondenceSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confusion: Option<ConfusionMatrix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    performance: Option<PerformanceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agreement_graph: Option<AgreementGraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agreement_sets: Option<Vec<AgreementSet>>,
}

impl ComparisonReport {
    /// Report title.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Configuration the results were computed with.
    pub fn config(&self) -> Option<&ComparisonConfig> {
        self.config.as_ref()
    }

    /// Pairwise correspondence section.
    pub fn correspondence(&self) -> Option<&CorrespondenceSection> {
        self.correspondence.as_ref()
    }

    /// Confusion matrix section.
    pub fn confusion(&self) -> Option<&ConfusionMatrix> {
        self.confusion.as_ref()
    }

    /// Ground-truth performance section.
    pub fn performance(&self) -> Option<&PerformanceReport> {
        self.performance.as_ref()
    }

    /// Agreement graph section.
    pub fn agreement_graph(&self) -> Option<&AgreementGraph> {
        self.agreement_graph.as_ref()
    }

    /// Agreement set section.
    pub fn agreement_sets(&self) -> Option<&[AgreementSet]> {
        self.agreement_sets.as_deref()
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(CompareError::from)
    }

    /// YAML document.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(CompareError::from)
    }
}

fn unit_or_unmatched(unit: &Option<UnitId>) -> String {
    unit.as_ref()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "-1".to_string())
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = &self.title {
            writeln!(f, "{}", title)?;
            writeln!(f, "{}", "=".repeat(title.len()))?;
        }
        if let Some(config) = &self.config {
            writeln!(
                f,
                "delta: {} ms, match threshold: {}",
                config.delta_ms, config.match_score_threshold
            )?;
        }

        if let Some(section) = &self.correspondence {
            let table = &section.table;
            writeln!(f)?;
            writeln!(f, "Mapped units ({} -> {})", section.name_a, section.name_b)?;
            for (a, b) in table.mapped_unit_ids() {
                let score = b
                    .as_ref()
                    .and_then(|b| table.score(&a, b))
                    .unwrap_or(0.0);
                writeln!(f, "  {}\t{}\t{:.3}", a, unit_or_unmatched(&b), score)?;
            }
            writeln!(f, "Mapped units ({} -> {})", section.name_b, section.name_a)?;
            for (b, a) in table.mapped_unit_ids_reverse() {
                writeln!(f, "  {}\t{}", b, unit_or_unmatched(&a))?;
            }
        }

        if let Some(confusion) = &self.confusion {
            writeln!(f)?;
            writeln!(f, "Confusion matrix")?;
            write!(f, "{}", confusion)?;
        }

        if let Some(performance) = &self.performance {
            writeln!(f)?;
            write!(f, "{}", performance)?;
        }

        if let Some(graph) = &self.agreement_graph {
            writeln!(f)?;
            writeln!(
                f,
                "Agreement graph: {} sortings, {} units, {} edges",
                graph.sorting_names().len(),
                graph.node_count(),
                graph.edge_count()
            )?;
        }

        if let Some(sets) = &self.agreement_sets {
            writeln!(f, "Agreement sets: {}", sets.len())?;
            for (i, set) in sets.iter().enumerate() {
                writeln!(f, "  {}\t{}", i, set)?;
            }
        }
        Ok(())
    }
}

/// Builder for [`ComparisonReport`].
///
/// # Example
///
/// ```
/// use spike_compare::config::ComparisonConfig;
/// use spike_compare::data::Sorting;
/// use spike_compare::matching::match_sortings;
/// use spike_compare::report::ReportBuilder;
///
/// let a = Sorting::from_frames(30000.0, [(0, vec![100, 900, 4000])]).unwrap();
/// let b = Sorting::from_frames(30000.0, [(3, vec![101, 901, 4002])]).unwrap();
/// let table = match_sortings(&a, &b, &ComparisonConfig::default()).unwrap();
///
/// let report = ReportBuilder::new()
///     .title("a vs b")
///     .correspondence("a", "b", table)
///     .build()
///     .unwrap();
/// assert!(report.to_json().unwrap().contains("\"name_a\": \"a\""));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    title: Option<String>,
    config: Option<ComparisonConfig>,
    correspondence: Option<CorrespondenceSection>,
    confusion: Option<ConfusionMatrix>,
    performance: Option<PerformanceReport>,
    agreement_graph: Option<AgreementGraph>,
    agreement_sets: Option<Vec<AgreementSet>>,
}

impl ReportBuilder {
    /// Start an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the report title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Record the configuration the results were computed with.
    pub fn config(mut self, config: &ComparisonConfig) -> Self {
        self.config = Some(config.clone());
        self
    }

    /// Add a correspondence table between two named sortings.
    pub fn correspondence(
        mut self,
        name_a: impl Into<String>,
        name_b: impl Into<String>,
        table: CorrespondenceTable,
    ) -> Self {
        self.correspondence = Some(CorrespondenceSection {
            name_a: name_a.into(),
            name_b: name_b.into(),
            table,
        });
        self
    }

    /// Add a confusion matrix.
    pub fn confusion(mut self, confusion: ConfusionMatrix) -> Self {
        self.confusion = Some(confusion);
        self
    }

    /// Add ground-truth performance.
    pub fn performance(mut self, performance: PerformanceReport) -> Self {
        self.performance = Some(performance);
        self
    }

    /// Add the agreement graph.
    pub fn agreement_graph(mut self, graph: AgreementGraph) -> Self {
        self.agreement_graph = Some(graph);
        self
    }

    /// Add agreement sets.
    pub fn agreement_sets(mut self, sets: Vec<AgreementSet>) -> Self {
        self.agreement_sets = Some(sets);
        self
    }

    /// Finish the report. Fails if no result section was supplied.
    pub fn build(self) -> Result<ComparisonReport> {
        let has_section = self.correspondence.is_some()
            || self.confusion.is_some()
            || self.performance.is_some()
            || self.agreement_graph.is_some()
            || self.agreement_sets.is_some();
        if !has_section {
            return Err(CompareError::Configuration(
                "report needs at least one result section".to_string(),
            ));
        }
        Ok(ComparisonReport {
            title: self.title,
            config: self.config,
            correspondence: self.correspondence,
            confusion: self.confusion,
            performance: self.performance,
            agreement_graph: self.agreement_graph,
            agreement_sets: self.agreement_sets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Sorting;
    use crate::matching::match_sortings;
    use crate::performance::score_performance;

    fn sortings() -> (Sorting, Sorting) {
        let gt =
            Sorting::from_frames(1000.0, [(0, vec![10, 20, 30]), (1, vec![400, 500])]).unwrap();
        let tested = Sorting::from_frames(1000.0, [(5, vec![11, 21, 50])]).unwrap();
        (gt, tested)
    }

    fn config() -> ComparisonConfig {
        ComparisonConfig::new().with_delta_ms(2.0)
    }

    #[test]
    fn test_empty_builder_fails() {
        assert!(matches!(
            ReportBuilder::new().title("nothing").build(),
            Err(CompareError::Configuration(_))
        ));
    }

    #[test]
    fn test_full_ground_truth_report() {
        let (gt, tested) = sortings();
        let table = match_sortings(&gt, &tested, &config()).unwrap();
        let performance = score_performance(&table, &gt, &tested, &config()).unwrap();

        let report = ReportBuilder::new()
            .title("gt vs sorter")
            .config(&config())
            .confusion(table.confusion_matrix())
            .performance(performance)
            .correspondence("gt", "sorter", table)
            .build()
            .unwrap();

        assert_eq!(report.title(), Some("gt vs sorter"));
        assert!(report.agreement_graph().is_none());
        let perf = report.performance().unwrap();
        assert_eq!(perf.summary.n_missed_units, 1);

        let text = report.to_string();
        assert!(text.contains("Mapped units (gt -> sorter)"));
        // gt unit 1 has no correspondent.
        assert!(text.lines().any(|l| l.trim_start().starts_with("1\t-1")));
        assert!(text.contains("Confusion matrix"));
    }

    #[test]
    fn test_serialization_skips_missing_sections() {
        let (gt, tested) = sortings();
        let table = match_sortings(&gt, &tested, &config()).unwrap();
        let report = ReportBuilder::new()
            .correspondence("gt", "sorter", table)
            .build()
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert!(json.get("correspondence").is_some());
        assert!(json.get("performance").is_none());
        assert!(json.get("title").is_none());

        let yaml = report.to_yaml().unwrap();
        assert!(yaml.contains("name_b: sorter"));
    }
}
