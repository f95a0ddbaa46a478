//! Comparison of a sorter's output with ground truth.

use crate::config::ComparisonConfig;
use crate::data::{Sorting, UnitId};
use crate::error::Result;
use crate::matching::{ConfusionMatrix, CorrespondenceTable, PairwiseMatcher};
use crate::performance::{PerformanceReport, PerformanceScorer};
use crate::report::{ComparisonReport, ReportBuilder};
use serde::Serialize;
use tracing::debug;

/// Result of [`compare_sorter_to_ground_truth`].
#[derive(Debug, Clone, Serialize)]
pub struct GroundTruthComparison {
    config: ComparisonConfig,
    table: CorrespondenceTable,
    confusion: ConfusionMatrix,
    performance: PerformanceReport,
}

impl GroundTruthComparison {
    /// Table with the ground truth as side A.
    pub fn table(&self) -> &CorrespondenceTable {
        &self.table
    }

    /// Confusion matrix of gt against tested units.
    pub fn confusion_matrix(&self) -> &ConfusionMatrix {
        &self.confusion
    }

    /// Per-unit and aggregate performance.
    pub fn performance(&self) -> &PerformanceReport {
        &self.performance
    }

    /// Configuration the comparison ran with.
    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Tested unit matched to each gt unit.
    pub fn mapped_unit_ids(&self) -> Vec<(UnitId, Option<UnitId>)> {
        self.table.mapped_unit_ids()
    }

    /// Gt units whose accuracy reaches `well_detected_score`.
    pub fn well_detected_units(&self) -> &[UnitId] {
        &self.performance.classification.well_detected
    }

    /// False-positive and overmerged tested units.
    pub fn bad_units(&self) -> &[UnitId] {
        &self.performance.classification.bad
    }

    /// Report with every section of the comparison.
    pub fn report(&self) -> Result<ComparisonReport> {
        ReportBuilder::new()
            .title("Ground-truth comparison")
            .config(&self.config)
            .correspondence("ground_truth", "tested", self.table.clone())
            .confusion(self.confusion.sorted_by_match())
            .performance(self.performance.clone())
            .build()
    }
}

/// Match `tested` against `gt` and score it.
///
/// # Example
///
/// ```
/// use spike_compare::comparison::compare_sorter_to_ground_truth;
/// use spike_compare::config::ComparisonConfig;
/// use spike_compare::data::Sorting;
///
/// let gt = Sorting::from_frames(1000.0, [(0, vec![10, 20, 30])]).unwrap();
/// let tested = Sorting::from_frames(1000.0, [(7, vec![11, 21, 50])]).unwrap();
/// let config = ComparisonConfig::new().with_delta_ms(2.0);
///
/// let cmp = compare_sorter_to_ground_truth(&gt, &tested, &config).unwrap();
/// let unit = cmp.performance().unit(&0.into()).unwrap();
/// assert_eq!(unit.true_positives, 2);
/// ```
pub fn compare_sorter_to_ground_truth(
    gt: &Sorting,
    tested: &Sorting,
    config: &ComparisonConfig,
) -> Result<GroundTruthComparison> {
    let matcher = PairwiseMatcher::from_config(config)?;
    let scorer = PerformanceScorer::from_config(config)?;

    let table = matcher.match_sortings(gt, tested)?;
    let confusion = table.confusion_matrix();
    let performance = scorer.score(&table, gt, tested)?;

    debug!(
        matched = performance.summary.n_matched_gt_units,
        missed = performance.summary.n_missed_units,
        "ground-truth comparison done"
    );

    Ok(GroundTruthComparison {
        config: config.clone(),
        table,
        confusion,
        performance,
    })
}
