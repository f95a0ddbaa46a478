//! Per-unit and aggregate performance of a tested sorting against ground truth.

use crate::config::{check_fraction, ComparisonConfig};
use crate::data::{Sorting, UnitId};
use crate::error::{CompareError, Result};
use crate::matching::CorrespondenceTable;
use crate::performance::classify::{classify_units, UnitClassification};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ratio with a zero denominator mapped to 0.
#[inline]
fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Detection rates derived from spike counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// TP / (TP + FP).
    pub precision: f64,
    /// TP / (TP + FN).
    pub recall: f64,
    /// TP / (TP + FP + FN).
    pub accuracy: f64,
    /// FP / (TP + FP).
    pub false_discovery_rate: f64,
    /// FN / (TP + FN).
    pub miss_rate: f64,
}

impl PerformanceMetrics {
    /// Compute rates from true positive, false negative and false positive counts.
    pub fn from_counts(tp: usize, fn_: usize, fp: usize) -> Self {
        Self {
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
            accuracy: ratio(tp, tp + fp + fn_),
            false_discovery_rate: ratio(fp, tp + fp),
            miss_rate: ratio(fn_, tp + fn_),
        }
    }

    fn mean<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a PerformanceMetrics>,
    {
        let mut sum = Self::default();
        let mut n = 0usize;
        for m in items {
            sum.precision += m.precision;
            sum.recall += m.recall;
            sum.accuracy += m.accuracy;
            sum.false_discovery_rate += m.false_discovery_rate;
            sum.miss_rate += m.miss_rate;
            n += 1;
        }
        if n == 0 {
            return sum;
        }
        let n = n as f64;
        Self {
            precision: sum.precision / n,
            recall: sum.recall / n,
            accuracy: sum.accuracy / n,
            false_discovery_rate: sum.false_discovery_rate / n,
            miss_rate: sum.miss_rate / n,
        }
    }
}

/// Status of a ground-truth unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GtUnitStatus {
    /// Has a best match among the tested units.
    Matched,
    /// No tested unit exceeds the match threshold.
    Missed,
}

/// Status of a tested unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestedUnitStatus {
    /// Has a best match among the ground-truth units.
    Matched,
    /// No ground-truth unit exceeds the match threshold.
    FalsePositiveUnit,
}

/// Performance of one ground-truth unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPerformance {
    /// Ground-truth unit id.
    pub unit_id: UnitId,
    /// Best-matching tested unit.
    pub matched_unit: Option<UnitId>,
    /// Spikes in the ground-truth unit.
    pub n_spikes: usize,
    /// Spikes matched by the tested unit.
    pub true_positives: usize,
    /// Ground-truth spikes the tested unit missed.
    pub false_negatives: usize,
    /// Tested spikes without a ground-truth counterpart.
    pub false_positives: usize,
    /// Rates derived from the counts.
    pub metrics: PerformanceMetrics,
    /// Matched or missed.
    pub status: GtUnitStatus,
}

/// Performance of one tested unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestedUnitPerformance {
    /// Tested unit id.
    pub unit_id: UnitId,
    /// Best-matching ground-truth unit.
    pub matched_unit: Option<UnitId>,
    /// Spikes in the tested unit.
    pub n_spikes: usize,
    /// Spikes matching the ground-truth unit.
    pub true_positives: usize,
    /// Spikes without a ground-truth counterpart.
    pub false_positives: usize,
    /// TP / (TP + FP); 0 for false-positive units.
    pub precision: f64,
    /// Matched or false-positive unit.
    pub status: TestedUnitStatus,
}

/// Aggregate performance over ground-truth units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Mean of the per-unit metrics over all ground-truth units.
    pub by_unit: PerformanceMetrics,
    /// Metrics of the spike counts summed over all ground-truth units.
    pub pooled: PerformanceMetrics,
    /// Number of ground-truth units.
    pub n_gt_units: usize,
    /// Number of tested units.
    pub n_tested_units: usize,
    /// Ground-truth units with a best match.
    pub n_matched_gt_units: usize,
    /// Ground-truth units without a best match.
    pub n_missed_units: usize,
    /// Tested units without a best match.
    pub n_false_positive_units: usize,
}

/// Full result of scoring a tested sorting against ground truth.
///
/// Both the per-unit tables and the aggregates are kept so that a mean never
/// hides a badly detected unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// One entry per ground-truth unit, ascending id.
    pub gt_units: Vec<UnitPerformance>,
    /// One entry per tested unit, ascending id.
    pub tested_units: Vec<TestedUnitPerformance>,
    /// Aggregates.
    pub summary: PerformanceSummary,
    /// Well-detected, redundant, overmerged and bad units.
    pub classification: UnitClassification,
}

impl PerformanceReport {
    /// Performance of a ground-truth unit.
    pub fn unit(&self, unit_id: &UnitId) -> Option<&UnitPerformance> {
        self.gt_units.iter().find(|u| &u.unit_id == unit_id)
    }

    /// Performance of a tested unit.
    pub fn tested_unit(&self, unit_id: &UnitId) -> Option<&TestedUnitPerformance> {
        self.tested_units.iter().find(|u| &u.unit_id == unit_id)
    }

    /// Ground-truth units with no tested counterpart.
    pub fn missed_units(&self) -> Vec<&UnitId> {
        self.gt_units
            .iter()
            .filter(|u| u.status == GtUnitStatus::Missed)
            .map(|u| &u.unit_id)
            .collect()
    }

    /// Tested units with no ground-truth counterpart.
    pub fn false_positive_units(&self) -> Vec<&UnitId> {
        self.tested_units
            .iter()
            .filter(|u| u.status == TestedUnitStatus::FalsePositiveUnit)
            .map(|u| &u.unit_id)
            .collect()
    }

    /// Per-unit mean metrics.
    pub fn mean(&self) -> &PerformanceMetrics {
        &self.summary.by_unit
    }

    /// Pooled metrics.
    pub fn pooled(&self) -> &PerformanceMetrics {
        &self.summary.pooled
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(
            f,
            "Performance ({} gt units, {} tested units)",
            s.n_gt_units, s.n_tested_units
        )?;
        writeln!(
            f,
            "  Matched: {}, missed: {}, false-positive units: {}",
            s.n_matched_gt_units, s.n_missed_units, s.n_false_positive_units
        )?;
        writeln!(f, "  Mean by unit:")?;
        writeln!(f, "    Precision: {:.1}%", s.by_unit.precision * 100.0)?;
        writeln!(f, "    Recall:    {:.1}%", s.by_unit.recall * 100.0)?;
        writeln!(f, "    Accuracy:  {:.1}%", s.by_unit.accuracy * 100.0)?;
        writeln!(f, "  Pooled:")?;
        writeln!(f, "    Precision: {:.1}%", s.pooled.precision * 100.0)?;
        writeln!(f, "    Recall:    {:.1}%", s.pooled.recall * 100.0)?;
        writeln!(f, "    Accuracy:  {:.1}%", s.pooled.accuracy * 100.0)?;
        writeln!(f, "  Units:")?;
        writeln!(f, "    unit\tmatch\tTP\tFN\tFP\tprecision\trecall\taccuracy")?;
        for u in &self.gt_units {
            let matched = u
                .matched_unit
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-1".to_string());
            writeln!(
                f,
                "    {}\t{}\t{}\t{}\t{}\t{:.3}\t{:.3}\t{:.3}",
                u.unit_id,
                matched,
                u.true_positives,
                u.false_negatives,
                u.false_positives,
                u.metrics.precision,
                u.metrics.recall,
                u.metrics.accuracy
            )?;
        }
        write!(f, "{}", self.classification)
    }
}

/// Scores a correspondence table against the sortings it was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceScorer {
    well_detected_score: f64,
    redundant_score: f64,
    overmerged_score: f64,
}

impl Default for PerformanceScorer {
    fn default() -> Self {
        let config = ComparisonConfig::default();
        Self {
            well_detected_score: config.well_detected_score,
            redundant_score: config.redundant_score,
            overmerged_score: config.overmerged_score,
        }
    }
}

impl PerformanceScorer {
    /// Create a scorer from the classification scores of a config.
    pub fn from_config(config: &ComparisonConfig) -> Result<Self> {
        check_fraction("well_detected_score", config.well_detected_score)?;
        check_fraction("redundant_score", config.redundant_score)?;
        check_fraction("overmerged_score", config.overmerged_score)?;
        Ok(Self {
            well_detected_score: config.well_detected_score,
            redundant_score: config.redundant_score,
            overmerged_score: config.overmerged_score,
        })
    }

    /// Score `tested` against `gt` using their correspondence table.
    ///
    /// The table must have been built with `gt` as sorting A and `tested` as
    /// sorting B; otherwise `SortingMismatch` is returned.
    pub fn score(
        &self,
        correspondence: &CorrespondenceTable,
        gt: &Sorting,
        tested: &Sorting,
    ) -> Result<PerformanceReport> {
        check_table_matches(correspondence, gt, tested)?;
        let counts = correspondence.match_count_matrix();

        let gt_units: Vec<UnitPerformance> = correspondence
            .unit_ids_a()
            .iter()
            .zip(correspondence.spike_counts_a())
            .enumerate()
            .map(|(i, (unit_id, &n_spikes))| {
                let matched_unit = correspondence.best_match(unit_id).cloned();
                match matched_unit
                    .as_ref()
                    .and_then(|m| correspondence.index_b(m))
                {
                    Some(j) => {
                        let tp = counts[i][j];
                        let fn_ = n_spikes - tp;
                        let fp = correspondence.spike_counts_b()[j] - tp;
                        UnitPerformance {
                            unit_id: unit_id.clone(),
                            matched_unit,
                            n_spikes,
                            true_positives: tp,
                            false_negatives: fn_,
                            false_positives: fp,
                            metrics: PerformanceMetrics::from_counts(tp, fn_, fp),
                            status: GtUnitStatus::Matched,
                        }
                    }
                    None => UnitPerformance {
                        unit_id: unit_id.clone(),
                        matched_unit: None,
                        n_spikes,
                        true_positives: 0,
                        false_negatives: n_spikes,
                        false_positives: 0,
                        metrics: PerformanceMetrics::from_counts(0, n_spikes, 0),
                        status: GtUnitStatus::Missed,
                    },
                }
            })
            .collect();

        let tested_units: Vec<TestedUnitPerformance> = correspondence
            .unit_ids_b()
            .iter()
            .zip(correspondence.spike_counts_b())
            .enumerate()
            .map(|(j, (unit_id, &n_spikes))| {
                let matched_unit = correspondence.best_match_reverse(unit_id).cloned();
                match matched_unit
                    .as_ref()
                    .and_then(|m| correspondence.index_a(m))
                {
                    Some(i) => {
                        let tp = counts[i][j];
                        TestedUnitPerformance {
                            unit_id: unit_id.clone(),
                            matched_unit,
                            n_spikes,
                            true_positives: tp,
                            false_positives: n_spikes - tp,
                            precision: ratio(tp, n_spikes),
                            status: TestedUnitStatus::Matched,
                        }
                    }
                    None => TestedUnitPerformance {
                        unit_id: unit_id.clone(),
                        matched_unit: None,
                        n_spikes,
                        true_positives: 0,
                        false_positives: n_spikes,
                        precision: 0.0,
                        status: TestedUnitStatus::FalsePositiveUnit,
                    },
                }
            })
            .collect();

        let (tp, fn_, fp) = gt_units.iter().fold((0, 0, 0), |acc, u| {
            (
                acc.0 + u.true_positives,
                acc.1 + u.false_negatives,
                acc.2 + u.false_positives,
            )
        });

        let n_matched_gt_units = gt_units
            .iter()
            .filter(|u| u.status == GtUnitStatus::Matched)
            .count();
        let n_false_positive_units = tested_units
            .iter()
            .filter(|u| u.status == TestedUnitStatus::FalsePositiveUnit)
            .count();

        let summary = PerformanceSummary {
            by_unit: PerformanceMetrics::mean(gt_units.iter().map(|u| &u.metrics)),
            pooled: PerformanceMetrics::from_counts(tp, fn_, fp),
            n_gt_units: gt_units.len(),
            n_tested_units: tested_units.len(),
            n_matched_gt_units,
            n_missed_units: gt_units.len() - n_matched_gt_units,
            n_false_positive_units,
        };

        let classification = classify_units(
            correspondence,
            &gt_units,
            &tested_units,
            self.well_detected_score,
            self.redundant_score,
            self.overmerged_score,
        );

        Ok(PerformanceReport {
            gt_units,
            tested_units,
            summary,
            classification,
        })
    }
}

fn check_table_matches(table: &CorrespondenceTable, gt: &Sorting, tested: &Sorting) -> Result<()> {
    if table.unit_ids_a() != gt.unit_ids().as_slice()
        || table.spike_counts_a() != gt.spike_counts().as_slice()
    {
        return Err(CompareError::SortingMismatch(
            "ground-truth units differ from the table's first sorting".to_string(),
        ));
    }
    if table.unit_ids_b() != tested.unit_ids().as_slice()
        || table.spike_counts_b() != tested.spike_counts().as_slice()
    {
        return Err(CompareError::SortingMismatch(
            "tested units differ from the table's second sorting".to_string(),
        ));
    }
    Ok(())
}

/// Score `tested` against `gt` with the classification scores of `config`.
pub fn score_performance(
    correspondence: &CorrespondenceTable,
    gt: &Sorting,
    tested: &Sorting,
    config: &ComparisonConfig,
) -> Result<PerformanceReport> {
    PerformanceScorer::from_config(config)?.score(correspondence, gt, tested)
}
