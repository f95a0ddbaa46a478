//! Confusion matrix between a ground-truth and a tested sorting.

use crate::data::UnitId;
use crate::matching::CorrespondenceTable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Matched spike counts per (gt unit, tested unit) pair, plus the spikes
/// each gt unit misses and each tested unit adds relative to its best match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    gt_unit_ids: Vec<UnitId>,
    tested_unit_ids: Vec<UnitId>,
    counts: Vec<Vec<usize>>,
    false_negatives: Vec<usize>,
    false_positives: Vec<usize>,
    matched_tested: Vec<Option<UnitId>>,
}

impl ConfusionMatrix {
    /// Derive the confusion matrix from a correspondence table (A = gt).
    ///
    /// A gt unit's false negatives are its spikes not matched by its best
    /// match (all of them if unmatched); a tested unit's false positives are
    /// its spikes not matched by its own best match in gt.
    pub fn from_table(table: &CorrespondenceTable) -> Self {
        let counts = table.match_count_matrix().to_vec();

        let false_negatives = table
            .unit_ids_a()
            .iter()
            .zip(table.spike_counts_a())
            .enumerate()
            .map(|(i, (unit, &n))| {
                let tp = table
                    .best_match(unit)
                    .and_then(|b| table.index_b(b))
                    .map(|j| counts[i][j])
                    .unwrap_or(0);
                n - tp
            })
            .collect();

        let false_positives = table
            .unit_ids_b()
            .iter()
            .zip(table.spike_counts_b())
            .enumerate()
            .map(|(j, (unit, &n))| {
                let tp = table
                    .best_match_reverse(unit)
                    .and_then(|a| table.index_a(a))
                    .map(|i| counts[i][j])
                    .unwrap_or(0);
                n - tp
            })
            .collect();

        Self {
            gt_unit_ids: table.unit_ids_a().to_vec(),
            tested_unit_ids: table.unit_ids_b().to_vec(),
            counts,
            false_negatives,
            false_positives,
            matched_tested: table
                .mapped_unit_ids()
                .into_iter()
                .map(|(_, tested)| tested)
                .collect(),
        }
    }

    /// Ground-truth unit ids (rows).
    pub fn gt_unit_ids(&self) -> &[UnitId] {
        &self.gt_unit_ids
    }

    /// Tested unit ids (columns).
    pub fn tested_unit_ids(&self) -> &[UnitId] {
        &self.tested_unit_ids
    }

    /// Matched counts, `[gt][tested]`.
    pub fn counts(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Matched spikes between a gt unit and a tested unit.
    pub fn get(&self, gt: &UnitId, tested: &UnitId) -> Option<usize> {
        let i = self.gt_unit_ids.iter().position(|u| u == gt)?;
        let j = self.tested_unit_ids.iter().position(|u| u == tested)?;
        Some(self.counts[i][j])
    }

    /// Missed spikes per gt unit, in row order.
    pub fn false_negatives(&self) -> &[usize] {
        &self.false_negatives
    }

    /// Extra spikes per tested unit, in column order.
    pub fn false_positives(&self) -> &[usize] {
        &self.false_positives
    }

    /// Best-match tested unit of each gt row (`None` when unmatched).
    pub fn matched_tested(&self) -> &[Option<UnitId>] {
        &self.matched_tested
    }

    /// Reorder so that matched pairs lie on the leading diagonal.
    ///
    /// Matched gt rows come first, each paired with its tested column;
    /// unmatched rows and the remaining columns follow in ascending id order.
    /// A tested unit claimed by several gt units sits on the diagonal of the
    /// first of them only.
    pub fn sorted_by_match(&self) -> Self {
        let n_cols = self.tested_unit_ids.len();
        let mut row_order = Vec::with_capacity(self.gt_unit_ids.len());
        let mut col_order = Vec::with_capacity(n_cols);
        let mut col_used = vec![false; n_cols];
        let mut unmatched_rows = Vec::new();

        for (i, matched) in self.matched_tested.iter().enumerate() {
            let col = matched
                .as_ref()
                .and_then(|t| self.tested_unit_ids.iter().position(|u| u == t))
                .filter(|&j| !col_used[j]);
            match col {
                Some(j) => {
                    row_order.push(i);
                    col_order.push(j);
                    col_used[j] = true;
                }
                None => unmatched_rows.push(i),
            }
        }
        row_order.extend(unmatched_rows);
        col_order.extend((0..n_cols).filter(|&j| !col_used[j]));

        Self {
            gt_unit_ids: row_order.iter().map(|&i| self.gt_unit_ids[i].clone()).collect(),
            tested_unit_ids: col_order
                .iter()
                .map(|&j| self.tested_unit_ids[j].clone())
                .collect(),
            counts: row_order
                .iter()
                .map(|&i| col_order.iter().map(|&j| self.counts[i][j]).collect())
                .collect(),
            false_negatives: row_order.iter().map(|&i| self.false_negatives[i]).collect(),
            false_positives: col_order.iter().map(|&j| self.false_positives[j]).collect(),
            matched_tested: row_order
                .iter()
                .map(|&i| self.matched_tested[i].clone())
                .collect(),
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gt\\tested")?;
        for id in &self.tested_unit_ids {
            write!(f, "\t{}", id)?;
        }
        writeln!(f, "\tFN")?;
        for (i, id) in self.gt_unit_ids.iter().enumerate() {
            write!(f, "{}", id)?;
            for count in &self.counts[i] {
                write!(f, "\t{}", count)?;
            }
            writeln!(f, "\t{}", self.false_negatives[i])?;
        }
        write!(f, "FP")?;
        for fp in &self.false_positives {
            write!(f, "\t{}", fp)?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComparisonConfig;
    use crate::data::Sorting;
    use crate::matching::match_sortings;

    fn table() -> CorrespondenceTable {
        // gt 0 <-> tested 5 (2 of 3 spikes), gt 1 unmatched, tested 2 unmatched.
        let gt =
            Sorting::from_frames(1000.0, [(0, vec![10, 20, 30]), (1, vec![400, 500])]).unwrap();
        let tested = Sorting::from_frames(
            1000.0,
            [(2, vec![700, 800, 900]), (5, vec![11, 21, 50])],
        )
        .unwrap();
        match_sortings(&gt, &tested, &ComparisonConfig::new().with_delta_ms(2.0)).unwrap()
    }

    #[test]
    fn test_counts_and_margins() {
        let cm = table().confusion_matrix();
        assert_eq!(cm.get(&0.into(), &5.into()), Some(2));
        assert_eq!(cm.get(&0.into(), &2.into()), Some(0));
        // gt 0 misses one spike, gt 1 misses all of its spikes.
        assert_eq!(cm.false_negatives(), &[1, 2]);
        // tested 2 is unmatched (3 extra spikes), tested 5 adds one spike.
        assert_eq!(cm.false_positives(), &[3, 1]);
    }

    #[test]
    fn test_sorted_by_match_puts_pairs_on_diagonal() {
        let cm = table().confusion_matrix().sorted_by_match();
        assert_eq!(cm.gt_unit_ids(), &[UnitId::from(0), UnitId::from(1)]);
        assert_eq!(cm.tested_unit_ids(), &[UnitId::from(5), UnitId::from(2)]);
        assert_eq!(cm.counts()[0][0], 2);
        assert_eq!(cm.false_positives(), &[1, 3]);
    }

    #[test]
    fn test_display_has_margins() {
        let text = table().confusion_matrix().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("\tFN"));
        assert!(lines[3].starts_with("FP"));
    }
}
