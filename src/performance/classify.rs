//! Unit classification: well-detected, redundant, overmerged and bad units.

use crate::data::UnitId;
use crate::matching::CorrespondenceTable;
use crate::performance::scorer::{
    GtUnitStatus, TestedUnitPerformance, TestedUnitStatus, UnitPerformance,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unit lists derived from a ground-truth comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitClassification {
    /// Ground-truth units whose accuracy reaches the well-detected score.
    pub well_detected: Vec<UnitId>,
    /// Tested units without a ground-truth correspondent.
    pub false_positive: Vec<UnitId>,
    /// Unmatched tested units that still agree with some ground-truth unit.
    pub redundant: Vec<UnitId>,
    /// Tested units agreeing with two or more ground-truth units.
    pub overmerged: Vec<UnitId>,
    /// False-positive and overmerged tested units.
    pub bad: Vec<UnitId>,
}

impl UnitClassification {
    /// Number of well-detected ground-truth units.
    pub fn count_well_detected(&self) -> usize {
        self.well_detected.len()
    }

    /// Number of bad tested units.
    pub fn count_bad(&self) -> usize {
        self.bad.len()
    }
}

impl fmt::Display for UnitClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Classification:")?;
        writeln!(f, "    Well detected:   {}", self.well_detected.len())?;
        writeln!(f, "    False positive:  {}", self.false_positive.len())?;
        writeln!(f, "    Redundant:       {}", self.redundant.len())?;
        writeln!(f, "    Overmerged:      {}", self.overmerged.len())?;
        writeln!(f, "    Bad:             {}", self.bad.len())
    }
}

pub(crate) fn classify_units(
    table: &CorrespondenceTable,
    gt_units: &[UnitPerformance],
    tested_units: &[TestedUnitPerformance],
    well_detected_score: f64,
    redundant_score: f64,
    overmerged_score: f64,
) -> UnitClassification {
    let scores = table.score_matrix();

    let well_detected = gt_units
        .iter()
        .filter(|u| u.status == GtUnitStatus::Matched && u.metrics.accuracy >= well_detected_score)
        .map(|u| u.unit_id.clone())
        .collect();

    let false_positive: Vec<UnitId> = tested_units
        .iter()
        .filter(|u| u.status == TestedUnitStatus::FalsePositiveUnit)
        .map(|u| u.unit_id.clone())
        .collect();

    let redundant = tested_units
        .iter()
        .enumerate()
        .filter(|(j, u)| {
            u.status == TestedUnitStatus::FalsePositiveUnit
                && scores.iter().any(|row| row[*j] >= redundant_score && row[*j] > 0.0)
        })
        .map(|(_, u)| u.unit_id.clone())
        .collect();

    let overmerged: Vec<UnitId> = tested_units
        .iter()
        .enumerate()
        .filter(|(j, _)| {
            scores
                .iter()
                .filter(|row| row[*j] >= overmerged_score && row[*j] > 0.0)
                .count()
                >= 2
        })
        .map(|(_, u)| u.unit_id.clone())
        .collect();

    let bad = false_positive
        .iter()
        .chain(overmerged.iter())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    UnitClassification {
        well_detected,
        false_positive,
        redundant,
        overmerged,
        bad,
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ComparisonConfig;
    use crate::data::{Sorting, UnitId};
    use crate::matching::match_sortings;
    use crate::performance::score_performance;

    #[test]
    fn test_redundant_and_overmerged() {
        let config = ComparisonConfig::new().with_delta_ms(1.0);
        let gt = Sorting::from_frames(
            1000.0,
            [
                (0, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]),
                (1, vec![510, 520, 530, 540, 550, 560, 570, 580, 590, 600]),
            ],
        )
        .unwrap();
        let tested = Sorting::from_frames(
            1000.0,
            [
                // Good copy of gt 0.
                (0, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]),
                // Shares 3 of gt 0's 10 spikes: unmatched but redundant.
                (1, vec![10, 20, 30]),
                // Half of gt 0 and half of gt 1 merged together.
                (
                    2,
                    vec![
                        10, 20, 30, 40, 50, 510, 520, 530, 540, 550, 560, 570, 580, 590,
                        600,
                    ],
                ),
            ],
        )
        .unwrap();

        let table = match_sortings(&gt, &tested, &config).unwrap();
        let report = score_performance(&table, &gt, &tested, &config).unwrap();
        let c = &report.classification;

        assert_eq!(c.well_detected, vec![UnitId::from(0)]);
        assert_eq!(c.redundant, vec![UnitId::from(1)]);
        assert_eq!(c.overmerged, vec![UnitId::from(2)]);
        assert_eq!(c.false_positive, vec![UnitId::from(1)]);
        assert_eq!(c.bad, vec![UnitId::from(1), UnitId::from(2)]);
    }
}
