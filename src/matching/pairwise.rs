//! Pairwise matching of two sortings.

use crate::config::{check_fraction, ComparisonConfig};
use crate::data::{Sorting, SpikeTrain, UnitId};
use crate::error::{CompareError, Result};
use crate::matching::confusion::ConfusionMatrix;
use crate::matching::events::{agreement_fraction, count_matching_events};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A pair of units that chose each other as best match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutualMatch {
    /// Unit of sorting A.
    pub unit_a: UnitId,
    /// Unit of sorting B.
    pub unit_b: UnitId,
    /// Agreement fraction of the pair.
    pub score: f64,
    /// Number of matched spikes.
    pub match_count: usize,
}

/// Result of matching sorting A against sorting B.
///
/// Holds the full match-count and agreement matrices (rows = units of A,
/// columns = units of B, both in ascending id order) and the best match of
/// every unit in both directions. `None` marks an unmatched unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceTable {
    unit_ids_a: Vec<UnitId>,
    unit_ids_b: Vec<UnitId>,
    spike_counts_a: Vec<usize>,
    spike_counts_b: Vec<usize>,
    match_counts: Vec<Vec<usize>>,
    scores: Vec<Vec<f64>>,
    best_match_a: Vec<Option<UnitId>>,
    best_match_b: Vec<Option<UnitId>>,
    delta_frames: i64,
    sampling_frequency: f64,
    match_score_threshold: f64,
}

impl CorrespondenceTable {
    /// Unit ids of sorting A (rows).
    pub fn unit_ids_a(&self) -> &[UnitId] {
        &self.unit_ids_a
    }

    /// Unit ids of sorting B (columns).
    pub fn unit_ids_b(&self) -> &[UnitId] {
        &self.unit_ids_b
    }

    /// Spike counts of sorting A's units, in row order.
    pub fn spike_counts_a(&self) -> &[usize] {
        &self.spike_counts_a
    }

    /// Spike counts of sorting B's units, in column order.
    pub fn spike_counts_b(&self) -> &[usize] {
        &self.spike_counts_b
    }

    /// Matched spike counts, `[row][column]`.
    pub fn match_count_matrix(&self) -> &[Vec<usize>] {
        &self.match_counts
    }

    /// Agreement fractions, `[row][column]`.
    pub fn score_matrix(&self) -> &[Vec<f64>] {
        &self.scores
    }

    /// Matching tolerance in frames.
    pub fn delta_frames(&self) -> i64 {
        self.delta_frames
    }

    /// Sampling frequency of both sortings.
    pub fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    /// Threshold a best match had to exceed.
    pub fn match_score_threshold(&self) -> f64 {
        self.match_score_threshold
    }

    /// Row index of a unit of A.
    pub fn index_a(&self, unit: &UnitId) -> Option<usize> {
        self.unit_ids_a.binary_search(unit).ok()
    }

    /// Column index of a unit of B.
    pub fn index_b(&self, unit: &UnitId) -> Option<usize> {
        self.unit_ids_b.binary_search(unit).ok()
    }

    /// Matched spike count between a unit of A and a unit of B.
    pub fn match_count(&self, unit_a: &UnitId, unit_b: &UnitId) -> Option<usize> {
        Some(self.match_counts[self.index_a(unit_a)?][self.index_b(unit_b)?])
    }

    /// Agreement fraction between a unit of A and a unit of B.
    pub fn score(&self, unit_a: &UnitId, unit_b: &UnitId) -> Option<f64> {
        Some(self.scores[self.index_a(unit_a)?][self.index_b(unit_b)?])
    }

    /// Best match in B of a unit of A.
    pub fn best_match(&self, unit_a: &UnitId) -> Option<&UnitId> {
        self.best_match_a[self.index_a(unit_a)?].as_ref()
    }

    /// Best match in A of a unit of B.
    pub fn best_match_reverse(&self, unit_b: &UnitId) -> Option<&UnitId> {
        self.best_match_b[self.index_b(unit_b)?].as_ref()
    }

    /// For every unit of A, its best match in B (or unmatched).
    pub fn mapped_unit_ids(&self) -> Vec<(UnitId, Option<UnitId>)> {
        self.unit_ids_a
            .iter()
            .cloned()
            .zip(self.best_match_a.iter().cloned())
            .collect()
    }

    /// For every unit of B, its best match in A (or unmatched).
    pub fn mapped_unit_ids_reverse(&self) -> Vec<(UnitId, Option<UnitId>)> {
        self.unit_ids_b
            .iter()
            .cloned()
            .zip(self.best_match_b.iter().cloned())
            .collect()
    }

    /// Pairs whose A→B and B→A best matches agree.
    pub fn mutual_matches(&self) -> Vec<MutualMatch> {
        self.best_match_a
            .iter()
            .enumerate()
            .filter_map(|(i, best)| {
                let j = self.index_b(best.as_ref()?)?;
                let back = self.best_match_b[j].as_ref()?;
                if back != &self.unit_ids_a[i] {
                    return None;
                }
                Some(MutualMatch {
                    unit_a: self.unit_ids_a[i].clone(),
                    unit_b: self.unit_ids_b[j].clone(),
                    score: self.scores[i][j],
                    match_count: self.match_counts[i][j],
                })
            })
            .collect()
    }

    /// Number of units of A with a best match.
    pub fn n_matched_a(&self) -> usize {
        self.best_match_a.iter().filter(|m| m.is_some()).count()
    }

    /// Number of units of B with a best match.
    pub fn n_matched_b(&self) -> usize {
        self.best_match_b.iter().filter(|m| m.is_some()).count()
    }

    /// Confusion matrix treating A as ground truth and B as tested.
    pub fn confusion_matrix(&self) -> ConfusionMatrix {
        ConfusionMatrix::from_table(self)
    }

    /// Same table with the roles of A and B swapped.
    pub fn transposed(&self) -> Self {
        Self {
            unit_ids_a: self.unit_ids_b.clone(),
            unit_ids_b: self.unit_ids_a.clone(),
            spike_counts_a: self.spike_counts_b.clone(),
            spike_counts_b: self.spike_counts_a.clone(),
            match_counts: transpose(&self.match_counts, self.unit_ids_b.len()),
            scores: transpose(&self.scores, self.unit_ids_b.len()),
            best_match_a: self.best_match_b.clone(),
            best_match_b: self.best_match_a.clone(),
            delta_frames: self.delta_frames,
            sampling_frequency: self.sampling_frequency,
            match_score_threshold: self.match_score_threshold,
        }
    }
}

fn transpose<T: Copy>(matrix: &[Vec<T>], n_cols: usize) -> Vec<Vec<T>> {
    (0..n_cols)
        .map(|j| matrix.iter().map(|row| row[j]).collect())
        .collect()
}

/// Index of the highest score strictly above `threshold`.
///
/// Candidates are scanned in ascending id order and only a strictly higher
/// score replaces the current best, so ties go to the lowest id.
fn select_best<I>(scores: I, threshold: f64) -> Option<usize>
where
    I: IntoIterator<Item = f64>,
{
    let mut best: Option<(usize, f64)> = None;
    for (idx, score) in scores.into_iter().enumerate() {
        match best {
            Some((_, s)) if score <= s => {}
            _ => best = Some((idx, score)),
        }
    }
    best.filter(|&(_, s)| s > threshold).map(|(idx, _)| idx)
}

/// Matches two sortings within a time tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseMatcher {
    delta: Duration,
    match_score_threshold: f64,
}

impl PairwiseMatcher {
    /// Create a matcher. `delta` must be non-zero and the threshold in [0, 1].
    ///
    /// The tolerance is rounded to whole frames of the compared sortings. A
    /// delta shorter than half a sample period rounds to 0 frames, so only
    /// spikes on the same frame match.
    pub fn new(delta: Duration, match_score_threshold: f64) -> Result<Self> {
        if delta.is_zero() {
            return Err(CompareError::Configuration(
                "delta must be greater than zero".to_string(),
            ));
        }
        check_fraction("match_score_threshold", match_score_threshold)?;
        Ok(Self {
            delta,
            match_score_threshold,
        })
    }

    /// Create a matcher from a validated config.
    pub fn from_config(config: &ComparisonConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.delta()?, config.match_score_threshold)
    }

    /// Matching tolerance.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Best-match threshold.
    pub fn match_score_threshold(&self) -> f64 {
        self.match_score_threshold
    }

    /// Match every unit of `a` against every unit of `b`.
    ///
    /// # Errors
    /// * `EmptySorting` if either sorting has no units
    /// * `IncompatibleSamplingContext` if the sortings use different clocks
    pub fn match_sortings(&self, a: &Sorting, b: &Sorting) -> Result<CorrespondenceTable> {
        if a.is_empty() {
            return Err(CompareError::EmptySorting(
                "first sorting has no units".to_string(),
            ));
        }
        if b.is_empty() {
            return Err(CompareError::EmptySorting(
                "second sorting has no units".to_string(),
            ));
        }
        a.time_base().ensure_compatible(b.time_base())?;

        let delta_frames = a.time_base().duration_to_frames(self.delta);
        if delta_frames == 0 {
            warn!(
                delta_us = self.delta.as_micros() as u64,
                sampling_frequency = a.time_base().sampling_frequency(),
                "delta rounds to 0 frames, matching exact frames only"
            );
        }
        let trains_a: Vec<&SpikeTrain> = a.units().map(|u| u.spike_train).collect();
        let trains_b: Vec<&SpikeTrain> = b.units().map(|u| u.spike_train).collect();
        let spike_counts_a: Vec<usize> = trains_a.iter().map(|t| t.len()).collect();
        let spike_counts_b: Vec<usize> = trains_b.iter().map(|t| t.len()).collect();

        debug!(
            units_a = trains_a.len(),
            units_b = trains_b.len(),
            delta_frames,
            "matching sortings"
        );

        let match_counts: Vec<Vec<usize>> = trains_a
            .par_iter()
            .map(|ta| {
                trains_b
                    .iter()
                    .map(|tb| count_matching_events(ta.frames(), tb.frames(), delta_frames))
                    .collect()
            })
            .collect();

        let scores: Vec<Vec<f64>> = match_counts
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, &m)| agreement_fraction(m, spike_counts_a[i], spike_counts_b[j]))
                    .collect()
            })
            .collect();

        let unit_ids_a = a.unit_ids();
        let unit_ids_b = b.unit_ids();
        let threshold = self.match_score_threshold;

        let best_match_a: Vec<Option<UnitId>> = scores
            .iter()
            .map(|row| select_best(row.iter().copied(), threshold).map(|j| unit_ids_b[j].clone()))
            .collect();
        let best_match_b: Vec<Option<UnitId>> = (0..unit_ids_b.len())
            .map(|j| {
                select_best(scores.iter().map(|row| row[j]), threshold)
                    .map(|i| unit_ids_a[i].clone())
            })
            .collect();

        let table = CorrespondenceTable {
            unit_ids_a,
            unit_ids_b,
            spike_counts_a,
            spike_counts_b,
            match_counts,
            scores,
            best_match_a,
            best_match_b,
            delta_frames,
            sampling_frequency: a.sampling_frequency(),
            match_score_threshold: threshold,
        };

        debug!(
            matched_a = table.n_matched_a(),
            matched_b = table.n_matched_b(),
            "pairwise matching done"
        );

        Ok(table)
    }
}

/// Match two sortings with the tolerance and threshold of `config`.
pub fn match_sortings(
    a: &Sorting,
    b: &Sorting,
    config: &ComparisonConfig,
) -> Result<CorrespondenceTable> {
    PairwiseMatcher::from_config(config)?.match_sortings(a, b)
}
