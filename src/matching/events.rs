//! Spike-to-spike matching between two sorted trains.
//!
//! A spike of train A matches a spike of train B when their frames differ by
//! at most `delta` frames. Both trains are swept once with two pointers in
//! increasing time order and each spike takes part in at most one match: the
//! earliest still-available pair is taken greedily. This never double counts
//! and is deterministic, at O(|A| + |B|) per pair.

use serde::{Deserialize, Serialize};

/// One matched pair of spikes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    /// Frame of the spike in train A.
    pub frame_a: i64,
    /// Frame of the spike in train B.
    pub frame_b: i64,
    /// Signed offset `frame_b - frame_a`.
    pub offset: i64,
}

/// Walk both trains and call `on_match(i, j)` for every matched index pair.
#[inline]
fn sweep<F: FnMut(usize, usize)>(a: &[i64], b: &[i64], delta: i64, mut on_match: F) {
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        let (ta, tb) = (a[i], b[j]);
        if ta.abs_diff(tb) <= delta.unsigned_abs() {
            on_match(i, j);
            i += 1;
            j += 1;
        } else if ta < tb {
            i += 1;
        } else {
            j += 1;
        }
    }
}

/// Number of matched spike events between two sorted trains.
pub fn count_matching_events(a: &[i64], b: &[i64], delta: i64) -> usize {
    let mut count = 0usize;
    sweep(a, b, delta, |_, _| count += 1);
    count
}

/// All matched spike events between two sorted trains, in time order.
pub fn matching_events(a: &[i64], b: &[i64], delta: i64) -> Vec<MatchEvent> {
    let mut events = Vec::new();
    sweep(a, b, delta, |i, j| {
        events.push(MatchEvent {
            frame_a: a[i],
            frame_b: b[j],
            offset: b[j] - a[i],
        })
    });
    events
}

/// Matched count normalized by the larger train: `matched / max(n_a, n_b)`.
///
/// Returns 0 when both trains are empty.
#[inline]
pub fn agreement_fraction(matched: usize, n_a: usize, n_b: usize) -> f64 {
    let denom = n_a.max(n_b);
    if denom == 0 {
        0.0
    } else {
        matched as f64 / denom as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_basic_match() {
        let gt = [10, 20, 30];
        let tested = [11, 21, 50];
        assert_eq!(count_matching_events(&gt, &tested, 2), 2);

        let events = matching_events(&gt, &tested, 2);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], MatchEvent { frame_a: 10, frame_b: 11, offset: 1 });
        assert_eq!(events[1].offset, 1);
    }

    #[test]
    fn test_each_spike_used_once() {
        // Two spikes of A within delta of a single spike of B: only one match.
        assert_eq!(count_matching_events(&[10, 11], &[10], 2), 1);
        assert_eq!(count_matching_events(&[10], &[9, 10, 11], 2), 1);
    }

    #[test]
    fn test_greedy_earliest_pairing() {
        // A=10 pairs with B=9 (earliest available), leaving A=12 for B=13.
        let events = matching_events(&[10, 12], &[9, 13], 1);
        assert_eq!(events.len(), 2);
        assert_eq!((events[0].frame_a, events[0].frame_b), (10, 9));
        assert_eq!((events[1].frame_a, events[1].frame_b), (12, 13));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        assert_eq!(count_matching_events(&[100], &[102], 2), 1);
        assert_eq!(count_matching_events(&[100], &[103], 2), 0);
        assert_eq!(count_matching_events(&[5], &[5], 0), 1);
    }

    #[test]
    fn test_empty_trains() {
        assert_eq!(count_matching_events(&[], &[1, 2], 5), 0);
        assert_eq!(agreement_fraction(0, 0, 0), 0.0);
        assert_eq!(agreement_fraction(0, 0, 3), 0.0);
    }

    #[test]
    fn test_agreement_fraction_uses_larger_train() {
        assert!((agreement_fraction(2, 3, 4) - 0.5).abs() < 1e-12);
        assert!((agreement_fraction(3, 3, 3) - 1.0).abs() < 1e-12);
    }

    fn sorted_frames() -> impl Strategy<Value = Vec<i64>> {
        prop::collection::vec(0i64..10_000, 0..200).prop_map(|mut v| {
            v.sort_unstable();
            v
        })
    }

    proptest! {
        #[test]
        fn prop_identical_trains_fully_match(train in sorted_frames(), delta in 0i64..5) {
            let matched = count_matching_events(&train, &train, delta);
            prop_assert_eq!(matched, train.len());
            if !train.is_empty() {
                let fraction = agreement_fraction(matched, train.len(), train.len());
                prop_assert!((fraction - 1.0).abs() < 1e-12);
            }
        }

        #[test]
        fn prop_count_is_symmetric(a in sorted_frames(), b in sorted_frames(), delta in 0i64..20) {
            prop_assert_eq!(
                count_matching_events(&a, &b, delta),
                count_matching_events(&b, &a, delta)
            );
        }

        #[test]
        fn prop_count_bounded(a in sorted_frames(), b in sorted_frames(), delta in 0i64..20) {
            let matched = count_matching_events(&a, &b, delta);
            prop_assert!(matched <= a.len().min(b.len()));
            for e in matching_events(&a, &b, delta) {
                prop_assert!(e.offset.abs() <= delta);
            }
        }

        #[test]
        fn prop_disjoint_trains_never_match(a in sorted_frames(), delta in 0i64..5) {
            // Shift far beyond the largest frame so no spike is within delta.
            let b: Vec<i64> = a.iter().map(|f| f + 100_000).collect();
            prop_assert_eq!(count_matching_events(&a, &b, delta), 0);
        }
    }
}
