//! Spike trains: sorted sample frames of a single unit.

use crate::data::TimeBase;
use crate::error::{CompareError, Result};
use serde::{Deserialize, Serialize};

/// Ordered spike frames of one unit.
///
/// Frames are non-negative and monotonically non-decreasing. The invariant
/// is checked on construction (including deserialization) and the train is
/// read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct SpikeTrain {
    frames: Vec<i64>,
}

impl SpikeTrain {
    /// Create a spike train from sorted, non-negative frames.
    pub fn new(frames: Vec<i64>) -> Result<Self> {
        if let Some(pos) = frames.iter().position(|&f| f < 0) {
            return Err(CompareError::InvalidTrain(format!(
                "negative frame {} at position {}",
                frames[pos], pos
            )));
        }
        if let Some(pos) = frames.windows(2).position(|w| w[1] < w[0]) {
            return Err(CompareError::InvalidTrain(format!(
                "frames not sorted at position {} ({} after {})",
                pos + 1,
                frames[pos + 1],
                frames[pos]
            )));
        }
        Ok(Self { frames })
    }

    /// An empty spike train.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a train from spike times in seconds, rounded to frames.
    pub fn from_seconds(times: &[f64], time_base: &TimeBase) -> Result<Self> {
        if let Some(t) = times.iter().find(|t| !t.is_finite()) {
            return Err(CompareError::InvalidTrain(format!(
                "non-finite spike time {}",
                t
            )));
        }
        let frames = times
            .iter()
            .map(|&t| time_base.seconds_to_frame(t))
            .collect();
        Self::new(frames)
    }

    /// Spike frames in increasing order.
    #[inline]
    pub fn frames(&self) -> &[i64] {
        &self.frames
    }

    /// Number of spikes.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if the train has no spikes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// First spike frame.
    pub fn first(&self) -> Option<i64> {
        self.frames.first().copied()
    }

    /// Last spike frame.
    pub fn last(&self) -> Option<i64> {
        self.frames.last().copied()
    }

    /// Iterate over spike frames.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.frames.iter().copied()
    }

    /// Number of spikes in the half-open window `[start, start + width)`.
    pub fn count_in_window(&self, start: i64, width: i64) -> usize {
        if width <= 0 {
            return 0;
        }
        let end = start.saturating_add(width);
        let lo = self.frames.partition_point(|&f| f < start);
        let hi = self.frames.partition_point(|&f| f < end);
        hi - lo
    }

    /// Spike times in seconds.
    pub fn to_seconds(&self, time_base: &TimeBase) -> Vec<f64> {
        self.frames
            .iter()
            .map(|&f| time_base.frames_to_seconds(f))
            .collect()
    }
}

impl TryFrom<Vec<i64>> for SpikeTrain {
    type Error = CompareError;

    fn try_from(frames: Vec<i64>) -> Result<Self> {
        Self::new(frames)
    }
}

impl From<SpikeTrain> for Vec<i64> {
    fn from(train: SpikeTrain) -> Self {
        train.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unsorted() {
        let err = SpikeTrain::new(vec![10, 5, 20]).unwrap_err();
        assert!(matches!(err, CompareError::InvalidTrain(_)));
    }

    #[test]
    fn test_rejects_negative() {
        let err = SpikeTrain::new(vec![-1, 5]).unwrap_err();
        assert!(matches!(err, CompareError::InvalidTrain(_)));
    }

    #[test]
    fn test_allows_duplicates() {
        let train = SpikeTrain::new(vec![3, 3, 7]).unwrap();
        assert_eq!(train.len(), 3);
        assert_eq!(train.first(), Some(3));
        assert_eq!(train.last(), Some(7));
    }

    #[test]
    fn test_count_in_window() {
        let train = SpikeTrain::new(vec![10, 20, 20, 30, 45]).unwrap();
        assert_eq!(train.count_in_window(10, 10), 1); // [10, 20)
        assert_eq!(train.count_in_window(10, 11), 3); // [10, 21)
        assert_eq!(train.count_in_window(0, 100), 5);
        assert_eq!(train.count_in_window(46, 100), 0);
        assert_eq!(train.count_in_window(10, 0), 0);
        assert_eq!(train.count_in_window(i64::MAX - 1, 10), 0);
    }

    #[test]
    fn test_from_seconds() {
        let tb = TimeBase::new(1000.0).unwrap();
        let train = SpikeTrain::from_seconds(&[0.010, 0.0212, 0.030], &tb).unwrap();
        assert_eq!(train.frames(), &[10, 21, 30]);
        assert_eq!(train.to_seconds(&tb), vec![0.010, 0.021, 0.030]);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: SpikeTrain = serde_json::from_str("[1,2,3]").unwrap();
        assert_eq!(ok.len(), 3);
        assert!(serde_json::from_str::<SpikeTrain>("[3,2,1]").is_err());
    }
}
