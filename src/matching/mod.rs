//! Temporal matching of spike trains and sortings.
//!
//! - **events**: two-pointer spike-to-spike matching of two trains
//! - **pairwise**: unit-by-unit matching of two sortings into a
//!   `CorrespondenceTable`
//! - **confusion**: confusion matrix derived from a correspondence table

mod confusion;
mod events;
mod pairwise;

pub use confusion::ConfusionMatrix;
pub use events::{agreement_fraction, count_matching_events, matching_events, MatchEvent};
pub use pairwise::{match_sortings, CorrespondenceTable, MutualMatch, PairwiseMatcher};
