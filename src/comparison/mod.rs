//! High-level comparison entry points.
//!
//! - [`compare_sorter_to_ground_truth`]: match and score a sorter against a
//!   known labeling
//! - [`compare_two_sorters`]: symmetric matching of two sorter outputs
//! - [`compare_multiple_sorters`]: agreement graph and consensus units of
//!   several sorter outputs

mod ground_truth;
mod sorters;

pub use ground_truth::{compare_sorter_to_ground_truth, GroundTruthComparison};
pub use sorters::{
    compare_multiple_sorters, compare_two_sorters, MultiSorterComparison, TwoSorterComparison,
};
