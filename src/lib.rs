//! Spike-Sorting Comparison Library
//!
//! This library matches the spike trains of spike-sorting outputs against
//! ground truth or against each other and quantifies their agreement.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (UnitId, TimeBase, SpikeTrain, Sorting)
//! - **matching**: Spike-event matching and pairwise correspondence tables
//! - **performance**: Precision/recall/accuracy scoring against ground truth
//! - **multi**: Agreement graph and consensus units across N sortings
//! - **report**: Serializable comparison reports
//! - **comparison**: High-level entry points combining the above
//! - **synthetic**: Toy sortings with a known correspondence
//! - **config**: Comparison options
//! - **logging**: Tracing setup
//!
//! # Example
//!
//! ```no_run
//! use spike_compare::prelude::*;
//!
//! let time_base = TimeBase::new(30000.0).unwrap();
//! let gt = Sorting::from_tsv("gt.tsv", time_base).unwrap();
//! let tested = Sorting::from_tsv("sorter.tsv", time_base).unwrap();
//!
//! let config = ComparisonConfig::new().with_delta_ms(0.4);
//! let comparison = compare_sorter_to_ground_truth(&gt, &tested, &config).unwrap();
//! println!("{}", comparison.report().unwrap());
//! ```

pub mod comparison;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod matching;
pub mod multi;
pub mod performance;
pub mod report;
pub mod synthetic;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::comparison::{
        compare_multiple_sorters, compare_sorter_to_ground_truth, compare_two_sorters,
        GroundTruthComparison, MultiSorterComparison, TwoSorterComparison,
    };
    pub use crate::config::ComparisonConfig;
    pub use crate::data::{Sorting, SpikeTrain, TimeBase, Unit, UnitId};
    pub use crate::error::{CompareError, Result};
    pub use crate::matching::{
        agreement_fraction, count_matching_events, match_sortings, matching_events,
        ConfusionMatrix, CorrespondenceTable, MatchEvent, PairwiseMatcher,
    };
    pub use crate::multi::{
        agreement_sets, agreement_sorting, compare_multiple, compare_multiple_detailed,
        AgreementGraph, AgreementSet, MultiComparator, MultiComparison,
    };
    pub use crate::performance::{
        score_performance, PerformanceMetrics, PerformanceReport, PerformanceScorer,
        UnitClassification,
    };
    pub use crate::report::{ComparisonReport, ReportBuilder};
    pub use crate::synthetic::{generate_toy_sortings, SyntheticConfig, SyntheticSortings};
}
