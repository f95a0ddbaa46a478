//! Performance scoring of a tested sorting against ground truth.

mod classify;
mod scorer;

pub use classify::UnitClassification;
pub use scorer::{
    score_performance, GtUnitStatus, PerformanceMetrics, PerformanceReport, PerformanceScorer,
    PerformanceSummary, TestedUnitPerformance, TestedUnitStatus, UnitPerformance,
};
