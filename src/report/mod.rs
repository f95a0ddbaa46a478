//! Assembly of comparison results into a serializable report.

mod builder;

pub use builder::{ComparisonReport, CorrespondenceSection, ReportBuilder};
