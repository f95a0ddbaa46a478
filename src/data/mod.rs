//! Input data structures: unit ids, time bases, spike trains and sortings.

mod sorting;
mod spike_train;
mod time_base;
mod unit_id;

pub use sorting::{Sorting, Unit};
pub use spike_train::SpikeTrain;
pub use time_base::TimeBase;
pub use unit_id::UnitId;
