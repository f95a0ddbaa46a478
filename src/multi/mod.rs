//! Comparison of more than two sortings.
//!
//! Every pair of sortings is matched, mutual best matches become edges of an
//! [`AgreementGraph`], and connected components of that graph yield the
//! agreement sets (consensus units).

pub mod agreement;
pub mod comparator;
pub mod graph;

pub use agreement::{agreement_sets, agreement_sorting, AgreementMember, AgreementSet};
pub use comparator::{
    compare_multiple, compare_multiple_detailed, MultiComparator, MultiComparison, PairwiseResult,
};
pub use graph::{AgreementEdge, AgreementGraph, AgreementGraphSnapshot, EdgeRecord, UnitNode};
