//! Synthetic sortings with a known correspondence, for demos and testing.

mod generate;

pub use generate::{generate_toy_sortings, SyntheticConfig, SyntheticSortings};
