//! N-way comparison of sortings.

use crate::config::ComparisonConfig;
use crate::data::{Sorting, UnitId};
use crate::error::{CompareError, Result};
use crate::matching::{CorrespondenceTable, PairwiseMatcher};
use crate::multi::agreement::AgreementSet;
use crate::multi::graph::{AgreementEdge, AgreementGraph};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Correspondence table of one pair of sortings.
#[derive(Debug, Clone, Serialize)]
pub struct PairwiseResult {
    /// Name of sorting A.
    pub sorting_a: String,
    /// Name of sorting B.
    pub sorting_b: String,
    /// Table with `sorting_a` as A.
    pub table: CorrespondenceTable,
}

/// Agreement graph plus every pairwise table it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct MultiComparison {
    graph: AgreementGraph,
    pairwise: Vec<PairwiseResult>,
}

impl MultiComparison {
    /// The agreement graph.
    pub fn graph(&self) -> &AgreementGraph {
        &self.graph
    }

    /// Pairwise tables, in pair order `(0,1), (0,2), .., (1,2), ..`.
    pub fn pairwise(&self) -> &[PairwiseResult] {
        &self.pairwise
    }

    /// Sorting names in comparison order.
    pub fn sorting_names(&self) -> &[String] {
        self.graph.sorting_names()
    }

    /// Table between two sortings, oriented with `a` as A.
    pub fn table(&self, a: &str, b: &str) -> Option<CorrespondenceTable> {
        self.pairwise.iter().find_map(|p| {
            if p.sorting_a == a && p.sorting_b == b {
                Some(p.table.clone())
            } else if p.sorting_a == b && p.sorting_b == a {
                Some(p.table.transposed())
            } else {
                None
            }
        })
    }

    /// Agreement sets spanning at least `minimum_matching` sortings.
    pub fn agreement_sets(&self, minimum_matching: usize) -> Result<Vec<AgreementSet>> {
        self.graph.agreement_sets(minimum_matching)
    }

    /// Units of `reference` mapped to their partners in `other`.
    pub fn mapped_unit_ids(
        &self,
        reference: &str,
        other: &str,
    ) -> Result<Vec<(UnitId, Option<UnitId>)>> {
        self.graph.mapped_unit_ids(reference, other)
    }

    /// Discard the tables and keep the graph.
    pub fn into_graph(self) -> AgreementGraph {
        self.graph
    }
}

/// Runs pairwise matching over every pair of sortings and links mutual best
/// matches.
#[derive(Debug, Clone, Copy)]
pub struct MultiComparator {
    matcher: PairwiseMatcher,
}

impl MultiComparator {
    /// Create a comparator from a validated config.
    pub fn from_config(config: &ComparisonConfig) -> Result<Self> {
        Ok(Self {
            matcher: PairwiseMatcher::from_config(config)?,
        })
    }

    /// Create a comparator around an existing matcher.
    pub fn with_matcher(matcher: PairwiseMatcher) -> Self {
        Self { matcher }
    }

    /// Compare all sortings against each other.
    ///
    /// Every input is validated before any matching starts.
    pub fn compare(&self, sortings: &[(&str, &Sorting)]) -> Result<MultiComparison> {
        validate_inputs(sortings)?;

        let pairs: Vec<(usize, usize)> = (0..sortings.len())
            .flat_map(|i| ((i + 1)..sortings.len()).map(move |j| (i, j)))
            .collect();

        debug!(
            n_sortings = sortings.len(),
            n_pairs = pairs.len(),
            "comparing multiple sortings"
        );

        let tables: Vec<CorrespondenceTable> = pairs
            .par_iter()
            .map(|&(i, j)| self.matcher.match_sortings(sortings[i].1, sortings[j].1))
            .collect::<Result<Vec<_>>>()?;

        let mut graph =
            AgreementGraph::new(sortings.iter().map(|(name, _)| name.to_string()).collect())?;
        for (name, sorting) in sortings {
            for unit_id in sorting.unit_ids() {
                graph.add_unit(name, unit_id)?;
            }
        }

        let mut pairwise = Vec::with_capacity(pairs.len());
        for (&(i, j), table) in pairs.iter().zip(tables) {
            let (name_a, name_b) = (sortings[i].0, sortings[j].0);
            for m in table.mutual_matches() {
                graph.add_edge(
                    (name_a, m.unit_a),
                    (name_b, m.unit_b),
                    AgreementEdge {
                        score: m.score,
                        match_count: m.match_count,
                    },
                )?;
            }
            pairwise.push(PairwiseResult {
                sorting_a: name_a.to_string(),
                sorting_b: name_b.to_string(),
                table,
            });
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "agreement graph built"
        );

        Ok(MultiComparison { graph, pairwise })
    }
}

fn validate_inputs(sortings: &[(&str, &Sorting)]) -> Result<()> {
    if sortings.len() < 2 {
        return Err(CompareError::Configuration(format!(
            "multi-sorting comparison needs at least 2 sortings, got {}",
            sortings.len()
        )));
    }
    for (i, (name, sorting)) in sortings.iter().enumerate() {
        if sortings[..i].iter().any(|(other, _)| other == name) {
            return Err(CompareError::Configuration(format!(
                "duplicate sorting name '{}'",
                name
            )));
        }
        if sorting.is_empty() {
            return Err(CompareError::EmptySorting(format!(
                "sorting '{}' has no units",
                name
            )));
        }
        sortings[0].1.time_base().ensure_compatible(sorting.time_base())?;
    }
    Ok(())
}

/// Build the agreement graph of several sortings.
pub fn compare_multiple(
    sortings: &[(&str, &Sorting)],
    config: &ComparisonConfig,
) -> Result<AgreementGraph> {
    compare_multiple_detailed(sortings, config).map(MultiComparison::into_graph)
}

/// Build the agreement graph and keep the pairwise tables.
pub fn compare_multiple_detailed(
    sortings: &[(&str, &Sorting)],
    config: &ComparisonConfig,
) -> Result<MultiComparison> {
    MultiComparator::from_config(config)?.compare(sortings)
}
