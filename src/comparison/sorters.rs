//! Comparison of sorters with each other, without ground truth.

use crate::config::ComparisonConfig;
use crate::data::Sorting;
use crate::error::Result;
use crate::matching::{match_sortings, CorrespondenceTable};
use crate::multi::{agreement_sorting, AgreementSet, MultiComparator, MultiComparison};
use crate::report::{ComparisonReport, ReportBuilder};

/// Result of [`compare_two_sorters`].
#[derive(Debug, Clone)]
pub struct TwoSorterComparison {
    name_a: String,
    name_b: String,
    table: CorrespondenceTable,
}

impl TwoSorterComparison {
    /// Correspondence table, first sorting as side A.
    pub fn table(&self) -> &CorrespondenceTable {
        &self.table
    }

    /// Take the correspondence table.
    pub fn into_table(self) -> CorrespondenceTable {
        self.table
    }

    /// Report with the correspondence section.
    pub fn report(&self) -> Result<ComparisonReport> {
        ReportBuilder::new()
            .title("Sorter comparison")
            .correspondence(self.name_a.clone(), self.name_b.clone(), self.table.clone())
            .build()
    }
}

/// Match two sorter outputs symmetrically.
pub fn compare_two_sorters(
    (name_a, a): (&str, &Sorting),
    (name_b, b): (&str, &Sorting),
    config: &ComparisonConfig,
) -> Result<TwoSorterComparison> {
    Ok(TwoSorterComparison {
        name_a: name_a.to_string(),
        name_b: name_b.to_string(),
        table: match_sortings(a, b, config)?,
    })
}

/// Result of [`compare_multiple_sorters`].
#[derive(Debug, Clone)]
pub struct MultiSorterComparison {
    config: ComparisonConfig,
    comparison: MultiComparison,
    agreement_sets: Vec<AgreementSet>,
}

impl MultiSorterComparison {
    /// Graph and pairwise tables behind the agreement sets.
    pub fn comparison(&self) -> &MultiComparison {
        &self.comparison
    }

    /// Agreement sets at the configured `minimum_matching`.
    pub fn agreement_sets(&self) -> &[AgreementSet] {
        &self.agreement_sets
    }

    /// Consensus sorting built from the agreement sets.
    pub fn agreement_sorting(&self, sortings: &[(&str, &Sorting)]) -> Result<Sorting> {
        agreement_sorting(&self.agreement_sets, sortings)
    }

    /// Report with the agreement graph and sets.
    pub fn report(&self) -> Result<ComparisonReport> {
        ReportBuilder::new()
            .title(format!(
                "Multi-sorter comparison ({})",
                self.comparison.sorting_names().join(", ")
            ))
            .config(&self.config)
            .agreement_graph(self.comparison.graph().clone())
            .agreement_sets(self.agreement_sets.clone())
            .build()
    }
}

/// Compare several sorter outputs and extract their agreement sets.
pub fn compare_multiple_sorters(
    sortings: &[(&str, &Sorting)],
    config: &ComparisonConfig,
) -> Result<MultiSorterComparison> {
    let comparison = MultiComparator::from_config(config)?.compare(sortings)?;
    let agreement_sets = comparison.agreement_sets(config.minimum_matching)?;
    Ok(MultiSorterComparison {
        config: config.clone(),
        comparison,
        agreement_sets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnitId;

    fn config() -> ComparisonConfig {
        ComparisonConfig::new().with_delta_ms(2.0)
    }

    #[test]
    fn test_two_sorters_report() {
        let a = Sorting::from_frames(1000.0, [(0, vec![10, 20, 30])]).unwrap();
        let b = Sorting::from_frames(1000.0, [(4, vec![11, 19, 30])]).unwrap();
        let cmp = compare_two_sorters(("ks", &a), ("ms4", &b), &config()).unwrap();
        assert_eq!(cmp.table().best_match(&0.into()), Some(&UnitId::from(4)));

        let report = cmp.report().unwrap();
        let section = report.correspondence().unwrap();
        assert_eq!((section.name_a.as_str(), section.name_b.as_str()), ("ks", "ms4"));
    }

    #[test]
    fn test_multiple_sorters_consensus() {
        let a = Sorting::from_frames(1000.0, [(0, vec![100, 200, 300]), (1, vec![900])]).unwrap();
        let b = Sorting::from_frames(1000.0, [(5, vec![101, 201, 301])]).unwrap();
        let c = Sorting::from_frames(1000.0, [(9, vec![99, 199, 299])]).unwrap();
        let inputs = [("a", &a), ("b", &b), ("c", &c)];

        let cmp = compare_multiple_sorters(&inputs, &config().with_minimum_matching(3)).unwrap();
        assert_eq!(cmp.agreement_sets().len(), 1);
        assert_eq!(cmp.agreement_sets()[0].n_sortings(), 3);

        let consensus = cmp.agreement_sorting(&inputs).unwrap();
        assert_eq!(consensus.n_units(), 1);
        assert_eq!(consensus.spike_train(&0.into()).unwrap().frames(), &[100, 200, 300]);

        let report = cmp.report().unwrap();
        assert_eq!(report.agreement_sets().map(|s| s.len()), Some(1));
        assert!(report.title().unwrap().contains("a, b, c"));
    }
}
