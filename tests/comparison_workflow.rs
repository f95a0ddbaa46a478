//! Integration tests for the comparison workflows.

use spike_compare::prelude::*;
use tempfile::tempdir;

fn default_config() -> ComparisonConfig {
    ComparisonConfig::default()
}

#[test]
fn test_synthetic_ground_truth_recovered() {
    let data = generate_toy_sortings(&SyntheticConfig::new("recover").with_seed(7)).unwrap();
    let cmp = compare_sorter_to_ground_truth(&data.ground_truth, &data.tested, &default_config())
        .unwrap();

    let mapped: Vec<(UnitId, UnitId)> = cmp
        .mapped_unit_ids()
        .into_iter()
        .map(|(gt, tested)| (gt, tested.expect("every gt unit is matched")))
        .collect();
    assert_eq!(mapped, data.true_mapping);

    let performance = cmp.performance();
    assert_eq!(performance.summary.n_missed_units, 0);
    assert_eq!(performance.summary.n_false_positive_units, 0);
    assert!(performance.mean().accuracy > 0.8);
    assert!(performance.mean().recall > 0.85);
    assert!(cmp.bad_units().is_empty());
}

#[test]
fn test_perfect_sorter_scores_one() {
    let data = generate_toy_sortings(&SyntheticConfig::perfect().with_units(5)).unwrap();
    let cmp = compare_sorter_to_ground_truth(&data.ground_truth, &data.tested, &default_config())
        .unwrap();
    for unit in &cmp.performance().gt_units {
        assert_eq!(unit.metrics.precision, 1.0);
        assert_eq!(unit.metrics.recall, 1.0);
        assert_eq!(unit.metrics.accuracy, 1.0);
    }
    assert_eq!(cmp.well_detected_units().len(), 5);
}

#[test]
fn test_noisy_sorter_flags_noise_units() {
    let data = generate_toy_sortings(&SyntheticConfig::noisy().with_units(6)).unwrap();
    let cmp = compare_sorter_to_ground_truth(&data.ground_truth, &data.tested, &default_config())
        .unwrap();

    let performance = cmp.performance();
    // Noise units get ids 6 and 7 and match nothing.
    let fp: Vec<&UnitId> = performance.false_positive_units();
    assert_eq!(fp, vec![&UnitId::from(6), &UnitId::from(7)]);
    assert!(cmp.bad_units().contains(&UnitId::from(6)));
    assert!(cmp.bad_units().contains(&UnitId::from(7)));
    // A third of the spikes are missed, so nothing is well detected.
    assert!(cmp.well_detected_units().is_empty());
    assert!(performance.mean().recall < 0.8);
}

#[test]
fn test_millisecond_example() {
    // gt [10, 20, 30] ms vs tested [11, 21, 50] ms at 1 kHz, delta 2 ms.
    let gt = Sorting::from_frames(1000.0, [(0, vec![10, 20, 30])]).unwrap();
    let tested = Sorting::from_frames(1000.0, [(0, vec![11, 21, 50])]).unwrap();
    let config = ComparisonConfig::new().with_delta_ms(2.0);

    let cmp = compare_sorter_to_ground_truth(&gt, &tested, &config).unwrap();
    let unit = cmp.performance().unit(&0.into()).unwrap();
    assert_eq!(
        (unit.true_positives, unit.false_negatives, unit.false_positives),
        (2, 1, 1)
    );
    assert!((unit.metrics.precision - 2.0 / 3.0).abs() < 1e-12);
    assert!((unit.metrics.recall - 2.0 / 3.0).abs() < 1e-12);
    assert!((unit.metrics.accuracy - 0.5).abs() < 1e-12);
}

#[test]
fn test_tsv_roundtrip_gives_same_comparison() {
    let data = generate_toy_sortings(&SyntheticConfig::new("tsv").with_units(4)).unwrap();
    let dir = tempdir().unwrap();
    let gt_path = dir.path().join("gt.tsv");
    let tested_path = dir.path().join("tested.tsv");
    data.ground_truth.to_tsv(&gt_path).unwrap();
    data.tested.to_tsv(&tested_path).unwrap();

    let time_base = *data.ground_truth.time_base();
    let gt = Sorting::from_tsv(&gt_path, time_base).unwrap();
    let tested = Sorting::from_tsv(&tested_path, time_base).unwrap();

    let direct = match_sortings(&data.ground_truth, &data.tested, &default_config()).unwrap();
    let loaded = match_sortings(&gt, &tested, &default_config()).unwrap();
    assert_eq!(
        serde_json::to_string(&direct).unwrap(),
        serde_json::to_string(&loaded).unwrap()
    );
}

#[test]
fn test_three_sorters_consensus() {
    let data = generate_toy_sortings(&SyntheticConfig::new("consensus").with_units(5)).unwrap();
    let unrelated =
        generate_toy_sortings(&SyntheticConfig::new("unrelated").with_units(3).with_seed(2024))
            .unwrap();
    let inputs = [
        ("gt", &data.ground_truth),
        ("sorter", &data.tested),
        ("unrelated", &unrelated.tested),
    ];

    let cmp = compare_multiple_sorters(&inputs, &default_config()).unwrap();
    let sets = cmp.agreement_sets();
    assert_eq!(sets.len(), 5);
    for (set, (gt, tested)) in sets.iter().zip(&data.true_mapping) {
        assert_eq!(set.unit_in("gt"), Some(gt));
        assert_eq!(set.unit_in("sorter"), Some(tested));
        assert_eq!(set.unit_in("unrelated"), None);
        assert!(set.dropped.is_empty());
    }

    // The consensus takes its trains from the first sorting.
    let consensus = cmp.agreement_sorting(&inputs).unwrap();
    assert_eq!(consensus.n_units(), 5);
    for (k, (gt, _)) in data.true_mapping.iter().enumerate() {
        assert_eq!(
            consensus.spike_train(&UnitId::from(k)),
            data.ground_truth.spike_train(gt)
        );
    }

    let mapped = cmp.comparison().mapped_unit_ids("gt", "unrelated").unwrap();
    assert!(mapped.iter().all(|(_, other)| other.is_none()));
}

#[test]
fn test_report_formats() {
    let data = generate_toy_sortings(&SyntheticConfig::new("report").with_units(3)).unwrap();
    let report = compare_sorter_to_ground_truth(&data.ground_truth, &data.tested, &default_config())
        .unwrap()
        .report()
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["performance"]["summary"]["n_gt_units"], 3);
    assert_eq!(json["config"]["delta_ms"], 0.4);

    let yaml = report.to_yaml().unwrap();
    assert!(yaml.contains("performance:"));

    let text = report.to_string();
    assert!(text.starts_with("Ground-truth comparison"));
    assert!(text.contains("Confusion matrix"));
    assert!(text.contains("Pooled:"));
}

#[test]
fn test_errors_surface_before_matching() {
    let gt = Sorting::from_frames(30000.0, [(0, vec![1, 2, 3])]).unwrap();
    let empty = Sorting::from_frames(30000.0, Vec::<(i64, Vec<i64>)>::new()).unwrap();
    let other_clock = Sorting::from_frames(20000.0, [(0, vec![1, 2, 3])]).unwrap();

    assert!(matches!(
        compare_sorter_to_ground_truth(&gt, &empty, &default_config()),
        Err(CompareError::EmptySorting(_))
    ));
    assert!(matches!(
        compare_two_sorters(("a", &gt), ("b", &other_clock), &default_config()),
        Err(CompareError::IncompatibleSamplingContext { .. })
    ));
    assert!(matches!(
        compare_multiple_sorters(&[("only", &gt)], &default_config()),
        Err(CompareError::Configuration(_))
    ));
}
