use relation_discovery::{run, DiscoveryError, DiscoveryParams, RunConfig, SilentProgress};
use std::fs;
use std::sync::Arc;

/// Patterns 1-2 co-occur with entity pairs 1-2, patterns 3-4 with pairs 3-4.
const OCCURRENCES: &str = "1\t1:3\t2:3\n2\t1:1\t2:1\n3\t3:1\t4:1\n4\t3:2\t4:2\n5\n";
const LABELS: &str =
    "1\tX was born in Y\n2\tX, a native of Y\n3\tX works for Y\n4\tX, employee of Y\n";

fn write_inputs(dir: &tempfile::TempDir) -> RunConfig {
    let occurrences = dir.path().join("occurrences.tsv");
    let labels = dir.path().join("labels.tsv");
    fs::write(&occurrences, OCCURRENCES).unwrap();
    fs::write(&labels, LABELS).unwrap();

    RunConfig {
        occurrences_path: Some(occurrences),
        labels_path: Some(labels),
        num_entity_pairs: 5,
        num_patterns: 4,
        params: DiscoveryParams {
            rank: 2,
            num_clusters: 2,
            max_iterations: 20,
            num_closest_points_per_cluster: 2,
            seed: Some(5),
            ..DiscoveryParams::default()
        },
    }
}

#[test]
fn test_run_groups_patterns_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(&dir);

    let report = run(&config, Arc::new(SilentProgress)).unwrap();

    assert_eq!(report.accepted_rank, 2);
    assert_eq!(report.assignments.len(), 4);
    assert_eq!(report.assignments[0], report.assignments[1]);
    assert_eq!(report.assignments[2], report.assignments[3]);
    assert_ne!(report.assignments[0], report.assignments[2]);

    for cluster in &report.clusters {
        assert_eq!(cluster.closest.len(), 2);
        let mut labels: Vec<&str> = cluster.closest.iter().map(|p| p.label.as_str()).collect();
        labels.sort();
        let born = vec!["X was born in Y", "X, a native of Y"];
        let works = vec!["X works for Y", "X, employee of Y"];
        assert!(labels == born || labels == works, "unexpected cluster {labels:?}");
    }
}

#[test]
fn test_run_rejects_out_of_range_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(&dir);
    config.num_patterns = 3;

    let err = run(&config, Arc::new(SilentProgress)).unwrap_err();
    assert!(matches!(err, DiscoveryError::IndexOutOfBounds { what: "pattern", index: 4, .. }));
}

#[test]
fn test_run_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(&dir);
    config.occurrences_path = Some(dir.path().join("absent.tsv"));

    assert!(matches!(
        run(&config, Arc::new(SilentProgress)),
        Err(DiscoveryError::Io { .. })
    ));
}
