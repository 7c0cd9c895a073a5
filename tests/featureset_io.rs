use std::fs;
use std::io::Write;

use featureset_models::data_handling::rectangularize;
use featureset_models::io::featureset::read_featureset_csv;
use tempfile::tempdir;

fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = fs::File::create(&path).expect("failed to create csv");
    write!(file, "{}", contents).unwrap();
    path
}

#[test]
fn test_reads_features_target_and_metadata() {
    let dir = tempdir().expect("failed to create temp dir");
    let path = write_csv(
        &dir,
        "fs.csv",
        "name,target,amplitude,period,telescope\n\
         obj1,0,1.5,2.25,keck\n\
         obj2,1,0.75,13.0,palomar\n",
    );

    let featureset = read_featureset_csv(&path).expect("read failed");
    assert_eq!(featureset.sample_ids, ["obj1", "obj2"]);
    assert_eq!(featureset.feature_names, ["amplitude", "period"]);
    assert_eq!(featureset.target, [0.0, 1.0]);
    assert_eq!(
        featureset.metadata.get("telescope").map(Vec::as_slice),
        Some(&["keck".to_string(), "palomar".to_string()][..])
    );

    let (table, target) = rectangularize(&featureset).expect("rectangularize failed");
    assert_eq!(table.shape(), &[2, 2]);
    assert_eq!(table[[0, 0]], 1.5);
    assert_eq!(table[[1, 1]], 13.0);
    assert_eq!(target.len(), 2);
}

#[test]
fn test_missing_name_column_synthesizes_row_ids() {
    let dir = tempdir().expect("failed to create temp dir");
    let path = write_csv(&dir, "fs.csv", "target,f1\n0,1.0\n1,2.0\n");

    let featureset = read_featureset_csv(&path).expect("read failed");
    assert_eq!(featureset.sample_ids, ["row_1", "row_2"]);
}

#[test]
fn test_empty_feature_cells_become_nan() {
    let dir = tempdir().expect("failed to create temp dir");
    let path = write_csv(&dir, "fs.csv", "name,target,f1\na,0,\nb,1,2.5\n");

    let featureset = read_featureset_csv(&path).expect("read failed");
    assert!(featureset.columns[0][0].is_nan());
    assert_eq!(featureset.columns[0][1], 2.5);
}

#[test]
fn test_missing_target_column_is_an_error() {
    let dir = tempdir().expect("failed to create temp dir");
    let path = write_csv(&dir, "fs.csv", "name,f1\na,1.0\n");

    let err = read_featureset_csv(&path).expect_err("must fail without target");
    assert!(err.to_string().contains("target"));
}

#[test]
fn test_header_only_featureset_is_empty_but_valid() {
    let dir = tempdir().expect("failed to create temp dir");
    let path = write_csv(&dir, "fs.csv", "name,target,f1,f2\n");

    let featureset = read_featureset_csv(&path).expect("read failed");
    assert_eq!(featureset.n_samples(), 0);
    assert_eq!(featureset.n_features(), 2);

    let (table, target) = rectangularize(&featureset).expect("rectangularize failed");
    assert_eq!(table.shape(), &[0, 2]);
    assert!(target.is_empty());
}
