//! Integration test: Data loading and stratified splitting

mod common;

use predmaint::error::PredMaintError;
use predmaint::schema::CANONICAL_COLUMNS;
use predmaint::training::{SplitConfig, StratifiedSplitter};
use predmaint::utils::{DataLoader, DatasetInfo};

#[test]
fn test_loader_output_matches_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ai4i.csv");
    common::write_ai4i_csv(&path, 120, 6, 1);

    let df = DataLoader::new().load_canonical(&path).unwrap();
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, CANONICAL_COLUMNS.to_vec());
    assert_eq!(df.height(), 120);
}

#[test]
fn test_load_records_matches_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ai4i.csv");
    let written = common::write_ai4i_csv(&path, 200, 10, 2);

    let records = DataLoader::new().load_records(&path).unwrap();
    assert_eq!(records, written);

    let info = DatasetInfo::from_records(&records);
    assert_eq!(info.n_rows, 200);
    assert_eq!(info.n_failures, 10);
    assert!((info.failure_rate - 0.05).abs() < 1e-12);
    assert_eq!(info.n_product_ids, 200);
    assert_eq!(info.machine_types.values().sum::<usize>(), 200);
}

#[test]
fn test_unmapped_columns_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ai4i.csv");
    let csv = "UDI,Product ID,Type,Air temperature [K],Process temperature [K],\
Rotational speed [rpm],Torque [Nm],Tool wear [min],Machine failure,TWF\n\
1,M14860,M,298.1,308.6,1551,42.8,0,0,0\n\
2,L47181,L,298.2,308.7,1408,46.3,3,1,1\n";
    std::fs::write(&path, csv).unwrap();

    let df = DataLoader::new().load_canonical(&path).unwrap();
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(&names[..9], &CANONICAL_COLUMNS.map(String::from)[..]);
    assert_eq!(names[9], "TWF");
}

#[test]
fn test_missing_label_is_data_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nolabel.csv");
    let csv = "UDI,Product ID,Type,Air temperature [K],Process temperature [K],\
Rotational speed [rpm],Torque [Nm],Tool wear [min]\n\
1,M14860,M,298.1,308.6,1551,42.8,0\n";
    std::fs::write(&path, csv).unwrap();

    let err = DataLoader::new().load_records(&path).unwrap_err();
    assert!(matches!(err, PredMaintError::DataFormat(_)), "got {:?}", err);
}

#[test]
fn test_non_numeric_label_is_data_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("badlabel.csv");
    let csv = format!(
        "{}\n1,M14860,M,298.1,308.6,1551,42.8,0,no\n2,L47181,L,298.2,308.7,1408,46.3,3,yes\n",
        common::RAW_HEADER
    );
    std::fs::write(&path, csv).unwrap();

    let err = DataLoader::new().load_records(&path).unwrap_err();
    assert!(matches!(err, PredMaintError::DataFormat(_)), "got {:?}", err);
}

#[test]
fn test_out_of_range_label_is_data_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("label2.csv");
    let csv = format!(
        "{}\n1,M14860,M,298.1,308.6,1551,42.8,0,2\n",
        common::RAW_HEADER
    );
    std::fs::write(&path, csv).unwrap();

    let err = DataLoader::new().load_records(&path).unwrap_err();
    assert!(matches!(err, PredMaintError::DataFormat(_)), "got {:?}", err);
}

#[test]
fn test_nan_measurement_is_data_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nan.csv");
    let csv = format!(
        "{}\n1,M14860,M,298.1,308.6,1551,42.8,0,0\n2,L47181,L,NaN,308.7,1408,46.3,3,1\n",
        common::RAW_HEADER
    );
    std::fs::write(&path, csv).unwrap();

    let err = DataLoader::new().load_records(&path).unwrap_err();
    assert!(matches!(err, PredMaintError::DataFormat(_)), "got {:?}", err);
    assert!(err.to_string().contains("air_temperature_k"), "got {}", err);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = DataLoader::new()
        .load_records("/nonexistent/ai4i2020.csv")
        .unwrap_err();
    assert!(matches!(err, PredMaintError::Io(_)), "got {:?}", err);
}

#[test]
fn test_split_stratification_1000_rows() {
    let records = common::synthetic_records(1000, 100, 3);
    let splitter = StratifiedSplitter::new(SplitConfig::default().with_test_size(0.2));
    let (train, test) = splitter.split_records(&records).unwrap();

    let test_pos = test.iter().filter(|r| r.is_failure()).count();
    let train_pos = train.iter().filter(|r| r.is_failure()).count();
    assert_eq!(test_pos, 20);
    assert_eq!(train_pos, 80);
    assert_eq!(test.len(), 200);
    assert_eq!(train.len(), 800);
}

#[test]
fn test_split_deterministic_and_disjoint() {
    let records = common::synthetic_records(600, 30, 4);
    let splitter = StratifiedSplitter::new(SplitConfig::default().with_random_state(7));

    let (train_a, test_a) = splitter.split_records(&records).unwrap();
    let (train_b, test_b) = splitter.split_records(&records).unwrap();
    assert_eq!(train_a, train_b);
    assert_eq!(test_a, test_b);

    let mut uids: Vec<i64> = train_a.iter().chain(&test_a).map(|r| r.uid).collect();
    uids.sort_unstable();
    uids.dedup();
    assert_eq!(uids.len(), records.len());
}

#[test]
fn test_split_seed_changes_partition() {
    let records = common::synthetic_records(600, 30, 4);
    let (_, test_a) = StratifiedSplitter::new(SplitConfig::default().with_random_state(1))
        .split_records(&records)
        .unwrap();
    let (_, test_b) = StratifiedSplitter::new(SplitConfig::default().with_random_state(2))
        .split_records(&records)
        .unwrap();
    assert_ne!(test_a, test_b);
}
