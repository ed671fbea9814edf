//! Integration test: Full pipeline (load → split → transform → train → persist → evaluate)

mod common;

use predmaint::config::AppConfig;
use predmaint::evaluation::evaluate;
use predmaint::inference::ModelContext;
use predmaint::export::{
    ArtifactKind, ArtifactStore, BASELINE_ARTIFACT, PREPROCESSOR_ARTIFACT, PRIMARY_ARTIFACT,
};
use predmaint::preprocessing::FeatureTransformer;
use predmaint::training::{
    labels_from_records, ClassifierVariant, SplitConfig, StratifiedSplitter, TrainedModel,
    TrainingConfig, TrainingPipeline, XGBoostConfig,
};
use std::path::Path;

fn config(dir: &Path, n_rows: usize, n_failures: usize) -> AppConfig {
    let data = dir.join("ai4i.csv");
    common::write_ai4i_csv(&data, n_rows, n_failures, 9);
    AppConfig::default()
        .with_data_path(&data)
        .with_models_dir(dir.join("models"))
        .with_training(
            TrainingConfig::default().with_primary(XGBoostConfig::default().with_n_estimators(40)),
        )
}

#[test]
fn test_pipeline_writes_artifacts_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 1000, 100);
    let mut out = Vec::new();

    let outcome = TrainingPipeline::new(config.clone()).run(&mut out).unwrap();
    let report = String::from_utf8(out).unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.n_train, 800);
    assert_eq!(outcome.n_test, 200);
    assert_eq!(outcome.results.len(), 2);

    let store = config.store();
    for name in [PREPROCESSOR_ARTIFACT, BASELINE_ARTIFACT, PRIMARY_ARTIFACT] {
        assert!(store.exists(name), "{} missing", name);
    }
    assert_eq!(outcome.preprocessor_path, Some(store.path_for(PREPROCESSOR_ARTIFACT)));

    assert!(report.contains("=== Logistic Regression ==="));
    assert!(report.contains("=== XGBoost ==="));
    assert_eq!(report.matches("Accuracy : ").count(), 2);
    assert_eq!(report.matches("ROC-AUC  : ").count(), 2);
    assert!(report.contains("precision"));
    assert!(report.contains("weighted avg"));
}

#[test]
fn test_persisted_models_reproduce_reported_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 600, 30);
    let outcome = TrainingPipeline::new(config.clone())
        .run(&mut std::io::sink())
        .unwrap();

    // Rebuild the held-out set the same way the pipeline did
    let records = predmaint::utils::DataLoader::new()
        .load_records(&config.data_path)
        .unwrap();
    let (_, test) = StratifiedSplitter::new(SplitConfig::default())
        .split_records(&records)
        .unwrap();

    let store = config.store();
    let transformer: FeatureTransformer = store.load(PREPROCESSOR_ARTIFACT).unwrap();
    let x_test = transformer.transform_records(&test).unwrap();
    let y_test = labels_from_records(&test);

    for variant in ClassifierVariant::ALL {
        let model: TrainedModel = store.load(variant.artifact_name()).unwrap();
        let report = evaluate(&model, &x_test, &y_test).unwrap();
        assert_eq!(Some(&report), outcome.report(variant));
    }
}

#[test]
fn test_artifact_metadata_records_kind() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 300, 15);
    TrainingPipeline::new(config.clone())
        .run(&mut std::io::sink())
        .unwrap();

    let store = ArtifactStore::new(&config.models_dir);
    let meta = store.metadata(PREPROCESSOR_ARTIFACT, ArtifactKind::Transformer).unwrap();
    assert_eq!(meta.name, PREPROCESSOR_ARTIFACT);
    assert_eq!(meta.crate_version, env!("CARGO_PKG_VERSION"));

    let meta = store.metadata(PRIMARY_ARTIFACT, ArtifactKind::Model).unwrap();
    assert_eq!(meta.kind, ArtifactKind::Model);
    assert!(store.metadata(PRIMARY_ARTIFACT, ArtifactKind::Transformer).is_err());
}

#[test]
fn test_training_failure_does_not_block_other_variant() {
    // No failures at all: both variants hit the single-class check
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 200, 0);
    let mut out = Vec::new();

    let outcome = TrainingPipeline::new(config.clone()).run(&mut out).unwrap();
    let report = String::from_utf8(out).unwrap();

    assert!(!outcome.is_complete());
    assert!(outcome.results.is_empty());
    let failed: Vec<ClassifierVariant> = outcome.failures.iter().map(|(v, _)| *v).collect();
    assert_eq!(failed, vec![ClassifierVariant::Baseline, ClassifierVariant::Primary]);
    assert_eq!(report.matches("Training failed").count(), 2);
    assert!(outcome.preprocessor_path.is_none());
    assert!(!config.store().exists(PREPROCESSOR_ARTIFACT));
    assert!(!config.store().exists(PRIMARY_ARTIFACT));
}

#[test]
fn test_failed_retrain_removes_stale_models() {
    let dir = tempfile::tempdir().unwrap();
    let first = config(dir.path(), 300, 15);
    TrainingPipeline::new(first.clone())
        .run(&mut std::io::sink())
        .unwrap();
    let store = first.store();
    let fitted: FeatureTransformer = store.load(PREPROCESSOR_ARTIFACT).unwrap();

    // Same models dir, data without failures: both variants fail
    let second = config(dir.path(), 300, 0);
    let outcome = TrainingPipeline::new(second)
        .run(&mut std::io::sink())
        .unwrap();
    assert!(outcome.results.is_empty());
    assert!(outcome.preprocessor_path.is_none());

    for variant in ClassifierVariant::ALL {
        assert!(!store.exists(variant.artifact_name()), "{} left behind", variant);
        let err = ModelContext::load_variant(&store, variant).unwrap_err();
        assert!(err.is_not_ready(), "got {:?}", err);
    }
    let kept: FeatureTransformer = store.load(PREPROCESSOR_ARTIFACT).unwrap();
    assert_eq!(kept, fitted);
}

#[test]
fn test_partial_retrain_keeps_models_on_one_transformer() {
    let dir = tempfile::tempdir().unwrap();
    let both = config(dir.path(), 300, 15);
    TrainingPipeline::new(both.clone())
        .run(&mut std::io::sink())
        .unwrap();
    let store = both.store();
    assert!(store.exists(PRIMARY_ARTIFACT));

    let mut baseline_only = config(dir.path(), 400, 20);
    baseline_only.training = baseline_only
        .training
        .clone()
        .with_variants(vec![ClassifierVariant::Baseline]);
    TrainingPipeline::new(baseline_only)
        .run(&mut std::io::sink())
        .unwrap();

    assert!(store.exists(BASELINE_ARTIFACT));
    assert!(!store.exists(PRIMARY_ARTIFACT));
    assert!(ModelContext::load_variant(&store, ClassifierVariant::Baseline).is_ok());
    assert!(ModelContext::load(&store).unwrap_err().is_not_ready());
}

#[test]
fn test_single_variant_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), 300, 15);
    config.training = config
        .training
        .clone()
        .with_variants(vec![ClassifierVariant::Baseline]);

    let outcome = TrainingPipeline::new(config.clone())
        .run(&mut std::io::sink())
        .unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert!(config.store().exists(BASELINE_ARTIFACT));
    assert!(!config.store().exists(PRIMARY_ARTIFACT));
}

#[test]
fn test_missing_data_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::default()
        .with_data_path(dir.path().join("absent.csv"))
        .with_models_dir(dir.path().join("models"));
    assert!(TrainingPipeline::new(config).run(&mut std::io::sink()).is_err());
}
