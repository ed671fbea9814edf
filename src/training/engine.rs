//! Training engine
//!
//! `Trainer` fits one classifier variant on a transformed matrix.
//! `TrainingPipeline` runs the whole offline flow: load, split, fit the
//! transformer on the training rows, train and persist both variants, and
//! write an evaluation report for each.

use super::config::TrainingConfig;
use super::linear_models::LogisticRegression;
use super::models::{ClassifierVariant, TrainedModel};
use super::split::StratifiedSplitter;
use super::xgboost::XGBoostClassifier;
use crate::config::AppConfig;
use crate::error::{PredMaintError, Result};
use crate::evaluation::{evaluate, write_summary, ClassificationReport};
use crate::export::PREPROCESSOR_ARTIFACT;
use crate::preprocessing::{FeatureMatrix, FeatureTransformerBuilder};
use crate::schema::MachineRecord;
use crate::utils::{DataLoader, Timer};
use ndarray::Array1;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Label vector (0.0 / 1.0) of canonical records
pub fn labels_from_records(records: &[MachineRecord]) -> Array1<f64> {
    records.iter().map(|r| f64::from(r.machine_failure)).collect()
}

/// Fits classifier variants
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Checks shared by both variants
    fn validate_inputs(x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(PredMaintError::Training(format!(
                "feature matrix has {} rows but label vector has {}",
                x.nrows(),
                y.len()
            )));
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(PredMaintError::Training(format!("label {} is not 0 or 1", bad)));
        }
        let positives = y.iter().filter(|&&v| v == 1.0).count();
        if positives == 0 || positives == y.len() {
            return Err(PredMaintError::Training(format!(
                "labels hold a single class ({} rows); at least two classes are required",
                y.len()
            )));
        }
        Ok(())
    }

    /// Fit one variant on 0/1 labels
    pub fn train(&self, variant: ClassifierVariant, x: &FeatureMatrix, y: &Array1<f64>) -> Result<TrainedModel> {
        Self::validate_inputs(x, y)?;
        let timer = Timer::start();
        info!(
            variant = %variant,
            n_rows = x.nrows(),
            n_features = x.ncols(),
            "Training started"
        );

        let model = match variant {
            ClassifierVariant::Baseline => {
                let mut model = LogisticRegression::new(self.config.baseline.clone());
                model.fit(x, y)?;
                info!(
                    n_iter = model.n_iter(),
                    class_weights = ?model.class_weights(),
                    "Baseline fitted"
                );
                TrainedModel::Baseline(model)
            }
            ClassifierVariant::Primary => {
                let mut model = XGBoostClassifier::new(self.config.primary.clone());
                model.fit(x, y)?;
                info!(
                    n_trees = model.n_trees(),
                    scale_pos_weight = model.scale_pos_weight(),
                    "Primary fitted"
                );
                TrainedModel::Primary(model)
            }
        };

        info!(variant = %variant, elapsed_secs = timer.elapsed_secs(), "Training finished");
        Ok(model)
    }
}

/// Result of one trained variant
#[derive(Debug, Clone)]
pub struct VariantOutcome {
    pub variant: ClassifierVariant,
    pub artifact_path: PathBuf,
    pub report: ClassificationReport,
    pub training_secs: f64,
}

/// Summary of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    /// `None` when no variant trained and the transformer was not saved
    pub preprocessor_path: Option<PathBuf>,
    pub results: Vec<VariantOutcome>,
    /// Variants whose training failed, with the reason
    pub failures: Vec<(ClassifierVariant, String)>,
}

impl PipelineOutcome {
    pub fn report(&self, variant: ClassifierVariant) -> Option<&ClassificationReport> {
        self.results.iter().find(|r| r.variant == variant).map(|r| &r.report)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// End-to-end offline training
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: AppConfig,
}

impl TrainingPipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the pipeline, writing evaluation reports to `out`.
    ///
    /// The transformer and the models are persisted only after training, so
    /// every model on disk was fitted on the transformer saved next to it.
    /// A variant that fails to train, or that this run does not train, has
    /// its previous artifact removed.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<PipelineOutcome> {
        let config = &self.config;
        config.validate()?;
        let timer = Timer::start();

        fs::create_dir_all(&config.models_dir)?;
        let store = config.store();

        let records = DataLoader::new().load_records(&config.data_path)?;
        let (train, test) = StratifiedSplitter::new(config.training.split.clone()).split_records(&records)?;

        let transformer = FeatureTransformerBuilder::new(config.preprocessing.clone())
            .build()?
            .fit_records(&train)?;
        let x_train = transformer.transform_records(&train)?;
        let x_test = transformer.transform_records(&test)?;
        let y_train = labels_from_records(&train);
        let y_test = labels_from_records(&test);

        writeln!(
            out,
            "Training rows: {}  Test rows: {}  Features: {}",
            train.len(),
            test.len(),
            transformer.n_features()
        )?;

        let trainer = Trainer::new(config.training.clone());
        let mut trained = Vec::new();
        let mut failures = Vec::new();

        for &variant in &config.training.variants {
            let variant_timer = Timer::start();
            match trainer.train(variant, &x_train, &y_train) {
                Ok(model) => trained.push((variant, model, variant_timer.elapsed_secs())),
                Err(PredMaintError::Training(reason)) => {
                    warn!(variant = %variant, reason = %reason, "Training failed, continuing with remaining variants");
                    writeln!(out, "\n=== {} ===\nTraining failed: {}", variant.display_name(), reason)?;
                    failures.push((variant, reason));
                }
                Err(e) => return Err(e),
            }
        }

        let preprocessor_path = if trained.is_empty() {
            None
        } else {
            Some(store.save(PREPROCESSOR_ARTIFACT, &transformer)?)
        };

        let mut results = Vec::with_capacity(trained.len());
        for (variant, model, training_secs) in trained {
            let artifact_path = store.save(variant.artifact_name(), &model)?;
            let report = evaluate(&model, &x_test, &y_test)?;
            write_summary(out, variant.display_name(), &report)?;

            results.push(VariantOutcome {
                variant,
                artifact_path,
                report,
                training_secs,
            });
        }

        // Anything not written by this run no longer matches the transformer
        for variant in ClassifierVariant::ALL {
            let failed = failures.iter().any(|(v, _)| *v == variant);
            let current = results.iter().any(|r| r.variant == variant);
            if (failed || preprocessor_path.is_some()) && !current && store.remove(variant.artifact_name())? {
                warn!(variant = %variant, "Removed stale model artifact");
            }
        }

        info!(
            trained = results.len(),
            failed = failures.len(),
            elapsed_secs = timer.elapsed_secs(),
            "Pipeline finished"
        );

        Ok(PipelineOutcome {
            n_train: train.len(),
            n_test: test.len(),
            n_features: transformer.n_features(),
            preprocessor_path,
            results,
            failures,
        })
    }
}
