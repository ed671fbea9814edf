//! Scoring engine
//!
//! - `ModelContext`: the fitted transformer and one model, loaded once and
//!   shared read-only behind an `Arc`
//! - `Scorer`: scores single observations against a context
//! - `LazyScorer`: builds the context on first use, at most once

use super::ScoringConfig;
use crate::error::{PredMaintError, Result};
use crate::export::{ArtifactStore, PREPROCESSOR_ARTIFACT};
use crate::preprocessing::FeatureTransformer;
use crate::schema::{Observation, NUMERIC_COLUMNS};
use crate::training::{Classifier, ClassifierVariant, TrainedModel};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info};

/// Fitted artifacts needed to score, immutable after construction
#[derive(Debug, Clone)]
pub struct ModelContext {
    transformer: FeatureTransformer,
    model: TrainedModel,
}

impl ModelContext {
    /// Pair a transformer with a model fitted on its output
    pub fn new(transformer: FeatureTransformer, model: TrainedModel) -> Result<Self> {
        if model.n_features() != transformer.n_features() {
            return Err(PredMaintError::ShapeError {
                expected: format!("model over {} features", transformer.n_features()),
                actual: format!("model over {} features", model.n_features()),
            });
        }
        Ok(Self { transformer, model })
    }

    /// Load the transformer and the primary model
    pub fn load(store: &ArtifactStore) -> Result<Self> {
        Self::load_variant(store, ClassifierVariant::Primary)
    }

    pub fn load_variant(store: &ArtifactStore, variant: ClassifierVariant) -> Result<Self> {
        let start = Instant::now();
        let transformer: FeatureTransformer = store.load(PREPROCESSOR_ARTIFACT)?;
        let model: TrainedModel = store.load(variant.artifact_name())?;

        if model.variant() != variant {
            return Err(PredMaintError::ArtifactCorrupt {
                name: variant.artifact_name().to_string(),
                reason: format!("holds a {} model", model.variant()),
            });
        }

        let context = Self::new(transformer, model)?;
        info!(
            variant = %variant,
            n_features = context.transformer.n_features(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model context loaded"
        );
        Ok(context)
    }

    pub fn transformer(&self) -> &FeatureTransformer {
        &self.transformer
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }
}

/// Probability plus the derived risk flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub probability: f64,
    pub at_risk: bool,
    pub threshold: f64,
}

/// Scores observations against a loaded context
#[derive(Debug, Clone)]
pub struct Scorer {
    context: Arc<ModelContext>,
    config: ScoringConfig,
}

impl Scorer {
    /// Fails with `InvalidParameter` when `config` has an out-of-range threshold
    pub fn new(context: Arc<ModelContext>, config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { context, config })
    }

    pub fn context(&self) -> &Arc<ModelContext> {
        &self.context
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    fn check(observation: &Observation) -> Result<()> {
        for (column, value) in NUMERIC_COLUMNS.iter().zip(observation.numeric_values()) {
            if !value.is_finite() {
                return Err(PredMaintError::InvalidInput(format!(
                    "{} must be finite, got {}",
                    column, value
                )));
            }
        }
        Ok(())
    }

    /// Failure probability in [0, 1]
    pub fn score(&self, observation: &Observation) -> Result<f64> {
        Self::check(observation)?;
        let x = self.context.transformer.transform_one(observation)?;
        let proba = self.context.model.predict_proba(&x)?;
        let probability = proba
            .first()
            .copied()
            .ok_or_else(|| PredMaintError::InvalidInput("model returned no score".to_string()))?;
        debug!(product_id = %observation.product_id, probability, "Scored observation");
        Ok(probability)
    }

    pub fn assess(&self, observation: &Observation) -> Result<RiskAssessment> {
        let probability = self.score(observation)?;
        Ok(RiskAssessment {
            probability,
            at_risk: probability >= self.config.decision_threshold,
            threshold: self.config.decision_threshold,
        })
    }

    /// Score many observations in one transform
    pub fn score_batch(&self, observations: &[Observation]) -> Result<Vec<f64>> {
        for observation in observations {
            Self::check(observation)?;
        }
        let x = self.context.transformer.transform(observations)?;
        Ok(self.context.model.predict_proba(&x)?.to_vec())
    }
}

/// Scorer whose context is loaded from the artifact store on first use.
///
/// Concurrent first calls load the artifacts once; the others wait on the
/// guard and then read the same context. A failed load is not remembered,
/// so a call after training completes succeeds.
#[derive(Debug)]
pub struct LazyScorer {
    store: ArtifactStore,
    config: ScoringConfig,
    context: OnceLock<Arc<ModelContext>>,
    init_guard: Mutex<()>,
    loads: AtomicUsize,
}

impl LazyScorer {
    pub fn new(store: ArtifactStore, config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            context: OnceLock::new(),
            init_guard: Mutex::new(()),
            loads: AtomicUsize::new(0),
        })
    }

    /// The loaded context, loading it if needed
    pub fn context(&self) -> Result<Arc<ModelContext>> {
        if let Some(context) = self.context.get() {
            return Ok(Arc::clone(context));
        }

        let _guard = self.init_guard.lock();
        if let Some(context) = self.context.get() {
            return Ok(Arc::clone(context));
        }

        let context = Arc::new(ModelContext::load_variant(&self.store, self.config.variant)?);
        self.loads.fetch_add(1, Ordering::SeqCst);
        let context = Arc::clone(self.context.get_or_init(|| context));
        info!(models_dir = %self.store.root().display(), "Scorer warmed up");
        Ok(context)
    }

    pub fn scorer(&self) -> Result<Scorer> {
        Ok(Scorer {
            context: self.context()?,
            config: self.config,
        })
    }

    pub fn score(&self, observation: &Observation) -> Result<f64> {
        self.scorer()?.score(observation)
    }

    pub fn assess(&self, observation: &Observation) -> Result<RiskAssessment> {
        self.scorer()?.assess(observation)
    }

    pub fn is_loaded(&self) -> bool {
        self.context.get().is_some()
    }

    /// Number of successful artifact loads so far (0 or 1)
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}
