//! Online scoring of single observations

mod config;
mod engine;

pub use config::ScoringConfig;
pub use engine::{LazyScorer, ModelContext, RiskAssessment, Scorer};
