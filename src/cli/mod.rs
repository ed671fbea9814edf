//! PredMaint CLI Module
//!
//! Command-line interface for training, scoring and data inspection.

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::AppConfig;
use crate::export::PREPROCESSOR_ARTIFACT;
use crate::inference::LazyScorer;
use crate::preprocessing::FeatureTransformer;
use crate::schema::Observation;
use crate::training::{ClassifierVariant, TrainedModel, TrainingPipeline};
use crate::utils::{DataLoader, DatasetInfo};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "predmaint")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Machine failure prediction: train classifiers and score machine readings")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Which trained model to score with
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelChoice {
    /// Logistic regression
    Baseline,
    /// Gradient boosted trees
    Primary,
}

impl From<ModelChoice> for ClassifierVariant {
    fn from(choice: ModelChoice) -> Self {
        match choice {
            ModelChoice::Baseline => ClassifierVariant::Baseline,
            ModelChoice::Primary => ClassifierVariant::Primary,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train both classifiers, persist the artifacts and print evaluation reports
    Train {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Raw AI4I CSV file
        #[arg(short, long, env = "PREDMAINT_DATA_PATH")]
        data: Option<PathBuf>,

        /// Directory for the artifacts
        #[arg(short, long, env = "PREDMAINT_MODELS_DIR")]
        models_dir: Option<PathBuf>,
    },

    /// Score a single machine reading
    Score {
        /// Air temperature [K]
        #[arg(long, default_value_t = 298.0)]
        air_temp: f64,

        /// Process temperature [K]
        #[arg(long, default_value_t = 310.0)]
        process_temp: f64,

        /// Rotational speed [rpm]
        #[arg(long, default_value_t = 1500)]
        rpm: i64,

        /// Torque [Nm]
        #[arg(long, default_value_t = 40.0)]
        torque: f64,

        /// Tool wear [min]
        #[arg(long, default_value_t = 120)]
        tool_wear: i64,

        /// Product ID
        #[arg(long, default_value = "M14860")]
        product_id: String,

        /// Machine type (L, M or H)
        #[arg(long = "type", default_value = "M")]
        machine_type: String,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding the artifacts
        #[arg(short, long, env = "PREDMAINT_MODELS_DIR")]
        models_dir: Option<PathBuf>,

        /// Probability at or above which the reading is flagged
        #[arg(long)]
        threshold: Option<f64>,

        /// Model to score with
        #[arg(long, value_enum)]
        model: Option<ModelChoice>,
    },

    /// Show a summary of a dataset
    Info {
        /// Raw AI4I CSV file
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    config_path: Option<&Path>,
    data: Option<PathBuf>,
    models_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = AppConfig::load(config_path)?;
    if let Some(data) = data {
        config.data_path = data;
    }
    if let Some(models_dir) = models_dir {
        config.models_dir = models_dir;
    }

    println!("  {:<12} {}", muted("Data"), config.data_path.display());
    println!("  {:<12} {}", muted("Models"), config.models_dir.display());

    let start = Instant::now();
    let pipeline = TrainingPipeline::new(config.clone());
    let outcome = {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        pipeline.run(&mut out)?
    };

    println!();
    if let Some(path) = &outcome.preprocessor_path {
        step_ok(&format!("Preprocessor → {}", path.display()));
    }
    for result in &outcome.results {
        step_ok(&format!(
            "{} → {} {}",
            result.variant.display_name(),
            result.artifact_path.display(),
            dim(&format!("({:.2}s)", result.training_secs))
        ));
    }
    for (variant, reason) in &outcome.failures {
        println!("  {} {} {}", "✗".red(), variant.display_name(), reason.red());
    }

    if outcome.report(ClassifierVariant::Primary).is_some() {
        print_importances(&config, 5)?;
    }

    println!();
    println!("  {:<16} {}", muted("Time"), format!("{:.3}s", start.elapsed().as_secs_f64()).white());
    println!();

    if !outcome.is_complete() {
        anyhow::bail!("{} of {} variants failed to train", outcome.failures.len(), config.training.variants.len());
    }
    Ok(())
}

fn print_importances(config: &AppConfig, top: usize) -> anyhow::Result<()> {
    let store = config.store();
    let transformer: FeatureTransformer = store.load(PREPROCESSOR_ARTIFACT)?;
    let model: TrainedModel = store.load(ClassifierVariant::Primary.artifact_name())?;
    let Some(importances) = model.as_primary().and_then(|m| m.feature_importances()) else {
        return Ok(());
    };

    let mut ranked: Vec<(String, f64)> = transformer
        .feature_names()
        .into_iter()
        .zip(importances.iter().copied())
        .filter(|(_, v)| *v > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    section("Top features (split share)");
    for (name, share) in ranked.into_iter().take(top) {
        println!("  {:<28} {}", name, format!("{:.4}", share).white());
    }
    Ok(())
}

pub fn cmd_score(
    observation: Observation,
    config_path: Option<&Path>,
    models_dir: Option<PathBuf>,
    threshold: Option<f64>,
    model: Option<ModelChoice>,
) -> anyhow::Result<()> {
    section("Score");

    let mut config = AppConfig::load(config_path)?;
    if let Some(models_dir) = models_dir {
        config.models_dir = models_dir;
    }
    if let Some(threshold) = threshold {
        config.scoring.decision_threshold = threshold;
    }
    if let Some(model) = model {
        config.scoring.variant = model.into();
    }
    let scorer = LazyScorer::new(config.store(), config.scoring)?;

    step_run("Loading model");
    let start = Instant::now();
    let assessment = match scorer.assess(&observation) {
        Ok(assessment) => assessment,
        Err(e) if e.is_not_ready() => {
            println!("{}", "missing".yellow());
            println!("  {}", "Model not ready: run `predmaint train` first".yellow());
            println!();
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    step_done(&format!("{:?}", start.elapsed()));

    let verdict = if assessment.at_risk {
        "AT RISK".red().bold()
    } else {
        "OK".green().bold()
    };

    println!();
    line_box_top();
    line_box(&kv("Model      ", config.scoring.variant.display_name()));
    line_box(&kv("Product    ", &observation.product_id));
    line_box(&kv("Type       ", &observation.machine_type));
    line_box(&kv("Probability", &format!("{:.4}", assessment.probability)));
    line_box(&kv("Threshold  ", &format!("{:.2}", assessment.threshold)));
    line_box(&format!("{} {}", muted("Status     "), verdict));
    line_box_bottom();
    println!();

    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let loader = DataLoader::new();
    let df = loader.load_canonical(data_path)?;
    let records = crate::utils::to_records(&df)?;
    let info = DatasetInfo::from_records(&records);

    println!("  {:<14} {}", muted("File"), data_path.display());
    println!("  {:<14} {}", muted("Rows"), info.n_rows);
    println!("  {:<14} {}", muted("Failures"), info.n_failures);
    println!("  {:<14} {:.2}%", muted("Failure rate"), info.failure_rate * 100.0);
    println!("  {:<14} {}", muted("Product IDs"), info.n_product_ids);
    println!();

    println!("  {:<20} {:<12} {:>6}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(40)));
    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count()
        );
    }

    println!();
    println!("  {:<20} {:>8}", muted("Machine type"), muted("Rows"));
    println!("  {}", dim(&"─".repeat(30)));
    for (machine_type, count) in &info.machine_types {
        println!("  {:<20} {:>8}", machine_type, count);
    }

    println!();
    Ok(())
}
