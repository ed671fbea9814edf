//! Data loading utilities
//!
//! Reads the raw machine CSV with polars and normalizes it into the
//! canonical schema: headers are renamed through the schema registry, the
//! label is cast to an integer 0/1 column and the canonical columns are laid
//! out in registry order.

use crate::error::{PredMaintError, Result};
use crate::schema::{
    self, ColumnType, MachineRecord, Observation, CANONICAL_COLUMNS, ID_COLUMN,
    PRODUCT_ID_COLUMN, TARGET_COLUMN, TYPE_COLUMN,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Data loader for the raw machine observations file
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Field delimiter
    delimiter: u8,
    /// Rows scanned for schema inference (`None` = whole file)
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            infer_schema_length: None,
        }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Limit schema inference to the first `rows` rows
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    /// Load a delimited file as-is, headers untouched
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| {
                PredMaintError::DataFormat(format!("failed to parse {}: {}", path.display(), e))
            })?;

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Read raw table");
        Ok(df)
    }

    /// Rename headers into the canonical schema, cast every canonical column
    /// to its declared type and order the canonical columns first. Columns
    /// outside the header mapping pass through after them.
    pub fn normalize(&self, mut df: DataFrame) -> Result<DataFrame> {
        let raw_names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        for raw in &raw_names {
            let canonical = schema::canonical_name(raw);
            if canonical != raw.as_str() {
                df.rename(raw, canonical.into())?;
            }
        }

        let present: HashSet<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        if !present.contains(TARGET_COLUMN) {
            return Err(PredMaintError::DataFormat(format!(
                "label column '{}' is absent",
                TARGET_COLUMN
            )));
        }

        for column in CANONICAL_COLUMNS {
            if !present.contains(column) {
                return Err(PredMaintError::DataFormat(format!(
                    "required column '{}' is absent",
                    column
                )));
            }
            cast_canonical(&mut df, column)?;
        }

        let labels = df.column(TARGET_COLUMN)?.i64()?;
        if let Some(bad) = labels.into_iter().flatten().find(|v| *v != 0 && *v != 1) {
            return Err(PredMaintError::DataFormat(format!(
                "label column '{}' must be 0/1, found {}",
                TARGET_COLUMN, bad
            )));
        }

        let mut order: Vec<String> = CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect();
        order.extend(
            raw_names
                .iter()
                .map(|raw| schema::canonical_name(raw).to_string())
                .filter(|name| !CANONICAL_COLUMNS.contains(&name.as_str())),
        );

        Ok(df.select(order)?)
    }

    /// Load the raw file and return it normalized to the canonical schema
    pub fn load_canonical(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let raw = self.load_csv(path)?;
        self.normalize(raw)
    }

    /// Load the raw file as typed canonical records
    pub fn load_records(&self, path: impl AsRef<Path>) -> Result<Vec<MachineRecord>> {
        let path = path.as_ref();
        let start = Instant::now();

        let df = self.load_canonical(path)?;
        let records = to_records(&df)?;

        info!(
            path = %path.display(),
            rows = records.len(),
            failures = records.iter().filter(|r| r.is_failure()).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(records)
    }
}

/// Cast one canonical column to its declared type. A null after the cast
/// means the source value was missing or not convertible.
fn cast_canonical(df: &mut DataFrame, column: &str) -> Result<()> {
    let target = match schema::column_type(column) {
        Some(ColumnType::Integer) | Some(ColumnType::Label) => DataType::Int64,
        Some(ColumnType::Float) => DataType::Float64,
        Some(ColumnType::Categorical) => DataType::String,
        None => return Ok(()),
    };

    let casted = df.column(column)?.cast(&target)?;
    if casted.null_count() > 0 {
        let what = if column == TARGET_COLUMN { "label column" } else { "column" };
        return Err(PredMaintError::DataFormat(format!(
            "{} '{}' has {} missing or non-numeric value(s)",
            what,
            column,
            casted.null_count()
        )));
    }
    if target == DataType::Float64 {
        let non_finite = casted.f64()?.into_iter().flatten().filter(|v| !v.is_finite()).count();
        if non_finite > 0 {
            return Err(PredMaintError::DataFormat(format!(
                "column '{}' has {} non-finite value(s)",
                column, non_finite
            )));
        }
    }

    df.with_column(casted)?;
    Ok(())
}

fn i64_values(df: &DataFrame, column: &str) -> Result<Vec<i64>> {
    df.column(column)?
        .i64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| missing_value(column)))
        .collect()
}

fn f64_values(df: &DataFrame, column: &str) -> Result<Vec<f64>> {
    df.column(column)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| missing_value(column)))
        .collect()
}

fn str_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    df.column(column)?
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string).ok_or_else(|| missing_value(column)))
        .collect()
}

fn missing_value(column: &str) -> PredMaintError {
    PredMaintError::DataFormat(format!("column '{}' has a missing value", column))
}

/// Convert a canonical frame into typed records
pub fn to_records(df: &DataFrame) -> Result<Vec<MachineRecord>> {
    let uid = i64_values(df, ID_COLUMN)?;
    let product_id = str_values(df, PRODUCT_ID_COLUMN)?;
    let machine_type = str_values(df, TYPE_COLUMN)?;
    let air = f64_values(df, "air_temperature_k")?;
    let process = f64_values(df, "process_temperature_k")?;
    let speed = i64_values(df, "rotational_speed_rpm")?;
    let torque = f64_values(df, "torque_nm")?;
    let wear = i64_values(df, "tool_wear_min")?;
    let label = i64_values(df, TARGET_COLUMN)?;

    let records = (0..df.height())
        .map(|i| MachineRecord {
            uid: uid[i],
            features: Observation {
                air_temperature_k: air[i],
                process_temperature_k: process[i],
                rotational_speed_rpm: speed[i],
                torque_nm: torque[i],
                tool_wear_min: wear[i],
                product_id: product_id[i].clone(),
                machine_type: machine_type[i].clone(),
            },
            machine_failure: label[i] as u8,
        })
        .collect();

    Ok(records)
}

/// Summary of a loaded dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub n_rows: usize,
    pub n_failures: usize,
    pub failure_rate: f64,
    pub n_product_ids: usize,
    /// Row count per machine type, sorted by type
    pub machine_types: BTreeMap<String, usize>,
}

impl DatasetInfo {
    pub fn from_records(records: &[MachineRecord]) -> Self {
        let n_rows = records.len();
        let n_failures = records.iter().filter(|r| r.is_failure()).count();

        let mut machine_types = BTreeMap::new();
        for record in records {
            *machine_types
                .entry(record.features.machine_type.clone())
                .or_insert(0) += 1;
        }

        let n_product_ids = records
            .iter()
            .map(|r| r.features.product_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        Self {
            n_rows,
            n_failures,
            failure_rate: if n_rows > 0 { n_failures as f64 / n_rows as f64 } else { 0.0 },
            n_product_ids,
            machine_types,
        }
    }
}
