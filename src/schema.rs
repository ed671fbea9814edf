//! Schema registry
//!
//! Static declarations of the canonical column names, their types and the
//! target label. Every other module reads column names from here.

use serde::{Deserialize, Serialize};

/// Integer row identifier (training data only)
pub const ID_COLUMN: &str = "uid";

/// Binary failure label (training data only)
pub const TARGET_COLUMN: &str = "machine_failure";

pub const PRODUCT_ID_COLUMN: &str = "product_id";
pub const TYPE_COLUMN: &str = "type";

/// Numeric sensor columns, in transformer output order
pub const NUMERIC_COLUMNS: [&str; 5] = [
    "air_temperature_k",
    "process_temperature_k",
    "rotational_speed_rpm",
    "torque_nm",
    "tool_wear_min",
];

/// Categorical columns, in transformer output order
pub const CATEGORICAL_COLUMNS: [&str; 2] = [PRODUCT_ID_COLUMN, TYPE_COLUMN];

/// Feature columns as fed to the transformer: numerics first, then categoricals
pub const FEATURE_COLUMNS: [&str; 7] = [
    "air_temperature_k",
    "process_temperature_k",
    "rotational_speed_rpm",
    "torque_nm",
    "tool_wear_min",
    PRODUCT_ID_COLUMN,
    TYPE_COLUMN,
];

/// Full canonical record layout
pub const CANONICAL_COLUMNS: [&str; 9] = [
    ID_COLUMN,
    PRODUCT_ID_COLUMN,
    TYPE_COLUMN,
    "air_temperature_k",
    "process_temperature_k",
    "rotational_speed_rpm",
    "torque_nm",
    "tool_wear_min",
    TARGET_COLUMN,
];

/// Raw AI4I 2020 headers and their canonical names
pub const HEADER_MAPPING: [(&str, &str); 9] = [
    ("UDI", ID_COLUMN),
    ("Product ID", PRODUCT_ID_COLUMN),
    ("Type", TYPE_COLUMN),
    ("Air temperature [K]", "air_temperature_k"),
    ("Process temperature [K]", "process_temperature_k"),
    ("Rotational speed [rpm]", "rotational_speed_rpm"),
    ("Torque [Nm]", "torque_nm"),
    ("Tool wear [min]", "tool_wear_min"),
    ("Machine failure", TARGET_COLUMN),
];

/// Column data type in the canonical schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Float,
    Categorical,
    Label,
}

/// Declared type of a canonical column, `None` for columns outside the schema
pub fn column_type(name: &str) -> Option<ColumnType> {
    match name {
        ID_COLUMN | "rotational_speed_rpm" | "tool_wear_min" => Some(ColumnType::Integer),
        "air_temperature_k" | "process_temperature_k" | "torque_nm" => Some(ColumnType::Float),
        PRODUCT_ID_COLUMN | TYPE_COLUMN => Some(ColumnType::Categorical),
        TARGET_COLUMN => Some(ColumnType::Label),
        _ => None,
    }
}

/// Translate a raw header into its canonical name. Headers outside the
/// mapping pass through unchanged.
pub fn canonical_name(raw: &str) -> &str {
    HEADER_MAPPING
        .iter()
        .find(|(source, _)| *source == raw)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(raw)
}

/// The feature fields of one machine observation.
///
/// This is the scoring input: the identifier and label are never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub air_temperature_k: f64,
    pub process_temperature_k: f64,
    pub rotational_speed_rpm: i64,
    pub torque_nm: f64,
    pub tool_wear_min: i64,
    pub product_id: String,
    #[serde(rename = "type")]
    pub machine_type: String,
}

impl Observation {
    /// Value of a numeric feature column by canonical name
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            "air_temperature_k" => Some(self.air_temperature_k),
            "process_temperature_k" => Some(self.process_temperature_k),
            "rotational_speed_rpm" => Some(self.rotational_speed_rpm as f64),
            "torque_nm" => Some(self.torque_nm),
            "tool_wear_min" => Some(self.tool_wear_min as f64),
            _ => None,
        }
    }

    /// Value of a categorical feature column by canonical name
    pub fn categorical(&self, column: &str) -> Option<&str> {
        match column {
            PRODUCT_ID_COLUMN => Some(self.product_id.as_str()),
            TYPE_COLUMN => Some(self.machine_type.as_str()),
            _ => None,
        }
    }

    /// Numeric features in registry order
    pub fn numeric_values(&self) -> [f64; 5] {
        [
            self.air_temperature_k,
            self.process_temperature_k,
            self.rotational_speed_rpm as f64,
            self.torque_nm,
            self.tool_wear_min as f64,
        ]
    }
}

/// One canonical training row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub uid: i64,
    pub features: Observation,
    pub machine_failure: u8,
}

impl MachineRecord {
    pub fn is_failure(&self) -> bool {
        self.machine_failure == 1
    }
}
