//! Feature preprocessing
//!
//! - Standard scaling of the numeric sensor columns
//! - One-hot encoding of `product_id` and `type`
//! - Sparse row-major output for the training and scoring engines

mod config;
mod encoder;
mod matrix;
mod pipeline;
mod scaler;

pub use config::PreprocessingConfig;
pub use encoder::OneHotEncoder;
pub use matrix::{FeatureMatrix, RowView};
pub use pipeline::{FeatureTransformer, FeatureTransformerBuilder, UnfitTransformer};
pub use scaler::{ScalerParams, StandardScaler};
