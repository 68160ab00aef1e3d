//! Feature preprocessing: imputation, scaling, encoding and the pipeline
//! that composes them into a dense feature matrix.

pub mod encoder;
pub mod imputer;
pub mod pipeline;
pub mod scaler;

pub use encoder::OneHotEncoder;
pub use imputer::{ImputeStrategy, Imputer};
pub use pipeline::FeaturePipeline;
pub use scaler::StandardScaler;
