/// Prelude module for configuration and data handling.
pub mod dataset_prelude;
/// Prelude module for the network, its training and evaluation.
pub mod neural_network_prelude;

pub use crate::error::{IoError, ModelError, PipelineError};
pub use dataset_prelude::*;
pub use neural_network_prelude::*;
