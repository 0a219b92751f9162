/// Adam optimizer with per-parameter moment estimates
pub mod adam;
/// Input validation functions for optimizers
mod input_validation_function;

pub use adam::*;

use super::*;
use ahash::AHashMap;
use input_validation_function::*;
