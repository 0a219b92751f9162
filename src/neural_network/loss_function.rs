/// Categorical Cross Entropy over per-timestep softmax outputs
pub mod categorical_cross_entropy;
/// Mean-squared L2 penalty averaged over parameter tensors
pub mod l2_regularizer;

pub use categorical_cross_entropy::*;
pub use l2_regularizer::*;

use super::*;
use crate::math::{ensure_finite, guarded_ln};
use ndarray::ArrayViewD;
use std::fmt;

/// The three scalars reported for every evaluated batch.
///
/// # Fields
///
/// - `cost` - `loss + gamma * regularizer`, the value the optimizer minimizes
/// - `loss` - Cross-entropy averaged over batch and timesteps
/// - `regularizer` - Mean-squared parameter penalty
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cost {
    pub cost: f32,
    pub loss: f32,
    pub regularizer: f32,
}

impl Cost {
    /// Combines a loss and a regularizer with weight `gamma`.
    ///
    /// # Errors
    ///
    /// - `ModelError::NumericalError` - If the combined cost is NaN or infinite
    pub fn combine(loss: f32, regularizer: f32, gamma: f32) -> Result<Self, ModelError> {
        let cost = ensure_finite(loss + gamma * regularizer, "cost")?;
        Ok(Self {
            cost,
            loss,
            regularizer,
        })
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cost {:.5}, loss {:.5}, parameter regularizer {:.5}",
            self.cost, self.loss, self.regularizer
        )
    }
}
