use super::*;

/// Categorical Cross Entropy averaged over samples and timesteps.
///
/// `loss = -sum(ln(max(p, EPSILON)) * y) / (batch * steps)` for probabilities `p`
/// of shape (batch, steps, classes) and one-hot targets `y` of the same shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoricalCrossEntropy;

impl CategoricalCrossEntropy {
    /// Creates a new instance of CategoricalCrossEntropy
    pub fn new() -> Self {
        Self
    }

    /// Sum of `-ln(p) * y` over every entry, without the mean.
    ///
    /// Used when a large set is evaluated in chunks and the mean is taken at the end.
    pub fn summed_loss(
        &self,
        y_true: ArrayView3<f32>,
        y_pred: ArrayView3<f32>,
    ) -> Result<f32, ModelError> {
        check_same_shape(y_true, y_pred)?;
        let total: f32 = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|&(&y, _)| y != 0.0)
            .map(|(&y, &p)| -y * guarded_ln(p))
            .sum();
        ensure_finite(total, "cross-entropy")
    }
}

impl LossFunction for CategoricalCrossEntropy {
    fn compute_loss(
        &self,
        y_true: ArrayView3<f32>,
        y_pred: ArrayView3<f32>,
    ) -> Result<f32, ModelError> {
        let (batch, steps, _) = y_true.dim();
        let total = self.summed_loss(y_true, y_pred)?;
        Ok(total / (batch * steps).max(1) as f32)
    }

    fn compute_logit_grad(
        &self,
        y_true: ArrayView3<f32>,
        y_pred: ArrayView3<f32>,
    ) -> Result<Array3<f32>, ModelError> {
        check_same_shape(y_true, y_pred)?;
        let (batch, steps, _) = y_true.dim();
        let scale = 1.0 / (batch * steps).max(1) as f32;

        // d/dlogits of -sum(y * ln softmax(logits)) is p * sum(y) - y
        let target_mass = y_true.sum_axis(Axis(2)).insert_axis(Axis(2));
        let grad = (&y_pred * &target_mass - &y_true) * scale;
        Ok(grad)
    }
}

fn check_same_shape(y_true: ArrayView3<f32>, y_pred: ArrayView3<f32>) -> Result<(), ModelError> {
    if y_true.shape() != y_pred.shape() {
        return Err(ModelError::InputValidationError(format!(
            "target shape {:?} does not match output shape {:?}",
            y_true.shape(),
            y_pred.shape()
        )));
    }
    Ok(())
}
