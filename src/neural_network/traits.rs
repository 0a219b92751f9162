use super::*;

/// Defines the interface for loss functions used in neural network training.
///
/// This trait provides methods to compute both the loss value and its gradient
/// with respect to the logits that produced the predicted distribution.
pub trait LossFunction {
    /// Computes the loss between true and predicted values.
    ///
    /// # Parameters
    ///
    /// - `y_true` - One-hot targets with shape (batch, steps, classes)
    /// - `y_pred` - Predicted probabilities with the same shape
    ///
    /// # Returns
    ///
    /// * `Result<f32, ModelError>` - The scalar loss value
    fn compute_loss(
        &self,
        y_true: ArrayView3<f32>,
        y_pred: ArrayView3<f32>,
    ) -> Result<f32, ModelError>;

    /// Computes the gradient of the loss with respect to the pre-softmax logits.
    ///
    /// # Parameters
    ///
    /// - `y_true` - One-hot targets with shape (batch, steps, classes)
    /// - `y_pred` - Predicted probabilities with the same shape
    ///
    /// # Returns
    ///
    /// * `Result<Array3<f32>, ModelError>` - Gradient with the shape of `y_pred`
    fn compute_logit_grad(
        &self,
        y_true: ArrayView3<f32>,
        y_pred: ArrayView3<f32>,
    ) -> Result<Array3<f32>, ModelError>;
}

/// Defines the interface for optimization algorithms.
///
/// This trait provides a method to update every trainable parameter of the model
/// during the training process.
pub trait Optimizer {
    /// Applies one update step.
    ///
    /// # Parameters
    ///
    /// - `model` - The model whose parameters should be updated in place
    /// - `gradients` - Gradient of the cost for every trainable parameter, keyed like the model's parameters
    ///
    /// # Errors
    ///
    /// - `ModelError::MissingParameter` - If a model parameter has no gradient
    /// - `ModelError::InputValidationError` - If a gradient's shape differs from its parameter
    fn step(
        &mut self,
        model: &mut BiGruModel,
        gradients: &ParameterRegistry,
    ) -> Result<(), ModelError>;
}

/// Computes the gradient of the training cost.
///
/// This is the pluggable seam between the forward definition of the model and
/// whatever differentiates it.
pub trait GradientEngine {
    /// Evaluates the cost of a batch together with its gradient.
    ///
    /// # Parameters
    ///
    /// - `model` - The model at its current parameter values
    /// - `source` - Source ids with shape (batch, steps)
    /// - `target` - One-hot targets with shape (batch, steps, n_output)
    /// - `gamma` - Weight of the regularizer in the cost
    ///
    /// # Returns
    ///
    /// - `(Cost, ParameterRegistry)` - The cost before the update and one gradient per trainable parameter
    fn gradients(
        &self,
        model: &BiGruModel,
        source: ArrayView2<usize>,
        target: ArrayView3<f32>,
        gamma: f32,
    ) -> Result<(Cost, ParameterRegistry), ModelError>;
}
