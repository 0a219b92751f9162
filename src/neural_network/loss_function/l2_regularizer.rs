use super::*;

/// Mean over parameter tensors of `mean(parameter^2)`.
///
/// Every tensor counts once regardless of its size.
///
/// # Parameters
///
/// - `parameters` - Views of every trainable tensor
///
/// # Returns
///
/// - `f32` - The regularizer value
///
/// # Errors
///
/// - `ModelError::NumericalError` - If `parameters` is empty, a tensor is empty,
///   or the result is not finite
pub fn l2_regularizer<'a, I>(parameters: I) -> Result<f32, ModelError>
where
    I: IntoIterator<Item = ArrayViewD<'a, f32>>,
{
    let mut total = 0.0;
    let mut count = 0usize;
    for tensor in parameters {
        let mean = tensor.mapv(|v| v * v).mean().ok_or_else(|| {
            ModelError::NumericalError("cannot regularize an empty parameter tensor".to_string())
        })?;
        total += mean;
        count += 1;
    }
    if count == 0 {
        return Err(ModelError::NumericalError(
            "regularizer requires at least one parameter tensor".to_string(),
        ));
    }
    ensure_finite(total / count as f32, "regularizer")
}

/// Gradient of `gamma * l2_regularizer` with respect to one tensor.
///
/// # Parameters
///
/// - `parameter` - The tensor
/// - `n_tensors` - Number of tensors the regularizer averages over
/// - `gamma` - Weight of the regularizer in the cost
pub fn l2_regularizer_grad(parameter: ArrayViewD<f32>, n_tensors: usize, gamma: f32) -> Tensor {
    let scale = gamma * 2.0 / (parameter.len().max(1) * n_tensors.max(1)) as f32;
    parameter.mapv(|v| v * scale)
}
