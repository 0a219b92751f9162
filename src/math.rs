use crate::ModelError;
use ndarray::{Array2, ArrayView3, Axis, Zip};

/// Lower bound applied to probabilities before taking their logarithm
pub const EPSILON: f32 = 1e-8;

/// Pre-activations are clamped to this magnitude before `exp`/`tanh`
const ACTIVATION_CLIP: f32 = 500.0;

/// Numerically stable logistic sigmoid.
///
/// # Parameters
///
/// - `z` - Input value
///
/// # Returns
///
/// - `f32` - `1 / (1 + e^(-z))` in the closed interval [0, 1]. Moderate inputs land strictly
///   inside (0, 1); in `f32` the result rounds to exactly 1 from about `z = 17` and to 0
///   below about `z = -104`
///
/// # Examples
/// ```rust
/// use hanzi_bigru::math::sigmoid;
///
/// assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
/// assert!(sigmoid(10.0) > 0.99);
/// ```
#[inline]
pub fn sigmoid(z: f32) -> f32 {
    let z = z.clamp(-ACTIVATION_CLIP, ACTIVATION_CLIP);
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Applies the sigmoid function element-wise, consuming the pre-activation matrix.
#[inline]
pub fn apply_sigmoid(mut x: Array2<f32>) -> Array2<f32> {
    x.mapv_inplace(sigmoid);
    x
}

/// Applies `tanh` element-wise, consuming the pre-activation matrix.
#[inline]
pub fn apply_tanh(mut x: Array2<f32>) -> Array2<f32> {
    x.mapv_inplace(|v| v.clamp(-ACTIVATION_CLIP, ACTIVATION_CLIP).tanh());
    x
}

/// Row-wise softmax of a `(batch, classes)` matrix.
///
/// The row maximum is subtracted before exponentiation so large logits cannot overflow.
///
/// # Parameters
///
/// - `logits` - Raw scores with shape (batch, classes)
///
/// # Returns
///
/// - `Array2<f32>` - Matrix of the same shape where every row is a probability distribution
pub fn softmax_rows(mut logits: Array2<f32>) -> Array2<f32> {
    for mut row in logits.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    logits
}

/// Natural logarithm guarded against `ln(0)`.
#[inline]
pub fn guarded_ln(p: f32) -> f32 {
    p.max(EPSILON).ln()
}

/// Index of the largest entry along the last axis of a `(batch, steps, classes)` tensor.
///
/// Ties resolve to the lowest index.
///
/// # Parameters
///
/// - `values` - Tensor with shape (batch, steps, classes)
///
/// # Returns
///
/// - `Array2<usize>` - Arg-max indices with shape (batch, steps)
pub fn argmax_last_axis(values: ArrayView3<f32>) -> Array2<usize> {
    let (batch, steps, _) = values.dim();
    let mut result = Array2::<usize>::zeros((batch, steps));
    Zip::from(&mut result)
        .and(values.lanes(Axis(2)))
        .for_each(|out, lane| {
            let mut best = 0;
            let mut best_value = f32::NEG_INFINITY;
            for (i, &v) in lane.iter().enumerate() {
                if v > best_value {
                    best = i;
                    best_value = v;
                }
            }
            *out = best;
        });
    result
}

/// Ensures a scalar produced by the model is a finite number.
///
/// # Parameters
///
/// - `value` - The scalar to check
/// - `what` - Name used in the error message
///
/// # Errors
///
/// - `ModelError::NumericalError` - If `value` is NaN or infinite
pub fn ensure_finite(value: f32, what: &str) -> Result<f32, ModelError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::NumericalError(format!(
            "{} is not finite ({})",
            what, value
        )))
    }
}
