use super::*;

/// Validates that the learning rate is positive and finite.
///
/// # Parameters
///
/// * `learning_rate` - The learning rate value to validate
pub(super) fn validate_learning_rate(learning_rate: f32) -> Result<(), ModelError> {
    if !(learning_rate > 0.0 && learning_rate.is_finite()) {
        return Err(ModelError::InputValidationError(format!(
            "learning_rate must be positive and finite, got {}",
            learning_rate
        )));
    }
    Ok(())
}

/// Validates that a moment decay rate lies in [0, 1).
///
/// # Parameters
///
/// - `value` - The decay rate value to validate
/// - `param_name` - The name of the parameter (for error messages)
pub(super) fn validate_decay_rate(value: f32, param_name: &str) -> Result<(), ModelError> {
    if !((0.0..1.0).contains(&value) && value.is_finite()) {
        return Err(ModelError::InputValidationError(format!(
            "{} must be in range [0, 1) and finite, got {}",
            param_name, value
        )));
    }
    Ok(())
}

/// Validates that epsilon is positive and finite.
pub(super) fn validate_epsilon(epsilon: f32) -> Result<(), ModelError> {
    if !(epsilon > 0.0 && epsilon.is_finite()) {
        return Err(ModelError::InputValidationError(format!(
            "epsilon must be positive and finite, got {}",
            epsilon
        )));
    }
    Ok(())
}

/// Validates that a gradient exists for `key` and matches the parameter's shape.
pub(super) fn validate_gradient<'a>(
    gradients: &'a ParameterRegistry,
    key: &ParamKey,
    shape: &[usize],
) -> Result<&'a Tensor, ModelError> {
    let grad = gradients
        .get(key)
        .ok_or(ModelError::MissingParameter(*key))?;
    if grad.shape() != shape {
        return Err(ModelError::InputValidationError(format!(
            "gradient of `{}` has shape {:?}, parameter has {:?}",
            key,
            grad.shape(),
            shape
        )));
    }
    Ok(grad)
}
