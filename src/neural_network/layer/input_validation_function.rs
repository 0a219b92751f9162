use super::*;

/// Validates that a dimension value is greater than 0
///
/// # Parameters
///
/// - `value` - The dimension value to validate
/// - `name` - The name of the dimension for error messages
///
/// # Returns
///
/// * `Ok(())` if validation passes
/// * `Err(ModelError)` if validation fails
pub(super) fn validate_dimension_greater_than_zero(
    value: usize,
    name: &str,
) -> Result<(), ModelError> {
    if value == 0 {
        return Err(ModelError::InputValidationError(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(())
}

/// Validates input dimensions for recurrent cells
pub(super) fn validate_recurrent_dimensions(
    input_dim: usize,
    units: usize,
) -> Result<(), ModelError> {
    validate_dimension_greater_than_zero(input_dim, "input_dim")?;
    validate_dimension_greater_than_zero(units, "units")?;
    Ok(())
}

/// Validates that a `(batch, width)` matrix has the expected width
///
/// # Parameters
///
/// - `name` - The name of the matrix for error messages
/// - `matrix` - The matrix to validate
/// - `width` - Expected number of columns
pub(super) fn validate_width(
    name: &str,
    matrix: &Array2<f32>,
    width: usize,
) -> Result<(), ModelError> {
    if matrix.ncols() != width {
        return Err(ModelError::InputValidationError(format!(
            "{} has width {}, expected {}",
            name,
            matrix.ncols(),
            width
        )));
    }
    Ok(())
}

/// Validates that two matrices have the same batch (row) dimension
pub(super) fn validate_same_batch(a: &Array2<f32>, b: &Array2<f32>) -> Result<(), ModelError> {
    if a.nrows() != b.nrows() {
        return Err(ModelError::InputValidationError(format!(
            "batch size mismatch: hidden state has {} rows, input has {}",
            a.nrows(),
            b.nrows()
        )));
    }
    Ok(())
}
