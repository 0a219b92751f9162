use super::*;

/// Shared linear layer followed by a softmax over the output vocabulary.
///
/// The same `W_o` (shape (context_dim, n_output)) and `b_o` (shape (n_output,)) are
/// applied independently at every timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputProjection {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

/// Gradients of the projection parameters and of its input
#[derive(Debug, Clone)]
pub struct ProjectionGradients {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
    pub context: Array3<f32>,
}

impl OutputProjection {
    /// Creates a projection with uniform weights and zero bias.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If either dimension is 0
    pub fn new<R: Rng + ?Sized>(
        context_dim: usize,
        n_output: usize,
        radius: Option<f32>,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        validate_dimension_greater_than_zero(context_dim, "context_dim")?;
        validate_dimension_greater_than_zero(n_output, "n_output")?;
        Ok(Self {
            weight: uniform_matrix(context_dim, n_output, radius, rng),
            bias: Array1::zeros(n_output),
        })
    }

    /// Takes `W_o` and `b_o` out of `registry`
    pub fn from_registry(
        context_dim: usize,
        n_output: usize,
        registry: &mut ParameterRegistry,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            weight: registry.take_matrix(ParamKey::OutputWeight, context_dim, n_output)?,
            bias: registry.take_vector(ParamKey::OutputBias, n_output)?,
        })
    }

    pub fn context_dim(&self) -> usize {
        self.weight.nrows()
    }

    pub fn n_output(&self) -> usize {
        self.weight.ncols()
    }

    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    pub fn parameters(&self) -> Vec<(ParamKey, ArrayViewD<'_, f32>)> {
        vec![
            (ParamKey::OutputWeight, self.weight.view().into_dyn()),
            (ParamKey::OutputBias, self.bias.view().into_dyn()),
        ]
    }

    pub fn parameters_mut(&mut self) -> Vec<(ParamKey, ArrayViewMutD<'_, f32>)> {
        vec![
            (ParamKey::OutputWeight, self.weight.view_mut().into_dyn()),
            (ParamKey::OutputBias, self.bias.view_mut().into_dyn()),
        ]
    }

    /// Maps every context vector to a probability distribution over the output vocabulary.
    ///
    /// # Parameters
    ///
    /// - `context` - Context with shape (batch, steps, context_dim)
    ///
    /// # Returns
    ///
    /// - `Array3<f32>` - Probabilities with shape (batch, steps, n_output); every
    ///   `[b, t, ..]` lane sums to 1
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If the context width is not `context_dim`
    pub fn forward(&self, context: ArrayView3<f32>) -> Result<Array3<f32>, ModelError> {
        let (batch, steps, width) = context.dim();
        if width != self.context_dim() {
            return Err(ModelError::InputValidationError(format!(
                "context has width {}, expected {}",
                width,
                self.context_dim()
            )));
        }
        let flat = flatten_steps(context)?;
        let logits = flat.dot(&self.weight) + &self.bias;
        softmax_rows(logits)
            .into_shape_with_order((batch, steps, self.n_output()))
            .map_err(|e| ModelError::ProcessingError(format!("failed to reshape outputs: {}", e)))
    }

    /// Backpropagates a gradient taken with respect to the logits.
    ///
    /// # Parameters
    ///
    /// - `context` - The input passed to [`OutputProjection::forward`]
    /// - `grad_logits` - Gradient with shape (batch, steps, n_output)
    pub fn backward(
        &self,
        context: ArrayView3<f32>,
        grad_logits: ArrayView3<f32>,
    ) -> Result<ProjectionGradients, ModelError> {
        let (batch, steps, width) = context.dim();
        let flat_context = flatten_steps(context)?;
        let flat_grad = flatten_steps(grad_logits)?;
        let weight = flat_context.t().dot(&flat_grad);
        let bias = flat_grad.sum_axis(Axis(0));
        let grad_context = flat_grad
            .dot(&self.weight.t())
            .into_shape_with_order((batch, steps, width))
            .map_err(|e| {
                ModelError::ProcessingError(format!("failed to reshape context gradient: {}", e))
            })?;
        Ok(ProjectionGradients {
            weight,
            bias,
            context: grad_context,
        })
    }
}

/// Views a (batch, steps, width) tensor as a (batch * steps, width) matrix
fn flatten_steps(values: ArrayView3<f32>) -> Result<Array2<f32>, ModelError> {
    let (batch, steps, width) = values.dim();
    values
        .to_shape((batch * steps, width))
        .map(|m| m.into_owned())
        .map_err(|e| ModelError::ProcessingError(format!("failed to flatten timesteps: {}", e)))
}
