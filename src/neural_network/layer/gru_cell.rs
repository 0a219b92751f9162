use super::*;

/// Threshold for using parallel computation of the update and reset gates.
/// When batch_size * units < this value, sequential execution is used.
const GRU_PARALLEL_THRESHOLD: usize = 1024;

/// Parameters of one GRU gate.
///
/// # Fields
///
/// - `weight` - Matrix with shape (units + input_dim, units); the first `units` rows
///   multiply the hidden part of the concatenated `[h, x]` row vector
/// - `bias` - Vector with shape (units,)
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl Gate {
    /// Creates a gate with uniformly initialized weights and zero bias.
    ///
    /// # Parameters
    ///
    /// - `input_dim` - Dimensionality of the cell input
    /// - `units` - Number of hidden units
    /// - `radius` - Half-width of the uniform distribution, `None` for `1/sqrt(units + input_dim)`
    /// - `rng` - Random source
    pub fn new<R: Rng + ?Sized>(
        input_dim: usize,
        units: usize,
        radius: Option<f32>,
        rng: &mut R,
    ) -> Self {
        Self {
            weight: uniform_matrix(units + input_dim, units, radius, rng),
            bias: Array1::zeros(units),
        }
    }

    /// Computes `input · weight + bias` for a `(batch, units + input_dim)` input
    #[inline]
    pub fn pre_activation(&self, input: &Array2<f32>) -> Array2<f32> {
        input.dot(&self.weight) + &self.bias
    }
}

/// Intermediate values of one GRU step, kept for backpropagation through time.
///
/// # Fields
///
/// - `hx` - Concatenation `[h_prev, x]` with shape (batch, units + input_dim)
/// - `rhx` - Concatenation `[r * h_prev, x]` with shape (batch, units + input_dim)
/// - `z` - Update gate activations
/// - `r` - Reset gate activations
/// - `h_candidate` - Candidate hidden state
/// - `h` - New hidden state
#[derive(Debug, Clone)]
pub struct GruStep {
    pub hx: Array2<f32>,
    pub rhx: Array2<f32>,
    pub z: Array2<f32>,
    pub r: Array2<f32>,
    pub h_candidate: Array2<f32>,
    pub h: Array2<f32>,
}

/// Gated recurrent unit cell.
///
/// The cell holds no state between calls: the same parameters are applied at every
/// timestep it is invoked for. Given the previous hidden state `h` and the input `x`:
///
/// ```text
/// hx          = [h, x]
/// z           = sigmoid(hx · W_z + b_z)
/// r           = sigmoid(hx · W_r + b_r)
/// h_candidate = tanh([r * h, x] · W_c + b_c)
/// h_new       = (1 - z) * h + z * h_candidate
/// ```
///
/// # Examples
/// ```rust
/// use hanzi_bigru::neural_network::{CellId, Direction, GRUCell};
/// use ndarray::Array2;
/// use ndarray_rand::rand::SeedableRng;
/// use ndarray_rand::rand::rngs::StdRng;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let cell = GRUCell::new(CellId::new(Direction::Forward, 0), 4, 3, Some(0.1), &mut rng).unwrap();
///
/// let h = Array2::<f32>::zeros((2, 3));
/// let x = Array2::<f32>::ones((2, 4));
/// let h_new = cell.forward(&h, &x).unwrap();
/// assert_eq!(h_new.dim(), (2, 3));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GRUCell {
    id: CellId,
    n_input: usize,
    n_hidden: usize,
    update: Gate,
    reset: Gate,
    candidate: Gate,
}

impl GRUCell {
    /// Creates a cell with freshly initialized parameters.
    ///
    /// # Parameters
    ///
    /// - `id` - Direction and layer of the cell, used to name its parameters
    /// - `n_input` - Width of the per-timestep input
    /// - `n_hidden` - Number of hidden units
    /// - `radius` - Half-width of the uniform weight initialization (`None` for `1/sqrt(n_input + n_hidden)`)
    /// - `rng` - Random source
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `n_input` or `n_hidden` is 0
    pub fn new<R: Rng + ?Sized>(
        id: CellId,
        n_input: usize,
        n_hidden: usize,
        radius: Option<f32>,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        validate_recurrent_dimensions(n_input, n_hidden)?;
        Ok(Self {
            id,
            n_input,
            n_hidden,
            update: Gate::new(n_input, n_hidden, radius, rng),
            reset: Gate::new(n_input, n_hidden, radius, rng),
            candidate: Gate::new(n_input, n_hidden, radius, rng),
        })
    }

    /// Restores a cell by taking its six parameters out of `registry`.
    ///
    /// # Errors
    ///
    /// - `ModelError::MissingParameter` - If any of `W_z, b_z, W_r, b_r, W_c, b_c` is absent for this cell
    /// - `ModelError::InputValidationError` - If a stored parameter has the wrong shape
    pub fn from_registry(
        id: CellId,
        n_input: usize,
        n_hidden: usize,
        registry: &mut ParameterRegistry,
    ) -> Result<Self, ModelError> {
        validate_recurrent_dimensions(n_input, n_hidden)?;
        let rows = n_hidden + n_input;
        let mut gate = |weight: CellParam, bias: CellParam| -> Result<Gate, ModelError> {
            Ok(Gate {
                weight: registry.take_matrix(id.key(weight), rows, n_hidden)?,
                bias: registry.take_vector(id.key(bias), n_hidden)?,
            })
        };
        let update = gate(CellParam::UpdateWeight, CellParam::UpdateBias)?;
        let reset = gate(CellParam::ResetWeight, CellParam::ResetBias)?;
        let candidate = gate(CellParam::CandidateWeight, CellParam::CandidateBias)?;
        Ok(Self {
            id,
            n_input,
            n_hidden,
            update,
            reset,
            candidate,
        })
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn n_input(&self) -> usize {
        self.n_input
    }

    pub fn n_hidden(&self) -> usize {
        self.n_hidden
    }

    pub fn update_gate(&self) -> &Gate {
        &self.update
    }

    pub fn reset_gate(&self) -> &Gate {
        &self.reset
    }

    pub fn candidate_gate(&self) -> &Gate {
        &self.candidate
    }

    /// Computes the next hidden state.
    ///
    /// # Parameters
    ///
    /// - `h` - Previous hidden state with shape (batch, n_hidden)
    /// - `x` - Current input with shape (batch, n_input)
    ///
    /// # Returns
    ///
    /// - `Array2<f32>` - The new hidden state with shape (batch, n_hidden)
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If the widths are wrong or the batch sizes differ
    pub fn forward(&self, h: &Array2<f32>, x: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        self.step(h, x).map(|step| step.h)
    }

    /// Same as [`GRUCell::forward`] but also returns the gate activations needed by
    /// [`GRUCell::backward_step`].
    pub fn step(&self, h: &Array2<f32>, x: &Array2<f32>) -> Result<GruStep, ModelError> {
        validate_width("hidden state", h, self.n_hidden)?;
        validate_width("input", x, self.n_input)?;
        validate_same_batch(h, x)?;

        let hx = concat_columns(h, x)?;

        let use_parallel = h.nrows() * self.n_hidden >= GRU_PARALLEL_THRESHOLD;
        let (z, r) = if use_parallel {
            rayon::join(
                || apply_sigmoid(self.update.pre_activation(&hx)),
                || apply_sigmoid(self.reset.pre_activation(&hx)),
            )
        } else {
            (
                apply_sigmoid(self.update.pre_activation(&hx)),
                apply_sigmoid(self.reset.pre_activation(&hx)),
            )
        };

        let rh = &r * h;
        let rhx = concat_columns(&rh, x)?;
        let h_candidate = apply_tanh(self.candidate.pre_activation(&rhx));

        // h_t = (1 - z_t) * h_{t-1} + z_t * h̃_t
        let h_new = &(1.0 - &z) * h + &z * &h_candidate;

        Ok(GruStep {
            hx,
            rhx,
            z,
            r,
            h_candidate,
            h: h_new,
        })
    }

    /// Backpropagates through one step, accumulating parameter gradients.
    ///
    /// # Parameters
    ///
    /// - `step` - Activations recorded by [`GRUCell::step`]
    /// - `grad_h` - Gradient of the cost with respect to `step.h`
    /// - `grads` - Accumulator for this cell's parameter gradients
    ///
    /// # Returns
    ///
    /// - `(Array2<f32>, Array2<f32>)` - Gradients with respect to the previous hidden
    ///   state and to the step input
    pub fn backward_step(
        &self,
        step: &GruStep,
        grad_h: &Array2<f32>,
        grads: &mut GruGradients,
    ) -> (Array2<f32>, Array2<f32>) {
        let units = self.n_hidden;
        let h_prev = step.hx.slice(s![.., ..units]);

        // Gradient through h_t = (1 - z_t) * h_{t-1} + z_t * h̃_t
        let grad_z = grad_h * &(&step.h_candidate - &h_prev);
        let grad_candidate = grad_h * &step.z;
        let mut grad_h_prev = grad_h * &(1.0 - &step.z);

        // tanh derivative
        let grad_candidate_raw =
            &grad_candidate * &(1.0 - &(&step.h_candidate * &step.h_candidate));
        grads.candidate.accumulate(&step.rhx, &grad_candidate_raw);

        let grad_rhx = grad_candidate_raw.dot(&self.candidate.weight.t());
        let grad_rh = grad_rhx.slice(s![.., ..units]);
        let mut grad_x = grad_rhx.slice(s![.., units..]).to_owned();
        let grad_r = &grad_rh * &h_prev;
        grad_h_prev += &(&grad_rh * &step.r);

        // sigmoid derivatives
        let grad_z_raw = &grad_z * &(&step.z * &(1.0 - &step.z));
        let grad_r_raw = &grad_r * &(&step.r * &(1.0 - &step.r));
        grads.update.accumulate(&step.hx, &grad_z_raw);
        grads.reset.accumulate(&step.hx, &grad_r_raw);

        let grad_hx =
            grad_z_raw.dot(&self.update.weight.t()) + grad_r_raw.dot(&self.reset.weight.t());
        grad_h_prev += &grad_hx.slice(s![.., ..units]);
        grad_x += &grad_hx.slice(s![.., units..]);

        (grad_h_prev, grad_x)
    }

    /// Read-only views of the six parameters, keyed by name
    pub fn parameters(&self) -> Vec<(ParamKey, ArrayViewD<'_, f32>)> {
        let id = self.id;
        vec![
            (id.key(CellParam::UpdateWeight), self.update.weight.view().into_dyn()),
            (id.key(CellParam::UpdateBias), self.update.bias.view().into_dyn()),
            (id.key(CellParam::ResetWeight), self.reset.weight.view().into_dyn()),
            (id.key(CellParam::ResetBias), self.reset.bias.view().into_dyn()),
            (id.key(CellParam::CandidateWeight), self.candidate.weight.view().into_dyn()),
            (id.key(CellParam::CandidateBias), self.candidate.bias.view().into_dyn()),
        ]
    }

    /// Mutable views of the six parameters, keyed by name
    pub fn parameters_mut(&mut self) -> Vec<(ParamKey, ArrayViewMutD<'_, f32>)> {
        let id = self.id;
        vec![
            (id.key(CellParam::UpdateWeight), self.update.weight.view_mut().into_dyn()),
            (id.key(CellParam::UpdateBias), self.update.bias.view_mut().into_dyn()),
            (id.key(CellParam::ResetWeight), self.reset.weight.view_mut().into_dyn()),
            (id.key(CellParam::ResetBias), self.reset.bias.view_mut().into_dyn()),
            (id.key(CellParam::CandidateWeight), self.candidate.weight.view_mut().into_dyn()),
            (id.key(CellParam::CandidateBias), self.candidate.bias.view_mut().into_dyn()),
        ]
    }
}

fn concat_columns(a: &Array2<f32>, b: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
    concatenate(Axis(1), &[a.view(), b.view()])
        .map_err(|e| ModelError::ProcessingError(format!("failed to concatenate: {}", e)))
}

/// Gradient accumulator for one gate.
#[derive(Debug, Clone, PartialEq)]
pub struct GateGradients {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl GateGradients {
    fn zeros(rows: usize, units: usize) -> Self {
        Self {
            weight: Array2::zeros((rows, units)),
            bias: Array1::zeros(units),
        }
    }

    /// Adds `input^T · grad_raw` to the weight gradient and the column sums of `grad_raw` to the bias gradient
    #[inline]
    fn accumulate(&mut self, input: &Array2<f32>, grad_raw: &Array2<f32>) {
        self.weight += &input.t().dot(grad_raw);
        self.bias += &grad_raw.sum_axis(Axis(0));
    }
}

/// Gradients of the six parameters of one GRU cell, summed over all timesteps.
#[derive(Debug, Clone, PartialEq)]
pub struct GruGradients {
    pub id: CellId,
    pub update: GateGradients,
    pub reset: GateGradients,
    pub candidate: GateGradients,
}

impl GruGradients {
    /// Zero gradients shaped like the parameters of `cell`
    pub fn zeros_like(cell: &GRUCell) -> Self {
        let rows = cell.n_hidden + cell.n_input;
        Self {
            id: cell.id,
            update: GateGradients::zeros(rows, cell.n_hidden),
            reset: GateGradients::zeros(rows, cell.n_hidden),
            candidate: GateGradients::zeros(rows, cell.n_hidden),
        }
    }

    /// Moves the gradients into `registry` under the cell's parameter keys
    pub fn into_registry(self, registry: &mut ParameterRegistry) -> Result<(), ModelError> {
        let id = self.id;
        for (param, gate) in [
            (CellParam::UpdateWeight, self.update),
            (CellParam::ResetWeight, self.reset),
            (CellParam::CandidateWeight, self.candidate),
        ] {
            let bias_param = match param {
                CellParam::UpdateWeight => CellParam::UpdateBias,
                CellParam::ResetWeight => CellParam::ResetBias,
                _ => CellParam::CandidateBias,
            };
            registry.insert(id.key(param), gate.weight.into_dyn())?;
            registry.insert(id.key(bias_param), gate.bias.into_dyn())?;
        }
        Ok(())
    }
}
