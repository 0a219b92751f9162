use super::*;

/// Anything produced per timestep by an unroll that exposes the new hidden state
trait HiddenState {
    fn hidden(&self) -> &Array2<f32>;
}

impl HiddenState for Array2<f32> {
    fn hidden(&self) -> &Array2<f32> {
        self
    }
}

impl HiddenState for GruStep {
    fn hidden(&self) -> &Array2<f32> {
        &self.h
    }
}

/// Drives a stack of cells across every timestep of `input`.
///
/// Layer 0 reads the input sequence (last timestep first when `reverse_input` is set),
/// layer `l > 0` reads the hidden state layer `l - 1` produced at the same iteration.
/// Every layer starts from a zero hidden state.
fn unroll_layers<S, F>(
    input: ArrayView3<f32>,
    cells: &[GRUCell],
    reverse_input: bool,
    step: F,
) -> Result<Vec<Vec<S>>, ModelError>
where
    S: HiddenState,
    F: Fn(&GRUCell, &Array2<f32>, &Array2<f32>) -> Result<S, ModelError>,
{
    if cells.is_empty() {
        return Err(ModelError::InputValidationError(
            "an encoder stack needs at least one layer".to_string(),
        ));
    }
    let (batch, steps, _) = input.dim();
    let mut layers: Vec<Vec<S>> = Vec::with_capacity(cells.len());

    for (l, cell) in cells.iter().enumerate() {
        let zeros = Array2::<f32>::zeros((batch, cell.n_hidden()));
        let mut states: Vec<S> = Vec::with_capacity(steps);
        for k in 0..steps {
            let external;
            let x = if l == 0 {
                let t = if reverse_input { steps - 1 - k } else { k };
                external = input.index_axis(Axis(1), t).to_owned();
                &external
            } else {
                layers[l - 1][k].hidden()
            };
            let h_prev = if k == 0 { &zeros } else { states[k - 1].hidden() };
            let state = step(cell, h_prev, x)?;
            states.push(state);
        }
        layers.push(states);
    }
    Ok(layers)
}

/// Input width of every layer in a stack, bottom first.
///
/// Layer 0 reads the embedded sequence, every higher layer reads the hidden state of
/// the layer below it.
pub fn layer_input_dims(input_dim: usize, n_hidden: &[usize]) -> Vec<usize> {
    std::iter::once(input_dim)
        .chain(n_hidden.iter().copied())
        .take(n_hidden.len())
        .collect()
}

/// Unrolls a stack of GRU cells over an embedded sequence.
///
/// # Parameters
///
/// - `input` - Embedded sequence with shape (batch, steps, input_dim)
/// - `cells` - One cell per layer, bottom first
/// - `reverse_input` - Process the time axis last-step first
///
/// # Returns
///
/// - `Vec<Vec<Array2<f32>>>` - For every layer, the `steps` hidden states in iteration
///   order. With `reverse_input`, iteration `k` corresponds to absolute time `steps - 1 - k`.
///
/// # Errors
///
/// - `ModelError::InputValidationError` - If `cells` is empty or the widths do not chain
pub fn build_encoder_layers(
    input: ArrayView3<f32>,
    cells: &[GRUCell],
    reverse_input: bool,
) -> Result<Vec<Vec<Array2<f32>>>, ModelError> {
    unroll_layers(input, cells, reverse_input, GRUCell::forward)
}

/// Same as [`build_encoder_layers`] but keeps the gate activations of every step.
pub fn trace_encoder_layers(
    input: ArrayView3<f32>,
    cells: &[GRUCell],
    reverse_input: bool,
) -> Result<Vec<Vec<GruStep>>, ModelError> {
    unroll_layers(input, cells, reverse_input, GRUCell::step)
}

/// Backpropagation through time for one traced stack.
///
/// # Parameters
///
/// - `cells` - The stack that produced `traces`
/// - `traces` - Output of [`trace_encoder_layers`]
/// - `grad_top` - Gradient of the cost with respect to the top layer's hidden state, per iteration
/// - `reverse_input` - The flag the stack was unrolled with
///
/// # Returns
///
/// - `(Vec<GruGradients>, Array3<f32>)` - Parameter gradients of every cell (bottom first) and
///   the gradient with respect to the stack input, in absolute time order
pub fn backward_encoder_layers(
    cells: &[GRUCell],
    traces: &[Vec<GruStep>],
    grad_top: Vec<Array2<f32>>,
    reverse_input: bool,
) -> Result<(Vec<GruGradients>, Array3<f32>), ModelError> {
    if cells.len() != traces.len() || cells.is_empty() {
        return Err(ModelError::ProcessingError(format!(
            "{} cells but {} traced layers",
            cells.len(),
            traces.len()
        )));
    }
    let steps = grad_top.len();
    let mut grads: Vec<GruGradients> = cells.iter().map(GruGradients::zeros_like).collect();
    let mut grad_out = grad_top;

    for l in (0..cells.len()).rev() {
        let cell = &cells[l];
        let trace = &traces[l];
        if trace.len() != steps {
            return Err(ModelError::ProcessingError(format!(
                "layer {} traced {} steps, expected {}",
                l,
                trace.len(),
                steps
            )));
        }
        let mut grad_in: Vec<Array2<f32>> = Vec::with_capacity(steps);
        let mut grad_h_next: Option<Array2<f32>> = None;
        for k in (0..steps).rev() {
            let grad_h = match grad_h_next.take() {
                Some(carry) => &grad_out[k] + &carry,
                None => grad_out[k].clone(),
            };
            let (grad_h_prev, grad_x) = cell.backward_step(&trace[k], &grad_h, &mut grads[l]);
            grad_h_next = Some(grad_h_prev);
            grad_in.push(grad_x);
        }
        grad_in.reverse();
        grad_out = grad_in;
    }

    let (batch, input_dim) = grad_out
        .first()
        .map(|g| g.dim())
        .unwrap_or((0, cells[0].n_input()));
    let mut grad_input = Array3::<f32>::zeros((batch, steps, input_dim));
    for (k, g) in grad_out.iter().enumerate() {
        let t = if reverse_input { steps - 1 - k } else { k };
        grad_input.index_axis_mut(Axis(1), t).assign(g);
    }
    Ok((grads, grad_input))
}

/// Concatenates the top hidden states of the two directions per absolute timestep.
///
/// The forward state at time `t` is paired with the backward state of iteration
/// `steps - 1 - t`, which is the backward stack's view of the same position.
///
/// # Returns
///
/// - `Array3<f32>` - Context with shape (batch, steps, forward_units + backward_units)
pub fn bidirectional_context(
    forward_top: &[Array2<f32>],
    backward_top: &[Array2<f32>],
) -> Result<Array3<f32>, ModelError> {
    if forward_top.len() != backward_top.len() || forward_top.is_empty() {
        return Err(ModelError::ProcessingError(format!(
            "cannot pair {} forward states with {} backward states",
            forward_top.len(),
            backward_top.len()
        )));
    }
    let steps = forward_top.len();
    let (batch, forward_units) = forward_top[0].dim();
    let backward_units = backward_top[0].ncols();
    let mut context = Array3::<f32>::zeros((batch, steps, forward_units + backward_units));
    for t in 0..steps {
        context
            .slice_mut(s![.., t, ..forward_units])
            .assign(&forward_top[t]);
        context
            .slice_mut(s![.., t, forward_units..])
            .assign(&backward_top[steps - 1 - t]);
    }
    Ok(context)
}

/// Splits a context gradient back into per-iteration gradients of both stacks.
///
/// Inverse of [`bidirectional_context`]: the backward half at absolute time `t` belongs
/// to backward iteration `steps - 1 - t`.
pub fn split_context_gradient(
    grad_context: ArrayView3<f32>,
    forward_units: usize,
) -> (Vec<Array2<f32>>, Vec<Array2<f32>>) {
    let steps = grad_context.len_of(Axis(1));
    let forward = (0..steps)
        .map(|t| grad_context.slice(s![.., t, ..forward_units]).to_owned())
        .collect();
    let backward = (0..steps)
        .map(|k| {
            grad_context
                .slice(s![.., steps - 1 - k, forward_units..])
                .to_owned()
        })
        .collect();
    (forward, backward)
}

/// Two independent GRU stacks reading the same sequence in opposite directions.
#[derive(Debug, Clone, PartialEq)]
pub struct BidirectionalEncoder {
    forward: Vec<GRUCell>,
    backward: Vec<GRUCell>,
}

impl BidirectionalEncoder {
    /// Creates both stacks with freshly initialized cells.
    ///
    /// # Parameters
    ///
    /// - `input_dim` - Width of the embedded input
    /// - `n_hidden` - Hidden size of each layer, bottom first
    /// - `radius` - Weight initialization radius shared by every cell
    /// - `rng` - Random source
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `n_hidden` is empty or contains 0
    pub fn new<R: Rng + ?Sized>(
        input_dim: usize,
        n_hidden: &[usize],
        radius: Option<f32>,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        validate_dimension_greater_than_zero(n_hidden.len(), "number of encoder layers")?;
        let mut forward = Vec::with_capacity(n_hidden.len());
        let mut backward = Vec::with_capacity(n_hidden.len());
        let inputs = layer_input_dims(input_dim, n_hidden);
        for (l, (&layer_input, &units)) in inputs.iter().zip(n_hidden).enumerate() {
            forward.push(GRUCell::new(
                CellId::new(Direction::Forward, l),
                layer_input,
                units,
                radius,
                rng,
            )?);
            backward.push(GRUCell::new(
                CellId::new(Direction::Backward, l),
                layer_input,
                units,
                radius,
                rng,
            )?);
        }
        Ok(Self { forward, backward })
    }

    /// Restores every cell of both stacks from `registry`
    pub fn from_registry(
        input_dim: usize,
        n_hidden: &[usize],
        registry: &mut ParameterRegistry,
    ) -> Result<Self, ModelError> {
        validate_dimension_greater_than_zero(n_hidden.len(), "number of encoder layers")?;
        let inputs = layer_input_dims(input_dim, n_hidden);
        let mut stack = |direction: Direction| -> Result<Vec<GRUCell>, ModelError> {
            inputs
                .iter()
                .zip(n_hidden)
                .enumerate()
                .map(|(l, (&layer_input, &units))| {
                    GRUCell::from_registry(CellId::new(direction, l), layer_input, units, registry)
                })
                .collect()
        };
        let forward = stack(Direction::Forward)?;
        let backward = stack(Direction::Backward)?;
        Ok(Self { forward, backward })
    }

    pub fn forward_cells(&self) -> &[GRUCell] {
        &self.forward
    }

    pub fn backward_cells(&self) -> &[GRUCell] {
        &self.backward
    }

    /// Cells of the stack reading in `direction`
    pub fn cells(&self, direction: Direction) -> &[GRUCell] {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
        }
    }

    /// Mutable access to every cell, forward stack first
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut GRUCell> {
        self.forward.iter_mut().chain(self.backward.iter_mut())
    }

    /// Hidden size of the top layer of the forward stack
    pub fn top_hidden(&self) -> usize {
        self.forward.last().map(GRUCell::n_hidden).unwrap_or(0)
    }

    /// Width of the per-timestep context vector
    pub fn context_dim(&self) -> usize {
        self.top_hidden() + self.backward.last().map(GRUCell::n_hidden).unwrap_or(0)
    }

    /// Encodes an embedded sequence into one context vector per timestep.
    ///
    /// The two stacks are independent and run in parallel.
    ///
    /// # Parameters
    ///
    /// - `embedded` - Embedded sequence with shape (batch, steps, input_dim)
    ///
    /// # Returns
    ///
    /// - `Array3<f32>` - Context with shape (batch, steps, 2 * top_hidden)
    pub fn encode(&self, embedded: ArrayView3<f32>) -> Result<Array3<f32>, ModelError> {
        let (forward_layers, backward_layers) = rayon::join(
            || build_encoder_layers(embedded, &self.forward, false),
            || build_encoder_layers(embedded, &self.backward, true),
        );
        let forward_layers = forward_layers?;
        let backward_layers = backward_layers?;
        bidirectional_context(top_layer(&forward_layers)?, top_layer(&backward_layers)?)
    }
}

/// Last layer of an unrolled stack
pub(crate) fn top_layer<S>(layers: &[Vec<S>]) -> Result<&[S], ModelError> {
    layers
        .last()
        .map(Vec::as_slice)
        .ok_or_else(|| ModelError::ProcessingError("encoder produced no layers".to_string()))
}
