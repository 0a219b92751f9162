use super::*;
use crate::math::{apply_sigmoid, apply_tanh, softmax_rows};
use crate::neural_network::parameter::{CellId, CellParam, Direction, ParamKey, ParameterRegistry};
use ndarray::{ArrayViewD, ArrayViewMutD, concatenate, s};
use ndarray_rand::RandomExt;
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::Uniform;

/// Bidirectional stacks of GRU cells and the layer unrolling algorithm
pub mod encoder;
/// Trainable symbol embedding table
pub mod embedding;
/// Gated recurrent unit cell built from matrix products and element-wise gates
pub mod gru_cell;
/// Input validation functions for layers
mod input_validation_function;
/// Shared linear + softmax classifier applied at every timestep
pub mod output_projection;

pub use embedding::Embedding;
pub use encoder::{
    BidirectionalEncoder, backward_encoder_layers, bidirectional_context, build_encoder_layers,
    layer_input_dims, split_context_gradient, trace_encoder_layers,
};
pub use gru_cell::{GRUCell, Gate, GateGradients, GruGradients, GruStep};
pub use output_projection::{OutputProjection, ProjectionGradients};

use input_validation_function::*;

/// Draws a `(rows, cols)` matrix uniformly from `[-radius, radius]`.
///
/// When `radius` is `None` it defaults to `1 / sqrt(rows)`, i.e. the fan-in of a
/// matrix that multiplies row vectors from the left.
///
/// # Parameters
///
/// - `rows` - Number of rows (fan-in)
/// - `cols` - Number of columns
/// - `radius` - Optional half-width of the uniform distribution
/// - `rng` - Random source
///
/// # Returns
///
/// - `Array2<f32>` - The initialized matrix
pub fn uniform_matrix<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    radius: Option<f32>,
    rng: &mut R,
) -> Array2<f32> {
    let radius = radius.unwrap_or_else(|| 1.0 / (rows as f32).sqrt());
    Array2::random_using((rows, cols), Uniform::new_inclusive(-radius, radius), rng)
}
