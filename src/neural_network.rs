/// Module that contains the training checkpoint file format
pub mod checkpoint;
/// Module that contains the gradient computation interface and backpropagation through time
pub mod gradient;
/// Module that contains the building blocks of the encoder and classifier
pub mod layer;
/// Module that contains the cross-entropy loss and the L2 parameter regularizer
pub mod loss_function;
/// Module that contains the full bidirectional GRU transliteration model
pub mod model;
/// Module that contains optimization algorithms for training
pub mod optimizer;
/// Module that contains structured parameter names and the parameter registry
pub mod parameter;
/// Module that contains the training loop
pub mod trainer;
/// Module that contains the loss, optimizer and gradient engine traits
pub mod traits;

pub use checkpoint::*;
pub use gradient::*;
pub use layer::*;
pub use loss_function::*;
pub use model::*;
pub use optimizer::*;
pub use parameter::{CellId, CellParam, Direction, ParamKey, ParameterRegistry};
pub use trainer::*;
pub use traits::*;

use crate::ModelError;
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView2, ArrayView3, Axis, Ix1, Ix2};

/// Type alias for n-dimensional arrays used to store parameters of any rank
pub type Tensor = ArrayD<f32>;
