pub use crate::metric::{EvaluationReport, edit_distance};
pub use crate::neural_network::Tensor;
pub use crate::neural_network::layer::{BidirectionalEncoder, Embedding, GRUCell, OutputProjection};
pub use crate::neural_network::{
    Adam, Backpropagation, BiGruModel, Checkpoint, CheckpointLabel, Cost, GradientEngine,
    LossFunction, Optimizer, ParamKey, ParameterRegistry, Trainer, TrainingReport,
    TrainingSchedule,
};
pub use crate::transliteration::{DEFAULT_INPUTS, Transliterator, strip_symbols};
