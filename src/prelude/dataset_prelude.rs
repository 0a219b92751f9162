pub use crate::config::{ExperimentConfig, ModelConfig, PathConfig, SymbolConfig, TrainingConfig};
pub use crate::dataset::{
    AlignedPair, DatasetSplit, Vocabulary, VocabularyPair, digitalise, prepare_data,
    prepare_source, vectorise,
};
