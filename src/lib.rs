/// Error types shared by the whole crate.
///
/// - `ModelError` - Validation, parameter-set and numerical failures
/// - `IoError` - File system and JSON (de)serialization failures
/// - `PipelineError` - Either of the above, for operations that both read files and run the model
pub mod error;

pub use error::{IoError, ModelError, PipelineError};

/// Module `math` contains the scalar and matrix helpers the network is built from.
///
/// ## Activation Functions
/// - `sigmoid`, `apply_sigmoid` - Numerically stable logistic function
/// - `apply_tanh` - Hyperbolic tangent applied element-wise
/// - `softmax_rows` - Row-wise softmax with max subtraction
///
/// ## Numerical Guards
/// - `guarded_ln` - Logarithm with its argument clamped to `EPSILON`
/// - `ensure_finite` - Turns NaN or infinite scalars into a `ModelError::NumericalError`
///
/// ## Decoding
/// - `argmax_last_axis` - Greedy class selection for every timestep
///
/// # Example
/// ```rust
/// use hanzi_bigru::math::{sigmoid, softmax_rows};
/// use ndarray::array;
///
/// let p = softmax_rows(array![[1.0, 2.0, 3.0]]);
/// assert!((p.sum() - 1.0).abs() < 1e-6);
/// assert!(sigmoid(-3.0) < 0.5);
/// ```
pub mod math;

/// Experiment configuration loaded from JSON.
///
/// Missing fields fall back to the defaults of the reference pinyin experiment:
/// a 28-symbol source alphabet, 56-dimensional embeddings, 1104 output symbols,
/// sequences of 44 symbols and a single 256-unit GRU layer per direction.
pub mod config;

/// Vocabularies, aligned sentence pairs and their encoding into model tensors.
///
/// - `Vocabulary` / `VocabularyPair` - Invertible symbol-to-index mappings
/// - `AlignedPair` / `DatasetSplit` - Padded `(pinyin, hanzi)` pairs and the train/validation/test split
/// - `digitalise` - Symbols to vocabulary ids
/// - `vectorise` - Symbols to one-hot rows
/// - `prepare_data` - A batch of pairs to `(ids, one-hot targets)`
pub mod dataset;

/// Character error statistics for transliteration output.
///
/// # Example
/// ```rust
/// use hanzi_bigru::metric::{EvaluationReport, edit_distance};
///
/// assert_eq!(edit_distance("abc", ""), 3);
///
/// let mut report = EvaluationReport::default();
/// report.record("我们去", "我们");
/// assert_eq!(report.edit_count, 1);
/// assert!((report.error_rate() - 100.0 / 3.0).abs() < 1e-9);
/// ```
pub mod metric;

/// Module `neural_network` implements the bidirectional GRU transliteration network.
///
/// - **GRUCell**: Gated recurrent unit computed from matrix products and element-wise gates
/// - **BidirectionalEncoder**: Forward and backward stacks of cells over the embedded input
/// - **OutputProjection**: Shared softmax classifier applied at every timestep
/// - **BiGruModel**: The complete network, its parameter registry and its cost
/// - **Backpropagation**: Exact gradients through time, behind the `GradientEngine` trait
/// - **Adam**: Adaptive moment optimizer, behind the `Optimizer` trait
/// - **Checkpoint**: JSON snapshots of every trainable parameter
/// - **Trainer**: The mini-batch loop with periodic validation and checkpoints
///
/// # Examples
/// ```rust
/// use hanzi_bigru::config::{ModelConfig, TrainingConfig};
/// use hanzi_bigru::dataset::{AlignedPair, VocabularyPair, Vocabulary};
/// use hanzi_bigru::neural_network::*;
/// use ndarray_rand::rand::SeedableRng;
/// use ndarray_rand::rand::rngs::StdRng;
///
/// let vocab = VocabularyPair {
///     source: Vocabulary::from_symbols("#ab".chars()).unwrap(),
///     target: Vocabulary::from_symbols("#.xy".chars()).unwrap(),
/// };
/// let config = ModelConfig {
///     source_vocab_size: 3,
///     embed_dim: 4,
///     n_output: 4,
///     n_step_input: 3,
///     n_hidden: vec![5],
///     weight_stddev: Some(0.3),
/// };
/// let mut model = BiGruModel::new(config, &mut StdRng::seed_from_u64(1)).unwrap();
///
/// let training = TrainingConfig { batch_size: 2, ..TrainingConfig::default() };
/// let mut trainer = Trainer::new(training, "models").unwrap().with_progress_bar(false);
/// let pairs = vec![AlignedPair::new("ab#", "xy#"), AlignedPair::new("ba#", "yx#")];
/// let cost = trainer.train_step(&mut model, &pairs, &vocab).unwrap();
/// assert!(cost.loss > 0.0);
/// ```
pub mod neural_network;

/// Greedy decoding, post-processing and evaluation of a trained model.
pub mod transliteration;

/// A convenience module that re-exports the most commonly used types and traits from this crate.
///
/// # Examples
/// ```rust
/// use hanzi_bigru::prelude::*;
///
/// let config = ExperimentConfig::default();
/// assert_eq!(config.symbols.filler, '#');
/// assert_eq!(edit_distance("abc", "abc"), 0);
/// ```
pub mod prelude;
