use super::*;
use crate::config::ModelConfig;
use crate::math::argmax_last_axis;
use crate::neural_network::layer::encoder::top_layer;
use ndarray::{ArrayViewD, ArrayViewMutD};
use ndarray_rand::rand::Rng;

/// Bidirectional multi-layer GRU transliteration model.
///
/// Source ids are embedded, read by a forward and a backward GRU stack, and the two
/// top-layer states of every position are concatenated and classified by a shared
/// softmax layer:
///
/// ```text
/// ids (batch, steps)
///   -> embedding               (batch, steps, embed_dim)
///   -> forward / backward GRUs (steps x (batch, n_hidden[-1])) each
///   -> context                 (batch, steps, 2 * n_hidden[-1])
///   -> softmax(context · W_o + b_o)
///   -> probabilities           (batch, steps, n_output)
/// ```
///
/// Every trainable tensor is addressed by a [`ParamKey`]; the model owns its parameters
/// and can be snapshotted to and restored from a [`ParameterRegistry`].
///
/// # Examples
/// ```rust
/// use hanzi_bigru::config::ModelConfig;
/// use hanzi_bigru::neural_network::BiGruModel;
/// use ndarray::array;
/// use ndarray_rand::rand::SeedableRng;
/// use ndarray_rand::rand::rngs::StdRng;
///
/// let config = ModelConfig {
///     source_vocab_size: 4,
///     embed_dim: 3,
///     n_output: 5,
///     n_step_input: 2,
///     n_hidden: vec![4, 3],
///     weight_stddev: Some(0.1),
/// };
/// let mut rng = StdRng::seed_from_u64(1001);
/// let model = BiGruModel::new(config, &mut rng).unwrap();
///
/// let probabilities = model.forward(array![[1, 2], [3, 0]].view()).unwrap();
/// assert_eq!(probabilities.dim(), (2, 2, 5));
///
/// // embedding, 2 directions x 2 layers x 6 gate tensors, W_o, b_o
/// assert_eq!(model.parameters().len(), 27);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BiGruModel {
    config: ModelConfig,
    embedding: Embedding,
    encoder: BidirectionalEncoder,
    projection: OutputProjection,
}

/// Everything the forward pass computed, as needed by backpropagation
#[derive(Debug, Clone)]
pub(crate) struct ForwardTrace {
    pub forward: Vec<Vec<GruStep>>,
    pub backward: Vec<Vec<GruStep>>,
    pub context: Array3<f32>,
    pub probabilities: Array3<f32>,
}

impl BiGruModel {
    /// Creates a model with freshly initialized parameters.
    ///
    /// Weight matrices are drawn uniformly from `[-weight_stddev, weight_stddev]`
    /// (or `1/sqrt(fan_in)` when no spread is configured), biases start at zero.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If the configuration is invalid
    pub fn new<R: Rng + ?Sized>(config: ModelConfig, rng: &mut R) -> Result<Self, ModelError> {
        config.validate()?;
        let radius = config.weight_stddev;
        let embedding = Embedding::new(config.source_vocab_size, config.embed_dim, radius, rng)?;
        let encoder = BidirectionalEncoder::new(config.embed_dim, &config.n_hidden, radius, rng)?;
        let projection =
            OutputProjection::new(2 * config.top_hidden(), config.n_output, radius, rng)?;
        Ok(Self {
            config,
            embedding,
            encoder,
            projection,
        })
    }

    /// Rebuilds a model from a parameter snapshot.
    ///
    /// The key set of `registry` must equal the key set of the architecture described
    /// by `config`, and every tensor must have the shape the architecture expects.
    ///
    /// # Errors
    ///
    /// - `ModelError::MissingParameter` - If a required parameter is absent
    /// - `ModelError::UnexpectedParameter` - If `registry` holds a parameter the architecture does not have
    /// - `ModelError::InputValidationError` - If the configuration is invalid or a tensor has the wrong shape
    pub fn from_registry(
        config: ModelConfig,
        mut registry: ParameterRegistry,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        let embedding =
            Embedding::from_registry(config.source_vocab_size, config.embed_dim, &mut registry)?;
        let encoder =
            BidirectionalEncoder::from_registry(config.embed_dim, &config.n_hidden, &mut registry)?;
        let projection = OutputProjection::from_registry(
            2 * config.top_hidden(),
            config.n_output,
            &mut registry,
        )?;
        registry.ensure_consumed()?;
        Ok(Self {
            config,
            embedding,
            encoder,
            projection,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn encoder(&self) -> &BidirectionalEncoder {
        &self.encoder
    }

    pub fn projection(&self) -> &OutputProjection {
        &self.projection
    }

    /// Views of every trainable tensor: embedding, forward cells, backward cells, `W_o`, `b_o`
    pub fn parameters(&self) -> Vec<(ParamKey, ArrayViewD<'_, f32>)> {
        let mut params = vec![(ParamKey::Embedding, self.embedding.table().view().into_dyn())];
        for direction in [Direction::Forward, Direction::Backward] {
            for cell in self.encoder.cells(direction) {
                params.extend(cell.parameters());
            }
        }
        params.extend(self.projection.parameters());
        params
    }

    /// Mutable views of every trainable tensor, in the order of [`BiGruModel::parameters`]
    pub fn parameters_mut(&mut self) -> Vec<(ParamKey, ArrayViewMutD<'_, f32>)> {
        let mut params = vec![(
            ParamKey::Embedding,
            self.embedding.table_mut().view_mut().into_dyn(),
        )];
        for cell in self.encoder.cells_mut() {
            params.extend(cell.parameters_mut());
        }
        params.extend(self.projection.parameters_mut());
        params
    }

    /// Copies every trainable tensor into a new registry.
    ///
    /// # Errors
    ///
    /// - `ModelError::DuplicateParameter` - If two parameters share a key
    pub fn to_registry(&self) -> Result<ParameterRegistry, ModelError> {
        let mut registry = ParameterRegistry::new();
        for (key, value) in self.parameters() {
            registry.insert(key, value.to_owned())?;
        }
        Ok(registry)
    }

    /// Computes the per-timestep output distributions.
    ///
    /// # Parameters
    ///
    /// - `source` - Source ids with shape (batch, n_step_input)
    ///
    /// # Returns
    ///
    /// - `Array3<f32>` - Probabilities with shape (batch, n_step_input, n_output)
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If the batch is empty, the sequence length is
    ///   not `n_step_input`, or an id is outside the source vocabulary
    pub fn forward(&self, source: ArrayView2<usize>) -> Result<Array3<f32>, ModelError> {
        self.validate_source(source)?;
        let embedded = self.embedding.lookup(source)?;
        let context = self.encoder.encode(embedded.view())?;
        self.projection.forward(context.view())
    }

    /// Greedy decoding: the most probable output symbol at every timestep.
    ///
    /// # Returns
    ///
    /// - `Array2<usize>` - Target vocabulary ids with shape (batch, n_step_input)
    pub fn predict(&self, source: ArrayView2<usize>) -> Result<Array2<usize>, ModelError> {
        let probabilities = self.forward(source)?;
        Ok(argmax_last_axis(probabilities.view()))
    }

    /// Mean over parameter tensors of their mean squared value
    pub fn regularizer(&self) -> Result<f32, ModelError> {
        l2_regularizer(self.parameters().into_iter().map(|(_, value)| value))
    }

    /// Evaluates cost, loss and regularizer on one batch without changing any parameter.
    ///
    /// # Parameters
    ///
    /// - `source` - Source ids with shape (batch, n_step_input)
    /// - `target` - One-hot targets with shape (batch, n_step_input, n_output)
    /// - `gamma` - Weight of the regularizer
    pub fn cost(
        &self,
        source: ArrayView2<usize>,
        target: ArrayView3<f32>,
        gamma: f32,
    ) -> Result<Cost, ModelError> {
        let probabilities = self.forward(source)?;
        let loss = CategoricalCrossEntropy::new().compute_loss(target, probabilities.view())?;
        Cost::combine(loss, self.regularizer()?, gamma)
    }

    /// Forward pass that keeps every intermediate value
    pub(crate) fn trace(&self, source: ArrayView2<usize>) -> Result<ForwardTrace, ModelError> {
        self.validate_source(source)?;
        let embedded = self.embedding.lookup(source)?;
        let embedded = embedded.view();
        let (forward, backward) = rayon::join(
            || trace_encoder_layers(embedded, self.encoder.forward_cells(), false),
            || trace_encoder_layers(embedded, self.encoder.backward_cells(), true),
        );
        let forward = forward?;
        let backward = backward?;

        let hidden = |steps: &[GruStep]| steps.iter().map(|s| s.h.clone()).collect::<Vec<_>>();
        let context = bidirectional_context(
            &hidden(top_layer(&forward)?),
            &hidden(top_layer(&backward)?),
        )?;
        let probabilities = self.projection.forward(context.view())?;
        Ok(ForwardTrace {
            forward,
            backward,
            context,
            probabilities,
        })
    }

    fn validate_source(&self, source: ArrayView2<usize>) -> Result<(), ModelError> {
        let (batch, steps) = source.dim();
        if batch == 0 {
            return Err(ModelError::InputValidationError(
                "source batch is empty".to_string(),
            ));
        }
        if steps != self.config.n_step_input {
            return Err(ModelError::InputValidationError(format!(
                "source sequences have {} steps, expected {}",
                steps, self.config.n_step_input
            )));
        }
        Ok(())
    }
}
