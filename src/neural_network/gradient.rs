use super::*;

/// Exact reverse-mode differentiation of [`BiGruModel`]'s training cost.
///
/// The gradient flows from the softmax logits through the shared projection, is split
/// into the forward and the (mirrored) backward stack, propagated through time and
/// through the stacked layers of each direction, and finally scatter-added onto the
/// embedding rows that were looked up. The regularizer term `gamma * mean(mean(p^2))`
/// contributes `gamma * 2p / (p.len() * n_tensors)` to every tensor.
///
/// # Examples
/// ```rust
/// use hanzi_bigru::config::ModelConfig;
/// use hanzi_bigru::neural_network::{Backpropagation, BiGruModel, GradientEngine, ParamKey};
/// use ndarray::{Array3, array};
/// use ndarray_rand::rand::SeedableRng;
/// use ndarray_rand::rand::rngs::StdRng;
///
/// let config = ModelConfig {
///     source_vocab_size: 3,
///     embed_dim: 2,
///     n_output: 3,
///     n_step_input: 2,
///     n_hidden: vec![3],
///     weight_stddev: Some(0.5),
/// };
/// let model = BiGruModel::new(config, &mut StdRng::seed_from_u64(5)).unwrap();
///
/// let source = array![[1, 2]];
/// let mut target = Array3::<f32>::zeros((1, 2, 3));
/// target[[0, 0, 2]] = 1.0;
/// target[[0, 1, 0]] = 1.0;
///
/// let (cost, grads) = Backpropagation::new()
///     .gradients(&model, source.view(), target.view(), 1.0)
///     .unwrap();
/// assert!(cost.cost > cost.loss);
/// assert_eq!(grads.len(), model.parameters().len());
/// assert_eq!(grads.get(&ParamKey::Embedding).unwrap().shape(), &[3, 2]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Backpropagation {
    loss: CategoricalCrossEntropy,
}

impl Backpropagation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GradientEngine for Backpropagation {
    fn gradients(
        &self,
        model: &BiGruModel,
        source: ArrayView2<usize>,
        target: ArrayView3<f32>,
        gamma: f32,
    ) -> Result<(Cost, ParameterRegistry), ModelError> {
        let trace = model.trace(source)?;
        let probabilities = trace.probabilities.view();

        let loss = self.loss.compute_loss(target, probabilities)?;
        let cost = Cost::combine(loss, model.regularizer()?, gamma)?;

        let grad_logits = self.loss.compute_logit_grad(target, probabilities)?;
        let projection = model
            .projection()
            .backward(trace.context.view(), grad_logits.view())?;

        let encoder = model.encoder();
        let (grad_forward_top, grad_backward_top) =
            split_context_gradient(projection.context.view(), encoder.top_hidden());
        let (forward, backward) = rayon::join(
            || {
                backward_encoder_layers(
                    encoder.forward_cells(),
                    &trace.forward,
                    grad_forward_top,
                    false,
                )
            },
            || {
                backward_encoder_layers(
                    encoder.backward_cells(),
                    &trace.backward,
                    grad_backward_top,
                    true,
                )
            },
        );
        let (forward_grads, grad_embedded) = forward?;
        let (backward_grads, grad_embedded_reversed) = backward?;
        let grad_embedded = grad_embedded + &grad_embedded_reversed;
        let grad_table = model.embedding().backward(source, grad_embedded.view())?;

        let mut gradients = ParameterRegistry::new();
        gradients.insert(ParamKey::Embedding, grad_table.into_dyn())?;
        for cell_grads in forward_grads.into_iter().chain(backward_grads) {
            cell_grads.into_registry(&mut gradients)?;
        }
        gradients.insert(ParamKey::OutputWeight, projection.weight.into_dyn())?;
        gradients.insert(ParamKey::OutputBias, projection.bias.into_dyn())?;

        let parameters = model.parameters();
        let n_tensors = parameters.len();
        for (key, value) in parameters {
            gradients.accumulate(key, &l2_regularizer_grad(value, n_tensors, gamma))?;
        }

        Ok((cost, gradients))
    }
}
