use super::*;
use crate::config::TrainingConfig;

/// Adam optimizer implementation.
///
/// An optimization algorithm that computes individual adaptive learning
/// rates for different parameters from estimates of first and second moments
/// of the gradients. Moment state is kept per [`ParamKey`] and created lazily,
/// zero-initialized, on the first step that sees the parameter.
///
/// # Examples
/// ```rust
/// use hanzi_bigru::neural_network::Adam;
///
/// let adam = Adam::new(1e-2, 0.9, 0.999, 1e-8).unwrap();
/// assert_eq!(adam.timestep(), 0);
/// assert!(Adam::new(1e-2, 1.0, 0.999, 1e-8).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Adam {
    /// Learning rate controlling the size of parameter updates.
    learning_rate: f32,
    /// Exponential decay rate for the first moment estimates.
    beta1: f32,
    /// Exponential decay rate for the second moment estimates.
    beta2: f32,
    /// Small constant added for numerical stability.
    epsilon: f32,
    /// Current timestep, incremented with each update.
    t: u64,
    states: AHashMap<ParamKey, AdamStates>,
}

impl Adam {
    /// Creates a new Adam optimizer with the specified parameters.
    ///
    /// # Parameters
    ///
    /// - `learning_rate` - Step size for parameter updates
    /// - `beta1` - Decay rate for the first moment estimates (typically 0.9)
    /// - `beta2` - Decay rate for the second moment estimates (typically 0.999)
    /// - `epsilon` - Small constant for numerical stability (typically 1e-8)
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If a hyperparameter is out of range
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Result<Self, ModelError> {
        validate_learning_rate(learning_rate)?;
        validate_decay_rate(beta1, "beta1")?;
        validate_decay_rate(beta2, "beta2")?;
        validate_epsilon(epsilon)?;
        Ok(Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            states: AHashMap::new(),
        })
    }

    /// Creates an optimizer from the training hyperparameters
    pub fn from_config(config: &TrainingConfig) -> Result<Self, ModelError> {
        Self::new(
            config.learning_rate,
            config.beta1,
            config.beta2,
            config.epsilon,
        )
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Number of steps applied so far
    pub fn timestep(&self) -> u64 {
        self.t
    }

    /// Moment estimates of one parameter, if it has been updated at least once
    pub fn state(&self, key: &ParamKey) -> Option<&AdamStates> {
        self.states.get(key)
    }
}

impl Optimizer for Adam {
    fn step(
        &mut self,
        model: &mut BiGruModel,
        gradients: &ParameterRegistry,
    ) -> Result<(), ModelError> {
        // Reject the whole step before touching any parameter
        let parameters = model.parameters();
        for (key, value) in &parameters {
            validate_gradient(gradients, key, value.shape())?;
        }
        if gradients.len() != parameters.len() {
            let known: Vec<ParamKey> = parameters.iter().map(|(key, _)| *key).collect();
            if let Some(extra) = gradients.keys().find(|key| !known.contains(*key)) {
                return Err(ModelError::UnexpectedParameter(extra.to_string()));
            }
        }
        drop(parameters);

        self.t += 1; // Increment step count with each update
        for (key, mut value) in model.parameters_mut() {
            let grad = validate_gradient(gradients, &key, value.shape())?;
            let state = self
                .states
                .entry(key)
                .or_insert_with(|| AdamStates::new(grad.shape()));
            let update = state.update_parameter(
                grad,
                self.beta1,
                self.beta2,
                self.epsilon,
                self.t,
                self.learning_rate,
            );
            value -= &update;
        }
        Ok(())
    }
}

/// Stores and manages optimization state of one parameter tensor for the Adam optimizer algorithm.
///
/// # Fields
///
/// - `m` - First moment tensor (moving average of gradients)
/// - `v` - Second moment tensor (moving average of squared gradients)
#[derive(Debug, Clone, PartialEq)]
pub struct AdamStates {
    pub m: Tensor,
    pub v: Tensor,
}

impl AdamStates {
    /// Creates zero moment tensors of the given shape
    pub fn new(shape: &[usize]) -> Self {
        Self {
            m: Tensor::zeros(shape),
            v: Tensor::zeros(shape),
        }
    }

    /// Updates the moments with a new gradient and returns the step to subtract.
    ///
    /// # Parameters
    ///
    /// - `grad` - Gradient of the parameter
    /// - `beta1` - Exponential decay rate for first moment estimates
    /// - `beta2` - Exponential decay rate for second moment estimates
    /// - `epsilon` - Small constant added for numerical stability
    /// - `t` - Current timestep, starting at 1
    /// - `lr` - Learning rate
    ///
    /// # Returns
    ///
    /// - `Tensor` - `lr * m_hat / (sqrt(v_hat) + epsilon)`
    pub fn update_parameter(
        &mut self,
        grad: &Tensor,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        t: u64,
        lr: f32,
    ) -> Tensor {
        // Parallel update computation
        let (m_updated, v_updated) = rayon::join(
            || self.m.mapv(|x| x * beta1) + &(grad * (1.0 - beta1)),
            || self.v.mapv(|x| x * beta2) + &(grad.mapv(|x| x * x) * (1.0 - beta2)),
        );
        self.m = m_updated;
        self.v = v_updated;

        // Calculate bias-corrected states
        let t = t.min(i32::MAX as u64) as i32;
        let (m_hat, v_hat) = rayon::join(
            || self.m.mapv(|x| x / (1.0 - beta1.powi(t))),
            || self.v.mapv(|x| x / (1.0 - beta2.powi(t))),
        );

        lr * &m_hat / &(v_hat.mapv(f32::sqrt) + epsilon)
    }
}
