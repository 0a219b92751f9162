use super::*;
use crate::config::TrainingConfig;
use crate::dataset::{AlignedPair, DatasetSplit, VocabularyPair, prepare_data};
use crate::error::PipelineError;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};

/// Iteration count and the periodic validation/checkpoint triggers of a training run.
///
/// # Examples
/// ```rust
/// use hanzi_bigru::neural_network::TrainingSchedule;
///
/// let schedule = TrainingSchedule::new(1, 1000, 100, 100, 100).unwrap();
/// assert_eq!(schedule.total_iterations(), 10);
/// assert!(schedule.should_validate(0));
/// assert!(!(1..10).any(|i| schedule.should_validate(i)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingSchedule {
    total_iterations: usize,
    validation_steps: usize,
    save_param_steps: usize,
}

impl TrainingSchedule {
    /// Creates a schedule of `floor(n_epoch * n_train / batch_size)` iterations.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `batch_size` or an interval is 0
    pub fn new(
        n_epoch: usize,
        n_train: usize,
        batch_size: usize,
        validation_steps: usize,
        save_param_steps: usize,
    ) -> Result<Self, ModelError> {
        for (value, name) in [
            (batch_size, "batch_size"),
            (validation_steps, "validation_steps"),
            (save_param_steps, "save_param_steps"),
        ] {
            if value == 0 {
                return Err(ModelError::InputValidationError(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        Ok(Self {
            total_iterations: n_epoch * n_train / batch_size,
            validation_steps,
            save_param_steps,
        })
    }

    pub fn from_config(config: &TrainingConfig, n_train: usize) -> Result<Self, ModelError> {
        Self::new(
            config.n_epoch,
            n_train,
            config.batch_size,
            config.validation_steps,
            config.save_param_steps,
        )
    }

    pub fn total_iterations(&self) -> usize {
        self.total_iterations
    }

    /// Whether the validation set is evaluated before iteration `i`
    pub fn should_validate(&self, i: usize) -> bool {
        i % self.validation_steps == 0
    }

    /// Whether the parameters are saved before iteration `i`
    pub fn should_checkpoint(&self, i: usize) -> bool {
        i % self.save_param_steps == 0
    }
}

/// Summary of a completed training run.
///
/// # Fields
///
/// - `iterations` - Number of optimizer steps applied
/// - `samples_seen` - Total number of training samples fed in
/// - `validation_history` - `(iteration, cost)` of every validation point
/// - `last_batch_cost` - Cost of the final training batch, if any step ran
/// - `test_loss` - Cross-entropy on the test set with the final parameters
/// - `final_checkpoint` - Path of `parameters_final.json`
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub iterations: usize,
    pub samples_seen: usize,
    pub validation_history: Vec<(usize, Cost)>,
    pub last_batch_cost: Option<Cost>,
    pub test_loss: Option<f32>,
    pub final_checkpoint: PathBuf,
}

/// Evaluates cost, loss and regularizer on a whole set without touching the parameters.
///
/// The set is encoded and run in chunks of `chunk_size` pairs so the one-hot targets of
/// a large set never exist at once; the loss is still the mean over every sample and timestep.
///
/// # Errors
///
/// - `ModelError::InputValidationError` - If `pairs` is empty, `chunk_size` is 0, or a pair is malformed
pub fn evaluate_cost(
    model: &BiGruModel,
    pairs: &[AlignedPair],
    vocab: &VocabularyPair,
    gamma: f32,
    chunk_size: usize,
) -> Result<Cost, ModelError> {
    if pairs.is_empty() || chunk_size == 0 {
        return Err(ModelError::InputValidationError(
            "cannot evaluate an empty set".to_string(),
        ));
    }
    let n_step = model.config().n_step_input;
    let loss_function = CategoricalCrossEntropy::new();
    let mut total = 0.0;
    for chunk in pairs.chunks(chunk_size) {
        let (source, target) = prepare_data(chunk, vocab, n_step)?;
        let probabilities = model.forward(source.view())?;
        total += loss_function.summed_loss(target.view(), probabilities.view())?;
    }
    let loss = total / (pairs.len() * n_step) as f32;
    Cost::combine(loss, model.regularizer()?, gamma)
}

/// Mini-batch training loop.
///
/// Each iteration samples a batch, computes the cost and its gradient with the
/// [`GradientEngine`] and applies one [`Optimizer`] step. Validation and checkpoints
/// run before the iterations selected by the [`TrainingSchedule`].
pub struct Trainer<E: GradientEngine = Backpropagation, O: Optimizer = Adam> {
    config: TrainingConfig,
    model_dir: PathBuf,
    engine: E,
    optimizer: O,
    rng: StdRng,
    show_progress: bool,
}

impl Trainer<Backpropagation, Adam> {
    /// Creates a trainer using backpropagation and Adam configured from `config`.
    ///
    /// # Parameters
    ///
    /// - `config` - Training hyperparameters
    /// - `model_dir` - Directory receiving the checkpoint files
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `config` is invalid
    pub fn new<P: Into<PathBuf>>(config: TrainingConfig, model_dir: P) -> Result<Self, ModelError> {
        config.validate()?;
        let optimizer = Adam::from_config(&config)?;
        Ok(Self::with_parts(
            config,
            model_dir,
            Backpropagation::new(),
            optimizer,
        ))
    }
}

impl<E: GradientEngine, O: Optimizer> Trainer<E, O> {
    /// Creates a trainer with a custom gradient engine and optimizer
    pub fn with_parts<P: Into<PathBuf>>(
        config: TrainingConfig,
        model_dir: P,
        engine: E,
        optimizer: O,
    ) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            model_dir: model_dir.into(),
            engine,
            optimizer,
            rng,
            show_progress: true,
        }
    }

    /// Enables or disables the terminal progress bar
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// Draws the indices of one batch.
    ///
    /// A fresh random permutation of `0..n_train` is truncated to `batch_size`, so a
    /// batch never repeats an index but consecutive batches may overlap.
    pub fn sample_batch(&mut self, n_train: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n_train).collect();
        indices.shuffle(&mut self.rng);
        indices.truncate(self.config.batch_size);
        indices
    }

    /// Applies one optimizer step on `pairs`.
    ///
    /// # Returns
    ///
    /// - `Cost` - The cost of the batch before the update
    pub fn train_step(
        &mut self,
        model: &mut BiGruModel,
        pairs: &[AlignedPair],
        vocab: &VocabularyPair,
    ) -> Result<Cost, ModelError> {
        let (source, target) = prepare_data(pairs, vocab, model.config().n_step_input)?;
        let (cost, gradients) =
            self.engine
                .gradients(model, source.view(), target.view(), self.config.gamma)?;
        self.optimizer.step(model, &gradients)?;
        Ok(cost)
    }

    /// Runs the complete training loop.
    ///
    /// Before iteration `i` the validation set is evaluated when `i % validation_steps == 0`
    /// and the parameters are saved as `parameters_<i>.json` when `i % save_param_steps == 0`.
    /// After the last iteration `parameters_final.json` is written and the test loss is
    /// computed with the live parameters.
    ///
    /// # Parameters
    ///
    /// - `model` - The model to train in place
    /// - `dataset` - Train, validation and test pairs
    /// - `vocab` - Source and target vocabularies
    ///
    /// # Errors
    ///
    /// - `PipelineError::Model` - If the dataset is malformed or a numerical failure occurs
    /// - `PipelineError::Io` - If a checkpoint cannot be written
    pub fn fit(
        &mut self,
        model: &mut BiGruModel,
        dataset: &DatasetSplit,
        vocab: &VocabularyPair,
    ) -> Result<TrainingReport, PipelineError> {
        dataset.validate(model.config().n_step_input, vocab)?;
        let n_train = dataset.train.len();
        let schedule = TrainingSchedule::from_config(&self.config, n_train)?;
        let total = schedule.total_iterations();
        info!(
            "{} training samples, {} validation samples, {} test samples",
            n_train,
            dataset.validation.len(),
            dataset.test.len()
        );
        if dataset.validation.is_empty() {
            warn!("validation set is empty, validation points will be skipped");
        }

        let progress_bar = if self.show_progress {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} | Cost: {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        let mut samples_seen = 0;
        let mut validation_history = Vec::new();
        let mut last_batch_cost = None;

        for i in 0..total {
            if schedule.should_validate(i) && !dataset.validation.is_empty() {
                let cost = evaluate_cost(
                    model,
                    &dataset.validation,
                    vocab,
                    self.config.gamma,
                    self.config.batch_size,
                )?;
                info!(
                    "{} samples fed in: validation: {} samples, {}",
                    samples_seen,
                    dataset.validation.len(),
                    cost
                );
                validation_history.push((i, cost));
            }

            if schedule.should_checkpoint(i) {
                let path = Checkpoint::from_model(CheckpointLabel::Iteration(i), model)
                    .save_in_dir(&self.model_dir)?;
                debug!("saved parameters to {}", path.display());
            }

            let batch: Vec<AlignedPair> = self
                .sample_batch(n_train)
                .into_iter()
                .map(|k| dataset.train[k].clone())
                .collect();
            let cost = self.train_step(model, &batch, vocab)?;
            if self.config.verbose {
                info!("{}-th batch, {}", i, cost);
            }
            samples_seen += batch.len();
            last_batch_cost = Some(cost);

            progress_bar.set_message(format!("{:.5}", cost.cost));
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        let final_checkpoint = Checkpoint::from_model(CheckpointLabel::Final, model)
            .save_in_dir(&self.model_dir)?;
        info!("saved final parameters to {}", final_checkpoint.display());

        let test_loss = if dataset.test.is_empty() {
            warn!("test set is empty, skipping test loss");
            None
        } else {
            let cost = evaluate_cost(
                model,
                &dataset.test,
                vocab,
                self.config.gamma,
                self.config.batch_size,
            )?;
            info!(
                "test set: {} samples, loss {:.8}",
                dataset.test.len(),
                cost.loss
            );
            Some(cost.loss)
        };

        Ok(TrainingReport {
            iterations: total,
            samples_seen,
            validation_history,
            last_batch_cost,
            test_loss,
            final_checkpoint,
        })
    }
}
