use crate::error::IoError;
use crate::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::from_reader;
use std::path::{Path, PathBuf};

/// Architecture of the bidirectional GRU transliteration model.
///
/// # Fields
///
/// - `source_vocab_size` - Number of symbols in the pinyin alphabet (filler included)
/// - `embed_dim` - Width of the source embedding vectors
/// - `n_output` - Number of symbols in the hanzi alphabet (filler and boundary included)
/// - `n_step_input` - Fixed, aligned sequence length of every source/target pair
/// - `n_hidden` - Hidden size of each stacked GRU layer, bottom first
/// - `weight_stddev` - Radius of the uniform weight initialization; `None` falls back to `1/sqrt(fan_in)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub source_vocab_size: usize,
    pub embed_dim: usize,
    pub n_output: usize,
    pub n_step_input: usize,
    pub n_hidden: Vec<usize>,
    pub weight_stddev: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source_vocab_size: 28,
            embed_dim: 56,
            n_output: 1104,
            n_step_input: 44,
            n_hidden: vec![256],
            weight_stddev: Some(0.1),
        }
    }
}

impl ModelConfig {
    /// Number of stacked layers in each encoder direction
    pub fn n_layer(&self) -> usize {
        self.n_hidden.len()
    }

    /// Hidden width of the top GRU layer
    pub fn top_hidden(&self) -> usize {
        self.n_hidden.last().copied().unwrap_or(0)
    }

    /// Checks that every dimension is usable.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If a size is zero, no layer is configured,
    ///   or `weight_stddev` is not a positive finite number
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_positive(self.source_vocab_size, "source_vocab_size")?;
        validate_positive(self.embed_dim, "embed_dim")?;
        validate_positive(self.n_output, "n_output")?;
        validate_positive(self.n_step_input, "n_step_input")?;
        if self.n_hidden.is_empty() {
            return Err(ModelError::InputValidationError(
                "n_hidden must contain at least one layer size".to_string(),
            ));
        }
        for (l, &units) in self.n_hidden.iter().enumerate() {
            validate_positive(units, &format!("n_hidden[{}]", l))?;
        }
        if let Some(radius) = self.weight_stddev {
            if !(radius > 0.0 && radius.is_finite()) {
                return Err(ModelError::InputValidationError(format!(
                    "weight_stddev must be positive and finite, got {}",
                    radius
                )));
            }
        }
        Ok(())
    }
}

/// Hyperparameters of the training loop and its Adam optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub n_epoch: usize,
    pub batch_size: usize,
    pub validation_steps: usize,
    pub save_param_steps: usize,
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    /// Weight of the L2 regularizer in the total cost
    pub gamma: f32,
    /// Log cost/loss/regularizer after every batch
    pub verbose: bool,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_epoch: 10,
            batch_size: 100,
            validation_steps: 100,
            save_param_steps: 100,
            learning_rate: 1e-2,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            gamma: 1.0,
            verbose: false,
            seed: 1001,
        }
    }
}

impl TrainingConfig {
    /// Checks the loop intervals and optimizer settings.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If an interval or the batch size is zero,
    ///   the learning rate is not positive, or `gamma` is negative
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_positive(self.batch_size, "batch_size")?;
        validate_positive(self.validation_steps, "validation_steps")?;
        validate_positive(self.save_param_steps, "save_param_steps")?;
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ModelError::InputValidationError(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if !(self.gamma >= 0.0 && self.gamma.is_finite()) {
            return Err(ModelError::InputValidationError(format!(
                "gamma must be non-negative and finite, got {}",
                self.gamma
            )));
        }
        Ok(())
    }
}

/// Reserved symbols and the padded length of free-text inputs.
///
/// # Fields
///
/// - `filler` - Padding symbol, removed everywhere from decoded output
/// - `boundary` - Sentence boundary symbol, removed only from both ends of decoded output
/// - `aligned_input_len` - Length free-text pinyin is padded to before inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolConfig {
    pub filler: char,
    pub boundary: char,
    pub aligned_input_len: usize,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            filler: '#',
            boundary: '.',
            aligned_input_len: 44,
        }
    }
}

/// Locations of the input files and the checkpoint directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub vocab_file: PathBuf,
    pub dataset_file: PathBuf,
    pub model_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            vocab_file: PathBuf::from("dataset/vocab.json"),
            dataset_file: PathBuf::from("dataset/dataset_split.json"),
            model_dir: PathBuf::from("models"),
        }
    }
}

/// Complete configuration of one experiment, loadable from a JSON file.
///
/// Every section and field is optional in the file; missing values take the defaults.
///
/// # Examples
/// ```rust
/// use hanzi_bigru::config::ExperimentConfig;
///
/// let config: ExperimentConfig =
///     serde_json::from_str(r#"{ "model": { "n_hidden": [64, 64] } }"#).unwrap();
/// assert_eq!(config.model.n_layer(), 2);
/// assert_eq!(config.training.batch_size, 100);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub symbols: SymbolConfig,
    pub paths: PathConfig,
}

impl ExperimentConfig {
    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// - `IoError::StdIoError` - The file cannot be opened
    /// - `IoError::JsonError` - The file is not valid configuration JSON
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        from_reader(reader).map_err(IoError::JsonError)
    }

    /// Validates every section, and that free-text inputs are padded to the model's sequence length.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.model.validate()?;
        self.training.validate()?;
        if self.symbols.filler == self.symbols.boundary {
            return Err(ModelError::InputValidationError(
                "filler and boundary symbols must differ".to_string(),
            ));
        }
        if self.symbols.aligned_input_len != self.model.n_step_input {
            return Err(ModelError::InputValidationError(format!(
                "aligned_input_len ({}) must equal n_step_input ({})",
                self.symbols.aligned_input_len, self.model.n_step_input
            )));
        }
        Ok(())
    }
}

fn validate_positive(value: usize, name: &str) -> Result<(), ModelError> {
    if value == 0 {
        return Err(ModelError::InputValidationError(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(())
}
