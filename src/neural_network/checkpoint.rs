use super::*;
use crate::error::IoError;
use ndarray::ArrayViewD;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{from_reader, to_writer};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Serializable representation of one parameter tensor.
///
/// # Fields
///
/// - `shape` - Original tensor shape used to rebuild the array
/// - `values` - Tensor values flattened in row-major order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableParameter {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl SerializableParameter {
    pub fn from_view(value: ArrayViewD<f32>) -> Self {
        Self {
            shape: value.shape().to_vec(),
            values: value.iter().copied().collect(),
        }
    }

    /// Rebuilds the tensor.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `values` does not fill `shape`
    pub fn to_tensor(&self, name: &str) -> Result<Tensor, ModelError> {
        Tensor::from_shape_vec(self.shape.as_slice(), self.values.clone()).map_err(|e| {
            ModelError::InputValidationError(format!(
                "parameter `{}` cannot be rebuilt with shape {:?}: {}",
                name, self.shape, e
            ))
        })
    }
}

/// Distinguishes periodic snapshots from the snapshot written after training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointLabel {
    Iteration(usize),
    Final,
}

impl CheckpointLabel {
    /// `parameters_<iteration>.json` or `parameters_final.json`
    pub fn file_name(&self) -> String {
        match self {
            CheckpointLabel::Iteration(i) => format!("parameters_{}.json", i),
            CheckpointLabel::Final => "parameters_final.json".to_string(),
        }
    }
}

/// A persisted snapshot of every trainable parameter.
///
/// Keys are the textual form of [`ParamKey`] (`embedding`, `encoder:0/W_z`,
/// `encoder_r:0/b_c`, `W_o`, ...), values are shaped arrays.
///
/// # Examples
/// ```rust,no_run
/// use hanzi_bigru::neural_network::{Checkpoint, CheckpointLabel, ParameterRegistry, ParamKey};
/// use ndarray::ArrayD;
///
/// let mut registry = ParameterRegistry::new();
/// registry.insert(ParamKey::OutputBias, ArrayD::zeros(vec![3])).unwrap();
///
/// let checkpoint = Checkpoint::from_registry(CheckpointLabel::Iteration(200), &registry);
/// let path = checkpoint.save_in_dir("models").unwrap();
/// assert!(path.ends_with("parameters_200.json"));
///
/// let restored = Checkpoint::load_from_path(&path).unwrap().into_registry().unwrap();
/// assert_eq!(restored, registry);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Training iteration the snapshot was taken at, `None` for the final snapshot
    pub iteration: Option<usize>,
    /// Parameter name to tensor; a file that repeats a name is rejected on load
    #[serde(deserialize_with = "deserialize_unique_parameters")]
    pub parameters: BTreeMap<String, SerializableParameter>,
}

/// Reads the `parameters` object, failing on a repeated name instead of keeping the last one.
fn deserialize_unique_parameters<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, SerializableParameter>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueParameters;

    impl<'de> Visitor<'de> for UniqueParameters {
        type Value = BTreeMap<String, SerializableParameter>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map from parameter names to shaped tensors")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut parameters = BTreeMap::new();
            while let Some((name, parameter)) = map.next_entry::<String, SerializableParameter>()? {
                if parameters.contains_key(&name) {
                    return Err(de::Error::custom(format!(
                        "parameter `{}` appears more than once",
                        name
                    )));
                }
                parameters.insert(name, parameter);
            }
            Ok(parameters)
        }
    }

    deserializer.deserialize_map(UniqueParameters)
}

impl Checkpoint {
    /// Snapshots every tensor of `registry`
    pub fn from_registry(label: CheckpointLabel, registry: &ParameterRegistry) -> Self {
        Self::from_views(
            label,
            registry.iter().map(|(key, value)| (*key, value.view())),
        )
    }

    /// Snapshots the current parameters of `model`
    pub fn from_model(label: CheckpointLabel, model: &BiGruModel) -> Self {
        Self::from_views(label, model.parameters())
    }

    fn from_views<'a, I>(label: CheckpointLabel, views: I) -> Self
    where
        I: IntoIterator<Item = (ParamKey, ArrayViewD<'a, f32>)>,
    {
        let parameters = views
            .into_iter()
            .map(|(key, value)| (key.to_string(), SerializableParameter::from_view(value)))
            .collect();
        let iteration = match label {
            CheckpointLabel::Iteration(i) => Some(i),
            CheckpointLabel::Final => None,
        };
        Self {
            iteration,
            parameters,
        }
    }

    pub fn label(&self) -> CheckpointLabel {
        match self.iteration {
            Some(i) => CheckpointLabel::Iteration(i),
            None => CheckpointLabel::Final,
        }
    }

    /// Converts the snapshot back into a registry.
    ///
    /// # Errors
    ///
    /// - `ModelError::UnexpectedParameter` - If a key is not a valid parameter name
    /// - `ModelError::DuplicateParameter` - If two keys name the same parameter
    /// - `ModelError::InputValidationError` - If a tensor cannot be rebuilt from its shape
    pub fn into_registry(self) -> Result<ParameterRegistry, ModelError> {
        let mut registry = ParameterRegistry::new();
        for (name, parameter) in &self.parameters {
            let key = name.parse::<ParamKey>()?;
            registry.insert(key, parameter.to_tensor(name)?)?;
        }
        Ok(registry)
    }

    /// Saves the checkpoint as JSON.
    ///
    /// # Parameters
    ///
    /// * `path` - File path where the checkpoint will be written
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Checkpoint successfully saved to file
    /// - `Err(IoError::StdIoError)` - File creation or write operation failed
    /// - `Err(IoError::JsonError)` - Serialization to JSON failed
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        let mut writer = IoError::create_buf_writer(path)?;
        to_writer(&mut writer, self).map_err(IoError::JsonError)?;
        writer.flush().map_err(IoError::StdIoError)?;
        Ok(())
    }

    /// Saves the checkpoint under its standard file name inside `dir`, creating `dir` if needed.
    ///
    /// # Returns
    ///
    /// - `PathBuf` - The path that was written
    pub fn save_in_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, IoError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(IoError::StdIoError)?;
        let path = dir.join(self.label().file_name());
        self.save_to_path(&path)?;
        Ok(path)
    }

    /// Loads a checkpoint written by [`Checkpoint::save_to_path`].
    ///
    /// # Errors
    ///
    /// - `IoError::StdIoError` - The file cannot be opened
    /// - `IoError::JsonError` - The file is not a checkpoint, or names a parameter twice
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        from_reader(reader).map_err(IoError::JsonError)
    }
}
