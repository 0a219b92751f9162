use super::*;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::str::FromStr;

/// Direction in which an encoder stack reads the input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Checkpoint scope name of the stack reading in this direction
    pub fn scope(&self) -> &'static str {
        match self {
            Direction::Forward => "encoder",
            Direction::Backward => "encoder_r",
        }
    }
}

/// Identifies one GRU cell instance: its direction and its layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub direction: Direction,
    pub layer: usize,
}

impl CellId {
    pub fn new(direction: Direction, layer: usize) -> Self {
        Self { direction, layer }
    }

    /// Key of one of this cell's six parameters
    pub fn key(&self, param: CellParam) -> ParamKey {
        ParamKey::Cell {
            direction: self.direction,
            layer: self.layer,
            param,
        }
    }
}

/// The six parameters owned by a GRU cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellParam {
    UpdateWeight,
    UpdateBias,
    ResetWeight,
    ResetBias,
    CandidateWeight,
    CandidateBias,
}

impl CellParam {
    pub const ALL: [CellParam; 6] = [
        CellParam::UpdateWeight,
        CellParam::UpdateBias,
        CellParam::ResetWeight,
        CellParam::ResetBias,
        CellParam::CandidateWeight,
        CellParam::CandidateBias,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CellParam::UpdateWeight => "W_z",
            CellParam::UpdateBias => "b_z",
            CellParam::ResetWeight => "W_r",
            CellParam::ResetBias => "b_r",
            CellParam::CandidateWeight => "W_c",
            CellParam::CandidateBias => "b_c",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        CellParam::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Structured name of a trainable parameter.
///
/// The textual form (used as the checkpoint key) is `embedding`, `W_o`, `b_o`, or
/// `<scope>:<layer>/<gate param>` for GRU cells, e.g. `encoder:0/W_z` or `encoder_r:1/b_c`.
///
/// # Examples
/// ```rust
/// use hanzi_bigru::neural_network::parameter::{CellParam, Direction, ParamKey};
///
/// let key = ParamKey::Cell { direction: Direction::Backward, layer: 1, param: CellParam::ResetBias };
/// assert_eq!(key.to_string(), "encoder_r:1/b_r");
/// assert_eq!("encoder_r:1/b_r".parse::<ParamKey>().unwrap(), key);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    Embedding,
    Cell {
        direction: Direction,
        layer: usize,
        param: CellParam,
    },
    OutputWeight,
    OutputBias,
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Embedding => write!(f, "embedding"),
            ParamKey::Cell {
                direction,
                layer,
                param,
            } => write!(f, "{}:{}/{}", direction.scope(), layer, param.name()),
            ParamKey::OutputWeight => write!(f, "W_o"),
            ParamKey::OutputBias => write!(f, "b_o"),
        }
    }
}

impl FromStr for ParamKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "embedding" => return Ok(ParamKey::Embedding),
            "W_o" => return Ok(ParamKey::OutputWeight),
            "b_o" => return Ok(ParamKey::OutputBias),
            _ => {}
        }
        let unexpected = || ModelError::UnexpectedParameter(s.to_string());
        let (scope, rest) = s.split_once(':').ok_or_else(unexpected)?;
        let (layer, name) = rest.split_once('/').ok_or_else(unexpected)?;
        let direction = match scope {
            "encoder" => Direction::Forward,
            "encoder_r" => Direction::Backward,
            _ => return Err(unexpected()),
        };
        let layer = layer.parse::<usize>().map_err(|_| unexpected())?;
        let param = CellParam::from_name(name).ok_or_else(unexpected)?;
        Ok(ParamKey::Cell {
            direction,
            layer,
            param,
        })
    }
}

/// An owned collection of named parameter tensors.
///
/// Used for parameter snapshots (checkpoints), restore-time lookup and gradients.
/// Keys are unique: [`ParameterRegistry::insert`] fails instead of overwriting, and
/// the iteration order is the `ParamKey` order, so serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterRegistry {
    entries: BTreeMap<ParamKey, Tensor>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tensor under `key`.
    ///
    /// # Errors
    ///
    /// - `ModelError::DuplicateParameter` - If `key` is already registered; the registry is left unchanged
    pub fn insert(&mut self, key: ParamKey, value: Tensor) -> Result<(), ModelError> {
        match self.entries.entry(key) {
            btree_map::Entry::Occupied(_) => Err(ModelError::DuplicateParameter(key)),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// Moves every entry of `other` into this registry, failing on the first shared key.
    pub fn merge(&mut self, other: ParameterRegistry) -> Result<(), ModelError> {
        if let Some(key) = other.entries.keys().find(|k| self.entries.contains_key(*k)) {
            return Err(ModelError::DuplicateParameter(*key));
        }
        self.entries.extend(other.entries);
        Ok(())
    }

    pub fn get(&self, key: &ParamKey) -> Option<&Tensor> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &ParamKey) -> Option<&mut Tensor> {
        self.entries.get_mut(key)
    }

    /// Adds `delta` element-wise to the tensor stored under `key`.
    ///
    /// # Errors
    ///
    /// - `ModelError::MissingParameter` - If `key` is not registered
    /// - `ModelError::InputValidationError` - If `delta` has a different shape
    pub fn accumulate(&mut self, key: ParamKey, delta: &Tensor) -> Result<(), ModelError> {
        let tensor = self
            .entries
            .get_mut(&key)
            .ok_or(ModelError::MissingParameter(key))?;
        check_shape(&key, delta, tensor.shape())?;
        *tensor += delta;
        Ok(())
    }

    pub fn contains(&self, key: &ParamKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ParamKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &Tensor)> {
        self.entries.iter()
    }

    /// Removes and returns the tensor stored under `key`.
    ///
    /// # Errors
    ///
    /// - `ModelError::MissingParameter` - If `key` is not registered
    pub fn take(&mut self, key: ParamKey) -> Result<Tensor, ModelError> {
        self.entries
            .remove(&key)
            .ok_or(ModelError::MissingParameter(key))
    }

    /// Removes a matrix parameter and checks its shape.
    ///
    /// # Errors
    ///
    /// - `ModelError::MissingParameter` - If `key` is not registered
    /// - `ModelError::InputValidationError` - If the stored tensor is not a `rows x cols` matrix
    pub fn take_matrix(
        &mut self,
        key: ParamKey,
        rows: usize,
        cols: usize,
    ) -> Result<Array2<f32>, ModelError> {
        let tensor = self.take(key)?;
        check_shape(&key, &tensor, &[rows, cols])?;
        tensor
            .into_dimensionality::<Ix2>()
            .map_err(|e| ModelError::ProcessingError(format!("{}: {}", key, e)))
    }

    /// Removes a vector parameter and checks its length.
    ///
    /// # Errors
    ///
    /// - `ModelError::MissingParameter` - If `key` is not registered
    /// - `ModelError::InputValidationError` - If the stored tensor is not a vector of length `len`
    pub fn take_vector(&mut self, key: ParamKey, len: usize) -> Result<Array1<f32>, ModelError> {
        let tensor = self.take(key)?;
        check_shape(&key, &tensor, &[len])?;
        tensor
            .into_dimensionality::<Ix1>()
            .map_err(|e| ModelError::ProcessingError(format!("{}: {}", key, e)))
    }

    /// Fails with `UnexpectedParameter` if any entry is left, used after a restore
    /// has taken every parameter the architecture needs.
    pub fn ensure_consumed(&self) -> Result<(), ModelError> {
        match self.entries.keys().next() {
            Some(key) => Err(ModelError::UnexpectedParameter(key.to_string())),
            None => Ok(()),
        }
    }
}

impl IntoIterator for ParameterRegistry {
    type Item = (ParamKey, Tensor);
    type IntoIter = btree_map::IntoIter<ParamKey, Tensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn check_shape(key: &ParamKey, tensor: &Tensor, expected: &[usize]) -> Result<(), ModelError> {
    if tensor.shape() != expected {
        return Err(ModelError::InputValidationError(format!(
            "parameter `{}` has shape {:?}, expected {:?}",
            key,
            tensor.shape(),
            expected
        )));
    }
    Ok(())
}
