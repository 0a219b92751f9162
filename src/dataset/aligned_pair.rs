use super::*;

/// A pinyin string and its hanzi transliteration, both padded to the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct AlignedPair {
    pub source: String,
    pub target: String,
}

impl AlignedPair {
    pub fn new<S: Into<String>, T: Into<String>>(source: S, target: T) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl From<(String, String)> for AlignedPair {
    fn from((source, target): (String, String)) -> Self {
        Self { source, target }
    }
}

impl From<AlignedPair> for (String, String) {
    fn from(pair: AlignedPair) -> Self {
        (pair.source, pair.target)
    }
}

/// The train, validation and test sets of aligned pairs.
///
/// Serialized as `{ "train": [[src, tgt], ...], "validation": [...], "test": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSplit {
    pub train: Vec<AlignedPair>,
    pub validation: Vec<AlignedPair>,
    pub test: Vec<AlignedPair>,
}

impl DatasetSplit {
    /// Loads a dataset split from a JSON file.
    ///
    /// # Errors
    ///
    /// - `IoError::StdIoError` - The file cannot be opened
    /// - `IoError::JsonError` - The file is not valid dataset JSON
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        from_reader(reader).map_err(IoError::JsonError)
    }

    /// Writes the split in the format read by [`DatasetSplit::load_from_path`].
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        let mut writer = IoError::create_buf_writer(path)?;
        serde_json::to_writer(&mut writer, self).map_err(IoError::JsonError)?;
        std::io::Write::flush(&mut writer).map_err(IoError::StdIoError)
    }

    /// Checks every pair of every split against the sequence length and the vocabularies.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - Naming the split and index of the first
    ///   pair whose length differs from `n_step_input` or that holds an unknown symbol
    pub fn validate(&self, n_step_input: usize, vocab: &VocabularyPair) -> Result<(), ModelError> {
        for (name, pairs) in [
            ("train", &self.train),
            ("validation", &self.validation),
            ("test", &self.test),
        ] {
            for (i, pair) in pairs.iter().enumerate() {
                validate_pair(pair, n_step_input, vocab).map_err(|e| {
                    ModelError::InputValidationError(format!("{} pair {}: {}", name, i, e))
                })?;
            }
        }
        Ok(())
    }
}

fn validate_pair(
    pair: &AlignedPair,
    n_step_input: usize,
    vocab: &VocabularyPair,
) -> Result<(), ModelError> {
    let source_len = pair.source.chars().count();
    let target_len = pair.target.chars().count();
    if source_len != n_step_input || target_len != n_step_input {
        return Err(ModelError::InputValidationError(format!(
            "expected both sides to have length {}, got source {} and target {}",
            n_step_input, source_len, target_len
        )));
    }
    for c in pair.source.chars() {
        vocab.source.index_of(c)?;
    }
    for c in pair.target.chars() {
        vocab.target.index_of(c)?;
    }
    Ok(())
}

/// Maps every symbol of `text` to its vocabulary index.
///
/// # Errors
///
/// - `ModelError::InputValidationError` - If a symbol is not in `vocab`
///
/// # Examples
/// ```rust
/// use hanzi_bigru::dataset::{Vocabulary, digitalise};
///
/// let vocab = Vocabulary::from_symbols("#ab".chars()).unwrap();
/// assert_eq!(digitalise("ba#", &vocab).unwrap().to_vec(), vec![2, 1, 0]);
/// ```
pub fn digitalise(text: &str, vocab: &Vocabulary) -> Result<Array1<usize>, ModelError> {
    text.chars()
        .map(|c| vocab.index_of(c))
        .collect::<Result<Vec<_>, _>>()
        .map(Array1::from)
}

/// One-hot encodes `text` into a `(len, vocab.len())` matrix.
///
/// # Errors
///
/// - `ModelError::InputValidationError` - If a symbol is not in `vocab`
pub fn vectorise(text: &str, vocab: &Vocabulary) -> Result<Array2<f32>, ModelError> {
    let ids = digitalise(text, vocab)?;
    let mut coding = Array2::<f32>::zeros((ids.len(), vocab.len()));
    for (k, &id) in ids.iter().enumerate() {
        coding[[k, id]] = 1.0;
    }
    Ok(coding)
}

/// Encodes a batch of aligned pairs into model inputs and training targets.
///
/// # Parameters
///
/// - `pairs` - Aligned pairs; every string must have exactly `n_step_input` symbols
/// - `vocab` - Source and target vocabularies
/// - `n_step_input` - The fixed sequence length
///
/// # Returns
///
/// - `(Array2<usize>, Array3<f32>)` - Source ids with shape (batch, n_step_input) and
///   one-hot targets with shape (batch, n_step_input, target vocabulary size)
///
/// # Errors
///
/// - `ModelError::InputValidationError` - If `pairs` is empty, a string has the wrong
///   length, or a symbol is missing from its vocabulary
pub fn prepare_data(
    pairs: &[AlignedPair],
    vocab: &VocabularyPair,
    n_step_input: usize,
) -> Result<(Array2<usize>, Array3<f32>), ModelError> {
    if pairs.is_empty() {
        return Err(ModelError::InputValidationError(
            "cannot prepare an empty batch".to_string(),
        ));
    }
    let mut source = Array2::<usize>::zeros((pairs.len(), n_step_input));
    let mut target = Array3::<f32>::zeros((pairs.len(), n_step_input, vocab.target.len()));
    for (b, pair) in pairs.iter().enumerate() {
        validate_pair(pair, n_step_input, vocab)?;
        source
            .index_axis_mut(Axis(0), b)
            .assign(&digitalise(&pair.source, &vocab.source)?);
        target
            .index_axis_mut(Axis(0), b)
            .assign(&vectorise(&pair.target, &vocab.target)?);
    }
    Ok((source, target))
}

/// Encodes only the source side of a batch, for inference.
///
/// # Errors
///
/// - `ModelError::InputValidationError` - If `sources` is empty, a string does not have
///   `n_step_input` symbols, or a symbol is missing from `vocab`
pub fn prepare_source(
    sources: &[&str],
    vocab: &Vocabulary,
    n_step_input: usize,
) -> Result<Array2<usize>, ModelError> {
    if sources.is_empty() {
        return Err(ModelError::InputValidationError(
            "cannot prepare an empty batch".to_string(),
        ));
    }
    let mut ids = Array2::<usize>::zeros((sources.len(), n_step_input));
    for (b, text) in sources.iter().enumerate() {
        let row = digitalise(text, vocab)?;
        if row.len() != n_step_input {
            return Err(ModelError::InputValidationError(format!(
                "source {:?} has length {}, expected {}",
                text,
                row.len(),
                n_step_input
            )));
        }
        ids.index_axis_mut(Axis(0), b).assign(&row);
    }
    Ok(ids)
}
