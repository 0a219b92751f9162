use super::*;

/// Bidirectional mapping between the symbols of one alphabet and dense indices.
///
/// Index `i` always maps back to the symbol that maps to `i`, and the indices
/// cover `0..len()` without gaps. A vocabulary is immutable once built.
///
/// # Examples
/// ```rust
/// use hanzi_bigru::dataset::Vocabulary;
///
/// let vocab = Vocabulary::from_symbols("#abc".chars()).unwrap();
/// assert_eq!(vocab.len(), 4);
/// assert_eq!(vocab.index_of('b').unwrap(), 2);
/// assert_eq!(vocab.symbol(3).unwrap(), 'c');
/// ```
#[derive(Debug, Clone)]
pub struct Vocabulary {
    symbols: Vec<char>,
    index: AHashMap<char, usize>,
}

impl PartialEq for Vocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
    }
}

impl Vocabulary {
    /// Builds a vocabulary that assigns indices in iteration order.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If a symbol appears twice
    pub fn from_symbols<I: IntoIterator<Item = char>>(symbols: I) -> Result<Self, ModelError> {
        let symbols: Vec<char> = symbols.into_iter().collect();
        let mut index = AHashMap::with_capacity(symbols.len());
        for (i, &symbol) in symbols.iter().enumerate() {
            if index.insert(symbol, i).is_some() {
                return Err(ModelError::InputValidationError(format!(
                    "symbol {:?} appears more than once in the vocabulary",
                    symbol
                )));
            }
        }
        Ok(Self { symbols, index })
    }

    /// Builds a vocabulary from an explicit symbol-to-index mapping.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If two symbols share an index, or the
    ///   indices do not cover `0..mapping.len()`
    pub fn from_mapping<I: IntoIterator<Item = (char, usize)>>(
        mapping: I,
    ) -> Result<Self, ModelError> {
        let entries: Vec<(char, usize)> = mapping.into_iter().collect();
        let mut slots: Vec<Option<char>> = vec![None; entries.len()];
        for &(symbol, i) in &entries {
            let slot = slots.get_mut(i).ok_or_else(|| {
                ModelError::InputValidationError(format!(
                    "index {} of symbol {:?} is outside the dense range 0..{}",
                    i,
                    symbol,
                    entries.len()
                ))
            })?;
            if let Some(other) = slot.replace(symbol) {
                return Err(ModelError::InputValidationError(format!(
                    "symbols {:?} and {:?} share index {}",
                    other, symbol, i
                )));
            }
        }
        // every slot is filled: `entries.len()` distinct indices below `entries.len()`
        Self::from_symbols(slots.into_iter().flatten())
    }

    /// Number of symbols in the alphabet
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if the vocabulary has no symbols
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns `true` if `symbol` belongs to the alphabet
    pub fn contains(&self, symbol: char) -> bool {
        self.index.contains_key(&symbol)
    }

    /// Looks up the index of a symbol.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If the symbol is not in the alphabet
    pub fn index_of(&self, symbol: char) -> Result<usize, ModelError> {
        self.index.get(&symbol).copied().ok_or_else(|| {
            ModelError::InputValidationError(format!(
                "symbol {:?} is not in the vocabulary",
                symbol
            ))
        })
    }

    /// Looks up the symbol stored at `index`.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `index >= len()`
    pub fn symbol(&self, index: usize) -> Result<char, ModelError> {
        self.symbols.get(index).copied().ok_or_else(|| {
            ModelError::InputValidationError(format!(
                "index {} is outside the vocabulary of size {}",
                index,
                self.symbols.len()
            ))
        })
    }

    /// Symbols in index order
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }
}

#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    source: BTreeMap<String, usize>,
    target: BTreeMap<String, usize>,
}

fn parse_mapping(raw: BTreeMap<String, usize>, side: &str) -> Result<Vocabulary, ModelError> {
    let mut entries = Vec::with_capacity(raw.len());
    for (key, index) in raw {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(symbol), None) => entries.push((symbol, index)),
            _ => {
                return Err(ModelError::InputValidationError(format!(
                    "{} vocabulary key {:?} is not a single symbol",
                    side, key
                )));
            }
        }
    }
    Vocabulary::from_mapping(entries)
}

/// The source (pinyin) and target (hanzi) vocabularies used by one model.
#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyPair {
    pub source: Vocabulary,
    pub target: Vocabulary,
}

impl VocabularyPair {
    /// Loads both vocabularies from a JSON file of the form
    /// `{ "source": { "a": 1, ... }, "target": { "我": 5, ... } }`.
    ///
    /// # Errors
    ///
    /// - `PipelineError::Io` - The file cannot be opened or is not valid JSON of that shape
    /// - `PipelineError::Model` - A mapping has duplicate or sparse indices, or a key that
    ///   is not a single symbol
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let reader = IoError::load_in_buf_reader(path)?;
        let raw: VocabularyFile = from_reader(reader).map_err(IoError::JsonError)?;
        Ok(Self {
            source: parse_mapping(raw.source, "source")?,
            target: parse_mapping(raw.target, "target")?,
        })
    }

    /// Writes both vocabularies in the format read by [`VocabularyPair::load_from_path`].
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        let to_map = |vocab: &Vocabulary| {
            vocab
                .symbols()
                .iter()
                .enumerate()
                .map(|(i, c)| (c.to_string(), i))
                .collect::<BTreeMap<_, _>>()
        };
        let file = VocabularyFile {
            source: to_map(&self.source),
            target: to_map(&self.target),
        };
        let mut writer = IoError::create_buf_writer(path)?;
        serde_json::to_writer_pretty(&mut writer, &file).map_err(IoError::JsonError)?;
        std::io::Write::flush(&mut writer).map_err(IoError::StdIoError)
    }

    /// Checks that the filler symbol exists in both alphabets and that the
    /// alphabet sizes match the model dimensions.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - On any mismatch
    pub fn validate(
        &self,
        source_vocab_size: usize,
        n_output: usize,
        filler: char,
    ) -> Result<(), ModelError> {
        if self.source.len() != source_vocab_size {
            return Err(ModelError::InputValidationError(format!(
                "source vocabulary has {} symbols but the model expects {}",
                self.source.len(),
                source_vocab_size
            )));
        }
        if self.target.len() != n_output {
            return Err(ModelError::InputValidationError(format!(
                "target vocabulary has {} symbols but the model expects {}",
                self.target.len(),
                n_output
            )));
        }
        if !self.source.contains(filler) || !self.target.contains(filler) {
            return Err(ModelError::InputValidationError(format!(
                "filler symbol {:?} must be part of both vocabularies",
                filler
            )));
        }
        Ok(())
    }
}
