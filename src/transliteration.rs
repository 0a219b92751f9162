use crate::config::{ExperimentConfig, SymbolConfig};
use crate::dataset::{AlignedPair, VocabularyPair, prepare_source};
use crate::error::PipelineError;
use crate::metric::{EvaluationReport, edit_distance};
use crate::neural_network::{BiGruModel, Checkpoint, evaluate_cost};
use crate::ModelError;
use log::info;
use ndarray::ArrayView1;
use rayon::prelude::*;
use std::path::Path;

/// Pinyin sentences transliterated when no input is given on the command line
pub const DEFAULT_INPUTS: [&str; 3] = [
    "womenyouxinxinnengyingdezhechangbisai",
    "youyujingyanbuzu",
    "tebieshizuijin_nianlai",
];

/// Removes every `filler` symbol, then trims `boundary` symbols from both ends.
///
/// Interior boundary symbols are kept.
///
/// # Examples
/// ```rust
/// use hanzi_bigru::transliteration::strip_symbols;
///
/// assert_eq!(strip_symbols(".我#们.去##", '#', '.'), "我们.去");
/// assert_eq!(strip_symbols("..##..", '#', '.'), "");
/// ```
pub fn strip_symbols(text: &str, filler: char, boundary: char) -> String {
    let without_filler: String = text.chars().filter(|&c| c != filler).collect();
    without_filler.trim_matches(boundary).to_string()
}

/// Qualitative report of one decoded test pair.
///
/// `target` and `prediction` are already stripped of filler and boundary symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleReport {
    pub source: String,
    pub target: String,
    pub prediction: String,
    pub edit_distance: usize,
}

/// Result of transliterating one free-text input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transliteration {
    pub source: String,
    pub prediction: String,
}

/// Greedy decoder turning pinyin into hanzi with a trained model.
pub struct Transliterator {
    model: BiGruModel,
    vocab: VocabularyPair,
    symbols: SymbolConfig,
}

impl Transliterator {
    /// Wraps a model with the vocabularies and reserved symbols it was trained with.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If the vocabulary sizes do not match the model
    ///   or the filler symbol is missing from a vocabulary
    pub fn new(
        model: BiGruModel,
        vocab: VocabularyPair,
        symbols: SymbolConfig,
    ) -> Result<Self, ModelError> {
        let config = model.config();
        vocab.validate(config.source_vocab_size, config.n_output, symbols.filler)?;
        Ok(Self {
            model,
            vocab,
            symbols,
        })
    }

    /// Restores the model from a checkpoint file.
    ///
    /// The checkpoint must hold exactly the parameters of the architecture in `config.model`.
    ///
    /// # Errors
    ///
    /// - `PipelineError::Io` - If the file cannot be read or parsed
    /// - `PipelineError::Model` - If the parameter set does not match the architecture
    pub fn from_checkpoint<P: AsRef<Path>>(
        config: &ExperimentConfig,
        vocab: VocabularyPair,
        path: P,
    ) -> Result<Self, PipelineError> {
        let registry = Checkpoint::load_from_path(path)?.into_registry()?;
        let model = BiGruModel::from_registry(config.model.clone(), registry)?;
        Ok(Self::new(model, vocab, config.symbols.clone())?)
    }

    pub fn model(&self) -> &BiGruModel {
        &self.model
    }

    pub fn vocab(&self) -> &VocabularyPair {
        &self.vocab
    }

    /// Maps predicted target ids to symbols and strips filler and boundary symbols
    pub fn decode(&self, ids: ArrayView1<usize>) -> Result<String, ModelError> {
        let raw = ids
            .iter()
            .map(|&id| self.vocab.target.symbol(id))
            .collect::<Result<String, _>>()?;
        Ok(self.strip(&raw))
    }

    fn strip(&self, text: &str) -> String {
        strip_symbols(text, self.symbols.filler, self.symbols.boundary)
    }

    /// Decoded, stripped predictions for the source side of `pairs`.
    ///
    /// Pairs are run through the model `chunk_size` at a time.
    pub fn predict_pairs(
        &self,
        pairs: &[AlignedPair],
        chunk_size: usize,
    ) -> Result<Vec<String>, ModelError> {
        let n_step = self.model.config().n_step_input;
        let mut predictions = Vec::with_capacity(pairs.len());
        for chunk in pairs.chunks(chunk_size.max(1)) {
            let sources: Vec<&str> = chunk.iter().map(|p| p.source.as_str()).collect();
            let ids = prepare_source(&sources, &self.vocab.source, n_step)?;
            let predicted = self.model.predict(ids.view())?;
            for row in predicted.rows() {
                predictions.push(self.decode(row)?);
            }
        }
        Ok(predictions)
    }

    /// Loss and character error rate on a labelled set.
    ///
    /// # Returns
    ///
    /// - `(f32, EvaluationReport)` - Cross-entropy loss and the aggregate edit statistics
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `pairs` is empty or malformed
    pub fn evaluate(
        &self,
        pairs: &[AlignedPair],
        chunk_size: usize,
    ) -> Result<(f32, EvaluationReport), ModelError> {
        let loss = evaluate_cost(&self.model, pairs, &self.vocab, 0.0, chunk_size.max(1))?.loss;
        info!("test set: {} samples, loss {:.8}", pairs.len(), loss);

        let predictions = self.predict_pairs(pairs, chunk_size)?;
        let report = pairs
            .par_iter()
            .zip(predictions.par_iter())
            .map(|(pair, prediction)| {
                let mut report = EvaluationReport::default();
                report.record(&self.strip(&pair.target), prediction);
                report
            })
            .reduce(EvaluationReport::default, EvaluationReport::merge);
        info!("{}", report);
        Ok((loss, report))
    }

    /// Decodes a single labelled pair and compares it with its target
    pub fn example_report(&self, pair: &AlignedPair) -> Result<ExampleReport, ModelError> {
        let prediction = self
            .predict_pairs(std::slice::from_ref(pair), 1)?
            .pop()
            .unwrap_or_default();
        let target = self.strip(&pair.target);
        let edit_distance = edit_distance(&target, &prediction);
        Ok(ExampleReport {
            source: pair.source.clone(),
            target,
            prediction,
            edit_distance,
        })
    }

    /// Transliterates free-text pinyin.
    ///
    /// The input is padded on the right with the filler symbol up to `aligned_input_len`.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If the input is longer than `aligned_input_len`
    ///   or holds a symbol outside the source vocabulary
    pub fn transliterate(&self, raw: &str) -> Result<Transliteration, ModelError> {
        let aligned_len = self.symbols.aligned_input_len;
        let len = raw.chars().count();
        if len > aligned_len {
            return Err(ModelError::InputValidationError(format!(
                "input {:?} has {} symbols, at most {} are supported",
                raw, len, aligned_len
            )));
        }
        let mut aligned = raw.to_string();
        aligned.extend(std::iter::repeat_n(self.symbols.filler, aligned_len - len));

        let ids = prepare_source(
            &[aligned.as_str()],
            &self.vocab.source,
            self.model.config().n_step_input,
        )?;
        let predicted = self.model.predict(ids.view())?;
        let prediction = predicted
            .rows()
            .into_iter()
            .next()
            .map(|row| self.decode(row))
            .transpose()?
            .unwrap_or_default();
        Ok(Transliteration {
            source: raw.to_string(),
            prediction,
        })
    }
}
