/// Aligned pinyin/hanzi sentence pairs, the train/validation/test split and batch encoding
pub mod aligned_pair;
/// Symbol-to-index vocabularies for the source and target alphabets
pub mod vocabulary;

pub use aligned_pair::*;
pub use vocabulary::*;

use crate::ModelError;
use crate::error::{IoError, PipelineError};
use ahash::AHashMap;
use ndarray::{Array1, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use serde_json::from_reader;
use std::collections::BTreeMap;
use std::path::Path;
