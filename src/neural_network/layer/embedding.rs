use super::*;

/// Trainable lookup table mapping source symbol ids to dense vectors.
///
/// The table has shape (vocab_size, embed_dim) and is shared by every timestep
/// and by both encoder directions.
///
/// # Examples
/// ```rust
/// use hanzi_bigru::neural_network::Embedding;
/// use ndarray::array;
/// use ndarray_rand::rand::SeedableRng;
/// use ndarray_rand::rand::rngs::StdRng;
///
/// let mut rng = StdRng::seed_from_u64(3);
/// let embedding = Embedding::new(5, 4, Some(0.1), &mut rng).unwrap();
/// let embedded = embedding.lookup(array![[0, 4, 2]].view()).unwrap();
/// assert_eq!(embedded.dim(), (1, 3, 4));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    table: Array2<f32>,
}

impl Embedding {
    /// Creates a table drawn uniformly from `[-radius, radius]`.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If either dimension is 0
    pub fn new<R: Rng + ?Sized>(
        vocab_size: usize,
        embed_dim: usize,
        radius: Option<f32>,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        validate_dimension_greater_than_zero(vocab_size, "vocab_size")?;
        validate_dimension_greater_than_zero(embed_dim, "embed_dim")?;
        Ok(Self {
            table: uniform_matrix(vocab_size, embed_dim, radius, rng),
        })
    }

    /// Takes the `embedding` parameter out of `registry`.
    pub fn from_registry(
        vocab_size: usize,
        embed_dim: usize,
        registry: &mut ParameterRegistry,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            table: registry.take_matrix(ParamKey::Embedding, vocab_size, embed_dim)?,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.table.nrows()
    }

    pub fn embed_dim(&self) -> usize {
        self.table.ncols()
    }

    pub fn table(&self) -> &Array2<f32> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Array2<f32> {
        &mut self.table
    }

    /// Gathers the embedding vector of every id.
    ///
    /// # Parameters
    ///
    /// - `ids` - Symbol ids with shape (batch, steps)
    ///
    /// # Returns
    ///
    /// - `Array3<f32>` - Embedded sequence with shape (batch, steps, embed_dim)
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If an id is outside the vocabulary
    pub fn lookup(&self, ids: ArrayView2<usize>) -> Result<Array3<f32>, ModelError> {
        self.validate_ids(ids)?;
        let (batch, steps) = ids.dim();
        let mut embedded = Array3::<f32>::zeros((batch, steps, self.embed_dim()));
        for ((b, t), &id) in ids.indexed_iter() {
            embedded
                .slice_mut(s![b, t, ..])
                .assign(&self.table.row(id));
        }
        Ok(embedded)
    }

    /// Scatter-adds the gradient of the embedded sequence back onto the table rows.
    ///
    /// # Parameters
    ///
    /// - `ids` - The ids passed to [`Embedding::lookup`]
    /// - `grad_embedded` - Gradient with shape (batch, steps, embed_dim)
    ///
    /// # Returns
    ///
    /// - `Array2<f32>` - Gradient of the table, shape (vocab_size, embed_dim)
    pub fn backward(
        &self,
        ids: ArrayView2<usize>,
        grad_embedded: ArrayView3<f32>,
    ) -> Result<Array2<f32>, ModelError> {
        self.validate_ids(ids)?;
        let mut grad_table = Array2::<f32>::zeros(self.table.raw_dim());
        for ((b, t), &id) in ids.indexed_iter() {
            let mut row = grad_table.row_mut(id);
            row += &grad_embedded.slice(s![b, t, ..]);
        }
        Ok(grad_table)
    }

    fn validate_ids(&self, ids: ArrayView2<usize>) -> Result<(), ModelError> {
        if let Some(&bad) = ids.iter().find(|&&id| id >= self.vocab_size()) {
            return Err(ModelError::InputValidationError(format!(
                "symbol id {} is outside the embedding table of {} rows",
                bad,
                self.vocab_size()
            )));
        }
        Ok(())
    }
}
