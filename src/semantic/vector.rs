//! Embedding vectors with validated dimensionality.
//!
//! Provider output is turned into [`Embedding`] values once, at the boundary,
//! so the ranker never sees empty or non-finite vectors. An [`EmbeddingSet`]
//! additionally guarantees that every vector in it has the same length.

/// Errors raised when a vector cannot take part in similarity scoring.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VectorError {
    #[error("embedding vector is empty")]
    Empty,

    #[error("embedding vector contains a non-finite value")]
    NonFinite,

    #[error("embedding vector has zero norm")]
    ZeroNorm,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// A single embedding produced by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Result<Self, VectorError> {
        if values.is_empty() {
            return Err(VectorError::Empty);
        }
        if values.iter().any(|value| !value.is_finite()) {
            return Err(VectorError::NonFinite);
        }
        Ok(Self(values))
    }

    pub fn dims(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = VectorError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Ordered embeddings sharing one dimensionality.
///
/// Position `i` corresponds to corpus item `i`; the set itself knows nothing
/// about items, pairing is done by the ranker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingSet {
    vectors: Vec<Embedding>,
    dims: Option<usize>,
}

impl EmbeddingSet {
    pub fn new(vectors: Vec<Embedding>) -> Result<Self, VectorError> {
        let dims = vectors.first().map(Embedding::dims);

        if let Some(expected) = dims {
            if let Some(odd) = vectors.iter().find(|v| v.dims() != expected) {
                return Err(VectorError::DimensionMismatch {
                    expected,
                    got: odd.dims(),
                });
            }
        }

        Ok(Self { vectors, dims })
    }

    /// Shared dimensionality, `None` for an empty set.
    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Embedding> {
        self.vectors.iter()
    }

    pub fn as_slice(&self) -> &[Embedding] {
        &self.vectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_vector() {
        assert_eq!(Embedding::new(vec![]), Err(VectorError::Empty));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        assert_eq!(
            Embedding::new(vec![1.0, f32::NAN]),
            Err(VectorError::NonFinite)
        );
        assert_eq!(
            Embedding::new(vec![f32::INFINITY, 0.0]),
            Err(VectorError::NonFinite)
        );
    }

    #[test]
    fn test_zero_vector_is_a_valid_embedding() {
        // zero norm is only an error once it is scored
        let zero = Embedding::new(vec![0.0, 0.0]).unwrap();
        assert_eq!(zero.dims(), 2);
        assert_eq!(zero.norm(), 0.0);
    }

    #[test]
    fn test_norm() {
        let v = Embedding::new(vec![3.0, 4.0]).unwrap();
        assert!((v.norm() - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_set_dimension_mismatch() {
        let vectors = vec![
            Embedding::new(vec![1.0, 0.0]).unwrap(),
            Embedding::new(vec![1.0, 0.0, 0.0]).unwrap(),
        ];

        assert_eq!(
            EmbeddingSet::new(vectors),
            Err(VectorError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn test_empty_set_has_no_dims() {
        let set = EmbeddingSet::new(vec![]).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.dims(), None);
    }

    #[test]
    fn test_set_preserves_order() {
        let vectors = vec![
            Embedding::new(vec![1.0, 0.0]).unwrap(),
            Embedding::new(vec![0.0, 1.0]).unwrap(),
        ];
        let set = EmbeddingSet::new(vectors.clone()).unwrap();

        assert_eq!(set.dims(), Some(2));
        assert_eq!(set.as_slice(), vectors.as_slice());
    }
}
