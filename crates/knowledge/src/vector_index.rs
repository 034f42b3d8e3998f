//! Vector index abstraction and the exact flat backend.
//!
//! Scores are inner products, which equal cosine similarity for the
//! unit-normalized vectors produced by the embedding providers.

use recall_core::{AppError, AppResult};
use std::cmp::Ordering;

/// Trait for vector index backends.
///
/// Positions are assigned in insertion order starting at zero and are never
/// reused.
pub trait VectorIndex: Send + Sync {
    /// Vector dimension accepted by this index.
    fn dimension(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors in order.
    ///
    /// Either every vector is added or none is.
    fn add(&mut self, vectors: &[Vec<f32>]) -> AppResult<()>;

    /// Return up to `k` `(position, score)` pairs, highest score first.
    ///
    /// Equal scores are ordered by ascending position. Fails with
    /// `EmptyIndex` when no vectors are stored.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(usize, f32)>>;

    /// Stored vector at `position`.
    fn vector(&self, position: usize) -> Option<&[f32]>;
}

/// Exact brute-force index over a contiguous row-major buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> AppResult<Self> {
        if dimension == 0 {
            return Err(AppError::InvalidConfiguration(
                "Vector dimension must be positive".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Rebuild an index from a row-major buffer.
    pub(crate) fn from_raw(dimension: usize, data: Vec<f32>) -> AppResult<Self> {
        let mut index = Self::new(dimension)?;
        if data.len() % dimension != 0 {
            return Err(AppError::CorruptPersistedState(format!(
                "{} components do not divide into vectors of dimension {}",
                data.len(),
                dimension
            )));
        }
        index.data = data;
        Ok(index)
    }

    /// Row-major view of every stored component.
    pub fn as_raw(&self) -> &[f32] {
        &self.data
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> AppResult<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.is_empty() {
            return Err(AppError::EmptyIndex);
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .map(|row| inner_product(row, query))
            .enumerate()
            .collect();

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_by(rank);

        tracing::trace!("Flat search returned {} of {} vectors", k, self.len());
        Ok(scored)
    }

    fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }
}

/// Descending score, then ascending position.
fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Dot product of two equal-length slices.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(v: &[f32]) -> Vec<f32> {
        let mut v = v.to_vec();
        normalize(&mut v);
        v
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            FlatIndex::new(0),
            Err(AppError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_search_empty_index() {
        let index = FlatIndex::new(2).unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0], 3),
            Err(AppError::EmptyIndex)
        ));
    }

    #[test]
    fn test_added_vector_is_its_own_top_hit() {
        let mut index = FlatIndex::new(4).unwrap();
        let vectors = vec![
            unit(&[1.0, 0.5, 0.2, 0.1]),
            unit(&[-0.3, -0.8, 0.4, -0.2]),
            unit(&[0.1, 0.1, 0.9, 0.3]),
        ];
        index.add(&vectors).unwrap();

        for (position, vector) in vectors.iter().enumerate() {
            let hits = index.search(vector, 1).unwrap();
            assert_eq!(hits[0].0, position);
            assert!((hits[0].1 - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_orthogonal_query() {
        let mut index = FlatIndex::new(2).unwrap();
        index.add(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();

        let hits = index.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits, vec![(0, 1.0)]);
    }

    #[test]
    fn test_k_larger_than_size_returns_all_ordered() {
        let mut index = FlatIndex::new(2).unwrap();
        index
            .add(&[unit(&[0.0, 1.0]), unit(&[1.0, 1.0]), unit(&[1.0, 0.0])])
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 10).unwrap();
        let positions: Vec<usize> = hits.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![2, 1, 0]);
        assert!(hits.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_ties_prefer_earliest_position() {
        let mut index = FlatIndex::new(2).unwrap();
        let v = unit(&[1.0, 1.0]);
        index
            .add(&[vec![0.0, 1.0], v.clone(), v.clone(), v.clone()])
            .unwrap();

        let hits = index.search(&v, 2).unwrap();
        assert_eq!(hits.iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_duplicates_grow_index() {
        let mut index = FlatIndex::new(2).unwrap();
        index.add(&[vec![1.0, 0.0]]).unwrap();
        index.add(&[vec![1.0, 0.0]]).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_adds_nothing() {
        let mut index = FlatIndex::new(3).unwrap();
        let result = index.add(&[vec![1.0, 0.0, 0.0], vec![1.0, 0.0]]);
        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_k_zero() {
        let mut index = FlatIndex::new(2).unwrap();
        index.add(&[vec![1.0, 0.0]]).unwrap();
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_vector_lookup() {
        let mut index = FlatIndex::new(2).unwrap();
        index.add(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert_eq!(index.vector(1), Some(&[0.0, 1.0][..]));
        assert_eq!(index.vector(2), None);
    }
}
