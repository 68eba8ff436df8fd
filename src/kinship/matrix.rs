use crate::types::VertexId;
use std::collections::HashMap;

/// Sparse symmetric matrix of kinship coefficients labeled by vertex id.
///
/// Ids are sorted ascending and `index_of` gives the row/column of each one in
/// [`to_dense`](Self::to_dense). Only non-zero off-diagonal values are stored.
#[derive(Debug, Clone, Default)]
pub struct KinshipMatrix {
    ids: Vec<VertexId>,
    index: HashMap<VertexId, usize>,
    diagonal: Vec<f64>,
    off_diagonal: HashMap<(usize, usize), f64>,
}

impl KinshipMatrix {
    /// Creates a matrix over `ids` with all coefficients zero
    pub(crate) fn new(mut ids: Vec<VertexId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        let index = ids
            .iter()
            .enumerate()
            .map(|(position, &id)| (id, position))
            .collect();
        let diagonal = vec![0.0; ids.len()];
        Self {
            ids,
            index,
            diagonal,
            off_diagonal: HashMap::new(),
        }
    }

    pub(crate) fn set(&mut self, a: VertexId, b: VertexId, value: f64) {
        let (Some(&i), Some(&j)) = (self.index.get(&a), self.index.get(&b)) else {
            return;
        };
        if i == j {
            self.diagonal[i] = value;
        } else if value != 0.0 {
            self.off_diagonal.insert((i.min(j), i.max(j)), value);
        } else {
            self.off_diagonal.remove(&(i.min(j), i.max(j)));
        }
    }

    /// Coefficient for the pair, `None` if either id is not in the matrix
    pub fn get(&self, a: VertexId, b: VertexId) -> Option<f64> {
        let i = *self.index.get(&a)?;
        let j = *self.index.get(&b)?;
        if i == j {
            return Some(self.diagonal[i]);
        }
        Some(
            self.off_diagonal
                .get(&(i.min(j), i.max(j)))
                .copied()
                .unwrap_or(0.0),
        )
    }

    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    pub fn index_of(&self, id: VertexId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of stored non-zero off-diagonal pairs
    pub fn related_pairs(&self) -> usize {
        self.off_diagonal.len()
    }

    /// Non-zero coefficients as `(a, b, value)` with `a <= b`, sorted by `(a, b)`
    pub fn non_zero_entries(&self) -> Vec<(VertexId, VertexId, f64)> {
        let mut entries: Vec<(usize, usize, f64)> = self
            .diagonal
            .iter()
            .enumerate()
            .filter(|(_, &value)| value != 0.0)
            .map(|(i, &value)| (i, i, value))
            .chain(self.off_diagonal.iter().map(|(&(i, j), &value)| (i, j, value)))
            .collect();
        entries.sort_unstable_by_key(|&(i, j, _)| (i, j));
        entries
            .into_iter()
            .map(|(i, j, value)| (self.ids[i], self.ids[j], value))
            .collect()
    }

    /// Row-major dense matrix in `ids()` order
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.ids.len();
        let mut dense = vec![vec![0.0; n]; n];
        for (i, &value) in self.diagonal.iter().enumerate() {
            dense[i][i] = value;
        }
        for (&(i, j), &value) in &self.off_diagonal {
            dense[i][j] = value;
            dense[j][i] = value;
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_is_symmetric_and_labeled() {
        let mut matrix = KinshipMatrix::new(vec![30, 10, 20, 10]);
        matrix.set(10, 10, 0.5);
        matrix.set(30, 10, 0.25);

        assert_eq!(matrix.ids(), &[10, 20, 30]);
        assert_eq!(matrix.index_of(30), Some(2));
        assert_eq!(matrix.get(10, 30), Some(0.25));
        assert_eq!(matrix.get(30, 10), Some(0.25));
        assert_eq!(matrix.get(20, 30), Some(0.0));
        assert_eq!(matrix.get(10, 99), None);
        assert_eq!(matrix.related_pairs(), 1);

        let dense = matrix.to_dense();
        assert_eq!(dense[0], vec![0.5, 0.0, 0.25]);
        assert_eq!(dense[2][0], 0.25);
    }

    #[test]
    fn test_non_zero_entries() {
        let mut matrix = KinshipMatrix::new(vec![1, 2]);
        matrix.set(2, 2, 0.5);
        matrix.set(2, 1, 0.125);
        assert_eq!(matrix.non_zero_entries(), vec![(1, 2, 0.125), (2, 2, 0.5)]);

        matrix.set(1, 2, 0.0);
        assert_eq!(matrix.related_pairs(), 0);
    }
}
