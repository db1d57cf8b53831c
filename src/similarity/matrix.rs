//! Dense pairwise similarity matrix over a [`SkillMapping`].

use super::{SkillMapping, SkillSimilarityIndex};

/// Symmetric `n × n` similarity matrix with a unit diagonal, row-major.
#[derive(Debug, Clone, Default)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
    resolved: Vec<bool>,
}

impl SimilarityMatrix {
    /// Compute similarities for every pair of skills in `mapping`.
    ///
    /// Each skill's vector is resolved once up front; pair scores then come
    /// from [`SkillSimilarityIndex::similarity`] over the cached vectors, so
    /// two skills sharing a name score exactly 1.0. A skill whose vector is
    /// unavailable keeps its index with 1.0 on the diagonal and 0.0 elsewhere,
    /// so direct matches on it still count.
    pub fn build(mapping: &SkillMapping, index: &SkillSimilarityIndex) -> Self {
        let n = mapping.len();
        let mut names = Vec::with_capacity(n);
        let mut resolved = Vec::with_capacity(n);
        for (i, id, name) in mapping.iter() {
            names.push(name);
            match index.vector(name) {
                Ok(_) => resolved.push(true),
                Err(e) => {
                    tracing::warn!(skill_id = %id, index = i, error = %e, "skill unresolved in similarity matrix");
                    resolved.push(false);
                }
            }
        }

        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
            if !resolved[i] {
                continue;
            }
            for j in (i + 1)..n {
                if !resolved[j] {
                    continue;
                }
                let sim = match index.similarity(names[i], names[j]) {
                    Ok(sim) => sim,
                    Err(e) => {
                        tracing::warn!(i, j, error = %e, "pair similarity unavailable");
                        0.0
                    }
                };
                values[i * n + j] = sim;
                values[j * n + i] = sim;
            }
        }

        let unresolved = resolved.iter().filter(|r| !**r).count();
        tracing::debug!(skills = n, unresolved, "similarity matrix built");

        Self {
            size: n,
            values,
            resolved,
        }
    }

    /// A zero-size matrix: no semantic adjustment.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Similarity between skills `i` and `j`. Out-of-range indices are 0.0.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i >= self.size || j >= self.size {
            return 0.0;
        }
        self.values[i * self.size + j]
    }

    pub fn is_resolved(&self, i: usize) -> bool {
        self.resolved.get(i).copied().unwrap_or(false)
    }

    pub fn unresolved_count(&self) -> usize {
        self.resolved.iter().filter(|r| !**r).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::trigram::TrigramEmbeddingProvider;
    use crate::similarity::build_mapping;
    use crate::store::types::Skill;
    use std::sync::Arc;

    fn skill(id: &str, name: &str) -> Skill {
        Skill {
            id: id.into(),
            name: name.into(),
            category: None,
        }
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let mapping = build_mapping(&[
            skill("s1", "Rust"),
            skill("s2", "Rust Async"),
            skill("s3", "Public Speaking"),
        ])
        .unwrap();
        let index = SkillSimilarityIndex::new(Arc::new(TrigramEmbeddingProvider::default()));
        let matrix = SimilarityMatrix::build(&mapping, &index);

        assert_eq!(matrix.size(), 3);
        for i in 0..3 {
            assert_eq!(matrix.get(i, i), 1.0);
            for j in 0..3 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
                assert!((0.0..=1.0).contains(&matrix.get(i, j)));
            }
        }
        assert!(matrix.get(0, 1) > matrix.get(0, 2));
    }

    #[test]
    fn entries_agree_with_pairwise_similarity() {
        let mapping = build_mapping(&[
            skill("s1", "Data Analysis"),
            skill("s2", "Data Engineering"),
            skill("s3", "data analysis "),
            skill("s4", "Data Analysis"),
        ])
        .unwrap();
        let index = SkillSimilarityIndex::new(Arc::new(TrigramEmbeddingProvider::default()));
        let matrix = SimilarityMatrix::build(&mapping, &index);

        assert_eq!(
            matrix.get(0, 1),
            index.similarity("Data Analysis", "Data Engineering").unwrap()
        );
        // Same name under two IDs
        assert_eq!(matrix.get(0, 3), 1.0);
        assert_eq!(matrix.get(3, 0), 1.0);
        assert_eq!(
            matrix.get(0, 2),
            index.similarity("Data Analysis", "data analysis ").unwrap()
        );
    }

    #[test]
    fn unresolved_skill_keeps_diagonal_only() {
        let mapping = build_mapping(&[skill("s1", "Rust"), skill("s2", "   ")]).unwrap();
        let index = SkillSimilarityIndex::new(Arc::new(TrigramEmbeddingProvider::default()));
        let matrix = SimilarityMatrix::build(&mapping, &index);

        assert!(matrix.is_resolved(0));
        assert!(!matrix.is_resolved(1));
        assert_eq!(matrix.unresolved_count(), 1);
        assert_eq!(matrix.get(1, 1), 1.0);
        assert_eq!(matrix.get(0, 1), 0.0);
    }

    #[test]
    fn out_of_range_lookups_are_zero() {
        let matrix = SimilarityMatrix::empty();
        assert_eq!(matrix.size(), 0);
        assert_eq!(matrix.get(0, 0), 0.0);
        assert!(!matrix.is_resolved(0));
    }
}
