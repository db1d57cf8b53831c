//! Vector cache and similarity queries over skill names.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::embedding::EmbeddingProvider;
use crate::error::{RecommendError, Result};
use crate::store::types::Skill;

use super::cosine_similarity;

/// A catalog skill eligible for nearest-neighbor search.
struct Candidate {
    skill_id: String,
    vector: Arc<[f32]>,
}

/// Embeds skill names on demand and answers similarity queries.
///
/// Vectors are cached by trimmed skill name and never replaced once inserted,
/// so every query within a job sees the same vector for a given name. The
/// nearest-neighbor candidate set is rebuilt off-lock by [`index_catalog`] and
/// swapped in whole.
///
/// [`index_catalog`]: SkillSimilarityIndex::index_catalog
pub struct SkillSimilarityIndex {
    provider: Arc<dyn EmbeddingProvider>,
    vectors: RwLock<HashMap<String, Arc<[f32]>>>,
    candidates: RwLock<Arc<Vec<Candidate>>>,
}

impl SkillSimilarityIndex {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            vectors: RwLock::new(HashMap::new()),
            candidates: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    /// Number of distinct names with a cached vector.
    pub fn cached_vectors(&self) -> usize {
        self.vectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The vector for a skill name, computing and caching it on first use.
    pub fn vector(&self, skill_name: &str) -> Result<Arc<[f32]>> {
        let key = skill_name.trim();
        if key.is_empty() {
            return Err(RecommendError::embedding_unavailable(
                skill_name,
                "empty skill name",
            ));
        }

        if let Some(v) = self
            .vectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(v.clone());
        }

        let raw = self
            .provider
            .embed(key)
            .map_err(|e| RecommendError::embedding_unavailable(key, format!("{e:#}")))?;

        if raw.is_empty() {
            return Err(RecommendError::embedding_unavailable(key, "empty vector"));
        }
        if raw.iter().any(|x| !x.is_finite()) {
            return Err(RecommendError::embedding_unavailable(
                key,
                "vector contains non-finite values",
            ));
        }
        if raw.iter().all(|x| *x == 0.0) {
            return Err(RecommendError::embedding_unavailable(key, "zero-norm vector"));
        }

        let mut cache = self
            .vectors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another thread may have raced us; first insert wins.
        let entry = cache.entry(key.to_string()).or_insert_with(|| raw.into());
        Ok(entry.clone())
    }

    /// Semantic similarity of two skill names in `[0, 1]`.
    ///
    /// Identical names are 1.0 without consulting the provider twice. Either
    /// name failing to embed is an error, never a silent 0.0.
    pub fn similarity(&self, skill_a: &str, skill_b: &str) -> Result<f64> {
        let a = self.vector(skill_a)?;
        if skill_a.trim() == skill_b.trim() {
            return Ok(1.0);
        }
        let b = self.vector(skill_b)?;
        Ok(cosine_similarity(&a, &b))
    }

    /// Replace the nearest-neighbor candidate set with `skills`.
    ///
    /// Skills whose names cannot be embedded are skipped. Returns the number
    /// of skills indexed.
    pub fn index_catalog(&self, skills: &[Skill]) -> usize {
        let mut built = Vec::with_capacity(skills.len());
        for skill in skills {
            match self.vector(&skill.name) {
                Ok(vector) => built.push(Candidate {
                    skill_id: skill.id.clone(),
                    vector,
                }),
                Err(e) => {
                    tracing::warn!(skill_id = %skill.id, error = %e, "skipping skill in similarity index");
                }
            }
        }

        let indexed = built.len();
        *self
            .candidates
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(built);
        tracing::debug!(indexed, total = skills.len(), "similarity index rebuilt");
        indexed
    }

    /// Up to `k` indexed skills most similar to `skill_name`, best first.
    ///
    /// Ties are ordered by skill ID so results are stable across runs.
    pub fn nearest_neighbors(&self, skill_name: &str, k: usize) -> Result<Vec<(String, f64)>> {
        let query = self.vector(skill_name)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .candidates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut scored: Vec<(String, f64)> = candidates
            .iter()
            .map(|c| (c.skill_id.clone(), cosine_similarity(&query, &c.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::trigram::TrigramEmbeddingProvider;

    fn skill(id: &str, name: &str) -> Skill {
        Skill {
            id: id.into(),
            name: name.into(),
            category: None,
        }
    }

    fn index() -> SkillSimilarityIndex {
        SkillSimilarityIndex::new(Arc::new(TrigramEmbeddingProvider::default()))
    }

    #[test]
    fn self_similarity_is_one() {
        let idx = index();
        assert_eq!(idx.similarity("Rust", "Rust").unwrap(), 1.0);
        assert_eq!(idx.similarity(" Rust ", "Rust").unwrap(), 1.0);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        let idx = index();
        let ab = idx.similarity("Machine Learning", "Deep Learning").unwrap();
        let ba = idx.similarity("Deep Learning", "Machine Learning").unwrap();
        assert_eq!(ab, ba);
        assert!((0.0..=1.0).contains(&ab));
        assert!(ab > 0.0);
    }

    #[test]
    fn blank_name_is_unavailable_not_zero() {
        let idx = index();
        let err = idx.similarity("  ", "Rust").unwrap_err();
        assert!(matches!(err, RecommendError::EmbeddingUnavailable { .. }));
    }

    #[test]
    fn vectors_are_cached_by_trimmed_name() {
        let idx = index();
        let a = idx.vector("SQL").unwrap();
        let b = idx.vector("  SQL").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(idx.cached_vectors(), 1);
    }

    #[test]
    fn nearest_neighbors_ranks_closest_first() {
        let idx = index();
        let indexed = idx.index_catalog(&[
            skill("s1", "Python"),
            skill("s2", "Python Scripting"),
            skill("s3", "Watercolor Painting"),
            skill("s4", ""),
        ]);
        assert_eq!(indexed, 3);

        let hits = idx.nearest_neighbors("Python", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, "s1");
        assert_eq!(hits[1].0, "s2");
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn nearest_neighbors_breaks_ties_by_id() {
        let idx = index();
        idx.index_catalog(&[skill("b", "Go"), skill("a", "Go")]);
        let hits = idx.nearest_neighbors("Go", 5).unwrap();
        assert_eq!(hits[0].0, "a");
        assert_eq!(hits[1].0, "b");
    }

    #[test]
    fn nearest_neighbors_zero_k_is_empty() {
        let idx = index();
        idx.index_catalog(&[skill("s1", "Rust")]);
        assert!(idx.nearest_neighbors("Rust", 0).unwrap().is_empty());
    }
}
